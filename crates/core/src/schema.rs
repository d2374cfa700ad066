//! Table descriptions the admin operates on.
//!
//! Rows are never mapped onto Rust structs: a [`ModelSchema`] names the
//! table, its columns and their [`ColumnKind`], which is enough for the
//! database layer to read, filter and write any registered model.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

static IDENTIFIER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid identifier regex"));

/// Check that `name` is a plain SQL identifier (letters, digits, underscore).
pub fn is_valid_identifier(name: &str) -> bool {
    name.len() <= 63 && IDENTIFIER.is_match(name)
}

/// Fail with a validation error when `name` is not a plain SQL identifier.
pub fn ensure_identifier(what: &str, name: &str) -> CoreResult<()> {
    if is_valid_identifier(name) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "{what} '{name}' is not a valid identifier"
        )))
    }
}

/// Turn `created_at` into `Created At`.
pub fn humanize(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// ---------------------------------------------------------------------------
// Column kinds
// ---------------------------------------------------------------------------

/// Storage kind of a column, driving casts, parsing and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColumnKind {
    /// `smallint`, `integer`, `bigint` and serial variants.
    Integer,
    /// `real`, `double precision`.
    Float,
    /// `numeric`; carried as text to keep precision.
    Decimal,
    /// `text`, `varchar`, `char`.
    Text,
    Boolean,
    Date,
    /// `timestamp` or `timestamptz`; read back as UTC.
    DateTime,
    /// `uuid`; carried as text.
    Uuid,
    /// `jsonb`.
    Json,
}

impl ColumnKind {
    /// Cast applied to the column in SELECT lists so every value decodes
    /// into one canonical Rust type.
    pub fn read_cast(self) -> &'static str {
        match self {
            ColumnKind::Integer => "int8",
            ColumnKind::Float => "float8",
            ColumnKind::Decimal | ColumnKind::Text | ColumnKind::Uuid => "text",
            ColumnKind::Boolean => "bool",
            ColumnKind::Date => "date",
            ColumnKind::DateTime => "timestamptz",
            ColumnKind::Json => "jsonb",
        }
    }

    /// Cast applied to bound parameters when the wire type differs from the
    /// column type.
    pub fn write_cast(self) -> Option<&'static str> {
        match self {
            ColumnKind::Decimal => Some("numeric"),
            ColumnKind::Uuid => Some("uuid"),
            _ => None,
        }
    }

    /// Whether values of this kind compare as text.
    pub fn is_textual(self) -> bool {
        matches!(self, ColumnKind::Text)
    }
}

// ---------------------------------------------------------------------------
// Columns and schemas
// ---------------------------------------------------------------------------

/// One column of a registered table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub kind: ColumnKind,
    #[serde(default)]
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
    /// Human-readable label; defaults to the humanized column name.
    #[serde(default)]
    pub label: Option<String>,
}

impl Column {
    pub fn new(name: impl Into<String>, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            kind,
            nullable: false,
            primary_key: false,
            label: None,
        }
    }

    #[must_use]
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    #[must_use]
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn display_label(&self) -> String {
        self.label.clone().unwrap_or_else(|| humanize(&self.name))
    }
}

/// Description of one registered model: its name in URLs and the table it
/// lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSchema {
    /// Registry key and URL segment (e.g. `Book`).
    pub name: String,
    /// Database table (e.g. `books`).
    pub table: String,
    pub columns: Vec<Column>,
}

impl ModelSchema {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn get_column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// The primary-key column.
    ///
    /// # Panics
    ///
    /// When the schema has no columns. Every schema reachable through a
    /// registered admin has passed [`ModelSchema::validate`], which rejects
    /// that case and guarantees exactly one primary key.
    pub fn primary_key(&self) -> &Column {
        debug_assert!(
            self.columns.iter().filter(|c| c.primary_key).count() == 1,
            "primary_key() on unvalidated schema '{}'",
            self.name
        );
        self.columns
            .iter()
            .find(|c| c.primary_key)
            .unwrap_or(&self.columns[0])
    }

    /// Check identifiers and that exactly one primary key is declared.
    pub fn validate(&self) -> CoreResult<()> {
        ensure_identifier("model name", &self.name)?;
        ensure_identifier("table", &self.table)?;
        if self.columns.is_empty() {
            return Err(CoreError::Validation(format!(
                "model '{}' declares no columns",
                self.name
            )));
        }
        for (i, column) in self.columns.iter().enumerate() {
            ensure_identifier("column", &column.name)?;
            if self.columns[..i].iter().any(|c| c.name == column.name) {
                return Err(CoreError::Validation(format!(
                    "model '{}' declares column '{}' twice",
                    self.name, column.name
                )));
            }
        }
        let pk_count = self.columns.iter().filter(|c| c.primary_key).count();
        if pk_count != 1 {
            return Err(CoreError::Validation(format!(
                "model '{}' must declare exactly one primary key column (found {pk_count})",
                self.name
            )));
        }
        Ok(())
    }
}

/// Capability a Rust type implements to be registrable with the admin.
///
/// ```ignore
/// struct Author;
///
/// impl AdminModel for Author {
///     fn schema() -> ModelSchema {
///         ModelSchema::new("Author", "authors")
///             .column(Column::new("id", ColumnKind::Integer).primary_key())
///             .column(Column::new("name", ColumnKind::Text))
///     }
/// }
/// ```
pub trait AdminModel {
    fn schema() -> ModelSchema;
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
