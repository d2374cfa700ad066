//! Field descriptors: how a column is shown in the list table, edited in a
//! form and matched by the search box.

use std::fmt::{self, Write as _};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::password::{hash_password, is_password_hash};
use crate::query::{FieldRef, Operator, Predicate};
use crate::schema::{ensure_identifier, humanize, Column, ColumnKind, ModelSchema};
use crate::value::{parse_datetime, FieldValue};

// ---------------------------------------------------------------------------
// Display types
// ---------------------------------------------------------------------------

/// Widget used for a field in tables and forms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayType {
    Text,
    Number,
    Date,
    DateTime,
    Boolean,
    Switch,
    Select,
    Radio,
    Image,
    FileUpload,
    Status,
    Link,
    Html,
    Email,
    Password,
    Textarea,
    Json,
    ForeignKey,
}

impl DisplayType {
    /// Default widget for a column kind.
    pub fn for_kind(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Integer | ColumnKind::Float | ColumnKind::Decimal => DisplayType::Number,
            ColumnKind::Boolean => DisplayType::Boolean,
            ColumnKind::Date => DisplayType::Date,
            ColumnKind::DateTime => DisplayType::DateTime,
            ColumnKind::Json => DisplayType::Json,
            ColumnKind::Text | ColumnKind::Uuid => DisplayType::Text,
        }
    }

    /// Whether display values of this type are trusted markup.
    pub fn renders_html(self) -> bool {
        matches!(
            self,
            DisplayType::Image | DisplayType::Status | DisplayType::Link | DisplayType::Html
        )
    }
}

/// Escape text for inclusion in HTML content or attribute values.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Relations
// ---------------------------------------------------------------------------

fn default_primary_key() -> String {
    "id".to_string()
}

/// One hop from a local foreign-key column to a display column of another
/// table, e.g. `books.publisher_id -> publishers.name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub table: String,
    #[serde(default = "default_primary_key")]
    pub primary_key: String,
    pub foreign_key: String,
    pub display_field: String,
}

impl Relation {
    pub fn new(
        table: impl Into<String>,
        foreign_key: impl Into<String>,
        display_field: impl Into<String>,
    ) -> Self {
        Self {
            table: table.into(),
            primary_key: default_primary_key(),
            foreign_key: foreign_key.into(),
            display_field: display_field.into(),
        }
    }

    /// Join alias; one join per foreign key.
    pub fn alias(&self) -> String {
        format!("r_{}", self.foreign_key)
    }

    /// Record key under which the flattened display value is stored.
    pub fn value_key(&self) -> String {
        format!("{}__{}", self.alias(), self.display_field)
    }

    pub fn field_ref(&self) -> FieldRef {
        FieldRef::Related(self.clone())
    }

    /// The foreign key must be a column of `schema` and every name a plain
    /// identifier.
    pub fn validate(&self, schema: &ModelSchema) -> CoreResult<()> {
        ensure_identifier("related table", &self.table)?;
        ensure_identifier("related primary key", &self.primary_key)?;
        ensure_identifier("related display field", &self.display_field)?;
        if schema.get_column(&self.foreign_key).is_none() {
            return Err(CoreError::Validation(format!(
                "foreign key '{}' is not a column of '{}'",
                self.foreign_key, schema.name
            )));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Formatters
// ---------------------------------------------------------------------------

/// Code-only display function.
#[derive(Clone)]
pub struct CustomFormatter(pub Arc<dyn Fn(&FieldValue) -> String + Send + Sync>);

impl fmt::Debug for CustomFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomFormatter(..)")
    }
}

fn default_image_size() -> u32 {
    100
}

/// Turns a non-null cell into its display string.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Formatter {
    /// Map raw values to labels; unknown values are shown as-is.
    Choices { choices: IndexMap<String, String> },
    /// strftime pattern for dates and timestamps.
    DateTime { format: String },
    /// Keep the first `length` characters, appending `...` when cut.
    Truncate { length: usize },
    Image {
        #[serde(default = "default_image_size")]
        width: u32,
        #[serde(default = "default_image_size")]
        height: u32,
    },
    Link {
        #[serde(default)]
        label: Option<String>,
    },
    Number {
        #[serde(default)]
        decimals: usize,
        #[serde(default)]
        prefix: String,
        #[serde(default)]
        suffix: String,
    },
    #[serde(skip)]
    Custom(CustomFormatter),
}

impl Formatter {
    pub fn custom(f: impl Fn(&FieldValue) -> String + Send + Sync + 'static) -> Self {
        Formatter::Custom(CustomFormatter(Arc::new(f)))
    }

    pub fn choices<K: Into<String>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Formatter::Choices {
            choices: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Reject strftime patterns chrono cannot render.
    pub fn validate(&self) -> CoreResult<()> {
        if let Formatter::DateTime { format } = self {
            let probe = chrono::NaiveDate::from_ymd_opt(2000, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|dt| render(dt.format(format)));
            if !matches!(probe, Some(Some(_))) {
                return Err(CoreError::Validation(format!(
                    "invalid date-time format '{format}'"
                )));
            }
        }
        Ok(())
    }

    pub fn apply(&self, value: &FieldValue) -> String {
        let plain = value.to_display_string();
        match self {
            Formatter::Choices { choices } => choices.get(&plain).cloned().unwrap_or(plain),
            Formatter::DateTime { format } => {
                let naive = match value {
                    FieldValue::DateTime(dt) => Some(dt.naive_utc()),
                    FieldValue::Date(d) => d.and_hms_opt(0, 0, 0),
                    FieldValue::Text(s) => parse_datetime(s).map(|dt| dt.naive_utc()),
                    _ => None,
                };
                naive
                    .and_then(|dt| render(dt.format(format)))
                    .unwrap_or(plain)
            }
            Formatter::Truncate { length } => {
                if plain.chars().count() > *length {
                    let mut cut: String = plain.chars().take(*length).collect();
                    cut.push_str("...");
                    cut
                } else {
                    plain
                }
            }
            Formatter::Image { width, height } => format!(
                r#"<img src="{}" width="{width}" height="{height}" style="object-fit: cover;">"#,
                escape_html(&plain)
            ),
            Formatter::Link { label } => format!(
                r#"<a href="{}" target="_blank" rel="noopener">{}</a>"#,
                escape_html(&plain),
                escape_html(label.as_deref().unwrap_or(&plain))
            ),
            Formatter::Number {
                decimals,
                prefix,
                suffix,
            } => match value.as_f64() {
                Some(n) => format!("{prefix}{n:.prec$}{suffix}", prec = *decimals),
                None => plain,
            },
            Formatter::Custom(CustomFormatter(f)) => f(value),
        }
    }
}

fn render(formatted: impl fmt::Display) -> Option<String> {
    let mut out = String::new();
    write!(out, "{formatted}").ok()?;
    Some(out)
}

// ---------------------------------------------------------------------------
// Processors
// ---------------------------------------------------------------------------

/// Code-only input transformation; an `Err` message becomes a validation error.
#[derive(Clone)]
pub struct CustomProcessor(pub Arc<dyn Fn(&str) -> Result<String, String> + Send + Sync>);

impl fmt::Debug for CustomProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomProcessor(..)")
    }
}

/// Transformation applied to submitted form input before parsing.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Processor {
    Trim,
    /// Hash with argon2id; values that already are hashes pass through.
    HashPassword,
    Truncate { length: usize },
    Lowercase,
    #[serde(skip)]
    Custom(CustomProcessor),
}

impl Processor {
    pub fn custom(f: impl Fn(&str) -> Result<String, String> + Send + Sync + 'static) -> Self {
        Processor::Custom(CustomProcessor(Arc::new(f)))
    }

    pub fn apply(&self, raw: &str) -> CoreResult<String> {
        match self {
            Processor::Trim => Ok(raw.trim().to_string()),
            Processor::HashPassword if is_password_hash(raw) => Ok(raw.to_string()),
            Processor::HashPassword => hash_password(raw),
            Processor::Truncate { length } => Ok(raw.chars().take(*length).collect()),
            Processor::Lowercase => Ok(raw.to_lowercase()),
            Processor::Custom(CustomProcessor(f)) => f(raw).map_err(CoreError::Validation),
        }
    }
}

// ---------------------------------------------------------------------------
// Table fields
// ---------------------------------------------------------------------------

fn yes() -> bool {
    true
}

/// One column of the list table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableField {
    /// Column name, or any identifier when `related` is set.
    pub name: String,
    /// Defaults to the humanized name.
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub display_type: Option<DisplayType>,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default = "yes")]
    pub editable: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default = "yes")]
    pub visible: bool,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub is_link: bool,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default, skip_serializing)]
    pub formatter: Option<Formatter>,
    #[serde(default)]
    pub related: Option<Relation>,
}

impl TableField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            display_type: None,
            sortable: false,
            searchable: false,
            filterable: false,
            editable: true,
            readonly: false,
            visible: true,
            hidden: false,
            is_link: false,
            width: None,
            formatter: None,
            related: None,
        }
    }

    /// A column showing the display value of a related row.
    pub fn related(name: impl Into<String>, relation: Relation) -> Self {
        let mut field = Self::new(name);
        field.label = humanize(&relation.display_field);
        field.editable = false;
        field.related = Some(relation);
        field
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn display_type(mut self, display_type: DisplayType) -> Self {
        self.display_type = Some(display_type);
        self
    }

    #[must_use]
    pub fn sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    #[must_use]
    pub fn searchable(mut self, searchable: bool) -> Self {
        self.searchable = searchable;
        self
    }

    #[must_use]
    pub fn filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    #[must_use]
    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    #[must_use]
    pub fn readonly(mut self, readonly: bool) -> Self {
        self.readonly = readonly;
        self
    }

    #[must_use]
    pub fn hidden(mut self, hidden: bool) -> Self {
        self.hidden = hidden;
        self
    }

    #[must_use]
    pub fn link(mut self) -> Self {
        self.is_link = true;
        self
    }

    #[must_use]
    pub fn width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
        self
    }

    #[must_use]
    pub fn formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    pub fn is_visible(&self) -> bool {
        self.visible && !self.hidden
    }

    pub fn effective_display_type(&self) -> DisplayType {
        self.display_type.unwrap_or(DisplayType::Text)
    }

    /// Target used when sorting or filtering on this field.
    pub fn field_ref(&self, schema: &ModelSchema) -> Option<FieldRef> {
        match &self.related {
            Some(relation) => Some(relation.field_ref()),
            None => schema
                .get_column(&self.name)
                .map(|c| FieldRef::column(&c.name, c.kind)),
        }
    }

    /// Record key the value of this field is read from.
    pub fn value_key(&self) -> String {
        match &self.related {
            Some(relation) => relation.value_key(),
            None => self.name.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Form fields
// ---------------------------------------------------------------------------

/// One input of the add or edit form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormField {
    /// Column written by this input.
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub field_type: Option<DisplayType>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub readonly: bool,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub help_text: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub choices: Option<IndexMap<String, String>>,
    #[serde(default, skip_serializing)]
    pub processor: Option<Processor>,
    /// Offer the rows of a related table as options for this foreign key.
    #[serde(default)]
    pub related: Option<Relation>,
    #[serde(default)]
    pub upload_path: Option<String>,
    #[serde(default)]
    pub accept: Option<String>,
    #[serde(default)]
    pub max_size: Option<u64>,
}

impl FormField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            field_type: None,
            required: false,
            readonly: false,
            placeholder: None,
            help_text: None,
            default_value: None,
            choices: None,
            processor: None,
            related: None,
            upload_path: None,
            accept: None,
            max_size: None,
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn field_type(mut self, field_type: DisplayType) -> Self {
        self.field_type = Some(field_type);
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    #[must_use]
    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn help_text(mut self, help_text: impl Into<String>) -> Self {
        self.help_text = Some(help_text.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn choices<K: Into<String>, V: Into<String>>(
        mut self,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        self.choices = Some(
            pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        );
        self
    }

    #[must_use]
    pub fn processor(mut self, processor: Processor) -> Self {
        self.processor = Some(processor);
        self
    }

    #[must_use]
    pub fn related(mut self, relation: Relation) -> Self {
        self.related = Some(relation);
        self.field_type.get_or_insert(DisplayType::ForeignKey);
        self
    }

    /// Image upload input storing the saved URL in this column.
    #[must_use]
    pub fn upload(mut self, upload_path: impl Into<String>, accept: impl Into<String>, max_size: u64) -> Self {
        self.field_type = Some(DisplayType::FileUpload);
        self.upload_path = Some(upload_path.into());
        self.accept = Some(accept.into());
        self.max_size = Some(max_size);
        self
    }

    /// Apply the processor and parse `raw` for `column`.
    ///
    /// `Ok(None)` means "leave the stored value alone": a blank password
    /// submitted to a `HashPassword` field.
    pub fn process_value(&self, raw: &str, column: &Column) -> CoreResult<Option<FieldValue>> {
        if matches!(self.processor, Some(Processor::HashPassword)) && raw.is_empty() {
            if self.required {
                return Err(CoreError::Validation(format!("{} is required", self.label)));
            }
            return Ok(None);
        }
        let processed = match &self.processor {
            Some(processor) => processor.apply(raw)?,
            None => raw.to_string(),
        };
        if self.required && processed.trim().is_empty() {
            return Err(CoreError::Validation(format!("{} is required", self.label)));
        }
        FieldValue::parse_form(column.kind, &processed, column.nullable)
            .map(Some)
            .map_err(|e| CoreError::Validation(format!("{}: {e}", self.label)))
    }
}

// ---------------------------------------------------------------------------
// Search fields
// ---------------------------------------------------------------------------

/// A field the free-text search box matches against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub operator: Operator,
    #[serde(default)]
    pub related: Option<Relation>,
}

impl SearchField {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            placeholder: None,
            operator: Operator::Icontains,
            related: None,
        }
    }

    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = operator;
        self
    }

    #[must_use]
    pub fn related(mut self, relation: Relation) -> Self {
        self.related = Some(relation);
        self
    }

    /// Predicate matching `term` against this field, or `None` when the term
    /// cannot be compared with the field's type.
    pub fn build_predicate(&self, term: &str, schema: &ModelSchema) -> Option<Predicate> {
        let target = match &self.related {
            Some(relation) => relation.field_ref(),
            None => {
                let column = schema.get_column(&self.name)?;
                FieldRef::column(&column.name, column.kind)
            }
        };
        Predicate::from_input(target, self.operator, term)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
