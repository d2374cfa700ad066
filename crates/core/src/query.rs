//! Database-agnostic query description.
//!
//! Descriptors translate request parameters into [`Predicate`]s and
//! [`OrderTerm`]s; the db crate turns them into SQL. Nothing here knows about
//! placeholders or quoting.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::fields::Relation;
use crate::schema::ColumnKind;
use crate::value::FieldValue;

/// Upper bound for `limit` on list endpoints.
pub const MAX_PAGE_SIZE: i64 = 500;

/// Query parameters with a fixed meaning; everything else is a filter value.
pub const RESERVED_PARAMS: &[&str] = &["limit", "offset", "search", "sort", "order", "_"];

// ---------------------------------------------------------------------------
// Operators
// ---------------------------------------------------------------------------

/// Django-style field lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    Exact,
    Iexact,
    Contains,
    #[default]
    Icontains,
    Startswith,
    Istartswith,
    Endswith,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Operator {
    /// Whether the lookup is a pattern match on the text form of the value.
    pub fn is_pattern(self) -> bool {
        matches!(
            self,
            Operator::Iexact
                | Operator::Contains
                | Operator::Icontains
                | Operator::Startswith
                | Operator::Istartswith
                | Operator::Endswith
        )
    }

    /// SQL comparison operator.
    pub fn sql(self) -> &'static str {
        match self {
            Operator::Exact => "=",
            Operator::Contains | Operator::Startswith | Operator::Endswith => "LIKE",
            Operator::Iexact | Operator::Icontains | Operator::Istartswith => "ILIKE",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
        }
    }

    /// LIKE pattern for a raw search term; the term itself is escaped.
    pub fn pattern(self, term: &str) -> String {
        let escaped = escape_like(term);
        match self {
            Operator::Contains | Operator::Icontains => format!("%{escaped}%"),
            Operator::Startswith | Operator::Istartswith => format!("{escaped}%"),
            Operator::Endswith => format!("%{escaped}"),
            _ => escaped,
        }
    }
}

/// Escape LIKE metacharacters (`\`, `%`, `_`) so user input matches literally.
pub fn escape_like(term: &str) -> String {
    let mut out = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// ---------------------------------------------------------------------------
// Predicates and ordering
// ---------------------------------------------------------------------------

/// What a predicate or ordering term refers to.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldRef {
    /// A column of the model's own table.
    Column { name: String, kind: ColumnKind },
    /// The display column of a one-hop related table, compared as text.
    Related(Relation),
}

impl FieldRef {
    pub fn column(name: impl Into<String>, kind: ColumnKind) -> Self {
        FieldRef::Column {
            name: name.into(),
            kind,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Compare {
        target: FieldRef,
        op: Operator,
        /// For pattern operators this is the raw term; the SQL layer builds
        /// the pattern with [`Operator::pattern`].
        value: FieldValue,
    },
    /// OR-group. An empty group matches no row.
    Any(Vec<Predicate>),
}

impl Predicate {
    pub fn compare(target: FieldRef, op: Operator, value: FieldValue) -> Self {
        Predicate::Compare { target, op, value }
    }

    /// Build a comparison from user input, parsing `raw` for the target's
    /// kind unless the operator is a pattern match.
    ///
    /// Returns `None` when the input cannot be compared with the target,
    /// e.g. a non-numeric term against an integer column.
    pub fn from_input(target: FieldRef, op: Operator, raw: &str) -> Option<Predicate> {
        let value = match (&target, op.is_pattern()) {
            (_, true) | (FieldRef::Related(_), false) => FieldValue::Text(raw.to_string()),
            (FieldRef::Column { kind, .. }, false) => FieldValue::parse(*kind, raw).ok()?,
        };
        Some(Predicate::compare(target, op, value))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderTerm {
    pub target: FieldRef,
    pub descending: bool,
}

// ---------------------------------------------------------------------------
// List parameters
// ---------------------------------------------------------------------------

/// Parsed list/data query string.
#[derive(Debug, Clone, PartialEq)]
pub struct ListQuery {
    pub limit: i64,
    pub offset: i64,
    pub search: Option<String>,
    pub sort: Option<String>,
    pub descending: bool,
    /// Every non-reserved parameter, last occurrence wins.
    pub filters: IndexMap<String, String>,
}

impl ListQuery {
    /// Parse raw query pairs. `limit` defaults to `per_page` and is clamped
    /// to `1..=MAX_PAGE_SIZE`; a negative `offset` becomes zero.
    pub fn from_params(params: &[(String, String)], per_page: i64) -> CoreResult<Self> {
        let mut query = ListQuery {
            limit: per_page,
            offset: 0,
            search: None,
            sort: None,
            descending: false,
            filters: IndexMap::new(),
        };
        for (key, value) in params {
            match key.as_str() {
                "limit" => query.limit = parse_int("limit", value)?,
                "offset" => query.offset = parse_int("offset", value)?,
                "search" => query.search = non_empty(value),
                "sort" => query.sort = non_empty(value),
                "order" => query.descending = value.eq_ignore_ascii_case("desc"),
                "_" => {}
                _ => {
                    query.filters.insert(key.clone(), value.clone());
                }
            }
        }
        query.limit = query.limit.clamp(1, MAX_PAGE_SIZE);
        query.offset = query.offset.max(0);
        Ok(query)
    }

    pub fn filter(&self, name: &str) -> Option<&str> {
        self.filters
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }
}

fn parse_int(name: &str, raw: &str) -> CoreResult<i64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(CoreError::Validation(format!("{name} must be an integer")));
    }
    raw.parse()
        .map_err(|_| CoreError::Validation(format!("{name} must be an integer, got '{raw}'")))
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
