//! View models handed to the page templates.

use oxadmin_core::fields::{DisplayType, FormField, TableField};
use oxadmin_core::filters::{FilterField, FilterType};
use oxadmin_core::model_admin::{ModelAdmin, SerializedRecord};
use oxadmin_core::query::ListQuery;
use oxadmin_core::value::parse_bool;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptionItem {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

fn options<'a>(
    pairs: impl IntoIterator<Item = (&'a str, &'a str)>,
    current: Option<&str>,
) -> Vec<OptionItem> {
    pairs
        .into_iter()
        .map(|(value, label)| OptionItem {
            value: value.to_string(),
            label: label.to_string(),
            selected: current == Some(value),
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Forms
// ---------------------------------------------------------------------------

/// One rendered form control.
#[derive(Debug, Clone, Serialize)]
pub struct FormInput {
    pub name: String,
    pub label: String,
    /// `text`, `number`, `date`, `datetime-local`, `email`, `password`,
    /// `checkbox`, `select`, `textarea` or `image`.
    pub input: &'static str,
    pub required: bool,
    pub readonly: bool,
    pub placeholder: String,
    pub help_text: String,
    pub value: String,
    pub checked: bool,
    pub options: Vec<OptionItem>,
    pub accept: String,
    pub upload_path: String,
}

pub fn input_kind(field: &FormField) -> &'static str {
    if field.choices.is_some() || field.related.is_some() {
        return "select";
    }
    match field.field_type.unwrap_or(DisplayType::Text) {
        DisplayType::Number => "number",
        DisplayType::Date => "date",
        DisplayType::DateTime => "datetime-local",
        DisplayType::Boolean | DisplayType::Switch => "checkbox",
        DisplayType::Select | DisplayType::Radio | DisplayType::Status | DisplayType::ForeignKey => {
            "select"
        }
        DisplayType::Image | DisplayType::FileUpload => "image",
        DisplayType::Email => "email",
        DisplayType::Password => "password",
        DisplayType::Textarea | DisplayType::Html | DisplayType::Json => "textarea",
        DisplayType::Text | DisplayType::Link => "text",
    }
}

impl FormInput {
    /// `related` holds the `(primary key, label)` options of a relation field.
    pub fn new(field: &FormField, submitted: Option<&str>, related: &[(String, String)]) -> Self {
        let input = input_kind(field);
        let value = match input {
            "password" => String::new(),
            _ => submitted
                .or(field.default_value.as_deref())
                .unwrap_or_default()
                .to_string(),
        };
        let options = match &field.choices {
            Some(choices) => options(choices.iter().map(|(k, v)| (k.as_str(), v.as_str())), Some(&value)),
            None => options(related.iter().map(|(k, v)| (k.as_str(), v.as_str())), Some(&value)),
        };
        Self {
            name: field.name.clone(),
            label: field.label.clone(),
            input,
            required: field.required,
            readonly: field.readonly,
            placeholder: field.placeholder.clone().unwrap_or_default(),
            help_text: field.help_text.clone().unwrap_or_default(),
            checked: parse_bool(&value) == Some(true),
            value,
            options,
            accept: field.accept.clone().unwrap_or_else(|| "image/*".to_string()),
            upload_path: field.upload_path.clone().unwrap_or_default(),
        }
    }
}

// ---------------------------------------------------------------------------
// List table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct ColumnView {
    pub name: String,
    pub label: String,
    pub sortable: bool,
    pub width: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Cell {
    pub text: String,
    /// Formatter output that is already escaped markup.
    pub html: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowView {
    pub id: String,
    pub cells: Vec<Cell>,
}

pub fn visible_fields(admin: &ModelAdmin) -> impl Iterator<Item = &TableField> {
    admin.table_fields.iter().filter(|f| f.is_visible())
}

pub fn columns(admin: &ModelAdmin) -> Vec<ColumnView> {
    visible_fields(admin)
        .map(|f| ColumnView {
            name: f.name.clone(),
            label: f.label.clone(),
            sortable: f.sortable,
            width: f.width.clone(),
        })
        .collect()
}

pub fn row_view(admin: &ModelAdmin, display: &SerializedRecord) -> RowView {
    RowView {
        id: display.get("id").cloned().unwrap_or_default(),
        cells: visible_fields(admin)
            .map(|f| Cell {
                text: display.get(&f.name).cloned().unwrap_or_default(),
                html: f.formatter.is_some() && f.effective_display_type().renders_html(),
            })
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Filters and paging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
pub struct FilterView {
    pub name: String,
    pub label: String,
    pub filter_type: FilterType,
    pub placeholder: String,
    pub options: Vec<OptionItem>,
    pub value: String,
    /// Lower bound of a range filter.
    pub start: String,
    /// Upper bound of a range filter.
    pub end: String,
}

/// `loaded` holds choices read from a related table.
pub fn filter_view(filter: &FilterField, query: &ListQuery, loaded: &[String]) -> FilterView {
    let current = |suffix: &str| {
        query
            .filter(&format!("{}{suffix}", filter.name))
            .unwrap_or_default()
            .to_string()
    };
    let value = current("");
    let (start_suffix, end_suffix) = match filter.filter_type {
        FilterType::NumberRange => ("_min", "_max"),
        _ => ("_start", "_end"),
    };
    let option_items = match (&filter.choices, filter.filter_type) {
        (Some(choices), _) => options(choices.iter().map(|(k, v)| (k.as_str(), v.as_str())), Some(&value)),
        (None, FilterType::Boolean) => options([("true", "Yes"), ("false", "No")], Some(&value)),
        (None, _) => options(loaded.iter().map(|v| (v.as_str(), v.as_str())), Some(&value)),
    };
    FilterView {
        name: filter.name.clone(),
        label: filter.label.clone(),
        filter_type: filter.filter_type,
        placeholder: filter.placeholder.clone().unwrap_or_default(),
        options: option_items,
        start: current(start_suffix),
        end: current(end_suffix),
        value,
    }
}

/// Encoded pairs followed by `&`, ready to prefix more parameters.
pub fn query_prefix(pairs: &[(&str, &str)]) -> String {
    if pairs.is_empty() {
        return String::new();
    }
    let mut encoded = serde_urlencoded::to_string(pairs).unwrap_or_default();
    encoded.push('&');
    encoded
}

/// Search term and filter values of the current request.
pub fn keep_query(query: &ListQuery) -> String {
    let mut pairs: Vec<(&str, &str)> = Vec::new();
    if let Some(search) = &query.search {
        pairs.push(("search", search));
    }
    for (name, value) in &query.filters {
        if !value.trim().is_empty() {
            pairs.push((name, value));
        }
    }
    query_prefix(&pairs)
}

/// Current ordering, for pagination links.
pub fn sort_query(query: &ListQuery) -> String {
    match &query.sort {
        Some(sort) => query_prefix(&[
            ("sort", sort),
            ("order", if query.descending { "desc" } else { "asc" }),
        ]),
        None => String::new(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pager {
    pub first_row: i64,
    pub last_row: i64,
    pub prev_offset: Option<i64>,
    pub next_offset: Option<i64>,
}

pub fn pager(total: i64, offset: i64, limit: i64, shown: usize) -> Pager {
    let shown = shown as i64;
    Pager {
        first_row: if shown == 0 { 0 } else { offset + 1 },
        last_row: offset + shown,
        prev_offset: (offset > 0).then(|| (offset - limit).max(0)),
        next_offset: (offset + shown < total).then_some(offset + limit),
    }
}
