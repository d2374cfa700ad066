//! Per-model admin configuration.
//!
//! A [`ModelAdmin`] is built once at startup (in code or from a site
//! definition), normalized by [`ModelAdmin::prepare`] when it is registered,
//! and only read afterwards.

use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::fields::{DisplayType, FormField, Processor, SearchField, TableField};
use crate::filters::FilterField;
use crate::inline::InlineAdmin;
use crate::query::{FieldRef, ListQuery, OrderTerm, Predicate, MAX_PAGE_SIZE};
use crate::schema::{ensure_identifier, humanize, ColumnKind, ModelSchema};
use crate::value::{FieldValue, Record};

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const DEFAULT_MENU_GROUP: &str = "System";

fn default_per_page() -> i64 {
    DEFAULT_PER_PAGE
}

fn default_menu_group() -> String {
    DEFAULT_MENU_GROUP.to_string()
}

fn yes() -> bool {
    true
}

/// One serialized row: `id` plus one display string per table field.
pub type SerializedRecord = IndexMap<String, String>;

#[derive(Debug, Clone, Deserialize)]
pub struct ModelAdmin {
    pub schema: ModelSchema,
    #[serde(default)]
    pub verbose_name: String,
    #[serde(default)]
    pub table_fields: Vec<TableField>,
    #[serde(default)]
    pub form_fields: Vec<FormField>,
    #[serde(default)]
    pub add_form_fields: Vec<FormField>,
    #[serde(default)]
    pub add_form_title: Option<String>,
    #[serde(default)]
    pub edit_form_title: Option<String>,
    #[serde(default)]
    pub search_fields: Vec<SearchField>,
    #[serde(default)]
    pub filter_fields: Vec<FilterField>,
    #[serde(default)]
    pub inlines: Vec<InlineAdmin>,
    /// Column or table-field names; a leading `-` sorts descending.
    #[serde(default)]
    pub default_ordering: Vec<String>,
    #[serde(default = "default_per_page")]
    pub per_page: i64,
    #[serde(default = "yes")]
    pub enable_edit: bool,
    #[serde(default = "yes")]
    pub allow_add: bool,
    #[serde(default = "yes")]
    pub allow_delete: bool,
    #[serde(default = "yes")]
    pub allow_export: bool,
    #[serde(default = "default_menu_group")]
    pub menu_group: String,
    #[serde(default)]
    pub menu_icon: Option<String>,
    #[serde(default)]
    pub menu_order: i32,

    // Derived by `prepare`.
    #[serde(skip)]
    pub list_display: Vec<String>,
    #[serde(skip)]
    pub list_display_links: Vec<String>,
    #[serde(skip)]
    pub list_filter: Vec<String>,
    #[serde(skip)]
    pub list_editable: Vec<String>,
    #[serde(skip)]
    pub readonly_fields: Vec<String>,
}

impl ModelAdmin {
    pub fn new(schema: ModelSchema) -> Self {
        Self {
            schema,
            verbose_name: String::new(),
            table_fields: Vec::new(),
            form_fields: Vec::new(),
            add_form_fields: Vec::new(),
            add_form_title: None,
            edit_form_title: None,
            search_fields: Vec::new(),
            filter_fields: Vec::new(),
            inlines: Vec::new(),
            default_ordering: Vec::new(),
            per_page: DEFAULT_PER_PAGE,
            enable_edit: true,
            allow_add: true,
            allow_delete: true,
            allow_export: true,
            menu_group: default_menu_group(),
            menu_icon: None,
            menu_order: 0,
            list_display: Vec::new(),
            list_display_links: Vec::new(),
            list_filter: Vec::new(),
            list_editable: Vec::new(),
            readonly_fields: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.schema.name
    }

    // -- builder ------------------------------------------------------------

    #[must_use]
    pub fn verbose_name(mut self, name: impl Into<String>) -> Self {
        self.verbose_name = name.into();
        self
    }

    #[must_use]
    pub fn table_field(mut self, field: TableField) -> Self {
        self.table_fields.push(field);
        self
    }

    #[must_use]
    pub fn form_field(mut self, field: FormField) -> Self {
        self.form_fields.push(field);
        self
    }

    #[must_use]
    pub fn add_form_field(mut self, field: FormField) -> Self {
        self.add_form_fields.push(field);
        self
    }

    #[must_use]
    pub fn add_form_title(mut self, title: impl Into<String>) -> Self {
        self.add_form_title = Some(title.into());
        self
    }

    #[must_use]
    pub fn edit_form_title(mut self, title: impl Into<String>) -> Self {
        self.edit_form_title = Some(title.into());
        self
    }

    #[must_use]
    pub fn search_field(mut self, field: SearchField) -> Self {
        self.search_fields.push(field);
        self
    }

    #[must_use]
    pub fn filter_field(mut self, field: FilterField) -> Self {
        self.filter_fields.push(field);
        self
    }

    #[must_use]
    pub fn inline(mut self, inline: InlineAdmin) -> Self {
        self.inlines.push(inline);
        self
    }

    #[must_use]
    pub fn default_ordering<S: Into<String>>(mut self, ordering: impl IntoIterator<Item = S>) -> Self {
        self.default_ordering = ordering.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn per_page(mut self, per_page: i64) -> Self {
        self.per_page = per_page;
        self
    }

    #[must_use]
    pub fn enable_edit(mut self, enabled: bool) -> Self {
        self.enable_edit = enabled;
        self
    }

    #[must_use]
    pub fn allow_add(mut self, allowed: bool) -> Self {
        self.allow_add = allowed;
        self
    }

    #[must_use]
    pub fn allow_delete(mut self, allowed: bool) -> Self {
        self.allow_delete = allowed;
        self
    }

    #[must_use]
    pub fn allow_export(mut self, allowed: bool) -> Self {
        self.allow_export = allowed;
        self
    }

    #[must_use]
    pub fn menu(mut self, group: impl Into<String>, icon: impl Into<String>, order: i32) -> Self {
        self.menu_group = group.into();
        self.menu_icon = Some(icon.into());
        self.menu_order = order;
        self
    }

    // -- normalization ------------------------------------------------------

    /// Fill defaults, validate every referenced name and compute the derived
    /// lists. Idempotent.
    pub fn prepare(&mut self) -> CoreResult<()> {
        self.schema.validate()?;
        if self.verbose_name.is_empty() {
            self.verbose_name = self.schema.name.clone();
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.per_page) {
            return Err(CoreError::Validation(format!(
                "model '{}': per_page must be between 1 and {MAX_PAGE_SIZE}",
                self.schema.name
            )));
        }

        prepare_table_fields(&self.schema, &mut self.table_fields)?;

        if self.form_fields.is_empty() {
            self.form_fields = derive_form_fields(&self.table_fields);
        }
        prepare_form_fields(&self.schema, &mut self.form_fields)?;
        if self.add_form_fields.is_empty() {
            self.add_form_fields = self.form_fields.clone();
        }
        prepare_form_fields(&self.schema, &mut self.add_form_fields)?;

        for field in &mut self.search_fields {
            ensure_identifier("search field", &field.name)?;
            match &field.related {
                Some(relation) => relation.validate(&self.schema)?,
                None if self.schema.get_column(&field.name).is_none() => {
                    return Err(CoreError::Validation(format!(
                        "search field '{}' is not a column of '{}'",
                        field.name, self.schema.name
                    )));
                }
                None => {}
            }
            if field.label.is_empty() {
                field.label = humanize(&field.name);
            }
        }

        for filter in &mut self.filter_fields {
            filter.validate(&self.schema)?;
            if filter.label.is_empty() {
                filter.label = humanize(&filter.name);
            }
        }

        for entry in &self.default_ordering {
            let name = entry.strip_prefix('-').unwrap_or(entry);
            if self.sort_target(name).is_none() {
                return Err(CoreError::Validation(format!(
                    "model '{}': cannot order by unknown field '{name}'",
                    self.schema.name
                )));
            }
        }

        for inline in &mut self.inlines {
            inline.prepare()?;
        }

        self.list_display = self
            .table_fields
            .iter()
            .filter(|f| f.is_visible())
            .map(|f| f.name.clone())
            .collect();
        self.list_display_links = self
            .table_fields
            .iter()
            .filter(|f| f.is_visible() && f.is_link)
            .map(|f| f.name.clone())
            .collect();
        self.list_filter = self
            .table_fields
            .iter()
            .filter(|f| f.filterable)
            .map(|f| f.name.clone())
            .collect();
        self.list_editable = self
            .table_fields
            .iter()
            .filter(|f| f.editable && !f.readonly)
            .map(|f| f.name.clone())
            .collect();
        self.readonly_fields = self
            .table_fields
            .iter()
            .filter(|f| f.readonly)
            .map(|f| f.name.clone())
            .collect();
        Ok(())
    }

    pub fn get_field(&self, name: &str) -> Option<&TableField> {
        self.table_fields.iter().find(|f| f.name == name)
    }

    pub fn get_inline(&self, model_name: &str) -> Option<&InlineAdmin> {
        self.inlines.iter().find(|i| i.name() == model_name)
    }

    // -- querying -----------------------------------------------------------

    /// Search term OR-ed across the search fields, AND-ed with every active
    /// filter.
    pub fn build_predicates(&self, query: &ListQuery) -> CoreResult<Vec<Predicate>> {
        let mut predicates = Vec::new();
        if let (Some(term), false) = (&query.search, self.search_fields.is_empty()) {
            let any = self
                .search_fields
                .iter()
                .filter_map(|field| field.build_predicate(term, &self.schema))
                .collect();
            predicates.push(Predicate::Any(any));
        }
        for filter in &self.filter_fields {
            predicates.extend(filter.build_predicates(query, &self.schema)?);
        }
        Ok(predicates)
    }

    /// Predicates for the per-field search endpoint: `search_<field>` values,
    /// AND-ed. A value that cannot be compared with its field matches nothing.
    pub fn field_search_predicates(&self, params: &[(String, String)]) -> Vec<Predicate> {
        self.search_fields
            .iter()
            .filter_map(|field| {
                let key = format!("search_{}", field.name);
                let term = params
                    .iter()
                    .rev()
                    .find(|(k, _)| *k == key)
                    .map(|(_, v)| v.trim())
                    .filter(|v| !v.is_empty())?;
                Some(
                    field
                        .build_predicate(term, &self.schema)
                        .unwrap_or_else(|| Predicate::Any(Vec::new())),
                )
            })
            .collect()
    }

    fn sort_target(&self, name: &str) -> Option<FieldRef> {
        self.get_field(name)
            .and_then(|f| f.field_ref(&self.schema))
            .or_else(|| {
                self.schema
                    .get_column(name)
                    .map(|c| FieldRef::column(&c.name, c.kind))
            })
    }

    /// Ordering for a list request, always ending with a primary-key
    /// tie-break so pagination is stable.
    pub fn resolve_ordering(&self, sort: Option<&str>, descending: bool) -> CoreResult<Vec<OrderTerm>> {
        let mut terms = Vec::new();
        match sort {
            Some(name) => {
                let target = self.sort_target(name).ok_or_else(|| {
                    CoreError::Validation(format!("cannot sort by unknown field '{name}'"))
                })?;
                terms.push(OrderTerm { target, descending });
            }
            None => {
                for entry in &self.default_ordering {
                    let (name, descending) = match entry.strip_prefix('-') {
                        Some(name) => (name, true),
                        None => (entry.as_str(), false),
                    };
                    if let Some(target) = self.sort_target(name) {
                        terms.push(OrderTerm { target, descending });
                    }
                }
            }
        }
        let pk = self.schema.primary_key();
        let pk_ref = FieldRef::column(&pk.name, pk.kind);
        if !terms.iter().any(|t| t.target == pk_ref) {
            terms.push(OrderTerm {
                target: pk_ref,
                descending: false,
            });
        }
        Ok(terms)
    }

    // -- output -------------------------------------------------------------

    pub fn serialize_record(&self, record: &Record, for_display: bool) -> SerializedRecord {
        serialize_fields(&self.schema, &self.table_fields, record, for_display)
    }

    /// Raw values that prefill the edit form: `id` plus one entry per edit
    /// form field, keyed by column. Password inputs are never prefilled.
    pub fn edit_values(&self, record: &Record) -> SerializedRecord {
        let mut out = SerializedRecord::new();
        let pk = &self.schema.primary_key().name;
        out.insert(
            "id".to_string(),
            record
                .get(pk)
                .map(FieldValue::to_display_string)
                .unwrap_or_default(),
        );
        for field in &self.form_fields {
            let secret = field.field_type == Some(DisplayType::Password)
                || matches!(field.processor, Some(Processor::HashPassword));
            if secret {
                continue;
            }
            let text = record
                .get(&field.name)
                .map(FieldValue::to_display_string)
                .unwrap_or_default();
            out.insert(field.name.clone(), text);
        }
        out
    }

    pub fn add_title(&self) -> String {
        self.add_form_title
            .clone()
            .unwrap_or_else(|| format!("Add {}", self.verbose_name))
    }

    pub fn edit_title(&self) -> String {
        self.edit_form_title
            .clone()
            .unwrap_or_else(|| format!("Edit {}", self.verbose_name))
    }

    /// Everything the list page script needs, camelCase at the top level.
    pub fn frontend_config(&self) -> serde_json::Value {
        let table_fields: Vec<_> = self
            .table_fields
            .iter()
            .map(|f| {
                let mut value = json!(f);
                value["renders_html"] = json!(f.effective_display_type().renders_html());
                value
            })
            .collect();
        json!({
            "modelName": self.schema.name,
            "verboseName": self.verbose_name,
            "primaryKey": self.schema.primary_key().name,
            "pageSize": self.per_page,
            "tableFields": table_fields,
            "formFields": self.form_fields,
            "addFormFields": self.add_form_fields,
            "addFormTitle": self.add_title(),
            "editFormTitle": self.edit_title(),
            "searchFields": self.search_fields,
            "filterFields": self
                .filter_fields
                .iter()
                .map(FilterField::to_config)
                .collect::<Vec<_>>(),
            "inlines": self
                .inlines
                .iter()
                .map(InlineAdmin::formset_config)
                .collect::<Vec<_>>(),
            "defaultOrdering": self.default_ordering,
            "enableEdit": self.enable_edit,
            "allowAdd": self.allow_add,
            "allowDelete": self.allow_delete,
            "allowExport": self.allow_export,
        })
    }

    /// Column values from submitted form data, restricted to `fields`.
    ///
    /// Readonly fields and fields absent from the submission are skipped;
    /// when `creating`, a missing required field is an error.
    pub fn form_values(
        &self,
        pairs: &[(String, String)],
        fields: &[FormField],
        creating: bool,
    ) -> CoreResult<Vec<(String, FieldValue)>> {
        let mut values = Vec::new();
        for field in fields.iter().filter(|f| !f.readonly) {
            let column = self.schema.get_column(&field.name).ok_or_else(|| {
                CoreError::Validation(format!("form field '{}' is not a column", field.name))
            })?;
            let submitted = pairs.iter().rev().find(|(k, _)| *k == field.name);
            let raw = match submitted {
                Some((_, raw)) => raw.as_str(),
                None if column.kind == ColumnKind::Boolean && creating => "",
                None if creating && field.required => {
                    return Err(CoreError::Validation(format!("{} is required", field.label)));
                }
                None => continue,
            };
            if let Some(value) = field.process_value(raw, column)? {
                values.push((field.name.clone(), value));
            }
        }
        Ok(values)
    }
}

// ---------------------------------------------------------------------------
// Shared with inline admins
// ---------------------------------------------------------------------------

pub(crate) fn prepare_table_fields(schema: &ModelSchema, fields: &mut Vec<TableField>) -> CoreResult<()> {
    if fields.is_empty() {
        *fields = schema
            .columns
            .iter()
            .map(|c| TableField::new(&c.name))
            .collect();
    }
    let pk = schema.primary_key().name.clone();
    for i in 0..fields.len() {
        let field = &mut fields[i];
        ensure_identifier("table field", &field.name)?;
        if let Some(formatter) = &field.formatter {
            formatter.validate()?;
        }
        match &field.related {
            Some(relation) => {
                relation.validate(schema)?;
                field.editable = false;
                field.display_type.get_or_insert(DisplayType::Text);
                if field.label.is_empty() {
                    field.label = humanize(&relation.display_field);
                }
            }
            None => {
                let column = schema.get_column(&field.name).ok_or_else(|| {
                    CoreError::Validation(format!(
                        "table field '{}' is not a column of '{}'",
                        field.name, schema.name
                    ))
                })?;
                if column.name == pk {
                    field.readonly = true;
                    field.editable = false;
                } else if column.kind == ColumnKind::DateTime {
                    field.readonly = true;
                    field.sortable = true;
                    field.display_type.get_or_insert(DisplayType::DateTime);
                }
                field.display_type.get_or_insert(DisplayType::for_kind(column.kind));
                if field.label.is_empty() {
                    field.label = column.display_label();
                }
            }
        }
        let name = &fields[i].name;
        if fields[..i].iter().any(|f| &f.name == name) {
            return Err(CoreError::Validation(format!(
                "table field '{name}' is declared twice on '{}'",
                schema.name
            )));
        }
    }
    Ok(())
}

fn derive_form_fields(table_fields: &[TableField]) -> Vec<FormField> {
    table_fields
        .iter()
        .filter(|f| !f.readonly && f.related.is_none())
        .map(|f| {
            let mut form = FormField::new(&f.name).label(&f.label);
            form.field_type = f.display_type;
            form
        })
        .collect()
}

pub(crate) fn prepare_form_fields(schema: &ModelSchema, fields: &mut [FormField]) -> CoreResult<()> {
    for field in fields.iter_mut() {
        let column = schema.get_column(&field.name).ok_or_else(|| {
            CoreError::Validation(format!(
                "form field '{}' is not a column of '{}'",
                field.name, schema.name
            ))
        })?;
        if let Some(relation) = &field.related {
            relation.validate(schema)?;
        }
        if field.label.is_empty() {
            field.label = column.display_label();
        }
        field.field_type.get_or_insert(DisplayType::for_kind(column.kind));
    }
    Ok(())
}

/// `id` plus one display string per table field; null becomes `''` and the
/// formatter runs only for display on non-null, non-related values.
pub(crate) fn serialize_fields(
    schema: &ModelSchema,
    fields: &[TableField],
    record: &Record,
    for_display: bool,
) -> SerializedRecord {
    let mut out = SerializedRecord::new();
    let pk = &schema.primary_key().name;
    out.insert(
        "id".to_string(),
        record
            .get(pk)
            .map(FieldValue::to_display_string)
            .unwrap_or_default(),
    );
    for field in fields {
        let value = record.get(&field.value_key()).unwrap_or(&FieldValue::Null);
        let text = match (&field.formatter, &field.related) {
            _ if value.is_null() => String::new(),
            (Some(formatter), None) if for_display => formatter.apply(value),
            _ => value.to_display_string(),
        };
        out.insert(field.name.clone(), text);
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::fields::{Formatter, Relation};
    use crate::query::Operator;
    use crate::schema::Column;

    fn books() -> ModelSchema {
        ModelSchema::new("Book", "books")
            .column(Column::new("id", ColumnKind::Integer).primary_key())
            .column(Column::new("title", ColumnKind::Text))
            .column(Column::new("in_print", ColumnKind::Boolean))
            .column(Column::new("publisher_id", ColumnKind::Integer).nullable())
            .column(Column::new("created_at", ColumnKind::DateTime))
    }

    fn publisher() -> Relation {
        Relation::new("publishers", "publisher_id", "name")
    }

    fn book_admin() -> ModelAdmin {
        let mut admin = ModelAdmin::new(books())
            .table_field(TableField::new("id"))
            .table_field(TableField::new("title").sortable(true).link())
            .table_field(TableField::new("in_print").formatter(Formatter::choices([
                ("true", "Yes"),
                ("false", "No"),
            ])))
            .table_field(TableField::related("publisher_name", publisher()))
            .table_field(TableField::new("created_at"))
            .form_field(FormField::new("title").required())
            .form_field(FormField::new("in_print").field_type(DisplayType::Switch))
            .form_field(FormField::new("publisher_id").related(publisher()))
            .search_field(SearchField::new("title"))
            .search_field(SearchField::new("publisher_name").related(publisher()))
            .search_field(SearchField::new("id").operator(Operator::Exact))
            .filter_field(FilterField::boolean("in_print", "In print"))
            .default_ordering(["-created_at"]);
        admin.prepare().expect("valid admin");
        admin
    }

    fn params(raw: &[(&str, &str)]) -> Vec<(String, String)> {
        raw.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn prepare_derives_defaults() {
        let mut admin = ModelAdmin::new(books());
        admin.prepare().unwrap();
        assert_eq!(admin.verbose_name, "Book");
        assert_eq!(admin.table_fields.len(), 5);

        let id = admin.get_field("id").unwrap();
        assert!(id.readonly && !id.editable);
        let created = admin.get_field("created_at").unwrap();
        assert!(created.readonly && created.sortable);
        assert_eq!(created.display_type, Some(DisplayType::DateTime));
        assert_eq!(created.label, "Created At");

        let form: Vec<_> = admin.form_fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(form, ["title", "in_print", "publisher_id"]);
        assert_eq!(admin.add_form_fields.len(), admin.form_fields.len());
        assert_eq!(admin.readonly_fields, ["id", "created_at"]);
        assert_eq!(admin.list_editable, ["title", "in_print", "publisher_id"]);
    }

    #[test]
    fn prepare_rejects_unknown_names() {
        let mut admin = ModelAdmin::new(books()).table_field(TableField::new("isbn"));
        assert_matches!(admin.prepare(), Err(CoreError::Validation(_)));

        let mut admin = ModelAdmin::new(books()).default_ordering(["-nope"]);
        assert_matches!(admin.prepare(), Err(CoreError::Validation(_)));

        let mut admin = ModelAdmin::new(books())
            .table_field(TableField::new("title"))
            .table_field(TableField::new("title"));
        assert_matches!(admin.prepare(), Err(CoreError::Validation(m)) if m.contains("twice"));
    }

    #[test]
    fn prepare_is_idempotent() {
        let mut admin = book_admin();
        let before = admin.frontend_config();
        admin.prepare().unwrap();
        assert_eq!(admin.frontend_config(), before);
    }

    #[test]
    fn search_is_or_of_buildable_fields() {
        let admin = book_admin();
        let query = ListQuery::from_params(&params(&[("search", "dune")]), 10).unwrap();
        let predicates = admin.build_predicates(&query).unwrap();
        // "dune" is not an integer, so the exact id lookup is skipped.
        assert_matches!(predicates.as_slice(), [Predicate::Any(any)] if any.len() == 2);
    }

    #[test]
    fn search_and_filters_are_combined() {
        let admin = book_admin();
        let query = ListQuery::from_params(
            &params(&[("search", "7"), ("in_print", "true")]),
            10,
        )
        .unwrap();
        let predicates = admin.build_predicates(&query).unwrap();
        assert_eq!(predicates.len(), 2);
        assert_matches!(&predicates[0], Predicate::Any(any) if any.len() == 3);
    }

    #[test]
    fn field_search_uses_prefixed_params() {
        let admin = book_admin();
        let predicates =
            admin.field_search_predicates(&params(&[("search_title", "dune"), ("search_id", "x")]));
        assert_eq!(predicates.len(), 2);
        assert_matches!(&predicates[1], Predicate::Any(any) if any.is_empty());
    }

    #[test]
    fn ordering_defaults_and_tie_break() {
        let admin = book_admin();
        let terms = admin.resolve_ordering(None, false).unwrap();
        assert_eq!(terms.len(), 2);
        assert!(terms[0].descending);
        assert_eq!(terms[1].target, FieldRef::column("id", ColumnKind::Integer));

        let terms = admin.resolve_ordering(Some("publisher_name"), true).unwrap();
        assert_matches!(&terms[0].target, FieldRef::Related(r) if r.display_field == "name");

        let terms = admin.resolve_ordering(Some("id"), true).unwrap();
        assert_eq!(terms.len(), 1);

        assert_matches!(
            admin.resolve_ordering(Some("price"), false),
            Err(CoreError::Validation(_))
        );
    }

    #[test]
    fn serialization_flattens_relations_and_formats() {
        let admin = book_admin();
        let mut record = Record::new();
        record.insert("id".into(), FieldValue::Int(3));
        record.insert("title".into(), FieldValue::Text("Dune".into()));
        record.insert("in_print".into(), FieldValue::Bool(true));
        record.insert("publisher_id".into(), FieldValue::Int(9));
        record.insert(
            "created_at".into(),
            FieldValue::DateTime(Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap()),
        );
        record.insert("r_publisher_id__name".into(), FieldValue::Null);

        let display = admin.serialize_record(&record, true);
        assert_eq!(display["id"], "3");
        assert_eq!(display["in_print"], "Yes");
        assert_eq!(display["publisher_name"], "");
        assert_eq!(display["created_at"], "2024-01-02 03:04:05");

        let raw = admin.serialize_record(&record, false);
        assert_eq!(raw["in_print"], "true");
    }

    #[test]
    fn edit_values_carry_foreign_keys_of_form_fields() {
        let admin = book_admin();
        let mut record = Record::new();
        record.insert("id".into(), FieldValue::Int(1));
        record.insert("title".into(), FieldValue::Text("Dune".into()));
        record.insert("in_print".into(), FieldValue::Bool(false));
        record.insert("publisher_id".into(), FieldValue::Int(7));
        record.insert("r_publisher_id__name".into(), FieldValue::Text("Ace".into()));

        // The table only shows the publisher name, keyed by the virtual field.
        let raw = admin.serialize_record(&record, false);
        assert_eq!(raw["publisher_name"], "Ace");

        let form = admin.edit_values(&record);
        assert_eq!(form["id"], "1");
        assert_eq!(form["publisher_id"], "7");
        assert_eq!(form["in_print"], "false");

        // Resubmitting the prefilled form keeps the foreign key.
        let pairs: Vec<(String, String)> = form
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let values = admin.form_values(&pairs, &admin.form_fields, false).unwrap();
        assert!(values.contains(&("publisher_id".to_string(), FieldValue::Int(7))));
        assert!(values.contains(&("title".to_string(), FieldValue::Text("Dune".into()))));
    }

    #[test]
    fn edit_values_never_expose_password_hashes() {
        let schema = ModelSchema::new("Account", "accounts")
            .column(Column::new("id", ColumnKind::Integer).primary_key())
            .column(Column::new("username", ColumnKind::Text))
            .column(Column::new("password_hash", ColumnKind::Text));
        let mut admin = ModelAdmin::new(schema)
            .form_field(FormField::new("username"))
            .form_field(FormField::new("password_hash").processor(Processor::HashPassword));
        admin.prepare().unwrap();

        let mut record = Record::new();
        record.insert("id".into(), FieldValue::Int(2));
        record.insert("username".into(), FieldValue::Text("root".into()));
        record.insert("password_hash".into(), FieldValue::Text("$argon2id$x".into()));

        let form = admin.edit_values(&record);
        assert_eq!(form.get("username").map(String::as_str), Some("root"));
        assert!(!form.contains_key("password_hash"));
    }

    #[test]
    fn form_values_skip_readonly_and_absent_fields() {
        let admin = book_admin();
        let values = admin
            .form_values(
                &params(&[("id", "99"), ("title", "Emma"), ("publisher_id", "")]),
                &admin.form_fields,
                false,
            )
            .unwrap();
        let names: Vec<_> = values.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["title", "publisher_id"]);
        assert_eq!(values[1].1, FieldValue::Null);
    }

    #[test]
    fn unchecked_checkbox_is_false_on_create() {
        let admin = book_admin();
        let values = admin
            .form_values(&params(&[("title", "Emma")]), &admin.add_form_fields, true)
            .unwrap();
        assert!(values.contains(&("in_print".to_string(), FieldValue::Bool(false))));
    }

    #[test]
    fn frontend_config_is_camel_case() {
        let config = book_admin().frontend_config();
        assert_eq!(config["modelName"], "Book");
        assert_eq!(config["pageSize"], 10);
        assert_eq!(config["addFormTitle"], "Add Book");
        assert_eq!(config["tableFields"][3]["name"], "publisher_name");
        assert_eq!(config["filterFields"][0]["type"], "boolean");
    }
}
