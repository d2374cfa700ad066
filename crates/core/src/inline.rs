//! Child tables shown inside a parent's edit view, e.g. the reviews of a
//! book.

use serde::Deserialize;
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::fields::{FormField, TableField};
use crate::model_admin::{prepare_form_fields, prepare_table_fields, serialize_fields, SerializedRecord};
use crate::schema::ModelSchema;
use crate::value::Record;

fn one() -> u32 {
    1
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct InlineAdmin {
    /// The child model.
    pub schema: ModelSchema,
    /// Child column referencing the parent's primary key.
    pub fk_field: String,
    /// Empty forms offered for new children.
    #[serde(default = "one")]
    pub extra: u32,
    #[serde(default)]
    pub max_num: Option<u32>,
    #[serde(default = "yes")]
    pub can_delete: bool,
    #[serde(default)]
    pub verbose_name: String,
    #[serde(default)]
    pub table_fields: Vec<TableField>,
    #[serde(default)]
    pub form_fields: Vec<FormField>,
}

impl InlineAdmin {
    pub fn new(schema: ModelSchema, fk_field: impl Into<String>) -> Self {
        Self {
            schema,
            fk_field: fk_field.into(),
            extra: 1,
            max_num: None,
            can_delete: true,
            verbose_name: String::new(),
            table_fields: Vec::new(),
            form_fields: Vec::new(),
        }
    }

    #[must_use]
    pub fn extra(mut self, extra: u32) -> Self {
        self.extra = extra;
        self
    }

    #[must_use]
    pub fn max_num(mut self, max_num: u32) -> Self {
        self.max_num = Some(max_num);
        self
    }

    #[must_use]
    pub fn can_delete(mut self, can_delete: bool) -> Self {
        self.can_delete = can_delete;
        self
    }

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

    /// Lookup key: the child model's name.
    pub fn name(&self) -> &str {
        &self.schema.name
    }

    pub fn prepare(&mut self) -> CoreResult<()> {
        self.schema.validate()?;
        if self.schema.get_column(&self.fk_field).is_none() {
            return Err(CoreError::Validation(format!(
                "inline '{}': fk_field '{}' is not a column",
                self.schema.name, self.fk_field
            )));
        }
        if self.verbose_name.is_empty() {
            self.verbose_name = self.schema.name.clone();
        }
        prepare_table_fields(&self.schema, &mut self.table_fields)?;
        prepare_form_fields(&self.schema, &mut self.form_fields)
    }

    pub fn formset_config(&self) -> serde_json::Value {
        json!({
            "model": self.schema.name,
            "fk_field": self.fk_field,
            "extra": self.extra,
            "max_num": self.max_num,
            "can_delete": self.can_delete,
            "fields": self.form_fields,
            "table_fields": self.table_fields,
            "verbose_name": self.verbose_name,
            "title": self.verbose_name,
        })
    }

    pub fn serialize_record(&self, record: &Record, for_display: bool) -> SerializedRecord {
        serialize_fields(&self.schema, &self.table_fields, record, for_display)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::fields::Formatter;
    use crate::schema::{Column, ColumnKind};
    use crate::value::FieldValue;

    fn reviews() -> ModelSchema {
        ModelSchema::new("BookReview", "book_reviews")
            .column(Column::new("id", ColumnKind::Integer).primary_key())
            .column(Column::new("book_id", ColumnKind::Integer))
            .column(Column::new("rating", ColumnKind::Integer))
            .column(Column::new("comment", ColumnKind::Text).nullable())
    }

    #[test]
    fn fk_field_must_exist() {
        let mut inline = InlineAdmin::new(reviews(), "novel_id");
        assert_matches!(inline.prepare(), Err(CoreError::Validation(_)));
    }

    #[test]
    fn formset_config_and_serialization() {
        let mut inline = InlineAdmin::new(reviews(), "book_id")
            .extra(2)
            .table_field(TableField::new("rating").formatter(Formatter::custom(|v| {
                "*".repeat(v.as_f64().unwrap_or(0.0) as usize)
            })))
            .table_field(TableField::new("comment"));
        inline.prepare().unwrap();

        let config = inline.formset_config();
        assert_eq!(config["model"], "BookReview");
        assert_eq!(config["extra"], 2);
        assert_eq!(config["title"], "BookReview");

        let mut record = Record::new();
        record.insert("id".into(), FieldValue::Int(1));
        record.insert("rating".into(), FieldValue::Int(3));
        record.insert("comment".into(), FieldValue::Null);
        let row = inline.serialize_record(&record, true);
        assert_eq!(row["id"], "1");
        assert_eq!(row["rating"], "***");
        assert_eq!(row["comment"], "");
    }
}
