//! Filter widgets shown above the list table and the predicates they add.

use chrono::{Days, NaiveDate};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{CoreError, CoreResult};
use crate::fields::Relation;
pub use crate::query::Operator;
use crate::query::{FieldRef, ListQuery, Predicate, RESERVED_PARAMS};
use crate::schema::{ensure_identifier, ColumnKind, ModelSchema};
use crate::value::{parse_bool, parse_date, parse_datetime, FieldValue};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    Input,
    Select,
    DateRange,
    NumberRange,
    Boolean,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterField {
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub filter_type: FilterType,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub default_value: Option<String>,
    #[serde(default)]
    pub width: Option<String>,
    #[serde(default)]
    pub choices: Option<IndexMap<String, String>>,
    /// Lookup for `Input` filters; defaults to `icontains`.
    #[serde(default)]
    pub operator: Option<Operator>,
    #[serde(default)]
    pub min_value: Option<f64>,
    #[serde(default)]
    pub max_value: Option<f64>,
    #[serde(default)]
    pub related: Option<Relation>,
}

impl FilterField {
    fn with_type(name: impl Into<String>, label: impl Into<String>, filter_type: FilterType) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            filter_type,
            placeholder: None,
            default_value: None,
            width: None,
            choices: None,
            operator: None,
            min_value: None,
            max_value: None,
            related: None,
        }
    }

    pub fn input(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_type(name, label, FilterType::Input)
    }

    pub fn select(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_type(name, label, FilterType::Select)
    }

    pub fn date_range(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_type(name, label, FilterType::DateRange)
    }

    pub fn number_range(name: impl Into<String>, label: impl Into<String>) -> Self {
        Self::with_type(name, label, FilterType::NumberRange)
    }

    pub fn boolean(name: impl Into<String>, label: impl Into<String>) -> Self {
        let mut field = Self::with_type(name, label, FilterType::Boolean);
        field.choices = Some(IndexMap::from([
            ("true".to_string(), "Yes".to_string()),
            ("false".to_string(), "No".to_string()),
        ]));
        field
    }

    #[must_use]
    pub fn operator(mut self, operator: Operator) -> Self {
        self.operator = Some(operator);
        self
    }

    #[must_use]
    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    #[must_use]
    pub fn default_value(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    #[must_use]
    pub fn width(mut self, width: impl Into<String>) -> Self {
        self.width = Some(width.into());
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
    pub fn bounds(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    #[must_use]
    pub fn related(mut self, relation: Relation) -> Self {
        self.related = Some(relation);
        self
    }

    /// A select over a relation without static choices takes its options
    /// from the related table.
    pub fn needs_choice_loading(&self) -> bool {
        self.filter_type == FilterType::Select && self.related.is_some() && self.choices.is_none()
    }

    /// Check the filter against the model it is attached to.
    pub fn validate(&self, schema: &ModelSchema) -> CoreResult<()> {
        ensure_identifier("filter", &self.name)?;
        if RESERVED_PARAMS.contains(&self.name.as_str()) {
            return Err(CoreError::Validation(format!(
                "filter '{}' collides with a list query parameter",
                self.name
            )));
        }
        if let Some(relation) = &self.related {
            relation.validate(schema)?;
            return match self.filter_type {
                FilterType::Input | FilterType::Select => Ok(()),
                other => Err(CoreError::Validation(format!(
                    "filter '{}': {other:?} filters cannot target a related field",
                    self.name
                ))),
            };
        }
        let column = schema.get_column(&self.name).ok_or_else(|| {
            CoreError::Validation(format!(
                "filter '{}' is not a column of '{}'",
                self.name, schema.name
            ))
        })?;
        let compatible = match self.filter_type {
            FilterType::Input | FilterType::Select => true,
            FilterType::DateRange => matches!(column.kind, ColumnKind::Date | ColumnKind::DateTime),
            FilterType::NumberRange => matches!(
                column.kind,
                ColumnKind::Integer | ColumnKind::Float | ColumnKind::Decimal
            ),
            FilterType::Boolean => column.kind == ColumnKind::Boolean,
        };
        if !compatible {
            return Err(CoreError::Validation(format!(
                "filter '{}': {:?} filter does not fit a {:?} column",
                self.name, self.filter_type, column.kind
            )));
        }
        Ok(())
    }

    fn target(&self, schema: &ModelSchema) -> CoreResult<(FieldRef, Option<ColumnKind>)> {
        if let Some(relation) = &self.related {
            return Ok((relation.field_ref(), None));
        }
        schema
            .get_column(&self.name)
            .map(|c| (FieldRef::column(&c.name, c.kind), Some(c.kind)))
            .ok_or_else(|| {
                CoreError::Validation(format!("unknown filter field '{}'", self.name))
            })
    }

    /// Predicates for the values this filter finds in `query`.
    ///
    /// Missing or blank values add nothing; unparsable values are a
    /// validation error.
    pub fn build_predicates(&self, query: &ListQuery, schema: &ModelSchema) -> CoreResult<Vec<Predicate>> {
        let (target, kind) = self.target(schema)?;
        let mut predicates = Vec::new();
        match self.filter_type {
            FilterType::Input | FilterType::Select => {
                if let Some(raw) = query.filter(&self.name) {
                    let op = match self.filter_type {
                        FilterType::Input => self.operator.unwrap_or_default(),
                        _ => Operator::Exact,
                    };
                    let predicate = Predicate::from_input(target, op, raw)
                        .ok_or_else(|| self.invalid(raw))?;
                    predicates.push(predicate);
                }
            }
            FilterType::Boolean => {
                if let Some(raw) = query.filter(&self.name) {
                    let value = parse_bool(raw).ok_or_else(|| self.invalid(raw))?;
                    predicates.push(Predicate::compare(
                        target,
                        Operator::Exact,
                        FieldValue::Bool(value),
                    ));
                }
            }
            FilterType::DateRange => {
                let (start, end) = self.range_values(query, "start", "end");
                let kind = kind.unwrap_or(ColumnKind::Date);
                if let Some(raw) = start {
                    let date = self.parse_day(raw)?;
                    predicates.push(Predicate::compare(
                        target.clone(),
                        Operator::Gte,
                        day_value(kind, date),
                    ));
                }
                if let Some(raw) = end {
                    let date = self.parse_day(raw)?;
                    let next = date
                        .checked_add_days(Days::new(1))
                        .ok_or_else(|| self.invalid(raw))?;
                    predicates.push(Predicate::compare(target, Operator::Lt, day_value(kind, next)));
                }
            }
            FilterType::NumberRange => {
                let (min, max) = self.range_values(query, "min", "max");
                let kind = kind.unwrap_or(ColumnKind::Float);
                for (raw, op) in [(min, Operator::Gte), (max, Operator::Lte)] {
                    if let Some(raw) = raw {
                        let value = FieldValue::parse(kind, raw).map_err(|_| self.invalid(raw))?;
                        predicates.push(Predicate::compare(target.clone(), op, value));
                    }
                }
            }
        }
        Ok(predicates)
    }

    /// `<name>_<lo>` / `<name>_<hi>`, or `<name>=lo,hi`.
    fn range_values<'q>(&self, query: &'q ListQuery, lo: &str, hi: &str) -> (Option<&'q str>, Option<&'q str>) {
        let start = query.filter(&format!("{}_{lo}", self.name));
        let end = query.filter(&format!("{}_{hi}", self.name));
        if start.is_some() || end.is_some() {
            return (start, end);
        }
        match query.filter(&self.name).and_then(|v| v.split_once(',')) {
            Some((a, b)) => {
                let a = a.trim();
                let b = b.trim();
                ((!a.is_empty()).then_some(a), (!b.is_empty()).then_some(b))
            }
            None => (None, None),
        }
    }

    fn parse_day(&self, raw: &str) -> CoreResult<NaiveDate> {
        parse_date(raw)
            .or_else(|| parse_datetime(raw).map(|dt| dt.date_naive()))
            .ok_or_else(|| self.invalid(raw))
    }

    fn invalid(&self, raw: &str) -> CoreError {
        CoreError::Validation(format!("invalid value '{raw}' for filter '{}'", self.name))
    }

    /// Description consumed by the list page.
    pub fn to_config(&self) -> serde_json::Value {
        json!({
            "name": self.name,
            "label": self.label,
            "type": self.filter_type,
            "placeholder": self.placeholder,
            "default_value": self.default_value,
            "width": self.width,
            "choices": self.choices,
            "min_value": self.min_value,
            "max_value": self.max_value,
            "operator": self.operator.unwrap_or_default(),
        })
    }
}

fn day_value(kind: ColumnKind, date: NaiveDate) -> FieldValue {
    match (kind, date.and_hms_opt(0, 0, 0)) {
        (ColumnKind::DateTime, Some(midnight)) => FieldValue::DateTime(midnight.and_utc()),
        _ => FieldValue::Date(date),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
