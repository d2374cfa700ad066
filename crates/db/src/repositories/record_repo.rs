//! Repository for the tables of registered models.
//!
//! Unlike the typed repositories, rows here are shaped by a runtime
//! [`ModelSchema`] and come back as [`Record`]s. Values are decoded by
//! position, following [`Projection::items`].

use oxadmin_core::fields::{Relation, TableField};
use oxadmin_core::query::{FieldRef, Operator, OrderTerm, Predicate};
use oxadmin_core::schema::{ColumnKind, ModelSchema};
use oxadmin_core::types::Timestamp;
use oxadmin_core::value::{FieldValue, Record};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::sql::{self, Projection, SelectItem};

/// One page of a list query together with the unpaginated total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub total: i64,
    pub records: Vec<Record>,
}

pub struct RecordRepo;

impl RecordRepo {
    /// Count and fetch one page under the same filters.
    pub async fn list(
        pool: &PgPool,
        projection: &Projection<'_>,
        predicates: &[Predicate],
        ordering: &[OrderTerm],
        limit: i64,
        offset: i64,
    ) -> Result<Page, sqlx::Error> {
        let total: i64 = sql::count_query(projection, predicates)
            .build_query_scalar()
            .fetch_one(pool)
            .await?;
        let records = Self::fetch(pool, projection, predicates, ordering, Some((limit, offset))).await?;
        Ok(Page { total, records })
    }

    /// Every matching row up to `cap`, for exports.
    pub async fn fetch_all(
        pool: &PgPool,
        projection: &Projection<'_>,
        predicates: &[Predicate],
        ordering: &[OrderTerm],
        cap: i64,
    ) -> Result<Vec<Record>, sqlx::Error> {
        Self::fetch(pool, projection, predicates, ordering, Some((cap, 0))).await
    }

    pub async fn find_by_pk(
        pool: &PgPool,
        projection: &Projection<'_>,
        pk: FieldValue,
    ) -> Result<Option<Record>, sqlx::Error> {
        let predicate = sql::pk_predicate(projection.schema, pk);
        let mut records = Self::fetch(pool, projection, &[predicate], &[], Some((1, 0))).await?;
        Ok(records.pop())
    }

    /// Insert a row and return its primary key.
    pub async fn insert(
        pool: &PgPool,
        schema: &ModelSchema,
        values: &[(String, FieldValue)],
    ) -> Result<FieldValue, sqlx::Error> {
        let row = sql::insert_query(schema, values)
            .build()
            .fetch_one(pool)
            .await?;
        decode_value(&row, 0, schema.primary_key().kind)
    }

    /// Returns `false` when no row has the primary key.
    pub async fn update(
        pool: &PgPool,
        schema: &ModelSchema,
        pk: &FieldValue,
        values: &[(String, FieldValue)],
    ) -> Result<bool, sqlx::Error> {
        let result = sql::update_query(schema, pk, values)
            .build()
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns `false` when no row has the primary key.
    pub async fn delete(pool: &PgPool, schema: &ModelSchema, pk: &FieldValue) -> Result<bool, sqlx::Error> {
        let deleted = Self::delete_many(pool, schema, std::slice::from_ref(pk)).await?;
        Ok(deleted > 0)
    }

    /// Delete every listed row in one transaction; returns the number
    /// actually removed.
    pub async fn delete_many(
        pool: &PgPool,
        schema: &ModelSchema,
        pks: &[FieldValue],
    ) -> Result<u64, sqlx::Error> {
        if pks.is_empty() {
            return Ok(0);
        }
        let mut tx = pool.begin().await?;
        let result = sql::delete_query(schema, pks)
            .build()
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(result.rows_affected())
    }

    /// Rows of an inline model whose `fk_field` points at `parent`, in
    /// primary-key order.
    pub async fn list_children(
        pool: &PgPool,
        schema: &ModelSchema,
        fields: &[TableField],
        fk_field: &str,
        parent: FieldValue,
    ) -> Result<Vec<Record>, sqlx::Error> {
        let fk_kind = schema
            .get_column(fk_field)
            .map(|c| c.kind)
            .unwrap_or(ColumnKind::Integer);
        let predicate = Predicate::compare(FieldRef::column(fk_field, fk_kind), Operator::Exact, parent);
        let pk = schema.primary_key();
        let ordering = [OrderTerm {
            target: FieldRef::column(&pk.name, pk.kind),
            descending: false,
        }];
        Self::fetch(pool, &Projection::new(schema, fields), &[predicate], &ordering, None).await
    }

    /// Distinct display values of a relation, for filter dropdowns.
    pub async fn distinct_values(pool: &PgPool, relation: &Relation) -> Result<Vec<String>, sqlx::Error> {
        sql::distinct_values_query(relation)
            .build_query_scalar()
            .fetch_all(pool)
            .await
    }

    /// `(primary key, display value)` pairs of a relation, for form selects.
    pub async fn related_options(
        pool: &PgPool,
        relation: &Relation,
    ) -> Result<Vec<(String, String)>, sqlx::Error> {
        sql::related_options_query(relation)
            .build_query_as()
            .fetch_all(pool)
            .await
    }

    async fn fetch(
        pool: &PgPool,
        projection: &Projection<'_>,
        predicates: &[Predicate],
        ordering: &[OrderTerm],
        page: Option<(i64, i64)>,
    ) -> Result<Vec<Record>, sqlx::Error> {
        let items = projection.items();
        let rows = sql::select_query(projection, predicates, ordering, page)
            .build()
            .fetch_all(pool)
            .await?;
        rows.iter().map(|row| decode_record(row, &items)).collect()
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn decode_record(row: &PgRow, items: &[SelectItem]) -> Result<Record, sqlx::Error> {
    let mut record = Record::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        record.insert(item.key.clone(), decode_value(row, index, item.kind)?);
    }
    Ok(record)
}

/// Decode one cell; the SELECT list has already cast it to the kind's
/// canonical type.
fn decode_value(row: &PgRow, index: usize, kind: ColumnKind) -> Result<FieldValue, sqlx::Error> {
    let value = match kind {
        ColumnKind::Integer => row.try_get::<Option<i64>, _>(index)?.map(FieldValue::Int),
        ColumnKind::Float => row.try_get::<Option<f64>, _>(index)?.map(FieldValue::Float),
        ColumnKind::Decimal | ColumnKind::Text | ColumnKind::Uuid => {
            row.try_get::<Option<String>, _>(index)?.map(FieldValue::Text)
        }
        ColumnKind::Boolean => row.try_get::<Option<bool>, _>(index)?.map(FieldValue::Bool),
        ColumnKind::Date => row
            .try_get::<Option<chrono::NaiveDate>, _>(index)?
            .map(FieldValue::Date),
        ColumnKind::DateTime => row.try_get::<Option<Timestamp>, _>(index)?.map(FieldValue::DateTime),
        ColumnKind::Json => row
            .try_get::<Option<serde_json::Value>, _>(index)?
            .map(FieldValue::Json),
    };
    Ok(value.unwrap_or(FieldValue::Null))
}
