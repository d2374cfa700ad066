//! SQL construction for the dynamic record queries.
//!
//! Every identifier comes from a validated [`ModelSchema`] or [`Relation`]
//! and is quoted anyway; every value is a bind parameter. The model table is
//! aliased `t` and each relation is LEFT JOINed once under
//! [`Relation::alias`].

use oxadmin_core::fields::{Relation, TableField};
use oxadmin_core::query::{FieldRef, Operator, OrderTerm, Predicate};
use oxadmin_core::schema::{ColumnKind, ModelSchema};
use oxadmin_core::value::FieldValue;
use sqlx::{Postgres, QueryBuilder};

pub const BASE_ALIAS: &str = "t";

pub type PgQueryBuilder = QueryBuilder<'static, Postgres>;

/// Double-quote an identifier.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ---------------------------------------------------------------------------
// Projection
// ---------------------------------------------------------------------------

/// One output column of a record query, in SELECT order.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectItem {
    /// Record key: the column name or the relation's value key.
    pub key: String,
    /// Kind used to decode the value.
    pub kind: ColumnKind,
    expr: String,
}

/// What a record query reads: every column of the model plus the display
/// value of each relation used by `fields`.
#[derive(Debug, Clone, Copy)]
pub struct Projection<'a> {
    pub schema: &'a ModelSchema,
    pub fields: &'a [TableField],
}

impl<'a> Projection<'a> {
    pub fn new(schema: &'a ModelSchema, fields: &'a [TableField]) -> Self {
        Self { schema, fields }
    }

    /// Columns only, no relations.
    pub fn columns(schema: &'a ModelSchema) -> Self {
        Self { schema, fields: &[] }
    }

    pub fn items(&self) -> Vec<SelectItem> {
        let mut items: Vec<SelectItem> = self
            .schema
            .columns
            .iter()
            .map(|c| SelectItem {
                key: c.name.clone(),
                kind: c.kind,
                expr: format!("{}::{}", column_expr(&c.name), c.kind.read_cast()),
            })
            .collect();
        for relation in self.fields.iter().filter_map(|f| f.related.as_ref()) {
            let key = relation.value_key();
            if items.iter().all(|item| item.key != key) {
                items.push(SelectItem {
                    key,
                    kind: ColumnKind::Text,
                    expr: format!("{}::text", related_expr(relation)),
                });
            }
        }
        items
    }
}

fn column_expr(name: &str) -> String {
    format!("{}.{}", quote_ident(BASE_ALIAS), quote_ident(name))
}

fn related_expr(relation: &Relation) -> String {
    format!(
        "{}.{}",
        quote_ident(&relation.alias()),
        quote_ident(&relation.display_field)
    )
}

fn target_expr(target: &FieldRef) -> String {
    match target {
        FieldRef::Column { name, .. } => column_expr(name),
        FieldRef::Related(relation) => related_expr(relation),
    }
}

/// Relations needed by the projection, predicates and ordering; one per alias.
fn join_relations(projection: &Projection<'_>, predicates: &[Predicate], ordering: &[OrderTerm]) -> Vec<Relation> {
    fn add(out: &mut Vec<Relation>, relation: &Relation) {
        if out.iter().all(|r| r.alias() != relation.alias()) {
            out.push(relation.clone());
        }
    }
    fn visit(out: &mut Vec<Relation>, predicate: &Predicate) {
        match predicate {
            Predicate::Compare {
                target: FieldRef::Related(relation),
                ..
            } => add(out, relation),
            Predicate::Compare { .. } => {}
            Predicate::Any(group) => group.iter().for_each(|p| visit(out, p)),
        }
    }

    let mut out = Vec::new();
    for relation in projection.fields.iter().filter_map(|f| f.related.as_ref()) {
        add(&mut out, relation);
    }
    predicates.iter().for_each(|p| visit(&mut out, p));
    for term in ordering {
        if let FieldRef::Related(relation) = &term.target {
            add(&mut out, relation);
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Fragments
// ---------------------------------------------------------------------------

fn push_from(qb: &mut PgQueryBuilder, table: &str, relations: &[Relation]) {
    qb.push(format!(
        " FROM {} AS {}",
        quote_ident(table),
        quote_ident(BASE_ALIAS)
    ));
    for relation in relations {
        let alias = quote_ident(&relation.alias());
        qb.push(format!(
            " LEFT JOIN {} AS {alias} ON {alias}.{} = {}",
            quote_ident(&relation.table),
            quote_ident(&relation.primary_key),
            column_expr(&relation.foreign_key)
        ));
    }
}

fn push_where(qb: &mut PgQueryBuilder, predicates: &[Predicate]) {
    for (i, predicate) in predicates.iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_predicate(qb, predicate);
    }
}

fn push_predicate(qb: &mut PgQueryBuilder, predicate: &Predicate) {
    match predicate {
        Predicate::Compare { target, op, value } => {
            let lhs = target_expr(target);
            if op.is_pattern() {
                qb.push(format!("{lhs}::text {} ", op.sql()));
                qb.push_bind(op.pattern(&value.to_display_string()));
            } else if value.is_null() && *op == Operator::Exact {
                qb.push(format!("{lhs} IS NULL"));
            } else {
                match target {
                    FieldRef::Column { kind, .. } => {
                        qb.push(format!("{lhs} {} ", op.sql()));
                        push_value(qb, value, kind.write_cast());
                    }
                    FieldRef::Related(_) => {
                        qb.push(format!("{lhs}::text {} ", op.sql()));
                        qb.push_bind(value.to_display_string());
                    }
                }
            }
        }
        Predicate::Any(group) if group.is_empty() => {
            qb.push("FALSE");
        }
        Predicate::Any(group) => {
            qb.push("(");
            for (i, inner) in group.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                push_predicate(qb, inner);
            }
            qb.push(")");
        }
    }
}

/// Bind a value; text carrying decimals or UUIDs gets the column's cast.
fn push_value(qb: &mut PgQueryBuilder, value: &FieldValue, cast: Option<&str>) {
    match value {
        FieldValue::Null => {
            qb.push("NULL");
            return;
        }
        FieldValue::Bool(b) => {
            qb.push_bind(*b);
        }
        FieldValue::Int(i) => {
            qb.push_bind(*i);
        }
        FieldValue::Float(f) => {
            qb.push_bind(*f);
        }
        FieldValue::Text(s) => {
            qb.push_bind(s.clone());
        }
        FieldValue::Date(d) => {
            qb.push_bind(*d);
        }
        FieldValue::DateTime(dt) => {
            qb.push_bind(*dt);
        }
        FieldValue::Json(v) => {
            qb.push_bind(v.clone());
        }
    }
    if let (Some(cast), FieldValue::Text(_)) = (cast, value) {
        qb.push(format!("::{cast}"));
    }
}

fn push_order(qb: &mut PgQueryBuilder, ordering: &[OrderTerm]) {
    for (i, term) in ordering.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        qb.push(format!(
            "{} {}",
            target_expr(&term.target),
            if term.descending { "DESC" } else { "ASC" }
        ));
    }
}

fn pk_column(schema: &ModelSchema) -> (String, Option<&'static str>) {
    let pk = schema.primary_key();
    (quote_ident(&pk.name), pk.kind.write_cast())
}

// ---------------------------------------------------------------------------
// Statements
// ---------------------------------------------------------------------------

/// `SELECT` of the projection, optionally paginated with `(limit, offset)`.
pub fn select_query(
    projection: &Projection<'_>,
    predicates: &[Predicate],
    ordering: &[OrderTerm],
    page: Option<(i64, i64)>,
) -> PgQueryBuilder {
    let relations = join_relations(projection, predicates, ordering);
    let list = projection
        .items()
        .into_iter()
        .map(|item| item.expr)
        .collect::<Vec<_>>()
        .join(", ");
    let mut qb = QueryBuilder::new(format!("SELECT {list}"));
    push_from(&mut qb, &projection.schema.table, &relations);
    push_where(&mut qb, predicates);
    push_order(&mut qb, ordering);
    if let Some((limit, offset)) = page {
        qb.push(" LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);
    }
    qb
}

/// `COUNT(*)` over the same FROM/JOIN/WHERE as [`select_query`].
pub fn count_query(projection: &Projection<'_>, predicates: &[Predicate]) -> PgQueryBuilder {
    let relations = join_relations(projection, predicates, &[]);
    let mut qb = QueryBuilder::new("SELECT COUNT(*)");
    push_from(&mut qb, &projection.schema.table, &relations);
    push_where(&mut qb, predicates);
    qb
}

/// Predicate selecting one row by primary key.
pub fn pk_predicate(schema: &ModelSchema, pk: FieldValue) -> Predicate {
    let column = schema.primary_key();
    Predicate::compare(
        FieldRef::column(&column.name, column.kind),
        Operator::Exact,
        pk,
    )
}

/// `INSERT ... RETURNING <pk>`.
pub fn insert_query(schema: &ModelSchema, values: &[(String, FieldValue)]) -> PgQueryBuilder {
    let mut qb = QueryBuilder::new(format!("INSERT INTO {}", quote_ident(&schema.table)));
    if values.is_empty() {
        qb.push(" DEFAULT VALUES");
    } else {
        let columns = values
            .iter()
            .map(|(name, _)| quote_ident(name))
            .collect::<Vec<_>>()
            .join(", ");
        qb.push(format!(" ({columns}) VALUES ("));
        for (i, (name, value)) in values.iter().enumerate() {
            if i > 0 {
                qb.push(", ");
            }
            let cast = schema.get_column(name).and_then(|c| c.kind.write_cast());
            push_value(&mut qb, value, cast);
        }
        qb.push(")");
    }
    let pk = schema.primary_key();
    qb.push(format!(
        " RETURNING {}::{}",
        quote_ident(&pk.name),
        pk.kind.read_cast()
    ));
    qb
}

/// `UPDATE ... WHERE <pk> = $n`. With no values the primary key is assigned
/// to itself so the affected-row count still reports existence.
pub fn update_query(schema: &ModelSchema, pk: &FieldValue, values: &[(String, FieldValue)]) -> PgQueryBuilder {
    let (pk_name, pk_cast) = pk_column(schema);
    let mut qb = QueryBuilder::new(format!("UPDATE {} SET ", quote_ident(&schema.table)));
    if values.is_empty() {
        qb.push(format!("{pk_name} = {pk_name}"));
    }
    for (i, (name, value)) in values.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(format!("{} = ", quote_ident(name)));
        let cast = schema.get_column(name).and_then(|c| c.kind.write_cast());
        push_value(&mut qb, value, cast);
    }
    qb.push(format!(" WHERE {pk_name} = "));
    push_value(&mut qb, pk, pk_cast);
    qb
}

/// `DELETE ... WHERE <pk> IN (...)`.
pub fn delete_query(schema: &ModelSchema, pks: &[FieldValue]) -> PgQueryBuilder {
    let (pk_name, pk_cast) = pk_column(schema);
    let mut qb = QueryBuilder::new(format!(
        "DELETE FROM {} WHERE {pk_name} IN (",
        quote_ident(&schema.table)
    ));
    for (i, pk) in pks.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, pk, pk_cast);
    }
    qb.push(")");
    qb
}

/// Distinct non-null display values of a related table.
pub fn distinct_values_query(relation: &Relation) -> PgQueryBuilder {
    let display = quote_ident(&relation.display_field);
    QueryBuilder::new(format!(
        "SELECT DISTINCT {display}::text FROM {} WHERE {display} IS NOT NULL ORDER BY 1",
        quote_ident(&relation.table)
    ))
}

/// `(primary key, display value)` pairs of a related table.
pub fn related_options_query(relation: &Relation) -> PgQueryBuilder {
    let display = quote_ident(&relation.display_field);
    QueryBuilder::new(format!(
        "SELECT {}::text, COALESCE({display}::text, '') FROM {} ORDER BY {display}",
        quote_ident(&relation.primary_key),
        quote_ident(&relation.table)
    ))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use oxadmin_core::fields::SearchField;
    use oxadmin_core::schema::Column;

    use super::*;

    fn books() -> ModelSchema {
        ModelSchema::new("Book", "books")
            .column(Column::new("id", ColumnKind::Integer).primary_key())
            .column(Column::new("title", ColumnKind::Text))
            .column(Column::new("price", ColumnKind::Decimal).nullable())
            .column(Column::new("publisher_id", ColumnKind::Integer).nullable())
    }

    fn publisher() -> Relation {
        Relation::new("publishers", "publisher_id", "name")
    }

    const SELECT_LIST: &str = r#"SELECT "t"."id"::int8, "t"."title"::text, "t"."price"::text, "t"."publisher_id"::int8, "r_publisher_id"."name"::text"#;
    const FROM_JOIN: &str = r#" FROM "books" AS "t" LEFT JOIN "publishers" AS "r_publisher_id" ON "r_publisher_id"."id" = "t"."publisher_id""#;

    #[test]
    fn identifiers_are_quoted() {
        assert_eq!(quote_ident("books"), r#""books""#);
        assert_eq!(quote_ident(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn projection_adds_relation_values_once() {
        let schema = books();
        let fields = vec![
            TableField::related("publisher_name", publisher()),
            TableField::related("publisher_again", publisher()),
        ];
        let items = Projection::new(&schema, &fields).items();
        let keys: Vec<_> = items.iter().map(|i| i.key.as_str()).collect();
        assert_eq!(keys, ["id", "title", "price", "publisher_id", "r_publisher_id__name"]);
        assert_eq!(items[4].kind, ColumnKind::Text);
    }

    #[test]
    fn select_with_search_ordering_and_page() {
        let schema = books();
        let fields = vec![TableField::related("publisher_name", publisher())];
        let search = Predicate::Any(vec![
            SearchField::new("title").build_predicate("x", &schema).unwrap(),
            SearchField::new("publisher_name")
                .related(publisher())
                .build_predicate("x", &schema)
                .unwrap(),
        ]);
        let ordering = vec![
            OrderTerm {
                target: FieldRef::Related(publisher()),
                descending: true,
            },
            OrderTerm {
                target: FieldRef::column("id", ColumnKind::Integer),
                descending: false,
            },
        ];
        let qb = select_query(
            &Projection::new(&schema, &fields),
            &[search],
            &ordering,
            Some((10, 20)),
        );
        assert_eq!(
            qb.sql(),
            format!(
                "{SELECT_LIST}{FROM_JOIN} WHERE (\"t\".\"title\"::text ILIKE $1 OR \"r_publisher_id\".\"name\"::text ILIKE $2) \
                 ORDER BY \"r_publisher_id\".\"name\" DESC, \"t\".\"id\" ASC LIMIT $3 OFFSET $4"
            )
        );
    }

    #[test]
    fn relation_used_only_by_a_filter_is_still_joined() {
        let schema = books();
        let filter = Predicate::compare(
            FieldRef::Related(publisher()),
            Operator::Exact,
            FieldValue::Text("Penguin".into()),
        );
        let qb = count_query(&Projection::columns(&schema), &[filter]);
        assert_eq!(
            qb.sql(),
            format!("SELECT COUNT(*){FROM_JOIN} WHERE \"r_publisher_id\".\"name\"::text = $1")
        );
    }

    #[test]
    fn empty_or_group_matches_nothing() {
        let schema = books();
        let qb = count_query(&Projection::columns(&schema), &[Predicate::Any(vec![])]);
        assert_eq!(
            qb.sql(),
            r#"SELECT COUNT(*) FROM "books" AS "t" WHERE FALSE"#
        );
    }

    #[test]
    fn typed_comparisons_use_write_casts() {
        let schema = books();
        let predicates = vec![
            Predicate::compare(
                FieldRef::column("price", ColumnKind::Decimal),
                Operator::Gte,
                FieldValue::Text("9.5".into()),
            ),
            Predicate::compare(
                FieldRef::column("publisher_id", ColumnKind::Integer),
                Operator::Exact,
                FieldValue::Null,
            ),
        ];
        let qb = count_query(&Projection::columns(&schema), &predicates);
        assert_eq!(
            qb.sql(),
            r#"SELECT COUNT(*) FROM "books" AS "t" WHERE "t"."price" >= $1::numeric AND "t"."publisher_id" IS NULL"#
        );
    }

    #[test]
    fn insert_update_delete() {
        let schema = books();
        let values = vec![
            ("title".to_string(), FieldValue::Text("Dune".into())),
            ("price".to_string(), FieldValue::Text("9.99".into())),
            ("publisher_id".to_string(), FieldValue::Null),
        ];
        assert_eq!(
            insert_query(&schema, &values).sql(),
            r#"INSERT INTO "books" ("title", "price", "publisher_id") VALUES ($1, $2::numeric, NULL) RETURNING "id"::int8"#
        );
        assert_eq!(
            insert_query(&schema, &[]).sql(),
            r#"INSERT INTO "books" DEFAULT VALUES RETURNING "id"::int8"#
        );
        assert_eq!(
            update_query(&schema, &FieldValue::Int(4), &values[..1]).sql(),
            r#"UPDATE "books" SET "title" = $1 WHERE "id" = $2"#
        );
        assert_eq!(
            update_query(&schema, &FieldValue::Int(4), &[]).sql(),
            r#"UPDATE "books" SET "id" = "id" WHERE "id" = $1"#
        );
        assert_eq!(
            delete_query(&schema, &[FieldValue::Int(1), FieldValue::Int(2)]).sql(),
            r#"DELETE FROM "books" WHERE "id" IN ($1, $2)"#
        );
    }

    #[test]
    fn relation_lookups() {
        assert_eq!(
            distinct_values_query(&publisher()).sql(),
            r#"SELECT DISTINCT "name"::text FROM "publishers" WHERE "name" IS NOT NULL ORDER BY 1"#
        );
        assert_eq!(
            related_options_query(&publisher()).sql(),
            r#"SELECT "id"::text, COALESCE("name"::text, '') FROM "publishers" ORDER BY "name""#
        );
    }
}
