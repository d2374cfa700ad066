//! Handlers for the per-model routes: list page, JSON data, search,
//! export, create, update, delete and inline rows.

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum::{Form, Json};
use oxadmin_core::error::CoreError;
use oxadmin_core::export::{self, ExportFormat};
use oxadmin_core::fields::FormField;
use oxadmin_core::model_admin::ModelAdmin;
use oxadmin_core::query::{ListQuery, Predicate};
use oxadmin_core::value::{FieldValue, Record};
use oxadmin_db::repositories::RecordRepo;
use oxadmin_db::sql::{pk_predicate, Projection};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::middleware::session::{CurrentAdmin, PageAdmin};
use crate::query::{param, submitted_ids, InlineDataParams};
use crate::response::{
    ActionResponse, BatchDeleteResponse, DataResponse, InlineDataResponse, ListResponse,
    RowPayload,
};
use crate::state::AppState;
use crate::templates::{json_for_script, page_context};
use crate::views::{self, FormInput};

type Pairs = Vec<(String, String)>;

/// `(primary key, label)` options per relation alias.
type RelatedOptions = HashMap<String, Vec<(String, String)>>;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn not_found(admin: &ModelAdmin, id: &str) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: admin.verbose_name.clone(),
        id: id.to_string(),
    })
}

fn forbidden(what: &str, admin: &ModelAdmin) -> AppError {
    AppError::Core(CoreError::Forbidden(format!(
        "{what} is disabled for {}",
        admin.verbose_name
    )))
}

/// Primary key from a path segment; unparsable keys cannot exist.
fn parse_pk(admin: &ModelAdmin, raw: &str) -> AppResult<FieldValue> {
    let pk = admin.schema.primary_key();
    FieldValue::parse(pk.kind, raw).map_err(|_| not_found(admin, raw))
}

fn row_payload(admin: &ModelAdmin, record: &Record) -> RowPayload {
    RowPayload {
        display: admin.serialize_record(record, true),
        data: admin.serialize_record(record, false),
    }
}

/// Filters, search term and ordering of a list request.
fn list_criteria(
    admin: &ModelAdmin,
    query: &ListQuery,
) -> AppResult<(Vec<Predicate>, Vec<oxadmin_core::query::OrderTerm>)> {
    let predicates = admin.build_predicates(query)?;
    let ordering = admin.resolve_ordering(query.sort.as_deref(), query.descending)?;
    Ok((predicates, ordering))
}

async fn load_related_options(state: &AppState, fields: &[&FormField]) -> AppResult<RelatedOptions> {
    let mut options = RelatedOptions::new();
    for field in fields.iter().filter(|f| f.choices.is_none()) {
        let Some(relation) = &field.related else {
            continue;
        };
        if !options.contains_key(&relation.alias()) {
            let loaded = RecordRepo::related_options(&state.pool, relation).await?;
            options.insert(relation.alias(), loaded);
        }
    }
    Ok(options)
}

fn form_inputs(fields: &[FormField], submitted: &[(String, String)], options: &RelatedOptions) -> Vec<FormInput> {
    fields
        .iter()
        .map(|field| {
            let related = field
                .related
                .as_ref()
                .and_then(|r| options.get(&r.alias()))
                .map(Vec::as_slice)
                .unwrap_or_default();
            FormInput::new(field, param(submitted, &field.name), related)
        })
        .collect()
}

/// Header row and cells of an export. Markup-producing fields export their
/// raw value.
pub fn export_table(admin: &ModelAdmin, records: &[Record]) -> (Vec<String>, Vec<Vec<String>>) {
    let fields: Vec<_> = views::visible_fields(admin).collect();
    let headers = fields.iter().map(|f| f.label.clone()).collect();
    let rows = records
        .iter()
        .map(|record| {
            let display = admin.serialize_record(record, true);
            let raw = admin.serialize_record(record, false);
            fields
                .iter()
                .map(|f| {
                    let source = if f.effective_display_type().renders_html() {
                        &raw
                    } else {
                        &display
                    };
                    source.get(&f.name).cloned().unwrap_or_default()
                })
                .collect()
        })
        .collect();
    (headers, rows)
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

/// GET /<prefix>/{model}
///
/// Server-rendered list page: the requested page of rows, filters, the add
/// form and the edit dialog.
pub async fn list_page(
    State(state): State<AppState>,
    admin_user: PageAdmin,
    Path(model): Path<String>,
    Query(pairs): Query<Pairs>,
) -> AppResult<Html<String>> {
    let admin = state.site.model(&model)?;
    let query = ListQuery::from_params(&pairs, admin.per_page)?;
    let (predicates, ordering) = list_criteria(admin, &query)?;
    let projection = Projection::new(&admin.schema, &admin.table_fields);
    let page = RecordRepo::list(
        &state.pool,
        &projection,
        &predicates,
        &ordering,
        query.limit,
        query.offset,
    )
    .await?;

    let payloads: Vec<RowPayload> = page.records.iter().map(|r| row_payload(admin, r)).collect();
    let rows: Vec<_> = payloads.iter().map(|p| views::row_view(admin, &p.display)).collect();

    let mut filters = Vec::with_capacity(admin.filter_fields.len());
    for filter in &admin.filter_fields {
        let loaded = match (&filter.related, filter.needs_choice_loading()) {
            (Some(relation), true) => RecordRepo::distinct_values(&state.pool, relation).await?,
            _ => Vec::new(),
        };
        filters.push(views::filter_view(filter, &query, &loaded));
    }

    let form_fields: Vec<&FormField> = admin
        .add_form_fields
        .iter()
        .chain(admin.form_fields.iter())
        .collect();
    let options = load_related_options(&state, &form_fields).await?;

    let list_url = state.site.model_url(admin.name());
    let mut config = admin.frontend_config();
    config["listUrl"] = json!(list_url);
    config["prefix"] = json!(state.site.prefix());

    let columns = views::columns(admin);
    let pager = views::pager(page.total, query.offset, query.limit, rows.len());
    let search_placeholder = admin
        .search_fields
        .iter()
        .map(|f| f.label.as_str())
        .collect::<Vec<_>>()
        .join(", ");

    let language = state.language(&admin_user.session);
    let mut context = page_context(&state, Some(&admin_user.user.username), &language);
    context.insert("current_model", admin.name());
    context.insert("verbose_name", &admin.verbose_name);
    context.insert("total", &page.total);
    context.insert("add_url", &format!("{list_url}/add"));
    context.insert("export_url", &format!("{list_url}/export"));
    context.insert("list_url", &list_url);
    context.insert("has_search", &!admin.search_fields.is_empty());
    context.insert("search", &query.search.clone().unwrap_or_default());
    context.insert("search_placeholder", &format!("Search {search_placeholder}"));
    context.insert("filters", &filters);
    context.insert("allow_add", &admin.allow_add);
    context.insert("allow_delete", &admin.allow_delete);
    context.insert("allow_export", &admin.allow_export);
    context.insert("enable_edit", &admin.enable_edit);
    context.insert("keep_query", &views::keep_query(&query));
    context.insert("sort_query", &views::sort_query(&query));
    context.insert("sort", &query.sort);
    context.insert("descending", &query.descending);
    context.insert("colspan", &(columns.len() + 2));
    context.insert("columns", &columns);
    context.insert("rows", &rows);
    context.insert("limit", &query.limit);
    context.insert("first_row", &pager.first_row);
    context.insert("last_row", &pager.last_row);
    context.insert("prev_offset", &pager.prev_offset);
    context.insert("next_offset", &pager.next_offset);
    context.insert("add_title", &admin.add_title());
    context.insert("add_fields", &form_inputs(&admin.add_form_fields, &[], &options));
    context.insert("edit_title", &admin.edit_title());
    context.insert("edit_fields", &form_inputs(&admin.form_fields, &[], &options));
    context.insert("config_json", &json_for_script(&config));
    let script_rows: Vec<_> = page
        .records
        .iter()
        .zip(&payloads)
        .map(|(record, payload)| {
            json!({
                "display": payload.display,
                "data": payload.data,
                "form": admin.edit_values(record),
            })
        })
        .collect();
    context.insert("rows_json", &json_for_script(&json!(script_rows)));

    state.templates.render("model_list.html", &context)
}

/// POST /<prefix>/{model}/add
///
/// Creates a record from the add form and redirects to the list. A rejected
/// submission re-renders the form with the submitted values and the error.
pub async fn add(
    State(state): State<AppState>,
    admin_user: PageAdmin,
    Path(model): Path<String>,
    Form(pairs): Form<Pairs>,
) -> AppResult<Response> {
    let admin = state.site.model(&model)?;
    if !admin.allow_add {
        return Err(forbidden("Adding", admin));
    }

    let created = match admin.form_values(&pairs, &admin.add_form_fields, true) {
        Ok(values) => RecordRepo::insert(&state.pool, &admin.schema, &values)
            .await
            .map_err(AppError::from),
        Err(e) => Err(AppError::from(e)),
    };

    match created {
        Ok(pk) => {
            tracing::info!(
                user_id = admin_user.user.id,
                model = %admin.name(),
                id = %pk.to_display_string(),
                "Record created"
            );
            Ok(Redirect::to(&state.site.model_url(admin.name())).into_response())
        }
        Err(err) => {
            let (status, _, message) = err.parts();
            if !status.is_client_error() {
                return Err(err);
            }
            tracing::debug!(model = %admin.name(), %message, "Add form rejected");
            let fields: Vec<&FormField> = admin.add_form_fields.iter().collect();
            let options = load_related_options(&state, &fields).await?;
            let list_url = state.site.model_url(admin.name());
            let language = state.language(&admin_user.session);
            let mut context = page_context(&state, Some(&admin_user.user.username), &language);
            context.insert("current_model", admin.name());
            context.insert("title", &admin.add_title());
            context.insert("error", &message);
            context.insert("action", &format!("{list_url}/add"));
            context.insert("list_url", &list_url);
            context.insert("fields", &form_inputs(&admin.add_form_fields, &pairs, &options));
            let page = state.templates.render("model_form.html", &context)?;
            Ok((StatusCode::BAD_REQUEST, page).into_response())
        }
    }
}

/// GET /<prefix>/{model}/export
///
/// CSV or Excel download of the rows matching the list filters, or of the
/// rows listed in `ids`.
pub async fn export(
    State(state): State<AppState>,
    admin_user: PageAdmin,
    Path(model): Path<String>,
    Query(pairs): Query<Pairs>,
) -> AppResult<Response> {
    let admin = state.site.model(&model)?;
    if !admin.allow_export {
        return Err(forbidden("Export", admin));
    }
    let format = ExportFormat::parse(param(&pairs, "format").unwrap_or("csv"))?;
    let query = ListQuery::from_params(&pairs, admin.per_page)?;
    let (mut predicates, ordering) = list_criteria(admin, &query)?;

    let ids = param(&pairs, "ids")
        .map(|raw| submitted_ids(&[("ids".to_string(), raw.to_string())]))
        .unwrap_or_default();
    if !ids.is_empty() {
        let pk_kind = admin.schema.primary_key().kind;
        let selected = ids
            .iter()
            .map(|id| {
                FieldValue::parse(pk_kind, id)
                    .map(|pk| pk_predicate(&admin.schema, pk))
                    .map_err(|e| AppError::BadRequest(format!("Invalid id: {e}")))
            })
            .collect::<AppResult<Vec<_>>>()?;
        predicates = vec![Predicate::Any(selected)];
    }

    let projection = Projection::new(&admin.schema, &admin.table_fields);
    let records = RecordRepo::fetch_all(
        &state.pool,
        &projection,
        &predicates,
        &ordering,
        state.config.max_export_rows,
    )
    .await?;

    let (headers, rows) = export_table(admin, &records);
    let result = export::export(format, admin.name(), &headers, &rows, chrono::Utc::now())?;
    tracing::info!(
        user_id = admin_user.user.id,
        model = %admin.name(),
        rows = rows.len(),
        filename = %result.filename,
        "Records exported"
    );

    Ok((
        [
            (CONTENT_TYPE, result.content_type.to_string()),
            (
                CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", result.filename),
            ),
        ],
        result.bytes,
    )
        .into_response())
}

// ---------------------------------------------------------------------------
// JSON endpoints
// ---------------------------------------------------------------------------

/// GET /<prefix>/{model}/data
pub async fn data(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(model): Path<String>,
    Query(pairs): Query<Pairs>,
) -> AppResult<Json<ListResponse>> {
    let admin = state.site.model(&model)?;
    let query = ListQuery::from_params(&pairs, admin.per_page)?;
    let (predicates, ordering) = list_criteria(admin, &query)?;
    let projection = Projection::new(&admin.schema, &admin.table_fields);
    let page = RecordRepo::list(
        &state.pool,
        &projection,
        &predicates,
        &ordering,
        query.limit,
        query.offset,
    )
    .await?;

    Ok(Json(ListResponse {
        total: page.total,
        data: page.records.iter().map(|r| row_payload(admin, r)).collect(),
    }))
}

/// GET /<prefix>/{model}/search
///
/// Per-field search from `search_<field>` parameters, first page only.
pub async fn search(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(model): Path<String>,
    Query(pairs): Query<Pairs>,
) -> AppResult<Json<DataResponse<Vec<RowPayload>>>> {
    let admin = state.site.model(&model)?;
    let predicates = admin.field_search_predicates(&pairs);
    let ordering = admin.resolve_ordering(None, false)?;
    let projection = Projection::new(&admin.schema, &admin.table_fields);
    let page = RecordRepo::list(&state.pool, &projection, &predicates, &ordering, admin.per_page, 0).await?;

    Ok(Json(DataResponse {
        data: page.records.iter().map(|r| row_payload(admin, r)).collect(),
    }))
}

/// POST /<prefix>/{model}/{id}/edit
pub async fn edit(
    State(state): State<AppState>,
    admin_user: CurrentAdmin,
    Path((model, id)): Path<(String, String)>,
    Form(pairs): Form<Pairs>,
) -> AppResult<Json<ActionResponse>> {
    let admin = state.site.model(&model)?;
    if !admin.enable_edit {
        return Err(forbidden("Editing", admin));
    }
    let pk = parse_pk(admin, &id)?;
    let values = admin.form_values(&pairs, &admin.form_fields, false)?;
    if !RecordRepo::update(&state.pool, &admin.schema, &pk, &values).await? {
        return Err(not_found(admin, &id));
    }

    tracing::info!(
        user_id = admin_user.user.id,
        model = %admin.name(),
        %id,
        fields = values.len(),
        "Record updated"
    );
    Ok(Json(ActionResponse::ok("Updated successfully")))
}

/// POST /<prefix>/{model}/{id}/delete
pub async fn delete(
    State(state): State<AppState>,
    admin_user: CurrentAdmin,
    Path((model, id)): Path<(String, String)>,
) -> AppResult<Json<ActionResponse>> {
    let admin = state.site.model(&model)?;
    if !admin.allow_delete {
        return Err(forbidden("Deleting", admin));
    }
    let pk = parse_pk(admin, &id)?;
    if !RecordRepo::delete(&state.pool, &admin.schema, &pk).await? {
        return Err(not_found(admin, &id));
    }

    tracing::info!(user_id = admin_user.user.id, model = %admin.name(), %id, "Record deleted");
    Ok(Json(ActionResponse::ok("Deleted successfully")))
}

/// POST /<prefix>/{model}/batch_delete
///
/// Deletes every submitted id in one transaction. Ids that no longer exist
/// are skipped; `deleted` reports how many rows were removed.
pub async fn batch_delete(
    State(state): State<AppState>,
    admin_user: CurrentAdmin,
    Path(model): Path<String>,
    Form(pairs): Form<Pairs>,
) -> AppResult<Json<BatchDeleteResponse>> {
    let admin = state.site.model(&model)?;
    if !admin.allow_delete {
        return Err(forbidden("Deleting", admin));
    }
    let ids = submitted_ids(&pairs);
    if ids.is_empty() {
        return Err(AppError::BadRequest("No records selected".into()));
    }
    let pk_kind = admin.schema.primary_key().kind;
    let pks = ids
        .iter()
        .map(|id| FieldValue::parse(pk_kind, id).map_err(|e| AppError::BadRequest(format!("Invalid id: {e}"))))
        .collect::<AppResult<Vec<_>>>()?;

    let deleted = RecordRepo::delete_many(&state.pool, &admin.schema, &pks).await?;
    tracing::info!(
        user_id = admin_user.user.id,
        model = %admin.name(),
        requested = pks.len(),
        deleted,
        "Records batch deleted"
    );

    Ok(Json(BatchDeleteResponse {
        code: 200,
        success: true,
        message: format!("Deleted {deleted} record(s)"),
        deleted,
    }))
}

/// GET /<prefix>/{model}/inline_data
///
/// Child rows of one parent for an inline registered on the model.
pub async fn inline_data(
    State(state): State<AppState>,
    _admin: CurrentAdmin,
    Path(model): Path<String>,
    Query(params): Query<InlineDataParams>,
) -> AppResult<Json<InlineDataResponse>> {
    let admin = state.site.model(&model)?;
    let parent_id = params
        .parent_id
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("parent_id is required".into()))?;
    let inline_model = params
        .inline_model
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AppError::BadRequest("inline_model is required".into()))?;
    let inline = admin.get_inline(inline_model).ok_or_else(|| {
        AppError::Core(CoreError::NotFound {
            entity: "Inline".to_string(),
            id: inline_model.to_string(),
        })
    })?;

    let fk_kind = inline
        .schema
        .get_column(&inline.fk_field)
        .map(|c| c.kind)
        .ok_or_else(|| AppError::InternalError(format!("inline '{inline_model}' has no fk column")))?;
    let parent = FieldValue::parse(fk_kind, parent_id)
        .map_err(|e| AppError::BadRequest(format!("Invalid parent_id: {e}")))?;

    let records = RecordRepo::list_children(
        &state.pool,
        &inline.schema,
        &inline.table_fields,
        &inline.fk_field,
        parent,
    )
    .await?;
    let data: Vec<RowPayload> = records
        .iter()
        .map(|r| RowPayload {
            display: inline.serialize_record(r, true),
            data: inline.serialize_record(r, false),
        })
        .collect();

    Ok(Json(InlineDataResponse {
        success: true,
        total: data.len(),
        data,
    }))
}
