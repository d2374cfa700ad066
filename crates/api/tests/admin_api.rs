//! End-to-end tests of the admin routes against PostgreSQL
//! (`DATABASE_URL`).

mod common;

use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE, LOCATION};
use axum::http::StatusCode;
use common::{body_json, body_text, get_with_cookie, post_form, session_cookie, set_cookies};
use oxadmin_api::auth::session;
use oxadmin_core::fields::{FormField, Relation, SearchField, TableField};
use oxadmin_core::filters::FilterField;
use oxadmin_core::inline::InlineAdmin;
use oxadmin_core::password::hash_password;
use oxadmin_core::schema::{Column, ColumnKind, ModelSchema};
use oxadmin_core::site::AdminSite;
use oxadmin_db::models::admin_user::{AdminUser, CreateAdminUser};
use oxadmin_db::repositories::AdminUserRepo;
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const PASSWORD: &str = "correct horse battery";

async fn create_admin(pool: &PgPool, username: &str) -> AdminUser {
    AdminUserRepo::create(
        pool,
        &CreateAdminUser {
            username: username.to_string(),
            email: Some(format!("{username}@example.com")),
            password_hash: hash_password(PASSWORD).unwrap(),
            is_superuser: true,
        },
    )
    .await
    .unwrap()
}

async fn seed_books(pool: &PgPool) {
    sqlx::raw_sql(
        "CREATE TABLE publishers (id BIGSERIAL PRIMARY KEY, name TEXT NOT NULL);
         CREATE TABLE books (
             id BIGSERIAL PRIMARY KEY,
             title TEXT NOT NULL,
             publisher_id BIGINT REFERENCES publishers(id)
         );
         CREATE TABLE book_reviews (
             id BIGSERIAL PRIMARY KEY,
             book_id BIGINT NOT NULL REFERENCES books(id),
             rating INT NOT NULL
         );
         INSERT INTO publishers (name) VALUES ('Penguin'), ('Tor');
         INSERT INTO books (title, publisher_id) VALUES
             ('Dune', 1), ('Hyperion', 2), ('Neuromancer', 2);
         INSERT INTO book_reviews (book_id, rating) VALUES (1, 5), (1, 4), (2, 3);",
    )
    .execute(pool)
    .await
    .unwrap();
}

fn bookstore_site() -> AdminSite {
    let mut site = oxadmin_api::bootstrap::build_site(&common::test_config()).unwrap();
    let publisher = Relation::new("publishers", "publisher_id", "name");
    let books = ModelSchema::new("Book", "books")
        .column(Column::new("id", ColumnKind::Integer).primary_key())
        .column(Column::new("title", ColumnKind::Text))
        .column(Column::new("publisher_id", ColumnKind::Integer).nullable());
    let reviews = ModelSchema::new("BookReview", "book_reviews")
        .column(Column::new("id", ColumnKind::Integer).primary_key())
        .column(Column::new("book_id", ColumnKind::Integer))
        .column(Column::new("rating", ColumnKind::Integer));
    site.register(
        oxadmin_core::model_admin::ModelAdmin::new(books)
            .verbose_name("Books")
            .table_field(TableField::new("id"))
            .table_field(TableField::new("title").sortable(true))
            .table_field(TableField::related("publisher", publisher.clone()).sortable(true))
            .form_field(FormField::new("title").required())
            .form_field(FormField::new("publisher_id").label("Publisher").related(publisher.clone()))
            .search_field(SearchField::new("title"))
            .search_field(SearchField::new("publisher").related(publisher.clone()))
            .filter_field(FilterField::select("publisher", "Publisher").related(publisher))
            .inline(InlineAdmin::new(reviews, "book_id"))
            .default_ordering(["title"]),
    )
    .unwrap();
    site
}

fn cookie_value(set_cookie: &str) -> &str {
    set_cookie
        .strip_prefix("session=")
        .and_then(|rest| rest.split(';').next())
        .unwrap()
}

// ---------------------------------------------------------------------------
// Login flow
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_sets_session_and_redirects(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    let app = common::build_test_app(pool.clone());

    let response = post_form(
        app,
        "/admin/login",
        &[("username", "alice"), ("password", PASSWORD)],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/admin");

    let cookies = set_cookies(&response);
    let data = session::decode(cookie_value(&cookies[0]), common::TEST_SECRET).unwrap();
    assert_eq!(data.user_id, Some(user.id));

    let reloaded = AdminUserRepo::find_by_id(&pool, user.id).await.unwrap().unwrap();
    assert!(reloaded.last_login_at.is_some());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_wrong_password_rerenders_with_401(pool: PgPool) {
    create_admin(&pool, "alice").await;
    let app = common::build_test_app(pool);

    let response = post_form(
        app,
        "/admin/login",
        &[("username", "alice"), ("password", "wrong")],
        None,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert!(set_cookies(&response).is_empty());
    assert!(body_text(response).await.contains("Invalid username or password"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_inactive_account_cannot_use_session(pool: PgPool) {
    let user = create_admin(&pool, "bob").await;
    sqlx::query("UPDATE admin_users SET is_active = FALSE WHERE id = $1")
        .bind(user.id)
        .execute(&pool)
        .await
        .unwrap();
    let app = common::build_test_app(pool);

    let response = get_with_cookie(app, "/admin/AdminUser/data", &session_cookie(Some(user.id))).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_login_page_redirects_signed_in_user(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    let app = common::build_test_app(pool);

    let response = get_with_cookie(app, "/admin/login", &session_cookie(Some(user.id))).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/admin");
}

// ---------------------------------------------------------------------------
// Pages
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_dashboard_and_list_page_render(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    seed_books(&pool).await;
    let app = common::build_test_app_with(pool, common::test_config(), bookstore_site());
    let cookie = session_cookie(Some(user.id));

    let response = get_with_cookie(app.clone(), "/admin", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains(r#"href="/admin/Book""#));

    let response = get_with_cookie(app, "/admin/Book?publisher=Tor", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_text(response).await;
    assert!(body.contains("Hyperion"));
    assert!(body.contains("Neuromancer"));
    assert!(!body.contains(">Dune<"));
    // Publisher choices come from the related table.
    assert!(body.contains(r#"<option value="Penguin""#));
    // The edit dialog is prefilled with the foreign key, not the display name.
    assert!(body.contains(r#""form":{"#));
    assert!(body.contains(r#""publisher_id":"2""#));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_model_is_404(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    let app = common::build_test_app(pool);

    let response = get_with_cookie(app, "/admin/Nope/data", &session_cookie(Some(user.id))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ---------------------------------------------------------------------------
// JSON endpoints
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_data_paginates_and_searches_relations(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    seed_books(&pool).await;
    let app = common::build_test_app_with(pool, common::test_config(), bookstore_site());
    let cookie = session_cookie(Some(user.id));

    let response = get_with_cookie(app.clone(), "/admin/Book/data?limit=2&offset=0", &cookie).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total"], 3);
    assert_eq!(json["data"].as_array().unwrap().len(), 2);
    assert_eq!(json["data"][0]["display"]["title"], "Dune");
    assert_eq!(json["data"][0]["display"]["publisher"], "Penguin");

    let response = get_with_cookie(app.clone(), "/admin/Book/data?search=tor", &cookie).await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 2);

    let response = get_with_cookie(app.clone(), "/admin/Book/data?search=nobody", &cookie).await;
    let json = body_json(response).await;
    assert_eq!(json["total"], 0);

    let response = get_with_cookie(app, "/admin/Book/data?sort=missing", &cookie).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_field_search_and_inline_rows(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    seed_books(&pool).await;
    let app = common::build_test_app_with(pool, common::test_config(), bookstore_site());
    let cookie = session_cookie(Some(user.id));

    let response = get_with_cookie(app.clone(), "/admin/Book/search?search_title=hyp", &cookie).await;
    let json = body_json(response).await;
    assert_eq!(json["data"].as_array().unwrap().len(), 1);
    assert_eq!(json["data"][0]["data"]["title"], "Hyperion");

    let response = get_with_cookie(
        app.clone(),
        "/admin/Book/inline_data?parent_id=1&inline_model=BookReview",
        &cookie,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["total"], 2);

    let response = get_with_cookie(app, "/admin/Book/inline_data?parent_id=1", &cookie).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_add_edit_delete_cycle(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    seed_books(&pool).await;
    let app = common::build_test_app_with(pool.clone(), common::test_config(), bookstore_site());
    let cookie = session_cookie(Some(user.id));

    let response = post_form(
        app.clone(),
        "/admin/Book/add",
        &[("title", "Snow Crash"), ("publisher_id", "1")],
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(response.headers()[LOCATION], "/admin/Book");

    let id: i64 = sqlx::query_scalar("SELECT id FROM books WHERE title = 'Snow Crash'")
        .fetch_one(&pool)
        .await
        .unwrap();

    let response = post_form(
        app.clone(),
        &format!("/admin/Book/{id}/edit"),
        &[("title", "Snow Crash (2nd ed.)"), ("publisher_id", "2")],
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["success"], true);

    let title: String = sqlx::query_scalar("SELECT title FROM books WHERE id = $1")
        .bind(id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(title, "Snow Crash (2nd ed.)");

    let response = post_form(app.clone(), &format!("/admin/Book/{id}/delete"), &[], Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = post_form(app, &format!("/admin/Book/{id}/delete"), &[], Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_add_without_required_field_rerenders_form(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    seed_books(&pool).await;
    let app = common::build_test_app_with(pool, common::test_config(), bookstore_site());

    let response = post_form(
        app,
        "/admin/Book/add",
        &[("publisher_id", "1")],
        Some(&session_cookie(Some(user.id))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_text(response).await;
    assert!(body.contains("Title is required"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_add_admin_user_hashes_password(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    let app = common::build_test_app(pool.clone());

    let response = post_form(
        app,
        "/admin/AdminUser/add",
        &[
            ("username", "carol"),
            ("email", "carol@example.com"),
            ("password_hash", "s3cret-pass"),
            ("is_active", "true"),
        ],
        Some(&session_cookie(Some(user.id))),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let carol = AdminUserRepo::find_by_username(&pool, "carol").await.unwrap().unwrap();
    assert!(carol.is_active);
    assert!(!carol.is_superuser);
    assert!(oxadmin_core::password::verify_password("s3cret-pass", &carol.password_hash).unwrap());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_batch_delete(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    seed_books(&pool).await;
    sqlx::query("DELETE FROM book_reviews").execute(&pool).await.unwrap();
    let app = common::build_test_app_with(pool.clone(), common::test_config(), bookstore_site());
    let cookie = session_cookie(Some(user.id));

    let response = post_form(app.clone(), "/admin/Book/batch_delete", &[], Some(&cookie)).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_form(
        app,
        "/admin/Book/batch_delete",
        &[("ids[]", "1"), ("ids[]", "2"), ("ids[]", "999")],
        Some(&cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["success"], true);
    assert_eq!(json["deleted"], 2);

    let remaining: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_delete_referenced_row_is_conflict(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    seed_books(&pool).await;
    let app = common::build_test_app_with(pool, common::test_config(), bookstore_site());

    let response = post_form(app, "/admin/Book/1/delete", &[], Some(&session_cookie(Some(user.id)))).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_export_csv_of_selected_ids(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    seed_books(&pool).await;
    let app = common::build_test_app_with(pool, common::test_config(), bookstore_site());

    let response = get_with_cookie(
        app,
        "/admin/Book/export?format=csv&ids=1,3",
        &session_cookie(Some(user.id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/csv"));
    let disposition = response.headers()[CONTENT_DISPOSITION].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"Book_"));

    let body = body_text(response).await;
    assert!(body.contains("Dune"));
    assert!(body.contains("Neuromancer"));
    assert!(!body.contains("Hyperion"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_export_unknown_format_is_400(pool: PgPool) {
    let user = create_admin(&pool, "alice").await;
    seed_books(&pool).await;
    let app = common::build_test_app_with(pool, common::test_config(), bookstore_site());

    let response = get_with_cookie(
        app,
        "/admin/Book/export?format=pdf",
        &session_cookie(Some(user.id)),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["success"], false);
}
