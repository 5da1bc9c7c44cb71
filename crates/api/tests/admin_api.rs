//! Integration tests for user/company administration and the health check.

mod common;

use axum::http::StatusCode;
use common::{
    body_json, build_test_app, delete_auth, get, get_auth, login, post_json, post_json_auth,
    put_json_auth, seed_and_login, seed_company, seed_user, PASSWORD,
};
use pioneer_core::roles::Role;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../db/migrations")]
async fn health_reports_database_status(pool: PgPool) {
    let app = build_test_app(pool);
    let response = get(app, "/health").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["db_healthy"], true);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn unknown_records_are_not_found(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, admin) = seed_and_login(&app, &pool, "admin@example.com", Role::Admin, None).await;

    let response = get(app.clone(), "/api/v1/lessons/999999").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], "NOT_FOUND");

    let response = get_auth(app, "/api/v1/admin/companies/999999", &admin).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn admin_creates_company_and_member(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, admin) = seed_and_login(&app, &pool, "admin@example.com", Role::Admin, None).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/companies",
        json!({ "name": "Initech", "contact_email": "hello@initech.com" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let company = body_json(response).await["data"]["id"].as_i64().unwrap();

    let duplicate = post_json_auth(
        app.clone(),
        "/api/v1/admin/companies",
        json!({ "name": "Initech" }),
        &admin,
    )
    .await;
    assert_eq!(duplicate.status(), StatusCode::CONFLICT);

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/users",
        json!({
            "email": " Peter@Initech.com ",
            "name": "  Peter ",
            "password": PASSWORD,
            "role": "company",
            "company_id": company
        }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let user = body_json(response).await;
    assert_eq!(user["data"]["role"], "company");
    assert_eq!(user["data"]["company_id"], company);
    assert_eq!(user["data"]["email"], "peter@initech.com");
    assert_eq!(user["data"]["name"], "Peter");

    // The new account can log in and carries its company.
    let token = login(&app, "peter@initech.com").await;
    let me = body_json(get_auth(app.clone(), "/api/v1/users/me", &token).await).await;
    assert_eq!(me["data"]["company_id"], company);

    let listing = body_json(get_auth(app, "/api/v1/admin/users", &admin).await).await;
    assert_eq!(listing["data"]["total"], 2);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn company_role_requires_a_company(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let (_, admin) = seed_and_login(&app, &pool, "admin@example.com", Role::Admin, None).await;

    let response = post_json_auth(
        app.clone(),
        "/api/v1/admin/users",
        json!({
            "email": "nocompany@example.com",
            "name": "Lonely",
            "password": PASSWORD,
            "role": "company"
        }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app,
        "/api/v1/admin/users",
        json!({
            "email": "ghostco@example.com",
            "name": "Ghost",
            "password": PASSWORD,
            "role": "company",
            "company_id": 424242
        }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn role_changes_and_deletion(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let company = seed_company(&pool, "Acme").await;
    let (admin_user, admin) = seed_and_login(&app, &pool, "admin@example.com", Role::Admin, None).await;
    let (user, token) = seed_and_login(&app, &pool, "promote@example.com", Role::User, None).await;

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/admin/users/{}/role", user.id),
        json!({ "role": "company", "company_id": company }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["role"], "company");

    // Admins cannot remove themselves.
    let response = delete_auth(
        app.clone(),
        &format!("/api/v1/admin/users/{}", admin_user.id),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = delete_auth(app.clone(), &format!("/api/v1/admin/users/{}", user.id), &admin).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Non-admins are kept out of the admin tree.
    let response = get_auth(app, "/api/v1/admin/users", &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn suspended_companies_cannot_sign_in(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let company = seed_company(&pool, "Initech").await;
    let (_, admin) = seed_and_login(&app, &pool, "admin@example.com", Role::Admin, None).await;
    seed_user(&pool, "bill@initech.com", Role::Company, Some(company)).await;
    seed_user(&pool, "peter@initech.com", Role::User, Some(company)).await;

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/admin/companies/{company}"),
        json!({ "name": "Initech Ltd", "description": "TPS reports" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["name"], "Initech Ltd");

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/admin/companies/{company}/status"),
        json!({ "status": "suspended" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "suspended");

    let credentials = json!({ "email": "bill@initech.com", "password": PASSWORD });
    let response = post_json(app.clone(), "/api/v1/auth/login", credentials.clone()).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    // Plain members of the company are unaffected.
    login(&app, "peter@initech.com").await;

    let response = put_json_auth(
        app.clone(),
        &format!("/api/v1/admin/companies/{company}/status"),
        json!({ "status": "active" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let response = post_json(app.clone(), "/api/v1/auth/login", credentials).await;
    assert_eq!(response.status(), StatusCode::OK);

    let response = put_json_auth(
        app,
        "/api/v1/admin/companies/999999/status",
        json!({ "status": "suspended" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
