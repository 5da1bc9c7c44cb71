//! Integration tests for applying to meetings and reviewing applications.

mod common;

use axum::http::StatusCode;
use axum::Router;
use common::{
    body_json, build_test_app, get_auth, post_auth, post_json_auth, seed_and_login, seed_company,
};
use pioneer_core::roles::Role;
use serde_json::json;
use sqlx::PgPool;

/// Create a draft meeting as `owner`. Returns `(root_id, version_id)`.
async fn draft_meeting(app: &Router, owner: &str) -> (i64, i64) {
    let meeting = json!({
        "name": "Kickoff",
        "start_time": "2026-11-01T10:00:00Z",
        "end_time": "2026-11-01T11:00:00Z"
    });
    let response =
        post_json_auth(app.clone(), "/api/v1/meetings", json!({ "content": meeting }), owner).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    (
        json["data"]["root"]["id"].as_i64().unwrap(),
        json["data"]["version"]["id"].as_i64().unwrap(),
    )
}

async fn publish(app: &Router, root: i64, version: i64, owner: &str, admin: &str) {
    let uri = format!("/api/v1/meetings/{root}/versions/{version}/submit");
    assert_eq!(post_auth(app.clone(), &uri, owner).await.status(), StatusCode::NO_CONTENT);
    let uri = format!("/api/v1/admin/meetings/{root}/versions/{version}/review");
    let response = post_json_auth(app.clone(), &uri, json!({ "decision": "approve" }), admin).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn applying_to_a_meeting(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let company = seed_company(&pool, "Acme").await;
    let (_, owner) = seed_and_login(&app, &pool, "owner@acme.com", Role::Company, Some(company)).await;
    let (_, admin) = seed_and_login(&app, &pool, "admin@example.com", Role::Admin, None).await;
    let (guest, guest_token) = seed_and_login(&app, &pool, "guest@example.com", Role::User, None).await;

    let (root, version) = draft_meeting(&app, &owner).await;
    let join_uri = format!("/api/v1/meetings/{root}/participants");

    // Drafts take no applications.
    let response = post_json_auth(app.clone(), &join_uri, json!({}), &guest_token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    publish(&app, root, version, &owner, &admin).await;

    let response = post_json_auth(app.clone(), &join_uri, json!({}), &owner).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = post_json_auth(
        app.clone(),
        &join_uri,
        json!({ "join_reason": "  Curious about the roadmap " }),
        &guest_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let application = body_json(response).await;
    assert_eq!(application["data"]["status"], "pending");
    assert_eq!(application["data"]["user_id"], guest.id);
    assert_eq!(application["data"]["join_reason"], "Curious about the roadmap");

    let again = post_json_auth(app.clone(), &join_uri, json!({}), &guest_token).await;
    assert_eq!(again.status(), StatusCode::CONFLICT);

    let mine = body_json(get_auth(app.clone(), "/api/v1/meetings/participations", &guest_token).await).await;
    assert_eq!(mine["data"]["total"], 1);
    assert_eq!(mine["data"]["items"][0]["meeting_id"], root);

    let response = post_json_auth(
        app,
        "/api/v1/meetings/999999/participants",
        json!({}),
        &guest_token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../db/migrations")]
async fn creators_review_applications(pool: PgPool) {
    let app = build_test_app(pool.clone());
    let company = seed_company(&pool, "Acme").await;
    let rival = seed_company(&pool, "Globex").await;
    let (_, owner) = seed_and_login(&app, &pool, "owner@acme.com", Role::Company, Some(company)).await;
    let (_, outsider) = seed_and_login(&app, &pool, "boss@globex.com", Role::Company, Some(rival)).await;
    let (_, admin) = seed_and_login(&app, &pool, "admin@example.com", Role::Admin, None).await;
    let (_, guest) = seed_and_login(&app, &pool, "guest@example.com", Role::User, None).await;

    let (root, version) = draft_meeting(&app, &owner).await;
    publish(&app, root, version, &owner, &admin).await;
    let response = post_json_auth(
        app.clone(),
        &format!("/api/v1/meetings/{root}/participants"),
        json!({}),
        &guest,
    )
    .await;
    let participant = body_json(response).await["data"]["id"].as_i64().unwrap();

    let list_uri = format!("/api/v1/meetings/{root}/participants");
    let response = get_auth(app.clone(), &list_uri, &outsider).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let listing = body_json(get_auth(app.clone(), &list_uri, &owner).await).await;
    assert_eq!(listing["data"]["total"], 1);

    let queue = body_json(
        get_auth(app.clone(), "/api/v1/meetings/applications?status=pending", &owner).await,
    )
    .await;
    assert_eq!(queue["data"]["total"], 1);
    let response = get_auth(app.clone(), "/api/v1/meetings/applications", &guest).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let review_uri = format!("/api/v1/meetings/{root}/participants/{participant}/review");
    let decision = json!({ "decision": "approve", "comment": "See you there" });
    let response = post_json_auth(app.clone(), &review_uri, decision.clone(), &guest).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = post_json_auth(app.clone(), &review_uri, decision.clone(), &owner).await;
    assert_eq!(response.status(), StatusCode::OK);
    let decided = body_json(response).await;
    assert_eq!(decided["data"]["status"], "approved");
    assert_eq!(decided["data"]["review_comment"], "See you there");

    // A decision is final.
    let response = post_json_auth(
        app.clone(),
        &review_uri,
        json!({ "decision": "reject" }),
        &admin,
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let queue = body_json(
        get_auth(app, "/api/v1/meetings/applications?status=approved", &owner).await,
    )
    .await;
    assert_eq!(queue["data"]["total"], 1);
}
