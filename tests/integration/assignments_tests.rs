//! Assignment and feature endpoint tests.
//!
//! Tests verify:
//! - Create then read through both `/assignment/{id}` and `/assignments/{id}`
//! - Upsert creation, partial overwrite and idempotence
//! - Delete followed by a `null` read
//! - 400 for bad ids and invalid bodies, 500 for store failures

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use group_study_server::store::{Collection, MemoryStore};
use group_study_server::{create_router, RouterConfig};

use super::test_utils::{
    body_json, body_text, create, delete, get, json_request, send, test_app, FailingStore, SECRET,
};

const MISSING_ID: &str = "65a1f0c2e4b0a1b2c3d4e5f6";

// =============================================================================
// Service Endpoints
// =============================================================================

#[tokio::test]
async fn test_root_banner() {
    let (app, _) = test_app();

    let response = send(&app, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_text(response).await,
        "Online Group Study Server is Running."
    );
}

#[tokio::test]
async fn test_health() {
    let (app, _) = test_app();

    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_features_lists_seeded_documents() {
    let (app, store) = test_app();
    store
        .seed(
            Collection::Features,
            vec![
                json!({"title": "Create assignments"}),
                json!({"title": "Grade peers"}),
            ],
        )
        .await;

    let response = send(&app, get("/features")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Create assignments", "Grade peers"]);
}

// =============================================================================
// Create and Read
// =============================================================================

#[tokio::test]
async fn test_create_then_get_assignment() {
    let (app, _) = test_app();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/assignments",
            json!({"title": "HW1", "marks": 10, "difficultyLevel": "easy"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);

    let inserted = body_json(response).await;
    assert_eq!(inserted["acknowledged"], true);
    let id = inserted["insertedId"].as_str().unwrap().to_string();
    assert_eq!(id.len(), 24);

    let response = send(&app, get(&format!("/assignment/{}", id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let assignment = body_json(response).await;
    assert_eq!(assignment["_id"], id.as_str());
    assert_eq!(assignment["title"], "HW1");
    assert_eq!(assignment["marks"], 10);
    assert_eq!(assignment["difficultyLevel"], "easy");

    // Both read paths return the same document.
    let response = send(&app, get(&format!("/assignments/{}", id))).await;
    assert_eq!(body_json(response).await, assignment);
}

#[tokio::test]
async fn test_list_assignments_in_insertion_order() {
    let (app, _) = test_app();
    create(&app, "/assignments", json!({"title": "HW1", "marks": 10})).await;
    create(&app, "/assignments", json!({"title": "HW2", "marks": 20})).await;

    let response = send(&app, get("/assignments")).await;
    let json = body_json(response).await;
    let titles: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["HW1", "HW2"]);
}

#[tokio::test]
async fn test_client_id_is_ignored_on_create() {
    let (app, store) = test_app();

    let id = create(
        &app,
        "/assignments",
        json!({"_id": MISSING_ID, "title": "HW1", "marks": 1}),
    )
    .await;

    assert_ne!(id, MISSING_ID);
    assert_eq!(store.len(Collection::Assignments).await, 1);
}

#[tokio::test]
async fn test_get_missing_assignment_is_null() {
    let (app, _) = test_app();

    let response = send(&app, get(&format!("/assignment/{}", MISSING_ID))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, Value::Null);
}

#[tokio::test]
async fn test_invalid_id_is_bad_request() {
    let (app, _) = test_app();

    let response = send(&app, get("/assignment/not-an-id")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["message"], "Invalid id: not-an-id");
}

#[tokio::test]
async fn test_create_assignment_validation() {
    let (app, store) = test_app();

    let response = send(
        &app,
        json_request(Method::POST, "/assignments", json!({"title": "", "marks": 10})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Title cannot be empty");

    let response = send(
        &app,
        json_request(Method::POST, "/assignments", json!({"title": "HW1"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    assert_eq!(store.len(Collection::Assignments).await, 0);
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let (app, _) = test_app();

    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/assignments")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Malformed request body"));
}

// =============================================================================
// Upsert
// =============================================================================

#[tokio::test]
async fn test_update_overwrites_only_named_fields() {
    let (app, _) = test_app();
    let id = create(
        &app,
        "/assignments",
        json!({"title": "HW1", "marks": 10, "description": "Chapter 1"}),
    )
    .await;

    let response = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/assignment/{}", id),
            json!({"title": "HW1 (revised)", "marks": 15}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["matchedCount"], 1);
    assert_eq!(result["modifiedCount"], 1);
    assert_eq!(result["upsertedId"], Value::Null);

    let assignment = body_json(send(&app, get(&format!("/assignment/{}", id))).await).await;
    assert_eq!(assignment["title"], "HW1 (revised)");
    assert_eq!(assignment["marks"], 15);
    assert_eq!(assignment["description"], "Chapter 1");
}

#[tokio::test]
async fn test_update_creates_missing_assignment() {
    let (app, store) = test_app();

    let response = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/assignment/{}", MISSING_ID),
            json!({"title": "Created by PUT", "marks": 5}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["matchedCount"], 0);
    assert_eq!(result["upsertedCount"], 1);
    assert_eq!(result["upsertedId"], MISSING_ID);

    let assignment =
        body_json(send(&app, get(&format!("/assignment/{}", MISSING_ID))).await).await;
    assert_eq!(assignment["title"], "Created by PUT");
    assert_eq!(store.len(Collection::Assignments).await, 1);
}

#[tokio::test]
async fn test_update_is_idempotent() {
    let (app, store) = test_app();
    let id = create(&app, "/assignments", json!({"title": "HW1", "marks": 10})).await;
    let uri = format!("/assignment/{}", id);
    let body = json!({"title": "Final", "marks": 12});

    send(&app, json_request(Method::PUT, &uri, body.clone())).await;
    let first = body_json(send(&app, get(&uri)).await).await;

    let response = send(&app, json_request(Method::PUT, &uri, body)).await;
    assert_eq!(body_json(response).await["modifiedCount"], 0);
    let second = body_json(send(&app, get(&uri)).await).await;

    assert_eq!(first, second);
    assert_eq!(store.len(Collection::Assignments).await, 1);
}

#[tokio::test]
async fn test_empty_update_is_bad_request() {
    let (app, store) = test_app();

    let response = send(
        &app,
        json_request(Method::PUT, &format!("/assignment/{}", MISSING_ID), json!({})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        body_json(response).await["message"],
        "Update must set at least one field"
    );
    assert_eq!(store.len(Collection::Assignments).await, 0);
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_then_get_is_null() {
    let (app, _) = test_app();
    let id = create(&app, "/assignments", json!({"title": "HW1", "marks": 10})).await;

    let response = send(&app, delete(&format!("/assignments/{}", id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["acknowledged"], true);
    assert_eq!(result["deletedCount"], 1);

    let response = send(&app, get(&format!("/assignment/{}", id))).await;
    assert_eq!(body_json(response).await, Value::Null);

    let response = send(&app, delete(&format!("/assignments/{}", id))).await;
    assert_eq!(body_json(response).await["deletedCount"], 0);
}

// =============================================================================
// Store Failures
// =============================================================================

#[tokio::test]
async fn test_store_failure_is_internal_error() {
    let app = create_router(FailingStore, RouterConfig::new(SECRET).with_tracing(false));

    let response = send(&app, get("/assignments")).await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Internal server error"})
    );
}

#[tokio::test]
async fn test_separate_stores_do_not_share_state() {
    let (first, _) = test_app();
    let second = create_router(MemoryStore::new(), RouterConfig::new(SECRET));

    create(&first, "/assignments", json!({"title": "HW1", "marks": 1})).await;

    let response = send(&second, get("/assignments")).await;
    assert_eq!(body_json(response).await, json!([]));
}
