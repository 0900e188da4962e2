//! Submission endpoint tests.
//!
//! Tests verify:
//! - Public creation, reading and grading of submissions
//! - `/submition` requires a credential
//! - `/submits?email=` only returns the caller's own submissions
//! - Malformed query strings get the JSON error body

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};

use group_study_server::store::Collection;

use super::test_utils::{
    body_json, create, get, get_with_cookie, json_request, login, send, test_app,
};

fn submission(email: &str, title: &str) -> Value {
    json!({
        "title": title,
        "pdf": format!("https://drive.example/{}.pdf", title),
        "email": email,
        "studentName": "Student",
        "assignment_id": "65a1f0c2e4b0a1b2c3d4e5f6",
        "message": "please review"
    })
}

fn emails(list: &Value) -> Vec<&str> {
    list.as_array()
        .unwrap()
        .iter()
        .map(|s| s["email"].as_str().unwrap())
        .collect()
}

// =============================================================================
// Create, Read, Grade
// =============================================================================

#[tokio::test]
async fn test_create_and_get_submission() {
    let (app, _) = test_app();
    let id = create(&app, "/submits", submission("a@x.com", "HW1")).await;

    let response = send(&app, get(&format!("/submits/{}", id))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let stored = body_json(response).await;
    assert_eq!(stored["_id"], id.as_str());
    assert_eq!(stored["email"], "a@x.com");
    assert_eq!(stored["studentName"], "Student");
    assert_eq!(stored["assignment_id"], "65a1f0c2e4b0a1b2c3d4e5f6");
}

#[tokio::test]
async fn test_create_submission_requires_valid_email() {
    let (app, store) = test_app();

    let response = send(
        &app,
        json_request(Method::POST, "/submits", submission("not-an-email", "HW1")),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Invalid email address");
    assert_eq!(store.len(Collection::Submissions).await, 0);
}

#[tokio::test]
async fn test_grade_submission() {
    let (app, _) = test_app();
    let id = create(&app, "/submits", submission("a@x.com", "HW1")).await;
    let uri = format!("/submits/{}", id);

    let response = send(
        &app,
        json_request(
            Method::PUT,
            &uri,
            json!({"givemark": 9, "feedback": "Well argued"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["modifiedCount"], 1);

    let graded = body_json(send(&app, get(&uri)).await).await;
    assert_eq!(graded["givemark"], 9);
    assert_eq!(graded["feedback"], "Well argued");
    assert_eq!(graded["title"], "HW1");
}

#[tokio::test]
async fn test_grading_missing_submission_creates_it() {
    let (app, store) = test_app();
    let id = "65b2a1d3f4c5e6a7b8c9d0e1";
    let uri = format!("/submits/{}", id);

    let response = send(
        &app,
        json_request(Method::PUT, &uri, json!({"givemark": 7, "feedback": "Late"})),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let result = body_json(response).await;
    assert_eq!(result["matchedCount"], 0);
    assert_eq!(result["modifiedCount"], 0);
    assert_eq!(result["upsertedCount"], 1);
    assert_eq!(result["upsertedId"], id);

    let created = body_json(send(&app, get(&uri)).await).await;
    assert_eq!(created["_id"], id);
    assert_eq!(created["givemark"], 7);
    assert_eq!(created["feedback"], "Late");
    assert_eq!(store.len(Collection::Submissions).await, 1);
}

#[tokio::test]
async fn test_negative_mark_rejected() {
    let (app, _) = test_app();
    let id = create(&app, "/submits", submission("a@x.com", "HW1")).await;

    let response = send(
        &app,
        json_request(
            Method::PUT,
            &format!("/submits/{}", id),
            json!({"givemark": -1}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["message"], "Marks cannot be negative");
}

// =============================================================================
// Authenticated Listings
// =============================================================================

#[tokio::test]
async fn test_all_submissions_requires_credential() {
    let (app, _) = test_app();

    let response = send(&app, get("/submition")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await,
        json!({"message": "Unauthorized access"})
    );
}

#[tokio::test]
async fn test_all_submissions_with_credential() {
    let (app, _) = test_app();
    create(&app, "/submits", submission("a@x.com", "HW1")).await;
    create(&app, "/submits", submission("b@y.com", "HW1")).await;
    let cookie = login(&app, json!({"email": "a@x.com"})).await;

    let response = send(&app, get_with_cookie("/submition", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(emails(&body_json(response).await), vec!["a@x.com", "b@y.com"]);
}

#[tokio::test]
async fn test_own_submissions_filtered_by_email() {
    let (app, _) = test_app();
    create(&app, "/submits", submission("a@x.com", "HW1")).await;
    create(&app, "/submits", submission("b@y.com", "HW1")).await;
    create(&app, "/submits", submission("a@x.com", "HW2")).await;
    let cookie = login(&app, json!({"email": "a@x.com"})).await;

    let response = send(&app, get_with_cookie("/submits?email=a@x.com", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let list = body_json(response).await;
    assert_eq!(emails(&list), vec!["a@x.com", "a@x.com"]);
    let titles: Vec<&str> = list
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["HW1", "HW2"]);
}

#[tokio::test]
async fn test_other_users_submissions_forbidden() {
    let (app, _) = test_app();
    create(&app, "/submits", submission("b@y.com", "HW1")).await;
    let cookie = login(&app, json!({"email": "a@x.com"})).await;

    let response = send(&app, get_with_cookie("/submits?email=b@y.com", &cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert_eq!(
        body_json(response).await,
        json!({"message": "forbidden access"})
    );
}

#[tokio::test]
async fn test_forbidden_even_when_no_submissions_exist() {
    let (app, _) = test_app();
    let cookie = login(&app, json!({"email": "a@x.com"})).await;

    let response = send(&app, get_with_cookie("/submits?email=b@y.com", &cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_missing_email_query_forbidden_for_email_token() {
    let (app, _) = test_app();
    let cookie = login(&app, json!({"email": "a@x.com"})).await;

    let response = send(&app, get_with_cookie("/submits", &cookie)).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_token_without_email_lists_all_when_query_absent() {
    let (app, _) = test_app();
    create(&app, "/submits", submission("a@x.com", "HW1")).await;
    create(&app, "/submits", submission("b@y.com", "HW1")).await;
    let cookie = login(&app, json!({"role": "grader"})).await;

    let response = send(&app, get_with_cookie("/submits", &cookie)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(emails(&body_json(response).await).len(), 2);
}

#[tokio::test]
async fn test_own_submissions_without_cookie_unauthorized() {
    let (app, _) = test_app();

    let response = send(&app, get("/submits?email=a@x.com")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_malformed_query_is_json_bad_request() {
    let (app, _) = test_app();
    let cookie = login(&app, json!({"email": "a@x.com"})).await;

    let response = send(
        &app,
        get_with_cookie("/submits?email=a@x.com&email=b@y.com", &cookie),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.headers().get("content-type").unwrap(),
        "application/json"
    );

    let json = body_json(response).await;
    assert!(json["message"]
        .as_str()
        .unwrap()
        .starts_with("Malformed query string"));
}
