mod common;

use axum::{body::Body, http::Request};
use chrono::Utc;
use common::{json_body, TestApp, UnreachableStore};
use memory_wall_core::domain::{NewThought, THOUGHTS};
use memory_wall_core::ports::DocumentStore;
use serde_json::json;
use std::sync::Arc;

async fn seed(app: &TestApp, name: &str, text: &str) {
    let record = NewThought {
        name: name.into(),
        email: "alice.2125cs001@kiet.edu".into(),
        user_id: "uid-1".into(),
        thought: text.into(),
        timestamp: Utc::now(),
    };
    app.state
        .store
        .create_document(THOUGHTS, record.into_fields())
        .await
        .unwrap();
}

#[tokio::test]
async fn get_lists_name_thought_and_timestamp() {
    let app = TestApp::new();
    seed(&app, "Alice", "Best four years ever").await;

    let response = app
        .send(Request::get("/api/thoughts").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), 200);

    let body = json_body(response).await;
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["name"], "Alice");
    assert_eq!(items[0]["thought"], "Best four years ever");
    assert!(items[0]["timestamp"].is_string());
    assert!(items[0].get("email").is_none());
}

#[tokio::test]
async fn empty_collection_is_an_empty_list() {
    let app = TestApp::new();
    let response = app
        .send(Request::get("/api/thoughts").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn unreachable_store_still_answers_ok() {
    let app = TestApp::with_store(Arc::new(UnreachableStore));
    let response = app
        .send(Request::get("/api/thoughts").body(Body::empty()).unwrap())
        .await;
    assert_eq!(response.status(), 200);
    assert_eq!(json_body(response).await, json!([]));
}

#[tokio::test]
async fn other_methods_are_not_allowed() {
    let app = TestApp::new();
    for method in ["HEAD", "POST", "PUT", "DELETE", "PATCH"] {
        let response = app
            .send(
                Request::builder()
                    .method(method)
                    .uri("/api/thoughts")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), 405, "{} /api/thoughts", method);
        if method == "HEAD" {
            // HEAD answers carry no body.
            continue;
        }
        assert_eq!(
            json_body(response).await,
            json!({ "message": "Method Not Allowed" })
        );
    }
}

#[tokio::test]
async fn board_layout_is_reproducible_with_a_seed() {
    let app = TestApp::new();
    seed(&app, "Alice", "Best four years ever").await;
    seed(&app, "Bob", "Canteen samosas forever").await;

    let first = json_body(
        app.send(
            Request::get("/api/board?width=1024&seed=7")
                .body(Body::empty())
                .unwrap(),
        )
        .await,
    )
    .await;
    let second = json_body(
        app.send(
            Request::get("/api/board?width=1024&seed=7")
                .body(Body::empty())
                .unwrap(),
        )
        .await,
    )
    .await;

    assert_eq!(first["mode"], "hover");
    assert!(first["notice"].is_null());
    let bubbles = first["bubbles"].as_array().unwrap();
    assert_eq!(bubbles.len(), 2);
    for bubble in bubbles {
        let diameter = bubble["placement"]["diameter"].as_f64().unwrap();
        assert!((50.0..55.0).contains(&diameter));
        assert!(bubble["teaser"].as_str().unwrap().ends_with("..."));
    }

    // The store lists in a stable order, so the same seed gives the same board.
    assert_eq!(first["bubbles"], second["bubbles"]);
}

#[tokio::test]
async fn narrow_board_with_unreachable_store_has_a_notice() {
    let app = TestApp::with_store(Arc::new(UnreachableStore));
    let body = json_body(
        app.send(
            Request::get("/api/board?width=400")
                .body(Body::empty())
                .unwrap(),
        )
        .await,
    )
    .await;
    assert_eq!(body["mode"], "toggle");
    assert_eq!(body["bubbles"], json!([]));
    assert!(body["notice"].is_string());
}
