//! Shared fixtures for the service integration tests.

#![allow(dead_code)]

use api_lib::adapters::{MemoryDocumentStore, MemoryIdentity, OutboxMailer};
use api_lib::config::Config;
use api_lib::web::{self, AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Request, Response},
    Router,
};
use memory_wall_core::domain::{Fields, StoredDocument};
use memory_wall_core::ports::{DocumentStore, PortError, PortResult};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

pub struct TestApp {
    pub state: Arc<AppState>,
    pub outbox: Arc<OutboxMailer>,
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryDocumentStore::new()))
    }

    pub fn with_store(store: Arc<dyn DocumentStore>) -> Self {
        let outbox = Arc::new(OutboxMailer::new());
        let identity = Arc::new(MemoryIdentity::new(outbox.clone(), "http://localhost:3000"));
        let state = AppState::new(identity, store, Arc::new(Config::default()))
            .expect("default config is valid");
        Self {
            state: Arc::new(state),
            outbox,
        }
    }

    pub fn router(&self) -> Router {
        web::router(self.state.clone())
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router().oneshot(request).await.expect("router is infallible")
    }

    /// Registers, verifies and signs in; returns the session token.
    pub async fn signed_in(&self, first_name: &str, email: &str, password: &str) -> String {
        let response = self
            .send(json_request(
                "POST",
                "/auth/register",
                serde_json::json!({ "firstName": first_name, "email": email, "password": password }),
            ))
            .await;
        assert_eq!(response.status(), 201);

        let token = self.outbox.latest_token(email).expect("verification mail");
        let response = self
            .send(
                Request::get(format!("/auth/verify?token={}", token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await;
        assert_eq!(response.status(), 200);

        let response = self
            .send(json_request(
                "POST",
                "/auth/login",
                serde_json::json!({ "email": email, "password": password }),
            ))
            .await;
        assert_eq!(response.status(), 200);
        session_from(&response).expect("login sets the session cookie")
    }
}

pub fn json_request(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn session_from(response: &Response<Body>) -> Option<String> {
    let cookie = response.headers().get(header::SET_COOKIE)?.to_str().ok()?;
    let pair = cookie.split(';').next()?;
    pair.strip_prefix("session=")
        .filter(|token| !token.is_empty())
        .map(str::to_string)
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// A store whose every call fails, as if the backend were unreachable.
pub struct UnreachableStore;

#[async_trait]
impl DocumentStore for UnreachableStore {
    async fn create_document(&self, _collection: &str, _fields: Fields) -> PortResult<String> {
        Err(PortError::Unexpected("store unreachable".into()))
    }

    async fn set_document(&self, _collection: &str, _id: &str, _fields: Fields) -> PortResult<()> {
        Err(PortError::Unexpected("store unreachable".into()))
    }

    async fn get_document(&self, _collection: &str, _id: &str) -> PortResult<Fields> {
        Err(PortError::Unexpected("store unreachable".into()))
    }

    async fn list_documents(&self, _collection: &str) -> PortResult<Vec<StoredDocument>> {
        Err(PortError::Unexpected("store unreachable".into()))
    }
}
