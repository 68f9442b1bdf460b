//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the read-only REST endpoints and the master
//! definition for the OpenAPI specification.

use crate::web::auth::{
    self, AuthResponse, ChangePasswordRequest, LoginRequest, MessageResponse,
    PasswordResetConfirmRequest, PasswordResetRequest, RegisterRequest, RegisterResponse,
};
use crate::web::board::{load_thoughts, BoardPage};
use crate::web::protocol::ServerMessage;
use crate::web::state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use chrono::{DateTime, Utc};
use memory_wall_core::board::{Bubble, DisclosureMode};
use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::warn;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_thoughts_handler,
        board_layout_handler,
        auth::register_handler,
        auth::verify_handler,
        auth::login_handler,
        auth::logout_handler,
        auth::password_reset_handler,
        auth::password_reset_confirm_handler,
        auth::change_password_handler,
    ),
    components(
        schemas(
            ThoughtSummary,
            BoardLayoutResponse,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            AuthResponse,
            PasswordResetRequest,
            PasswordResetConfirmRequest,
            ChangePasswordRequest,
            MessageResponse,
        )
    ),
    tags(
        (name = "Memory Wall API", description = "Thoughts shared by the class, and the accounts that share them.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

/// One thought as exposed to external callers.
#[derive(Serialize, ToSchema)]
pub struct ThoughtSummary {
    pub name: String,
    pub thought: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct BoardQuery {
    /// Viewport width in pixels; below the narrow breakpoint details open on tap.
    pub width: Option<u32>,
    /// Fixes the placement of every bubble.
    pub seed: Option<u64>,
}

#[derive(Serialize, ToSchema)]
pub struct BoardLayoutResponse {
    #[schema(value_type = Vec<Object>)]
    pub bubbles: Vec<Bubble>,
    #[schema(value_type = String, example = "hover")]
    pub mode: DisclosureMode,
    /// Set when the thoughts could not be fetched.
    pub notice: Option<String>,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// List every thought.
///
/// Never fails: if the store cannot be read, the list is empty.
#[utoipa::path(
    get,
    path = "/api/thoughts",
    responses(
        (status = 200, description = "All stored thoughts, in no particular order", body = [ThoughtSummary]),
        (status = 405, description = "Any method other than GET")
    )
)]
pub async fn list_thoughts_handler(State(app_state): State<Arc<AppState>>) -> impl IntoResponse {
    let summaries = match load_thoughts(app_state.store.as_ref()).await {
        Ok(thoughts) => thoughts
            .into_iter()
            .map(|t| ThoughtSummary {
                name: t.name,
                thought: t.thought,
                timestamp: t.timestamp,
            })
            .collect(),
        Err(e) => {
            warn!("Listing thoughts failed, answering with an empty list: {:?}", e);
            Vec::new()
        }
    };
    (StatusCode::OK, Json(summaries))
}

/// Answers every method other than GET on `/api/thoughts`.
pub async fn method_not_allowed() -> impl IntoResponse {
    (
        StatusCode::METHOD_NOT_ALLOWED,
        Json(json!({ "message": "Method Not Allowed" })),
    )
}

/// Lay out the board once, without a live session.
#[utoipa::path(
    get,
    path = "/api/board",
    params(BoardQuery),
    responses(
        (status = 200, description = "Bubble placements for every thought", body = BoardLayoutResponse)
    )
)]
pub async fn board_layout_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<BoardQuery>,
) -> impl IntoResponse {
    let breakpoint = app_state.config.narrow_breakpoint_px;
    let mode = query
        .width
        .map(|width| DisclosureMode::for_width(width, breakpoint))
        .unwrap_or(DisclosureMode::Hover);
    let mut rng = match query.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    let fetched = load_thoughts(app_state.store.as_ref()).await;
    let (page, notice) = BoardPage::from_fetch(fetched, mode, breakpoint, &mut rng);
    let notice = match notice {
        Some(ServerMessage::Notice { message }) => Some(message),
        _ => None,
    };

    Json(BoardLayoutResponse {
        bubbles: page.board().bubbles().to_vec(),
        mode,
        notice,
    })
}
