pub mod auth;
pub mod board;
pub mod introduction;
pub mod lifecycle;
pub mod middleware;
pub mod protocol;
pub mod rest;
pub mod state;
pub mod ws_handler;

use axum::{
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

pub use middleware::require_session;
pub use rest::ApiDoc;
pub use state::AppState;
pub use ws_handler::{board_ws_handler, introduction_ws_handler};

/// Builds every route of the service. Layers that depend on deployment
/// (CORS, Swagger UI) are added by the binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    // Public routes (no session required)
    let public_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/verify", get(auth::verify_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler))
        .route("/auth/password-reset", post(auth::password_reset_handler))
        .route(
            "/auth/password-reset/confirm",
            post(auth::password_reset_confirm_handler),
        )
        .route(
            "/api/thoughts",
            // `get` would also answer HEAD.
            get(rest::list_thoughts_handler)
                .head(rest::method_not_allowed)
                .fallback(rest::method_not_allowed),
        )
        .route("/api/board", get(rest::board_layout_handler))
        .route("/ws/board", get(board_ws_handler))
        // Gated inside the handler so a denied page gets a redirect rather than a 401.
        .route("/ws/introduction", get(introduction_ws_handler));

    // Protected routes (verified session required)
    let protected_routes = Router::new()
        .route("/auth/change-password", post(auth::change_password_handler))
        .route_layer(axum_middleware::from_fn_with_state(
            app_state.clone(),
            require_session,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(app_state)
}
