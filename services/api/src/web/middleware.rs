//! services/api/src/web/middleware.rs
//!
//! Session cookie handling and the middleware guarding JSON routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use memory_wall_core::domain::Principal;
use memory_wall_core::gate::{evaluate, GateDecision};
use std::sync::Arc;
use tracing::error;

use crate::web::state::AppState;

pub const SESSION_COOKIE: &str = "session";

/// A verified session, inserted into request extensions by [`require_session`].
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub token: String,
    pub principal: Principal,
    pub decision: GateDecision,
}

/// Extracts the `session` cookie value, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .find_map(|c| {
            c.trim()
                .strip_prefix(SESSION_COOKIE)
                .and_then(|rest| rest.strip_prefix('='))
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })
}

/// Resolves the request's session and runs it through the gate policy.
pub async fn resolve_session(
    state: &AppState,
    headers: &HeaderMap,
) -> (Option<(String, Principal)>, GateDecision) {
    let session = match session_token(headers) {
        Some(token) => match state.identity.current_session(&token).await {
            Ok(Some(principal)) => Some((token, principal)),
            Ok(None) => None,
            Err(e) => {
                error!("Failed to validate session: {:?}", e);
                None
            }
        },
        None => None,
    };
    let decision = evaluate(session.as_ref().map(|(_, p)| p), &state.email_policy);
    (session, decision)
}

/// Middleware that admits only signed-in, verified sessions.
///
/// If admitted, inserts an [`AuthSession`] into request extensions for handlers to use.
/// Otherwise returns 401 Unauthorized.
pub async fn require_session(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let (session, decision) = resolve_session(&state, req.headers()).await;
    let (token, principal) = match session {
        Some(session) if decision.admits() => session,
        _ => return Err(StatusCode::UNAUTHORIZED),
    };

    req.extensions_mut().insert(AuthSession {
        token,
        principal,
        decision,
    });
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn finds_session_among_other_cookies() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; session=abc123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn empty_or_missing_cookie_is_no_session() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(header::COOKIE, HeaderValue::from_static("session="));
        assert_eq!(session_token(&headers), None);
    }
}
