//! services/api/src/web/auth.rs
//!
//! Account endpoints: registration, email verification, login, logout and
//! password management. All credential work is delegated to the identity port.

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::Duration;
use memory_wall_core::ports::PortError;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use utoipa::{IntoParams, ToSchema};

use crate::adapters::identity::SESSION_LIFETIME_DAYS;
use crate::error::ApiError;
use crate::web::middleware::{session_token, AuthSession, SESSION_COOKIE};
use crate::web::state::AppState;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub user_id: String,
    pub email: String,
    pub message: String,
}

#[derive(Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct VerifyQuery {
    pub token: String,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user_id: String,
    pub email: String,
    pub first_name: String,
    /// Page to open next: the introduction for institutional addresses, else the board.
    pub next: String,
}

#[derive(Deserialize, ToSchema)]
pub struct PasswordResetRequest {
    pub email: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PasswordResetConfirmRequest {
    pub token: String,
    pub new_password: String,
}

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

#[derive(Serialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Json<Self> {
        Json(Self {
            message: message.to_string(),
        })
    }
}

fn session_cookie(token: &str) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        token,
        Duration::days(SESSION_LIFETIME_DAYS).num_seconds()
    )
}

fn cleared_cookie() -> String {
    format!(
        "{}=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0",
        SESSION_COOKIE
    )
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create an unverified account and mail a verification link
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created, verification mail sent", body = RegisterResponse),
        (status = 400, description = "Missing fields"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.first_name.trim().is_empty() || req.email.trim().is_empty() || req.password.is_empty()
    {
        return Err(ApiError::BadRequest("Please fill in all fields.".to_string()));
    }

    let principal = state
        .identity
        .register_with_password(&req.email, &req.password, &req.first_name)
        .await?;

    if let Err(e) = state.identity.send_verification_email(&principal).await {
        error!("Failed to send verification email: {:?}", e);
    }

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: principal.user_id,
            email: principal.email,
            message: "Registration successful! Please check your email for verification"
                .to_string(),
        }),
    ))
}

/// GET /auth/verify - Confirm an email address from a mailed link
#[utoipa::path(
    get,
    path = "/auth/verify",
    params(VerifyQuery),
    responses(
        (status = 200, description = "Email verified", body = MessageResponse),
        (status = 400, description = "Unknown or used token")
    )
)]
pub async fn verify_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<VerifyQuery>,
) -> Result<impl IntoResponse, ApiError> {
    match state.identity.confirm_email(&query.token).await {
        Ok(principal) => {
            info!("Verified email for {}", principal.user_id);
            Ok(MessageResponse::new("Email verified. You can now log in."))
        }
        Err(PortError::NotFound(_)) => Err(ApiError::BadRequest(
            "This verification link is invalid or has already been used.".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// POST /auth/login - Sign in with email and password
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = AuthResponse),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Email not verified")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let (token, principal) = state
        .identity
        .sign_in_with_password(&req.email, &req.password)
        .await?;

    if !principal.email_verified {
        if let Err(e) = state.identity.sign_out(&token).await {
            warn!("Failed to drop unverified session: {:?}", e);
        }
        return Err(ApiError::Forbidden(
            "Please verify your email before logging in.".to_string(),
        ));
    }

    // The profile is created on the first verified login.
    let profile = state.ensure_profile(&principal).await?;

    let response = AuthResponse {
        next: state.email_policy.landing_for(&principal.email).to_string(),
        user_id: principal.user_id,
        email: principal.email,
        first_name: profile.first_name,
    };

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, session_cookie(&token))],
        Json(response),
    ))
}

/// POST /auth/logout - Sign out and clear the session cookie
#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = session_token(&headers).ok_or(PortError::Unauthorized)?;
    state.identity.sign_out(&token).await?;

    Ok((StatusCode::OK, [(header::SET_COOKIE, cleared_cookie())]))
}

/// POST /auth/password-reset - Mail a password reset link
#[utoipa::path(
    post,
    path = "/auth/password-reset",
    request_body = PasswordResetRequest,
    responses(
        (status = 200, description = "Reset mail sent", body = MessageResponse),
        (status = 400, description = "Reset mail could not be sent")
    )
)]
pub async fn password_reset_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .identity
        .send_password_reset(&req.email)
        .await
        .map_err(|e| {
            warn!("Password reset failed: {:?}", e);
            ApiError::BadRequest("Failed to send reset email. Please try again.".to_string())
        })?;
    Ok(MessageResponse::new(
        "Password reset email sent! Please check your inbox.",
    ))
}

/// POST /auth/password-reset/confirm - Set a new password from a reset link
#[utoipa::path(
    post,
    path = "/auth/password-reset/confirm",
    request_body = PasswordResetConfirmRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 400, description = "Unknown or used token")
    )
)]
pub async fn password_reset_confirm_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<PasswordResetConfirmRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.new_password.is_empty() {
        return Err(ApiError::BadRequest("Please fill in all fields.".to_string()));
    }
    match state
        .identity
        .reset_password(&req.token, &req.new_password)
        .await
    {
        Ok(()) => Ok(MessageResponse::new("Password updated.")),
        Err(PortError::NotFound(_)) => Err(ApiError::BadRequest(
            "This reset link is invalid or has already been used.".to_string(),
        )),
        Err(e) => Err(e.into()),
    }
}

/// POST /auth/change-password - Re-authenticate and replace the password
#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = MessageResponse),
        (status = 401, description = "No session or wrong current password")
    )
)]
pub async fn change_password_handler(
    State(state): State<Arc<AppState>>,
    Extension(session): Extension<AuthSession>,
    Json(req): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.new_password.is_empty() {
        return Err(ApiError::BadRequest("Please fill in all fields.".to_string()));
    }
    state
        .identity
        .reauthenticate_and_change_password(&session.token, &req.old_password, &req.new_password)
        .await?;
    info!("Password changed for {}", session.principal.user_id);
    Ok(MessageResponse::new("Password updated."))
}
