//! crates/memory_wall_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the collaborators the memory wall
//! delegates to: the identity provider, the document store and outbound mail.
//! The core never talks to a concrete backend; adapters in the `api` service
//! implement these traits.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::domain::{Fields, Principal, StoredDocument};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Already exists: {0}")]
    Conflict(String),
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Unauthorized")]
    Unauthorized,
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

#[async_trait]
pub trait IdentityService: Send + Sync {
    // --- Registration & Verification ---

    /// Creates an unverified account. Fails with `Conflict` on a duplicate email.
    async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
    ) -> PortResult<Principal>;

    /// Mails a one-time verification link to the principal's address.
    async fn send_verification_email(&self, principal: &Principal) -> PortResult<()>;

    /// Marks the account behind a verification token as verified.
    async fn confirm_email(&self, token: &str) -> PortResult<Principal>;

    // --- Sign-in Sessions ---

    /// Returns an opaque session token together with the signed-in principal.
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> PortResult<(String, Principal)>;

    async fn current_session(&self, session_token: &str) -> PortResult<Option<Principal>>;

    /// Subscribes to a session. The receiver holds the current value immediately and
    /// observes every later transition; sign-out publishes `None`.
    async fn on_session_change(
        &self,
        session_token: &str,
    ) -> PortResult<watch::Receiver<Option<Principal>>>;

    async fn sign_out(&self, session_token: &str) -> PortResult<()>;

    // --- Passwords ---

    /// Mails a reset link. Unknown addresses fail with `NotFound`.
    async fn send_password_reset(&self, email: &str) -> PortResult<()>;

    async fn reset_password(&self, token: &str, new_password: &str) -> PortResult<()>;

    /// Re-checks `old_password` for the signed-in principal before replacing it.
    async fn reauthenticate_and_change_password(
        &self,
        session_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> PortResult<()>;
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores a new document and returns its store-assigned id.
    async fn create_document(&self, collection: &str, fields: Fields) -> PortResult<String>;

    /// Creates or replaces the document with a caller-chosen id.
    async fn set_document(&self, collection: &str, id: &str, fields: Fields) -> PortResult<()>;

    async fn get_document(&self, collection: &str, id: &str) -> PortResult<Fields>;

    /// Lists a whole collection. No ordering is guaranteed.
    async fn list_documents(&self, collection: &str) -> PortResult<Vec<StoredDocument>>;
}

#[async_trait]
pub trait MailService: Send + Sync {
    async fn send(&self, to: &str, subject: &str, body: &str) -> PortResult<()>;
}
