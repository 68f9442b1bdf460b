//! services/api/src/adapters/identity.rs
//!
//! The Postgres-backed identity provider, implementing the `IdentityService` port.
//! Accounts carry argon2 password hashes; verification and reset links are
//! one-time tokens delivered through the `MailService` port; sign-ins are opaque
//! session tokens with a 30-day lifetime.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use memory_wall_core::domain::Principal;
use memory_wall_core::ports::{IdentityService, MailService, PortError, PortResult};
use sqlx::{FromRow, PgPool};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use uuid::Uuid;

use super::passwords::{hash_password, new_token, verify_password};
use super::watchers::SessionWatchers;

pub const SESSION_LIFETIME_DAYS: i64 = 30;
const TOKEN_LIFETIME_HOURS: i64 = 24;

const VERIFY: &str = "verify";
const RESET: &str = "reset";

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

pub struct PgIdentityAdapter {
    pool: PgPool,
    watchers: SessionWatchers,
    mailer: Arc<dyn MailService>,
    base_url: String,
}

impl PgIdentityAdapter {
    pub fn new(pool: PgPool, mailer: Arc<dyn MailService>, base_url: &str) -> Self {
        Self {
            pool,
            watchers: SessionWatchers::new(),
            mailer,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn account_by_email(&self, email: &str) -> PortResult<Option<AccountRecord>> {
        sqlx::query_as::<_, AccountRecord>(
            "SELECT user_id, email, password_hash, email_verified, first_name \
             FROM accounts WHERE lower(email) = lower($1)",
        )
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn account_by_session(&self, session_token: &str) -> PortResult<Option<AccountRecord>> {
        sqlx::query_as::<_, AccountRecord>(
            "SELECT a.user_id, a.email, a.password_hash, a.email_verified, a.first_name \
             FROM login_sessions s JOIN accounts a ON a.user_id = s.user_id \
             WHERE s.token = $1 AND s.expires_at > NOW()",
        )
        .bind(session_token)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)
    }

    async fn issue_token(&self, user_id: Uuid, purpose: &str) -> PortResult<String> {
        let token = new_token();
        let expires_at: DateTime<Utc> = Utc::now() + Duration::hours(TOKEN_LIFETIME_HOURS);
        sqlx::query(
            "INSERT INTO email_tokens (token, user_id, purpose, expires_at) VALUES ($1, $2, $3, $4)",
        )
        .bind(&token)
        .bind(user_id)
        .bind(purpose)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(unexpected)?;
        Ok(token)
    }

    /// Deletes a live token of the given purpose and returns its owner.
    async fn redeem_token(&self, token: &str, purpose: &str) -> PortResult<Uuid> {
        sqlx::query_scalar::<_, Uuid>(
            "DELETE FROM email_tokens WHERE token = $1 AND purpose = $2 AND expires_at > NOW() \
             RETURNING user_id",
        )
        .bind(token)
        .bind(purpose)
        .fetch_optional(&self.pool)
        .await
        .map_err(unexpected)?
        .ok_or_else(|| PortError::NotFound(format!("{} token", purpose)))
    }

    async fn set_password_hash(&self, user_id: Uuid, password_hash: &str) -> PortResult<()> {
        sqlx::query("UPDATE accounts SET password_hash = $1 WHERE user_id = $2")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct AccountRecord {
    user_id: Uuid,
    email: String,
    password_hash: String,
    email_verified: bool,
    first_name: Option<String>,
}

impl AccountRecord {
    fn to_domain(&self) -> Principal {
        Principal {
            user_id: self.user_id.to_string(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            first_name: self.first_name.clone(),
        }
    }
}

fn unexpected(e: sqlx::Error) -> PortError {
    PortError::Unexpected(e.to_string())
}

fn parse_user_id(principal: &Principal) -> PortResult<Uuid> {
    Uuid::parse_str(&principal.user_id)
        .map_err(|_| PortError::NotFound(format!("User {}", principal.user_id)))
}

//=========================================================================================
// `IdentityService` Trait Implementation
//=========================================================================================

#[async_trait]
impl IdentityService for PgIdentityAdapter {
    async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
    ) -> PortResult<Principal> {
        if self.account_by_email(email).await?.is_some() {
            return Err(PortError::Conflict(email.trim().to_lowercase()));
        }
        let password_hash = hash_password(password)?;
        let first_name = Some(first_name.trim()).filter(|n| !n.is_empty());

        let record = sqlx::query_as::<_, AccountRecord>(
            "INSERT INTO accounts (user_id, email, password_hash, first_name) VALUES ($1, $2, $3, $4) \
             RETURNING user_id, email, password_hash, email_verified, first_name",
        )
        .bind(Uuid::new_v4())
        .bind(email.trim())
        .bind(&password_hash)
        .bind(first_name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                PortError::Conflict(email.trim().to_lowercase())
            }
            _ => unexpected(e),
        })?;

        info!("Registered account {}", record.user_id);
        Ok(record.to_domain())
    }

    async fn send_verification_email(&self, principal: &Principal) -> PortResult<()> {
        let token = self.issue_token(parse_user_id(principal)?, VERIFY).await?;
        let body = format!(
            "Confirm your address: {}/auth/verify?token={}",
            self.base_url, token
        );
        self.mailer
            .send(&principal.email, "Verify your email", &body)
            .await
    }

    async fn confirm_email(&self, token: &str) -> PortResult<Principal> {
        let user_id = self.redeem_token(token, VERIFY).await?;
        let record = sqlx::query_as::<_, AccountRecord>(
            "UPDATE accounts SET email_verified = TRUE WHERE user_id = $1 \
             RETURNING user_id, email, password_hash, email_verified, first_name",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(unexpected)?;

        let principal = record.to_domain();
        self.watchers.publish_user(&principal).await;
        Ok(principal)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> PortResult<(String, Principal)> {
        let record = self
            .account_by_email(email)
            .await?
            .ok_or(PortError::InvalidCredentials)?;
        if !verify_password(password, &record.password_hash)? {
            return Err(PortError::InvalidCredentials);
        }

        let token = new_token();
        let expires_at = Utc::now() + Duration::days(SESSION_LIFETIME_DAYS);
        sqlx::query("INSERT INTO login_sessions (token, user_id, expires_at) VALUES ($1, $2, $3)")
            .bind(&token)
            .bind(record.user_id)
            .bind(expires_at)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        Ok((token, record.to_domain()))
    }

    async fn current_session(&self, session_token: &str) -> PortResult<Option<Principal>> {
        Ok(self
            .account_by_session(session_token)
            .await?
            .map(|record| record.to_domain()))
    }

    async fn on_session_change(
        &self,
        session_token: &str,
    ) -> PortResult<watch::Receiver<Option<Principal>>> {
        let current = self.current_session(session_token).await?;
        Ok(self.watchers.subscribe(session_token, current).await)
    }

    async fn sign_out(&self, session_token: &str) -> PortResult<()> {
        sqlx::query("DELETE FROM login_sessions WHERE token = $1")
            .bind(session_token)
            .execute(&self.pool)
            .await
            .map_err(unexpected)?;
        self.watchers.close(session_token).await;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> PortResult<()> {
        let record = self
            .account_by_email(email)
            .await?
            .ok_or_else(|| PortError::NotFound(email.trim().to_lowercase()))?;
        let token = self.issue_token(record.user_id, RESET).await?;
        let body = format!(
            "Choose a new password: {}/reset-password?token={}",
            self.base_url, token
        );
        self.mailer
            .send(&record.email, "Reset your password", &body)
            .await
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> PortResult<()> {
        let user_id = self.redeem_token(token, RESET).await?;
        let password_hash = hash_password(new_password)?;
        self.set_password_hash(user_id, &password_hash).await
    }

    async fn reauthenticate_and_change_password(
        &self,
        session_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> PortResult<()> {
        let record = self
            .account_by_session(session_token)
            .await?
            .ok_or(PortError::Unauthorized)?;
        if !verify_password(old_password, &record.password_hash)? {
            warn!("Password change rejected for {}", record.user_id);
            return Err(PortError::InvalidCredentials);
        }
        let password_hash = hash_password(new_password)?;
        self.set_password_hash(record.user_id, &password_hash).await
    }
}
