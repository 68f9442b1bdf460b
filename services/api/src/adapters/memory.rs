//! services/api/src/adapters/memory.rs
//!
//! In-process implementations of the `DocumentStore` and `IdentityService` ports.
//! Used by the test suites and by the server when no database is configured.

use async_trait::async_trait;
use memory_wall_core::domain::{Fields, Principal, StoredDocument};
use memory_wall_core::ports::{
    DocumentStore, IdentityService, MailService, PortError, PortResult,
};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tracing::info;
use uuid::Uuid;

use super::passwords::{hash_password, new_token, verify_password};
use super::watchers::SessionWatchers;

//=========================================================================================
// Document Store
//=========================================================================================

/// Collections of documents held in a map, keyed by collection then id.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, HashMap<String, Fields>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_document(&self, collection: &str, fields: Fields) -> PortResult<String> {
        let id = new_token();
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), fields);
        Ok(id)
    }

    async fn set_document(&self, collection: &str, id: &str, fields: Fields) -> PortResult<()> {
        self.collections
            .write()
            .await
            .entry(collection.to_string())
            .or_default()
            .insert(id.to_string(), fields);
        Ok(())
    }

    async fn get_document(&self, collection: &str, id: &str) -> PortResult<Fields> {
        self.collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned()
            .ok_or_else(|| PortError::NotFound(format!("{}/{}", collection, id)))
    }

    async fn list_documents(&self, collection: &str) -> PortResult<Vec<StoredDocument>> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .map(|(id, fields)| StoredDocument {
                        id: id.clone(),
                        fields: fields.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default())
    }
}

//=========================================================================================
// Identity Provider
//=========================================================================================

#[derive(Clone)]
struct Account {
    user_id: String,
    email: String,
    password_hash: String,
    email_verified: bool,
    first_name: Option<String>,
}

impl Account {
    fn principal(&self) -> Principal {
        Principal {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
            first_name: self.first_name.clone(),
        }
    }
}

#[derive(Default)]
struct Accounts {
    /// Keyed by lowercased email.
    by_email: HashMap<String, Account>,
    verify_tokens: HashMap<String, String>,
    reset_tokens: HashMap<String, String>,
    /// Session token to lowercased email.
    sessions: HashMap<String, String>,
}

/// An identity provider kept entirely in memory, with argon2 password hashes.
pub struct MemoryIdentity {
    accounts: RwLock<Accounts>,
    watchers: SessionWatchers,
    mailer: Arc<dyn MailService>,
    base_url: String,
}

impl MemoryIdentity {
    pub fn new(mailer: Arc<dyn MailService>, base_url: &str) -> Self {
        Self {
            accounts: RwLock::new(Accounts::default()),
            watchers: SessionWatchers::new(),
            mailer,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn principal_for_session(&self, session_token: &str) -> Option<Principal> {
        let accounts = self.accounts.read().await;
        let email = accounts.sessions.get(session_token)?;
        accounts.by_email.get(email).map(Account::principal)
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}

#[async_trait]
impl IdentityService for MemoryIdentity {
    async fn register_with_password(
        &self,
        email: &str,
        password: &str,
        first_name: &str,
    ) -> PortResult<Principal> {
        let key = normalize(email);
        let password_hash = hash_password(password)?;

        let mut accounts = self.accounts.write().await;
        if accounts.by_email.contains_key(&key) {
            return Err(PortError::Conflict(key));
        }
        let first_name = first_name.trim();
        let account = Account {
            user_id: Uuid::new_v4().to_string(),
            email: email.trim().to_string(),
            password_hash,
            email_verified: false,
            first_name: (!first_name.is_empty()).then(|| first_name.to_string()),
        };
        let principal = account.principal();
        accounts.by_email.insert(key, account);
        info!("Registered account {}", principal.user_id);
        Ok(principal)
    }

    async fn send_verification_email(&self, principal: &Principal) -> PortResult<()> {
        let token = new_token();
        self.accounts
            .write()
            .await
            .verify_tokens
            .insert(token.clone(), normalize(&principal.email));
        let body = format!(
            "Confirm your address: {}/auth/verify?token={}",
            self.base_url, token
        );
        self.mailer
            .send(&principal.email, "Verify your email", &body)
            .await
    }

    async fn confirm_email(&self, token: &str) -> PortResult<Principal> {
        let principal = {
            let mut accounts = self.accounts.write().await;
            let email = accounts
                .verify_tokens
                .remove(token)
                .ok_or_else(|| PortError::NotFound("verification token".to_string()))?;
            let account = accounts
                .by_email
                .get_mut(&email)
                .ok_or_else(|| PortError::NotFound(email.clone()))?;
            account.email_verified = true;
            account.principal()
        };
        self.watchers.publish_user(&principal).await;
        Ok(principal)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> PortResult<(String, Principal)> {
        let key = normalize(email);
        let account = self
            .accounts
            .read()
            .await
            .by_email
            .get(&key)
            .cloned()
            .ok_or(PortError::InvalidCredentials)?;
        if !verify_password(password, &account.password_hash)? {
            return Err(PortError::InvalidCredentials);
        }

        let token = new_token();
        self.accounts
            .write()
            .await
            .sessions
            .insert(token.clone(), key);
        Ok((token, account.principal()))
    }

    async fn current_session(&self, session_token: &str) -> PortResult<Option<Principal>> {
        Ok(self.principal_for_session(session_token).await)
    }

    async fn on_session_change(
        &self,
        session_token: &str,
    ) -> PortResult<watch::Receiver<Option<Principal>>> {
        let current = self.principal_for_session(session_token).await;
        Ok(self.watchers.subscribe(session_token, current).await)
    }

    async fn sign_out(&self, session_token: &str) -> PortResult<()> {
        self.accounts.write().await.sessions.remove(session_token);
        self.watchers.close(session_token).await;
        Ok(())
    }

    async fn send_password_reset(&self, email: &str) -> PortResult<()> {
        let key = normalize(email);
        let token = new_token();
        let to = {
            let mut accounts = self.accounts.write().await;
            let to = accounts
                .by_email
                .get(&key)
                .map(|a| a.email.clone())
                .ok_or_else(|| PortError::NotFound(key.clone()))?;
            accounts.reset_tokens.insert(token.clone(), key);
            to
        };
        let body = format!(
            "Choose a new password: {}/reset-password?token={}",
            self.base_url, token
        );
        self.mailer.send(&to, "Reset your password", &body).await
    }

    async fn reset_password(&self, token: &str, new_password: &str) -> PortResult<()> {
        let password_hash = hash_password(new_password)?;
        let mut accounts = self.accounts.write().await;
        let email = accounts
            .reset_tokens
            .remove(token)
            .ok_or_else(|| PortError::NotFound("reset token".to_string()))?;
        let account = accounts
            .by_email
            .get_mut(&email)
            .ok_or_else(|| PortError::NotFound(email.clone()))?;
        account.password_hash = password_hash;
        Ok(())
    }

    async fn reauthenticate_and_change_password(
        &self,
        session_token: &str,
        old_password: &str,
        new_password: &str,
    ) -> PortResult<()> {
        let (email, current_hash) = {
            let accounts = self.accounts.read().await;
            let email = accounts
                .sessions
                .get(session_token)
                .cloned()
                .ok_or(PortError::Unauthorized)?;
            let hash = accounts
                .by_email
                .get(&email)
                .map(|a| a.password_hash.clone())
                .ok_or(PortError::Unauthorized)?;
            (email, hash)
        };
        if !verify_password(old_password, &current_hash)? {
            return Err(PortError::InvalidCredentials);
        }
        let password_hash = hash_password(new_password)?;
        if let Some(account) = self.accounts.write().await.by_email.get_mut(&email) {
            account.password_hash = password_hash;
        }
        Ok(())
    }
}
