//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::{Config, ConfigError};
use memory_wall_core::domain::{Principal, UserProfile, USERS};
use memory_wall_core::gate::EmailPolicy;
use memory_wall_core::ports::{DocumentStore, IdentityService, PortError, PortResult};
use std::sync::Arc;
use tracing::info;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub identity: Arc<dyn IdentityService>,
    pub store: Arc<dyn DocumentStore>,
    pub config: Arc<Config>,
    pub email_policy: EmailPolicy,
}

impl AppState {
    pub fn new(
        identity: Arc<dyn IdentityService>,
        store: Arc<dyn DocumentStore>,
        config: Arc<Config>,
    ) -> Result<Self, ConfigError> {
        let email_policy = EmailPolicy::new(&config.email_pattern).map_err(|e| {
            ConfigError::InvalidValue("INSTITUTION_EMAIL_PATTERN".to_string(), e.to_string())
        })?;
        Ok(Self {
            identity,
            store,
            config,
            email_policy,
        })
    }

    /// Reads the principal's profile, creating it from the identity data if missing.
    pub async fn ensure_profile(&self, principal: &Principal) -> PortResult<UserProfile> {
        match self.store.get_document(USERS, &principal.user_id).await {
            Ok(fields) => UserProfile::from_fields(fields),
            Err(PortError::NotFound(_)) => {
                let profile = UserProfile {
                    first_name: principal.first_name.clone().unwrap_or_default(),
                    email: principal.email.clone(),
                };
                self.store
                    .set_document(USERS, &principal.user_id, profile.clone().into_fields())
                    .await?;
                info!("Created profile for user {}", principal.user_id);
                Ok(profile)
            }
            Err(e) => Err(e),
        }
    }
}
