//! Session bookkeeping keyed by token `jti`.
//!
//! Rows are never purged; `expires_at` is informational and token expiry is
//! enforced by the verifier.

use anyhow::Result;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::store::{InsertOutcome, NewSession, SessionRecord, Store};

const MAX_IP_LEN: usize = 45;
const MAX_USER_AGENT_LEN: usize = 255;

/// Where a login came from, clipped to the column widths.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Origin {
    ip_address: Option<String>,
    user_agent: Option<String>,
}

impl Origin {
    #[must_use]
    pub fn new(ip_address: Option<String>, user_agent: Option<String>) -> Self {
        Self {
            ip_address: clip(ip_address, MAX_IP_LEN),
            user_agent: clip(user_agent, MAX_USER_AGENT_LEN),
        }
    }

    #[must_use]
    pub fn ip_address(&self) -> Option<&str> {
        self.ip_address.as_deref()
    }

    #[must_use]
    pub fn user_agent(&self) -> Option<&str> {
        self.user_agent.as_deref()
    }
}

fn clip(value: Option<String>, max_chars: usize) -> Option<String> {
    value
        .map(|value| value.trim().chars().take(max_chars).collect::<String>())
        .filter(|value| !value.is_empty())
}

#[derive(Clone)]
pub struct SessionRegistry {
    store: Arc<dyn Store>,
}

impl SessionRegistry {
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Record an active session for `jti`. `Conflict` means the `jti` is
    /// already in use and the caller should mint a new token.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn open(
        &self,
        user_id: i64,
        jti: &str,
        origin: &Origin,
        expires_at: DateTime<Utc>,
    ) -> Result<InsertOutcome<SessionRecord>> {
        self.store
            .insert_session(NewSession {
                user_id,
                jti: jti.to_string(),
                expires_at,
                ip_address: origin.ip_address.clone(),
                user_agent: origin.user_agent.clone(),
            })
            .await
    }

    /// Mark the session inactive. Closing an unknown or already closed
    /// session is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn close(&self, jti: &str) -> Result<()> {
        let changed = self.store.deactivate_session(jti).await?;
        debug!(changed, "session close");
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn close_all(&self, user_id: i64) -> Result<u64> {
        self.store.deactivate_user_sessions(user_id).await
    }

    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn is_active(&self, jti: &str) -> Result<bool> {
        self.store.session_active(jti).await
    }

    /// # Errors
    ///
    /// Returns an error if the store fails.
    pub async fn list(&self, user_id: i64) -> Result<Vec<SessionRecord>> {
        self.store.list_sessions(user_id).await
    }
}
