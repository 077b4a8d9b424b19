//! Immutable auth configuration, built once at startup.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Seven days.
pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
pub const DEFAULT_LOGIN_RATE_LIMIT: u32 = 5;

#[derive(Clone)]
pub struct AuthConfig {
    secret_key: SecretString,
    token_ttl_seconds: i64,
    login_rate_limit: u32,
    enforce_revocation: bool,
}

impl AuthConfig {
    #[must_use]
    pub fn new(secret_key: SecretString) -> Self {
        Self {
            secret_key,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            login_rate_limit: DEFAULT_LOGIN_RATE_LIMIT,
            enforce_revocation: true,
        }
    }

    #[must_use]
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_login_rate_limit(mut self, attempts: u32) -> Self {
        self.login_rate_limit = attempts;
        self
    }

    #[must_use]
    pub fn with_enforce_revocation(mut self, enforce: bool) -> Self {
        self.enforce_revocation = enforce;
        self
    }

    pub(crate) fn secret_bytes(&self) -> &[u8] {
        self.secret_key.expose_secret().as_bytes()
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    /// Login attempts allowed per origin; carried for the rate limiter.
    #[must_use]
    pub fn login_rate_limit(&self) -> u32 {
        self.login_rate_limit
    }

    #[must_use]
    pub fn enforce_revocation(&self) -> bool {
        self.enforce_revocation
    }
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secret_key", &"***")
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("login_rate_limit", &self.login_rate_limit)
            .field("enforce_revocation", &self.enforce_revocation)
            .finish()
    }
}
