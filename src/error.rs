//! Error taxonomy shared by the auth core, the ledger handlers, and the HTTP layer.

use crate::auth::gate::RejectReason;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed input; the message is safe to show to the caller.
    #[error("{0}")]
    Validation(String),
    #[error("incorrect email or password")]
    BadCredentials,
    #[error("inactive user")]
    Inactive,
    #[error("old password incorrect")]
    BadOldPassword,
    #[error("unauthorized: {0}")]
    Unauthorized(RejectReason),
    #[error("email already registered")]
    EmailTaken,
    #[error("{0}")]
    Conflict(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("too many requests")]
    RateLimited,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Whether the error is one of the authentication failures that must be
    /// reported to callers without detail.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            Self::BadCredentials | Self::Inactive | Self::Unauthorized(_)
        )
    }
}
