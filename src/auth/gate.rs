//! Request-time guard for protected operations.
//!
//! Flow: pull the bearer token out of the `Authorization` header, verify it,
//! resolve the subject to an active user and, when revocation is enforced,
//! require the token's session to still be active. Each step either advances
//! or ends in [`GateOutcome::Rejected`].

use anyhow::Result;
use std::{fmt, sync::Arc};
use tracing::debug;

use super::{
    sessions::SessionRegistry,
    token::{Claims, TokenError, TokenIssuer},
};
use crate::store::{Store, User};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RejectReason {
    MissingHeader,
    MalformedHeader,
    InvalidToken,
    ExpiredToken,
    UnknownSubject,
    InactiveUser,
    SessionRevoked,
}

impl RejectReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MissingHeader => "missing authorization header",
            Self::MalformedHeader => "malformed authorization header",
            Self::InvalidToken => "invalid token",
            Self::ExpiredToken => "expired token",
            Self::UnknownSubject => "unknown subject",
            Self::InactiveUser => "inactive user",
            Self::SessionRevoked => "session revoked",
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub enum GateOutcome {
    Authenticated(Box<Authenticated>),
    Rejected(RejectReason),
}

/// A resolved caller and the claims of the token they presented.
#[derive(Clone, Debug)]
pub struct Authenticated {
    pub user: User,
    pub claims: Claims,
}

/// Split `Bearer <token>` into the token. The scheme is matched
/// case-insensitively; the token must be a single non-empty word.
#[must_use]
pub fn extract_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        None
    } else {
        Some(token)
    }
}

#[derive(Clone)]
pub struct AuthGate {
    issuer: Arc<TokenIssuer>,
    store: Arc<dyn Store>,
    sessions: SessionRegistry,
    enforce_revocation: bool,
}

impl AuthGate {
    #[must_use]
    pub fn new(
        issuer: Arc<TokenIssuer>,
        store: Arc<dyn Store>,
        sessions: SessionRegistry,
        enforce_revocation: bool,
    ) -> Self {
        Self {
            issuer,
            store,
            sessions,
            enforce_revocation,
        }
    }

    /// Run the full check against a raw `Authorization` header value.
    ///
    /// # Errors
    ///
    /// Only store failures are errors; every authentication failure is a
    /// [`GateOutcome::Rejected`].
    pub async fn check(&self, authorization: Option<&str>) -> Result<GateOutcome> {
        let Some(header) = authorization else {
            return Ok(reject(RejectReason::MissingHeader));
        };
        let Some(token) = extract_bearer(header) else {
            return Ok(reject(RejectReason::MalformedHeader));
        };

        let claims = match self.issuer.verify(token) {
            Ok(claims) => claims,
            Err(TokenError::Expired) => return Ok(reject(RejectReason::ExpiredToken)),
            Err(_) => return Ok(reject(RejectReason::InvalidToken)),
        };
        let Some(user_id) = claims.user_id() else {
            return Ok(reject(RejectReason::InvalidToken));
        };

        let Some(user) = self.store.find_user_by_id(user_id).await? else {
            return Ok(reject(RejectReason::UnknownSubject));
        };
        if !user.is_active {
            return Ok(reject(RejectReason::InactiveUser));
        }

        if self.enforce_revocation && !self.sessions.is_active(&claims.jti).await? {
            return Ok(reject(RejectReason::SessionRevoked));
        }

        Ok(GateOutcome::Authenticated(Box::new(Authenticated { user, claims })))
    }
}

fn reject(reason: RejectReason) -> GateOutcome {
    debug!(%reason, "auth gate rejected request");
    GateOutcome::Rejected(reason)
}

impl fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGate")
            .field("backend", &self.store.backend())
            .field("enforce_revocation", &self.enforce_revocation)
            .finish_non_exhaustive()
    }
}
