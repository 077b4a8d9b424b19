//! HS256 bearer tokens.
//!
//! Every token carries `sub` (decimal user id), `iat`, `exp` and a random
//! `jti`. Expiry is checked with zero leeway. There is a single signing key;
//! changing it invalidates every outstanding token.

use chrono::{DateTime, TimeZone, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

use super::config::AuthConfig;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("signing secret is empty")]
    EmptySecret,
    #[error("token expired")]
    Expired,
    #[error("token invalid")]
    Invalid,
    #[error("failed to sign token")]
    Signing,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

impl Claims {
    /// The subject as a user id, if it is a decimal integer.
    #[must_use]
    pub fn user_id(&self) -> Option<i64> {
        self.sub.parse().ok()
    }

    #[must_use]
    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0)
            .single()
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

/// A freshly signed token together with the claims it carries.
#[derive(Clone, Debug)]
pub struct IssuedToken {
    pub token: String,
    pub claims: Claims,
}

#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_seconds: i64,
}

impl TokenIssuer {
    /// # Errors
    ///
    /// Returns [`TokenError::EmptySecret`] when the configured secret is empty.
    pub fn new(config: &AuthConfig) -> Result<Self, TokenError> {
        let secret = config.secret_bytes();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            ttl_seconds: config.token_ttl_seconds(),
        })
    }

    /// Token lifetime configured at startup.
    #[must_use]
    pub fn default_ttl_seconds(&self) -> i64 {
        self.ttl_seconds
    }

    /// Sign a token for `subject` valid for `ttl_seconds` from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue(&self, subject: i64, ttl_seconds: i64) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, ttl_seconds, Utc::now())
    }

    /// Like [`Self::issue`] with an explicit issue time.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue_at(
        &self,
        subject: i64,
        ttl_seconds: i64,
        issued_at: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let iat = issued_at.timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            iat,
            exp: iat.saturating_add(ttl_seconds),
            jti: Uuid::new_v4().to_string(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|_| TokenError::Signing)?;
        Ok(IssuedToken { token, claims })
    }

    /// Verify signature, structure and expiry.
    ///
    /// # Errors
    ///
    /// [`TokenError::Expired`] once `exp` has passed, [`TokenError::Invalid`]
    /// for anything else that does not check out.
    pub fn verify(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, true)
    }

    /// Verify the signature but accept an elapsed `exp`. Used on logout so
    /// that an expired token can still close its session.
    ///
    /// # Errors
    ///
    /// [`TokenError::Invalid`] if the signature or structure is wrong.
    pub fn decode_for_revocation(&self, token: &str) -> Result<Claims, TokenError> {
        self.decode_with(token, false)
    }

    fn decode_with(&self, token: &str, check_expiry: bool) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = check_expiry;
        validation.set_required_spec_claims(&["exp", "sub", "iat"]);

        let data = decode::<Claims>(token, &self.decoding, &validation).map_err(|err| {
            match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                _ => TokenError::Invalid,
            }
        })?;

        if data.claims.user_id().is_none() || data.claims.jti.is_empty() {
            return Err(TokenError::Invalid);
        }
        Ok(data.claims)
    }
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("algorithm", &"HS256")
            .field("ttl_seconds", &self.ttl_seconds)
            .finish_non_exhaustive()
    }
}
