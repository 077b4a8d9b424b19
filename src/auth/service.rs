//! Account and session operations exposed to the HTTP layer.

use anyhow::{anyhow, Context};
use std::{fmt, sync::Arc};
use tracing::{debug, info, warn};

use super::{
    config::AuthConfig,
    gate::{AuthGate, Authenticated, GateOutcome},
    password,
    rate_limit::{NoopRateLimiter, RateLimitDecision, RateLimiter},
    sessions::{Origin, SessionRegistry},
    token::{IssuedToken, TokenIssuer},
    utils::{normalize_email, valid_email, valid_password, MIN_PASSWORD_LEN},
};
use crate::{
    error::Error,
    store::{InsertOutcome, SessionRecord, Store, User},
};

const SESSION_INSERT_ATTEMPTS: usize = 3;

type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn Store>,
    issuer: Arc<TokenIssuer>,
    sessions: SessionRegistry,
    gate: AuthGate,
    rate_limiter: Arc<dyn RateLimiter>,
    // Verified against when the email is unknown so that both failure paths
    // cost one Argon2 run.
    dummy_hash: Arc<str>,
}

impl AuthService {
    /// # Errors
    ///
    /// Fails when the signing secret is empty or the placeholder hash cannot
    /// be computed.
    pub fn new(config: &AuthConfig, store: Arc<dyn Store>) -> anyhow::Result<Self> {
        let issuer = Arc::new(TokenIssuer::new(config).context("invalid auth configuration")?);
        let sessions = SessionRegistry::new(store.clone());
        let gate = AuthGate::new(
            issuer.clone(),
            store.clone(),
            sessions.clone(),
            config.enforce_revocation(),
        );
        let dummy_hash = password::hash("fintrack-placeholder-password")?;

        Ok(Self {
            store,
            issuer,
            sessions,
            gate,
            rate_limiter: Arc::new(NoopRateLimiter::new(config.login_rate_limit())),
            dummy_hash: dummy_hash.into(),
        })
    }

    #[must_use]
    pub fn with_rate_limiter(mut self, rate_limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = rate_limiter;
        self
    }

    /// Create an account. The email is trimmed and lowercased first.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] for a malformed email or a password outside
    /// the allowed length, [`Error::EmailTaken`] if the email is registered.
    pub async fn register(&self, email: &str, password: &str) -> Result<User> {
        let email = normalize_email(email);
        if !valid_email(&email) {
            return Err(Error::validation("Invalid email address"));
        }
        if !valid_password(password) {
            return Err(password_length_error());
        }

        let digest = password::hash_blocking(password.to_string()).await?;
        match self.store.insert_user(&email, &digest).await? {
            InsertOutcome::Created(user) => {
                info!(user_id = user.id, "user registered");
                Ok(user)
            }
            InsertOutcome::Conflict => Err(Error::EmailTaken),
        }
    }

    /// Check credentials, mint a token and record its session.
    ///
    /// # Errors
    ///
    /// [`Error::RateLimited`] when the limiter refuses the origin,
    /// [`Error::BadCredentials`] for an unknown email or wrong password,
    /// [`Error::Inactive`] for a deactivated account.
    pub async fn login(&self, email: &str, password: &str, origin: &Origin) -> Result<IssuedToken> {
        if self.rate_limiter.check_login(origin.ip_address()) == RateLimitDecision::Limited {
            warn!(ip = origin.ip_address(), "login rate limited");
            return Err(Error::RateLimited);
        }

        let email = normalize_email(email);
        let user = self.store.find_user_by_email(&email).await?;
        let digest = user
            .as_ref()
            .map_or_else(|| self.dummy_hash.to_string(), |user| user.hashed_password.clone());
        let verified = password::verify_blocking(password.to_string(), digest).await?;

        let user = match user {
            Some(user) if verified => user,
            _ => {
                debug!("login rejected: bad credentials");
                return Err(Error::BadCredentials);
            }
        };
        if !user.is_active {
            debug!(user_id = user.id, "login rejected: inactive user");
            return Err(Error::Inactive);
        }

        let ttl = self.issuer.default_ttl_seconds();
        for _ in 0..SESSION_INSERT_ATTEMPTS {
            let issued = self
                .issuer
                .issue(user.id, ttl)
                .map_err(|err| anyhow!("failed to issue token: {err}"))?;
            match self
                .sessions
                .open(user.id, &issued.claims.jti, origin, issued.claims.expires_at())
                .await?
            {
                InsertOutcome::Created(_) => {
                    info!(user_id = user.id, "login succeeded");
                    return Ok(issued);
                }
                InsertOutcome::Conflict => {
                    warn!(user_id = user.id, "session id collision, retrying");
                }
            }
        }

        Err(anyhow!("failed to allocate a unique session id").into())
    }

    /// Resolve a raw `Authorization` header to the calling user.
    ///
    /// # Errors
    ///
    /// [`Error::Unauthorized`] carrying the rejection reason.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Authenticated> {
        match self.gate.check(authorization).await? {
            GateOutcome::Authenticated(auth) => Ok(*auth),
            GateOutcome::Rejected(reason) => Err(Error::Unauthorized(reason)),
        }
    }

    /// Close the session behind `token`. Tokens that do not verify are
    /// ignored, and an expired but authentic token still closes its session.
    ///
    /// # Errors
    ///
    /// Only store failures.
    pub async fn logout(&self, token: &str) -> Result<()> {
        match self.issuer.decode_for_revocation(token) {
            Ok(claims) => {
                self.sessions.close(&claims.jti).await?;
                info!(sub = %claims.sub, "logout");
            }
            Err(err) => debug!(%err, "logout with unverifiable token ignored"),
        }
        Ok(())
    }

    /// # Errors
    ///
    /// [`Error::BadOldPassword`] when `old_password` does not match,
    /// [`Error::Validation`] when the new password has the wrong length.
    pub async fn change_password(
        &self,
        user: &User,
        old_password: &str,
        new_password: &str,
    ) -> Result<()> {
        let matches = password::verify_blocking(
            old_password.to_string(),
            user.hashed_password.clone(),
        )
        .await?;
        if !matches {
            return Err(Error::BadOldPassword);
        }
        if !valid_password(new_password) {
            return Err(password_length_error());
        }

        let digest = password::hash_blocking(new_password.to_string()).await?;
        if !self.store.update_password(user.id, &digest).await? {
            return Err(Error::NotFound("user"));
        }
        info!(user_id = user.id, "password changed");
        Ok(())
    }

    /// Soft-deactivate the account and close every session it owns.
    ///
    /// # Errors
    ///
    /// Store failures, or [`Error::NotFound`] if the user vanished.
    pub async fn deactivate(&self, user: &User) -> Result<()> {
        if !self.store.deactivate_user(user.id).await? {
            return Err(Error::NotFound("user"));
        }
        let closed = self.sessions.close_all(user.id).await?;
        info!(user_id = user.id, closed, "account deactivated");
        Ok(())
    }

    /// # Errors
    ///
    /// Store failures.
    pub async fn sessions(&self, user: &User) -> Result<Vec<SessionRecord>> {
        Ok(self.sessions.list(user.id).await?)
    }
}

fn password_length_error() -> Error {
    Error::validation(format!(
        "Password must be at least {MIN_PASSWORD_LEN} characters"
    ))
}

impl fmt::Debug for AuthService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthService")
            .field("issuer", &self.issuer)
            .field("gate", &self.gate)
            .finish_non_exhaustive()
    }
}
