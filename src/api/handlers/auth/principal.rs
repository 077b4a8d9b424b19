//! Authenticated caller extraction.
//!
//! Any handler that takes a [`CurrentUser`] argument runs the auth gate
//! before its body executes; a rejection short-circuits with 401.

use anyhow::anyhow;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;

use crate::{
    auth::{AuthService, Authenticated},
    error::Error,
    store::User,
};

/// The resolved caller of a protected route.
#[derive(Clone, Debug)]
pub struct CurrentUser(pub Authenticated);

impl CurrentUser {
    #[must_use]
    pub fn user(&self) -> &User {
        &self.0.user
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        self.0.user.id
    }

    #[must_use]
    pub fn jti(&self) -> &str {
        &self.0.claims.jti
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth = parts
            .extensions
            .get::<Arc<AuthService>>()
            .cloned()
            .ok_or_else(|| anyhow!("auth service extension missing"))?;

        // A header that is not visible ASCII is treated as malformed.
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .map(|value| value.to_str().unwrap_or_default());

        auth.authenticate(header).await.map(CurrentUser)
    }
}
