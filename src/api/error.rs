//! HTTP mapping for [`crate::Error`].
//!
//! Bodies are `{"detail": "..."}`. Authentication failures share one generic
//! message; the specific reason only reaches the debug log.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::error::Error;

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    pub detail: String,
}

const CREDENTIALS_DETAIL: &str = "Incorrect email or password";
const UNAUTHORIZED_DETAIL: &str = "Could not validate credentials";

impl Error {
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Validation(_) | Self::BadOldPassword => StatusCode::BAD_REQUEST,
            Self::BadCredentials | Self::Inactive | Self::Unauthorized(_) => {
                StatusCode::UNAUTHORIZED
            }
            Self::EmailTaken | Self::Conflict(_) => StatusCode::CONFLICT,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::RateLimited => StatusCode::TOO_MANY_REQUESTS,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> String {
        match self {
            Self::BadCredentials | Self::Inactive => CREDENTIALS_DETAIL.to_string(),
            Self::Unauthorized(_) => UNAUTHORIZED_DETAIL.to_string(),
            Self::Internal(_) => "Internal server error".to_string(),
            Self::NotFound(resource) => format!("{} not found", capitalize(resource)),
            Self::EmailTaken => "Email already registered".to_string(),
            Self::BadOldPassword => "Old password incorrect".to_string(),
            Self::RateLimited => "Too many login attempts".to_string(),
            Self::Validation(message) | Self::Conflict(message) => message.clone(),
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            Self::Internal(err) => error!("request failed: {err:#}"),
            err if err.is_auth_failure() => debug!("authentication failed: {err}"),
            _ => {}
        }

        let mut response = (
            status,
            Json(ErrorBody {
                detail: self.detail(),
            }),
        )
            .into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

impl From<JsonRejection> for Error {
    fn from(rejection: JsonRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for Error {
    fn from(rejection: QueryRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for Error {
    fn from(rejection: PathRejection) -> Self {
        Self::Validation(rejection.body_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::RejectReason;
    use anyhow::{anyhow, Result};
    use axum::body::to_bytes;

    async fn render(err: Error) -> Result<(StatusCode, Option<HeaderValue>, serde_json::Value)> {
        let response = err.into_response();
        let status = response.status();
        let challenge = response.headers().get(WWW_AUTHENTICATE).cloned();
        let bytes = to_bytes(response.into_body(), usize::MAX).await?;
        Ok((status, challenge, serde_json::from_slice(&bytes)?))
    }

    #[tokio::test]
    async fn auth_failures_share_a_generic_body() -> Result<()> {
        for reason in [
            RejectReason::MissingHeader,
            RejectReason::InvalidToken,
            RejectReason::SessionRevoked,
        ] {
            let (status, challenge, body) = render(Error::Unauthorized(reason)).await?;
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(challenge, Some(HeaderValue::from_static("Bearer")));
            assert_eq!(body["detail"], UNAUTHORIZED_DETAIL);
        }

        let (_, _, wrong_password) = render(Error::BadCredentials).await?;
        let (_, _, inactive) = render(Error::Inactive).await?;
        assert_eq!(wrong_password, inactive);
        Ok(())
    }

    #[tokio::test]
    async fn internal_errors_hide_their_cause() -> Result<()> {
        let (status, challenge, body) = render(Error::Internal(anyhow!("pool timed out"))).await?;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(challenge.is_none());
        assert_eq!(body["detail"], "Internal server error");
        Ok(())
    }

    #[test]
    fn status_codes() {
        assert_eq!(Error::validation("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::BadOldPassword.status(), StatusCode::BAD_REQUEST);
        assert_eq!(Error::EmailTaken.status(), StatusCode::CONFLICT);
        assert_eq!(Error::NotFound("budget").status(), StatusCode::NOT_FOUND);
        assert_eq!(Error::RateLimited.status(), StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn not_found_detail_is_capitalized() -> Result<()> {
        let (_, _, body) = render(Error::NotFound("transaction")).await?;
        assert_eq!(body["detail"], "Transaction not found");
        Ok(())
    }
}
