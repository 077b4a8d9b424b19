//! Login, logout, and session listing.
//!
//! Flow Overview:
//! 1) Login verifies credentials, mints a bearer token, and records a session
//!    row tagged with the caller's address and user agent.
//! 2) Logout closes the session behind the presented token; it always answers
//!    204 so callers cannot probe token state.
//! 3) Session listing shows every session the caller owns.

use axum::{
    extract::{rejection::JsonRejection, ConnectInfo, Extension},
    http::{
        header::{AUTHORIZATION, USER_AGENT},
        HeaderMap, StatusCode,
    },
    Json,
};
use std::{net::SocketAddr, sync::Arc};

use super::{
    principal::CurrentUser,
    types::{CredentialsRequest, SessionResponse, TokenResponse},
};
use crate::{
    api::error::ErrorBody,
    auth::{gate::extract_bearer, AuthService, Origin},
    error::Error,
};

/// Client address from common proxy headers, falling back to the peer.
pub(crate) fn extract_client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let forwarded = headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty());
    if forwarded.is_some() {
        return forwarded.map(ToString::to_string);
    }

    headers
        .get("x-real-ip")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToString::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

fn origin(headers: &HeaderMap, peer: Option<SocketAddr>) -> Origin {
    let user_agent = headers
        .get(USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(ToString::to_string);
    Origin::new(extract_client_ip(headers, peer), user_agent)
}

#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = CredentialsRequest,
    responses(
        (status = 200, description = "Credentials accepted; bearer token issued.", body = TokenResponse),
        (status = 400, description = "Malformed request body.", body = ErrorBody),
        (status = 401, description = "Incorrect email or password.", body = ErrorBody),
        (status = 429, description = "Too many attempts from this origin.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    auth: Extension<Arc<AuthService>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, Error> {
    let Json(request) = payload?;
    let origin = origin(&headers, connect_info.map(|ConnectInfo(addr)| addr));

    let issued = auth.login(&request.email, &request.password, &origin).await?;
    Ok(Json(TokenResponse::bearer(issued.token)))
}

#[utoipa::path(
    post,
    path = "/auth/logout",
    responses(
        (status = 204, description = "Session closed (or nothing to close)."),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn logout(
    headers: HeaderMap,
    auth: Extension<Arc<AuthService>>,
) -> Result<StatusCode, Error> {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(extract_bearer);

    if let Some(token) = token {
        auth.logout(token).await?;
    }
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/auth/sessions",
    responses(
        (status = 200, description = "Sessions owned by the caller, newest first.", body = [SessionResponse]),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn list_sessions(
    current: CurrentUser,
    auth: Extension<Arc<AuthService>>,
) -> Result<Json<Vec<SessionResponse>>, Error> {
    let sessions = auth
        .sessions(current.user())
        .await?
        .into_iter()
        .map(|record| SessionResponse::from_record(record, current.jti()))
        .collect();
    Ok(Json(sessions))
}
