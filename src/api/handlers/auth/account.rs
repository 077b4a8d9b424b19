//! Registration and self-service account endpoints.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::{
    principal::CurrentUser,
    types::{ChangePasswordRequest, CredentialsRequest, UserResponse},
};
use crate::{api::error::ErrorBody, auth::AuthService, error::Error};

#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = CredentialsRequest,
    responses(
        (status = 201, description = "Account created.", body = UserResponse),
        (status = 400, description = "Invalid email or password too short.", body = ErrorBody),
        (status = 409, description = "Email already registered.", body = ErrorBody),
    ),
    tag = "auth"
)]
pub async fn register(
    auth: Extension<Arc<AuthService>>,
    payload: Result<Json<CredentialsRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<UserResponse>), Error> {
    let Json(request) = payload?;
    let user = auth.register(&request.email, &request.password).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[utoipa::path(
    get,
    path = "/auth/me",
    responses(
        (status = 200, description = "The authenticated user's profile.", body = UserResponse),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn get_me(current: CurrentUser) -> Json<UserResponse> {
    Json(current.0.user.into())
}

#[utoipa::path(
    delete,
    path = "/auth/me",
    responses(
        (status = 204, description = "Account deactivated and all sessions closed."),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn delete_me(
    current: CurrentUser,
    auth: Extension<Arc<AuthService>>,
) -> Result<StatusCode, Error> {
    auth.deactivate(current.user()).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/auth/change-password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 204, description = "Password changed."),
        (status = 400, description = "Old password incorrect or new password too short.", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "auth"
)]
pub async fn change_password(
    current: CurrentUser,
    auth: Extension<Arc<AuthService>>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<StatusCode, Error> {
    let Json(request) = payload?;
    auth.change_password(current.user(), &request.old_password, &request.new_password)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
