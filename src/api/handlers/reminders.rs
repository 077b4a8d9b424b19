//! `/reminders`: dated notes for the caller.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Extension, Path,
    },
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use crate::{
    api::error::ErrorBody,
    error::Error,
    store::{NewReminder, Reminder, Store},
};

const MAX_TITLE_LEN: usize = 255;
const MAX_DESCRIPTION_LEN: usize = 1024;

fn validate(mut new: NewReminder) -> Result<NewReminder, Error> {
    new.title = new.title.trim().to_string();
    let title_len = new.title.chars().count();
    if title_len == 0 || title_len > MAX_TITLE_LEN {
        return Err(Error::validation(format!(
            "Title must be between 1 and {MAX_TITLE_LEN} characters"
        )));
    }
    if new
        .description
        .as_ref()
        .is_some_and(|description| description.chars().count() > MAX_DESCRIPTION_LEN)
    {
        return Err(Error::validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(new)
}

#[utoipa::path(
    post,
    path = "/reminders",
    request_body = NewReminder,
    responses(
        (status = 201, description = "Reminder created.", body = Reminder),
        (status = 400, description = "Invalid reminder.", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn create_reminder(
    current: CurrentUser,
    store: Extension<Arc<dyn Store>>,
    payload: Result<Json<NewReminder>, JsonRejection>,
) -> Result<(StatusCode, Json<Reminder>), Error> {
    let Json(new) = payload?;
    let new = validate(new)?;
    let reminder = store.insert_reminder(current.id(), new).await?;
    Ok((StatusCode::CREATED, Json(reminder)))
}

#[utoipa::path(
    get,
    path = "/reminders",
    responses(
        (status = 200, description = "The caller's reminders, soonest first.", body = [Reminder]),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn list_reminders(
    current: CurrentUser,
    store: Extension<Arc<dyn Store>>,
) -> Result<Json<Vec<Reminder>>, Error> {
    Ok(Json(store.list_reminders(current.id()).await?))
}

#[utoipa::path(
    delete,
    path = "/reminders/{id}",
    params(("id" = i64, Path, description = "Reminder id")),
    responses(
        (status = 204, description = "Reminder deleted."),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 404, description = "No such reminder for this user.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "reminders"
)]
pub async fn delete_reminder(
    current: CurrentUser,
    store: Extension<Arc<dyn Store>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, Error> {
    let Path(id) = id?;
    if store.delete_reminder(current.id(), id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound("reminder"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn reminder(title: &str, description: Option<String>) -> NewReminder {
        NewReminder {
            title: title.to_string(),
            description,
            remind_at: Utc::now(),
        }
    }

    #[test]
    fn title_bounds() {
        assert!(validate(reminder("  ", None)).is_err());
        assert!(validate(reminder(&"t".repeat(256), None)).is_err());
        let ok = validate(reminder(" pay rent ", None)).ok();
        assert_eq!(ok.map(|r| r.title), Some("pay rent".to_string()));
    }

    #[test]
    fn description_bound() {
        assert!(validate(reminder("rent", Some("d".repeat(1024)))).is_ok());
        assert!(validate(reminder("rent", Some("d".repeat(1025)))).is_err());
    }
}
