//! `/budgets`: spending limits per category and cycle.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use super::auth::CurrentUser;
use crate::{
    api::error::ErrorBody,
    error::Error,
    store::{Budget, InsertOutcome, NewBudget, Store},
};

const MAX_CATEGORY_LEN: usize = 100;

fn validate(mut new: NewBudget) -> Result<NewBudget, Error> {
    if !new.amount_limit.is_finite() || new.amount_limit < 0.0 {
        return Err(Error::validation(
            "Amount limit must be a non-negative number",
        ));
    }
    // A blank category means the overall budget.
    new.category = new
        .category
        .map(|category| category.trim().to_string())
        .filter(|category| !category.is_empty());
    if new
        .category
        .as_ref()
        .is_some_and(|category| category.chars().count() > MAX_CATEGORY_LEN)
    {
        return Err(Error::validation(format!(
            "Category must be at most {MAX_CATEGORY_LEN} characters"
        )));
    }
    Ok(new)
}

#[utoipa::path(
    get,
    path = "/budgets",
    responses(
        (status = 200, description = "The caller's budgets.", body = [Budget]),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "budgets"
)]
pub async fn list_budgets(
    current: CurrentUser,
    store: Extension<Arc<dyn Store>>,
) -> Result<Json<Vec<Budget>>, Error> {
    Ok(Json(store.list_budgets(current.id()).await?))
}

#[utoipa::path(
    post,
    path = "/budgets",
    request_body = NewBudget,
    responses(
        (status = 201, description = "Budget created.", body = Budget),
        (status = 400, description = "Invalid budget.", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 409, description = "A budget for this category and cycle already exists.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "budgets"
)]
pub async fn create_budget(
    current: CurrentUser,
    store: Extension<Arc<dyn Store>>,
    payload: Result<Json<NewBudget>, JsonRejection>,
) -> Result<(StatusCode, Json<Budget>), Error> {
    let Json(new) = payload?;
    let new = validate(new)?;
    match store.insert_budget(current.id(), new).await? {
        InsertOutcome::Created(budget) => Ok((StatusCode::CREATED, Json(budget))),
        InsertOutcome::Conflict => Err(Error::Conflict(
            "Budget for this category and cycle already exists".to_string(),
        )),
    }
}
