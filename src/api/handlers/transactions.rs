//! `/transactions`: the caller's income and expense records.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Extension, Path, Query,
    },
    http::StatusCode,
    Json,
};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{de::Error as _, Deserialize, Deserializer};
use std::sync::Arc;
use utoipa::IntoParams;

use super::auth::CurrentUser;
use crate::{
    api::error::ErrorBody,
    error::Error,
    store::{NewTransaction, Store, Transaction, TransactionFilter, TransactionKind, TransactionPatch},
};

const MAX_CATEGORY_LEN: usize = 100;
const MAX_DESCRIPTION_LEN: usize = 255;

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct TransactionQuery {
    /// Inclusive lower bound on the transaction date. RFC 3339, or an ISO
    /// 8601 datetime without offset, which is read as UTC.
    #[serde(default, deserialize_with = "query_datetime")]
    pub start_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the transaction date, same format as `start_date`.
    #[serde(default, deserialize_with = "query_datetime")]
    pub end_date: Option<DateTime<Utc>>,
    /// Exact category match; blank means no filter.
    pub category: Option<String>,
    #[serde(rename = "type")]
    #[param(inline)]
    pub kind: Option<TransactionKind>,
}

impl From<TransactionQuery> for TransactionFilter {
    fn from(query: TransactionQuery) -> Self {
        Self {
            start_date: query.start_date,
            end_date: query.end_date,
            category: query
                .category
                .map(|category| category.trim().to_string())
                .filter(|category| !category.is_empty()),
            kind: query.kind,
        }
    }
}

fn parse_datetime(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}

fn query_datetime<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    parse_datetime(raw)
        .map(Some)
        .ok_or_else(|| D::Error::custom(format!("invalid datetime: {raw}")))
}

fn check_amount(amount: f64) -> Result<(), Error> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(Error::validation("Amount must be a finite number"))
    }
}

fn check_category(category: &str) -> Result<String, Error> {
    let category = category.trim();
    if category.is_empty() || category.chars().count() > MAX_CATEGORY_LEN {
        return Err(Error::validation(format!(
            "Category must be between 1 and {MAX_CATEGORY_LEN} characters"
        )));
    }
    Ok(category.to_string())
}

fn check_description(description: &str) -> Result<(), Error> {
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(Error::validation(format!(
            "Description must be at most {MAX_DESCRIPTION_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_new(mut new: NewTransaction) -> Result<NewTransaction, Error> {
    check_amount(new.amount)?;
    new.category = check_category(&new.category)?;
    if let Some(description) = &new.description {
        check_description(description)?;
    }
    Ok(new)
}

fn validate_patch(mut patch: TransactionPatch) -> Result<TransactionPatch, Error> {
    if let Some(amount) = patch.amount {
        check_amount(amount)?;
    }
    if let Some(category) = &patch.category {
        patch.category = Some(check_category(category)?);
    }
    if let Some(Some(description)) = &patch.description {
        check_description(description)?;
    }
    Ok(patch)
}

#[utoipa::path(
    get,
    path = "/transactions",
    params(TransactionQuery),
    responses(
        (status = 200, description = "Matching transactions, newest first.", body = [Transaction]),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "transactions"
)]
pub async fn list_transactions(
    current: CurrentUser,
    store: Extension<Arc<dyn Store>>,
    query: Result<Query<TransactionQuery>, QueryRejection>,
) -> Result<Json<Vec<Transaction>>, Error> {
    let Query(query) = query?;
    let filter = TransactionFilter::from(query);
    Ok(Json(store.list_transactions(current.id(), &filter).await?))
}

#[utoipa::path(
    post,
    path = "/transactions",
    request_body = NewTransaction,
    responses(
        (status = 201, description = "Transaction recorded.", body = Transaction),
        (status = 400, description = "Invalid transaction.", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "transactions"
)]
pub async fn create_transaction(
    current: CurrentUser,
    store: Extension<Arc<dyn Store>>,
    payload: Result<Json<NewTransaction>, JsonRejection>,
) -> Result<(StatusCode, Json<Transaction>), Error> {
    let Json(new) = payload?;
    let new = validate_new(new)?;
    let transaction = store.insert_transaction(current.id(), new).await?;
    Ok((StatusCode::CREATED, Json(transaction)))
}

#[utoipa::path(
    put,
    path = "/transactions/{id}",
    params(("id" = i64, Path, description = "Transaction id")),
    request_body = TransactionPatch,
    responses(
        (status = 200, description = "Updated transaction.", body = Transaction),
        (status = 400, description = "Invalid update.", body = ErrorBody),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 404, description = "No such transaction for this user.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "transactions"
)]
pub async fn update_transaction(
    current: CurrentUser,
    store: Extension<Arc<dyn Store>>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<TransactionPatch>, JsonRejection>,
) -> Result<Json<Transaction>, Error> {
    let Path(id) = id?;
    let Json(patch) = payload?;
    let patch = validate_patch(patch)?;
    store
        .update_transaction(current.id(), id, patch)
        .await?
        .map(Json)
        .ok_or(Error::NotFound("transaction"))
}

#[utoipa::path(
    delete,
    path = "/transactions/{id}",
    params(("id" = i64, Path, description = "Transaction id")),
    responses(
        (status = 204, description = "Transaction deleted."),
        (status = 401, description = "Missing or invalid bearer token.", body = ErrorBody),
        (status = 404, description = "No such transaction for this user.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "transactions"
)]
pub async fn delete_transaction(
    current: CurrentUser,
    store: Extension<Arc<dyn Store>>,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, Error> {
    let Path(id) = id?;
    if store.delete_transaction(current.id(), id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(Error::NotFound("transaction"))
    }
}
