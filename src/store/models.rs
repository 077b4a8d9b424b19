//! Row types persisted by the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::{fmt, str::FromStr};
use utoipa::ToSchema;

/// Outcome of an insert guarded by a uniqueness constraint.
#[derive(Debug)]
pub enum InsertOutcome<T> {
    Created(T),
    Conflict,
}

#[derive(Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub hashed_password: String,
    pub is_active: bool,
    pub is_superuser: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("hashed_password", &"***")
            .field("is_active", &self.is_active)
            .field("is_superuser", &self.is_superuser)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

/// A login session, keyed by the `jti` of the token it was issued with.
#[derive(Clone, Debug)]
pub struct SessionRecord {
    pub id: i64,
    pub user_id: i64,
    pub jti: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub is_active: bool,
}

#[derive(Clone, Debug)]
pub struct NewSession {
    pub user_id: i64,
    pub jti: String,
    pub expires_at: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Income,
    Expense,
}

impl TransactionKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            other => Err(format!("unknown transaction type: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Transaction {
    pub id: i64,
    pub user_id: i64,
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Fields a caller may set when recording a transaction.
#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewTransaction {
    pub amount: f64,
    pub category: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
}

/// Partial update of a transaction. Only the fields listed here can change;
/// ownership and identifiers are never writable.
#[derive(Clone, Debug, Default, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct TransactionPatch {
    pub amount: Option<f64>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    /// Absent leaves the description alone; `null` clears it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, nullable)]
    pub description: Option<Option<String>>,
    pub date: Option<DateTime<Utc>>,
}

/// Wraps a field that was present in the input, including an explicit `null`,
/// in `Some`. Paired with `#[serde(default)]` so an absent field stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

impl TransactionPatch {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.kind.is_none()
            && self.description.is_none()
            && self.date.is_none()
    }
}

#[derive(Clone, Debug, Default)]
pub struct TransactionFilter {
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub category: Option<String>,
    pub kind: Option<TransactionKind>,
}

impl TransactionFilter {
    #[must_use]
    pub fn matches(&self, transaction: &Transaction) -> bool {
        self.start_date.map_or(true, |start| transaction.date >= start)
            && self.end_date.map_or(true, |end| transaction.date <= end)
            && self
                .category
                .as_deref()
                .map_or(true, |category| transaction.category == category)
            && self.kind.map_or(true, |kind| transaction.kind == kind)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum BudgetCycle {
    Monthly,
    Weekly,
}

impl BudgetCycle {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Monthly => "monthly",
            Self::Weekly => "weekly",
        }
    }
}

impl FromStr for BudgetCycle {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "monthly" => Ok(Self::Monthly),
            "weekly" => Ok(Self::Weekly),
            other => Err(format!("unknown budget cycle: {other}")),
        }
    }
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Budget {
    pub id: i64,
    pub user_id: i64,
    pub amount_limit: f64,
    pub cycle: BudgetCycle,
    pub category: Option<String>,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewBudget {
    pub amount_limit: f64,
    pub cycle: BudgetCycle,
    pub category: Option<String>,
}

#[derive(Clone, Debug, Serialize, ToSchema)]
pub struct Reminder {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub remind_at: DateTime<Utc>,
    pub is_completed: bool,
}

#[derive(Clone, Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct NewReminder {
    pub title: String,
    pub description: Option<String>,
    pub remind_at: DateTime<Utc>,
}
