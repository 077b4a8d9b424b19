//! Persistence for users, sessions, and the per-user ledger.
//!
//! Every operation is a single statement against one table (or a short
//! transaction in the Postgres backend), so there is no in-process locking
//! beyond what the backend itself provides. Two backends exist:
//!
//! - [`PgStore`]: `PostgreSQL` through `sqlx`, used in production.
//! - [`MemoryStore`]: process-local tables, used by tests and `--dsn memory://`.

mod memory;
pub mod models;
mod postgres;

pub use memory::MemoryStore;
pub use models::{
    Budget, BudgetCycle, InsertOutcome, NewBudget, NewReminder, NewSession, NewTransaction,
    Reminder, SessionRecord, Transaction, TransactionFilter, TransactionKind, TransactionPatch,
    User,
};
pub use postgres::PgStore;

use anyhow::Result;
use async_trait::async_trait;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new active, non-superuser account.
    async fn insert_user(&self, email: &str, hashed_password: &str)
        -> Result<InsertOutcome<User>>;
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>>;
    /// Returns `false` when the user does not exist.
    async fn update_password(&self, id: i64, hashed_password: &str) -> Result<bool>;
    /// Soft-deactivate an account; rows are never deleted.
    async fn deactivate_user(&self, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Insert an active session; `Conflict` when the `jti` is already taken.
    async fn insert_session(&self, session: NewSession) -> Result<InsertOutcome<SessionRecord>>;
    /// Mark a session inactive. Returns whether an active row was changed.
    async fn deactivate_session(&self, jti: &str) -> Result<bool>;
    async fn deactivate_user_sessions(&self, user_id: i64) -> Result<u64>;
    /// Unknown `jti` values are reported as inactive.
    async fn session_active(&self, jti: &str) -> Result<bool>;
    /// Sessions owned by the user, newest first.
    async fn list_sessions(&self, user_id: i64) -> Result<Vec<SessionRecord>>;
}

/// Transactions, budgets, and reminders. Every call is scoped to its owner.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn list_transactions(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>>;
    async fn insert_transaction(&self, user_id: i64, new: NewTransaction) -> Result<Transaction>;
    async fn update_transaction(
        &self,
        user_id: i64,
        id: i64,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>>;
    async fn delete_transaction(&self, user_id: i64, id: i64) -> Result<bool>;

    async fn list_budgets(&self, user_id: i64) -> Result<Vec<Budget>>;
    /// `Conflict` when the owner already has a budget for the same category and cycle.
    async fn insert_budget(&self, user_id: i64, new: NewBudget) -> Result<InsertOutcome<Budget>>;

    async fn list_reminders(&self, user_id: i64) -> Result<Vec<Reminder>>;
    async fn insert_reminder(&self, user_id: i64, new: NewReminder) -> Result<Reminder>;
    async fn delete_reminder(&self, user_id: i64, id: i64) -> Result<bool>;
}

#[async_trait]
pub trait Store: UserStore + SessionStore + LedgerStore {
    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> Result<()>;

    /// Short backend name for logs and health output.
    fn backend(&self) -> &'static str;
}
