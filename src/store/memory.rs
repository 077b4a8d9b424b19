//! Process-local store. State lives behind a single `RwLock`, so each call is
//! atomic with respect to the others, mirroring single-row statements in
//! Postgres. Nothing survives a restart.

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::models::{
    Budget, InsertOutcome, NewBudget, NewReminder, NewSession, NewTransaction, Reminder,
    SessionRecord, Transaction, TransactionFilter, TransactionPatch, User,
};
use super::{LedgerStore, SessionStore, Store, UserStore};

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    sessions: Vec<SessionRecord>,
    transactions: Vec<Transaction>,
    budgets: Vec<Budget>,
    reminders: Vec<Reminder>,
    last_id: LastIds,
}

#[derive(Default)]
struct LastIds {
    user: i64,
    session: i64,
    transaction: i64,
    budget: i64,
    reminder: i64,
}

fn next(counter: &mut i64) -> i64 {
    *counter += 1;
    *counter
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore").finish_non_exhaustive()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<InsertOutcome<User>> {
        let mut tables = self.tables.write().await;
        if tables.users.iter().any(|user| user.email == email) {
            return Ok(InsertOutcome::Conflict);
        }

        let now = Utc::now();
        let user = User {
            id: next(&mut tables.last_id.user),
            email: email.to_string(),
            hashed_password: hashed_password.to_string(),
            is_active: true,
            is_superuser: false,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(user.clone());
        Ok(InsertOutcome::Created(user))
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.email == email).cloned())
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|user| user.id == id).cloned())
    }

    async fn update_password(&self, id: i64, hashed_password: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.iter_mut().find(|user| user.id == id) else {
            return Ok(false);
        };
        user.hashed_password = hashed_password.to_string();
        user.updated_at = Utc::now();
        Ok(true)
    }

    async fn deactivate_user(&self, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.users.iter_mut().find(|user| user.id == id) else {
            return Ok(false);
        };
        user.is_active = false;
        user.updated_at = Utc::now();
        Ok(true)
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn insert_session(&self, session: NewSession) -> Result<InsertOutcome<SessionRecord>> {
        let mut tables = self.tables.write().await;
        if tables.sessions.iter().any(|row| row.jti == session.jti) {
            return Ok(InsertOutcome::Conflict);
        }
        // Mirrors the foreign key on sessions.user_id.
        if !tables.users.iter().any(|user| user.id == session.user_id) {
            anyhow::bail!("session references unknown user {}", session.user_id);
        }

        let record = SessionRecord {
            id: next(&mut tables.last_id.session),
            user_id: session.user_id,
            jti: session.jti,
            created_at: Utc::now(),
            expires_at: session.expires_at,
            ip_address: session.ip_address,
            user_agent: session.user_agent,
            is_active: true,
        };
        tables.sessions.push(record.clone());
        Ok(InsertOutcome::Created(record))
    }

    async fn deactivate_session(&self, jti: &str) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let Some(session) = tables
            .sessions
            .iter_mut()
            .find(|row| row.jti == jti && row.is_active)
        else {
            return Ok(false);
        };
        session.is_active = false;
        Ok(true)
    }

    async fn deactivate_user_sessions(&self, user_id: i64) -> Result<u64> {
        let mut tables = self.tables.write().await;
        let mut closed = 0;
        for session in tables
            .sessions
            .iter_mut()
            .filter(|row| row.user_id == user_id && row.is_active)
        {
            session.is_active = false;
            closed += 1;
        }
        Ok(closed)
    }

    async fn session_active(&self, jti: &str) -> Result<bool> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .iter()
            .any(|row| row.jti == jti && row.is_active))
    }

    async fn list_sessions(&self, user_id: i64) -> Result<Vec<SessionRecord>> {
        let tables = self.tables.read().await;
        let mut sessions: Vec<SessionRecord> = tables
            .sessions
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        sessions.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(sessions)
    }
}

#[async_trait]
impl LedgerStore for MemoryStore {
    async fn list_transactions(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let tables = self.tables.read().await;
        let mut transactions: Vec<Transaction> = tables
            .transactions
            .iter()
            .filter(|row| row.user_id == user_id && filter.matches(row))
            .cloned()
            .collect();
        transactions.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        Ok(transactions)
    }

    async fn insert_transaction(&self, user_id: i64, new: NewTransaction) -> Result<Transaction> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();
        let transaction = Transaction {
            id: next(&mut tables.last_id.transaction),
            user_id,
            amount: new.amount,
            category: new.category,
            kind: new.kind,
            description: new.description,
            date: new.date.unwrap_or(now),
            created_at: now,
        };
        tables.transactions.push(transaction.clone());
        Ok(transaction)
    }

    async fn update_transaction(
        &self,
        user_id: i64,
        id: i64,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>> {
        let mut tables = self.tables.write().await;
        let Some(row) = tables
            .transactions
            .iter_mut()
            .find(|row| row.id == id && row.user_id == user_id)
        else {
            return Ok(None);
        };

        if let Some(amount) = patch.amount {
            row.amount = amount;
        }
        if let Some(category) = patch.category {
            row.category = category;
        }
        if let Some(kind) = patch.kind {
            row.kind = kind;
        }
        if let Some(description) = patch.description {
            row.description = description;
        }
        if let Some(date) = patch.date {
            row.date = date;
        }
        Ok(Some(row.clone()))
    }

    async fn delete_transaction(&self, user_id: i64, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.transactions.len();
        tables
            .transactions
            .retain(|row| !(row.id == id && row.user_id == user_id));
        Ok(tables.transactions.len() < before)
    }

    async fn list_budgets(&self, user_id: i64) -> Result<Vec<Budget>> {
        let tables = self.tables.read().await;
        Ok(tables
            .budgets
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn insert_budget(&self, user_id: i64, new: NewBudget) -> Result<InsertOutcome<Budget>> {
        let mut tables = self.tables.write().await;
        if tables.budgets.iter().any(|row| {
            row.user_id == user_id && row.cycle == new.cycle && row.category == new.category
        }) {
            return Ok(InsertOutcome::Conflict);
        }

        let budget = Budget {
            id: next(&mut tables.last_id.budget),
            user_id,
            amount_limit: new.amount_limit,
            cycle: new.cycle,
            category: new.category,
        };
        tables.budgets.push(budget.clone());
        Ok(InsertOutcome::Created(budget))
    }

    async fn list_reminders(&self, user_id: i64) -> Result<Vec<Reminder>> {
        let tables = self.tables.read().await;
        let mut reminders: Vec<Reminder> = tables
            .reminders
            .iter()
            .filter(|row| row.user_id == user_id)
            .cloned()
            .collect();
        reminders.sort_by(|a, b| a.remind_at.cmp(&b.remind_at).then(a.id.cmp(&b.id)));
        Ok(reminders)
    }

    async fn insert_reminder(&self, user_id: i64, new: NewReminder) -> Result<Reminder> {
        let mut tables = self.tables.write().await;
        let reminder = Reminder {
            id: next(&mut tables.last_id.reminder),
            user_id,
            title: new.title,
            description: new.description,
            remind_at: new.remind_at,
            is_completed: false,
        };
        tables.reminders.push(reminder.clone());
        Ok(reminder)
    }

    async fn delete_reminder(&self, user_id: i64, id: i64) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.reminders.len();
        tables
            .reminders
            .retain(|row| !(row.id == id && row.user_id == user_id));
        Ok(tables.reminders.len() < before)
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
