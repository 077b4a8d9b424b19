//! `PostgreSQL` backend. Queries are plain `sqlx::query` calls wrapped in a
//! `db.query` span so they show up next to the request span that issued them.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::{
    postgres::{PgPoolOptions, PgRow},
    PgPool, Row,
};
use std::time::Duration;
use tracing::{Instrument, Span};

use super::models::{
    Budget, BudgetCycle, InsertOutcome, NewBudget, NewReminder, NewSession, NewTransaction,
    Reminder, SessionRecord, Transaction, TransactionFilter, TransactionKind, TransactionPatch,
    User,
};
use super::{LedgerStore, SessionStore, Store, UserStore};

const USER_COLUMNS: &str =
    "id, email, hashed_password, is_active, is_superuser, created_at, updated_at";
const SESSION_COLUMNS: &str =
    "id, user_id, jti, created_at, expires_at, ip_address, user_agent, is_active";
const SCHEMA: &str = include_str!("../../sql/schema.sql");

const TRANSACTION_COLUMNS: &str =
    "id, user_id, amount, category, kind, description, occurred_at, created_at";

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool against `dsn` and verify it with a round trip.
    ///
    /// # Errors
    ///
    /// Returns an error if the pool cannot be created or the database is unreachable.
    pub async fn connect(dsn: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(dsn)
            .await
            .context("Failed to connect to database")?;

        let store = Self::from_pool(pool);
        store.ping().await?;
        Ok(store)
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create missing tables and indexes from `sql/schema.sql`. Every
    /// statement is `IF NOT EXISTS`, so this is safe on every start.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first statement that fails.
    pub async fn apply_schema(&self) -> Result<()> {
        for statement in split_sql_statements(SCHEMA) {
            sqlx::query(&statement)
                .execute(&self.pool)
                .instrument(query_span("schema", &statement))
                .await
                .with_context(|| format!("Failed to apply schema statement: {statement}"))?;
        }
        Ok(())
    }
}

fn split_sql_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();

    for line in sql.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with("--") {
            continue;
        }
        current.push_str(line);
        current.push('\n');

        if trimmed.ends_with(';') {
            let statement = current.trim();
            if !statement.is_empty() {
                statements.push(statement.to_string());
            }
            current.clear();
        }
    }

    let leftover = current.trim();
    if !leftover.is_empty() {
        statements.push(leftover.to_string());
    }

    statements
}

fn query_span(operation: &'static str, statement: &str) -> Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

/// SQLSTATE 23505 is `unique_violation`.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

fn user_from_row(row: &PgRow) -> User {
    User {
        id: row.get("id"),
        email: row.get("email"),
        hashed_password: row.get("hashed_password"),
        is_active: row.get("is_active"),
        is_superuser: row.get("is_superuser"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn session_from_row(row: &PgRow) -> SessionRecord {
    SessionRecord {
        id: row.get("id"),
        user_id: row.get("user_id"),
        jti: row.get("jti"),
        created_at: row.get("created_at"),
        expires_at: row.get("expires_at"),
        ip_address: row.get("ip_address"),
        user_agent: row.get("user_agent"),
        is_active: row.get("is_active"),
    }
}

fn transaction_from_row(row: &PgRow) -> Result<Transaction> {
    let kind: String = row.get("kind");
    Ok(Transaction {
        id: row.get("id"),
        user_id: row.get("user_id"),
        amount: row.get("amount"),
        category: row.get("category"),
        kind: kind.parse::<TransactionKind>().map_err(|err| anyhow!(err))?,
        description: row.get("description"),
        date: row.get("occurred_at"),
        created_at: row.get("created_at"),
    })
}

fn budget_from_row(row: &PgRow) -> Result<Budget> {
    let cycle: String = row.get("cycle");
    Ok(Budget {
        id: row.get("id"),
        user_id: row.get("user_id"),
        amount_limit: row.get("amount_limit"),
        cycle: cycle.parse::<BudgetCycle>().map_err(|err| anyhow!(err))?,
        category: row.get("category"),
    })
}

fn reminder_from_row(row: &PgRow) -> Reminder {
    Reminder {
        id: row.get("id"),
        user_id: row.get("user_id"),
        title: row.get("title"),
        description: row.get("description"),
        remind_at: row.get("remind_at"),
        is_completed: row.get("is_completed"),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(
        &self,
        email: &str,
        hashed_password: &str,
    ) -> Result<InsertOutcome<User>> {
        let query = format!(
            "INSERT INTO users (email, hashed_password) VALUES ($1, $2) RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query(&query)
            .bind(email)
            .bind(hashed_password)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await;

        match row {
            Ok(row) => Ok(InsertOutcome::Created(user_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert user"),
        }
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by email")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to lookup user by id")?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_password(&self, id: i64, hashed_password: &str) -> Result<bool> {
        let query = "UPDATE users SET hashed_password = $2, updated_at = NOW() WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .bind(hashed_password)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to update password")?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_user(&self, id: i64) -> Result<bool> {
        let query = "UPDATE users SET is_active = FALSE, updated_at = NOW() WHERE id = $1";
        let result = sqlx::query(query)
            .bind(id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to deactivate user")?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl SessionStore for PgStore {
    async fn insert_session(&self, session: NewSession) -> Result<InsertOutcome<SessionRecord>> {
        let query = format!(
            r"
            INSERT INTO sessions (user_id, jti, expires_at, ip_address, user_agent)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {SESSION_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(session.user_id)
            .bind(&session.jti)
            .bind(session.expires_at)
            .bind(&session.ip_address)
            .bind(&session.user_agent)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await;

        match row {
            Ok(row) => Ok(InsertOutcome::Created(session_from_row(&row))),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert session"),
        }
    }

    async fn deactivate_session(&self, jti: &str) -> Result<bool> {
        let query = "UPDATE sessions SET is_active = FALSE WHERE jti = $1 AND is_active";
        let result = sqlx::query(query)
            .bind(jti)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to deactivate session")?;
        Ok(result.rows_affected() > 0)
    }

    async fn deactivate_user_sessions(&self, user_id: i64) -> Result<u64> {
        let query = "UPDATE sessions SET is_active = FALSE WHERE user_id = $1 AND is_active";
        let result = sqlx::query(query)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("UPDATE", query))
            .await
            .context("failed to deactivate user sessions")?;
        Ok(result.rows_affected())
    }

    async fn session_active(&self, jti: &str) -> Result<bool> {
        let query = "SELECT is_active FROM sessions WHERE jti = $1";
        let row = sqlx::query(query)
            .bind(jti)
            .fetch_optional(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to lookup session")?;
        Ok(row.is_some_and(|row| row.get::<bool, _>("is_active")))
    }

    async fn list_sessions(&self, user_id: i64) -> Result<Vec<SessionRecord>> {
        let query = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = $1 ORDER BY created_at DESC, id DESC"
        );
        let rows = sqlx::query(&query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to list sessions")?;
        Ok(rows.iter().map(session_from_row).collect())
    }
}

#[async_trait]
impl LedgerStore for PgStore {
    async fn list_transactions(
        &self,
        user_id: i64,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>> {
        let query = format!(
            r"
            SELECT {TRANSACTION_COLUMNS} FROM transactions
            WHERE user_id = $1
              AND ($2::timestamptz IS NULL OR occurred_at >= $2)
              AND ($3::timestamptz IS NULL OR occurred_at <= $3)
              AND ($4::text IS NULL OR category = $4)
              AND ($5::text IS NULL OR kind = $5)
            ORDER BY occurred_at DESC, id DESC
            "
        );
        let rows = sqlx::query(&query)
            .bind(user_id)
            .bind(filter.start_date)
            .bind(filter.end_date)
            .bind(filter.category.as_deref())
            .bind(filter.kind.map(TransactionKind::as_str))
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", &query))
            .await
            .context("failed to list transactions")?;
        rows.iter().map(transaction_from_row).collect()
    }

    async fn insert_transaction(&self, user_id: i64, new: NewTransaction) -> Result<Transaction> {
        let query = format!(
            r"
            INSERT INTO transactions (user_id, amount, category, kind, description, occurred_at)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW()))
            RETURNING {TRANSACTION_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(user_id)
            .bind(new.amount)
            .bind(&new.category)
            .bind(new.kind.as_str())
            .bind(&new.description)
            .bind(new.date)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", &query))
            .await
            .context("failed to insert transaction")?;
        transaction_from_row(&row)
    }

    async fn update_transaction(
        &self,
        user_id: i64,
        id: i64,
        patch: TransactionPatch,
    ) -> Result<Option<Transaction>> {
        if patch.is_empty() {
            let query = format!(
                "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE id = $1 AND user_id = $2"
            );
            let row = sqlx::query(&query)
                .bind(id)
                .bind(user_id)
                .fetch_optional(&self.pool)
                .instrument(query_span("SELECT", &query))
                .await
                .context("failed to fetch transaction")?;
            return row.as_ref().map(transaction_from_row).transpose();
        }

        let query = format!(
            r"
            UPDATE transactions SET
                amount = COALESCE($3, amount),
                category = COALESCE($4, category),
                kind = COALESCE($5, kind),
                description = CASE WHEN $8 THEN $6 ELSE description END,
                occurred_at = COALESCE($7, occurred_at)
            WHERE id = $1 AND user_id = $2
            RETURNING {TRANSACTION_COLUMNS}
            "
        );
        let row = sqlx::query(&query)
            .bind(id)
            .bind(user_id)
            .bind(patch.amount)
            .bind(patch.category.as_deref())
            .bind(patch.kind.map(TransactionKind::as_str))
            .bind(patch.description.as_ref().and_then(Option::as_deref))
            .bind(patch.date)
            .bind(patch.description.is_some())
            .fetch_optional(&self.pool)
            .instrument(query_span("UPDATE", &query))
            .await
            .context("failed to update transaction")?;
        row.as_ref().map(transaction_from_row).transpose()
    }

    async fn delete_transaction(&self, user_id: i64, id: i64) -> Result<bool> {
        let query = "DELETE FROM transactions WHERE id = $1 AND user_id = $2";
        let result = sqlx::query(query)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete transaction")?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_budgets(&self, user_id: i64) -> Result<Vec<Budget>> {
        let query = "SELECT id, user_id, amount_limit, cycle, category FROM budgets WHERE user_id = $1 ORDER BY id";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list budgets")?;
        rows.iter().map(budget_from_row).collect()
    }

    async fn insert_budget(&self, user_id: i64, new: NewBudget) -> Result<InsertOutcome<Budget>> {
        let query = r"
            INSERT INTO budgets (user_id, amount_limit, cycle, category)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, amount_limit, cycle, category
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(new.amount_limit)
            .bind(new.cycle.as_str())
            .bind(&new.category)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await;

        match row {
            Ok(row) => Ok(InsertOutcome::Created(budget_from_row(&row)?)),
            Err(err) if is_unique_violation(&err) => Ok(InsertOutcome::Conflict),
            Err(err) => Err(err).context("failed to insert budget"),
        }
    }

    async fn list_reminders(&self, user_id: i64) -> Result<Vec<Reminder>> {
        let query = r"
            SELECT id, user_id, title, description, remind_at, is_completed
            FROM reminders WHERE user_id = $1
            ORDER BY remind_at, id
        ";
        let rows = sqlx::query(query)
            .bind(user_id)
            .fetch_all(&self.pool)
            .instrument(query_span("SELECT", query))
            .await
            .context("failed to list reminders")?;
        Ok(rows.iter().map(reminder_from_row).collect())
    }

    async fn insert_reminder(&self, user_id: i64, new: NewReminder) -> Result<Reminder> {
        let query = r"
            INSERT INTO reminders (user_id, title, description, remind_at)
            VALUES ($1, $2, $3, $4)
            RETURNING id, user_id, title, description, remind_at, is_completed
        ";
        let row = sqlx::query(query)
            .bind(user_id)
            .bind(&new.title)
            .bind(&new.description)
            .bind(new.remind_at)
            .fetch_one(&self.pool)
            .instrument(query_span("INSERT", query))
            .await
            .context("failed to insert reminder")?;
        Ok(reminder_from_row(&row))
    }

    async fn delete_reminder(&self, user_id: i64, id: i64) -> Result<bool> {
        let query = "DELETE FROM reminders WHERE id = $1 AND user_id = $2";
        let result = sqlx::query(query)
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .instrument(query_span("DELETE", query))
            .await
            .context("failed to delete reminder")?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(query_span("SELECT", "SELECT 1"))
            .await
            .context("database ping failed")?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "postgres"
    }
}

#[cfg(test)]
mod tests {
    use super::{is_unique_violation, split_sql_statements, SCHEMA};
    use sqlx::error::{DatabaseError, ErrorKind};
    use std::{borrow::Cow, error::Error as StdError, fmt};

    #[derive(Debug)]
    struct FakeDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "fake database error")
        }
    }

    impl StdError for FakeDbError {}

    impl DatabaseError for FakeDbError {
        fn message(&self) -> &'static str {
            "fake database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::Other
        }
    }

    #[test]
    fn unique_violation_is_detected_by_sqlstate() {
        let duplicate = sqlx::Error::Database(Box::new(FakeDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&duplicate));

        let foreign_key = sqlx::Error::Database(Box::new(FakeDbError {
            code: Some("23503"),
        }));
        assert!(!is_unique_violation(&foreign_key));

        let no_code = sqlx::Error::Database(Box::new(FakeDbError { code: None }));
        assert!(!is_unique_violation(&no_code));

        assert!(!is_unique_violation(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn split_sql_statements_skips_comments() {
        let sql = r"
-- users
CREATE TABLE users(id int);

CREATE INDEX users_id
    ON users (id);
";
        let statements = split_sql_statements(sql);
        assert_eq!(statements.len(), 2);
        assert!(statements
            .first()
            .is_some_and(|statement| statement.starts_with("CREATE TABLE users")));
        assert!(statements
            .get(1)
            .is_some_and(|statement| statement.contains("ON users (id);")));
    }

    #[test]
    fn bundled_schema_creates_every_table() {
        let statements = split_sql_statements(SCHEMA);
        for table in ["users", "sessions", "transactions", "budgets", "reminders"] {
            let create = format!("CREATE TABLE IF NOT EXISTS {table} ");
            assert!(
                statements.iter().any(|statement| statement.starts_with(&create)),
                "missing table {table}"
            );
        }
    }
}
