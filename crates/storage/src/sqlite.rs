//! SQLite chat store.
//!
//! Uses a single SQLite database file with three tables:
//! - `accounts` — registered users (email unique)
//! - `chats` — one row per conversation, with the problem statement and
//!   the rolling summary plus its version counter
//! - `turns` — ordered chat history, scoped by chat and owning account
//!
//! Timestamps are stored as RFC 3339 text. Rows written by older clients
//! carried naive timestamps; those parse as UTC on the way out.

use async_trait::async_trait;
use hintforge_core::chat::{Account, AccountId, Chat, ChatId, Role, Turn, TurnId, parse_timestamp};
use hintforge_core::error::StoreError;
use hintforge_core::store::ChatStore;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use std::str::FromStr;
use tracing::{debug, info};

/// A production SQLite store.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store from a file path.
    ///
    /// The database and all tables/indexes are created automatically.
    /// Pass `"sqlite::memory:"` for an in-process ephemeral database
    /// (useful for tests).
    pub async fn new(path: &str) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str(path)
            .map_err(|e| StoreError::Storage(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .pragma("foreign_keys", "ON");

        // Every pooled connection to `:memory:` opens its own database, so
        // the pool must stay at one connection there or queries land on an
        // empty schema.
        let max_connections = if path.contains(":memory:") { 1 } else { 4 };

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to open SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;
        info!("SQLite chat store initialized at {path}");
        Ok(store)
    }

    /// Create from an existing pool (useful for testing).
    pub async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        let store = Self { pool };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Run schema migrations — creates tables and indexes.
    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS accounts (
                id            TEXT PRIMARY KEY,
                username      TEXT NOT NULL,
                email         TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at    TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("accounts table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS chats (
                id                TEXT PRIMARY KEY,
                account_id        TEXT NOT NULL,
                nickname          TEXT NOT NULL,
                problem_statement TEXT NOT NULL,
                summary           TEXT NOT NULL DEFAULT '',
                summary_version   INTEGER NOT NULL DEFAULT 0,
                created_at        TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("chats table: {e}")))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS turns (
                id         TEXT PRIMARY KEY,
                chat_id    TEXT NOT NULL,
                account_id TEXT NOT NULL,
                role       TEXT NOT NULL,
                content    TEXT NOT NULL,
                created_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("turns table: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_chats_account_created \
             ON chats(account_id, created_at DESC)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("chats index: {e}")))?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_turns_chat_created \
             ON turns(chat_id, created_at)",
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::MigrationFailed(format!("turns index: {e}")))?;

        debug!("SQLite migrations complete");
        Ok(())
    }

    /// Parse an `Account` from a SQLite row.
    fn row_to_account(row: &sqlx::sqlite::SqliteRow) -> Result<Account, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::InvalidRow(format!("id column: {e}")))?;
        let username: String = row
            .try_get("username")
            .map_err(|e| StoreError::InvalidRow(format!("username column: {e}")))?;
        let email: String = row
            .try_get("email")
            .map_err(|e| StoreError::InvalidRow(format!("email column: {e}")))?;
        let password_hash: String = row
            .try_get("password_hash")
            .map_err(|e| StoreError::InvalidRow(format!("password_hash column: {e}")))?;
        let created_at_raw: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::InvalidRow(format!("created_at column: {e}")))?;

        let created_at = parse_timestamp(&created_at_raw)
            .ok_or_else(|| StoreError::InvalidRow(format!("bad created_at: {created_at_raw}")))?;

        Ok(Account {
            id: AccountId(id),
            username,
            email,
            password_hash,
            created_at,
        })
    }

    /// Parse a `Chat` from a SQLite row.
    fn row_to_chat(row: &sqlx::sqlite::SqliteRow) -> Result<Chat, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::InvalidRow(format!("id column: {e}")))?;
        let account_id: String = row
            .try_get("account_id")
            .map_err(|e| StoreError::InvalidRow(format!("account_id column: {e}")))?;
        let nickname: String = row
            .try_get("nickname")
            .map_err(|e| StoreError::InvalidRow(format!("nickname column: {e}")))?;
        let problem_statement: String = row
            .try_get("problem_statement")
            .map_err(|e| StoreError::InvalidRow(format!("problem_statement column: {e}")))?;
        let summary: String = row
            .try_get("summary")
            .map_err(|e| StoreError::InvalidRow(format!("summary column: {e}")))?;
        let summary_version: i64 = row
            .try_get("summary_version")
            .map_err(|e| StoreError::InvalidRow(format!("summary_version column: {e}")))?;
        let created_at_raw: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::InvalidRow(format!("created_at column: {e}")))?;

        let created_at = parse_timestamp(&created_at_raw)
            .ok_or_else(|| StoreError::InvalidRow(format!("bad created_at: {created_at_raw}")))?;

        Ok(Chat {
            id: ChatId(id),
            account_id: AccountId(account_id),
            nickname,
            problem_statement,
            summary,
            summary_version,
            created_at,
        })
    }

    /// Parse a `Turn` from a SQLite row.
    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<Turn, StoreError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| StoreError::InvalidRow(format!("id column: {e}")))?;
        let chat_id: String = row
            .try_get("chat_id")
            .map_err(|e| StoreError::InvalidRow(format!("chat_id column: {e}")))?;
        let account_id: String = row
            .try_get("account_id")
            .map_err(|e| StoreError::InvalidRow(format!("account_id column: {e}")))?;
        let role_raw: String = row
            .try_get("role")
            .map_err(|e| StoreError::InvalidRow(format!("role column: {e}")))?;
        let content: String = row
            .try_get("content")
            .map_err(|e| StoreError::InvalidRow(format!("content column: {e}")))?;
        let created_at_raw: String = row
            .try_get("created_at")
            .map_err(|e| StoreError::InvalidRow(format!("created_at column: {e}")))?;

        let role = role_raw.parse::<Role>().map_err(StoreError::InvalidRow)?;
        let created_at = parse_timestamp(&created_at_raw)
            .ok_or_else(|| StoreError::InvalidRow(format!("bad created_at: {created_at_raw}")))?;

        Ok(Turn {
            id: TurnId(id),
            chat_id: ChatId(chat_id),
            account_id: AccountId(account_id),
            role,
            content,
            created_at,
        })
    }
}

#[async_trait]
impl ChatStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn create_account(&self, account: Account) -> Result<AccountId, StoreError> {
        let id = account.id.clone();
        sqlx::query(
            r#"
            INSERT INTO accounts (id, username, email, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&account.id.0)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT account: {e}")))?;

        debug!("Created account {id}");
        Ok(id)
    }

    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT * FROM accounts WHERE email = ?1")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("account by email: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_account(r)?)),
            None => Ok(None),
        }
    }

    async fn get_account(&self, id: &AccountId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query("SELECT * FROM accounts WHERE id = ?1")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("account by id: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_account(r)?)),
            None => Ok(None),
        }
    }

    async fn create_chat(&self, chat: Chat) -> Result<ChatId, StoreError> {
        let id = chat.id.clone();
        sqlx::query(
            r#"
            INSERT INTO chats (id, account_id, nickname, problem_statement,
                               summary, summary_version, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&chat.id.0)
        .bind(&chat.account_id.0)
        .bind(&chat.nickname)
        .bind(&chat.problem_statement)
        .bind(&chat.summary)
        .bind(chat.summary_version)
        .bind(chat.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT chat: {e}")))?;

        debug!("Created chat {id}");
        Ok(id)
    }

    async fn get_chat(&self, id: &ChatId, owner: &AccountId) -> Result<Option<Chat>, StoreError> {
        let row = sqlx::query("SELECT * FROM chats WHERE id = ?1 AND account_id = ?2")
            .bind(&id.0)
            .bind(&owner.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("chat by id: {e}")))?;

        match row {
            Some(ref r) => Ok(Some(Self::row_to_chat(r)?)),
            None => Ok(None),
        }
    }

    async fn list_chats(
        &self,
        owner: &AccountId,
        skip: u32,
        limit: u32,
    ) -> Result<Vec<Chat>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM chats
            WHERE account_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2 OFFSET ?3
            "#,
        )
        .bind(&owner.0)
        .bind(limit as i64)
        .bind(skip as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("chat list: {e}")))?;

        rows.iter().map(Self::row_to_chat).collect()
    }

    async fn count_chats(&self, owner: &AccountId) -> Result<u64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS cnt FROM chats WHERE account_id = ?1")
            .bind(&owner.0)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| StoreError::QueryFailed(format!("chat count: {e}")))?;

        let cnt: i64 = row
            .try_get("cnt")
            .map_err(|e| StoreError::QueryFailed(format!("cnt column: {e}")))?;

        Ok(cnt as u64)
    }

    async fn update_summary(
        &self,
        id: &ChatId,
        owner: &AccountId,
        summary: &str,
        expected_version: i64,
    ) -> Result<bool, StoreError> {
        // The version guard: the UPDATE only lands when the stored counter
        // still matches what the caller read. A lost race affects zero rows.
        let result = sqlx::query(
            r#"
            UPDATE chats
            SET summary = ?1, summary_version = summary_version + 1
            WHERE id = ?2 AND account_id = ?3 AND summary_version = ?4
            "#,
        )
        .bind(summary)
        .bind(&id.0)
        .bind(&owner.0)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("UPDATE summary: {e}")))?;

        Ok(result.rows_affected() == 1)
    }

    async fn append_turn(&self, turn: Turn) -> Result<TurnId, StoreError> {
        let id = turn.id.clone();
        sqlx::query(
            r#"
            INSERT INTO turns (id, chat_id, account_id, role, content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&turn.id.0)
        .bind(&turn.chat_id.0)
        .bind(&turn.account_id.0)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(turn.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Storage(format!("INSERT turn: {e}")))?;

        Ok(id)
    }

    async fn list_turns(&self, chat: &ChatId, owner: &AccountId) -> Result<Vec<Turn>, StoreError> {
        // rowid breaks timestamp ties in insertion order
        let rows = sqlx::query(
            r#"
            SELECT * FROM turns
            WHERE chat_id = ?1 AND account_id = ?2
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(&chat.0)
        .bind(&owner.0)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StoreError::QueryFailed(format!("turn list: {e}")))?;

        rows.iter().map(Self::row_to_turn).collect()
    }
}
