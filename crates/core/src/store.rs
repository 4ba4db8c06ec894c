//! ChatStore trait — persistence for accounts, chats, and turns.
//!
//! Two collections back the assistant: chat records (problem statement,
//! summary, owner, nickname) and turn records (chat reference, owner, role,
//! text, timestamp), queried by owner + chat id and ordered by timestamp
//! ascending. Accounts were added alongside them for registration/login.

use async_trait::async_trait;

use crate::chat::{Account, AccountId, Chat, ChatId, Turn, TurnId};
use crate::error::StoreError;

/// The persistence boundary.
///
/// Implementations: SQLite (shipped), in-memory via `sqlite::memory:` (tests).
/// Every chat/turn query is scoped by the owning account; a chat id alone is
/// never enough to read another user's data.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// The backend name (e.g., "sqlite").
    fn name(&self) -> &str;

    // --- Accounts ---

    /// Store a new account.
    async fn create_account(&self, account: Account) -> std::result::Result<AccountId, StoreError>;

    /// Look an account up by email (unique).
    async fn find_account_by_email(
        &self,
        email: &str,
    ) -> std::result::Result<Option<Account>, StoreError>;

    /// Look an account up by id.
    async fn get_account(
        &self,
        id: &AccountId,
    ) -> std::result::Result<Option<Account>, StoreError>;

    // --- Chats ---

    /// Store a new chat.
    async fn create_chat(&self, chat: Chat) -> std::result::Result<ChatId, StoreError>;

    /// Fetch one chat owned by `owner`.
    async fn get_chat(
        &self,
        id: &ChatId,
        owner: &AccountId,
    ) -> std::result::Result<Option<Chat>, StoreError>;

    /// List chats owned by `owner`, newest first, with offset pagination.
    async fn list_chats(
        &self,
        owner: &AccountId,
        skip: u32,
        limit: u32,
    ) -> std::result::Result<Vec<Chat>, StoreError>;

    /// Count chats owned by `owner`.
    async fn count_chats(&self, owner: &AccountId) -> std::result::Result<u64, StoreError>;

    /// Update a chat's rolling summary, guarded by `expected_version`.
    ///
    /// Returns `false` when the stored version no longer matches, i.e. a
    /// concurrent request already wrote a newer summary; the caller must not
    /// treat that as an error.
    async fn update_summary(
        &self,
        id: &ChatId,
        owner: &AccountId,
        summary: &str,
        expected_version: i64,
    ) -> std::result::Result<bool, StoreError>;

    // --- Turns ---

    /// Append one turn.
    async fn append_turn(&self, turn: Turn) -> std::result::Result<TurnId, StoreError>;

    /// All turns of a chat owned by `owner`, ordered by creation time ascending.
    async fn list_turns(
        &self,
        chat: &ChatId,
        owner: &AccountId,
    ) -> std::result::Result<Vec<Turn>, StoreError>;
}
