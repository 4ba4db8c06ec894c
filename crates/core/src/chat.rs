//! Chat, Turn and Account domain types.
//!
//! These are the core value objects that flow through the entire system:
//! a user sends a message → the gateway loads the chat → the pipeline
//! produces a reply → both turns land in the store.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a chat.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatId(pub String);

impl ChatId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for ChatId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ChatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an account.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccountId(pub String);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a single turn.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(pub String);

impl TurnId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TurnId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a turn's sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The assistant
    Assistant,
    /// System instructions
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            "assistant" => Ok(Role::Assistant),
            "system" => Ok(Role::System),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// A single turn in a chat.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    /// Unique turn ID
    pub id: TurnId,

    /// The chat this turn belongs to
    pub chat_id: ChatId,

    /// The account that owns the chat
    pub account_id: AccountId,

    /// Who sent this turn
    pub role: Role,

    /// The text content
    pub content: String,

    /// Creation timestamp; turns of a chat are totally ordered by it
    pub created_at: DateTime<Utc>,
}

impl Turn {
    /// Create a new user turn.
    pub fn user(chat_id: ChatId, account_id: AccountId, content: impl Into<String>) -> Self {
        Self::new(chat_id, account_id, Role::User, content)
    }

    /// Create a new assistant turn.
    pub fn assistant(chat_id: ChatId, account_id: AccountId, content: impl Into<String>) -> Self {
        Self::new(chat_id, account_id, Role::Assistant, content)
    }

    pub fn new(
        chat_id: ChatId,
        account_id: AccountId,
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: TurnId::new(),
            chat_id,
            account_id,
            role,
            content: content.into(),
            created_at: Utc::now(),
        }
    }
}

/// A chat binds a scraped problem statement to its turn history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    /// Unique chat ID
    pub id: ChatId,

    /// Owning account
    pub account_id: AccountId,

    /// Display name (defaults to the problem URL when the user gives none)
    pub nickname: String,

    /// Plain-text problem statement the chat is about
    pub problem_statement: String,

    /// Rolling summary of older turns; empty until the history threshold is crossed
    #[serde(default)]
    pub summary: String,

    /// Incremented on every summary write; guards racing summary updates
    #[serde(default)]
    pub summary_version: i64,

    /// When this chat was created
    pub created_at: DateTime<Utc>,
}

impl Chat {
    pub fn new(
        account_id: AccountId,
        nickname: impl Into<String>,
        problem_statement: impl Into<String>,
    ) -> Self {
        Self {
            id: ChatId::new(),
            account_id,
            nickname: nickname.into(),
            problem_statement: problem_statement.into(),
            summary: String::new(),
            summary_version: 0,
            created_at: Utc::now(),
        }
    }
}

/// A registered account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub email: String,
    /// bcrypt hash, never the plaintext password
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: AccountId::new(),
            username: username.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            created_at: Utc::now(),
        }
    }
}

/// Parse a stored timestamp string.
///
/// Accepts RFC 3339; a naive timestamp without a zone is assumed to be UTC,
/// matching how pre-existing rows written by older clients are interpreted.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    raw.parse::<NaiveDateTime>()
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_turn() {
        let turn = Turn::user(ChatId::new(), AccountId::new(), "Explain me the problem");
        assert_eq!(turn.role, Role::User);
        assert_eq!(turn.content, "Explain me the problem");
    }

    #[test]
    fn role_roundtrip() {
        for role in [Role::User, Role::Assistant, Role::System] {
            let parsed: Role = role.as_str().parse().unwrap();
            assert_eq!(parsed, role);
        }
        assert!("moderator".parse::<Role>().is_err());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn new_chat_starts_without_summary() {
        let chat = Chat::new(AccountId::new(), "two-sum", "Given an array of integers...");
        assert!(chat.summary.is_empty());
        assert_eq!(chat.summary_version, 0);
    }

    #[test]
    fn turn_serialization_roundtrip() {
        let turn = Turn::assistant(ChatId::new(), AccountId::new(), "Think about hash maps.");
        let json = serde_json::to_string(&turn).unwrap();
        let deserialized: Turn = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized.content, "Think about hash maps.");
        assert_eq!(deserialized.role, Role::Assistant);
    }

    #[test]
    fn parse_timestamp_rfc3339() {
        let dt = parse_timestamp("2024-01-01T10:00:00+02:00").unwrap();
        assert_eq!(dt.to_rfc3339(), "2024-01-01T08:00:00+00:00");
    }

    #[test]
    fn parse_timestamp_naive_is_utc() {
        let naive = parse_timestamp("2024-01-01T10:00:00").unwrap();
        let explicit = parse_timestamp("2024-01-01T10:00:00Z").unwrap();
        assert_eq!(naive, explicit);
    }

    #[test]
    fn parse_timestamp_rejects_garbage() {
        assert!(parse_timestamp("yesterday").is_none());
    }
}
