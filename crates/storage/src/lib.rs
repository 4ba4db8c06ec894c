//! Persistence backends for HintForge.
//!
//! One backend ships: SQLite via sqlx. Pass `"sqlite::memory:"` to
//! [`SqliteStore::new`] for an ephemeral database with the full schema,
//! which is how the tests across the workspace run against a real store.

pub mod sqlite;

pub use sqlite::SqliteStore;
