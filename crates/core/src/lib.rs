//! # hintforge Core
//!
//! Domain types, traits, and error definitions for the hintforge
//! competitive-programming assistant. This crate has **zero framework
//! dependencies** — it defines the domain model that all other crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here. Implementations
//! live in their respective crates. This enables:
//! - Swapping implementations via configuration
//! - Easy testing with mock/stub implementations
//! - Clean dependency graph (all crates depend inward on core)

pub mod chat;
pub mod error;
pub mod event;
pub mod provider;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use chat::{Account, AccountId, Chat, ChatId, Role, Turn, TurnId, parse_timestamp};
pub use error::{AgentError, Error, ProviderError, Result, ScrapeError, StoreError};
pub use event::{DomainEvent, EventBus};
pub use provider::{CompletionRequest, CompletionResponse, PromptMessage, Provider, ResponseFormat, Usage};
pub use store::ChatStore;
