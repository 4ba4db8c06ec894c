//! LLM provider implementations for hintforge.
//!
//! All providers implement the `hintforge_core::Provider` trait. The
//! assistant talks to Groq by default, but any OpenAI-compatible endpoint
//! works.

pub mod openai_compat;

pub use openai_compat::OpenAiCompatProvider;
