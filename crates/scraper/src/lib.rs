//! Problem statement scraping for HintForge.
//!
//! The `ProblemSource` trait is the seam between the gateway and the outside
//! world: chat creation fetches a plain-text problem statement through it,
//! and tests swap in a canned source. The shipped implementation talks to
//! the LeetCode GraphQL API.

use async_trait::async_trait;
use hintforge_core::error::ScrapeError;

pub mod leetcode;

pub use leetcode::LeetCodeScraper;

/// A source of plain-text problem statements.
#[async_trait]
pub trait ProblemSource: Send + Sync {
    /// A short name for logs.
    fn name(&self) -> &str;

    /// Fetch the statement behind `problem_url` as plain text.
    async fn fetch_statement(&self, problem_url: &str) -> Result<String, ScrapeError>;
}
