//! LeetCode problem source.
//!
//! Statements are fetched through the public GraphQL endpoint rather than by
//! scraping the rendered page: the `questionData` query returns the problem
//! body as HTML, which is flattened to newline-separated plain text before
//! it reaches the prompt builder.

use std::time::Duration;

use async_trait::async_trait;
use hintforge_core::error::ScrapeError;
use serde::Deserialize;
use tracing::debug;

use crate::ProblemSource;

const QUESTION_QUERY: &str = r#"
query questionData($titleSlug: String!) {
  question(titleSlug: $titleSlug) {
    content
  }
}
"#;

/// Fetches problem statements from the LeetCode GraphQL API.
pub struct LeetCodeScraper {
    graphql_url: String,
    client: reqwest::Client,
}

impl LeetCodeScraper {
    /// Create a new scraper against `graphql_url`.
    pub fn new(graphql_url: impl Into<String>) -> Result<Self, ScrapeError> {
        Self::with_timeout(graphql_url, Duration::from_secs(30))
    }

    /// Create a scraper with an explicit request timeout.
    pub fn with_timeout(
        graphql_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ScrapeError::Network(format!("HTTP client: {e}")))?;

        Ok(Self {
            graphql_url: graphql_url.into(),
            client,
        })
    }
}

#[async_trait]
impl ProblemSource for LeetCodeScraper {
    fn name(&self) -> &str {
        "leetcode"
    }

    async fn fetch_statement(&self, problem_url: &str) -> Result<String, ScrapeError> {
        let slug = extract_slug(problem_url)?;
        debug!(slug = %slug, "Fetching problem statement");

        let payload = serde_json::json!({
            "operationName": "questionData",
            "variables": { "titleSlug": slug },
            "query": QUESTION_QUERY,
        });

        let response = self
            .client
            .post(&self.graphql_url)
            .header("Content-Type", "application/json")
            .header("Referer", format!("https://leetcode.com/problems/{slug}/"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ScrapeError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ScrapeError::Api(format!("HTTP {status}")));
        }

        let body: GraphQlResponse = response
            .json()
            .await
            .map_err(|e| ScrapeError::Api(format!("Malformed response: {e}")))?;

        if let Some(errors) = body.errors {
            return Err(ScrapeError::Api(errors.to_string()));
        }

        let html = body
            .data
            .and_then(|d| d.question)
            .and_then(|q| q.content)
            .ok_or(ScrapeError::MissingContent)?;

        let text = html_to_text(&html);
        if text.is_empty() {
            return Err(ScrapeError::MissingContent);
        }
        Ok(text)
    }
}

/// Pull the problem slug out of a problem URL.
///
/// The slug is the last path segment, or the one before it when the URL ends
/// with a `description` segment (the canonical LeetCode form). Query string,
/// fragment, and trailing slashes are ignored.
fn extract_slug(problem_url: &str) -> Result<String, ScrapeError> {
    // A string without a scheme is treated as all path.
    let path = match problem_url.split_once("://") {
        Some((_, rest)) => rest.split_once('/').map(|(_, p)| p).unwrap_or(""),
        None => problem_url,
    };
    let path = path
        .split(['?', '#'])
        .next()
        .unwrap_or("")
        .trim_end_matches('/');

    let parts: Vec<&str> = path.split('/').collect();
    let slug = match parts.as_slice() {
        [.., before, "description"] => *before,
        [.., last] => *last,
        [] => "",
    };

    if slug.is_empty() {
        return Err(ScrapeError::InvalidUrl(problem_url.to_string()));
    }
    Ok(slug.to_string())
}

/// Flatten HTML to plain text.
///
/// Every text node becomes one line: tags are dropped, entities decoded,
/// fragments trimmed, and whitespace-only fragments skipped.
fn html_to_text(html: &str) -> String {
    let mut fragments: Vec<String> = Vec::new();
    let mut current = String::new();
    let mut in_tag = false;

    for c in html.chars() {
        match c {
            '<' if !in_tag => {
                in_tag = true;
                push_fragment(&mut fragments, &current);
                current.clear();
            }
            '>' if in_tag => in_tag = false,
            _ if in_tag => {}
            _ => current.push(c),
        }
    }
    push_fragment(&mut fragments, &current);

    fragments.join("\n")
}

fn push_fragment(fragments: &mut Vec<String>, raw: &str) {
    let text = decode_entities(raw);
    let trimmed = text.trim();
    if !trimmed.is_empty() {
        fragments.push(trimmed.to_string());
    }
}

/// Decode the HTML entities that appear in problem bodies.
///
/// Named entities outside the common set are left as-is.
fn decode_entities(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find('&') {
        out.push_str(&rest[..pos]);
        rest = &rest[pos..];

        // Entities are short; scan a small window for the terminator.
        let end = rest
            .char_indices()
            .take(12)
            .find(|&(_, c)| c == ';')
            .map(|(i, _)| i);
        let Some(end) = end else {
            out.push('&');
            rest = &rest[1..];
            continue;
        };

        let decoded = match &rest[1..end] {
            "amp" => Some('&'),
            "lt" => Some('<'),
            "gt" => Some('>'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            "nbsp" => Some('\u{a0}'),
            entity => numeric_entity(entity),
        };

        match decoded {
            Some(c) => {
                out.push(c);
                rest = &rest[end + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }

    out.push_str(rest);
    out
}

fn numeric_entity(entity: &str) -> Option<char> {
    entity
        .strip_prefix("#x")
        .or_else(|| entity.strip_prefix("#X"))
        .and_then(|hex| u32::from_str_radix(hex, 16).ok())
        .or_else(|| entity.strip_prefix('#').and_then(|dec| dec.parse().ok()))
        .and_then(char::from_u32)
}

// --- GraphQL response types (internal) ---

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<QuestionData>,
    errors: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct QuestionData {
    question: Option<Question>,
}

#[derive(Debug, Deserialize)]
struct Question {
    content: Option<String>,
}
