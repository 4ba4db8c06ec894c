//! Wire shapes of the structured pipeline stages.
//!
//! The extraction, judge, and rewrite stages run in JSON mode; their outputs
//! are decoded into these structs. Models occasionally wrap the object in a
//! markdown fence anyway, so decoding strips one before parsing.

use hintforge_core::error::AgentError;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::runner::SUPPORTED_LANGUAGES;

/// Raw output of the extraction stage.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeExtraction {
    #[serde(default)]
    pub extracted_code_language: String,
    #[serde(default)]
    pub extracted_code: String,
    #[serde(default)]
    pub validation_code: String,
}

/// Output of the judge stage.
#[derive(Debug, Clone, Deserialize)]
pub struct Verdict {
    pub passed: bool,
    #[serde(default)]
    pub advice: String,
}

/// Output of the rewrite stage.
#[derive(Debug, Clone, Deserialize)]
pub struct RewriteOutput {
    #[serde(default)]
    pub extracted_code_explanation: String,
    #[serde(default)]
    pub extracted_code: String,
}

/// An extraction that survived the gate. Language is lowercased.
#[derive(Debug, Clone)]
pub struct ExtractedCode {
    pub language: String,
    pub solution: String,
    pub validation: String,
}

impl ExtractedCode {
    /// Gate a raw extraction: the language tag must be one the runner
    /// supports and the solution must be non-empty. Anything else means the
    /// draft had no runnable code.
    pub fn accept(raw: CodeExtraction) -> Option<Self> {
        let language = raw.extracted_code_language.trim().to_lowercase();
        if raw.extracted_code.trim().is_empty() {
            return None;
        }
        if !SUPPORTED_LANGUAGES.contains(&language.as_str()) {
            return None;
        }
        Some(Self {
            language,
            solution: raw.extracted_code,
            validation: raw.validation_code,
        })
    }

    /// The combined program sent to the runner: solution, a blank gap, then
    /// the validation code.
    pub fn program(&self) -> String {
        format!("{}\n\n\n{}", self.solution, self.validation)
    }
}

/// Decode one structured stage output.
pub fn decode_stage<T: DeserializeOwned>(stage: &'static str, raw: &str) -> Result<T, AgentError> {
    let body = strip_fence(raw);
    serde_json::from_str(body).map_err(|e| AgentError::MalformedOutput {
        stage,
        message: e.to_string(),
    })
}

/// Strip one surrounding markdown code fence, if present.
fn strip_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(inner) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let inner = inner.strip_prefix("json").unwrap_or(inner);
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    inner.trim()
}
