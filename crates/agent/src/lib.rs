//! The mentoring pipeline — the heart of HintForge.
//!
//! One user message flows through up to five model stages:
//!
//! 1. **Summarize** (when the history has grown past the threshold):
//!    condense older turns into a rolling summary
//! 2. **Generate**: draft a reply at the chat's assistance level
//! 3. **Extract** (full-solution level only): pull solution and validation
//!    code out of the draft
//! 4. **Execute + Judge**: run the combined program and let the judge model
//!    compare its output against the code; on failure, feed the advice back
//!    and regenerate, up to a bounded number of rounds
//! 5. **Rewrite**: once verified, restate the reply around the working code
//!
//! Levels below full-solution stop after step 2.

pub mod level;
pub mod pipeline;
pub mod prompts;
pub mod runner;
pub mod schema;

pub use level::{AssistLevel, level_for_elapsed};
pub use pipeline::{ChatPipeline, PipelineInput, PipelineOutcome, PipelineSettings, Resolution};
pub use runner::{ExecutionClient, ExecutionResult, SUPPORTED_LANGUAGES};
pub use schema::{CodeExtraction, ExtractedCode, RewriteOutput, Verdict};
