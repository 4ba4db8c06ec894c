//! The staged mentoring pipeline.
//!
//! One call to [`ChatPipeline::run`] answers one user message. Below the
//! full-solution level that is a single generation; at full-solution level
//! the draft is mined for code, the code is executed, and a judge model
//! decides whether the reply may go out as-is, must be regenerated with
//! corrective feedback, or has to be handed back as advice.

use std::sync::Arc;

use chrono::Utc;
use hintforge_core::chat::{Role, Turn};
use hintforge_core::error::{AgentError, Error};
use hintforge_core::event::{DomainEvent, EventBus};
use hintforge_core::provider::{CompletionRequest, PromptMessage, Provider, ResponseFormat};
use tracing::{debug, info, warn};

use crate::level::AssistLevel;
use crate::prompts;
use crate::runner::ExecutionClient;
use crate::schema::{self, CodeExtraction, ExtractedCode, RewriteOutput, Verdict};

/// Tunables for the pipeline stages.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Model for generation, extraction, judging, and rewriting
    pub chat_model: String,

    /// Model for the history summarizer
    pub summary_model: String,

    pub chat_temperature: f32,
    pub judge_temperature: f32,
    pub rewrite_temperature: f32,
    pub summary_temperature: f32,

    /// Fixed sampling seed, so equal histories summarize equally
    pub summary_seed: u64,

    /// Summarize once the non-system turn count exceeds this
    pub history_threshold: usize,

    /// Judge rounds before the pipeline gives up
    pub max_judge_rounds: u32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            chat_model: "meta-llama/llama-4-scout-17b-16e-instruct".into(),
            summary_model: "qwen-qwq-32b".into(),
            chat_temperature: 0.3,
            judge_temperature: 0.3,
            rewrite_temperature: 0.8,
            summary_temperature: 0.4,
            summary_seed: 432,
            history_threshold: 10,
            max_judge_rounds: 2,
        }
    }
}

/// One request's worth of context.
#[derive(Debug, Clone)]
pub struct PipelineInput {
    /// Plain-text problem statement
    pub problem: String,

    /// Stored rolling summary; empty when none exists yet
    pub summary: String,

    /// Stored history, oldest first
    pub turns: Vec<Turn>,

    /// Assistance level in effect for this request
    pub level: AssistLevel,

    /// The user message being answered
    pub incoming: String,
}

/// How the pipeline settled on its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// Below full-solution level; the draft is the reply
    Direct,

    /// Full-solution level, but the draft carried no runnable code
    NoCode,

    /// A run passed judgment and the reply was rewritten around its code
    Verified { rounds: u32 },

    /// Every round failed; the reply hands back the last advice instead
    GaveUp { rounds: u32 },
}

impl Resolution {
    /// Stable label for logs and events.
    pub fn label(&self) -> &'static str {
        match self {
            Resolution::Direct => "direct",
            Resolution::NoCode => "no_code",
            Resolution::Verified { .. } => "verified",
            Resolution::GaveUp { .. } => "gave_up",
        }
    }
}

/// What one pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    /// The reply to store and send back
    pub reply: String,

    /// A fresh rolling summary, when this request crossed the threshold
    pub summary: Option<String>,

    pub resolution: Resolution,
}

/// Drives one user message through the staged mentoring flow.
pub struct ChatPipeline {
    provider: Arc<dyn Provider>,
    runner: ExecutionClient,
    events: Arc<EventBus>,
    settings: PipelineSettings,
}

impl ChatPipeline {
    /// Create a pipeline with default settings.
    pub fn new(
        provider: Arc<dyn Provider>,
        runner: ExecutionClient,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            provider,
            runner,
            events,
            settings: PipelineSettings::default(),
        }
    }

    /// Replace the stage settings.
    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Answer `input.incoming` within the chat's context.
    pub async fn run(&self, input: PipelineInput) -> Result<PipelineOutcome, Error> {
        if input.incoming.trim().is_empty() {
            return Err(AgentError::EmptyHistory.into());
        }

        let mut history: Vec<(Role, String)> = input
            .turns
            .iter()
            .filter(|t| t.role != Role::System)
            .map(|t| (t.role, t.content.clone()))
            .collect();
        history.push((Role::User, input.incoming.clone()));

        // The summarize decision is made once, at entry. Corrective turns
        // appended later in this request never re-trigger it.
        let new_summary = if history.len() > self.settings.history_threshold {
            Some(self.summarize(&history).await?)
        } else {
            None
        };
        let summary = new_summary.clone().unwrap_or_else(|| input.summary.clone());

        let mut draft = self
            .generate(&input.problem, &summary, &history, input.level)
            .await?;
        history.push((Role::Assistant, draft.clone()));

        if input.level != AssistLevel::FullSolution {
            return Ok(self.finish(draft, new_summary, Resolution::Direct));
        }

        let mut rounds: u32 = 0;
        loop {
            let Some(code) = self.extract(&draft).await? else {
                return Ok(self.finish(draft, new_summary, Resolution::NoCode));
            };

            let program = code.program();
            let run = self.runner.execute(&program, &code.language).await?;
            self.events.publish(DomainEvent::CodeExecuted {
                language: code.language.clone(),
                succeeded: run.ok,
                timestamp: Utc::now(),
            });

            let verdict = self.judge(&program, &run.output).await?;
            rounds += 1;
            self.events.publish(DomainEvent::VerdictReached {
                passed: verdict.passed,
                round: rounds,
                timestamp: Utc::now(),
            });

            if verdict.passed {
                info!(rounds, "Run passed judgment, rewriting the reply");
                let reply = self.rewrite(&draft, &code).await?;
                return Ok(self.finish(reply, new_summary, Resolution::Verified { rounds }));
            }

            if rounds >= self.settings.max_judge_rounds {
                warn!(rounds, "Verification rounds exhausted, handing back advice");
                let reply = prompts::give_up_reply(&verdict.advice);
                return Ok(self.finish(reply, new_summary, Resolution::GaveUp { rounds }));
            }

            debug!(round = rounds, "Run failed judgment, feeding the advice back");
            history.push((
                Role::User,
                prompts::corrective_turn(&run.output, &verdict.advice),
            ));
            draft = self
                .generate(&input.problem, &summary, &history, input.level)
                .await?;
            history.push((Role::Assistant, draft.clone()));
        }
    }

    fn finish(
        &self,
        reply: String,
        summary: Option<String>,
        resolution: Resolution,
    ) -> PipelineOutcome {
        self.events.publish(DomainEvent::ReplyFinalized {
            resolution: resolution.label().to_string(),
            timestamp: Utc::now(),
        });
        PipelineOutcome {
            reply,
            summary,
            resolution,
        }
    }

    /// Condense the working history into a fresh rolling summary.
    async fn summarize(&self, history: &[(Role, String)]) -> Result<String, Error> {
        let formatted = format_history_lines(history);
        let request = CompletionRequest {
            model: self.settings.summary_model.clone(),
            messages: vec![
                PromptMessage::system(prompts::SUMMARIZER_PROMPT),
                PromptMessage::user(format!("Summarize the following:\n{formatted}")),
            ],
            temperature: self.settings.summary_temperature,
            max_tokens: None,
            seed: Some(self.settings.summary_seed),
            response_format: ResponseFormat::Text,
        };

        let response = self.provider.complete(request).await?;
        self.events.publish(DomainEvent::SummaryGenerated {
            turns_condensed: history.len(),
            timestamp: Utc::now(),
        });
        debug!(turns = history.len(), "Condensed history into a summary");

        Ok(format!("{}{}", prompts::SUMMARY_PREFIX, response.content))
    }

    /// Draft a reply at `level`.
    async fn generate(
        &self,
        problem: &str,
        summary: &str,
        history: &[(Role, String)],
        level: AssistLevel,
    ) -> Result<String, Error> {
        let system = compose_system_prompt(level, problem, summary, history);
        let latest = history
            .iter()
            .rev()
            .find(|(role, _)| *role == Role::User)
            .map(|(_, content)| content.clone())
            .ok_or(AgentError::EmptyHistory)?;

        let request = CompletionRequest {
            model: self.settings.chat_model.clone(),
            messages: vec![PromptMessage::system(system), PromptMessage::user(latest)],
            temperature: self.settings.chat_temperature,
            max_tokens: None,
            seed: None,
            response_format: ResponseFormat::Text,
        };

        let response = self.provider.complete(request).await?;
        self.events.publish(DomainEvent::ReplyDrafted {
            level: level.as_u8(),
            model: self.settings.chat_model.clone(),
            timestamp: Utc::now(),
        });

        Ok(response.content)
    }

    /// Pull code out of the draft; `None` when the gate rejects it.
    async fn extract(&self, draft: &str) -> Result<Option<ExtractedCode>, Error> {
        let request = CompletionRequest {
            model: self.settings.chat_model.clone(),
            messages: vec![
                PromptMessage::system(prompts::EXTRACTION_PROMPT),
                PromptMessage::user(draft.to_string()),
            ],
            temperature: self.settings.chat_temperature,
            max_tokens: None,
            seed: None,
            response_format: ResponseFormat::JsonObject,
        };

        let response = self.provider.complete(request).await?;
        let raw: CodeExtraction = schema::decode_stage("extract", &response.content)?;
        Ok(ExtractedCode::accept(raw))
    }

    /// Compare a run's output against its program.
    async fn judge(&self, program: &str, output: &str) -> Result<Verdict, Error> {
        let request = CompletionRequest {
            model: self.settings.chat_model.clone(),
            messages: vec![
                PromptMessage::system(prompts::JUDGE_PROMPT),
                PromptMessage::user(format!("Code:\n{program}\nOutput:\n{output}")),
            ],
            temperature: self.settings.judge_temperature,
            max_tokens: None,
            seed: None,
            response_format: ResponseFormat::JsonObject,
        };

        let response = self.provider.complete(request).await?;
        Ok(schema::decode_stage("judge", &response.content)?)
    }

    /// Restate the draft around its verified code, fenced and explained.
    async fn rewrite(&self, draft: &str, code: &ExtractedCode) -> Result<String, Error> {
        let request = CompletionRequest {
            model: self.settings.chat_model.clone(),
            messages: vec![
                PromptMessage::system(prompts::REWRITE_PROMPT),
                PromptMessage::user(format!(
                    "Original:\n{draft}\n\nVerified code:\n\n{}",
                    code.solution
                )),
            ],
            temperature: self.settings.rewrite_temperature,
            max_tokens: None,
            seed: None,
            response_format: ResponseFormat::JsonObject,
        };

        let response = self.provider.complete(request).await?;
        let rewritten: RewriteOutput = schema::decode_stage("rewrite", &response.content)?;

        Ok(prompts::fenced_reply(
            &code.language,
            &rewritten.extracted_code,
            &rewritten.extracted_code_explanation,
        ))
    }
}

/// Level prompt and problem always; then the summary when one exists,
/// otherwise the formatted history.
fn compose_system_prompt(
    level: AssistLevel,
    problem: &str,
    summary: &str,
    history: &[(Role, String)],
) -> String {
    let mut prompt = format!("{}\n\nProblem:\n{}", level.system_prompt(), problem.trim());
    if !summary.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(summary);
    } else {
        let lines = format_history_lines(history);
        if !lines.is_empty() {
            prompt.push_str("\n\nThe below is the chat history:\n");
            prompt.push_str(&lines);
        }
    }
    prompt
}

/// `User:` / `Assistant:` lines, one turn per line, system turns skipped.
fn format_history_lines(history: &[(Role, String)]) -> String {
    let mut lines = String::new();
    for (role, content) in history {
        match role {
            Role::User => lines.push_str("User: "),
            Role::Assistant => lines.push_str("Assistant: "),
            Role::System => continue,
        }
        lines.push_str(content);
        lines.push('\n');
    }
    lines
}
