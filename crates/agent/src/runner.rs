//! Bridge to the code execution service.
//!
//! The runner is a separate process exposing one endpoint: POST a
//! `{ code, language }` body, get `{ "output": <stdout> }` on success. On
//! failure it answers with a non-200 status and an error body; that body is
//! carried forward verbatim so the judge can reason about what went wrong.
//! Only transport failures (the runner being unreachable) are hard errors.

use std::time::Duration;

use hintforge_core::error::AgentError;
use serde::Deserialize;
use tracing::debug;

/// Languages the execution service can run.
pub const SUPPORTED_LANGUAGES: [&str; 4] = ["python", "c", "c++", "java"];

/// What a run produced.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    /// Program output on success, otherwise the runner's error body
    pub output: String,
    /// Whether the runner reported success (HTTP 200)
    pub ok: bool,
}

/// HTTP client for the execution service.
pub struct ExecutionClient {
    execute_url: String,
    client: reqwest::Client,
}

impl ExecutionClient {
    /// Create a client against `execute_url`.
    pub fn new(execute_url: impl Into<String>) -> Result<Self, AgentError> {
        Self::with_timeout(execute_url, Duration::from_secs(120))
    }

    /// Create a client with an explicit request timeout.
    pub fn with_timeout(
        execute_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, AgentError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AgentError::Execution(format!("HTTP client: {e}")))?;

        Ok(Self {
            execute_url: execute_url.into(),
            client,
        })
    }

    /// Run `code` as `language` and return whatever the runner printed.
    pub async fn execute(&self, code: &str, language: &str) -> Result<ExecutionResult, AgentError> {
        debug!(language = %language, bytes = code.len(), "Submitting code for execution");

        let response = self
            .client
            .post(&self.execute_url)
            .json(&serde_json::json!({ "code": code, "language": language }))
            .send()
            .await
            .map_err(|e| AgentError::Execution(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::Execution(e.to_string()))?;

        if status.is_success() {
            let parsed: RunnerResponse = serde_json::from_str(&body)
                .map_err(|e| AgentError::Execution(format!("Malformed runner response: {e}")))?;
            Ok(ExecutionResult {
                output: parsed.output,
                ok: true,
            })
        } else {
            // Compile errors, tracebacks, unsupported languages: the body is
            // the most useful thing the judge can see.
            Ok(ExecutionResult { output: body, ok: false })
        }
    }
}

#[derive(Debug, Deserialize)]
struct RunnerResponse {
    #[serde(default)]
    output: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn successful_run_returns_output() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/execute"))
            .and(body_partial_json(serde_json::json!({
                "code": "print(2 + 2)",
                "language": "python",
            })))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "output": "4" })),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ExecutionClient::new(format!("{}/execute", server.uri())).unwrap();
        let result = client.execute("print(2 + 2)", "python").await.unwrap();

        assert!(result.ok);
        assert_eq!(result.output, "4");
    }

    #[tokio::test]
    async fn error_body_is_carried_as_output() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500)
                    .set_body_string("\"Traceback (most recent call last): ...\""),
            )
            .mount(&server)
            .await;

        let client = ExecutionClient::new(format!("{}/execute", server.uri())).unwrap();
        let result = client.execute("1/0", "python").await.unwrap();

        assert!(!result.ok);
        assert!(result.output.contains("Traceback"));
    }

    #[tokio::test]
    async fn unsupported_language_body_is_carried() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(400)
                    .set_body_json(serde_json::json!({ "error": "Unsupported language" })),
            )
            .mount(&server)
            .await;

        let client = ExecutionClient::new(format!("{}/execute", server.uri())).unwrap();
        let result = client.execute("puts 42", "ruby").await.unwrap();

        assert!(!result.ok);
        assert!(result.output.contains("Unsupported language"));
    }

    #[tokio::test]
    async fn unreachable_runner_is_a_hard_error() {
        // Nothing listens on this port.
        let client = ExecutionClient::new("http://127.0.0.1:9/execute").unwrap();
        let result = client.execute("print(1)", "python").await;

        assert!(matches!(result, Err(AgentError::Execution(_))));
    }

    #[test]
    fn supported_languages_match_the_runner() {
        assert!(SUPPORTED_LANGUAGES.contains(&"python"));
        assert!(SUPPORTED_LANGUAGES.contains(&"c++"));
        assert!(!SUPPORTED_LANGUAGES.contains(&"rust"));
    }
}
