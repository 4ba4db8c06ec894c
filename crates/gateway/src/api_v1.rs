//! HTTP API v1 — accounts and chats.
//!
//! Endpoints:
//!
//! - `POST /v1/auth/register`            — Create an account, get tokens
//! - `POST /v1/auth/login`               — Trade credentials for tokens
//! - `POST /v1/auth/refresh`             — Trade a refresh token for a fresh pair
//! - `POST /v1/chats`                    — Scrape a problem, open a chat
//! - `GET  /v1/chats`                    — List chats, newest first
//! - `GET  /v1/chats/count`              — Count chats
//! - `POST /v1/chats/{chat_id}/messages` — Send a message, get the reply
//! - `GET  /v1/chats/{chat_id}/messages` — Full turn history

use axum::{
    Router,
    extract::{Extension, Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::Json,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use hintforge_agent::{AssistLevel, PipelineInput, level_for_elapsed};
use hintforge_auth::{TokenKind, TokenPair, hash_password, verify_password};
use hintforge_core::chat::{Account, AccountId, Chat, ChatId, Turn};
use hintforge_core::event::DomainEvent;

use crate::SharedState;

/// Upper bound for the `limit` query parameter on chat listing.
const MAX_PAGE_LIMIT: u32 = 100;

/// The first message of every chat, asked on the user's behalf. It seeds the
/// opening explanation and is never stored as a turn.
const OPENING_MESSAGE: &str = "Explain me the problem";

// ── Routers ───────────────────────────────────────────────────────────────

/// Routes reachable without a token. Nest under `/v1`.
pub fn auth_router(state: SharedState) -> Router {
    Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/refresh", post(refresh_handler))
        .with_state(state)
}

/// Routes behind the bearer middleware. Nest under `/v1`.
pub fn chat_router(state: SharedState) -> Router {
    Router::new()
        .route("/chats", post(create_chat_handler).get(list_chats_handler))
        .route("/chats/count", get(count_chats_handler))
        .route(
            "/chats/{chat_id}/messages",
            post(post_message_handler).get(list_messages_handler),
        )
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Serialize, Deserialize)]
struct ErrorResponse {
    error: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn reject(status: StatusCode, message: impl Into<String>) -> ApiError {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

/// 500 with the error text in the body, logged here so handlers stay flat.
fn internal(err: impl std::fmt::Display) -> ApiError {
    tracing::error!(error = %err, "Request failed");
    reject(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
}

// ── Auth handlers ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct RegisterRequest {
    username: String,
    email: String,
    password: String,
}

async fn register_handler(
    State(state): State<SharedState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<TokenPair>), ApiError> {
    if payload.username.trim().is_empty()
        || payload.email.trim().is_empty()
        || payload.password.is_empty()
    {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            "Missing registration fields",
        ));
    }

    let existing = state
        .store
        .find_account_by_email(&payload.email)
        .await
        .map_err(internal)?;
    if existing.is_some() {
        return Err(reject(StatusCode::BAD_REQUEST, "User already exists"));
    }

    let hash = hash_password(&payload.password, state.bcrypt_cost).map_err(internal)?;
    let account = Account::new(payload.username, payload.email, hash);
    let account_id = state
        .store
        .create_account(account)
        .await
        .map_err(internal)?;

    let pair = state.signer.issue_pair(&account_id).map_err(internal)?;
    info!(account = %account_id, "Account registered");
    Ok((StatusCode::CREATED, Json(pair)))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: String,
    password: String,
}

async fn login_handler(
    State(state): State<SharedState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let account = state
        .store
        .find_account_by_email(&payload.email)
        .await
        .map_err(internal)?
        .ok_or_else(|| {
            reject(
                StatusCode::NOT_FOUND,
                "User does not exist or could not be found",
            )
        })?;

    let valid = verify_password(&payload.password, &account.password_hash).map_err(internal)?;
    if !valid {
        return Err(reject(StatusCode::UNAUTHORIZED, "Invalid password"));
    }

    let pair = state.signer.issue_pair(&account.id).map_err(internal)?;
    Ok(Json(pair))
}

async fn refresh_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
) -> Result<Json<TokenPair>, ApiError> {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| reject(StatusCode::UNAUTHORIZED, "Missing refresh token"))?;

    let claims = state
        .signer
        .verify(token, TokenKind::Refresh)
        .map_err(|_| reject(StatusCode::UNAUTHORIZED, "Invalid refresh token"))?;

    let pair = state
        .signer
        .issue_pair(&claims.account_id())
        .map_err(internal)?;
    Ok(Json(pair))
}

// ── Chat handlers ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
struct CreateChatRequest {
    problem_url: String,
    #[serde(default)]
    nickname: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct CreateChatResponse {
    chat_id: String,
}

async fn create_chat_handler(
    State(state): State<SharedState>,
    Extension(account): Extension<AccountId>,
    Json(payload): Json<CreateChatRequest>,
) -> Result<(StatusCode, Json<CreateChatResponse>), ApiError> {
    let statement = match state.source.fetch_statement(&payload.problem_url).await {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => return Err(reject(StatusCode::BAD_REQUEST, "Invalid problem URL")),
        Err(e) => {
            warn!(url = %payload.problem_url, error = %e, "Scrape failed");
            return Err(reject(StatusCode::BAD_REQUEST, "Invalid problem URL"));
        }
    };

    let nickname = payload
        .nickname
        .filter(|n| !n.trim().is_empty())
        .unwrap_or_else(|| payload.problem_url.clone());
    let chat = Chat::new(account.clone(), nickname, statement);

    // The opener runs before anything is stored; a failed pipeline leaves
    // no half-created chat behind.
    let outcome = state
        .pipeline
        .run(PipelineInput {
            problem: chat.problem_statement.clone(),
            summary: String::new(),
            turns: Vec::new(),
            level: AssistLevel::Intuition,
            incoming: OPENING_MESSAGE.to_string(),
        })
        .await
        .map_err(internal)?;

    let chat_id = chat.id.clone();
    let opener = Turn::assistant(chat_id.clone(), account, &outcome.reply);
    state.store.create_chat(chat).await.map_err(internal)?;
    state.store.append_turn(opener).await.map_err(internal)?;

    state.events.publish(DomainEvent::ChatCreated {
        chat_id: chat_id.0.clone(),
        timestamp: Utc::now(),
    });
    info!(chat = %chat_id, "Chat created");

    Ok((
        StatusCode::CREATED,
        Json(CreateChatResponse { chat_id: chat_id.0 }),
    ))
}

#[derive(Deserialize)]
struct PostMessageRequest {
    message: String,
}

#[derive(Serialize, Deserialize)]
struct MessageResponse {
    reply: String,
}

async fn post_message_handler(
    State(state): State<SharedState>,
    Extension(account): Extension<AccountId>,
    Path(chat_id): Path<String>,
    Json(payload): Json<PostMessageRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    if payload.message.trim().is_empty() {
        return Err(reject(StatusCode::BAD_REQUEST, "Message cannot be empty"));
    }

    let chat_id = ChatId::from(&chat_id);
    let chat = state
        .store
        .get_chat(&chat_id, &account)
        .await
        .map_err(internal)?
        .ok_or_else(|| reject(StatusCode::NOT_FOUND, "Chat not found"))?;

    let turns = state
        .store
        .list_turns(&chat_id, &account)
        .await
        .map_err(internal)?;
    if turns.is_empty() {
        return Err(reject(StatusCode::NOT_FOUND, "Chat history not found"));
    }

    // Help unlocks with time since the chat's first turn.
    let started_at = turns.first().map_or(chat.created_at, |t| t.created_at);
    let elapsed_minutes = (Utc::now() - started_at).num_seconds() as f64 / 60.0;
    let level = level_for_elapsed(elapsed_minutes);

    let outcome = state
        .pipeline
        .run(PipelineInput {
            problem: chat.problem_statement.clone(),
            summary: chat.summary.clone(),
            turns,
            level,
            incoming: payload.message.clone(),
        })
        .await
        .map_err(internal)?;

    // Persist only after a successful run: the user turn, a summary when one
    // was generated, then the reply.
    let user_turn = Turn::user(chat_id.clone(), account.clone(), &payload.message);
    state.store.append_turn(user_turn).await.map_err(internal)?;

    if let Some(summary) = &outcome.summary {
        let stored = state
            .store
            .update_summary(&chat_id, &account, summary, chat.summary_version)
            .await
            .map_err(internal)?;
        if !stored {
            warn!(chat = %chat_id, "Summary lost a concurrent update, keeping the newer one");
        }
    }

    let reply_turn = Turn::assistant(chat_id, account, &outcome.reply);
    state.store.append_turn(reply_turn).await.map_err(internal)?;

    Ok(Json(MessageResponse {
        reply: outcome.reply,
    }))
}

#[derive(Serialize, Deserialize)]
struct TurnDto {
    id: String,
    role: String,
    content: String,
    created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct MessageListResponse {
    messages: Vec<TurnDto>,
    count: usize,
}

async fn list_messages_handler(
    State(state): State<SharedState>,
    Extension(account): Extension<AccountId>,
    Path(chat_id): Path<String>,
) -> Result<Json<MessageListResponse>, ApiError> {
    let chat_id = ChatId::from(&chat_id);
    let turns = state
        .store
        .list_turns(&chat_id, &account)
        .await
        .map_err(internal)?;
    if turns.is_empty() {
        return Err(reject(StatusCode::NOT_FOUND, "Chat not found"));
    }

    let messages: Vec<TurnDto> = turns
        .into_iter()
        .map(|t| TurnDto {
            id: t.id.0,
            role: t.role.as_str().to_string(),
            content: t.content,
            created_at: t.created_at,
        })
        .collect();
    let count = messages.len();
    Ok(Json(MessageListResponse { messages, count }))
}

fn default_limit() -> u32 {
    25
}

#[derive(Deserialize)]
struct ListChatsQuery {
    #[serde(default)]
    skip: u32,
    #[serde(default = "default_limit")]
    limit: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatDto {
    chat_id: String,
    nickname: String,
    created_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize)]
struct ChatListResponse {
    chats: Vec<ChatDto>,
    count: usize,
}

async fn list_chats_handler(
    State(state): State<SharedState>,
    Extension(account): Extension<AccountId>,
    Query(query): Query<ListChatsQuery>,
) -> Result<Json<ChatListResponse>, ApiError> {
    if query.limit == 0 || query.limit > MAX_PAGE_LIMIT {
        return Err(reject(
            StatusCode::BAD_REQUEST,
            format!("limit must be between 1 and {MAX_PAGE_LIMIT}"),
        ));
    }

    let chats = state
        .store
        .list_chats(&account, query.skip, query.limit)
        .await
        .map_err(internal)?;

    let chats: Vec<ChatDto> = chats
        .into_iter()
        .map(|c| ChatDto {
            chat_id: c.id.0,
            nickname: c.nickname,
            created_at: c.created_at,
        })
        .collect();
    let count = chats.len();
    Ok(Json(ChatListResponse { chats, count }))
}

#[derive(Serialize, Deserialize)]
struct CountResponse {
    count: u64,
}

async fn count_chats_handler(
    State(state): State<SharedState>,
    Extension(account): Extension<AccountId>,
) -> Result<Json<CountResponse>, ApiError> {
    let count = state.store.count_chats(&account).await.map_err(internal)?;
    Ok(Json(CountResponse { count }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{AppState, build_router};
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use hintforge_agent::{ChatPipeline, ExecutionClient};
    use hintforge_auth::TokenSigner;
    use hintforge_core::error::{ProviderError, ScrapeError};
    use hintforge_core::event::EventBus;
    use hintforge_core::provider::{CompletionRequest, CompletionResponse, Provider};
    use hintforge_core::store::ChatStore;
    use hintforge_scraper::ProblemSource;
    use hintforge_storage::SqliteStore;

    const STATEMENT: &str = "Two Sum\nGiven an array of integers nums and an integer target.";

    /// Replays scripted completions; once exhausted, answers with a stock
    /// reply so multi-request tests don't have to count every call.
    struct ScriptedProvider {
        responses: Mutex<VecDeque<String>>,
    }

    impl ScriptedProvider {
        fn new(responses: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                responses: Mutex::new(responses.iter().map(|s| s.to_string()).collect()),
            })
        }
    }

    #[async_trait::async_trait]
    impl Provider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _request: CompletionRequest,
        ) -> Result<CompletionResponse, ProviderError> {
            let content = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| "A stock mentoring reply.".to_string());
            Ok(CompletionResponse {
                content,
                model: "scripted".into(),
                usage: None,
            })
        }
    }

    /// A problem source that never leaves the process.
    struct StaticSource {
        result: Result<String, ScrapeError>,
    }

    #[async_trait::async_trait]
    impl ProblemSource for StaticSource {
        fn name(&self) -> &str {
            "static"
        }

        async fn fetch_statement(&self, _problem_url: &str) -> Result<String, ScrapeError> {
            self.result.clone()
        }
    }

    struct Harness {
        app: Router,
        _runner: MockServer,
    }

    async fn harness_with(responses: &[&str], scrape: Result<String, ScrapeError>) -> Harness {
        let runner_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({ "output": "ok" })),
            )
            .mount(&runner_server)
            .await;
        let runner = ExecutionClient::new(format!("{}/execute", runner_server.uri())).unwrap();

        let events = Arc::new(EventBus::default());
        let pipeline = Arc::new(ChatPipeline::new(
            ScriptedProvider::new(responses),
            runner,
            events.clone(),
        ));
        let store: Arc<dyn ChatStore> = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());

        let state = Arc::new(AppState {
            store,
            pipeline,
            source: Arc::new(StaticSource { result: scrape }),
            signer: TokenSigner::new("test-secret", 30, 60),
            events,
            bcrypt_cost: 4,
        });

        Harness {
            app: build_router(state, &hintforge_config::ServerConfig::default()),
            _runner: runner_server,
        }
    }

    async fn harness(responses: &[&str]) -> Harness {
        harness_with(responses, Ok(STATEMENT.to_string())).await
    }

    fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    fn get_with(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn register(app: &Router, email: &str) -> TokenPair {
        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/auth/register",
                None,
                serde_json::json!({
                    "username": "alice",
                    "email": email,
                    "password": "hunter2",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        json_body(response).await
    }

    async fn create_chat(app: &Router, token: &str, url: &str) -> String {
        let response = app
            .clone()
            .oneshot(post_json(
                "/v1/chats",
                Some(token),
                serde_json::json!({ "problem_url": url }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let created: CreateChatResponse = json_body(response).await;
        created.chat_id
    }

    // ── Health ─────────────────────────────────────────────────────────

    #[tokio::test]
    async fn health_is_open() {
        let h = harness(&[]).await;

        let response = h.app.oneshot(get_with("/health", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body: serde_json::Value = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert!(body["version"].is_string());
    }

    // ── Auth ───────────────────────────────────────────────────────────

    #[tokio::test]
    async fn register_then_login() {
        let h = harness(&[]).await;
        register(&h.app, "alice@example.com").await;

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/v1/auth/login",
                None,
                serde_json::json!({ "email": "alice@example.com", "password": "hunter2" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let pair: TokenPair = json_body(response).await;
        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let h = harness(&[]).await;
        register(&h.app, "alice@example.com").await;

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/v1/auth/register",
                None,
                serde_json::json!({
                    "username": "also-alice",
                    "email": "alice@example.com",
                    "password": "other",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = json_body(response).await;
        assert_eq!(body.error, "User already exists");
    }

    #[tokio::test]
    async fn login_unknown_email_is_not_found() {
        let h = harness(&[]).await;

        let response = h
            .app
            .oneshot(post_json(
                "/v1/auth/login",
                None,
                serde_json::json!({ "email": "nobody@example.com", "password": "x" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: ErrorResponse = json_body(response).await;
        assert_eq!(body.error, "User does not exist or could not be found");
    }

    #[tokio::test]
    async fn login_wrong_password_is_unauthorized() {
        let h = harness(&[]).await;
        register(&h.app, "alice@example.com").await;

        let response = h
            .app
            .oneshot(post_json(
                "/v1/auth/login",
                None,
                serde_json::json!({ "email": "alice@example.com", "password": "wrong" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let body: ErrorResponse = json_body(response).await;
        assert_eq!(body.error, "Invalid password");
    }

    #[tokio::test]
    async fn refresh_token_mints_a_fresh_pair() {
        let h = harness(&[]).await;
        let pair = register(&h.app, "alice@example.com").await;

        let response = h
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/auth/refresh")
                    .header("authorization", format!("Bearer {}", pair.refresh_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let fresh: TokenPair = json_body(response).await;
        assert!(!fresh.access_token.is_empty());

        // An access token must not pass as a refresh token.
        let response = h
            .app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri("/v1/auth/refresh")
                    .header("authorization", format!("Bearer {}", pair.access_token))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn chat_routes_require_a_token() {
        let h = harness(&[]).await;

        let response = h
            .app
            .clone()
            .oneshot(get_with("/v1/chats", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = h
            .app
            .oneshot(get_with("/v1/chats", Some("not-a-real-token")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    // ── Chats ──────────────────────────────────────────────────────────

    #[tokio::test]
    async fn create_chat_stores_the_opening_explanation() {
        let h = harness(&["The problem asks for two indices summing to target."]).await;
        let pair = register(&h.app, "alice@example.com").await;

        let chat_id = create_chat(
            &h.app,
            &pair.access_token,
            "https://leetcode.com/problems/two-sum/",
        )
        .await;

        let response = h
            .app
            .clone()
            .oneshot(get_with(
                &format!("/v1/chats/{chat_id}/messages"),
                Some(&pair.access_token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let list: MessageListResponse = json_body(response).await;
        assert_eq!(list.count, 1);
        assert_eq!(list.messages[0].role, "assistant");
        assert_eq!(
            list.messages[0].content,
            "The problem asks for two indices summing to target."
        );

        // Nickname falls back to the URL.
        let response = h
            .app
            .oneshot(get_with("/v1/chats", Some(&pair.access_token)))
            .await
            .unwrap();
        let chats: ChatListResponse = json_body(response).await;
        assert_eq!(chats.count, 1);
        assert_eq!(chats.chats[0].nickname, "https://leetcode.com/problems/two-sum/");
    }

    #[tokio::test]
    async fn chat_nickname_is_kept_when_given() {
        let h = harness(&[]).await;
        let pair = register(&h.app, "alice@example.com").await;

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                "/v1/chats",
                Some(&pair.access_token),
                serde_json::json!({
                    "problem_url": "https://leetcode.com/problems/two-sum/",
                    "nickname": "two sum practice",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = h
            .app
            .oneshot(get_with("/v1/chats", Some(&pair.access_token)))
            .await
            .unwrap();
        let chats: ChatListResponse = json_body(response).await;
        assert_eq!(chats.chats[0].nickname, "two sum practice");
    }

    #[tokio::test]
    async fn failed_scrape_is_a_bad_url() {
        let h = harness_with(&[], Err(ScrapeError::InvalidUrl("https://".into()))).await;
        let pair = register(&h.app, "alice@example.com").await;

        let response = h
            .app
            .oneshot(post_json(
                "/v1/chats",
                Some(&pair.access_token),
                serde_json::json!({ "problem_url": "https://" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body: ErrorResponse = json_body(response).await;
        assert_eq!(body.error, "Invalid problem URL");
    }

    #[tokio::test]
    async fn empty_statement_is_a_bad_url() {
        let h = harness_with(&[], Ok("   ".to_string())).await;
        let pair = register(&h.app, "alice@example.com").await;

        let response = h
            .app
            .oneshot(post_json(
                "/v1/chats",
                Some(&pair.access_token),
                serde_json::json!({ "problem_url": "https://leetcode.com/problems/two-sum/" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    // ── Messages ───────────────────────────────────────────────────────

    #[tokio::test]
    async fn message_round_trip_persists_both_turns() {
        let h = harness(&[
            "Here's what the problem asks.",
            "Think about a hash map of complements.",
        ])
        .await;
        let pair = register(&h.app, "alice@example.com").await;
        let chat_id = create_chat(
            &h.app,
            &pair.access_token,
            "https://leetcode.com/problems/two-sum/",
        )
        .await;

        let response = h
            .app
            .clone()
            .oneshot(post_json(
                &format!("/v1/chats/{chat_id}/messages"),
                Some(&pair.access_token),
                serde_json::json!({ "message": "Where do I even start?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let reply: MessageResponse = json_body(response).await;
        assert_eq!(reply.reply, "Think about a hash map of complements.");

        let response = h
            .app
            .oneshot(get_with(
                &format!("/v1/chats/{chat_id}/messages"),
                Some(&pair.access_token),
            ))
            .await
            .unwrap();
        let list: MessageListResponse = json_body(response).await;
        assert_eq!(list.count, 3);
        assert_eq!(list.messages[0].role, "assistant");
        assert_eq!(list.messages[1].role, "user");
        assert_eq!(list.messages[1].content, "Where do I even start?");
        assert_eq!(list.messages[2].role, "assistant");
        assert_eq!(list.messages[2].content, "Think about a hash map of complements.");
    }

    #[tokio::test]
    async fn old_chat_unlocks_the_verified_code_path() {
        // Draft, extraction, passing verdict, rewrite — the level-2 flow.
        let responses = [
            "Here's a working approach:\n\ndef solve():\n    return 1",
            r#"{"extracted_code_language": "Python", "extracted_code": "def solve():\n    return 1", "validation_code": "assert solve() == 1"}"#,
            r#"{"passed": true, "advice": ""}"#,
            r#"{"extracted_code_explanation": "Walk the array once with a map.", "extracted_code": "def solve():\n    return 1"}"#,
        ];

        let runner_server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "output": "all tests passed" })),
            )
            .mount(&runner_server)
            .await;
        let runner = ExecutionClient::new(format!("{}/execute", runner_server.uri())).unwrap();

        let events = Arc::new(EventBus::default());
        let pipeline = Arc::new(ChatPipeline::new(
            ScriptedProvider::new(&responses),
            runner,
            events.clone(),
        ));
        let store = Arc::new(SqliteStore::new("sqlite::memory:").await.unwrap());

        let state = Arc::new(AppState {
            store: store.clone(),
            pipeline,
            source: Arc::new(StaticSource {
                result: Ok(STATEMENT.to_string()),
            }),
            signer: TokenSigner::new("test-secret", 30, 60),
            events,
            bcrypt_cost: 4,
        });
        let app = build_router(state, &hintforge_config::ServerConfig::default());

        // Seed a chat whose first turn is 35 minutes old.
        let pair = register(&app, "alice@example.com").await;
        let claims = TokenSigner::new("test-secret", 30, 60)
            .verify(&pair.access_token, TokenKind::Access)
            .unwrap();
        let account = claims.account_id();
        let chat = Chat::new(account.clone(), "two-sum", STATEMENT);
        let chat_id = store.create_chat(chat).await.unwrap();
        let mut opener = Turn::assistant(chat_id.clone(), account, "The problem asks...");
        opener.created_at = Utc::now() - chrono::Duration::minutes(35);
        store.append_turn(opener).await.unwrap();

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/v1/chats/{chat_id}/messages"),
                Some(&pair.access_token),
                serde_json::json!({ "message": "Just give me the code." }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        // The stored reply is the rewritten message, not the draft.
        let reply: MessageResponse = json_body(response).await;
        assert!(reply.reply.starts_with("```python\n"));
        assert!(reply.reply.ends_with("Walk the array once with a map."));

        let response = app
            .oneshot(get_with(
                &format!("/v1/chats/{chat_id}/messages"),
                Some(&pair.access_token),
            ))
            .await
            .unwrap();
        let list: MessageListResponse = json_body(response).await;
        let last = list.messages.last().unwrap();
        assert_eq!(last.role, "assistant");
        assert_eq!(last.content, reply.reply);
        assert!(!last.content.contains("Here's a working approach"));
    }

    #[tokio::test]
    async fn message_to_missing_chat_is_not_found() {
        let h = harness(&[]).await;
        let pair = register(&h.app, "alice@example.com").await;

        let response = h
            .app
            .oneshot(post_json(
                "/v1/chats/no-such-chat/messages",
                Some(&pair.access_token),
                serde_json::json!({ "message": "hello?" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: ErrorResponse = json_body(response).await;
        assert_eq!(body.error, "Chat not found");
    }

    #[tokio::test]
    async fn blank_message_is_rejected() {
        let h = harness(&[]).await;
        let pair = register(&h.app, "alice@example.com").await;
        let chat_id = create_chat(
            &h.app,
            &pair.access_token,
            "https://leetcode.com/problems/two-sum/",
        )
        .await;

        let response = h
            .app
            .oneshot(post_json(
                &format!("/v1/chats/{chat_id}/messages"),
                Some(&pair.access_token),
                serde_json::json!({ "message": "   " }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_of_missing_chat_is_not_found() {
        let h = harness(&[]).await;
        let pair = register(&h.app, "alice@example.com").await;

        let response = h
            .app
            .oneshot(get_with(
                "/v1/chats/no-such-chat/messages",
                Some(&pair.access_token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body: ErrorResponse = json_body(response).await;
        assert_eq!(body.error, "Chat not found");
    }

    // ── Listing ────────────────────────────────────────────────────────

    #[tokio::test]
    async fn chats_are_scoped_to_their_owner() {
        let h = harness(&[]).await;
        let alice = register(&h.app, "alice@example.com").await;
        let bob = register(&h.app, "bob@example.com").await;

        let chat_id = create_chat(
            &h.app,
            &alice.access_token,
            "https://leetcode.com/problems/two-sum/",
        )
        .await;

        let response = h
            .app
            .clone()
            .oneshot(get_with(
                &format!("/v1/chats/{chat_id}/messages"),
                Some(&bob.access_token),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = h
            .app
            .oneshot(get_with("/v1/chats/count", Some(&bob.access_token)))
            .await
            .unwrap();
        let count: CountResponse = json_body(response).await;
        assert_eq!(count.count, 0);
    }

    #[tokio::test]
    async fn chat_count_tracks_creation() {
        let h = harness(&[]).await;
        let pair = register(&h.app, "alice@example.com").await;

        for slug in ["two-sum", "three-sum"] {
            create_chat(
                &h.app,
                &pair.access_token,
                &format!("https://leetcode.com/problems/{slug}/"),
            )
            .await;
        }

        let response = h
            .app
            .oneshot(get_with("/v1/chats/count", Some(&pair.access_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let count: CountResponse = json_body(response).await;
        assert_eq!(count.count, 2);
    }

    #[tokio::test]
    async fn page_limit_is_bounded() {
        let h = harness(&[]).await;
        let pair = register(&h.app, "alice@example.com").await;

        for uri in ["/v1/chats?limit=0", "/v1/chats?limit=101"] {
            let response = h
                .app
                .clone()
                .oneshot(get_with(uri, Some(&pair.access_token)))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        }

        let response = h
            .app
            .oneshot(get_with("/v1/chats?skip=0&limit=100", Some(&pair.access_token)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
