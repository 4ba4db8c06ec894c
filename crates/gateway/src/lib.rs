//! HTTP API gateway for HintForge.
//!
//! Exposes the REST surface: registration, login, and token refresh under
//! `/v1/auth`, chats and messages under `/v1/chats` behind bearer auth,
//! and an unauthenticated `/health`.
//!
//! Built on Axum.

pub mod api_v1;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::Json,
    routing::get,
};
use serde::Serialize;
use tokio::sync::broadcast;
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use hintforge_agent::{ChatPipeline, ExecutionClient, PipelineSettings};
use hintforge_auth::{TokenKind, TokenSigner};
use hintforge_core::event::{DomainEvent, EventBus};
use hintforge_core::store::ChatStore;
use hintforge_providers::OpenAiCompatProvider;
use hintforge_scraper::{LeetCodeScraper, ProblemSource};
use hintforge_storage::SqliteStore;

/// Shared application state for the gateway.
pub struct AppState {
    pub store: Arc<dyn ChatStore>,
    pub pipeline: Arc<ChatPipeline>,
    pub source: Arc<dyn ProblemSource>,
    pub signer: TokenSigner,
    pub events: Arc<EventBus>,
    pub bcrypt_cost: u32,
}

pub type SharedState = Arc<AppState>;

/// Build the full router: open auth + health routes, bearer-guarded chat
/// routes, body limit, CORS, and trace logging.
pub fn build_router(state: SharedState, server: &hintforge_config::ServerConfig) -> Router {
    let protected = api_v1::chat_router(state.clone())
        .layer(middleware::from_fn_with_state(state.clone(), bearer_auth));
    let open = api_v1::auth_router(state);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/v1", open.merge(protected))
        .layer(DefaultBodyLimit::max(server.max_body_bytes))
        .layer(cors_layer(&server.cors_origins))
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// CORS for the configured origins; an empty list opens it up.
fn cors_layer(origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if origins.is_empty() {
        return cors.allow_origin(tower_http::cors::Any);
    }

    let exact: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Skipping unparseable CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(exact)
}

/// Resolve `Authorization: Bearer <access token>` to an account id.
///
/// The id lands in the request extensions for the handlers. Anything short
/// of a valid access token is a bare 401; refresh tokens do not pass.
async fn bearer_auth(
    State(state): State<SharedState>,
    mut req: axum::extract::Request,
    next: Next,
) -> Result<axum::response::Response, StatusCode> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    match state.signer.verify(token, TokenKind::Access) {
        Ok(claims) => {
            req.extensions_mut().insert(claims.account_id());
            Ok(next.run(req).await)
        }
        Err(_) => {
            warn!("Rejected bearer token on a protected route");
            Err(StatusCode::UNAUTHORIZED)
        }
    }
}

/// Start the gateway HTTP server.
pub async fn start(config: hintforge_config::AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);

    let api_key = config
        .llm
        .api_key
        .clone()
        .ok_or("No LLM API key configured — set GROQ_API_KEY")?;
    let token_secret = config
        .auth
        .token_secret
        .clone()
        .ok_or("No token secret configured — set HINTFORGE_TOKEN_SECRET")?;

    let provider = Arc::new(OpenAiCompatProvider::with_timeout(
        "groq",
        &config.llm.api_url,
        api_key,
        std::time::Duration::from_secs(config.llm.timeout_secs),
    )?);
    let runner = ExecutionClient::with_timeout(
        &config.runner.execute_url,
        std::time::Duration::from_secs(config.runner.timeout_secs),
    )?;

    let events = Arc::new(EventBus::default());
    let pipeline = Arc::new(
        ChatPipeline::new(provider, runner, events.clone()).with_settings(PipelineSettings {
            chat_model: config.llm.chat_model.clone(),
            summary_model: config.llm.summary_model.clone(),
            chat_temperature: config.llm.chat_temperature,
            judge_temperature: config.llm.judge_temperature,
            rewrite_temperature: config.llm.rewrite_temperature,
            summary_temperature: config.llm.summary_temperature,
            summary_seed: config.llm.summary_seed,
            history_threshold: config.pipeline.history_threshold,
            max_judge_rounds: config.pipeline.max_judge_rounds,
        }),
    );

    if let Some(parent) = config.database.path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let store: Arc<dyn ChatStore> =
        Arc::new(SqliteStore::new(&config.database.path.to_string_lossy()).await?);

    let source: Arc<dyn ProblemSource> = Arc::new(LeetCodeScraper::with_timeout(
        &config.scraper.graphql_url,
        std::time::Duration::from_secs(config.scraper.timeout_secs),
    )?);

    let signer = TokenSigner::new(
        &token_secret,
        config.auth.access_ttl_minutes,
        config.auth.refresh_ttl_minutes,
    );

    spawn_event_logger(events.clone());

    let state = Arc::new(AppState {
        store,
        pipeline,
        source,
        signer,
        events,
        bcrypt_cost: config.auth.bcrypt_cost,
    });

    let app = build_router(state, &config.server);

    info!(addr = %addr, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Mirror domain events into the log stream.
fn spawn_event_logger(events: Arc<EventBus>) {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.as_ref() {
                    DomainEvent::ErrorOccurred {
                        context,
                        error_message,
                        ..
                    } => {
                        tracing::error!(context = %context, error = %error_message, "Pipeline error");
                    }
                    other => debug!(event = ?other, "Domain event"),
                },
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

// --- Handlers ---

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}
