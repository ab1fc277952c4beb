//! HTTP server: session API, health, and the WebSocket upgrade

use crate::store::{InMemorySessionStore, Session, SessionStore};
use crate::ws::handle_connection;
use agenthub_agent::{AgentConfig, AgentLoop};
use agenthub_core::{round_cost, AgentType, Error, SessionId, Settings};
use agenthub_llm::ModelGateway;
use agenthub_tools::create_default_registry;
use axum::{
    extract::{Path as AxumPath, Query, State, WebSocketUpgrade},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

const DEFAULT_LIST_LIMIT: usize = 20;

pub struct AppState {
    pub agent: Arc<AgentLoop>,
    pub store: Arc<dyn SessionStore>,
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the default tools and an in-memory store around `gateway`.
    pub fn new(settings: Settings, gateway: Arc<dyn ModelGateway>) -> Self {
        let tools = Arc::new(create_default_registry(&settings));
        let agent = Arc::new(AgentLoop::new(gateway, tools, AgentConfig::from(&settings)));
        Self {
            agent,
            store: Arc::new(InMemorySessionStore::new()),
            settings: Arc::new(settings),
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = store;
        self
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.settings.server.allowed_origins);
    Router::new()
        .route("/health", get(health_handler))
        .route("/sessions", get(list_sessions).post(create_session))
        .route("/sessions/:id", get(get_session))
        .route("/sessions/:id/messages", get(session_messages))
        .route("/sessions/:id/tool-calls", get(session_tool_calls))
        .route("/sessions/:id/file-changes", get(session_file_changes))
        .route("/sessions/:id/token-usage", get(session_token_usage))
        .route("/sessions/:id/token-usage/latest", get(latest_token_usage))
        .route("/ws/:session_id", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() {
        return layer.allow_origin(Any);
    }
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {:?}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

pub async fn start_server(settings: Settings, gateway: Arc<dyn ModelGateway>) -> anyhow::Result<()> {
    let bind_addr: SocketAddr =
        format!("{}:{}", settings.server.bind.to_addr(), settings.server.port).parse()?;

    let state = Arc::new(AppState::new(settings, gateway));

    info!("Agent Hub v{} starting", env!("CARGO_PKG_VERSION"));
    info!("  Listening on: {}", bind_addr);
    info!("  WebSocket:    ws://{}/ws/{{session_id}}", bind_addr);
    info!("  Model:        {} via {}", state.settings.model, state.agent.gateway_name());
    info!("  Tools:        {:?}", state.agent.tools().names());
    info!("  Workspace:    {}", state.settings.default_workspace.display());

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Core errors as HTTP responses, `{"detail": ...}` bodies.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::SessionNotFound(_) => StatusCode::NOT_FOUND,
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

async fn health_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "model": state.settings.model,
        "max_iterations": state.agent.config().max_iterations,
        "tools": state.agent.tools().names(),
    }))
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateSessionRequest {
    pub workspace: Option<String>,
    pub agent_type: Option<String>,
    pub initial_prompt: Option<String>,
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CreateSessionRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let req = body.map(|Json(r)| r).unwrap_or_default();
    let workspace = req
        .workspace
        .filter(|w| !w.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| state.settings.default_workspace.clone());
    tokio::fs::create_dir_all(&workspace)
        .await
        .map_err(Error::from)?;

    let agent_type = req
        .agent_type
        .as_deref()
        .map(AgentType::from_name)
        .unwrap_or_default();
    let session = Session::new(workspace, agent_type).with_initial_prompt(req.initial_prompt);
    let id = session.id.clone();
    let workspace = session.workspace.display().to_string();
    state.store.put(session).await?;

    info!(session = %id, agent_type = %agent_type, workspace = %workspace, "Session created");

    Ok(Json(json!({
        "session_id": id,
        "workspace": workspace,
        "agent_type": agent_type,
        "message": "Session created successfully",
    })))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let sessions = state
        .store
        .list(query.limit.unwrap_or(DEFAULT_LIST_LIMIT))
        .await?;
    let summaries: Vec<_> = sessions.iter().map(summary).collect();
    Ok(Json(json!({ "sessions": summaries })))
}

async fn load_session(state: &AppState, id: String) -> Result<Session, ApiError> {
    let id = SessionId::from(id);
    let session = state
        .store
        .get(&id)
        .await?
        .ok_or_else(|| Error::SessionNotFound(id.to_string()))?;
    Ok(session)
}

async fn get_session(
    AxumPath(id): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = load_session(&state, id).await?;

    let mut body = summary(&session);
    body["history"] = serde_json::to_value(&session.history).map_err(Error::from)?;
    Ok(Json(body))
}

async fn session_messages(
    AxumPath(id): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = load_session(&state, id).await?;
    Ok(Json(json!({ "messages": session.audit.messages })))
}

async fn session_tool_calls(
    AxumPath(id): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = load_session(&state, id).await?;
    Ok(Json(json!({ "tool_calls": session.audit.tool_calls })))
}

async fn session_file_changes(
    AxumPath(id): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = load_session(&state, id).await?;
    Ok(Json(json!({ "file_changes": session.audit.file_changes })))
}

async fn session_token_usage(
    AxumPath(id): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = load_session(&state, id).await?;
    Ok(Json(json!({ "token_usage": session.audit.token_usage })))
}

/// Last usage checkpoint, or `null` before the first run reports one.
async fn latest_token_usage(
    AxumPath(id): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, ApiError> {
    let session = load_session(&state, id).await?;
    Ok(Json(json!(session.audit.latest_usage())))
}

fn summary(session: &Session) -> serde_json::Value {
    json!({
        "session_id": session.id,
        "workspace": session.workspace.display().to_string(),
        "agent_type": session.agent_type,
        "created_at": session.created_at.to_rfc3339(),
        "updated_at": session.updated_at.to_rfc3339(),
        "message_count": session.history.len(),
        "usage": {
            "input_tokens": session.usage.input_tokens,
            "output_tokens": session.usage.output_tokens,
            "total_tokens": session.usage.total_tokens(),
            "estimated_cost": round_cost(session.usage.estimated_cost),
        },
    })
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    AxumPath(session_id): AxumPath<String>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let id = SessionId::from(session_id);
    ws.on_upgrade(move |socket| handle_connection(socket, state, id))
}
