//! Tests for agenthub-gateway: HTTP session routes and the WebSocket event
//! stream, driven by a scripted in-process model gateway.

use agenthub_core::{AgentType, Message, Role, Settings, ToolInvocation, ToolSpec};
use agenthub_gateway::*;
use agenthub_llm::{GatewayError, GatewayResponse, GatewayResult, ModelGateway};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_tungstenite::tungstenite::Message as Frame;
use tower::ServiceExt;

// ===========================================================================
// Helpers
// ===========================================================================

struct ScriptedGateway {
    script: Mutex<VecDeque<GatewayResult<GatewayResponse>>>,
    calls: Mutex<Vec<Vec<Message>>>,
}

impl ScriptedGateway {
    fn new(script: Vec<GatewayResult<GatewayResponse>>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            calls: Mutex::new(Vec::new()),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn sent(&self, call: usize) -> Vec<Message> {
        self.calls.lock().unwrap()[call].clone()
    }
}

#[async_trait::async_trait]
impl ModelGateway for ScriptedGateway {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, messages: &[Message], _tools: &[ToolSpec]) -> GatewayResult<GatewayResponse> {
        self.calls.lock().unwrap().push(messages.to_vec());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(GatewayError::InvalidResponse("script exhausted".into())))
    }
}

fn state_with(gateway: Arc<ScriptedGateway>, default_workspace: &Path) -> Arc<AppState> {
    let mut settings = Settings::default();
    settings.default_workspace = default_workspace.to_path_buf();
    settings.server.allowed_origins = Vec::new();
    Arc::new(AppState::new(settings, gateway).with_store(Arc::new(InMemorySessionStore::new())))
}

async fn spawn_server(state: Arc<AppState>) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = build_router(state);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn new_session(state: &AppState, workspace: &Path, agent_type: AgentType) -> Session {
    let session = Session::new(workspace, agent_type);
    state.store.put(session.clone()).await.unwrap();
    session
}

type Client = tokio_tungstenite::WebSocketStream<
    tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>,
>;

async fn connect(addr: SocketAddr, session_id: &str) -> Client {
    let url = format!("ws://{}/ws/{}", addr, session_id);
    let (client, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    client
}

async fn send(client: &mut Client, text: &str) {
    let frame = json!({ "message": text }).to_string();
    client.send(Frame::Text(frame)).await.unwrap();
}

async fn next_event(client: &mut Client) -> Value {
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), client.next())
            .await
            .expect("timed out waiting for event")
            .expect("connection closed")
            .expect("websocket error");
        match frame {
            Frame::Text(t) => return serde_json::from_str(&t).unwrap(),
            Frame::Close(_) => panic!("connection closed"),
            _ => continue,
        }
    }
}

/// Read events until an `assistant` or `error` event (inclusive).
async fn until_terminal(client: &mut Client) -> Vec<Value> {
    let mut events = Vec::new();
    loop {
        let ev = next_event(client).await;
        let done = ev["type"] == "assistant" || ev["type"] == "error";
        events.push(ev);
        if done {
            return events;
        }
    }
}

fn kinds(events: &[Value]) -> Vec<&str> {
    events.iter().map(|e| e["type"].as_str().unwrap()).collect()
}

/// The session is written after the last event goes out; poll for it.
async fn wait_for_history(state: &AppState, session: &Session, len: usize) -> Session {
    for _ in 0..100 {
        let current = state.store.get(&session.id).await.unwrap().unwrap();
        if current.history.len() >= len {
            return current;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("session history never reached {} messages", len);
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// ===========================================================================
// HTTP routes
// ===========================================================================

#[tokio::test]
async fn health_reports_model_and_tools() {
    let dir = TempDir::new().unwrap();
    let app = build_router(state_with(ScriptedGateway::new(vec![]), dir.path()));

    let resp = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body = body_json(resp).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["model"], "grok-4-1-fast");
    assert_eq!(body["max_iterations"], 10);
    assert!(body["timestamp"].is_string());
    let tools: Vec<&str> = body["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t.as_str().unwrap())
        .collect();
    assert_eq!(tools[0], "read_file");
    assert!(tools.contains(&"execute_bash"));
}

#[tokio::test]
async fn create_session_makes_workspace_and_is_retrievable() {
    let dir = TempDir::new().unwrap();
    let state = state_with(ScriptedGateway::new(vec![]), dir.path());
    let app = build_router(state.clone());
    let workspace = dir.path().join("proj").join("nested");

    let req = Request::post("/sessions")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "workspace": workspace, "agent_type": "planning" }).to_string(),
        ))
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    assert_eq!(created["agent_type"], "planning");
    assert_eq!(created["message"], "Session created successfully");
    assert!(workspace.is_dir());

    let id = created["session_id"].as_str().unwrap().to_string();
    let resp = app
        .oneshot(
            Request::get(format!("/sessions/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let details = body_json(resp).await;
    assert_eq!(details["session_id"], id.as_str());
    assert_eq!(details["message_count"], 0);
    assert_eq!(details["usage"]["total_tokens"], 0);
    assert_eq!(details["history"], json!([]));
}

#[tokio::test]
async fn create_session_without_body_uses_default_workspace() {
    let dir = TempDir::new().unwrap();
    let default_ws = dir.path().join("default-project");
    let app = build_router(state_with(ScriptedGateway::new(vec![]), &default_ws));

    let resp = app
        .oneshot(Request::post("/sessions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let created = body_json(resp).await;
    assert_eq!(created["agent_type"], "building");
    assert!(default_ws.is_dir());
}

#[tokio::test]
async fn unknown_session_is_404() {
    let dir = TempDir::new().unwrap();
    let app = build_router(state_with(ScriptedGateway::new(vec![]), dir.path()));

    let resp = app
        .oneshot(Request::get("/sessions/missing").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    let body = body_json(resp).await;
    assert!(body["detail"].as_str().unwrap().contains("missing"));
}

#[tokio::test]
async fn list_sessions_respects_limit() {
    let dir = TempDir::new().unwrap();
    let state = state_with(ScriptedGateway::new(vec![]), dir.path());
    new_session(&state, dir.path(), AgentType::Building).await;
    new_session(&state, dir.path(), AgentType::Planning).await;
    let app = build_router(state);

    let resp = app
        .clone()
        .oneshot(Request::get("/sessions").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["sessions"].as_array().unwrap().len(), 2);

    let resp = app
        .oneshot(Request::get("/sessions?limit=1").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["sessions"].as_array().unwrap().len(), 1);
}

// ===========================================================================
// WebSocket
// ===========================================================================

#[tokio::test]
async fn ws_unknown_session_gets_fatal_error_then_close() {
    let dir = TempDir::new().unwrap();
    let addr = spawn_server(state_with(ScriptedGateway::new(vec![]), dir.path())).await;
    let mut client = connect(addr, "does-not-exist").await;

    let ev = next_event(&mut client).await;
    assert_eq!(ev["type"], "error");
    assert_eq!(ev["fatal"], true);
    assert_eq!(ev["content"], ws::SESSION_NOT_FOUND_MESSAGE);

    let rest = tokio::time::timeout(Duration::from_secs(5), client.next())
        .await
        .unwrap();
    assert!(matches!(rest, None | Some(Ok(Frame::Close(_))) | Some(Err(_))));
}

#[tokio::test]
async fn ws_write_file_turn_streams_events_and_updates_session() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new(vec![
        Ok(GatewayResponse::tool_calls(vec![ToolInvocation::new(
            "call_1",
            "write_file",
            json!({ "path": "hello.txt", "content": "hi" }),
        )])
        .with_usage(100, 50)),
        Ok(GatewayResponse::text("Done.").with_usage(10, 5)),
    ]);
    let state = state_with(gateway.clone(), dir.path());
    let session = new_session(&state, dir.path(), AgentType::Building).await;
    let addr = spawn_server(state.clone()).await;

    let mut client = connect(addr, session.id.as_str()).await;
    send(&mut client, "Create hello.txt").await;
    let events = until_terminal(&mut client).await;

    assert_eq!(
        kinds(&events),
        vec![
            "thinking",
            "status",
            "status",
            "token_usage",
            "tool_call",
            "tool_result",
            "file_change",
            "status",
            "token_usage",
            "assistant",
        ]
    );
    assert!(events.iter().all(|e| e["timestamp"].is_string()));
    assert_eq!(events[0]["content"], agenthub_core::THINKING_TEXT);
    assert_eq!(events[1]["content"], ws::PROCESSING_MESSAGE);
    assert_eq!(events[2]["content"], "Thinking... (iteration 1)");

    assert_eq!(events[3]["total_tokens"], 150);
    assert!((events[3]["estimated_cost"].as_f64().unwrap() - 0.00125).abs() < 1e-9);

    assert_eq!(events[4]["tool_name"], "write_file");
    assert_eq!(events[4]["tool_call_id"], "call_1");
    assert_eq!(events[5]["tool_call_id"], "call_1");
    assert_eq!(events[5]["success"], true);

    assert_eq!(events[6]["file_path"], "hello.txt");
    assert_eq!(events[6]["content_before"], Value::Null);
    assert_eq!(events[6]["content_after"], "hi");

    assert_eq!(events[8]["input_tokens"], 110);
    assert_eq!(events[8]["output_tokens"], 55);
    assert!((events[8]["estimated_cost"].as_f64().unwrap() - 0.001375).abs() < 1e-9);
    assert_eq!(events[9]["content"], "Done.");

    assert_eq!(std::fs::read_to_string(dir.path().join("hello.txt")).unwrap(), "hi");

    let stored = wait_for_history(&state, &session, 2).await;
    assert_eq!(
        stored.history,
        vec![Message::user("Create hello.txt"), Message::assistant("Done.")]
    );
    assert_eq!(stored.usage.input_tokens, 110);
    assert_eq!(stored.usage.output_tokens, 55);
    assert_eq!(gateway.call_count(), 2);
}

#[tokio::test]
async fn ws_second_turn_sees_prior_history_and_usage() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new(vec![
        Ok(GatewayResponse::text("first answer").with_usage(10, 10)),
        Ok(GatewayResponse::text("second answer").with_usage(10, 10)),
    ]);
    let state = state_with(gateway.clone(), dir.path());
    let session = new_session(&state, dir.path(), AgentType::Building).await;
    let addr = spawn_server(state).await;
    let mut client = connect(addr, session.id.as_str()).await;

    send(&mut client, "one").await;
    until_terminal(&mut client).await;
    send(&mut client, "two").await;
    let events = until_terminal(&mut client).await;

    let usage = events.iter().find(|e| e["type"] == "token_usage").unwrap();
    assert_eq!(usage["total_tokens"], 40);

    let sent = gateway.sent(1);
    assert_eq!(sent[0].role, Role::System);
    assert_eq!(sent[1], Message::user("one"));
    assert_eq!(sent[2], Message::assistant("first answer"));
    assert_eq!(sent[3], Message::user("two"));
}

#[tokio::test]
async fn ws_loop_error_is_non_fatal_and_connection_stays_open() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new(vec![
        Err(GatewayError::Status {
            status: 500,
            body: "upstream exploded".into(),
        }),
        Ok(GatewayResponse::text("recovered")),
    ]);
    let state = state_with(gateway.clone(), dir.path());
    let session = new_session(&state, dir.path(), AgentType::Building).await;
    let addr = spawn_server(state).await;
    let mut client = connect(addr, session.id.as_str()).await;

    send(&mut client, "first").await;
    let events = until_terminal(&mut client).await;
    let last = events.last().unwrap();
    assert_eq!(last["type"], "error");
    assert_eq!(last["fatal"], false);
    let content = last["content"].as_str().unwrap();
    assert!(content.starts_with("Agent loop error:"));
    assert!(content.contains("upstream exploded"));

    send(&mut client, "again").await;
    let events = until_terminal(&mut client).await;
    assert_eq!(events.last().unwrap()["content"], "recovered");
    assert_eq!(gateway.call_count(), 2);
}

#[tokio::test]
async fn ws_blank_and_malformed_frames_are_ignored() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new(vec![Ok(GatewayResponse::text("hello"))]);
    let state = state_with(gateway.clone(), dir.path());
    let session = new_session(&state, dir.path(), AgentType::Building).await;
    let addr = spawn_server(state).await;
    let mut client = connect(addr, session.id.as_str()).await;

    send(&mut client, "   ").await;
    client.send(Frame::Text("not json".into())).await.unwrap();
    send(&mut client, "hi").await;

    let first = next_event(&mut client).await;
    assert_eq!(first["type"], "thinking");
    let events = until_terminal(&mut client).await;
    assert_eq!(events.last().unwrap()["content"], "hello");
    assert_eq!(gateway.call_count(), 1);
}

#[tokio::test]
async fn ws_initial_prompt_runs_on_connect() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new(vec![Ok(GatewayResponse::text("here is the plan"))]);
    let state = state_with(gateway.clone(), dir.path());
    let session = Session::new(dir.path(), AgentType::Planning)
        .with_initial_prompt(Some("Plan a todo app".into()));
    state.store.put(session.clone()).await.unwrap();
    let addr = spawn_server(state.clone()).await;

    let mut client = connect(addr, session.id.as_str()).await;
    let events = until_terminal(&mut client).await;
    assert_eq!(events.last().unwrap()["content"], "here is the plan");

    let sent = gateway.sent(0);
    assert!(sent[0].content.starts_with("You are a Planning Agent"));
    assert_eq!(sent.last().unwrap(), &Message::user("Plan a todo app"));

    let stored = wait_for_history(&state, &session, 2).await;
    assert!(stored.initial_prompt.is_none());
}

#[tokio::test]
async fn ws_messages_sent_mid_run_wait_their_turn() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new(vec![
        Ok(GatewayResponse::text("first")),
        Ok(GatewayResponse::text("second")),
    ]);
    let state = state_with(gateway.clone(), dir.path());
    let session = new_session(&state, dir.path(), AgentType::Building).await;
    let addr = spawn_server(state.clone()).await;
    let mut client = connect(addr, session.id.as_str()).await;

    send(&mut client, "one").await;
    send(&mut client, "two").await;

    let first = until_terminal(&mut client).await;
    assert_eq!(first.last().unwrap()["content"], "first");
    let second = until_terminal(&mut client).await;
    assert_eq!(second[0]["type"], "thinking");
    assert_eq!(second.last().unwrap()["content"], "second");

    let stored = wait_for_history(&state, &session, 4).await;
    assert_eq!(
        stored.history,
        vec![
            Message::user("one"),
            Message::assistant("first"),
            Message::user("two"),
            Message::assistant("second"),
        ]
    );
    assert_eq!(gateway.sent(1)[3], Message::user("two"));
}

#[tokio::test]
async fn ws_disconnect_cancels_run_and_leaves_session_untouched() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new(vec![
        Ok(GatewayResponse::tool_calls(vec![ToolInvocation::new(
            "call_1",
            "execute_bash",
            json!({ "command": "sleep 2; touch marker" }),
        )])),
        Ok(GatewayResponse::text("should never be asked for")),
    ]);
    let state = state_with(gateway.clone(), dir.path());
    let session = new_session(&state, dir.path(), AgentType::Building).await;
    let addr = spawn_server(state.clone()).await;
    let mut client = connect(addr, session.id.as_str()).await;

    send(&mut client, "touch a marker slowly").await;
    loop {
        if next_event(&mut client).await["type"] == "tool_call" {
            break;
        }
    }
    client.close(None).await.unwrap();
    drop(client);

    tokio::time::sleep(Duration::from_secs(3)).await;

    assert!(!dir.path().join("marker").exists());
    assert_eq!(gateway.call_count(), 1);
    let stored = state.store.get(&session.id).await.unwrap().unwrap();
    assert!(stored.history.is_empty());
    assert!(stored.audit.messages.is_empty());
    assert_eq!(stored.usage.total_tokens(), 0);
}

// ===========================================================================
// Audit trail
// ===========================================================================

async fn get_json(app: &axum::Router, uri: String) -> (StatusCode, Value) {
    let resp = app
        .clone()
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

#[tokio::test]
async fn audit_routes_serve_what_a_turn_did() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new(vec![
        Ok(GatewayResponse::tool_calls(vec![ToolInvocation::new(
            "call_1",
            "write_file",
            json!({ "path": "notes.md", "content": "v1" }),
        )])
        .with_usage(100, 50)),
        Ok(GatewayResponse::text("Wrote notes.md").with_usage(10, 5)),
    ]);
    let state = state_with(gateway, dir.path());
    let session = new_session(&state, dir.path(), AgentType::Building).await;
    let app = build_router(state.clone());

    let (status, latest) = get_json(&app, format!("/sessions/{}/token-usage/latest", session.id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(latest, Value::Null);

    let addr = spawn_server(state.clone()).await;
    let mut client = connect(addr, session.id.as_str()).await;
    send(&mut client, "Write notes").await;
    until_terminal(&mut client).await;
    wait_for_history(&state, &session, 2).await;

    let (_, body) = get_json(&app, format!("/sessions/{}/messages", session.id)).await;
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "user");
    assert_eq!(messages[0]["content"], "Write notes");
    assert_eq!(messages[1]["message_type"], "thinking");
    let last = messages.last().unwrap();
    assert_eq!(last["role"], "assistant");
    assert_eq!(last["message_type"], "text");
    assert_eq!(last["content"], "Wrote notes.md");
    assert!(last["created_at"].is_string());

    let (_, body) = get_json(&app, format!("/sessions/{}/tool-calls", session.id)).await;
    let calls = body["tool_calls"].as_array().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0]["tool_call_id"], "call_1");
    assert_eq!(calls[0]["arguments"]["path"], "notes.md");
    assert_eq!(calls[0]["success"], true);
    assert!(calls[0]["result"].is_string());

    let (_, body) = get_json(&app, format!("/sessions/{}/file-changes", session.id)).await;
    let changes = body["file_changes"].as_array().unwrap();
    assert_eq!(changes.len(), 1);
    assert_eq!(changes[0]["file_path"], "notes.md");
    assert_eq!(changes[0]["content_before"], Value::Null);
    assert_eq!(changes[0]["content_after"], "v1");

    let (_, body) = get_json(&app, format!("/sessions/{}/token-usage", session.id)).await;
    assert_eq!(body["token_usage"].as_array().unwrap().len(), 2);

    let (_, latest) = get_json(&app, format!("/sessions/{}/token-usage/latest", session.id)).await;
    assert_eq!(latest["input_tokens"], 110);
    assert_eq!(latest["output_tokens"], 55);
    assert_eq!(latest["total_tokens"], 165);
    assert!((latest["estimated_cost"].as_f64().unwrap() - 0.001375).abs() < 1e-9);
}

#[tokio::test]
async fn audit_routes_404_for_unknown_session() {
    let dir = TempDir::new().unwrap();
    let app = build_router(state_with(ScriptedGateway::new(vec![]), dir.path()));

    for path in ["messages", "tool-calls", "file-changes", "token-usage", "token-usage/latest"] {
        let (status, body) = get_json(&app, format!("/sessions/missing/{}", path)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
        assert!(body["detail"].is_string());
    }
}

#[tokio::test]
async fn loop_error_is_kept_in_transcript() {
    let dir = TempDir::new().unwrap();
    let gateway = ScriptedGateway::new(vec![Err(GatewayError::Status {
        status: 502,
        body: "bad gateway".into(),
    })]);
    let state = state_with(gateway, dir.path());
    let session = new_session(&state, dir.path(), AgentType::Building).await;
    let addr = spawn_server(state.clone()).await;
    let mut client = connect(addr, session.id.as_str()).await;

    send(&mut client, "hello").await;
    until_terminal(&mut client).await;

    let mut stored = None;
    for _ in 0..100 {
        let current = state.store.get(&session.id).await.unwrap().unwrap();
        if !current.audit.messages.is_empty() {
            stored = Some(current);
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    let stored = stored.expect("turn was never saved");
    let last = stored.audit.messages.last().unwrap();
    assert_eq!(last.message_type, "error");
    assert!(last.content.contains("bad gateway"));
    assert_eq!(stored.history, vec![Message::user("hello")]);
}
