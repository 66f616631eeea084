//! End-to-end tests using the official Rust MCP SDK (rmcp) client
//!
//! These tests run the whole bridge: an rmcp client speaks MCP over HTTP to
//! an in-process peitho server, which calls a fake Dialogflow CX sessions
//! API served by a second in-process axum router. The fake backend counts
//! committed turns per session so tests can observe whether a call advanced
//! remote state or merely probed it.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use peitho::adapters::rmcp_server::PeithoServer;
use peitho::adapters::tool_handler::BridgeToolHandler;
use peitho::config::{DialogflowSettings, WebhookSettings};
use rmcp::{
    model::{CallToolRequestParam, ClientCapabilities, ClientInfo, Implementation},
    transport::StreamableHttpClientTransport,
    ServiceExt,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

// ============================================================================
// Fake Dialogflow CX Backend
// ============================================================================

type TurnCounts = Arc<Mutex<HashMap<String, u64>>>;

struct FakeDialogflow {
    endpoint: String,
    turns: TurnCounts,
}

impl FakeDialogflow {
    fn committed_turns(&self, session_id: &str) -> u64 {
        self.turns.lock().unwrap().get(session_id).copied().unwrap_or(0)
    }
}

async fn spawn_fake_dialogflow() -> FakeDialogflow {
    let turns: TurnCounts = Arc::new(Mutex::new(HashMap::new()));
    let app = Router::new()
        .route(
            "/v3/projects/:project/locations/:location/agents/:agent/sessions/:call",
            post(fake_sessions),
        )
        .with_state(turns.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    FakeDialogflow {
        endpoint: format!("http://{}/v3", addr),
        turns,
    }
}

/// Handles `sessions/{id}:detectIntent` and `sessions/{id}:matchIntent`.
///
/// `detectIntent` commits a turn: the per-session counter advances and the
/// current page moves with it. `matchIntent` answers from the counter as it
/// stands and rejects any request that would persist parameter changes.
async fn fake_sessions(
    State(turns): State<TurnCounts>,
    Path((_project, _location, _agent, call)): Path<(String, String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    if !headers.contains_key("authorization") {
        return google_error(StatusCode::UNAUTHORIZED, "missing bearer token", "UNAUTHENTICATED");
    }

    let Some((session_id, verb)) = call.split_once(':') else {
        return google_error(StatusCode::NOT_FOUND, "malformed session call", "NOT_FOUND");
    };

    let query_input = &body["queryInput"];
    let text = query_input["text"]["text"].as_str();

    if text == Some("force-error") {
        return google_error(StatusCode::INTERNAL_SERVER_ERROR, "backend exploded", "INTERNAL");
    }

    match verb {
        "detectIntent" => {
            let turn = {
                let mut counts = turns.lock().unwrap();
                let slot = counts.entry(session_id.to_string()).or_insert(0);
                *slot += 1;
                *slot
            };

            let (echoed, transcript) = match text {
                Some(text) => (format!("You said: {}", text), Value::Null),
                None => {
                    let audio = &query_input["audio"];
                    let rate = audio["config"]["sampleRateHertz"].as_u64().unwrap_or(0);
                    let chars = audio["audio"].as_str().map(|a| a.len()).unwrap_or(0);
                    (
                        "You said something out loud".to_string(),
                        json!(format!("heard {} base64 chars at {} Hz", chars, rate)),
                    )
                }
            };

            let mut response_messages = vec![json!({"text": {"text": [echoed]}})];
            if text == Some("goodbye") {
                response_messages.push(json!({"endInteraction": {}}));
            }

            (
                StatusCode::OK,
                Json(json!({
                    "queryResult": {
                        "responseMessages": response_messages,
                        "match": {"intent": {"displayName": "echo.intent"}, "confidence": 0.9},
                        "currentPage": {"displayName": format!("Page {}", turn)},
                        "parameters": {"turns": turn},
                        "transcript": transcript,
                    }
                })),
            )
        }
        "matchIntent" => {
            if body["persistParameterChanges"] != json!(false) {
                return google_error(
                    StatusCode::BAD_REQUEST,
                    "probe must not persist parameter changes",
                    "INVALID_ARGUMENT",
                );
            }

            let turn = turns.lock().unwrap().get(session_id).copied().unwrap_or(0);
            (
                StatusCode::OK,
                Json(json!({
                    "matches": [
                        {
                            "intent": {"displayName": "echo.intent"},
                            "confidence": 0.87,
                            "parameters": {"probe": true}
                        },
                        {"intent": {"displayName": "sys.fallback"}, "confidence": 0.11}
                    ],
                    "currentPage": {"displayName": format!("Page {}", turn)}
                })),
            )
        }
        _ => google_error(StatusCode::NOT_FOUND, "unknown session method", "NOT_FOUND"),
    }
}

fn google_error(code: StatusCode, message: &str, status: &str) -> (StatusCode, Json<Value>) {
    (
        code,
        Json(json!({
            "error": {"code": code.as_u16(), "message": message, "status": status}
        })),
    )
}

// ============================================================================
// Test Server Infrastructure
// ============================================================================

#[allow(dead_code)]
struct TestServer {
    addr: SocketAddr,
    base_url: String,
    // Keeps the token file alive as long as the server may read it
    _token: tempfile::NamedTempFile,
}

fn write_token_file() -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "e2e-test-token").unwrap();
    file
}

fn agent_settings(token: &tempfile::NamedTempFile, backend: &FakeDialogflow) -> DialogflowSettings {
    DialogflowSettings {
        project_id: Some("p1".to_string()),
        location: Some("us-central1".to_string()),
        agent_id: Some("a1".to_string()),
        credentials_path: Some(token.path().to_path_buf()),
        language_code: "en-US".to_string(),
        timeout_seconds: 5,
        endpoint: Some(backend.endpoint.clone()),
    }
}

impl TestServer {
    /// Server already bound to an agent on the fake backend.
    async fn bound(backend: &FakeDialogflow) -> Self {
        let token = write_token_file();
        let settings = agent_settings(&token, backend);
        Self::start(settings, WebhookSettings::default(), token).await
    }

    /// Server with no agent binding; credentials and endpoint are configured
    /// so the initialize tool can complete the binding later.
    async fn unbound(backend: &FakeDialogflow) -> Self {
        let token = write_token_file();
        let settings = DialogflowSettings {
            credentials_path: Some(token.path().to_path_buf()),
            endpoint: Some(backend.endpoint.clone()),
            ..DialogflowSettings::default()
        };
        Self::start(settings, WebhookSettings::default(), token).await
    }

    async fn with_webhook(backend: &FakeDialogflow, webhook: WebhookSettings) -> Self {
        let token = write_token_file();
        let settings = agent_settings(&token, backend);
        Self::start(settings, webhook, token).await
    }

    async fn start(
        dialogflow: DialogflowSettings,
        webhook: WebhookSettings,
        token: tempfile::NamedTempFile,
    ) -> Self {
        let tools = Arc::new(BridgeToolHandler::new(dialogflow));
        tools.initialize_from_settings().await.unwrap();
        let server = PeithoServer::new(tools);

        let app = peitho::create_app(server, webhook).await;

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to be ready
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        TestServer {
            addr,
            base_url,
            _token: token,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

// ============================================================================
// MCP Client Helper
// ============================================================================

type McpClient = rmcp::service::RunningService<rmcp::RoleClient, rmcp::model::InitializeRequestParam>;

async fn create_client(
    server: &TestServer,
) -> Result<McpClient, rmcp::service::ClientInitializeError> {
    let transport = StreamableHttpClientTransport::from_uri(server.url("/mcp"));
    let client_info = ClientInfo {
        protocol_version: Default::default(),
        capabilities: ClientCapabilities::default(),
        client_info: Implementation {
            name: "e2e-test-client".to_string(),
            title: None,
            version: "1.0.0".to_string(),
            website_url: None,
            icons: None,
        },
    };
    client_info.serve(transport).await
}

async fn call_tool(
    client: &McpClient,
    name: &'static str,
    arguments: Value,
) -> Result<rmcp::model::CallToolResult, rmcp::service::ServiceError> {
    client
        .call_tool(CallToolRequestParam {
            name: name.into(),
            arguments: arguments.as_object().cloned(),
        })
        .await
}

/// Text payload of the first content item of a tool result.
fn tool_text(result: &rmcp::model::CallToolResult) -> String {
    let rendered = serde_json::to_value(result).unwrap();
    rendered["content"][0]["text"]
        .as_str()
        .expect("tool result should carry text content")
        .to_string()
}

/// Tool results that render structured data carry it as serialized JSON.
fn tool_json(result: &rmcp::model::CallToolResult) -> Value {
    serde_json::from_str(&tool_text(result)).expect("tool result should be JSON")
}

// ============================================================================
// Basic Protocol Tests
// ============================================================================

#[tokio::test]
async fn test_client_connect_and_initialize() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let client = create_client(&server).await;

    assert!(
        client.is_ok(),
        "Client should successfully connect and initialize"
    );

    let client = client.unwrap();
    let server_info = client.peer_info();

    if let Some(info) = server_info {
        assert_eq!(info.server_info.name, "peitho");
    } else {
        panic!("Server info should be available after initialization");
    }

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_list_tools_exposes_bridge_catalog() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let tools = client.list_tools(Default::default()).await.unwrap();
    let names: Vec<&str> = tools.tools.iter().map(|t| t.name.as_ref()).collect();

    for expected in [
        "initialize_dialogflow",
        "detect_intent",
        "match_intent",
        "detect_intent_from_audio",
        "detect_intent_from_base64",
        "parse_webhook_request",
        "create_webhook_response",
        "check_end_interaction",
    ] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }
    assert_eq!(tools.tools.len(), 8);

    for tool in &tools.tools {
        assert!(
            tool.description.as_deref().is_some_and(|d| !d.is_empty()),
            "tool {} should carry a description",
            tool.name
        );
    }

    client.cancel().await.unwrap();
}

// ============================================================================
// Detection Tests
// ============================================================================

#[tokio::test]
async fn test_detect_intent_round_trip() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let result = call_tool(
        &client,
        "detect_intent",
        json!({"text": "hello there", "session_id": "s-alpha"}),
    )
    .await
    .unwrap();

    let detection = tool_json(&result);
    assert_eq!(detection["session_id"], "s-alpha");
    assert_eq!(
        detection["messages"][0],
        json!({"type": "text", "content": "You said: hello there"})
    );
    assert_eq!(detection["intent"]["name"], "echo.intent");
    assert_eq!(detection["current_page"], "Page 1");
    assert_eq!(detection["parameters"]["turns"], 1);
    assert_eq!(detection["end_interaction"], false);
    assert_eq!(backend.committed_turns("s-alpha"), 1);

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_detect_intent_generates_session_id_when_omitted() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let first = call_tool(&client, "detect_intent", json!({"text": "hi"}))
        .await
        .unwrap();
    let second = call_tool(&client, "detect_intent", json!({"text": "hi"}))
        .await
        .unwrap();

    let first_id = tool_json(&first)["session_id"].as_str().unwrap().to_string();
    let second_id = tool_json(&second)["session_id"].as_str().unwrap().to_string();
    assert!(!first_id.is_empty());
    assert!(!second_id.is_empty());
    assert_ne!(first_id, second_id, "each turn should get a fresh session");

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_match_intent_leaves_session_state_alone() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let opening = call_tool(
        &client,
        "detect_intent",
        json!({"text": "hello", "session_id": "state-check"}),
    )
    .await
    .unwrap();
    assert_eq!(tool_json(&opening)["current_page"], "Page 1");

    // Probe the same session twice; neither call may commit a turn.
    for _ in 0..2 {
        let probe = call_tool(
            &client,
            "match_intent",
            json!({"text": "what can you do", "session_id": "state-check"}),
        )
        .await
        .unwrap();
        let matched = tool_json(&probe);
        assert_eq!(matched["intent"]["name"], "echo.intent");
        assert_eq!(matched["parameters"]["probe"], true);
        assert_eq!(matched["messages"], json!([]));
        assert_eq!(matched["end_interaction"], false);
        assert_eq!(matched["current_page"], "Page 1");
    }
    assert_eq!(backend.committed_turns("state-check"), 1);

    let resumed = call_tool(
        &client,
        "detect_intent",
        json!({"text": "hello again", "session_id": "state-check"}),
    )
    .await
    .unwrap();
    assert_eq!(tool_json(&resumed)["current_page"], "Page 2");

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_detect_intent_from_base64_audio() {
    use base64::{engine::general_purpose, Engine as _};

    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let audio = general_purpose::STANDARD.encode([1u8, 2, 3, 4]);
    let result = call_tool(
        &client,
        "detect_intent_from_base64",
        json!({
            "audio_base64": audio,
            "session_id": "s-audio",
            "sample_rate_hertz": 8000
        }),
    )
    .await
    .unwrap();

    let detection = tool_json(&result);
    assert_eq!(detection["session_id"], "s-audio");
    let transcript = detection["transcript"].as_str().unwrap();
    assert!(
        transcript.contains("8000 Hz"),
        "transcript should reflect the requested sample rate: {}",
        transcript
    );
    assert_eq!(detection["intent"]["name"], "echo.intent");

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_goodbye_sets_end_interaction() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let result = call_tool(
        &client,
        "detect_intent",
        json!({"text": "goodbye", "session_id": "s-bye"}),
    )
    .await
    .unwrap();

    let detection = tool_json(&result);
    assert_eq!(detection["end_interaction"], true);
    assert_eq!(
        detection["messages"],
        json!([{"type": "text", "content": "You said: goodbye"}])
    );

    let flag = call_tool(&client, "check_end_interaction", json!({"response": detection}))
        .await
        .unwrap();
    assert_eq!(tool_json(&flag), json!(true));

    client.cancel().await.unwrap();
}

// ============================================================================
// Failure Surface Tests
// ============================================================================

#[tokio::test]
async fn test_detect_intent_before_initialization_fails() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::unbound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let result = call_tool(&client, "detect_intent", json!({"text": "hello"})).await;

    assert!(result.is_err(), "detection without a bound agent should fail");
    let rendered = format!("{:?}", result.unwrap_err());
    assert!(
        rendered.contains("not initialized"),
        "error should name the missing initialization: {}",
        rendered
    );
    assert!(
        backend.turns.lock().unwrap().is_empty(),
        "no request should reach the backend"
    );

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_remote_failure_surfaces_error_message() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let result = call_tool(
        &client,
        "detect_intent",
        json!({"text": "force-error", "session_id": "s-err"}),
    )
    .await;

    assert!(result.is_err(), "remote 500 should fail the tool call");
    let rendered = format!("{:?}", result.unwrap_err());
    assert!(
        rendered.contains("backend exploded"),
        "remote error message should survive the protocol mapping: {}",
        rendered
    );

    client.cancel().await.unwrap();
}

#[tokio::test]
async fn test_empty_text_is_rejected_without_a_network_call() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let result = call_tool(
        &client,
        "detect_intent",
        json!({"text": "   ", "session_id": "s-empty"}),
    )
    .await;

    assert!(result.is_err(), "blank text should be rejected");
    assert_eq!(backend.committed_turns("s-empty"), 0);

    client.cancel().await.unwrap();
}

// ============================================================================
// Initialization Tests
// ============================================================================

#[tokio::test]
async fn test_initialize_dialogflow_tool_binds_agent() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::unbound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let result = call_tool(
        &client,
        "initialize_dialogflow",
        json!({"project_id": "p2", "location": "global", "agent_id": "a2"}),
    )
    .await
    .unwrap();

    let confirmation = tool_text(&result);
    assert!(
        confirmation.contains("projects/p2/locations/global/agents/a2"),
        "confirmation should name the bound agent: {}",
        confirmation
    );

    // The binding is live: detection now reaches the backend.
    let detection = call_tool(
        &client,
        "detect_intent",
        json!({"text": "hello", "session_id": "s-bound"}),
    )
    .await
    .unwrap();
    assert_eq!(tool_json(&detection)["intent"]["name"], "echo.intent");
    assert_eq!(backend.committed_turns("s-bound"), 1);

    client.cancel().await.unwrap();
}

// ============================================================================
// Webhook Translator Tests (no agent binding required)
// ============================================================================

#[tokio::test]
async fn test_webhook_tools_work_without_agent_binding() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::unbound(&backend).await;
    let client = create_client(&server).await.unwrap();

    let request = json!({
        "sessionInfo": {
            "session": "projects/p1/locations/us-central1/agents/a1/sessions/s-9",
            "parameters": {"size": "large"}
        },
        "intentInfo": {"displayName": "order.pizza"},
        "fulfillmentInfo": {"tag": "confirm-order"},
        "text": "a large pizza please"
    });
    let parsed = call_tool(&client, "parse_webhook_request", json!({"request_json": request}))
        .await
        .unwrap();
    let parsed = tool_json(&parsed);
    assert_eq!(parsed["intent_name"], "order.pizza");
    assert_eq!(parsed["tag"], "confirm-order");
    assert_eq!(parsed["parameters"]["size"], "large");
    assert_eq!(parsed["text"], "a large pizza please");

    let response = call_tool(
        &client,
        "create_webhook_response",
        json!({"fulfillment": {
            "messages": ["Your order is confirmed"],
            "parameter_updates": {"confirmed": true}
        }}),
    )
    .await
    .unwrap();
    let response = tool_json(&response);
    assert_eq!(
        response["fulfillmentResponse"]["messages"][0]["text"]["text"][0],
        "Your order is confirmed"
    );
    assert_eq!(response["sessionInfo"]["parameters"]["confirmed"], true);

    client.cancel().await.unwrap();
}

// ============================================================================
// HTTP Surface Tests
// ============================================================================

#[tokio::test]
async fn test_health_endpoints_report_binding_state() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let http = reqwest::Client::new();

    let health = http.get(server.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), 200);
    let body: Value = health.json().await.unwrap();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["checks"]["dialogflow"], "initialized");

    let ready = http.get(server.url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), 200);

    let live = http.get(server.url("/health/live")).send().await.unwrap();
    assert_eq!(live.status(), 200);
}

#[tokio::test]
async fn test_readiness_follows_agent_binding() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::unbound(&backend).await;
    let http = reqwest::Client::new();

    let ready = http.get(server.url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), 503, "unbound server should not be ready");

    let client = create_client(&server).await.unwrap();
    call_tool(
        &client,
        "initialize_dialogflow",
        json!({"project_id": "p1", "location": "global", "agent_id": "a1"}),
    )
    .await
    .unwrap();
    client.cancel().await.unwrap();

    let ready = http.get(server.url("/health/ready")).send().await.unwrap();
    assert_eq!(ready.status(), 200, "binding an agent should make the server ready");
}

#[tokio::test]
async fn test_webhook_endpoint_round_trip() {
    let backend = spawn_fake_dialogflow().await;
    let webhook = WebhookSettings {
        enabled: true,
        reply_messages: vec!["Thanks for calling".to_string()],
        echo_parameters: true,
    };
    let server = TestServer::with_webhook(&backend, webhook).await;
    let http = reqwest::Client::new();

    let response = http
        .post(server.url("/webhook"))
        .json(&json!({
            "sessionInfo": {
                "session": "projects/p1/locations/us-central1/agents/a1/sessions/s-7",
                "parameters": {"caller": "ada"}
            },
            "intentInfo": {"displayName": "support.request"},
            "fulfillmentInfo": {"tag": "support"}
        }))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 200);
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["fulfillmentResponse"]["messages"][0]["text"]["text"][0],
        "Thanks for calling"
    );
    assert_eq!(body["sessionInfo"]["parameters"]["caller"], "ada");
}

#[tokio::test]
async fn test_webhook_endpoint_rejects_malformed_payloads() {
    let backend = spawn_fake_dialogflow().await;
    let webhook = WebhookSettings {
        enabled: true,
        ..WebhookSettings::default()
    };
    let server = TestServer::with_webhook(&backend, webhook).await;
    let http = reqwest::Client::new();

    let response = http
        .post(server.url("/webhook"))
        .json(&json!(["not", "a", "fulfillment", "request"]))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 400);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["kind"], "malformed_payload");
}

#[tokio::test]
async fn test_webhook_endpoint_absent_when_disabled() {
    let backend = spawn_fake_dialogflow().await;
    let server = TestServer::bound(&backend).await;
    let http = reqwest::Client::new();

    let response = http
        .post(server.url("/webhook"))
        .json(&json!({}))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), 404);
}
