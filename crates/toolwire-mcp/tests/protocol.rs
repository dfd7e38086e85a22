//! Protocol-level integration tests: handshake, routing, and provider
//! failure handling through a single session handler.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};

use toolwire_mcp::protocol::ProtocolHandler;
use toolwire_mcp::provider::{
    CallContext, ProviderError, ProviderRegistry, ProviderResult, ResourceProvider, ToolProvider,
};
use toolwire_mcp::session::SessionState;
use toolwire_mcp::transport::framing;
use toolwire_mcp::types::*;

// ─────────────────────── helpers ───────────────────────

/// A tool provider with fixed names whose calls answer with the provider label.
struct Labelled {
    label: &'static str,
    tools: Vec<&'static str>,
    fail_list: bool,
    fail_call: bool,
}

impl Labelled {
    fn new(label: &'static str, tools: Vec<&'static str>) -> Self {
        Self {
            label,
            tools,
            fail_list: false,
            fail_call: false,
        }
    }

    fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    fn failing_call(mut self) -> Self {
        self.fail_call = true;
        self
    }
}

#[async_trait]
impl ToolProvider for Labelled {
    fn name(&self) -> &str {
        self.label
    }

    async fn list_tools(&self, _ctx: &CallContext) -> ProviderResult<Vec<ToolDefinition>> {
        if self.fail_list {
            return Err(ProviderError::failed("backend offline"));
        }
        Ok(self
            .tools
            .iter()
            .map(|name| ToolDefinition {
                name: name.to_string(),
                description: None,
                input_schema: json!({ "type": "object" }),
            })
            .collect())
    }

    async fn call_tool(
        &self,
        _ctx: &CallContext,
        _name: &str,
        _arguments: Value,
    ) -> ProviderResult<ToolCallResult> {
        if self.fail_call {
            return Err(ProviderError::failed("boom"));
        }
        Ok(ToolCallResult::text(self.label.to_string()))
    }
}

/// Counts every provider invocation, tool and resource side alike.
#[derive(Clone, Default)]
struct Counting {
    calls: Arc<AtomicUsize>,
}

impl Counting {
    fn count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ToolProvider for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn list_tools(&self, _ctx: &CallContext) -> ProviderResult<Vec<ToolDefinition>> {
        self.hit();
        Ok(vec![ToolDefinition {
            name: "echo".to_string(),
            description: None,
            input_schema: json!({ "type": "object" }),
        }])
    }

    async fn call_tool(
        &self,
        _ctx: &CallContext,
        _name: &str,
        _arguments: Value,
    ) -> ProviderResult<ToolCallResult> {
        self.hit();
        Ok(ToolCallResult::text("counted".to_string()))
    }
}

#[async_trait]
impl ResourceProvider for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn list_resources(&self, _ctx: &CallContext) -> ProviderResult<Vec<ResourceDefinition>> {
        self.hit();
        Ok(vec![resource("mem://counting")])
    }

    async fn read_resource(
        &self,
        _ctx: &CallContext,
        uri: &str,
    ) -> ProviderResult<ReadResourceResult> {
        self.hit();
        Ok(ReadResourceResult {
            contents: vec![ResourceContent::json(uri, &json!({ "ok": true }))],
        })
    }
}

/// A resource provider with fixed URIs whose reads answer with the provider label.
struct Documents {
    label: &'static str,
    uris: Vec<&'static str>,
    fail_list: bool,
    fail_read: bool,
}

impl Documents {
    fn new(label: &'static str, uris: Vec<&'static str>) -> Self {
        Self {
            label,
            uris,
            fail_list: false,
            fail_read: false,
        }
    }

    fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    fn failing_read(mut self) -> Self {
        self.fail_read = true;
        self
    }
}

#[async_trait]
impl ResourceProvider for Documents {
    fn name(&self) -> &str {
        self.label
    }

    async fn list_resources(&self, _ctx: &CallContext) -> ProviderResult<Vec<ResourceDefinition>> {
        if self.fail_list {
            return Err(ProviderError::failed("index unavailable"));
        }
        Ok(self.uris.iter().map(|uri| resource(uri)).collect())
    }

    async fn read_resource(
        &self,
        _ctx: &CallContext,
        uri: &str,
    ) -> ProviderResult<ReadResourceResult> {
        if self.fail_read {
            return Err(ProviderError::failed("disk gone"));
        }
        Ok(ReadResourceResult {
            contents: vec![ResourceContent::json(uri, &json!({ "from": self.label }))],
        })
    }
}

fn resource(uri: &str) -> ResourceDefinition {
    ResourceDefinition {
        uri: uri.to_string(),
        name: uri.to_string(),
        description: None,
        mime_type: Some("application/json".to_string()),
    }
}

/// Parse the JSON text of the first content entry of a `resources/read` result.
fn read_body(resp: &Value) -> Value {
    let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
    serde_json::from_str(text).unwrap()
}

fn handler_with(registry: ProviderRegistry) -> ProtocolHandler {
    ProtocolHandler::new(Arc::new(registry))
}

fn default_handler() -> ProtocolHandler {
    handler_with(toolwire_mcp::default_registry())
}

/// Build an MCP JSON-RPC request.
fn mcp_request(id: i64, method: &str, params: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": method,
        "params": params
    })
}

/// Build an initialize request.
fn init_request() -> Value {
    mcp_request(
        0,
        "initialize",
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": { "name": "test-client", "version": "1.0" }
        }),
    )
}

fn initialized() -> Value {
    json!({ "jsonrpc": "2.0", "method": "initialized" })
}

/// Send a JSON-RPC message through the handler as raw bytes and return the
/// encoded response, if any.
async fn send(handler: &ProtocolHandler, msg: Value) -> Option<Value> {
    let envelope = framing::decode(msg.to_string().as_bytes()).unwrap();
    let response = handler.handle_message(envelope.classify()).await?;
    let text = framing::encode(&response).unwrap();
    Some(serde_json::from_str(&text).unwrap())
}

/// Send and unwrap the response.
async fn send_unwrap(handler: &ProtocolHandler, msg: Value) -> Value {
    send(handler, msg).await.expect("expected response")
}

async fn handshake(handler: &ProtocolHandler) {
    let resp = send_unwrap(handler, init_request()).await;
    assert!(resp.get("result").is_some(), "initialize failed: {resp}");
    assert!(send(handler, initialized()).await.is_none());
}

// ─────────────────────── handshake ───────────────────────

#[tokio::test]
async fn test_initialize_returns_server_info() {
    let handler = default_handler();
    let resp = send_unwrap(&handler, init_request()).await;

    assert_eq!(resp["jsonrpc"], "2.0");
    assert_eq!(resp["id"], 0);
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["serverInfo"]["name"], "toolwire-mcp");
    assert!(resp["result"]["capabilities"]["tools"].is_object());
    assert!(resp.get("error").is_none());
}

#[tokio::test]
async fn test_initialize_does_not_make_session_ready() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;
    assert_eq!(handler.state().await, SessionState::AwaitingInitialize);

    let resp = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32600);
    assert_eq!(resp["error"]["message"], "client not initialized");
}

#[tokio::test]
async fn test_request_before_handshake_rejected() {
    let handler = default_handler();
    let resp = send_unwrap(
        &handler,
        mcp_request(3, "tools/call", json!({ "name": "add", "arguments": { "a": 1, "b": 2 } })),
    )
    .await;

    assert_eq!(resp["id"], 3);
    assert_eq!(resp["error"]["code"], -32600);
    assert!(resp.get("result").is_none());
}

#[tokio::test]
async fn test_requests_before_handshake_never_reach_providers() {
    let counting = Counting::default();
    let registry = ProviderRegistry::new()
        .with_tool(counting.clone())
        .with_resource(counting.clone());
    let handler = handler_with(registry);
    send_unwrap(&handler, init_request()).await;

    let requests = [
        mcp_request(1, "tools/list", json!({})),
        mcp_request(2, "tools/call", json!({ "name": "echo", "arguments": {} })),
        mcp_request(3, "resources/list", json!({})),
        mcp_request(4, "resources/read", json!({ "uri": "mem://counting" })),
    ];
    for request in requests {
        let resp = send_unwrap(&handler, request).await;
        assert_eq!(resp["error"]["code"], -32600);
    }
    assert_eq!(counting.count(), 0);

    assert!(send(&handler, initialized()).await.is_none());
    let resp = send_unwrap(&handler, mcp_request(5, "tools/list", json!({}))).await;
    assert!(resp.get("result").is_some());
    assert_eq!(counting.count(), 1);
}

#[tokio::test]
async fn test_initialized_is_idempotent() {
    let handler = default_handler();
    handshake(&handler).await;
    assert!(send(&handler, initialized()).await.is_none());
    assert!(send(&handler, initialized()).await.is_none());
    assert_eq!(handler.state().await, SessionState::Ready);

    let resp = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    assert_eq!(resp["result"]["tools"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_namespaced_initialized_notification() {
    let handler = default_handler();
    send_unwrap(&handler, init_request()).await;
    let notif = json!({ "jsonrpc": "2.0", "method": "notifications/initialized" });
    assert!(send(&handler, notif).await.is_none());
    assert_eq!(handler.state().await, SessionState::Ready);
}

#[tokio::test]
async fn test_initialize_without_params() {
    let handler = default_handler();
    let resp = send_unwrap(&handler, json!({ "jsonrpc": "2.0", "id": 1, "method": "initialize" })).await;
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
}

// ─────────────────────── envelopes ───────────────────────

#[tokio::test]
async fn test_unknown_method_before_handshake() {
    let handler = default_handler();
    let resp = send_unwrap(&handler, mcp_request(9, "bogus", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["message"], "Method not found: bogus");
}

#[tokio::test]
async fn test_envelope_without_method_is_invalid_request() {
    let handler = default_handler();
    let resp = send_unwrap(&handler, json!({ "jsonrpc": "2.0", "id": 7 })).await;
    assert_eq!(resp["id"], 7);
    assert_eq!(resp["error"]["code"], -32600);
    assert_eq!(resp["error"]["message"], "Invalid message format");
}

#[tokio::test]
async fn test_wrong_jsonrpc_version_rejected() {
    let handler = default_handler();
    let resp = send_unwrap(
        &handler,
        json!({ "jsonrpc": "1.0", "id": 2, "method": "initialize" }),
    )
    .await;
    assert_eq!(resp["id"], 2);
    assert_eq!(resp["error"]["code"], -32600);
}

#[tokio::test]
async fn test_string_request_id_echoed() {
    let handler = default_handler();
    let resp = send_unwrap(
        &handler,
        json!({ "jsonrpc": "2.0", "id": "req-1", "method": "initialize" }),
    )
    .await;
    assert_eq!(resp["id"], "req-1");
}

#[tokio::test]
async fn test_unknown_notification_ignored() {
    let handler = default_handler();
    let notif = json!({ "jsonrpc": "2.0", "method": "notifications/progress" });
    assert!(send(&handler, notif).await.is_none());
    assert_eq!(handler.state().await, SessionState::AwaitingInitialize);
}

// ─────────────────────── tools ───────────────────────

#[tokio::test]
async fn test_add_tool() {
    let handler = default_handler();
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(2, "tools/call", json!({ "name": "add", "arguments": { "a": 5, "b": 3 } })),
    )
    .await;

    assert_eq!(resp["id"], 2);
    assert_eq!(resp["result"]["content"][0]["type"], "text");
    assert_eq!(resp["result"]["content"][0]["text"], "5 + 3 = 8");
    assert_eq!(resp["result"]["isError"], false);
}

#[tokio::test]
async fn test_numeric_string_arguments() {
    let handler = default_handler();
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(
            2,
            "tools/call",
            json!({ "name": "power", "arguments": { "base": "2", "exponent": "10" } }),
        ),
    )
    .await;
    assert_eq!(resp["result"]["content"][0]["text"], "2 ^ 10 = 1024");
}

#[tokio::test]
async fn test_bad_arguments_are_error_content() {
    let handler = default_handler();
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(4, "tools/call", json!({ "name": "divide", "arguments": { "a": 1, "b": 0 } })),
    )
    .await;
    assert!(resp.get("error").is_none());
    assert_eq!(resp["result"]["isError"], true);
}

#[tokio::test]
async fn test_tool_list_is_stable() {
    let handler = default_handler();
    handshake(&handler).await;

    let first = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    let second = send_unwrap(&handler, mcp_request(2, "tools/list", json!({}))).await;
    assert_eq!(first["result"], second["result"]);
}

#[tokio::test]
async fn test_unknown_tool_is_method_not_found() {
    let handler = default_handler();
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(5, "tools/call", json!({ "name": "nope", "arguments": {} })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["message"], "Tool not found: nope");
}

#[tokio::test]
async fn test_tool_call_without_params_is_invalid_params() {
    let handler = default_handler();
    handshake(&handler).await;

    let resp = send_unwrap(&handler, json!({ "jsonrpc": "2.0", "id": 6, "method": "tools/call" })).await;
    assert_eq!(resp["error"]["code"], -32602);
}

#[tokio::test]
async fn test_provider_failure_keeps_session_alive() {
    let registry = ProviderRegistry::new()
        .with_tool(Labelled::new("flaky", vec!["explode"]).failing_call())
        .with_tool(Labelled::new("steady", vec!["echo"]));
    let handler = handler_with(registry);
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(1, "tools/call", json!({ "name": "explode", "arguments": {} })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32603);
    assert_eq!(resp["error"]["message"], "Tool execution failed");
    assert_eq!(resp["error"]["data"], "boom");

    let resp = send_unwrap(
        &handler,
        mcp_request(2, "tools/call", json!({ "name": "echo", "arguments": {} })),
    )
    .await;
    assert_eq!(resp["result"]["content"][0]["text"], "steady");
    assert_eq!(handler.state().await, SessionState::Ready);
}

#[tokio::test]
async fn test_first_registered_provider_wins() {
    let registry = ProviderRegistry::new()
        .with_tool(Labelled::new("first", vec!["echo"]))
        .with_tool(Labelled::new("second", vec!["echo"]));
    let handler = handler_with(registry);
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(1, "tools/call", json!({ "name": "echo" })),
    )
    .await;
    assert_eq!(resp["result"]["content"][0]["text"], "first");
}

#[tokio::test]
async fn test_failing_list_aborts_tools_list_but_not_calls() {
    let registry = ProviderRegistry::new()
        .with_tool(Labelled::new("broken", vec!["hidden"]).failing_list())
        .with_tool(Labelled::new("steady", vec!["echo"]));
    let handler = handler_with(registry);
    handshake(&handler).await;

    let resp = send_unwrap(&handler, mcp_request(1, "tools/list", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32603);
    assert_eq!(resp["error"]["message"], "Failed to list tools");
    assert_eq!(resp["error"]["data"], "backend offline");

    let resp = send_unwrap(
        &handler,
        mcp_request(2, "tools/call", json!({ "name": "echo", "arguments": {} })),
    )
    .await;
    assert_eq!(resp["result"]["content"][0]["text"], "steady");
}

// ─────────────────────── resources ───────────────────────

#[tokio::test]
async fn test_resources_list_and_read() {
    let handler = default_handler();
    handshake(&handler).await;

    let resp = send_unwrap(&handler, mcp_request(1, "resources/list", json!({}))).await;
    let uris: Vec<_> = resp["result"]["resources"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["uri"].as_str().unwrap().to_string())
        .collect();
    assert!(uris.contains(&"toolwire://math/operations".to_string()));

    let resp = send_unwrap(
        &handler,
        mcp_request(2, "resources/read", json!({ "uri": "toolwire://math/operations" })),
    )
    .await;
    let text = resp["result"]["contents"][0]["text"].as_str().unwrap();
    let parsed: Value = serde_json::from_str(text).unwrap();
    assert_eq!(parsed["count"], 4);
}

#[tokio::test]
async fn test_resource_failure_keeps_session_alive() {
    let registry = ProviderRegistry::new()
        .with_resource(Documents::new("flaky", vec!["mem://broken"]).failing_read())
        .with_resource(Documents::new("steady", vec!["mem://notes"]));
    let handler = handler_with(registry);
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(1, "resources/read", json!({ "uri": "mem://broken" })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32603);
    assert_eq!(resp["error"]["message"], "Resource read failed");
    assert_eq!(resp["error"]["data"], "disk gone");

    let resp = send_unwrap(
        &handler,
        mcp_request(2, "resources/read", json!({ "uri": "mem://notes" })),
    )
    .await;
    assert_eq!(read_body(&resp)["from"], "steady");
    assert_eq!(handler.state().await, SessionState::Ready);
}

#[tokio::test]
async fn test_first_registered_resource_provider_wins() {
    let registry = ProviderRegistry::new()
        .with_resource(Documents::new("first", vec!["mem://shared"]))
        .with_resource(Documents::new("second", vec!["mem://shared"]));
    let handler = handler_with(registry);
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(1, "resources/read", json!({ "uri": "mem://shared" })),
    )
    .await;
    assert_eq!(read_body(&resp)["from"], "first");
}

#[tokio::test]
async fn test_failing_list_aborts_resources_list_but_not_reads() {
    let registry = ProviderRegistry::new()
        .with_resource(Documents::new("broken", vec!["mem://hidden"]).failing_list())
        .with_resource(Documents::new("steady", vec!["mem://notes"]));
    let handler = handler_with(registry);
    handshake(&handler).await;

    let resp = send_unwrap(&handler, mcp_request(1, "resources/list", json!({}))).await;
    assert_eq!(resp["error"]["code"], -32603);
    assert_eq!(resp["error"]["message"], "Failed to list resources");
    assert_eq!(resp["error"]["data"], "index unavailable");
    assert!(resp.get("result").is_none());

    let resp = send_unwrap(
        &handler,
        mcp_request(2, "resources/read", json!({ "uri": "mem://notes" })),
    )
    .await;
    assert_eq!(read_body(&resp)["from"], "steady");
}

#[tokio::test]
async fn test_unknown_resource_is_method_not_found() {
    let handler = handler_with(ProviderRegistry::new().with_tool(Labelled::new("t", vec![])));
    handshake(&handler).await;

    let resp = send_unwrap(
        &handler,
        mcp_request(1, "resources/read", json!({ "uri": "toolwire://missing" })),
    )
    .await;
    assert_eq!(resp["error"]["code"], -32601);
    assert_eq!(resp["error"]["message"], "Resource not found: toolwire://missing");
}

// ─────────────────────── lifecycle ───────────────────────

#[tokio::test]
async fn test_closed_handler_drops_everything() {
    let handler = default_handler();
    handshake(&handler).await;
    handler.close().await;

    assert!(send(&handler, mcp_request(1, "tools/list", json!({}))).await.is_none());
    assert_eq!(handler.state().await, SessionState::Closed);
}
