//! JSON-RPC method dispatch for one session.
//!
//! Every request gets exactly one response; notifications get none. Tool
//! faults never surface as JSON-RPC errors: they are folded into the result
//! envelope by the dispatcher.

use std::sync::Arc;

use tracing::{debug, warn};

use {
    selkie_protocol::{
        InitializeResult, JsonRpcRequest, JsonRpcResponse, PROTOCOL_VERSION, ResourceContents,
        ResourceDef, ResourcesCapability, ResourcesListResult, ResourcesReadParams,
        ResourcesReadResult, ServerCapabilities, ServerInfo, ToolsCallParams, ToolsCapability,
        ToolsListResult, error_codes,
    },
    selkie_tools::ToolContext,
};

use crate::{state::GatewayState, transport::SseConnection};

const SERVER_NAME: &str = "selkie";

fn resource_uri(session_id: &str, name: &str) -> String {
    format!("screenshot://{session_id}/{name}")
}

fn ok_json<T: serde::Serialize>(id: serde_json::Value, payload: &T) -> JsonRpcResponse {
    match serde_json::to_value(payload) {
        Ok(value) => JsonRpcResponse::result(id, value),
        Err(e) => JsonRpcResponse::error(
            id,
            error_codes::INTERNAL_ERROR,
            format!("failed to serialize result: {e}"),
        ),
    }
}

/// Handle one decoded JSON-RPC message for a session. Returns the response
/// to stream back, or `None` for notifications.
pub async fn handle_message(
    state: &GatewayState,
    conn: &Arc<SseConnection>,
    request: JsonRpcRequest,
) -> Option<JsonRpcResponse> {
    if request.is_notification() {
        debug!(
            session_id = %conn.session_id,
            method = %request.method,
            "notification received"
        );
        return None;
    }
    let id = request.id.unwrap_or(serde_json::Value::Null);

    let response = match request.method.as_str() {
        "initialize" => ok_json(id, &InitializeResult {
            protocol_version: PROTOCOL_VERSION.into(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: true }),
                resources: Some(ResourcesCapability { list_changed: true }),
            },
            server_info: ServerInfo {
                name: SERVER_NAME.into(),
                version: Some(env!("CARGO_PKG_VERSION").into()),
            },
        }),
        "ping" => JsonRpcResponse::result(id, serde_json::json!({})),
        "tools/list" => ok_json(id, &ToolsListResult {
            tools: state.tools.descriptors(),
        }),
        "tools/call" => {
            let params: ToolsCallParams =
                match serde_json::from_value(request.params.unwrap_or_default()) {
                    Ok(params) => params,
                    Err(e) => {
                        return Some(JsonRpcResponse::error(
                            id,
                            error_codes::INVALID_PARAMS,
                            format!("invalid tools/call params: {e}"),
                        ));
                    },
                };
            let ctx = ToolContext {
                session_id: conn.session_id.clone(),
                handle: Arc::clone(&conn.handle),
                resources: Arc::clone(&state.resources),
                notifier: Arc::clone(conn) as _,
            };
            let result = state.tools.dispatch(&params.name, params.arguments, &ctx).await;
            if result.is_error {
                warn!(
                    session_id = %conn.session_id,
                    tool = %params.name,
                    "tool call returned an error result"
                );
            }
            ok_json(id, &result)
        },
        "resources/list" => {
            let resources = state
                .resources
                .list(&conn.session_id)
                .into_iter()
                .map(|(name, mime_type)| ResourceDef {
                    uri: resource_uri(&conn.session_id, &name),
                    name,
                    mime_type: Some(mime_type),
                })
                .collect();
            ok_json(id, &ResourcesListResult { resources })
        },
        "resources/read" => {
            let params: ResourcesReadParams =
                match serde_json::from_value(request.params.unwrap_or_default()) {
                    Ok(params) => params,
                    Err(e) => {
                        return Some(JsonRpcResponse::error(
                            id,
                            error_codes::INVALID_PARAMS,
                            format!("invalid resources/read params: {e}"),
                        ));
                    },
                };
            read_resource(state, &conn.session_id, id, &params.uri)
        },
        other => JsonRpcResponse::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {other}"),
        ),
    };

    Some(response)
}

fn read_resource(
    state: &GatewayState,
    session_id: &str,
    id: serde_json::Value,
    uri: &str,
) -> JsonRpcResponse {
    let prefix = resource_uri(session_id, "");
    let stored = uri
        .strip_prefix(&prefix)
        .and_then(|name| state.resources.get(session_id, name).map(|r| (name, r)));
    match stored {
        Some((_, resource)) => ok_json(id, &ResourcesReadResult {
            contents: vec![ResourceContents {
                uri: uri.to_string(),
                mime_type: Some(resource.mime_type),
                blob: resource.data,
            }],
        }),
        None => JsonRpcResponse::error(
            id,
            error_codes::INVALID_PARAMS,
            format!("Resource not found: {uri}"),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use {
        selkie_automation::{AutomationError, AutomationHandle, AutomationProvider, Credentials},
        selkie_protocol::CallToolResult,
    };

    use crate::config::GatewayConfig;

    #[derive(Default)]
    struct StubHandle;

    #[async_trait::async_trait]
    impl AutomationHandle for StubHandle {
        async fn navigate(&self, _url: &str, _timeout_ms: u64) -> Result<(), AutomationError> {
            Ok(())
        }

        async fn act(
            &self,
            _action: &str,
            _variables: Option<&serde_json::Value>,
        ) -> Result<(), AutomationError> {
            Ok(())
        }

        async fn observe(&self, _instruction: &str) -> Result<serde_json::Value, AutomationError> {
            Ok(serde_json::Value::Null)
        }

        async fn body_text(&self) -> Result<String, AutomationError> {
            Ok("hello".into())
        }

        async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, AutomationError> {
            Ok(serde_json::Value::Null)
        }

        async fn screenshot(&self) -> Result<String, AutomationError> {
            Ok("aGk=".into())
        }

        async fn page_content(&self) -> Result<String, AutomationError> {
            Ok(String::new())
        }

        fn operation_log(&self) -> Vec<String> {
            Vec::new()
        }

        async fn close(&self) {}
    }

    struct StubProvider;

    #[async_trait::async_trait]
    impl AutomationProvider for StubProvider {
        async fn provision(
            &self,
            _credentials: &Credentials,
        ) -> Result<Arc<dyn AutomationHandle>, AutomationError> {
            Ok(Arc::new(StubHandle))
        }
    }

    fn fixture() -> (GatewayState, Arc<SseConnection>) {
        let state = GatewayState::new(GatewayConfig::default(), Arc::new(StubProvider)).unwrap();
        let (conn, _rx) = SseConnection::new("session-rpc".into(), Arc::new(StubHandle));
        (state, conn)
    }

    fn request(id: i64, method: &str, params: Option<serde_json::Value>) -> JsonRpcRequest {
        JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: Some(id.into()),
            method: method.into(),
            params,
        }
    }

    #[tokio::test]
    async fn initialize_advertises_capabilities() {
        let (state, conn) = fixture();
        let resp = handle_message(&state, &conn, request(1, "initialize", None))
            .await
            .unwrap();
        let result = resp.result.unwrap();
        assert_eq!(result["protocolVersion"], PROTOCOL_VERSION);
        assert_eq!(result["capabilities"]["tools"]["listChanged"], true);
        assert_eq!(result["serverInfo"]["name"], "selkie");
    }

    #[tokio::test]
    async fn notifications_get_no_response() {
        let (state, conn) = fixture();
        let req = JsonRpcRequest {
            jsonrpc: "2.0".into(),
            id: None,
            method: "notifications/initialized".into(),
            params: None,
        };
        assert!(handle_message(&state, &conn, req).await.is_none());
    }

    #[tokio::test]
    async fn unknown_method_is_rpc_error() {
        let (state, conn) = fixture();
        let resp = handle_message(&state, &conn, request(2, "does/not/exist", None))
            .await
            .unwrap();
        let error = resp.error.unwrap();
        assert_eq!(error.code, error_codes::METHOD_NOT_FOUND);
        assert!(error.message.contains("does/not/exist"));
    }

    #[tokio::test]
    async fn tools_list_matches_catalog() {
        let (state, conn) = fixture();
        let resp = handle_message(&state, &conn, request(3, "tools/list", None))
            .await
            .unwrap();
        let result: ToolsListResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.tools.len(), state.tools.len());
        assert_eq!(result.tools[0].name, "browser_navigate");
    }

    #[tokio::test]
    async fn unknown_tool_is_error_result_not_rpc_error() {
        let (state, conn) = fixture();
        let params = serde_json::json!({"name": "no_such_tool", "arguments": {}});
        let resp = handle_message(&state, &conn, request(4, "tools/call", Some(params)))
            .await
            .unwrap();
        assert!(resp.error.is_none());
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(result.is_error);
    }

    #[tokio::test]
    async fn malformed_call_params_are_invalid_params() {
        let (state, conn) = fixture();
        let params = serde_json::json!({"arguments": {}});
        let resp = handle_message(&state, &conn, request(5, "tools/call", Some(params)))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn resources_list_and_read_roundtrip() {
        let (state, conn) = fixture();
        state
            .resources
            .insert("session-rpc", "shot-1", "aGk=", "image/png");

        let resp = handle_message(&state, &conn, request(6, "resources/list", None))
            .await
            .unwrap();
        let list: ResourcesListResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(list.resources.len(), 1);
        assert_eq!(list.resources[0].uri, "screenshot://session-rpc/shot-1");

        let params = serde_json::json!({"uri": "screenshot://session-rpc/shot-1"});
        let resp = handle_message(&state, &conn, request(7, "resources/read", Some(params)))
            .await
            .unwrap();
        let read: ResourcesReadResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(read.contents[0].blob, "aGk=");
        assert_eq!(read.contents[0].mime_type.as_deref(), Some("image/png"));
    }

    #[tokio::test]
    async fn reading_missing_resource_is_an_error() {
        let (state, conn) = fixture();
        let params = serde_json::json!({"uri": "screenshot://session-rpc/nope"});
        let resp = handle_message(&state, &conn, request(8, "resources/read", Some(params)))
            .await
            .unwrap();
        assert_eq!(resp.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let (state, conn) = fixture();
        let resp = handle_message(&state, &conn, request(9, "ping", None))
            .await
            .unwrap();
        assert_eq!(resp.result.unwrap(), serde_json::json!({}));
    }
}
