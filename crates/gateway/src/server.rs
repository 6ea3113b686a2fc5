//! HTTP surface: `GET /sse`, `POST /messages`, health endpoints.

use std::{collections::HashMap, convert::Infallible, pin::Pin, sync::Arc, task::Poll};

use {
    anyhow::{Context, Result},
    axum::{
        Router,
        extract::{Query, State},
        http::{HeaderMap, StatusCode},
        response::{
            IntoResponse, Response,
            sse::{Event, KeepAlive, Sse},
        },
        routing::{get, post},
    },
    futures::Stream,
    tokio_stream::{StreamExt, wrappers::UnboundedReceiverStream},
    tower_http::cors::{Any, CorsLayer},
    tracing::{error, info, warn},
    uuid::Uuid,
};

use selkie_protocol::{JsonRpcRequest, JsonRpcResponse, error_codes};

use crate::{
    credentials,
    rpc,
    state::GatewayState,
    transport::{CleanupGuard, SseConnection, SseFrame},
};

/// Event stream that tears the session down when the client goes away.
struct SessionStream<S> {
    inner: S,
    _guard: CleanupGuard,
}

impl<S> Stream for SessionStream<S>
where
    S: Stream<Item = Result<Event, Infallible>> + Unpin,
{
    type Item = Result<Event, Infallible>;

    fn poll_next(
        mut self: Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}

async fn sse_handler(
    State(state): State<GatewayState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
) -> Response {
    let creds = credentials::resolve(&query, &headers, &state.config.env_credentials);
    let missing = creds.missing_fields();
    if !missing.is_empty() {
        warn!(missing = ?missing, "rejecting connection with incomplete credentials");
        return (
            StatusCode::UNAUTHORIZED,
            format!("Missing required credentials: {}", missing.join(", ")),
        )
            .into_response();
    }

    let handle = match state.provider.provision(&creds).await {
        Ok(handle) => handle,
        Err(e) => {
            error!(error = %e, "failed to provision automation session");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to provision automation session: {e}"),
            )
                .into_response();
        },
    };

    let session_id = Uuid::new_v4().to_string();
    let (conn, receiver) = SseConnection::new(session_id.clone(), handle);
    state.registry.insert(Arc::clone(&conn));
    info!(session_id = %session_id, sessions = state.registry.len(), "session connected");

    conn.send_endpoint();

    let guard = CleanupGuard::new(
        conn,
        Arc::clone(&state.registry),
        Arc::clone(&state.resources),
    );
    let frames = UnboundedReceiverStream::new(receiver)
        .map(|frame: SseFrame| Ok(Event::default().event(frame.event).data(frame.data)));
    let stream = SessionStream {
        inner: frames,
        _guard: guard,
    };

    Sse::new(stream).keep_alive(KeepAlive::default()).into_response()
}

async fn messages_handler(
    State(state): State<GatewayState>,
    Query(query): Query<HashMap<String, String>>,
    body: String,
) -> Response {
    let Some(session_id) = query.get("sessionId").filter(|v| !v.is_empty()) else {
        return (StatusCode::BAD_REQUEST, "Missing sessionId parameter").into_response();
    };

    let conn = match state.registry.get(session_id) {
        Some(conn) if conn.is_writable() => conn,
        _ => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                format!("No active SSE connection for session {session_id}"),
            )
                .into_response();
        },
    };

    let request: JsonRpcRequest = match serde_json::from_str(&body) {
        Ok(request) => request,
        Err(e) => {
            conn.send_response(&JsonRpcResponse::error(
                serde_json::Value::Null,
                error_codes::PARSE_ERROR,
                format!("parse error: {e}"),
            ));
            return (
                StatusCode::BAD_REQUEST,
                format!("Invalid JSON-RPC message: {e}"),
            )
                .into_response();
        },
    };

    // Respond out of band: the HTTP reply only acknowledges receipt, the
    // JSON-RPC response travels back over the session's event stream.
    tokio::spawn(async move {
        if let Some(response) = rpc::handle_message(&state, &conn, request).await {
            conn.send_response(&response);
        }
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}

async fn health() -> &'static str {
    "ok"
}

async fn banner() -> &'static str {
    concat!("selkie gateway v", env!("CARGO_PKG_VERSION"))
}

/// Assemble the router over shared gateway state.
pub fn build_app(state: GatewayState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(banner))
        .route("/health", get(health))
        .route("/sse", get(sse_handler))
        .route("/messages", post(messages_handler))
        .layer(cors)
        .with_state(state)
}

/// Bind and serve until the process is stopped.
pub async fn start(state: GatewayState) -> Result<()> {
    let addr = format!("{}:{}", state.config.bind, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    info!(%addr, "gateway listening");
    info!("  SSE endpoint:     GET  /sse");
    info!("  Message endpoint: POST /messages?sessionId=<id>");

    axum::serve(listener, build_app(state))
        .await
        .context("server terminated")
}
