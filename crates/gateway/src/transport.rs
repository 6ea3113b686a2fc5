//! Per-connection SSE plumbing.
//!
//! Each live `GET /sse` stream owns one [`SseConnection`]: the session
//! identity, the provisioned automation handle, and the outbound frame
//! queue. Teardown is one-shot regardless of how the stream ends.

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use {
    tokio::sync::mpsc,
    tracing::{debug, info, warn},
};

use {
    selkie_automation::AutomationHandle,
    selkie_protocol::{JsonRpcNotification, JsonRpcResponse, RESOURCES_LIST_CHANGED},
    selkie_tools::{ChangeNotifier, ResourceStore},
};

use crate::registry::SessionRegistry;

/// One server-sent event queued for delivery on a session's stream.
#[derive(Debug)]
pub struct SseFrame {
    pub event: &'static str,
    pub data: String,
}

/// State owned by one live SSE connection.
pub struct SseConnection {
    pub session_id: String,
    pub handle: Arc<dyn AutomationHandle>,
    sender: mpsc::UnboundedSender<SseFrame>,
    closed: AtomicBool,
}

impl SseConnection {
    pub fn new(
        session_id: String,
        handle: Arc<dyn AutomationHandle>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<SseFrame>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let conn = Arc::new(Self {
            session_id,
            handle,
            sender,
            closed: AtomicBool::new(false),
        });
        (conn, receiver)
    }

    /// Whether the stream can still accept frames.
    pub fn is_writable(&self) -> bool {
        !self.closed.load(Ordering::SeqCst) && !self.sender.is_closed()
    }

    fn send_frame(&self, frame: SseFrame) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if self.sender.send(frame).is_err() {
            debug!(session_id = %self.session_id, "dropping frame for closed stream");
        }
    }

    /// First frame on every stream: where to post messages for this session.
    pub fn send_endpoint(&self) {
        self.send_frame(SseFrame {
            event: "endpoint",
            data: format!("/messages?sessionId={}", self.session_id),
        });
    }

    pub fn send_response(&self, response: &JsonRpcResponse) {
        match serde_json::to_string(response) {
            Ok(data) => self.send_frame(SseFrame {
                event: "message",
                data,
            }),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "failed to serialize response")
            },
        }
    }

    pub fn send_notification(&self, notification: &JsonRpcNotification) {
        match serde_json::to_string(notification) {
            Ok(data) => self.send_frame(SseFrame {
                event: "message",
                data,
            }),
            Err(e) => {
                warn!(session_id = %self.session_id, error = %e, "failed to serialize notification")
            },
        }
    }

    /// Flip the connection closed. Returns true exactly once.
    fn mark_closed(&self) -> bool {
        !self.closed.swap(true, Ordering::SeqCst)
    }
}

impl ChangeNotifier for SseConnection {
    fn resources_changed(&self) {
        self.send_notification(&JsonRpcNotification::new(RESOURCES_LIST_CHANGED));
    }
}

/// Tears the session down when the SSE stream is dropped: deregister,
/// evict stored resources, release the automation handle. Runs once even
/// if teardown was already triggered elsewhere.
pub struct CleanupGuard {
    conn: Arc<SseConnection>,
    registry: Arc<SessionRegistry>,
    resources: Arc<ResourceStore>,
}

impl CleanupGuard {
    pub fn new(
        conn: Arc<SseConnection>,
        registry: Arc<SessionRegistry>,
        resources: Arc<ResourceStore>,
    ) -> Self {
        Self {
            conn,
            registry,
            resources,
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if !self.conn.mark_closed() {
            return;
        }
        let session_id = self.conn.session_id.clone();
        self.registry.remove(&session_id);
        let evicted = self.resources.evict_session(&session_id);
        info!(session_id = %session_id, evicted_resources = evicted, "session closed");

        let handle = Arc::clone(&self.conn.handle);
        tokio::spawn(async move {
            handle.close().await;
        });
    }
}
