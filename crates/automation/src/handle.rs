//! Trait seams between the gateway and the automation engine.

use std::sync::Arc;

use async_trait::async_trait;

use crate::{credentials::Credentials, error::AutomationError};

/// One provisioned browser session, exclusively owned by one SSE session.
///
/// Every method suspends while the engine works; faults surface as
/// [`AutomationError`] and are converted to tool-result envelopes at the
/// dispatch boundary, never propagated past it.
#[async_trait]
pub trait AutomationHandle: Send + Sync {
    /// Navigate to a URL, waiting at most `timeout_ms` for the page to load.
    async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<(), AutomationError>;

    /// Perform a natural-language action ("Click the sign in button").
    async fn act(
        &self,
        action: &str,
        variables: Option<&serde_json::Value>,
    ) -> Result<(), AutomationError>;

    /// Observe elements matching a natural-language instruction.
    async fn observe(&self, instruction: &str) -> Result<serde_json::Value, AutomationError>;

    /// Raw `document.body.innerText` of the current page.
    async fn body_text(&self) -> Result<String, AutomationError>;

    /// Evaluate JavaScript in the page context.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AutomationError>;

    /// Capture a viewport screenshot as base64 PNG.
    async fn screenshot(&self) -> Result<String, AutomationError>;

    /// Full HTML of the current page.
    async fn page_content(&self) -> Result<String, AutomationError>;

    /// Recent engine log lines, oldest first. Appended to failure results
    /// for instruction-driven operations.
    fn operation_log(&self) -> Vec<String>;

    /// Tear down the engine session. Errors are logged, not surfaced.
    async fn close(&self);
}

/// Provisions a fresh engine session for validated credentials.
#[async_trait]
pub trait AutomationProvider: Send + Sync {
    async fn provision(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn AutomationHandle>, AutomationError>;
}
