//! Core browser tools: navigation, instruction-driven actions, extraction,
//! observation, screenshots, and script evaluation.
//!
//! Failure contract: every engine fault is converted to an error envelope
//! here. Instruction-driven tools (`browser_act`, `browser_observe`) and
//! `screenshot` also attach the recent operation log to failures so the
//! caller can see what the engine attempted.

use {async_trait::async_trait, serde::Deserialize, serde_json::json, tracing::info};

use {
    selkie_automation::{AutomationHandle, text::filter_extracted_text},
    selkie_protocol::{CallToolResult, ToolContent},
};

use crate::registry::{SessionTool, ToolContext, parse_args};

/// The core tool set, in catalog order.
pub fn core_tools(navigation_timeout_ms: u64) -> Vec<Box<dyn SessionTool>> {
    vec![
        Box::new(NavigateTool {
            default_timeout_ms: navigation_timeout_ms,
        }),
        Box::new(ActTool),
        Box::new(ExtractTool),
        Box::new(ObserveTool),
        Box::new(ScreenshotTool),
        Box::new(EvaluateTool),
        Box::new(PingTool),
    ]
}

/// Error envelope with the operation log attached.
fn failure_with_log(message: impl Into<String>, handle: &dyn AutomationHandle) -> CallToolResult {
    CallToolResult {
        content: vec![
            ToolContent::text(message),
            ToolContent::text(format!(
                "Operation log:\n{}",
                handle.operation_log().join("\n")
            )),
        ],
        is_error: true,
    }
}

// ── browser_navigate ────────────────────────────────────────────────

pub struct NavigateTool {
    default_timeout_ms: u64,
}

#[derive(Deserialize)]
struct NavigateArgs {
    url: String,
    #[serde(default)]
    timeout_ms: Option<u64>,
}

#[async_trait]
impl SessionTool for NavigateTool {
    fn name(&self) -> &str {
        "browser_navigate"
    }

    fn description(&self) -> &str {
        "Navigate to a URL in the browser. Only use this with URLs you're confident \
         will work and stay up to date; otherwise start from https://google.com"
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "url": { "type": "string", "description": "The URL to navigate to" },
                "timeout_ms": {
                    "type": "integer",
                    "description": "Upper bound on page-load wait, in milliseconds"
                }
            },
            "required": ["url"]
        })
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        let args: NavigateArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        let timeout_ms = args.timeout_ms.unwrap_or(self.default_timeout_ms);
        match ctx.handle.navigate(&args.url, timeout_ms).await {
            Ok(()) => CallToolResult::text(format!("Navigated to: {}", args.url)),
            Err(e) => CallToolResult::failure(format!("Failed to navigate: {e}")),
        }
    }
}

// ── browser_act ─────────────────────────────────────────────────────

pub struct ActTool;

#[derive(Deserialize)]
struct ActArgs {
    action: String,
    #[serde(default)]
    variables: Option<serde_json::Value>,
}

#[async_trait]
impl SessionTool for ActTool {
    fn name(&self) -> &str {
        "browser_act"
    }

    fn description(&self) -> &str {
        "Perform an action on a page element. Actions should be atomic and specific, \
         like \"Click the sign in button\" or \"Type 'hello' into the search input\". \
         Avoid multi-step actions like \"Order me pizza\"."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "description": "The action to perform, as atomic and specific as possible, \
                        with a strong correlation to text on the page. If unsure, observe first."
                },
                "variables": {
                    "type": "object",
                    "additionalProperties": true,
                    "description": "Substitution variables for the action template. Use only for \
                        sensitive or dynamic values, and reference the key in the action text."
                }
            },
            "required": ["action"]
        })
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        let args: ActArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        match ctx.handle.act(&args.action, args.variables.as_ref()).await {
            Ok(()) => CallToolResult::text(format!("Action performed: {}", args.action)),
            Err(e) => failure_with_log(
                format!("Failed to perform action: {e}"),
                ctx.handle.as_ref(),
            ),
        }
    }
}

// ── browser_extract ─────────────────────────────────────────────────

pub struct ExtractTool;

#[derive(Deserialize)]
struct ExtractArgs {
    #[serde(default)]
    #[allow(dead_code)]
    summary: Option<String>,
}

#[async_trait]
impl SessionTool for ExtractTool {
    fn name(&self) -> &str {
        "browser_extract"
    }

    fn description(&self) -> &str {
        "Extract all text from the current page, with styling noise filtered out."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "One sentence capturing the main objective to extract"
                }
            },
            "required": ["summary"]
        })
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        let _args: ExtractArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        match ctx.handle.body_text().await {
            Ok(raw) => {
                let lines = filter_extracted_text(&raw);
                CallToolResult::text(format!("Extracted content:\n{}", lines.join("\n")))
            },
            Err(e) => CallToolResult::failure(format!("Failed to extract content: {e}")),
        }
    }
}

// ── browser_observe ─────────────────────────────────────────────────

pub struct ObserveTool;

#[derive(Deserialize)]
struct ObserveArgs {
    instruction: String,
}

#[async_trait]
impl SessionTool for ObserveTool {
    fn name(&self) -> &str {
        "browser_observe"
    }

    fn description(&self) -> &str {
        "Observe actionable elements on the page for later use in an action. Prefer \
         extract over observe when scraping text rather than interacting."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "instruction": {
                    "type": "string",
                    "description": "Very specific observation instruction, \
                        e.g. 'find the login button'"
                }
            },
            "required": ["instruction"]
        })
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        let args: ObserveArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        match ctx.handle.observe(&args.instruction).await {
            Ok(observations) => {
                CallToolResult::text(format!("Observations: {observations}"))
            },
            Err(e) => failure_with_log(format!("Failed to observe: {e}"), ctx.handle.as_ref()),
        }
    }
}

// ── screenshot ──────────────────────────────────────────────────────

pub struct ScreenshotTool;

#[derive(Deserialize)]
struct ScreenshotArgs {
    #[serde(default)]
    #[allow(dead_code)]
    summary: Option<String>,
}

#[async_trait]
impl SessionTool for ScreenshotTool {
    fn name(&self) -> &str {
        "screenshot"
    }

    fn description(&self) -> &str {
        "Take a screenshot of the current page to see where you are. Use only when \
         the other tools are not sufficient."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "summary": {
                    "type": "string",
                    "description": "One sentence capturing what to check on the page"
                }
            }
        })
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        let _args: ScreenshotArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        match ctx.handle.screenshot().await {
            Ok(data) => {
                let name = format!(
                    "screenshot-{}",
                    chrono::Utc::now().to_rfc3339().replace(':', "-")
                );
                // Stored before the result is returned, then the connection
                // is told its resource list changed.
                ctx.resources
                    .insert(&ctx.session_id, &name, data.clone(), "image/png");
                ctx.notifier.resources_changed();
                info!(session_id = %ctx.session_id, name = %name, "screenshot stored");
                CallToolResult::success(vec![
                    ToolContent::text(format!("Screenshot taken with name: {name}")),
                    ToolContent::png(data),
                ])
            },
            Err(e) => failure_with_log(
                format!("Failed to take screenshot: {e}"),
                ctx.handle.as_ref(),
            ),
        }
    }
}

// ── browser_evaluate ────────────────────────────────────────────────

pub struct EvaluateTool;

#[derive(Deserialize)]
struct EvaluateArgs {
    script: String,
}

#[async_trait]
impl SessionTool for EvaluateTool {
    fn name(&self) -> &str {
        "browser_evaluate"
    }

    fn description(&self) -> &str {
        "Evaluate arbitrary JavaScript in the page context and return the result."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "script": {
                    "type": "string",
                    "description": "JavaScript to execute in the browser context"
                }
            },
            "required": ["script"]
        })
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        let args: EvaluateArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        match ctx.handle.evaluate(&args.script).await {
            Ok(result) => {
                let rendered = serde_json::to_string_pretty(&result)
                    .unwrap_or_else(|_| result.to_string());
                CallToolResult::text(format!("Result:\n{rendered}"))
            },
            Err(e) => CallToolResult::failure(format!("Failed to evaluate script: {e}")),
        }
    }
}

// ── ping ────────────────────────────────────────────────────────────

pub struct PingTool;

#[async_trait]
impl SessionTool for PingTool {
    fn name(&self) -> &str {
        "ping"
    }

    fn description(&self) -> &str {
        "Liveness check for the tool channel."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: serde_json::Value, _ctx: &ToolContext) -> CallToolResult {
        CallToolResult::text("pong")
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, atomic::Ordering};

    use super::*;
    use crate::testing::{CountingNotifier, FakeHandle, context_with};

    fn text_of(result: &CallToolResult, index: usize) -> &str {
        match &result.content[index] {
            ToolContent::Text { text } => text,
            other => panic!("expected text content, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn navigate_success_names_url() {
        let handle = Arc::new(FakeHandle::default());
        let ctx = context_with(handle.clone(), Arc::new(CountingNotifier::default()));
        let tool = NavigateTool {
            default_timeout_ms: 60_000,
        };

        let result = tool
            .call(json!({"url": "https://example.com"}), &ctx)
            .await;
        assert!(!result.is_error);
        assert_eq!(text_of(&result, 0), "Navigated to: https://example.com");
        assert_eq!(
            handle.calls.lock().unwrap().as_slice(),
            ["navigate:https://example.com"]
        );
    }

    #[tokio::test]
    async fn navigate_missing_url_is_validation_failure() {
        let handle = Arc::new(FakeHandle::default());
        let ctx = context_with(handle.clone(), Arc::new(CountingNotifier::default()));
        let tool = NavigateTool {
            default_timeout_ms: 60_000,
        };

        let result = tool.call(json!({}), &ctx).await;
        assert!(result.is_error);
        assert!(text_of(&result, 0).contains("Invalid arguments for browser_navigate"));
        // The handle was never touched.
        assert!(handle.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn act_failure_attaches_operation_log() {
        let handle = Arc::new(FakeHandle {
            fail_with: Some("element not found".into()),
            log_lines: vec!["act: Click the button".into(), "act: HTTP 500".into()],
            ..FakeHandle::default()
        });
        let ctx = context_with(handle, Arc::new(CountingNotifier::default()));

        let result = ActTool
            .call(json!({"action": "Click the button"}), &ctx)
            .await;
        assert!(result.is_error);
        assert_eq!(result.content.len(), 2);
        assert!(text_of(&result, 0).contains("Failed to perform action"));
        assert!(text_of(&result, 1).contains("Operation log:"));
        assert!(text_of(&result, 1).contains("act: Click the button"));
    }

    #[tokio::test]
    async fn extract_applies_filter_policy() {
        let handle = Arc::new(FakeHandle {
            body_text: "color: blue;\n.foo {\nHello world\n\n".into(),
            ..FakeHandle::default()
        });
        let ctx = context_with(handle, Arc::new(CountingNotifier::default()));

        let result = ExtractTool
            .call(json!({"summary": "everything"}), &ctx)
            .await;
        assert!(!result.is_error);
        assert_eq!(text_of(&result, 0), "Extracted content:\nHello world");
    }

    #[tokio::test]
    async fn extract_failure_has_no_log_excerpt() {
        let handle = Arc::new(FakeHandle {
            fail_with: Some("page gone".into()),
            ..FakeHandle::default()
        });
        let ctx = context_with(handle, Arc::new(CountingNotifier::default()));

        let result = ExtractTool.call(json!({}), &ctx).await;
        assert!(result.is_error);
        assert_eq!(result.content.len(), 1);
    }

    #[tokio::test]
    async fn observe_failure_attaches_operation_log() {
        let handle = Arc::new(FakeHandle {
            fail_with: Some("model refused".into()),
            log_lines: vec!["observe: find the login button".into()],
            ..FakeHandle::default()
        });
        let ctx = context_with(handle, Arc::new(CountingNotifier::default()));

        let result = ObserveTool
            .call(json!({"instruction": "find the login button"}), &ctx)
            .await;
        assert!(result.is_error);
        assert!(text_of(&result, 1).contains("find the login button"));
    }

    #[tokio::test]
    async fn screenshot_stores_resource_and_notifies() {
        let handle = Arc::new(FakeHandle {
            screenshot_data: "aGVsbG8=".into(),
            ..FakeHandle::default()
        });
        let notifier = Arc::new(CountingNotifier::default());
        let ctx = context_with(handle, notifier.clone());

        let result = ScreenshotTool.call(serde_json::Value::Null, &ctx).await;
        assert!(!result.is_error);
        assert_eq!(result.content.len(), 2);
        assert!(matches!(
            result.content[1],
            ToolContent::Image { ref mime_type, .. } if mime_type == "image/png"
        ));

        let stored = ctx.resources.list("session-test");
        assert_eq!(stored.len(), 1);
        assert!(stored[0].0.starts_with("screenshot-"));
        assert_eq!(notifier.count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn screenshot_failure_stores_nothing() {
        let handle = Arc::new(FakeHandle {
            fail_with: Some("no page".into()),
            ..FakeHandle::default()
        });
        let notifier = Arc::new(CountingNotifier::default());
        let ctx = context_with(handle, notifier.clone());

        let result = ScreenshotTool.call(serde_json::Value::Null, &ctx).await;
        assert!(result.is_error);
        assert!(ctx.resources.list("session-test").is_empty());
        assert_eq!(notifier.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn evaluate_pretty_prints_result() {
        let handle = Arc::new(FakeHandle {
            eval_result: json!({"n": 1}),
            ..FakeHandle::default()
        });
        let ctx = context_with(handle, Arc::new(CountingNotifier::default()));

        let result = EvaluateTool
            .call(json!({"script": "({n: 1})"}), &ctx)
            .await;
        assert!(!result.is_error);
        assert!(text_of(&result, 0).starts_with("Result:\n"));
        assert!(text_of(&result, 0).contains("\"n\": 1"));
    }

    #[tokio::test]
    async fn ping_answers_without_touching_handle() {
        let handle = Arc::new(FakeHandle::default());
        let ctx = context_with(handle.clone(), Arc::new(CountingNotifier::default()));

        let result = PingTool.call(serde_json::Value::Null, &ctx).await;
        assert!(!result.is_error);
        assert_eq!(text_of(&result, 0), "pong");
        assert!(handle.calls.lock().unwrap().is_empty());
    }
}
