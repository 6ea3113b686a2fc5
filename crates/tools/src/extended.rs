//! Page-inspection tools: structural detectors and diagnostics that ride on
//! script evaluation and raw page content. No natural-language resolution
//! is involved, so failures carry only the error message.

use {async_trait::async_trait, serde::Deserialize, serde_json::json};

use selkie_protocol::{CallToolResult, ToolContent};

use crate::registry::{SessionTool, ToolContext, parse_args};

/// The inspection tool set, in catalog order.
pub fn inspection_tools() -> Vec<Box<dyn SessionTool>> {
    vec![
        Box::new(DetectFormsTool),
        Box::new(DetectCtasTool),
        Box::new(DetectProductsTool),
        Box::new(SnapshotDomTool),
        Box::new(PageMetricsTool),
        Box::new(DetectScrollersTool),
        Box::new(TrackEventsTool),
        Box::new(TrackedEventsTool),
    ]
}

const DETECT_FORMS_SCRIPT: &str = r#"
Array.from(document.querySelectorAll('form')).map(form => ({
  id: form.id || null,
  action: form.getAttribute('action'),
  method: form.method,
  fields: Array.from(form.elements).map(el => ({
    tag: el.tagName.toLowerCase(),
    type: el.type || null,
    name: el.name || null,
    placeholder: el.placeholder || null,
    required: !!el.required,
  })),
}))
"#;

const DETECT_CTAS_SCRIPT: &str = r#"
Array.from(document.querySelectorAll("a, button, input[type='button'], input[type='submit']"))
  .map(el => {
    const rect = el.getBoundingClientRect();
    return {
      tag: el.tagName.toLowerCase(),
      text: (el.innerText || el.value || '').trim(),
      classList: Array.from(el.classList),
      href: el.getAttribute('href'),
      visible: rect.width > 0 && rect.height > 0,
      boundingBox: { x: rect.x, y: rect.y, width: rect.width, height: rect.height },
    };
  })
"#;

const PAGE_METRICS_SCRIPT: &str = r#"
({
  timing: JSON.parse(JSON.stringify(window.performance.timing)),
  resources: performance.getEntriesByType('resource').map(r => ({
    name: r.name,
    entryType: r.entryType,
    startTime: r.startTime,
    duration: r.duration,
    initiatorType: r.initiatorType,
  })),
})
"#;

const DETECT_SCROLLERS_SCRIPT: &str = r#"
Array.from(document.querySelectorAll('*'))
  .filter(n => {
    const s = window.getComputedStyle(n);
    return (s.overflowY === 'scroll' || s.overflowY === 'auto')
      && n.scrollHeight > n.clientHeight;
  })
  .map(n => {
    const rect = n.getBoundingClientRect();
    return {
      id: n.id || null,
      boundingBox: { x: rect.x, y: rect.y, width: rect.width, height: rect.height },
    };
  })
"#;

const TRACK_EVENTS_SCRIPT: &str = r#"
(() => {
  window.__selkieTrackedEvents = [];
  const orig = EventTarget.prototype.addEventListener;
  EventTarget.prototype.addEventListener = function (type, listener, opts) {
    const tag = this.tagName || this.constructor.name;
    window.__selkieTrackedEvents.push({ target: tag, type });
    return orig.call(this, type, listener, opts);
  };
  return true;
})()
"#;

const TRACKED_EVENTS_SCRIPT: &str = "window.__selkieTrackedEvents || []";

/// Evaluate a script and render the outcome as pretty-printed JSON text.
async fn evaluate_to_json_text(
    tool: &str,
    script: &str,
    ctx: &ToolContext,
) -> CallToolResult {
    match ctx.handle.evaluate(script).await {
        Ok(value) => {
            let rendered =
                serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string());
            CallToolResult::text(rendered)
        },
        Err(e) => CallToolResult::failure(format!("Error in {tool}: {e}")),
    }
}

// ── browser_detect_forms ────────────────────────────────────────────

pub struct DetectFormsTool;

#[async_trait]
impl SessionTool for DetectFormsTool {
    fn name(&self) -> &str {
        "browser_detect_forms"
    }

    fn description(&self) -> &str {
        "Detect all forms on the page, including inputs, selects, textareas, and \
         their attributes."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        evaluate_to_json_text(self.name(), DETECT_FORMS_SCRIPT, ctx).await
    }
}

// ── browser_detect_ctas ─────────────────────────────────────────────

pub struct DetectCtasTool;

#[async_trait]
impl SessionTool for DetectCtasTool {
    fn name(&self) -> &str {
        "browser_detect_ctas"
    }

    fn description(&self) -> &str {
        "Detect visible buttons and calls to action, with text, CSS classes, \
         position, and visibility."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        evaluate_to_json_text(self.name(), DETECT_CTAS_SCRIPT, ctx).await
    }
}

// ── browser_detect_products ─────────────────────────────────────────

pub struct DetectProductsTool;

#[derive(Deserialize)]
struct DetectProductsArgs {
    #[serde(default)]
    hints: Vec<String>,
}

#[async_trait]
impl SessionTool for DetectProductsTool {
    fn name(&self) -> &str {
        "browser_detect_products"
    }

    fn description(&self) -> &str {
        "Detect e-commerce product listings with name, price, availability, image, \
         and link where available."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({
            "type": "object",
            "properties": {
                "hints": {
                    "type": "array",
                    "items": { "type": "string" },
                    "description": "Keywords like 'price' or 'product' to focus the scan"
                }
            }
        })
    }

    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        let args: DetectProductsArgs = match parse_args(self.name(), args) {
            Ok(args) => args,
            Err(failure) => return failure,
        };
        let hints = match serde_json::to_string(&args.hints) {
            Ok(hints) => hints,
            Err(e) => {
                return CallToolResult::failure(format!(
                    "Invalid arguments for {}: {e}",
                    self.name()
                ));
            },
        };
        let script = format!(
            r#"
(() => {{
  const hints = {hints}.map(h => h.toLowerCase());
  return Array.from(document.querySelectorAll('div, section, article, li'))
    .filter(el => {{
      if (hints.length === 0) return false;
      const txt = (el.textContent || '').toLowerCase();
      return hints.some(h => txt.includes(h));
    }})
    .map(el => {{
      const img = el.querySelector('img');
      const link = el.querySelector('a');
      const price = el.querySelector('.price');
      const availability = el.querySelector('.availability');
      const quantity = el.querySelector("input[type='number']");
      return {{
        id: el.id || null,
        classList: Array.from(el.classList),
        text: (el.textContent || '').trim() || null,
        price: price ? price.innerText.trim() : null,
        availability: availability ? availability.innerText.trim() : null,
        quantity: quantity ? quantity.value : null,
        image: img ? img.getAttribute('src') : null,
        link: link ? link.getAttribute('href') : null,
      }};
    }});
}})()
"#
        );
        evaluate_to_json_text(self.name(), &script, ctx).await
    }
}

// ── browser_snapshot_dom ────────────────────────────────────────────

pub struct SnapshotDomTool;

#[async_trait]
impl SessionTool for SnapshotDomTool {
    fn name(&self) -> &str {
        "browser_snapshot_dom"
    }

    fn description(&self) -> &str {
        "Capture the full page DOM as JSON for structural analysis or version \
         comparison."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        match ctx.handle.page_content().await {
            Ok(html) => CallToolResult::success(vec![ToolContent::json_resource(
                json!({ "dom": html }),
            )]),
            Err(e) => CallToolResult::failure(format!("Error in {}: {e}", self.name())),
        }
    }
}

// ── browser_page_metrics ────────────────────────────────────────────

pub struct PageMetricsTool;

#[async_trait]
impl SessionTool for PageMetricsTool {
    fn name(&self) -> &str {
        "browser_page_metrics"
    }

    fn description(&self) -> &str {
        "Collect page-load metrics: navigation timing and per-resource load entries."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        match ctx.handle.evaluate(PAGE_METRICS_SCRIPT).await {
            Ok(metrics) => {
                CallToolResult::success(vec![ToolContent::json_resource(metrics)])
            },
            Err(e) => CallToolResult::failure(format!("Error in {}: {e}", self.name())),
        }
    }
}

// ── browser_detect_scrollers ────────────────────────────────────────

pub struct DetectScrollersTool;

#[async_trait]
impl SessionTool for DetectScrollersTool {
    fn name(&self) -> &str {
        "browser_detect_scrollers"
    }

    fn description(&self) -> &str {
        "Find scrollable containers on the page with their bounding boxes."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        evaluate_to_json_text(self.name(), DETECT_SCROLLERS_SCRIPT, ctx).await
    }
}

// ── browser_track_events / browser_tracked_events ───────────────────

pub struct TrackEventsTool;

#[async_trait]
impl SessionTool for TrackEventsTool {
    fn name(&self) -> &str {
        "browser_track_events"
    }

    fn description(&self) -> &str {
        "Install an event-listener tracker in the page; read results with \
         browser_tracked_events."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        match ctx.handle.evaluate(TRACK_EVENTS_SCRIPT).await {
            Ok(_) => CallToolResult::text("Event tracker installed"),
            Err(e) => CallToolResult::failure(format!("Error in {}: {e}", self.name())),
        }
    }
}

pub struct TrackedEventsTool;

#[async_trait]
impl SessionTool for TrackedEventsTool {
    fn name(&self) -> &str {
        "browser_tracked_events"
    }

    fn description(&self) -> &str {
        "Read the events recorded since browser_track_events was installed."
    }

    fn input_schema(&self) -> serde_json::Value {
        json!({ "type": "object", "properties": {} })
    }

    async fn call(&self, _args: serde_json::Value, ctx: &ToolContext) -> CallToolResult {
        match ctx.handle.evaluate(TRACKED_EVENTS_SCRIPT).await {
            Ok(events) => {
                CallToolResult::success(vec![ToolContent::json_resource(events)])
            },
            Err(e) => CallToolResult::failure(format!("Error in {}: {e}", self.name())),
        }
    }
}
