//! Tool trait, dispatch context, and the name → handler registry.

use std::{collections::HashMap, sync::Arc};

use {
    anyhow::{Result, bail},
    async_trait::async_trait,
    serde::de::DeserializeOwned,
    tracing::debug,
};

use {
    selkie_automation::AutomationHandle,
    selkie_protocol::{CallToolResult, ToolDef},
};

use crate::resources::ResourceStore;

/// Fire-and-forget signal to the owning connection that the session's
/// resource list changed. Independent of the tool result.
pub trait ChangeNotifier: Send + Sync {
    fn resources_changed(&self);
}

/// Per-dispatch context: the session identity, its exclusively-owned
/// automation handle, and the session-scoped side-effect channels.
pub struct ToolContext {
    pub session_id: String,
    pub handle: Arc<dyn AutomationHandle>,
    pub resources: Arc<ResourceStore>,
    pub notifier: Arc<dyn ChangeNotifier>,
}

/// A tool callable through the dispatcher.
///
/// `call` must always resolve to a [`CallToolResult`]; implementations catch
/// their own faults and never panic or return early without content.
#[async_trait]
pub trait SessionTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> serde_json::Value;
    async fn call(&self, args: serde_json::Value, ctx: &ToolContext) -> CallToolResult;
}

/// Deserialize a tool's declared argument shape.
///
/// A malformed shape is a validation failure, reported distinctly from an
/// operation fault; a null/absent argument object is treated as empty.
pub(crate) fn parse_args<T: DeserializeOwned>(
    tool: &str,
    args: serde_json::Value,
) -> Result<T, CallToolResult> {
    let args = if args.is_null() {
        serde_json::json!({})
    } else {
        args
    };
    serde_json::from_value(args)
        .map_err(|e| CallToolResult::failure(format!("Invalid arguments for {tool}: {e}")))
}

/// Ordered registry of tools; the discovery catalog and the dispatch table
/// are the same structure, so they can never disagree.
#[derive(Default)]
pub struct ToolRegistry {
    order: Vec<String>,
    tools: HashMap<String, Arc<dyn SessionTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Duplicate names are a configuration error and fail
    /// loudly instead of shadowing an earlier entry.
    pub fn register(&mut self, tool: Box<dyn SessionTool>) -> Result<()> {
        let name = tool.name().to_string();
        if self.tools.contains_key(&name) {
            bail!("duplicate tool name in catalog: {name}");
        }
        self.order.push(name.clone());
        self.tools.insert(name, Arc::from(tool));
        Ok(())
    }

    /// The discovery catalog, in registration order.
    pub fn descriptors(&self) -> Vec<ToolDef> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDef {
                name: tool.name().to_string(),
                description: Some(tool.description().to_string()),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Execute one tool call. Exactly one result per call; an unrecognized
    /// name yields an error result naming the tool, never a fault.
    pub async fn dispatch(
        &self,
        name: &str,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> CallToolResult {
        let Some(tool) = self.tools.get(name) else {
            return CallToolResult::failure(format!("Unknown tool: {name}"));
        };
        debug!(session_id = %ctx.session_id, tool = %name, "dispatching tool call");
        tool.call(args, ctx).await
    }
}

/// Build the full catalog: core browser tools plus the page-inspection set.
/// Fails if any two tools declare the same name.
pub fn default_registry(navigation_timeout_ms: u64) -> Result<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    for tool in crate::browser::core_tools(navigation_timeout_ms) {
        registry.register(tool)?;
    }
    for tool in crate::extended::inspection_tools() {
        registry.register(tool)?;
    }
    Ok(registry)
}
