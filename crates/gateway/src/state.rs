//! Shared gateway state handed to every request handler.

use std::sync::Arc;

use anyhow::Result;

use {
    selkie_automation::AutomationProvider,
    selkie_tools::{ResourceStore, ToolRegistry, default_registry},
};

use crate::{config::GatewayConfig, registry::SessionRegistry};

/// Everything a handler needs: configuration, the session registry, the
/// shared resource store, the tool catalog, and the provisioning backend.
#[derive(Clone)]
pub struct GatewayState {
    pub config: GatewayConfig,
    pub registry: Arc<SessionRegistry>,
    pub resources: Arc<ResourceStore>,
    pub tools: Arc<ToolRegistry>,
    pub provider: Arc<dyn AutomationProvider>,
}

impl GatewayState {
    /// Assemble gateway state around a provisioning backend. Fails if the
    /// tool catalog cannot be built (duplicate tool names).
    pub fn new(config: GatewayConfig, provider: Arc<dyn AutomationProvider>) -> Result<Self> {
        let tools = default_registry(config.engine.navigation_timeout_ms)?;
        Ok(Self {
            config,
            registry: Arc::new(SessionRegistry::new()),
            resources: Arc::new(ResourceStore::new()),
            tools: Arc::new(tools),
            provider,
        })
    }
}
