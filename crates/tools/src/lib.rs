//! Tool catalog and dispatcher for the browser-automation session.
//!
//! Every tool implements [`SessionTool`] and is registered in a
//! [`ToolRegistry`]; the registry doubles as the discovery catalog
//! (`tools/list`) and the dispatch table (`tools/call`). A tool call never
//! escapes as an error: any fault is converted to a result envelope with
//! `is_error = true` at this boundary.

pub mod browser;
pub mod extended;
pub mod registry;
pub mod resources;

pub use {
    registry::{ChangeNotifier, SessionTool, ToolContext, ToolRegistry, default_registry},
    resources::{ResourceStore, StoredResource},
};
