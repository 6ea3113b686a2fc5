//! SSE gateway: session lifecycle and tool dispatch over MCP.
//!
//! Each `GET /sse` connection gets its own session identity, its own
//! provisioned automation handle, and a one-way event stream. Clients post
//! JSON-RPC messages out of band to `POST /messages?sessionId=…`; responses
//! and notifications travel back over the stream. A fault in one session's
//! dispatch is invisible to every other session.

pub mod config;
pub mod credentials;
pub mod registry;
pub mod rpc;
pub mod server;
pub mod state;
pub mod transport;

pub use {
    config::GatewayConfig,
    registry::SessionRegistry,
    server::{build_app, start},
    state::GatewayState,
};
