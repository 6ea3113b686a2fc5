//! Remote browser-automation engine client and the trait seams the rest of
//! the server talks through.
//!
//! One provisioned engine session backs exactly one SSE session; the gateway
//! owns the handle and closes it when the connection goes away. Everything
//! above this crate only sees [`AutomationHandle`] and [`AutomationProvider`].

pub mod credentials;
pub mod engine;
pub mod error;
pub mod handle;
pub mod text;

pub use {
    credentials::{CredentialSource, Credentials},
    engine::{RemoteEngineConfig, RemoteProvider},
    error::AutomationError,
    handle::{AutomationHandle, AutomationProvider},
};
