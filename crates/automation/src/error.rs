//! Automation error types.

use thiserror::Error;

/// Errors that can occur while provisioning or driving an engine session.
#[derive(Debug, Error)]
pub enum AutomationError {
    #[error("provisioning failed: {0}")]
    ProvisioningFailed(String),

    #[error("navigation failed: {0}")]
    NavigationFailed(String),

    #[error("action failed: {0}")]
    ActionFailed(String),

    #[error("observation failed: {0}")]
    ObservationFailed(String),

    #[error("evaluation failed: {0}")]
    EvalFailed(String),

    #[error("screenshot failed: {0}")]
    ScreenshotFailed(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl From<reqwest::Error> for AutomationError {
    fn from(err: reqwest::Error) -> Self {
        AutomationError::Engine(err.to_string())
    }
}
