//! Resolved credentials for provisioning an engine session.
//!
//! Three values are required: the automation-platform API key, the platform
//! project id, and the model-provider API key used for instruction
//! resolution. Partial credentials are a rejection, never a degraded mode.

use serde::Serialize;

/// Where a credential value was resolved from, in precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    Query,
    Header,
    Environment,
}

/// A single resolved credential value with its provenance.
#[derive(Debug, Clone)]
pub struct CredentialValue {
    pub value: String,
    pub source: CredentialSource,
}

impl CredentialValue {
    pub fn new(value: impl Into<String>, source: CredentialSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }
}

/// Credentials gathered from a connection attempt. Fields stay optional so
/// the caller can report exactly which ones are missing.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Automation-platform API key.
    pub api_key: Option<CredentialValue>,
    /// Automation-platform project identifier.
    pub project_id: Option<CredentialValue>,
    /// Model-provider API key.
    pub model_api_key: Option<CredentialValue>,
}

impl Credentials {
    /// Names of required fields that are absent, in catalog order.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.api_key.is_none() {
            missing.push("api_key");
        }
        if self.project_id.is_none() {
            missing.push("project_id");
        }
        if self.model_api_key.is_none() {
            missing.push("model_api_key");
        }
        missing
    }

    pub fn is_complete(&self) -> bool {
        self.missing_fields().is_empty()
    }
}
