//! Credential resolution for connection attempts.
//!
//! Precedence per field: query parameter, then request header, then the
//! process-environment default. The connection never reaches the session
//! registry unless all three fields resolve.

use std::collections::HashMap;

use axum::http::HeaderMap;

use selkie_automation::{
    Credentials,
    credentials::{CredentialSource, CredentialValue},
};

const QUERY_API_KEY: &str = "api_key";
const QUERY_PROJECT_ID: &str = "project_id";
const QUERY_MODEL_API_KEY: &str = "model_api_key";

const HEADER_API_KEY: &str = "x-api-key";
const HEADER_PROJECT_ID: &str = "x-project-id";
const HEADER_MODEL_API_KEY: &str = "x-model-api-key";

fn resolve_field(
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    query_key: &str,
    header_key: &str,
    env_default: &Option<CredentialValue>,
) -> Option<CredentialValue> {
    if let Some(value) = query.get(query_key).filter(|v| !v.is_empty()) {
        return Some(CredentialValue::new(value, CredentialSource::Query));
    }
    if let Some(value) = headers
        .get(header_key)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
    {
        return Some(CredentialValue::new(value, CredentialSource::Header));
    }
    env_default.clone()
}

/// Resolve the three required credential fields for one connection attempt.
pub fn resolve(
    query: &HashMap<String, String>,
    headers: &HeaderMap,
    env_defaults: &Credentials,
) -> Credentials {
    Credentials {
        api_key: resolve_field(
            query,
            headers,
            QUERY_API_KEY,
            HEADER_API_KEY,
            &env_defaults.api_key,
        ),
        project_id: resolve_field(
            query,
            headers,
            QUERY_PROJECT_ID,
            HEADER_PROJECT_ID,
            &env_defaults.project_id,
        ),
        model_api_key: resolve_field(
            query,
            headers,
            QUERY_MODEL_API_KEY,
            HEADER_MODEL_API_KEY,
            &env_defaults.model_api_key,
        ),
    }
}
