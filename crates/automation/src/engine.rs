//! HTTP client for the remote automation platform.
//!
//! One `POST /v1/sessions` provisions a browser session; per-operation
//! endpoints under `/v1/sessions/{id}/…` drive it, and a `DELETE` tears it
//! down. Every operation appends one line to a bounded log so failures on
//! instruction-driven tools can surface what the engine attempted.

use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
    time::Duration,
};

use {
    async_trait::async_trait,
    reqwest::Client,
    serde::Deserialize,
    serde_json::json,
    tracing::{debug, warn},
};

use crate::{
    credentials::Credentials,
    error::AutomationError,
    handle::{AutomationHandle, AutomationProvider},
};

const API_KEY_HEADER: &str = "x-api-key";
const OPERATION_LOG_CAPACITY: usize = 100;

/// Configuration for the remote engine endpoint.
#[derive(Debug, Clone)]
pub struct RemoteEngineConfig {
    /// Base URL of the platform API, without a trailing slash.
    pub base_url: String,
    /// Default upper bound for navigation waits.
    pub navigation_timeout_ms: u64,
}

impl Default for RemoteEngineConfig {
    fn default() -> Self {
        Self {
            base_url: "https://engine.selkie.dev".into(),
            navigation_timeout_ms: 60_000,
        }
    }
}

/// Provisions [`RemoteSession`] handles against the platform API.
pub struct RemoteProvider {
    client: Client,
    config: RemoteEngineConfig,
}

#[derive(Debug, Deserialize)]
struct CreateSessionResponse {
    id: String,
}

impl RemoteProvider {
    pub fn new(config: RemoteEngineConfig) -> Result<Self, AutomationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| AutomationError::ProvisioningFailed(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl AutomationProvider for RemoteProvider {
    async fn provision(
        &self,
        credentials: &Credentials,
    ) -> Result<Arc<dyn AutomationHandle>, AutomationError> {
        let missing = credentials.missing_fields();
        if !missing.is_empty() {
            return Err(AutomationError::ProvisioningFailed(format!(
                "missing credentials: {}",
                missing.join(", ")
            )));
        }
        // Presence checked above.
        let (api_key, project_id, model_api_key) = match (
            &credentials.api_key,
            &credentials.project_id,
            &credentials.model_api_key,
        ) {
            (Some(k), Some(p), Some(m)) => (&k.value, &p.value, &m.value),
            _ => unreachable!("missing_fields() was empty"),
        };

        let resp = self
            .client
            .post(format!("{}/v1/sessions", self.config.base_url))
            .header(API_KEY_HEADER, api_key)
            .json(&json!({ "projectId": project_id, "modelApiKey": model_api_key }))
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AutomationError::ProvisioningFailed(format!(
                "engine returned HTTP {status}: {body}"
            )));
        }

        let created: CreateSessionResponse = resp
            .json()
            .await
            .map_err(|e| AutomationError::ProvisioningFailed(e.to_string()))?;

        debug!(engine_session = %created.id, "provisioned engine session");

        Ok(Arc::new(RemoteSession {
            client: self.client.clone(),
            base_url: self.config.base_url.clone(),
            api_key: api_key.clone(),
            id: created.id,
            log: Mutex::new(VecDeque::with_capacity(OPERATION_LOG_CAPACITY)),
        }))
    }
}

/// One live engine session. Exclusively owned by one SSE session.
pub struct RemoteSession {
    client: Client,
    base_url: String,
    api_key: String,
    id: String,
    log: Mutex<VecDeque<String>>,
}

impl RemoteSession {
    fn record(&self, line: impl Into<String>) {
        if let Ok(mut log) = self.log.lock() {
            if log.len() == OPERATION_LOG_CAPACITY {
                log.pop_front();
            }
            log.push_back(line.into());
        }
    }

    /// POST an operation to the session and return the JSON body.
    async fn op(
        &self,
        operation: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, AutomationError> {
        let resp = self
            .client
            .post(format!(
                "{}/v1/sessions/{}/{operation}",
                self.base_url, self.id
            ))
            .header(API_KEY_HEADER, &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            self.record(format!("{operation}: HTTP {status}"));
            return Err(AutomationError::Engine(format!(
                "'{operation}' returned HTTP {status}: {body}"
            )));
        }

        Ok(resp.json().await?)
    }
}

#[async_trait]
impl AutomationHandle for RemoteSession {
    async fn navigate(&self, url: &str, timeout_ms: u64) -> Result<(), AutomationError> {
        self.record(format!("navigate {url}"));
        let fut = self.op("navigate", json!({ "url": url, "timeoutMs": timeout_ms }));
        match tokio::time::timeout(Duration::from_millis(timeout_ms), fut).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(AutomationError::NavigationFailed(e.to_string())),
            Err(_) => {
                self.record(format!("navigate {url}: timed out after {timeout_ms}ms"));
                Err(AutomationError::Timeout(format!(
                    "navigation to {url} exceeded {timeout_ms}ms"
                )))
            },
        }
    }

    async fn act(
        &self,
        action: &str,
        variables: Option<&serde_json::Value>,
    ) -> Result<(), AutomationError> {
        self.record(format!("act: {action}"));
        self.op("act", json!({ "action": action, "variables": variables }))
            .await
            .map(|_| ())
            .map_err(|e| AutomationError::ActionFailed(e.to_string()))
    }

    async fn observe(&self, instruction: &str) -> Result<serde_json::Value, AutomationError> {
        self.record(format!("observe: {instruction}"));
        let body = self
            .op("observe", json!({ "instruction": instruction }))
            .await
            .map_err(|e| AutomationError::ObservationFailed(e.to_string()))?;
        Ok(body.get("observations").cloned().unwrap_or(body))
    }

    async fn body_text(&self) -> Result<String, AutomationError> {
        let value = self.evaluate("document.body.innerText").await?;
        match value {
            serde_json::Value::String(text) => Ok(text),
            other => Ok(other.to_string()),
        }
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, AutomationError> {
        self.record("evaluate script");
        let body = self
            .op("evaluate", json!({ "script": script }))
            .await
            .map_err(|e| AutomationError::EvalFailed(e.to_string()))?;
        Ok(body.get("result").cloned().unwrap_or(serde_json::Value::Null))
    }

    async fn screenshot(&self) -> Result<String, AutomationError> {
        self.record("screenshot");
        let body = self
            .op("screenshot", json!({ "fullPage": false }))
            .await
            .map_err(|e| AutomationError::ScreenshotFailed(e.to_string()))?;
        body.get("data")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| {
                AutomationError::ScreenshotFailed("engine response missing 'data'".into())
            })
    }

    async fn page_content(&self) -> Result<String, AutomationError> {
        self.record("page content");
        let body = self.op("content", json!({})).await?;
        body.get("html")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| AutomationError::Engine("engine response missing 'html'".into()))
    }

    fn operation_log(&self) -> Vec<String> {
        self.log
            .lock()
            .map(|log| log.iter().cloned().collect())
            .unwrap_or_default()
    }

    async fn close(&self) {
        let resp = self
            .client
            .delete(format!("{}/v1/sessions/{}", self.base_url, self.id))
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await;
        if let Err(e) = resp {
            warn!(engine_session = %self.id, error = %e, "failed to close engine session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{CredentialSource, CredentialValue};

    fn full_credentials() -> Credentials {
        Credentials {
            api_key: Some(CredentialValue::new("key", CredentialSource::Query)),
            project_id: Some(CredentialValue::new("proj", CredentialSource::Header)),
            model_api_key: Some(CredentialValue::new("model", CredentialSource::Environment)),
        }
    }

    fn provider(base_url: &str) -> RemoteProvider {
        RemoteProvider::new(RemoteEngineConfig {
            base_url: base_url.trim_end_matches('/').to_string(),
            navigation_timeout_ms: 60_000,
        })
        .unwrap()
    }

    #[tokio::test]
    async fn provision_rejects_partial_credentials_without_network() {
        let provider = provider("http://127.0.0.1:1");
        let Err(err) = provider.provision(&Credentials::default()).await else {
            panic!("expected provisioning to fail");
        };
        let msg = err.to_string();
        assert!(msg.contains("missing credentials"));
        assert!(msg.contains("api_key"));
    }

    #[tokio::test]
    async fn provision_creates_session_with_api_key_header() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/v1/sessions")
            .match_header("x-api-key", "key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"id":"eng-1"}"#)
            .create_async()
            .await;

        let provider = provider(&server.url());
        let handle = provider.provision(&full_credentials()).await.unwrap();
        assert!(handle.operation_log().is_empty());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn provision_surfaces_engine_rejection() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/sessions")
            .with_status(401)
            .with_body("bad key")
            .create_async()
            .await;

        let provider = provider(&server.url());
        let Err(err) = provider.provision(&full_credentials()).await else {
            panic!("expected provisioning to fail");
        };
        assert!(matches!(err, AutomationError::ProvisioningFailed(_)));
        assert!(err.to_string().contains("401"));
    }

    #[tokio::test]
    async fn navigate_records_operation_log() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/sessions")
            .with_status(200)
            .with_body(r#"{"id":"eng-2"}"#)
            .create_async()
            .await;
        let _nav = server
            .mock("POST", "/v1/sessions/eng-2/navigate")
            .with_status(200)
            .with_body("{}")
            .create_async()
            .await;

        let provider = provider(&server.url());
        let handle = provider.provision(&full_credentials()).await.unwrap();
        handle.navigate("https://example.com", 30_000).await.unwrap();
        assert_eq!(handle.operation_log(), vec!["navigate https://example.com"]);
    }

    #[tokio::test]
    async fn evaluate_unwraps_result_field() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/sessions")
            .with_status(200)
            .with_body(r#"{"id":"eng-3"}"#)
            .create_async()
            .await;
        let _eval = server
            .mock("POST", "/v1/sessions/eng-3/evaluate")
            .with_status(200)
            .with_body(r#"{"result":{"answer":42}}"#)
            .create_async()
            .await;

        let provider = provider(&server.url());
        let handle = provider.provision(&full_credentials()).await.unwrap();
        let value = handle.evaluate("6 * 7").await.unwrap();
        assert_eq!(value, serde_json::json!({"answer": 42}));
    }

    #[tokio::test]
    async fn act_failure_keeps_log_for_diagnosis() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/sessions")
            .with_status(200)
            .with_body(r#"{"id":"eng-4"}"#)
            .create_async()
            .await;
        let _act = server
            .mock("POST", "/v1/sessions/eng-4/act")
            .with_status(500)
            .with_body("element not found")
            .create_async()
            .await;

        let provider = provider(&server.url());
        let handle = provider.provision(&full_credentials()).await.unwrap();
        let err = handle.act("Click the missing button", None).await.unwrap_err();
        assert!(matches!(err, AutomationError::ActionFailed(_)));
        let log = handle.operation_log();
        assert!(log.iter().any(|l| l.contains("Click the missing button")));
        assert!(log.iter().any(|l| l.contains("HTTP 500")));
    }

    #[tokio::test]
    async fn close_sends_delete() {
        let mut server = mockito::Server::new_async().await;
        let _create = server
            .mock("POST", "/v1/sessions")
            .with_status(200)
            .with_body(r#"{"id":"eng-5"}"#)
            .create_async()
            .await;
        let delete = server
            .mock("DELETE", "/v1/sessions/eng-5")
            .with_status(204)
            .create_async()
            .await;

        let provider = provider(&server.url());
        let handle = provider.provision(&full_credentials()).await.unwrap();
        handle.close().await;
        delete.assert_async().await;
    }
}
