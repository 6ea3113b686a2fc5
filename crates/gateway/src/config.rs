//! Environment-sourced gateway configuration.

use selkie_automation::{
    Credentials, RemoteEngineConfig,
    credentials::{CredentialSource, CredentialValue},
};

pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_NAVIGATION_TIMEOUT_MS: u64 = 60_000;

/// Gateway settings. Credentials supplied here act as process-wide defaults
/// with the lowest resolution precedence.
#[derive(Clone)]
pub struct GatewayConfig {
    pub bind: String,
    pub port: u16,
    pub engine: RemoteEngineConfig,
    /// Credential defaults resolved from the process environment.
    pub env_credentials: Credentials,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            engine: RemoteEngineConfig::default(),
            env_credentials: Credentials::default(),
        }
    }
}

impl GatewayConfig {
    /// Read settings from `SELKIE_*` environment variables, falling back to
    /// defaults for anything unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(bind) = std::env::var("SELKIE_BIND") {
            config.bind = bind;
        }
        if let Some(port) = env_parsed("SELKIE_PORT") {
            config.port = port;
        }
        if let Ok(url) = std::env::var("SELKIE_ENGINE_URL") {
            config.engine.base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(timeout) = env_parsed("SELKIE_NAVIGATION_TIMEOUT_MS") {
            config.engine.navigation_timeout_ms = timeout;
        }

        config.env_credentials = Credentials {
            api_key: env_credential("SELKIE_API_KEY"),
            project_id: env_credential("SELKIE_PROJECT_ID"),
            model_api_key: env_credential("SELKIE_MODEL_API_KEY"),
        };

        config
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

fn env_credential(name: &str) -> Option<CredentialValue> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .map(|v| CredentialValue::new(v, CredentialSource::Environment))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = GatewayConfig::default();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(
            config.engine.navigation_timeout_ms,
            DEFAULT_NAVIGATION_TIMEOUT_MS
        );
        assert!(!config.env_credentials.is_complete());
    }
}
