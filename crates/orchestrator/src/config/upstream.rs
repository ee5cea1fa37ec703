//! Upstream service configuration (process engine and to-do system).

use serde::Deserialize;

/// Endpoints of the systems this orchestrator keeps in sync.
///
/// Environment variables are prefixed with `FLOWSYNC_`:
/// - `FLOWSYNC_ENGINE_URL`: process engine REST base URL
/// - `FLOWSYNC_TODO_URL`: to-do system base URL
/// - `FLOWSYNC_HTTP_TIMEOUT_SECS`: per-request timeout (default: 10)
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_engine_url")]
    pub engine_url: String,

    #[serde(default = "default_todo_url")]
    pub todo_url: String,

    /// A gateway call exceeding this is treated as a failure of that
    /// single call, not of the whole orchestration.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_engine_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_todo_url() -> String {
    "http://localhost:9090".to_string()
}

fn default_http_timeout_secs() -> u64 {
    10
}

impl UpstreamConfig {
    /// Load configuration from `FLOWSYNC_`-prefixed environment
    /// variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("FLOWSYNC_").from_env::<UpstreamConfig>()
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            engine_url: default_engine_url(),
            todo_url: default_todo_url(),
            http_timeout_secs: default_http_timeout_secs(),
        }
    }
}
