//! Application configuration for the FlowSync orchestrator.

use serde::Deserialize;

/// Application configuration loaded from environment variables.
///
/// Environment variables are prefixed with `FLOWSYNC_`:
/// - `FLOWSYNC_HOST`: Server bind address (default: "0.0.0.0")
/// - `FLOWSYNC_PORT`: Server port (default: 8091)
/// - `FLOWSYNC_DEBUG`: Enable debug mode (default: false)
/// - `FLOWSYNC_SERVER_NAME`: Server name for identification
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Enable debug mode
    #[serde(default)]
    pub debug: bool,

    /// Server name for identification
    #[serde(default = "default_server_name")]
    pub server_name: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8091
}

fn default_server_name() -> String {
    "flowsync-orchestrator".to_string()
}

impl AppConfig {
    /// Load configuration from `FLOWSYNC_`-prefixed environment
    /// variables.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::prefixed("FLOWSYNC_").from_env::<AppConfig>()
    }

    /// The bind address for `TcpListener::bind`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            debug: false,
            server_name: default_server_name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8091);
        assert!(!config.debug);
    }

    #[test]
    fn test_bind_address() {
        let config = AppConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:8091");
    }
}
