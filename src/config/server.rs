use std::net::IpAddr;

use ipnet::IpNet;
use serde::{Deserialize, Serialize};

use super::ConfigError;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Port to listen on. Overridden by the `PORT` environment variable.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path of the forward-auth decision endpoint. Accepts any method.
    #[serde(default = "default_auth_path")]
    pub auth_path: String,

    /// Path of the health endpoint (GET).
    #[serde(default = "default_health_path")]
    pub health_path: String,

    /// Socket read timeout in seconds.
    #[serde(default = "default_timeout")]
    pub read_timeout: u64,

    /// Socket write timeout in seconds.
    #[serde(default = "default_timeout")]
    pub write_timeout: u64,

    /// Trusted proxy IPs/CIDRs. X-Forwarded-* headers are honored only
    /// when the direct peer is inside one of these networks. An empty
    /// list trusts every peer (warned at load).
    #[serde(default)]
    pub trusted_proxies: Vec<String>,

    /// Mount the /debug/config endpoint.
    #[serde(default)]
    pub enable_debug: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            auth_path: default_auth_path(),
            health_path: default_health_path(),
            read_timeout: default_timeout(),
            write_timeout: default_timeout(),
            trusted_proxies: Vec::new(),
            enable_debug: false,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.auth_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "server.auth_path must start with /".into(),
            ));
        }
        if !self.health_path.starts_with('/') {
            return Err(ConfigError::Validation(
                "server.health_path must start with /".into(),
            ));
        }
        if self.auth_path == self.health_path {
            return Err(ConfigError::Validation(
                "server.auth_path and server.health_path must differ".into(),
            ));
        }
        if self.read_timeout == 0 {
            return Err(ConfigError::Validation(
                "server.read_timeout must be positive".into(),
            ));
        }
        if self.write_timeout == 0 {
            return Err(ConfigError::Validation(
                "server.write_timeout must be positive".into(),
            ));
        }

        for entry in &self.trusted_proxies {
            if entry.parse::<IpNet>().is_err() && entry.parse::<IpAddr>().is_err() {
                return Err(ConfigError::Validation(format!(
                    "server.trusted_proxies entry {entry:?} is neither an IP nor a CIDR"
                )));
            }
        }

        Ok(())
    }
}

fn default_port() -> u16 {
    8080
}

fn default_auth_path() -> String {
    "/auth".to_string()
}

fn default_health_path() -> String {
    "/health".to_string()
}

fn default_timeout() -> u64 {
    5
}
