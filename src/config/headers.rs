use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Extra header token: emit the decision time as Unix seconds.
pub const EXTRA_TIMESTAMP: &str = "X-Auth-Timestamp";
/// Extra header token: emit the effective host+uri of the request.
pub const EXTRA_ROUTE: &str = "X-Auth-Route";

/// Names of the identity headers copied onto the upstream request by the
/// proxy. An empty name suppresses that header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HeadersConfig {
    /// Header carrying the authentication method.
    #[serde(default = "default_method_header")]
    pub method_header: String,

    /// Header carrying the authenticated user (falls back to the
    /// credential name).
    #[serde(default = "default_user_header")]
    pub user_header: String,

    /// Header carrying the comma-joined role list.
    #[serde(default = "default_role_header")]
    pub role_header: String,

    /// Recognized extras: `X-Auth-Timestamp`, `X-Auth-Route`.
    #[serde(default)]
    pub extra_headers: Vec<String>,

    /// Emit `X-Auth-<Claim>` headers for JWT metadata (issuer, audience).
    #[serde(default)]
    pub include_jwt_metadata: bool,
}

impl Default for HeadersConfig {
    fn default() -> Self {
        Self {
            method_header: default_method_header(),
            user_header: default_user_header(),
            role_header: default_role_header(),
            extra_headers: Vec::new(),
            include_jwt_metadata: false,
        }
    }
}

impl HeadersConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut seen = std::collections::HashSet::new();

        let all = [&self.method_header, &self.user_header, &self.role_header]
            .into_iter()
            .chain(self.extra_headers.iter());

        for name in all {
            if name.is_empty() {
                continue;
            }
            if !is_valid_header_name(name) {
                return Err(ConfigError::Validation(format!(
                    "headers: invalid header name {name:?} (must match [A-Za-z][A-Za-z0-9-]*)"
                )));
            }
            let lower = name.to_ascii_lowercase();
            if is_reserved_header(&lower) {
                return Err(ConfigError::Validation(format!(
                    "headers: cannot use reserved header {name:?}"
                )));
            }
            if !seen.insert(lower) {
                return Err(ConfigError::Validation(format!(
                    "headers: duplicate header name {name:?}"
                )));
            }
        }

        for extra in &self.extra_headers {
            if extra != EXTRA_TIMESTAMP && extra != EXTRA_ROUTE {
                tracing::warn!(header = %extra, "unrecognized extra header token, ignored");
            }
        }

        Ok(())
    }
}

fn is_valid_header_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn is_reserved_header(lower: &str) -> bool {
    matches!(lower, "host" | "content-length" | "transfer-encoding")
}

fn default_method_header() -> String {
    "X-Auth-Method".to_string()
}

fn default_user_header() -> String {
    "X-Auth-User".to_string()
}

fn default_role_header() -> String {
    "X-Auth-Role".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        HeadersConfig::default().validate().unwrap();
    }

    #[test]
    fn reserved_header_rejected() {
        let config = HeadersConfig {
            user_header: "Host".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn duplicate_header_rejected_case_insensitively() {
        let config = HeadersConfig {
            user_header: "X-Auth-User".into(),
            role_header: "x-auth-user".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn invalid_characters_rejected() {
        let config = HeadersConfig {
            method_header: "X Auth Method".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = HeadersConfig {
            method_header: "9Lives".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn empty_name_suppresses_header_and_is_legal() {
        let config = HeadersConfig {
            role_header: String::new(),
            ..Default::default()
        };
        config.validate().unwrap();
    }
}
