//! Configuration for the forward-auth service.
//!
//! The service is configured via a TOML file, with support for environment
//! variable interpolation using `${VAR_NAME}` syntax.
//!
//! # Example
//!
//! ```toml
//! [server]
//! port = 8080
//! auth_path = "/auth"
//!
//! [[basic_auth]]
//! name = "admin"
//! user = "admin"
//! pass_hash = "${ADMIN_PASS_HASH}"
//! roles = ["admin"]
//! ```

mod credentials;
mod headers;
mod limits;
mod observability;
mod policy;
mod server;

use std::path::Path;

pub use credentials::*;
pub use headers::*;
pub use limits::*;
pub use observability::*;
pub use policy::*;
use serde::{Deserialize, Serialize};
pub use server::*;

use crate::error::ErrorCode;

/// Root configuration. Every section is optional with defaults, so a
/// minimal deployment can run from an empty file plus one credential.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct AppConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Outbound identity header names.
    #[serde(default)]
    pub headers: HeadersConfig,

    /// Logging format and level.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-decision audit stream.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Brute-force mitigation.
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Basic auth credentials.
    #[serde(default)]
    pub basic_auth: Vec<BasicCredential>,

    /// Static bearer tokens.
    #[serde(default)]
    pub bearer_token: Vec<BearerCredential>,

    /// API keys.
    #[serde(default)]
    pub api_key: Vec<ApiKeyCredential>,

    /// JWT verification settings. An empty secret disables JWT.
    #[serde(default)]
    pub jwt: JwtConfig,

    /// Route policies, highest priority wins.
    #[serde(default)]
    pub route_policy: Vec<RoutePolicy>,
}

impl AppConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded;
    /// a missing variable is a load error. A `PORT` environment variable
    /// overrides the configured listen port.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(e, path.to_path_buf()))?;

        check_file_mode(path);

        let mut config = Self::from_str(&contents)?;

        if let Ok(port) = std::env::var("PORT")
            && let Ok(port) = port.parse::<u16>()
        {
            config.server.port = port;
        }

        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: AppConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration for consistency and completeness.
    ///
    /// Hard errors abort the load; suspicious-but-legal combinations are
    /// logged as warnings.
    fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        self.headers.validate()?;
        self.audit.validate()?;
        self.rate_limit.validate()?;

        validate_basic_credentials(&self.basic_auth)?;
        validate_secret_credentials(&self.bearer_token, "token", |c: &BearerCredential| {
            (&c.name, &c.token)
        })?;
        validate_secret_credentials(&self.api_key, "key", |c: &ApiKeyCredential| {
            (&c.name, &c.key)
        })?;
        self.jwt.validate()?;
        validate_route_policies(self)?;

        if self.server.trusted_proxies.is_empty() {
            tracing::warn!(
                "server.trusted_proxies is empty: X-Forwarded-* headers will be \
                 trusted from every peer. Configure proxy CIDRs for production."
            );
        }

        Ok(())
    }

    pub fn jwt_enabled(&self) -> bool {
        !self.jwt.secret.is_empty()
    }
}

/// Configuration errors. Fatal at load time.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("environment variable not set: {0}")]
    EnvVarNotFound(String),

    #[error("configuration validation error: {0}")]
    Validation(String),
}

impl ConfigError {
    /// Stable identifier for logs and exit diagnostics.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Io(e, _) if e.kind() == std::io::ErrorKind::NotFound => {
                ErrorCode::ConfigNotFound
            }
            Self::Io(..) | Self::Parse(_) => ErrorCode::ConfigInvalid,
            Self::EnvVarNotFound(_) => ErrorCode::EnvVarNotSet,
            Self::Validation(_) => ErrorCode::ConfigValidation,
        }
    }
}

/// Expand `${VAR_NAME}` references against the process environment.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find('}').ok_or_else(|| {
            ConfigError::Validation("unterminated ${...} reference in config".into())
        })?;
        let name = &after[..end];
        if name.is_empty() {
            return Err(ConfigError::Validation(
                "empty ${} reference in config".into(),
            ));
        }
        let value =
            std::env::var(name).map_err(|_| ConfigError::EnvVarNotFound(name.to_string()))?;
        out.push_str(&value);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Warn when the config file is readable by group or other. Secrets live
/// in this file, so anything looser than 0600 is worth flagging, but a
/// loose mode does not block startup.
#[cfg(unix)]
fn check_file_mode(path: &Path) {
    use std::os::unix::fs::PermissionsExt;

    if let Ok(meta) = std::fs::metadata(path) {
        let mode = meta.permissions().mode() & 0o777;
        if mode & 0o077 != 0 {
            let mode = format!("{mode:o}");
            tracing::warn!(
                code = ErrorCode::ConfigPermission.as_str(),
                path = %path.display(),
                mode = %mode,
                "config file is readable by group/other; recommend chmod 0600"
            );
        }
    }
}

#[cfg(not(unix))]
fn check_file_mode(_path: &Path) {}

fn validate_basic_credentials(creds: &[BasicCredential]) -> Result<(), ConfigError> {
    let mut names = std::collections::HashSet::new();
    let mut users = std::collections::HashSet::new();

    for cred in creds {
        if cred.name.is_empty() {
            return Err(ConfigError::Validation(
                "basic_auth: name cannot be empty".into(),
            ));
        }
        if cred.user.is_empty() {
            return Err(ConfigError::Validation(format!(
                "basic_auth[{}]: user cannot be empty",
                cred.name
            )));
        }
        if cred.pass.is_empty() && cred.pass_hash.is_empty() {
            return Err(ConfigError::Validation(format!(
                "basic_auth[{}]: either pass or pass_hash must be provided",
                cred.name
            )));
        }
        if !cred.pass.is_empty() && !cred.pass_hash.is_empty() {
            tracing::warn!(
                name = %cred.name,
                "basic_auth entry has both pass and pass_hash; pass_hash will be used"
            );
        }
        if cred.pass_hash.is_empty() && !cred.pass.is_empty() && cred.pass.len() < 12 {
            tracing::warn!(
                name = %cred.name,
                "basic_auth entry has a short plaintext password; consider pass_hash"
            );
        }
        if !names.insert(cred.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "basic_auth: duplicate name {:?}",
                cred.name
            )));
        }
        if !users.insert(cred.user.as_str()) {
            return Err(ConfigError::Validation(format!(
                "basic_auth: duplicate user {:?}",
                cred.user
            )));
        }
    }

    Ok(())
}

/// Shared uniqueness/emptiness checks for bearer tokens and API keys.
fn validate_secret_credentials<T>(
    creds: &[T],
    secret_field: &str,
    fields: impl Fn(&T) -> (&String, &String),
) -> Result<(), ConfigError> {
    let mut names = std::collections::HashSet::new();
    let mut secrets = std::collections::HashSet::new();

    for cred in creds {
        let (name, secret) = fields(cred);
        if name.is_empty() {
            return Err(ConfigError::Validation(format!(
                "{secret_field} credential: name cannot be empty"
            )));
        }
        if secret.is_empty() {
            return Err(ConfigError::Validation(format!(
                "[{name}]: {secret_field} cannot be empty"
            )));
        }
        if !names.insert(name.clone()) {
            return Err(ConfigError::Validation(format!("duplicate name {name:?}")));
        }
        if !secrets.insert(secret.clone()) {
            return Err(ConfigError::Validation(format!(
                "duplicate {secret_field} for name {name:?}"
            )));
        }
    }

    Ok(())
}

fn validate_route_policies(config: &AppConfig) -> Result<(), ConfigError> {
    let basic_names: std::collections::HashSet<_> =
        config.basic_auth.iter().map(|c| c.name.as_str()).collect();
    let bearer_names: std::collections::HashSet<_> = config
        .bearer_token
        .iter()
        .map(|c| c.name.as_str())
        .collect();
    let api_key_names: std::collections::HashSet<_> =
        config.api_key.iter().map(|c| c.name.as_str()).collect();

    let mut names = std::collections::HashSet::new();

    for policy in &config.route_policy {
        if policy.name.is_empty() {
            return Err(ConfigError::Validation(
                "route_policy: name cannot be empty".into(),
            ));
        }
        if !names.insert(policy.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "route_policy: duplicate name {:?}",
                policy.name
            )));
        }

        for name in &policy.allowed_basic_names {
            if !basic_names.contains(name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "route_policy[{}] references unknown basic_auth {name:?}",
                    policy.name
                )));
            }
        }
        for name in &policy.allowed_bearer_names {
            if !bearer_names.contains(name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "route_policy[{}] references unknown bearer_token {name:?}",
                    policy.name
                )));
            }
        }
        for name in &policy.allowed_api_key_names {
            if !api_key_names.contains(name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "route_policy[{}] references unknown api_key {name:?}",
                    policy.name
                )));
            }
        }

        if policy.allow_anonymous
            && (!policy.require_all_roles.is_empty() || !policy.require_any_role.is_empty())
        {
            tracing::warn!(
                policy = %policy.name,
                "policy allows anonymous but requires roles; role requirements are ignored"
            );
        }
        if policy.jwt_only
            && (!policy.allowed_basic_names.is_empty()
                || !policy.allowed_bearer_names.is_empty()
                || !policy.allowed_api_key_names.is_empty())
        {
            tracing::warn!(
                policy = %policy.name,
                "policy is jwt_only but carries method allow-lists; the lists are ignored"
            );
        }
    }

    // Overlapping match rules are legal (priority decides) but worth flagging.
    let mut seen: std::collections::HashMap<(String, String, String), &str> =
        std::collections::HashMap::new();
    for policy in &config.route_policy {
        let key = (
            policy.host.clone(),
            policy.path_prefix.clone(),
            policy.method.to_ascii_lowercase(),
        );
        if let Some(first) = seen.get(&key) {
            tracing::warn!(
                first = %first,
                second = %policy.name,
                "multiple policies share the same match rule; priority decides"
            );
        } else {
            seen.insert(key, policy.name.as_str());
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimal_config_parses_with_defaults() {
        let config = AppConfig::from_str("").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.auth_path, "/auth");
        assert_eq!(config.server.health_path, "/health");
        assert_eq!(config.headers.user_header, "X-Auth-User");
        assert!(!config.jwt_enabled());
        assert!(!config.rate_limit.enabled);
    }

    #[test]
    fn env_vars_are_expanded() {
        // SAFETY: test-local variable name, no concurrent reader cares.
        unsafe { std::env::set_var("AUTHGATE_TEST_TOKEN", "tok-12345") };
        let config = AppConfig::from_str(
            r#"
[[bearer_token]]
name = "svc"
token = "${AUTHGATE_TEST_TOKEN}"
"#,
        )
        .unwrap();
        assert_eq!(config.bearer_token[0].token, "tok-12345");
    }

    #[test]
    fn missing_env_var_is_an_error() {
        let err = AppConfig::from_str(
            r#"
[[api_key]]
name = "k"
key = "${AUTHGATE_TEST_DOES_NOT_EXIST}"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound(_)));
        assert_eq!(err.code(), ErrorCode::EnvVarNotSet);
    }

    #[test]
    fn duplicate_basic_user_rejected() {
        let err = AppConfig::from_str(
            r#"
[[basic_auth]]
name = "a"
user = "same"
pass = "password-one"

[[basic_auth]]
name = "b"
user = "same"
pass = "password-two"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn duplicate_bearer_token_rejected() {
        let err = AppConfig::from_str(
            r#"
[[bearer_token]]
name = "a"
token = "same-token"

[[bearer_token]]
name = "b"
token = "same-token"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn basic_without_any_password_rejected() {
        let err = AppConfig::from_str(
            r#"
[[basic_auth]]
name = "a"
user = "alice"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("pass or pass_hash"));
    }

    #[test]
    fn policy_referencing_unknown_credential_rejected() {
        let err = AppConfig::from_str(
            r#"
[[route_policy]]
name = "p"
allowed_basic_names = ["ghost"]
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unknown basic_auth"));
    }

    #[test]
    fn duplicate_policy_name_rejected() {
        let err = AppConfig::from_str(
            r#"
[[route_policy]]
name = "p"

[[route_policy]]
name = "p"
"#,
        )
        .unwrap_err();
        assert!(err.to_string().contains("duplicate name"));
    }

    #[test]
    fn unknown_fields_rejected() {
        let err = AppConfig::from_str("[server]\nbogus = 1\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
