use serde::{Deserialize, Serialize};

use super::ConfigError;

/// A Basic-auth credential. When both `pass` and `pass_hash` are set the
/// bcrypt hash wins and the plaintext is never consulted.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BasicCredential {
    /// Unique identifier referenced by policy allow-lists.
    pub name: String,

    /// Login user name.
    pub user: String,

    /// Plaintext password. Compared in constant time.
    #[serde(default, skip_serializing)]
    pub pass: String,

    /// bcrypt hash of the password.
    #[serde(default, skip_serializing)]
    pub pass_hash: String,

    #[serde(default = "default_basic_roles")]
    pub roles: Vec<String>,
}

impl std::fmt::Debug for BasicCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BasicCredential")
            .field("name", &self.name)
            .field("user", &self.user)
            .field("pass", &"****")
            .field("pass_hash", &"****")
            .field("roles", &self.roles)
            .finish()
    }
}

/// A static bearer token.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BearerCredential {
    pub name: String,

    #[serde(skip_serializing)]
    pub token: String,

    #[serde(default = "default_bearer_roles")]
    pub roles: Vec<String>,
}

impl std::fmt::Debug for BearerCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BearerCredential")
            .field("name", &self.name)
            .field("token", &"****")
            .field("roles", &self.roles)
            .finish()
    }
}

/// An API key, accepted from `Authorization: ApiKey <k>` or `X-Api-Key`.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiKeyCredential {
    pub name: String,

    #[serde(skip_serializing)]
    pub key: String,

    #[serde(default = "default_api_key_roles")]
    pub roles: Vec<String>,
}

impl std::fmt::Debug for ApiKeyCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyCredential")
            .field("name", &self.name)
            .field("key", &"****")
            .field("roles", &self.roles)
            .finish()
    }
}

/// JWT verification settings. Only the HMAC family is accepted.
#[derive(Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JwtConfig {
    /// HMAC signing secret. Empty disables JWT verification.
    #[serde(default, skip_serializing)]
    pub secret: String,

    /// Expected `iss` claim. Empty skips the check.
    #[serde(default)]
    pub issuer: String,

    /// Expected `aud` claim (string equality or array membership).
    /// Empty skips the check.
    #[serde(default)]
    pub audience: String,

    /// Claim carrying the user identity. Falls back to `sub` when the
    /// configured claim is absent or empty.
    #[serde(default = "default_user_claim")]
    pub user_claim_name: String,
}

impl Default for JwtConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            issuer: String::new(),
            audience: String::new(),
            user_claim_name: default_user_claim(),
        }
    }
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"****")
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("user_claim_name", &self.user_claim_name)
            .finish()
    }
}

impl JwtConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Ok(());
        }
        // 256 bits minimum for HS256.
        if self.secret.len() < 32 {
            return Err(ConfigError::Validation(format!(
                "jwt.secret must be at least 32 characters, got {}",
                self.secret.len()
            )));
        }
        if self.user_claim_name.is_empty() {
            return Err(ConfigError::Validation(
                "jwt.user_claim_name cannot be empty".into(),
            ));
        }
        Ok(())
    }
}

fn default_user_claim() -> String {
    "sub".to_string()
}

fn default_basic_roles() -> Vec<String> {
    vec!["user".to_string()]
}

fn default_bearer_roles() -> Vec<String> {
    vec!["service".to_string()]
}

fn default_api_key_roles() -> Vec<String> {
    vec!["api".to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_secrets() {
        let cred = BasicCredential {
            name: "admin".into(),
            user: "admin".into(),
            pass: "super-secret-password".into(),
            pass_hash: String::new(),
            roles: vec!["admin".into()],
        };
        let out = format!("{cred:?}");
        assert!(out.contains("****"));
        assert!(!out.contains("super-secret-password"));
        assert!(out.contains("admin"));
    }

    #[test]
    fn serialize_skips_secrets() {
        let cred = ApiKeyCredential {
            name: "k".into(),
            key: "key-material-here".into(),
            roles: vec![],
        };
        let json = serde_json::to_string(&cred).unwrap();
        assert!(!json.contains("key-material-here"));
        assert!(!json.contains("\"key\""));
    }

    #[test]
    fn jwt_secret_length_enforced() {
        let config = JwtConfig {
            secret: "short".into(),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = JwtConfig {
            secret: "0123456789abcdef0123456789abcdef".into(),
            ..Default::default()
        };
        config.validate().unwrap();
    }

    #[test]
    fn empty_secret_is_disabled_and_valid() {
        JwtConfig::default().validate().unwrap();
    }

    #[test]
    fn default_roles_applied_on_parse() {
        let cred: BasicCredential =
            toml::from_str("name = \"a\"\nuser = \"a\"\npass = \"longpassword-123\"\n").unwrap();
        assert_eq!(cred.roles, vec!["user"]);
    }
}
