use std::collections::BTreeMap;

/// How a request authenticated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    Basic,
    Bearer,
    ApiKey,
    Jwt,
    Anonymous,
}

impl AuthMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basic => "basic",
            Self::Bearer => "bearer",
            Self::ApiKey => "apikey",
            Self::Jwt => "jwt",
            Self::Anonymous => "anonymous",
        }
    }
}

impl std::fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of a successful verification, consumed by the policy
/// checker and the response shaper.
#[derive(Debug, Clone)]
pub struct AuthResult {
    pub method: AuthMethod,

    /// Credential name from configuration. Empty for JWT and anonymous.
    pub name: String,

    /// User name or token subject. Empty for bearer/apikey identities.
    pub user: String,

    pub roles: Vec<String>,

    /// JWT metadata (issuer, audience). Ordered so emitted headers are
    /// deterministic.
    pub metadata: BTreeMap<String, String>,
}

impl AuthResult {
    pub fn new(method: AuthMethod) -> Self {
        Self {
            method,
            name: String::new(),
            user: String::new(),
            roles: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// The anonymous identity produced by an allow-anonymous policy.
    pub fn anonymous() -> Self {
        Self {
            method: AuthMethod::Anonymous,
            name: String::new(),
            user: String::new(),
            roles: vec!["anonymous".to_string()],
            metadata: BTreeMap::new(),
        }
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_strings() {
        assert_eq!(AuthMethod::Basic.as_str(), "basic");
        assert_eq!(AuthMethod::ApiKey.as_str(), "apikey");
        assert_eq!(AuthMethod::Anonymous.as_str(), "anonymous");
    }

    #[test]
    fn anonymous_identity_carries_anonymous_role() {
        let result = AuthResult::anonymous();
        assert_eq!(result.method, AuthMethod::Anonymous);
        assert!(result.has_role("anonymous"));
        assert!(result.user.is_empty());
    }
}
