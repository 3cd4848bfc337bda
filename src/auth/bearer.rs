use subtle::ConstantTimeEq;

use super::{AuthMethod, AuthResult, AuthStore, parse_auth_header};

/// Verify a static `Bearer` token against the store.
///
/// The lookup iterates the configured set applying constant-time
/// equality per candidate rather than a hash lookup; the set is small
/// and a map hit would leak membership through timing.
pub fn verify_bearer(auth_header: &str, store: &AuthStore) -> Option<AuthResult> {
    let (scheme, token) = parse_auth_header(auth_header)?;
    if !scheme.eq_ignore_ascii_case("Bearer") || token.is_empty() {
        return None;
    }

    for (stored, cred) in &store.bearer_by_token {
        if bool::from(token.as_bytes().ct_eq(stored.as_bytes())) {
            return Some(AuthResult {
                method: AuthMethod::Bearer,
                name: cred.name.clone(),
                user: String::new(),
                roles: cred.roles.clone(),
                metadata: Default::default(),
            });
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    fn store() -> AuthStore {
        AuthStore::build(
            &AppConfig::from_str(
                r#"
[[bearer_token]]
name = "svc-a"
token = "token-alpha"
roles = ["service"]

[[bearer_token]]
name = "svc-b"
token = "token-beta"
roles = ["service", "reader"]
"#,
            )
            .unwrap(),
        )
    }

    #[test]
    fn known_token_matches() {
        let result = verify_bearer("Bearer token-beta", &store()).unwrap();
        assert_eq!(result.method, AuthMethod::Bearer);
        assert_eq!(result.name, "svc-b");
        assert!(result.user.is_empty());
        assert_eq!(result.roles, vec!["service", "reader"]);
    }

    #[test]
    fn unknown_token_fails() {
        assert!(verify_bearer("Bearer token-gamma", &store()).is_none());
    }

    #[test]
    fn empty_token_fails() {
        assert!(verify_bearer("Bearer ", &store()).is_none());
        assert!(verify_bearer("Bearer", &store()).is_none());
    }

    #[test]
    fn wrong_scheme_fails() {
        assert!(verify_bearer("Basic token-alpha", &store()).is_none());
    }

    #[test]
    fn scheme_case_insensitive() {
        assert!(verify_bearer("bearer token-alpha", &store()).is_some());
    }
}
