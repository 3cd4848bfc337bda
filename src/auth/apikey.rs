use subtle::ConstantTimeEq;

use super::{AuthMethod, AuthResult, AuthStore, parse_auth_header};

/// Verify an `Authorization: ApiKey <key>` header.
pub fn verify_api_key_auth(auth_header: &str, store: &AuthStore) -> Option<AuthResult> {
    let (scheme, key) = parse_auth_header(auth_header)?;
    if !scheme.eq_ignore_ascii_case("ApiKey") || key.is_empty() {
        return None;
    }
    lookup_api_key(key, store)
}

/// Verify an `X-Api-Key` header value.
pub fn verify_api_key_header(value: &str, store: &AuthStore) -> Option<AuthResult> {
    let key = value.trim();
    if key.is_empty() {
        return None;
    }
    lookup_api_key(key, store)
}

/// Constant-time scan over the configured keys, same rationale as the
/// bearer store.
fn lookup_api_key(key: &str, store: &AuthStore) -> Option<AuthResult> {
    for (stored, cred) in &store.api_key_by_key {
        if bool::from(key.as_bytes().ct_eq(stored.as_bytes())) {
            return Some(AuthResult {
                method: AuthMethod::ApiKey,
                name: cred.name.clone(),
                user: String::new(),
                roles: cred.roles.clone(),
                metadata: Default::default(),
            });
        }
    }
    None
}
