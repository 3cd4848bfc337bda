use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use subtle::ConstantTimeEq;

use super::{AuthMethod, AuthResult, AuthStore, parse_auth_header};

/// Verify a `Basic` Authorization header against the store.
///
/// A configured bcrypt hash takes precedence; the plaintext field is not
/// consulted when a hash exists. Plaintext comparison is constant-time.
/// An empty password never authenticates.
pub fn verify_basic(auth_header: &str, store: &AuthStore) -> Option<AuthResult> {
    let (scheme, payload) = parse_auth_header(auth_header)?;
    if !scheme.eq_ignore_ascii_case("Basic") || payload.is_empty() {
        return None;
    }

    let decoded = BASE64.decode(payload).ok()?;
    let decoded = String::from_utf8(decoded).ok()?;
    let (user, pass) = decoded.split_once(':')?;

    if pass.is_empty() {
        return None;
    }

    let cred = store.basic_by_user.get(user)?;

    let password_valid = if !cred.pass_hash.is_empty() {
        bcrypt::verify(pass, &cred.pass_hash).unwrap_or(false)
    } else {
        pass.as_bytes().ct_eq(cred.pass.as_bytes()).into()
    };

    if !password_valid {
        return None;
    }

    Some(AuthResult {
        method: AuthMethod::Basic,
        name: cred.name.clone(),
        user: user.to_string(),
        roles: cred.roles.clone(),
        metadata: Default::default(),
    })
}
