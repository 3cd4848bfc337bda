//! HMAC-signed JWT verification.
//!
//! Only the HS256/HS384/HS512 family is accepted; any other `alg` in the
//! token header fails verification outright, which closes the usual
//! algorithm-confusion hole for a secret-keyed deployment. Signature,
//! `exp`, and `nbf` are checked by the decoder; issuer, audience, user
//! claim, and roles are extracted manually because their shapes are
//! looser than a fixed claims struct.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode, decode_header};
use serde_json::Value;

use super::{AuthMethod, AuthResult};
use crate::config::JwtConfig;
use crate::error::ErrorCode;

/// Shape test: exactly two dots splitting the token into three parts.
pub fn looks_like_jwt(token: &str) -> bool {
    !token.is_empty() && token.matches('.').count() == 2
}

/// Verify a bearer token as a JWT. Returns `None` for anything that is
/// not a valid, in-window, correctly-addressed token.
pub fn verify_jwt(token: &str, settings: &JwtConfig) -> Option<AuthResult> {
    if settings.secret.is_empty() {
        return None;
    }

    let header = decode_header(token).ok()?;
    if !matches!(
        header.alg,
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
    ) {
        tracing::debug!(alg = ?header.alg, "rejecting JWT with non-HMAC algorithm");
        return None;
    }

    let mut validation = Validation::new(header.alg);
    validation.validate_nbf = true;
    // aud/iss shapes are checked manually below.
    validation.validate_aud = false;

    let key = DecodingKey::from_secret(settings.secret.as_bytes());
    let claims = match decode::<Value>(token, &key, &validation) {
        Ok(data) => data.claims,
        Err(e) => {
            let code = match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => ErrorCode::AuthExpired,
                _ => ErrorCode::AuthInvalidToken,
            };
            tracing::debug!(code = code.as_str(), "JWT validation failed");
            return None;
        }
    };

    if !settings.issuer.is_empty()
        && claims.get("iss").and_then(Value::as_str) != Some(settings.issuer.as_str())
    {
        return None;
    }

    if !settings.audience.is_empty() && !audience_matches(&claims, &settings.audience) {
        return None;
    }

    let user = extract_user(&claims, &settings.user_claim_name)?;
    let roles = extract_roles(&claims);

    let mut result = AuthResult::new(AuthMethod::Jwt);
    result.user = user;
    result.roles = roles;
    if let Some(iss) = claims.get("iss").and_then(Value::as_str) {
        result.metadata.insert("issuer".into(), iss.into());
    }
    if let Some(aud) = claims.get("aud").and_then(Value::as_str) {
        result.metadata.insert("audience".into(), aud.into());
    }

    Some(result)
}

/// `aud` may be a string or an array of strings.
fn audience_matches(claims: &Value, expected: &str) -> bool {
    match claims.get("aud") {
        Some(Value::String(aud)) => aud == expected,
        Some(Value::Array(entries)) => entries
            .iter()
            .any(|entry| entry.as_str() == Some(expected)),
        _ => false,
    }
}

/// Pull the user from the configured claim, falling back to `sub` when
/// the configured claim is absent or empty.
fn extract_user(claims: &Value, claim_name: &str) -> Option<String> {
    let mut user = claims
        .get(claim_name)
        .and_then(Value::as_str)
        .unwrap_or_default();

    if user.is_empty() && claim_name != "sub" {
        user = claims.get("sub").and_then(Value::as_str).unwrap_or_default();
    }

    if user.is_empty() {
        return None;
    }
    Some(user.to_string())
}

/// `roles` as a string array wins; a single `role` string is accepted as
/// a one-element list; anything else is no roles.
fn extract_roles(claims: &Value) -> Vec<String> {
    if let Some(Value::Array(entries)) = claims.get("roles") {
        return entries
            .iter()
            .filter_map(Value::as_str)
            .filter(|r| !r.is_empty())
            .map(String::from)
            .collect();
    }
    if let Some(role) = claims.get("role").and_then(Value::as_str)
        && !role.is_empty()
    {
        return vec![role.to_string()];
    }
    Vec::new()
}

#[cfg(test)]
mod tests {
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use serde_json::json;

    use super::*;

    const SECRET: &str = "test-secret-test-secret-test-secret!";

    fn settings() -> JwtConfig {
        JwtConfig {
            secret: SECRET.to_string(),
            issuer: String::new(),
            audience: String::new(),
            user_claim_name: "sub".to_string(),
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn sign(claims: Value) -> String {
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn shape_test() {
        assert!(looks_like_jwt("a.b.c"));
        assert!(!looks_like_jwt("a.b"));
        assert!(!looks_like_jwt("a.b.c.d"));
        assert!(!looks_like_jwt(""));
        assert!(!looks_like_jwt("plain-token"));
    }

    #[test]
    fn valid_token_yields_jwt_identity() {
        let token = sign(json!({"sub": "alice", "exp": now() + 600}));
        let result = verify_jwt(&token, &settings()).unwrap();
        assert_eq!(result.method, AuthMethod::Jwt);
        assert_eq!(result.user, "alice");
        assert!(result.roles.is_empty());
    }

    #[test]
    fn expired_token_rejected() {
        let token = sign(json!({"sub": "alice", "exp": now() - 600}));
        assert!(verify_jwt(&token, &settings()).is_none());
    }

    #[test]
    fn not_yet_valid_token_rejected() {
        let token = sign(json!({"sub": "alice", "exp": now() + 600, "nbf": now() + 300}));
        assert!(verify_jwt(&token, &settings()).is_none());
    }

    #[test]
    fn missing_exp_rejected() {
        let token = sign(json!({"sub": "alice"}));
        assert!(verify_jwt(&token, &settings()).is_none());
    }

    #[test]
    fn wrong_secret_rejected() {
        let token = encode(
            &Header::default(),
            &json!({"sub": "alice", "exp": now() + 600}),
            &EncodingKey::from_secret(b"a-completely-different-secret-key"),
        )
        .unwrap();
        assert!(verify_jwt(&token, &settings()).is_none());
    }

    #[test]
    fn non_hmac_algorithm_rejected() {
        // Hand-rolled RS256 header with junk signature; must be refused
        // before any signature work happens.
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(
            serde_json::to_vec(&json!({"sub": "alice", "exp": now() + 600})).unwrap(),
        );
        let token = format!("{header}.{payload}.AAAA");
        assert!(verify_jwt(&token, &settings()).is_none());
    }

    #[test]
    fn disabled_without_secret() {
        let token = sign(json!({"sub": "alice", "exp": now() + 600}));
        let disabled = JwtConfig::default();
        assert!(verify_jwt(&token, &disabled).is_none());
    }

    #[test]
    fn issuer_enforced_when_configured() {
        let mut cfg = settings();
        cfg.issuer = "https://idp.example.com".into();

        let good = sign(json!({
            "sub": "alice", "exp": now() + 600, "iss": "https://idp.example.com"
        }));
        let bad = sign(json!({
            "sub": "alice", "exp": now() + 600, "iss": "https://evil.example.com"
        }));
        let missing = sign(json!({"sub": "alice", "exp": now() + 600}));

        assert!(verify_jwt(&good, &cfg).is_some());
        assert!(verify_jwt(&bad, &cfg).is_none());
        assert!(verify_jwt(&missing, &cfg).is_none());
    }

    #[test]
    fn audience_string_and_array_forms() {
        let mut cfg = settings();
        cfg.audience = "api".into();

        let string_form = sign(json!({"sub": "a", "exp": now() + 600, "aud": "api"}));
        let array_form = sign(json!({"sub": "a", "exp": now() + 600, "aud": ["web", "api"]}));
        let mismatch = sign(json!({"sub": "a", "exp": now() + 600, "aud": ["web"]}));
        let missing = sign(json!({"sub": "a", "exp": now() + 600}));

        assert!(verify_jwt(&string_form, &cfg).is_some());
        assert!(verify_jwt(&array_form, &cfg).is_some());
        assert!(verify_jwt(&mismatch, &cfg).is_none());
        assert!(verify_jwt(&missing, &cfg).is_none());
    }

    #[test]
    fn roles_array_extracted() {
        let token = sign(json!({
            "sub": "a", "exp": now() + 600, "roles": ["admin", "", "ops"]
        }));
        let result = verify_jwt(&token, &settings()).unwrap();
        assert_eq!(result.roles, vec!["admin", "ops"]);
    }

    #[test]
    fn single_role_string_extracted() {
        let token = sign(json!({"sub": "a", "exp": now() + 600, "role": "viewer"}));
        let result = verify_jwt(&token, &settings()).unwrap();
        assert_eq!(result.roles, vec!["viewer"]);
    }

    #[test]
    fn custom_user_claim_with_sub_fallback() {
        let mut cfg = settings();
        cfg.user_claim_name = "preferred_username".into();

        let with_claim = sign(json!({
            "sub": "id-1", "preferred_username": "alice", "exp": now() + 600
        }));
        assert_eq!(verify_jwt(&with_claim, &cfg).unwrap().user, "alice");

        let without_claim = sign(json!({"sub": "id-1", "exp": now() + 600}));
        assert_eq!(verify_jwt(&without_claim, &cfg).unwrap().user, "id-1");

        let neither = sign(json!({"exp": now() + 600}));
        assert!(verify_jwt(&neither, &cfg).is_none());
    }

    #[test]
    fn metadata_carries_issuer_and_string_audience() {
        let token = sign(json!({
            "sub": "a", "exp": now() + 600, "iss": "idp", "aud": "api"
        }));
        let result = verify_jwt(&token, &settings()).unwrap();
        assert_eq!(result.metadata.get("issuer").unwrap(), "idp");
        assert_eq!(result.metadata.get("audience").unwrap(), "api");
    }
}
