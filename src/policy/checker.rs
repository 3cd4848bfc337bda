use crate::auth::{AuthMethod, AuthResult};
use crate::config::RoutePolicy;
use crate::error::ErrorCode;

/// Why the checker refused an authenticated identity. Recorded at debug
/// level; the audited reason is always `policy_requirements_not_met`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyViolation {
    JwtRequired,
    MethodNotAllowed,
    InsufficientRoles,
}

impl PolicyViolation {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::JwtRequired => ErrorCode::AuthzJwtRequired,
            Self::MethodNotAllowed => ErrorCode::AuthzMethodNotAllowed,
            Self::InsufficientRoles => ErrorCode::AuthzInsufficientRoles,
        }
    }
}

/// Decide whether an authenticated identity satisfies the matched policy.
///
/// No policy admits any valid identity. Anonymous admission is handled
/// upstream before verification, so the checker only ever sees real
/// credentials.
pub fn check_policy(
    policy: Option<&RoutePolicy>,
    result: &AuthResult,
) -> Result<(), PolicyViolation> {
    let Some(policy) = policy else {
        return Ok(());
    };

    check_method(policy, result)?;
    check_roles(policy, result)
}

fn check_method(policy: &RoutePolicy, result: &AuthResult) -> Result<(), PolicyViolation> {
    // The jwt_only gate runs before any allow-list.
    if policy.jwt_only && result.method != AuthMethod::Jwt {
        return Err(PolicyViolation::JwtRequired);
    }

    let allowed = match result.method {
        AuthMethod::Basic => &policy.allowed_basic_names,
        AuthMethod::Bearer => &policy.allowed_bearer_names,
        AuthMethod::ApiKey => &policy.allowed_api_key_names,
        // JWT identities carry no credential name; allow-lists do not
        // apply to them.
        AuthMethod::Jwt | AuthMethod::Anonymous => return Ok(()),
    };

    if !allowed.is_empty() && !allowed.iter().any(|n| *n == result.name) {
        return Err(PolicyViolation::MethodNotAllowed);
    }

    Ok(())
}

fn check_roles(policy: &RoutePolicy, result: &AuthResult) -> Result<(), PolicyViolation> {
    if !policy.require_all_roles.is_empty()
        && !policy.require_all_roles.iter().all(|r| result.has_role(r))
    {
        return Err(PolicyViolation::InsufficientRoles);
    }

    if !policy.require_any_role.is_empty()
        && !policy.require_any_role.iter().any(|r| result.has_role(r))
    {
        return Err(PolicyViolation::InsufficientRoles);
    }

    Ok(())
}
