//! Stable error identifiers carried by audit records and logs.
//!
//! Verifiers and the policy checker never return errors — a failed
//! verification is `None`. These codes exist so that audit consumers and
//! log pipelines can key on identifiers that do not change between
//! releases.

/// Machine-stable error code identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    // Configuration (fatal at load time)
    ConfigNotFound,
    ConfigInvalid,
    ConfigValidation,
    ConfigPermission,
    EnvVarNotSet,

    // Authentication (always a 401, generic message to the caller)
    AuthFailed,
    AuthInvalidHeader,
    AuthExpired,
    AuthInvalidToken,
    AuthInvalidCredentials,

    // Authorization (401, kind recorded internally only)
    AuthzInsufficientRoles,
    AuthzMethodNotAllowed,
    AuthzJwtRequired,

    // Rate limiting
    RateLimitExceeded,

    // Server
    ServerStartup,
    ServerInternal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConfigNotFound => "config_not_found",
            Self::ConfigInvalid => "config_invalid",
            Self::ConfigValidation => "config_validation",
            Self::ConfigPermission => "config_permission",
            Self::EnvVarNotSet => "env_var_not_set",
            Self::AuthFailed => "auth_failed",
            Self::AuthInvalidHeader => "auth_invalid_header",
            Self::AuthExpired => "auth_expired",
            Self::AuthInvalidToken => "auth_invalid_token",
            Self::AuthInvalidCredentials => "auth_invalid_credentials",
            Self::AuthzInsufficientRoles => "authz_insufficient_roles",
            Self::AuthzMethodNotAllowed => "authz_method_not_allowed",
            Self::AuthzJwtRequired => "authz_jwt_required",
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::ServerStartup => "server_startup",
            Self::ServerInternal => "server_internal",
        }
    }
}

/// The three audited deny outcomes. The audit `reason` field carries
/// exactly these strings; finer-grained causes are traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    RateLimitExceeded,
    PolicyRequirementsNotMet,
    InvalidCredentials,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RateLimitExceeded => "rate_limit_exceeded",
            Self::PolicyRequirementsNotMet => "policy_requirements_not_met",
            Self::InvalidCredentials => "invalid_credentials",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_snake_case_and_stable() {
        // Audit consumers key on these exact strings.
        let table = [
            (ErrorCode::ConfigNotFound, "config_not_found"),
            (ErrorCode::ConfigInvalid, "config_invalid"),
            (ErrorCode::ConfigValidation, "config_validation"),
            (ErrorCode::ConfigPermission, "config_permission"),
            (ErrorCode::EnvVarNotSet, "env_var_not_set"),
            (ErrorCode::AuthFailed, "auth_failed"),
            (ErrorCode::AuthInvalidHeader, "auth_invalid_header"),
            (ErrorCode::AuthExpired, "auth_expired"),
            (ErrorCode::AuthInvalidToken, "auth_invalid_token"),
            (ErrorCode::AuthInvalidCredentials, "auth_invalid_credentials"),
            (ErrorCode::AuthzInsufficientRoles, "authz_insufficient_roles"),
            (ErrorCode::AuthzMethodNotAllowed, "authz_method_not_allowed"),
            (ErrorCode::AuthzJwtRequired, "authz_jwt_required"),
            (ErrorCode::RateLimitExceeded, "rate_limit_exceeded"),
            (ErrorCode::ServerStartup, "server_startup"),
            (ErrorCode::ServerInternal, "server_internal"),
        ];
        for (code, expected) in table {
            assert_eq!(code.as_str(), expected);
        }
    }

    #[test]
    fn deny_reasons_match_audit_contract() {
        assert_eq!(DenyReason::RateLimitExceeded.as_str(), "rate_limit_exceeded");
        assert_eq!(
            DenyReason::PolicyRequirementsNotMet.as_str(),
            "policy_requirements_not_met"
        );
        assert_eq!(DenyReason::InvalidCredentials.as_str(), "invalid_credentials");
    }
}
