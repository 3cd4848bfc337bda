use serde::{Deserialize, Serialize};

/// A route policy. The matcher selects the highest-priority policy whose
/// filters all match; the checker then enforces its constraints.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoutePolicy {
    /// Unique identifier, recorded in audit events.
    pub name: String,

    /// Host pattern. Empty matches any host; `*.example.com` matches
    /// hosts ending in `.example.com`; otherwise case-insensitive
    /// equality.
    #[serde(default)]
    pub host: String,

    /// Literal URI prefix. Empty matches any URI.
    #[serde(default)]
    pub path_prefix: String,

    /// HTTP method, compared case-insensitively. Empty matches any.
    #[serde(default)]
    pub method: String,

    /// Higher priority is evaluated first; ties keep configuration order.
    #[serde(default)]
    pub priority: i32,

    /// Admit without credentials, producing an `anonymous` identity.
    #[serde(default)]
    pub allow_anonymous: bool,

    /// Basic credential names admitted by this policy. Empty admits all.
    #[serde(default)]
    pub allowed_basic_names: Vec<String>,

    /// Bearer credential names admitted by this policy. Empty admits all.
    #[serde(default)]
    pub allowed_bearer_names: Vec<String>,

    /// API-key credential names admitted by this policy. Empty admits all.
    #[serde(default)]
    pub allowed_api_key_names: Vec<String>,

    /// Only JWT-authenticated requests pass.
    #[serde(default)]
    pub jwt_only: bool,

    /// Every listed role must be present on the identity.
    #[serde(default)]
    pub require_all_roles: Vec<String>,

    /// At least one listed role must be present on the identity.
    #[serde(default)]
    pub require_any_role: Vec<String>,

    /// Replace the outbound Authorization header with this value on
    /// success.
    #[serde(default)]
    pub inject_authorization: String,
}
