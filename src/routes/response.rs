//! Response shaping.
//!
//! Every header value derived from request data or configuration passes
//! through [`sanitize_header_value`] before it reaches the wire; the
//! proxy copies these headers verbatim onto the upstream request, so CR
//! and LF here would be header injection one hop later.

use std::time::Duration;

use axum::{
    Json,
    response::{IntoResponse, Response},
};
use http::{HeaderName, HeaderValue, StatusCode, header};
use serde_json::json;

use crate::auth::AuthResult;
use crate::config::{AppConfig, EXTRA_ROUTE, EXTRA_TIMESTAMP, RoutePolicy};
use crate::forward::ForwardedRequest;

const MAX_HEADER_VALUE_LEN: usize = 1024;

/// Strip CR/LF and cap at 1024 bytes (on a char boundary). Idempotent.
pub fn sanitize_header_value(value: &str) -> String {
    let mut out: String = value.chars().filter(|c| *c != '\r' && *c != '\n').collect();

    if out.len() > MAX_HEADER_VALUE_LEN {
        let mut cut = MAX_HEADER_VALUE_LEN;
        while !out.is_char_boundary(cut) {
            cut -= 1;
        }
        out.truncate(cut);
    }

    out
}

/// 200 with identity headers; the proxy copies them upstream.
pub fn success_response(
    config: &AppConfig,
    result: &AuthResult,
    policy: Option<&RoutePolicy>,
    forwarded: &ForwardedRequest,
) -> Response {
    let mut response = (StatusCode::OK, "ok").into_response();
    let headers = response.headers_mut();
    let names = &config.headers;

    if !names.method_header.is_empty() {
        set_header(headers, &names.method_header, result.method.as_str());
    }

    if !names.user_header.is_empty() {
        if !result.user.is_empty() {
            set_header(headers, &names.user_header, &result.user);
        } else if !result.name.is_empty() {
            set_header(headers, &names.user_header, &result.name);
        }
    }

    if !names.role_header.is_empty() && !result.roles.is_empty() {
        set_header(headers, &names.role_header, &result.roles.join(","));
    }

    for extra in &names.extra_headers {
        match extra.as_str() {
            EXTRA_TIMESTAMP => {
                set_header(headers, extra, &chrono::Utc::now().timestamp().to_string());
            }
            EXTRA_ROUTE => {
                set_header(
                    headers,
                    extra,
                    &format!("{}{}", forwarded.host, forwarded.uri),
                );
            }
            _ => {}
        }
    }

    if names.include_jwt_metadata {
        for (key, value) in &result.metadata {
            set_header(headers, &metadata_header_name(key), value);
        }
    }

    // Must stay the last write to Authorization: this is the contract by
    // which trust-zone credentials replace whatever the client sent.
    if let Some(policy) = policy
        && !policy.inject_authorization.is_empty()
    {
        let sanitized = sanitize_header_value(&policy.inject_authorization);
        if let Ok(value) = HeaderValue::from_str(&sanitized) {
            headers.insert(header::AUTHORIZATION, value);
        }
    }

    response
}

/// 401 with one challenge per configured scheme.
pub fn unauthorized_response(config: &AppConfig, message: &str) -> Response {
    let body = Json(json!({
        "error": message,
        "timestamp": chrono::Utc::now().timestamp(),
    }));
    let mut response = (StatusCode::UNAUTHORIZED, body).into_response();
    let headers = response.headers_mut();

    if !config.basic_auth.is_empty() {
        headers.append(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(r#"Basic realm="api""#),
        );
    }
    if !config.bearer_token.is_empty() || config.jwt_enabled() {
        headers.append(
            header::WWW_AUTHENTICATE,
            HeaderValue::from_static(r#"Bearer realm="api""#),
        );
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));

    response
}

/// 429 with a ceiled Retry-After of at least one second.
pub fn rate_limited_response(retry_after: Duration) -> Response {
    let secs = (retry_after.as_secs_f64().ceil() as u64).max(1);

    let body = Json(json!({
        "error": "Rate limit exceeded",
        "retry_after": secs,
        "timestamp": chrono::Utc::now().timestamp(),
    }));
    let mut response = (StatusCode::TOO_MANY_REQUESTS, body).into_response();

    if let Ok(value) = HeaderValue::try_from(secs.to_string()) {
        response.headers_mut().insert(header::RETRY_AFTER, value);
    }

    response
}

fn set_header(headers: &mut http::HeaderMap, name: &str, value: &str) {
    let Ok(name) = HeaderName::try_from(name) else {
        return;
    };
    if let Ok(value) = HeaderValue::from_str(&sanitize_header_value(value)) {
        headers.insert(name, value);
    }
}

/// `issuer` becomes `X-Auth-Issuer`.
fn metadata_header_name(key: &str) -> String {
    let mut chars = key.chars();
    let title = match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
        None => String::new(),
    };
    format!("X-Auth-{title}")
}
