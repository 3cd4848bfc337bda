//! The forward-auth decision handler.
//!
//! Sequencing per request: snapshot → client IP → rate limit →
//! forwarded-header resolution → policy match → anonymous short-circuit
//! → verifier chain → policy check → response + audit. The handler owns
//! no mutable state; everything swappable comes from the snapshot.

use std::net::SocketAddr;
use std::time::Instant;

use axum::{
    extract::{ConnectInfo, Request, State},
    response::Response,
};
use http::HeaderMap;

use super::response::{rate_limited_response, success_response, unauthorized_response};
use crate::audit::AuditEvent;
use crate::auth::{
    AuthResult, AuthStore, looks_like_jwt, parse_auth_header, verify_api_key_auth,
    verify_api_key_header, verify_basic, verify_bearer, verify_jwt,
};
use crate::config::AppConfig;
use crate::error::DenyReason;
use crate::middleware::RequestId;
use crate::observability::metrics;
use crate::policy::{check_policy, match_policy};
use crate::state::{AppState, Snapshot};

pub async fn handle_auth(State(state): State<AppState>, req: Request) -> Response {
    let start = Instant::now();
    let snap = state.snapshot();

    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let request_id = req
        .extensions()
        .get::<RequestId>()
        .map(|id| id.0.clone())
        .unwrap_or_default();

    let headers = req.headers();
    let direct_ip = peer.map(|ip| ip.to_string()).unwrap_or_default();
    let client_ip = snap.trusted.client_ip(peer, headers);

    let mut event = AuditEvent {
        request_id,
        client_ip: client_ip.clone(),
        direct_ip,
        trusted_proxy: snap.trusted.is_trusted(peer),
        ..Default::default()
    };

    if let Some(limiter) = &snap.limiter {
        let decision = limiter.allow(&client_ip);
        if !decision.allowed {
            event.result = "rate_limited".into();
            event.reason = DenyReason::RateLimitExceeded.as_str().into();
            event.status = 429;
            emit(&snap, event, start);
            metrics::record_rate_limited();
            return rate_limited_response(decision.retry_after);
        }
    }

    let direct_host = headers
        .get(http::header::HOST)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let direct_uri = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let forwarded = snap.trusted.forwarded(
        peer,
        headers,
        direct_host,
        direct_uri,
        req.method().as_str(),
    );

    if !forwarded.trusted && !snap.trusted.is_empty() {
        tracing::warn!(
            peer = %event.direct_ip,
            "request from untrusted peer; X-Forwarded-* headers ignored"
        );
    }

    event.host = forwarded.host.clone();
    event.uri = forwarded.uri.clone();
    event.method = forwarded.method.clone();

    let policy = match_policy(
        &snap.config.route_policy,
        &forwarded.host,
        &forwarded.uri,
        &forwarded.method,
    );
    if let Some(policy) = policy {
        event.policy = policy.name.clone();
    }

    // Anonymous admission is the policy's call, not the caller's:
    // credentials on the request are not even parsed.
    if let Some(policy) = policy
        && policy.allow_anonymous
    {
        let identity = AuthResult::anonymous();
        fill_identity(&mut event, &identity);
        event.result = "success".into();
        event.status = 200;
        emit(&snap, event, start);
        metrics::record_decision("success", identity.method.as_str());
        return success_response(&snap.config, &identity, Some(policy), &forwarded);
    }

    let auth_header = headers
        .get(http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match verify_credentials(auth_header, headers, &snap.config, &snap.store) {
        Some(identity) => match check_policy(policy, &identity) {
            Ok(()) => {
                if let Some(limiter) = &snap.limiter {
                    limiter.reset(&client_ip);
                }
                fill_identity(&mut event, &identity);
                event.result = "success".into();
                event.status = 200;
                emit(&snap, event, start);
                metrics::record_decision("success", identity.method.as_str());
                success_response(&snap.config, &identity, policy, &forwarded)
            }
            Err(violation) => {
                tracing::debug!(
                    code = violation.code().as_str(),
                    method = identity.method.as_str(),
                    name = %identity.name,
                    "authenticated identity does not satisfy the matched policy"
                );
                fill_identity(&mut event, &identity);
                event.result = "denied".into();
                event.reason = DenyReason::PolicyRequirementsNotMet.as_str().into();
                event.status = 401;
                emit(&snap, event, start);
                metrics::record_decision("denied", identity.method.as_str());
                unauthorized_response(&snap.config, "Policy requirements not met")
            }
        },
        None => {
            event.result = "denied".into();
            event.reason = DenyReason::InvalidCredentials.as_str().into();
            event.status = 401;
            emit(&snap, event, start);
            metrics::record_decision("denied", "none");
            unauthorized_response(&snap.config, "Unauthorized")
        }
    }
}

/// Fixed verifier order: JWT, static Bearer, Basic, `ApiKey` scheme,
/// `X-Api-Key` header. First hit wins.
fn verify_credentials(
    auth_header: &str,
    headers: &HeaderMap,
    config: &AppConfig,
    store: &AuthStore,
) -> Option<AuthResult> {
    if let Some((scheme, token)) = parse_auth_header(auth_header) {
        if scheme.eq_ignore_ascii_case("Bearer") {
            if config.jwt_enabled()
                && looks_like_jwt(token)
                && let Some(result) = verify_jwt(token, &config.jwt)
            {
                return Some(result);
            }
            if let Some(result) = verify_bearer(auth_header, store) {
                return Some(result);
            }
        }
        if scheme.eq_ignore_ascii_case("Basic")
            && let Some(result) = verify_basic(auth_header, store)
        {
            return Some(result);
        }
        if scheme.eq_ignore_ascii_case("ApiKey")
            && let Some(result) = verify_api_key_auth(auth_header, store)
        {
            return Some(result);
        }
    }

    if let Some(value) = headers.get("X-Api-Key").and_then(|v| v.to_str().ok()) {
        return verify_api_key_header(value, store);
    }

    None
}

fn fill_identity(event: &mut AuditEvent, identity: &AuthResult) {
    event.auth_method = identity.method.as_str().into();
    event.auth_name = identity.name.clone();
    event.user = identity.user.clone();
    event.roles = identity.roles.clone();
}

/// Best-effort audit write: failures are logged, never surfaced.
fn emit(snap: &Snapshot, mut event: AuditEvent, start: Instant) {
    event.latency_ms = start.elapsed().as_millis() as u64;
    if let Err(e) = snap.audit.log(&event) {
        tracing::warn!(error = %e, "failed to write audit event");
    }
}
