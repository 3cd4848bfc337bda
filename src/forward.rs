//! Proxy-trust resolution.
//!
//! X-Forwarded-* headers are attacker-controlled unless the direct peer
//! is a known proxy. The trusted set is parsed once per config load;
//! every per-request decision starts from the direct peer IP.

use std::net::IpAddr;

use http::HeaderMap;
use ipnet::IpNet;

/// The parsed trusted-proxy set.
///
/// An empty set trusts every peer — the documented backwards-compatible
/// default, warned about at config load.
#[derive(Debug, Default)]
pub struct TrustedProxies {
    nets: Vec<IpNet>,
}

/// Effective request coordinates after trust resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardedRequest {
    pub host: String,
    pub uri: String,
    pub method: String,
    pub trusted: bool,
}

impl TrustedProxies {
    /// Parse IP/CIDR strings. Bare IPs widen to host networks (/32 or
    /// /128). Entries were syntax-checked at config load; anything
    /// unparsable here is skipped.
    pub fn parse(entries: &[String]) -> Self {
        let nets = entries
            .iter()
            .filter_map(|entry| {
                entry
                    .parse::<IpNet>()
                    .ok()
                    .or_else(|| entry.parse::<IpAddr>().ok().map(IpNet::from))
            })
            .collect();
        Self { nets }
    }

    pub fn is_empty(&self) -> bool {
        self.nets.is_empty()
    }

    /// Whether a direct peer may rewrite request metadata.
    pub fn is_trusted(&self, peer: Option<IpAddr>) -> bool {
        if self.nets.is_empty() {
            return true;
        }
        match peer {
            Some(ip) => self.nets.iter().any(|net| net.contains(&ip)),
            None => false,
        }
    }

    /// Resolve the effective client IP.
    ///
    /// Untrusted peers are their own client IP regardless of headers.
    /// Trusted peers may substitute the left-most non-empty
    /// X-Forwarded-For entry.
    pub fn client_ip(&self, peer: Option<IpAddr>, headers: &HeaderMap) -> String {
        let direct = peer.map(|ip| ip.to_string()).unwrap_or_default();

        if !self.is_trusted(peer) {
            return direct;
        }

        if let Some(forwarded) = header_str(headers, "X-Forwarded-For")
            && let Some(leftmost) = forwarded.split(',').map(str::trim).find(|s| !s.is_empty())
        {
            return leftmost.to_string();
        }

        direct
    }

    /// Resolve the effective (host, uri, method) for policy matching.
    pub fn forwarded(
        &self,
        peer: Option<IpAddr>,
        headers: &HeaderMap,
        direct_host: &str,
        direct_uri: &str,
        direct_method: &str,
    ) -> ForwardedRequest {
        if !self.is_trusted(peer) {
            return ForwardedRequest {
                host: normalize_host(direct_host),
                uri: direct_uri.to_string(),
                method: direct_method.to_string(),
                trusted: false,
            };
        }

        let host = header_str(headers, "X-Forwarded-Host")
            .or_else(|| header_str(headers, "X-Forwarded-Server"))
            .unwrap_or(direct_host);
        let uri = header_str(headers, "X-Forwarded-Uri").unwrap_or(direct_uri);
        let method = header_str(headers, "X-Forwarded-Method").unwrap_or(direct_method);

        ForwardedRequest {
            host: normalize_host(host),
            uri: uri.to_string(),
            method: method.to_string(),
            trusted: true,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Strip the port and IPv6 brackets, lower-case.
fn normalize_host(host: &str) -> String {
    let host = host.trim();

    // Bracketed IPv6, possibly with a port: [::1]:8080
    if let Some(rest) = host.strip_prefix('[') {
        if let Some(end) = rest.find(']') {
            return rest[..end].to_ascii_lowercase();
        }
        return rest.to_ascii_lowercase();
    }

    // A single colon separates a port; more than one is a bare IPv6
    // address, left intact.
    match host.match_indices(':').count() {
        1 => host.split(':').next().unwrap_or(host).to_ascii_lowercase(),
        _ => host.to_ascii_lowercase(),
    }
}
