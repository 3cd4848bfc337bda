use crate::config::RoutePolicy;

/// Select the policy governing `(host, uri, method)`.
///
/// Policies are evaluated in priority order, highest first; ties keep
/// configuration order (stable sort over a local copy — the input slice
/// is never reordered). The first policy whose filters all match wins.
pub fn match_policy<'a>(
    policies: &'a [RoutePolicy],
    host: &str,
    uri: &str,
    method: &str,
) -> Option<&'a RoutePolicy> {
    if policies.is_empty() {
        return None;
    }

    let mut ordered: Vec<&RoutePolicy> = policies.iter().collect();
    ordered.sort_by(|a, b| b.priority.cmp(&a.priority));

    ordered.into_iter().find(|policy| {
        host_matches(&policy.host, host)
            && (policy.path_prefix.is_empty() || uri.starts_with(&policy.path_prefix))
            && (policy.method.is_empty() || policy.method.eq_ignore_ascii_case(method))
    })
}

/// Empty pattern matches everything; `*.suffix` matches hosts ending in
/// `.suffix`; otherwise case-insensitive equality.
fn host_matches(pattern: &str, host: &str) -> bool {
    if pattern.is_empty() {
        return true;
    }
    if let Some(suffix) = pattern.strip_prefix("*.") {
        let suffix = format!(".{suffix}");
        return host
            .to_ascii_lowercase()
            .ends_with(&suffix.to_ascii_lowercase());
    }
    pattern.eq_ignore_ascii_case(host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(name: &str, host: &str, path: &str, method: &str, priority: i32) -> RoutePolicy {
        RoutePolicy {
            name: name.into(),
            host: host.into(),
            path_prefix: path.into(),
            method: method.into(),
            priority,
            ..Default::default()
        }
    }

    #[test]
    fn empty_filters_match_everything() {
        let policies = vec![policy("all", "", "", "", 0)];
        let matched = match_policy(&policies, "any.example.com", "/x", "DELETE").unwrap();
        assert_eq!(matched.name, "all");
    }

    #[test]
    fn host_exact_match_is_case_insensitive() {
        let policies = vec![policy("p", "API.Example.Com", "", "", 0)];
        assert!(match_policy(&policies, "api.example.com", "/", "GET").is_some());
        assert!(match_policy(&policies, "other.example.com", "/", "GET").is_none());
    }

    #[test]
    fn host_wildcard_matches_subdomains() {
        let policies = vec![policy("p", "*.example.com", "", "", 0)];
        assert!(match_policy(&policies, "api.example.com", "/", "GET").is_some());
        assert!(match_policy(&policies, "a.b.example.com", "/", "GET").is_some());
        // The bare apex does not end with ".example.com".
        assert!(match_policy(&policies, "example.com", "/", "GET").is_none());
        assert!(match_policy(&policies, "example.org", "/", "GET").is_none());
    }

    #[test]
    fn path_prefix_is_literal() {
        let policies = vec![policy("p", "", "/api", "", 0)];
        assert!(match_policy(&policies, "h", "/api", "GET").is_some());
        assert!(match_policy(&policies, "h", "/api/v1/users", "GET").is_some());
        assert!(match_policy(&policies, "h", "/apx", "GET").is_none());
        assert!(match_policy(&policies, "h", "/", "GET").is_none());
    }

    #[test]
    fn method_filter_is_case_insensitive() {
        let policies = vec![policy("p", "", "", "post", 0)];
        assert!(match_policy(&policies, "h", "/", "POST").is_some());
        assert!(match_policy(&policies, "h", "/", "GET").is_none());
    }

    #[test]
    fn higher_priority_wins_over_configuration_order() {
        let policies = vec![
            policy("low", "", "/", "", 1),
            policy("high", "", "/", "", 10),
        ];
        assert_eq!(match_policy(&policies, "h", "/", "GET").unwrap().name, "high");
    }

    #[test]
    fn ties_keep_configuration_order() {
        let policies = vec![
            policy("first", "", "/", "", 5),
            policy("second", "", "/", "", 5),
        ];
        assert_eq!(
            match_policy(&policies, "h", "/", "GET").unwrap().name,
            "first"
        );
    }

    #[test]
    fn first_matching_policy_in_priority_order_wins() {
        let policies = vec![
            policy("narrow", "", "/api", "", 1),
            policy("broad", "", "/", "", 10),
        ];
        // "broad" has higher priority and matches, despite "narrow" being
        // a tighter fit.
        assert_eq!(
            match_policy(&policies, "h", "/api/x", "GET").unwrap().name,
            "broad"
        );
    }

    #[test]
    fn no_match_returns_none() {
        let policies = vec![policy("p", "a.com", "/x", "GET", 0)];
        assert!(match_policy(&policies, "b.com", "/x", "GET").is_none());
        assert!(match_policy(&[], "a.com", "/x", "GET").is_none());
    }

    #[test]
    fn input_slice_is_not_reordered() {
        let policies = vec![
            policy("low", "", "/", "", 1),
            policy("high", "", "/", "", 10),
        ];
        let before: Vec<String> = policies.iter().map(|p| p.name.clone()).collect();
        let _ = match_policy(&policies, "h", "/", "GET");
        let after: Vec<String> = policies.iter().map(|p| p.name.clone()).collect();
        assert_eq!(before, after);
    }
}
