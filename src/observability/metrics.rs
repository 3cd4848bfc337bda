//! Metric recording helpers.
//!
//! Counters go through the `metrics` facade; wiring an exporter is a
//! deployment concern. Recording against an unset recorder is a no-op.

use metrics::counter;

/// One forward-auth decision. `result` is success/denied/rate_limited.
pub fn record_decision(result: &'static str, method: &str) {
    counter!(
        "authgate_decisions_total",
        "result" => result,
        "method" => method.to_string(),
    )
    .increment(1);
}

/// A request refused by the rate limiter.
pub fn record_rate_limited() {
    counter!("authgate_rate_limited_total").increment(1);
}

/// A panic converted to a 500 by the recovery middleware. These are
/// bugs.
pub fn record_panic() {
    counter!("authgate_recovered_panics_total").increment(1);
}

/// A configuration reload, by outcome.
pub fn record_reload(outcome: &'static str) {
    counter!("authgate_reloads_total", "outcome" => outcome).increment(1);
}
