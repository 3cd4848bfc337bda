//! Sliding-window rate limiting with temporary bans.
//!
//! State is a single mutex-guarded map keyed on the resolved client IP.
//! Every operation is short and holds no other lock. A background
//! sweeper drops idle records every five minutes so one-off IPs do not
//! accumulate forever.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::config::RateLimitConfig;

const SWEEP_INTERVAL: Duration = Duration::from_secs(300);

/// Outcome of an `allow` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub retry_after: Duration,
}

/// Read-only view of one client's state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateStats {
    pub attempts: usize,
    pub banned: bool,
    pub retry_after: Duration,
}

#[derive(Debug, Default)]
struct ClientRecord {
    attempts: Vec<Instant>,
    banned_until: Option<Instant>,
}

/// Process-wide limiter. Survives config reloads unless the rate-limit
/// parameters change, in which case the lifecycle stops it and builds a
/// fresh one.
pub struct RateLimiter {
    records: Mutex<HashMap<String, ClientRecord>>,
    config: RateLimitConfig,
    shutdown: CancellationToken,
}

impl RateLimiter {
    /// Create the limiter and start its sweeper task. Must be called
    /// from within a tokio runtime.
    pub fn start(config: RateLimitConfig) -> Arc<Self> {
        let limiter = Arc::new(Self {
            records: Mutex::new(HashMap::new()),
            config,
            shutdown: CancellationToken::new(),
        });

        let sweeper = Arc::clone(&limiter);
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(SWEEP_INTERVAL);
            interval.tick().await; // first tick fires immediately
            loop {
                tokio::select! {
                    _ = sweeper.shutdown.cancelled() => break,
                    _ = interval.tick() => sweeper.sweep(),
                }
            }
        });

        limiter
    }

    /// Parameters this limiter was built with, compared on reload.
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Record an attempt for `ip` and decide whether it may proceed.
    pub fn allow(&self, ip: &str) -> RateDecision {
        let window = Duration::from_secs(self.config.window_secs);
        let ban = Duration::from_secs(self.config.ban_secs);
        let now = Instant::now();

        let mut records = self.records.lock().expect("rate limiter poisoned");
        let record = records.entry(ip.to_string()).or_default();

        if let Some(until) = record.banned_until {
            if now < until {
                return RateDecision {
                    allowed: false,
                    retry_after: until - now,
                };
            }
            // Ban expired: fresh window.
            record.attempts.clear();
            record.banned_until = None;
        }

        record.attempts.retain(|t| now.duration_since(*t) < window);

        if record.attempts.len() >= self.config.max_attempts as usize {
            record.banned_until = Some(now + ban);
            return RateDecision {
                allowed: false,
                retry_after: ban,
            };
        }

        record.attempts.push(now);
        RateDecision {
            allowed: true,
            retry_after: Duration::ZERO,
        }
    }

    /// Forget a client entirely. Called after successful authentication
    /// so a legitimate user never inherits their own failed attempts.
    pub fn reset(&self, ip: &str) {
        self.records
            .lock()
            .expect("rate limiter poisoned")
            .remove(ip);
    }

    /// Read-only stats for one client.
    pub fn stats(&self, ip: &str) -> RateStats {
        let window = Duration::from_secs(self.config.window_secs);
        let now = Instant::now();

        let records = self.records.lock().expect("rate limiter poisoned");
        let Some(record) = records.get(ip) else {
            return RateStats {
                attempts: 0,
                banned: false,
                retry_after: Duration::ZERO,
            };
        };

        if let Some(until) = record.banned_until
            && now < until
        {
            return RateStats {
                attempts: record.attempts.len(),
                banned: true,
                retry_after: until - now,
            };
        }

        RateStats {
            attempts: record
                .attempts
                .iter()
                .filter(|t| now.duration_since(**t) < window)
                .count(),
            banned: false,
            retry_after: Duration::ZERO,
        }
    }

    /// Total tracked clients, for monitoring.
    pub fn tracked_clients(&self) -> usize {
        self.records.lock().expect("rate limiter poisoned").len()
    }

    /// Stop the sweeper task.
    pub fn stop(&self) {
        self.shutdown.cancel();
    }

    /// Drop records whose attempts all fell out of the window and whose
    /// ban has expired.
    fn sweep(&self) {
        let window = Duration::from_secs(self.config.window_secs);
        let now = Instant::now();

        let mut records = self.records.lock().expect("rate limiter poisoned");
        records.retain(|_, record| {
            if let Some(until) = record.banned_until
                && now < until
            {
                return true;
            }
            record
                .attempts
                .iter()
                .any(|t| now.duration_since(*t) < window)
        });
    }
}

impl Drop for RateLimiter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
