//! Config/store lifecycle.
//!
//! All swappable pieces live behind one reader/writer lock. Handlers
//! take a read lock just long enough to clone the Arcs, then work on
//! the snapshot; a reload replaces every field at once so no request
//! ever sees a half-swapped view.

use std::sync::{Arc, RwLock};

use crate::audit::{AuditError, AuditLogger};
use crate::auth::AuthStore;
use crate::config::AppConfig;
use crate::forward::TrustedProxies;
use crate::observability::metrics;
use crate::ratelimit::RateLimiter;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<RwLock<Shared>>,
}

struct Shared {
    config: Arc<AppConfig>,
    store: Arc<AuthStore>,
    audit: Arc<AuditLogger>,
    limiter: Option<Arc<RateLimiter>>,
    trusted: Arc<TrustedProxies>,
}

/// A consistent view of the swappable state, valid for one request.
pub struct Snapshot {
    pub config: Arc<AppConfig>,
    pub store: Arc<AuthStore>,
    pub audit: Arc<AuditLogger>,
    pub limiter: Option<Arc<RateLimiter>>,
    pub trusted: Arc<TrustedProxies>,
}

impl AppState {
    /// Build the initial state. Must run inside a tokio runtime (the
    /// rate limiter spawns its sweeper).
    pub fn new(config: AppConfig) -> Result<Self, AuditError> {
        let shared = Shared::build(config, None)?;
        Ok(Self {
            inner: Arc::new(RwLock::new(shared)),
        })
    }

    /// Clone the current Arcs under a short read lock.
    pub fn snapshot(&self) -> Snapshot {
        let shared = self.inner.read().expect("state lock poisoned");
        Snapshot {
            config: Arc::clone(&shared.config),
            store: Arc::clone(&shared.store),
            audit: Arc::clone(&shared.audit),
            limiter: shared.limiter.clone(),
            trusted: Arc::clone(&shared.trusted),
        }
    }

    /// Swap in a freshly loaded configuration.
    ///
    /// The limiter carries over when its parameters are unchanged, so a
    /// reload does not forgive outstanding bans; it is stopped and
    /// rebuilt when enablement or parameters differ. The old audit
    /// logger is flushed after the swap.
    pub fn reload(&self, config: AppConfig) -> Result<(), AuditError> {
        let carried_limiter = {
            let shared = self.inner.read().expect("state lock poisoned");
            match &shared.limiter {
                Some(old) if config.rate_limit.enabled && *old.config() == config.rate_limit => {
                    Some(Arc::clone(old))
                }
                _ => None,
            }
        };

        let new_shared = Shared::build(config, carried_limiter)?;

        let (old_audit, old_limiter, new_limiter) = {
            let mut shared = self.inner.write().expect("state lock poisoned");
            let old_audit = Arc::clone(&shared.audit);
            let old_limiter = shared.limiter.clone();
            *shared = new_shared;
            (old_audit, old_limiter, shared.limiter.clone())
        };

        if let Some(old) = old_limiter {
            let carried = new_limiter
                .as_ref()
                .is_some_and(|new| Arc::ptr_eq(&old, new));
            if !carried {
                old.stop();
            }
        }
        old_audit.close();

        metrics::record_reload("success");
        tracing::info!("configuration reloaded");
        Ok(())
    }

    /// Graceful-shutdown teardown: stop the sweeper, flush the audit
    /// stream.
    pub fn shutdown(&self) {
        let shared = self.inner.read().expect("state lock poisoned");
        if let Some(limiter) = &shared.limiter {
            limiter.stop();
        }
        shared.audit.close();
    }
}

impl Shared {
    fn build(
        config: AppConfig,
        carried_limiter: Option<Arc<RateLimiter>>,
    ) -> Result<Self, AuditError> {
        let store = AuthStore::build(&config);
        let trusted = TrustedProxies::parse(&config.server.trusted_proxies);
        let audit = AuditLogger::new(&config.audit)?;

        let limiter = if config.rate_limit.enabled {
            Some(carried_limiter.unwrap_or_else(|| RateLimiter::start(config.rate_limit.clone())))
        } else {
            None
        };

        Ok(Self {
            config: Arc::new(config),
            store: Arc::new(store),
            audit: Arc::new(audit),
            limiter,
            trusted: Arc::new(trusted),
        })
    }
}
