//! Per-tenant rate limiting.
//!
//! One [`TokenBucket`] per tenant, created lazily on the tenant's first
//! request and evicted by a periodic idle sweep. The bucket map sits behind
//! a single `RwLock`; each bucket has its own `Mutex`, so the hot path takes
//! only a shared map lock plus the tenant's bucket lock.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant};

use super::bucket::TokenBucket;
use crate::config::LimiterSettings;
use crate::tenant::TenantId;

type SharedBucket = Arc<Mutex<TokenBucket>>;

/// Tenant → bucket registry.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    buckets: RwLock<HashMap<TenantId, SharedBucket>>,
    max_requests: u32,
    window: Duration,
    idle_ttl: Duration,
    rejected: AtomicU64,
}

impl RateLimiterRegistry {
    /// Creates a registry admitting `max_requests` per `window` for each
    /// tenant, evicting buckets untouched for `idle_ttl`.
    pub fn new(max_requests: u32, window: Duration, idle_ttl: Duration) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            max_requests: max_requests.max(1),
            window,
            idle_ttl,
            rejected: AtomicU64::new(0),
        }
    }

    pub fn from_settings(settings: &LimiterSettings) -> Self {
        Self::new(
            settings.requests_per_window,
            settings.window(),
            settings.idle_ttl(),
        )
    }

    /// Admits one request for `tenant`, consuming a token on success.
    pub fn allow(&self, tenant: &TenantId) -> bool {
        self.allow_at(tenant, Instant::now())
    }

    /// [`RateLimiterRegistry::allow`] with an explicit current time.
    pub fn allow_at(&self, tenant: &TenantId, now: Instant) -> bool {
        let bucket = self.bucket(tenant, now);
        let admitted = bucket
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .try_acquire_at(now);
        if !admitted {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            tracing::debug!(tenant = %tenant, "Rate limit exceeded");
        }
        admitted
    }

    fn bucket(&self, tenant: &TenantId, now: Instant) -> SharedBucket {
        {
            let buckets = self.buckets.read().unwrap_or_else(|e| e.into_inner());
            if let Some(bucket) = buckets.get(tenant) {
                return Arc::clone(bucket);
            }
        }

        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        // Another request may have created it between the two locks.
        let bucket = buckets.entry(*tenant).or_insert_with(|| {
            tracing::debug!(tenant = %tenant, "Created rate limit bucket");
            Arc::new(Mutex::new(TokenBucket::per_window(
                self.max_requests,
                self.window,
                now,
            )))
        });
        Arc::clone(bucket)
    }

    /// Removes buckets idle for at least the configured TTL. Returns how many
    /// were removed.
    pub fn sweep_idle(&self) -> usize {
        self.sweep_idle_at(Instant::now())
    }

    /// [`RateLimiterRegistry::sweep_idle`] with an explicit current time.
    pub fn sweep_idle_at(&self, now: Instant) -> usize {
        let mut buckets = self.buckets.write().unwrap_or_else(|e| e.into_inner());
        let before = buckets.len();
        let ttl = self.idle_ttl;
        buckets.retain(|_, bucket| {
            !bucket
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .is_idle(now, ttl)
        });
        let removed = before - buckets.len();
        if removed > 0 {
            tracing::debug!(removed, remaining = buckets.len(), "Evicted idle rate limit buckets");
        }
        removed
    }

    /// Spawns a tokio task running [`RateLimiterRegistry::sweep_idle`] every `interval`.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> tokio::task::JoinHandle<()> {
        let registry = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                registry.sweep_idle();
            }
        })
    }

    /// Number of tenants currently holding a bucket.
    pub fn tracked_tenants(&self) -> usize {
        self.buckets
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    /// Total requests rejected since start.
    pub fn rejected_count(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }
}
