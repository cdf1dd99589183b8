//! Per-tenant entry snapshot caching using Moka.
//!
//! Metrics are reduced from a full entry snapshot. Snapshots are cached per
//! tenant and dropped whenever the dispatcher delivers a change for that
//! tenant, so readers see writes once their events are processed and at
//! the latest after the TTL.
//!
//! Each invalidation bumps a per-tenant generation. A load that started
//! before an invalidation still answers its caller but is not cached.

use moka::sync::Cache;
use solaris_shared::config::MetricsCacheConfig;
use solaris_shared::types::TenantId;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::ledger::types::Entry;

/// Default cache capacity (number of tenants).
const DEFAULT_CACHE_CAPACITY: u64 = 1_000;

/// Default time-to-live for snapshots (5 minutes).
const DEFAULT_TTL_SECS: u64 = 300;

/// Shared entry snapshot of one tenant.
pub type Snapshot = Arc<Vec<Entry>>;

#[derive(Debug, Default)]
struct Generations {
    all: u64,
    tenants: HashMap<TenantId, u64>,
}

impl Generations {
    fn token(&self, tenant_id: TenantId) -> (u64, u64) {
        (self.all, self.tenants.get(&tenant_id).copied().unwrap_or_default())
    }
}

/// Cache of tenant entry snapshots. Clones share the same cache.
#[derive(Clone)]
pub struct MetricsCache {
    cache: Cache<TenantId, Snapshot>,
    generations: Arc<Mutex<Generations>>,
}

impl MetricsCache {
    /// Creates a cache with default settings: 1000 tenants, 5 minute TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DEFAULT_CACHE_CAPACITY, DEFAULT_TTL_SECS)
    }

    /// Creates a cache with custom configuration.
    ///
    /// # Arguments
    ///
    /// * `max_capacity` - Maximum number of tenant snapshots
    /// * `ttl_secs` - Time-to-live in seconds for each snapshot
    #[must_use]
    pub fn with_config(max_capacity: u64, ttl_secs: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self {
            cache,
            generations: Arc::default(),
        }
    }

    /// Creates a cache sized by the `metrics_cache` config section.
    #[must_use]
    pub fn from_config(config: &MetricsCacheConfig) -> Self {
        Self::with_config(config.capacity, config.ttl_secs)
    }

    /// Returns the cached snapshot of a tenant, loading it on a miss.
    ///
    /// A failed load caches nothing, and neither does a load overtaken by
    /// an invalidation of the same tenant.
    ///
    /// # Errors
    ///
    /// Returns the loader's error.
    pub async fn get_or_load<F, Fut, E>(&self, tenant_id: TenantId, load: F) -> Result<Snapshot, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<Entry>, E>>,
    {
        if let Some(snapshot) = self.cache.get(&tenant_id) {
            return Ok(snapshot);
        }

        let started = self.generations().token(tenant_id);
        let snapshot = Arc::new(load().await?);

        let generations = self.generations();
        if generations.token(tenant_id) == started {
            self.cache.insert(tenant_id, Arc::clone(&snapshot));
        }
        Ok(snapshot)
    }

    /// Drops the snapshot of a tenant.
    pub fn invalidate(&self, tenant_id: TenantId) {
        let mut generations = self.generations();
        let generation = generations.tenants.entry(tenant_id).or_default();
        *generation = generation.wrapping_add(1);
        self.cache.invalidate(&tenant_id);
    }

    /// Drops every snapshot.
    pub fn invalidate_all(&self) {
        let mut generations = self.generations();
        generations.all = generations.all.wrapping_add(1);
        self.cache.invalidate_all();
    }

    fn generations(&self) -> MutexGuard<'_, Generations> {
        self.generations.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the number of snapshots currently cached.
    #[must_use]
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }

    /// Runs pending maintenance so counts reflect recent writes.
    pub fn run_pending_tasks(&self) {
        self.cache.run_pending_tasks();
    }
}

impl Default for MetricsCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MetricsCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}
