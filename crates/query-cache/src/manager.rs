//! Cache manager: loading, handing out and invalidating snapshots

use crate::config::CacheConfig;
use crate::invalidation::{CacheInvalidator, InvalidationEvent, UnitOfWork};
use crate::queryset::{CachedQuerySet, QueryContext};
use crate::registry::SnapshotRegistry;
use crate::snapshot::Snapshot;
use crate::stats::CacheStats;
use query_core::{Model, Result};
use query_executor::AuthoritativeSource;
use std::sync::Arc;
use tracing::{debug, info};

/// Owns the snapshot registry for one process or test harness
#[derive(Debug)]
pub struct CacheManager {
    registry: SnapshotRegistry,
    config: CacheConfig,
    context: Arc<QueryContext>,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        let context = QueryContext::new(&config, Arc::new(CacheStats::new()));
        Self {
            registry: SnapshotRegistry::new(),
            config,
            context: Arc::new(context),
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(CacheConfig::default())
    }

    /// Fetch every instance of `M` from `source` and register the result.
    ///
    /// Replaces any snapshot already loaded for `M`. Returns the number of
    /// rows loaded, or 0 without touching the source when the cache is
    /// disabled.
    pub fn load_snapshot<M: Model>(&self, source: &dyn AuthoritativeSource<M>) -> Result<usize> {
        if !self.config.enabled {
            debug!(model = M::NAME, "cache disabled, skipping snapshot load");
            return Ok(0);
        }

        let rows = source.fetch(&source.all(M::NAME))?;
        let count = rows.len();
        let replaced = self.registry.insert(Snapshot::<M>::from_rows(rows));

        self.context.stats.record_load();
        self.context
            .stats
            .set_snapshot_count(self.registry.len() as u64);
        info!(model = M::NAME, rows = count, replaced, "loaded snapshot");
        Ok(count)
    }

    /// Default handle for `M`, seeded with a copy of its snapshot if one is
    /// registered
    pub fn get_handle<M: Model>(&self, source: Arc<dyn AuthoritativeSource<M>>) -> CachedQuerySet<M> {
        let query = source.all(M::NAME);
        let snapshot = if self.config.enabled {
            self.registry.get::<M>()
        } else {
            None
        };
        debug!(model = M::NAME, cached = snapshot.is_some(), "handing out queryset");
        CachedQuerySet::from_parts(source, query, snapshot, Arc::clone(&self.context))
    }

    /// Drop every snapshot; returns how many were registered
    pub fn invalidate_all(&self) -> usize {
        let dropped = self.registry.clear();
        self.context.stats.record_invalidation();
        self.context.stats.set_snapshot_count(0);
        info!(dropped, "invalidated all snapshots");
        dropped
    }

    /// Drop the snapshot for `M` only
    pub fn evict<M: Model>(&self) -> bool {
        let evicted = self.registry.evict::<M>();
        if evicted {
            self.context
                .stats
                .set_snapshot_count(self.registry.len() as u64);
            debug!(model = M::NAME, "evicted snapshot");
        }
        evicted
    }

    pub fn is_loaded<M: Model>(&self) -> bool {
        self.registry.contains::<M>()
    }

    /// Start a unit of work; every snapshot is dropped when the guard is
    /// finished or dropped
    pub fn begin_unit_of_work(&self) -> UnitOfWork<'_> {
        UnitOfWork::new(self)
    }

    pub fn registry(&self) -> &SnapshotRegistry {
        &self.registry
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.context.stats)
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::with_defaults()
    }
}

impl CacheInvalidator for CacheManager {
    fn handle_event(&self, event: InvalidationEvent) -> usize {
        debug!(%event, "invalidation event");
        self.invalidate_all()
    }

    fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}
