//! Request-scoped snapshot cache for model querysets
//!
//! A [`CacheManager`] loads every instance of a model type once, then hands
//! out [`CachedQuerySet`] handles that answer simple filters, excludes and
//! orderings from memory. Anything the lookup planner cannot evaluate falls
//! back to the authoritative source.
//!
//! # Features
//!
//! - **Snapshots**: Whole-table copies keyed by model type
//! - **In-memory lookups**: `exact`, `gt`, `icontains`, `in`, `range`, `year`, `is_null` and friends
//! - **Fallback**: Unsupported terms and multi-hop keys go to the source
//! - **Lifecycle**: Snapshots are dropped when a unit of work ends
//! - **Statistics**: Track hits, misses, fallbacks and loads
//!
//! # Example
//!
//! ```ignore
//! use query_cache::CacheManager;
//! use query_planner::Filters;
//!
//! let manager = CacheManager::with_defaults();
//! let _work = manager.begin_unit_of_work();
//!
//! manager.load_snapshot::<Article>(source.as_ref())?;
//! let active = manager
//!     .get_handle::<Article>(source.clone())
//!     .filter(&Filters::new().with("status", "active"))?;
//! assert_eq!(active.count()?, 3);
//! ```

pub mod config;
pub mod invalidation;
pub mod manager;
pub mod queryset;
pub mod registry;
pub mod snapshot;
pub mod stats;

pub use config::CacheConfig;
pub use invalidation::{CacheInvalidator, InvalidationEvent, UnitOfWork};
pub use manager::CacheManager;
pub use queryset::CachedQuerySet;
pub use registry::SnapshotRegistry;
pub use snapshot::Snapshot;
pub use stats::CacheStats;
