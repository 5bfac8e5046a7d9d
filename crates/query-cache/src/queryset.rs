//! Cache-aware queryset handles
//!
//! Every derivation builds the authoritative query first, so a handle can
//! always fall back to the source. When the parent carries a snapshot the
//! derived handle gets its own copy, narrowed or resorted in memory, or no
//! snapshot at all when the query is too complex to answer from memory.

use crate::config::CacheConfig;
use crate::snapshot::Snapshot;
use crate::stats::CacheStats;
use query_core::{Model, Result};
use query_executor::{filter_rows, sort_rows, AuthoritativeSource, OrderField, OrderingPolicy, SourceQuery};
use query_planner::{Filters, LookupPlan, LookupPlanner};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};

/// Settings and counters shared by all handles of one cache
#[derive(Debug)]
pub(crate) struct QueryContext {
    pub(crate) planner: LookupPlanner,
    pub(crate) ordering: OrderingPolicy,
    pub(crate) stats: Arc<CacheStats>,
}

impl QueryContext {
    pub(crate) fn new(config: &CacheConfig, stats: Arc<CacheStats>) -> Self {
        Self {
            planner: LookupPlanner::new(config.lookup_syntax()),
            ordering: config.ordering,
            stats,
        }
    }
}

/// A query over model `M` with an optional in-memory snapshot
pub struct CachedQuerySet<M: Model> {
    source: Arc<dyn AuthoritativeSource<M>>,
    query: SourceQuery,
    snapshot: Option<Snapshot<M>>,
    context: Arc<QueryContext>,
}

impl<M: Model> CachedQuerySet<M> {
    pub(crate) fn from_parts(
        source: Arc<dyn AuthoritativeSource<M>>,
        query: SourceQuery,
        snapshot: Option<Snapshot<M>>,
        context: Arc<QueryContext>,
    ) -> Self {
        Self {
            source,
            query,
            snapshot,
            context,
        }
    }

    /// Plain handle on the source's default query, without any snapshot
    pub fn uncached(source: Arc<dyn AuthoritativeSource<M>>) -> Self {
        let query = source.all(M::NAME);
        let context = QueryContext::new(&CacheConfig::default(), Arc::new(CacheStats::new()));
        Self::from_parts(source, query, None, Arc::new(context))
    }

    /// Handle on the source's default query, prepopulated with `rows`.
    ///
    /// `rows` must be exactly what the unfiltered query would return.
    pub fn with_snapshot(source: Arc<dyn AuthoritativeSource<M>>, rows: Vec<Arc<M>>) -> Self {
        let mut handle = Self::uncached(source);
        handle.snapshot = Some(Snapshot::from_rows(rows));
        handle
    }

    fn derive(&self, query: SourceQuery, snapshot: Option<Snapshot<M>>) -> Self {
        Self::from_parts(
            Arc::clone(&self.source),
            query,
            snapshot,
            Arc::clone(&self.context),
        )
    }

    /// Narrow the query by `filters`, or exclude matching rows when `negate`.
    ///
    /// A row is excluded only when every filter in the batch holds for it.
    pub fn with_filter(&self, filters: &Filters, negate: bool) -> Result<Self> {
        // malformed keys fail here whether or not a snapshot is attached
        let plan = self.context.planner.plan(filters)?;
        let query = self.source.filter(&self.query, filters, negate)?;

        let snapshot = match &self.snapshot {
            None => None,
            Some(snapshot) if filters.is_empty() => Some(snapshot.clone()),
            Some(snapshot) => match plan {
                LookupPlan::InMemory(lookups) => {
                    let rows = filter_rows(snapshot.rows(), snapshot.meta(), &lookups, negate)?;
                    trace!(
                        model = M::NAME,
                        before = snapshot.len(),
                        after = rows.len(),
                        negate,
                        "filtered snapshot"
                    );
                    Some(snapshot.derive(rows))
                }
                LookupPlan::Fallback(reason) => {
                    debug!(model = M::NAME, %reason, "filter falls back to source");
                    self.context.stats.record_fallback();
                    None
                }
            },
        };

        Ok(self.derive(query, snapshot))
    }

    pub fn filter(&self, filters: &Filters) -> Result<Self> {
        self.with_filter(filters, false)
    }

    pub fn exclude(&self, filters: &Filters) -> Result<Self> {
        self.with_filter(filters, true)
    }

    /// Order by `fields`; a leading `-` sorts that field descending.
    ///
    /// Cached rows are sorted once per field in the given order with a
    /// stable sort, so under the default policy the last field named is
    /// the primary key.
    pub fn order_by<S: AsRef<str>>(&self, fields: &[S]) -> Result<Self> {
        let fields: Vec<String> = fields.iter().map(|f| f.as_ref().to_string()).collect();
        let query = self.source.order_by(&self.query, &fields)?;

        let snapshot = match &self.snapshot {
            None => None,
            Some(snapshot) => match self.flatten_ordering(&fields) {
                Some(flattened) => {
                    let mut rows = snapshot.rows().to_vec();
                    sort_rows(&mut rows, snapshot.meta(), &flattened, self.context.ordering)?;
                    Some(snapshot.derive(rows))
                }
                None => {
                    debug!(model = M::NAME, ?fields, "ordering falls back to source");
                    self.context.stats.record_fallback();
                    None
                }
            },
        };

        Ok(self.derive(query, snapshot))
    }

    /// Map ordering fields onto flattened attribute names, keeping the
    /// direction prefix. `None` for random ordering or multi-hop paths.
    fn flatten_ordering(&self, fields: &[String]) -> Option<Vec<String>> {
        let syntax = self.context.planner.syntax();
        fields
            .iter()
            .map(|field| {
                let order = OrderField::parse(field);
                if order.name == "?" {
                    return None;
                }
                let name = syntax.flatten_field(order.name)?;
                Some(if order.descending {
                    format!("-{}", name)
                } else {
                    name
                })
            })
            .collect()
    }

    /// Retarget the query at another alias.
    ///
    /// The snapshot is carried over only when the alias does not change.
    pub fn using(&self, alias: &str) -> Result<Self> {
        let query = self.source.using(&self.query, alias)?;

        let snapshot = match &self.snapshot {
            Some(snapshot) if query.alias() == self.query.alias() => Some(snapshot.clone()),
            Some(_) => {
                debug!(
                    model = M::NAME,
                    from = self.query.alias(),
                    to = query.alias(),
                    "alias changed, dropping snapshot"
                );
                None
            }
            None => None,
        };

        Ok(self.derive(query, snapshot))
    }

    /// Copy of this handle with its own snapshot copy
    pub fn all(&self) -> Self {
        self.derive(self.query.clone(), self.snapshot.clone())
    }

    /// Materialize the query, from the snapshot when there is one
    pub fn fetch(&self) -> Result<Vec<Arc<M>>> {
        match &self.snapshot {
            Some(snapshot) => {
                self.context.stats.record_hit();
                trace!(model = M::NAME, rows = snapshot.len(), "served from snapshot");
                Ok(snapshot.rows().to_vec())
            }
            None => {
                self.context.stats.record_miss();
                trace!(model = M::NAME, alias = self.query.alias(), "fetching from source");
                self.source.fetch(&self.query)
            }
        }
    }

    pub fn count(&self) -> Result<usize> {
        match &self.snapshot {
            Some(snapshot) => {
                self.context.stats.record_hit();
                Ok(snapshot.len())
            }
            None => Ok(self.fetch()?.len()),
        }
    }

    pub fn exists(&self) -> Result<bool> {
        Ok(self.count()? > 0)
    }

    pub fn first(&self) -> Result<Option<Arc<M>>> {
        Ok(self.fetch()?.into_iter().next())
    }

    pub fn is_cached(&self) -> bool {
        self.snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<&Snapshot<M>> {
        self.snapshot.as_ref()
    }

    /// Mutable access to this handle's own snapshot copy
    pub fn snapshot_mut(&mut self) -> Option<&mut Snapshot<M>> {
        self.snapshot.as_mut()
    }

    /// The authoritative query this handle stands for
    pub fn query(&self) -> &SourceQuery {
        &self.query
    }

    pub fn alias(&self) -> &str {
        self.query.alias()
    }

    pub fn stats(&self) -> Arc<CacheStats> {
        Arc::clone(&self.context.stats)
    }
}

impl<M: Model> Clone for CachedQuerySet<M> {
    fn clone(&self) -> Self {
        self.all()
    }
}

impl<M: Model> fmt::Debug for CachedQuerySet<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CachedQuerySet")
            .field("model", &M::NAME)
            .field("query", &self.query)
            .field("cached_rows", &self.snapshot.as_ref().map(Snapshot::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_core::{ModelMeta, QueryError, Value};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, PartialEq)]
    struct Task {
        id: i64,
        status: &'static str,
        priority: i64,
        owner_name: Option<&'static str>,
    }

    impl Model for Task {
        const NAME: &'static str = "Task";

        fn meta() -> ModelMeta<Self> {
            Self::meta_builder()
                .field("id", |t| Value::from(t.id))
                .field("status", |t| Value::from(t.status))
                .field("priority", |t| Value::from(t.priority))
                .field("owner_name", |t| Value::from(t.owner_name))
        }
    }

    /// Source that only counts how often it is asked to materialize
    #[derive(Debug, Default)]
    struct CountingSource {
        fetches: AtomicUsize,
    }

    impl AuthoritativeSource<Task> for CountingSource {
        fn default_alias(&self) -> &str {
            "default"
        }

        fn fetch(&self, _query: &SourceQuery) -> Result<Vec<Arc<Task>>> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(Vec::new())
        }
    }

    fn tasks() -> Vec<Arc<Task>> {
        vec![
            Arc::new(Task { id: 1, status: "open", priority: 2, owner_name: Some("ann") }),
            Arc::new(Task { id: 2, status: "done", priority: 1, owner_name: None }),
            Arc::new(Task { id: 3, status: "open", priority: 1, owner_name: Some("bob") }),
            Arc::new(Task { id: 4, status: "open", priority: 3, owner_name: None }),
        ]
    }

    fn cached() -> (Arc<CountingSource>, CachedQuerySet<Task>) {
        let source = Arc::new(CountingSource::default());
        let qs = CachedQuerySet::with_snapshot(source.clone(), tasks());
        (source, qs)
    }

    fn ids(qs: &CachedQuerySet<Task>) -> Vec<i64> {
        qs.fetch().unwrap().iter().map(|t| t.id).collect()
    }

    #[test]
    fn test_filter_in_memory() {
        let (source, qs) = cached();
        let open = qs.filter(&Filters::new().with("status", "open")).unwrap();

        assert!(open.is_cached());
        assert_eq!(ids(&open), vec![1, 3, 4]);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);
        assert_eq!(open.query().clauses().len(), 1);
    }

    #[test]
    fn test_filter_does_not_touch_parent() {
        let (_, qs) = cached();
        let _ = qs.filter(&Filters::new().with("priority__gte", 2)).unwrap();
        assert_eq!(ids(&qs), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_exclude() {
        let (_, qs) = cached();
        let rest = qs
            .exclude(&Filters::new().with("status", "open").with("priority", 1))
            .unwrap();
        assert_eq!(ids(&rest), vec![1, 2, 4]);
    }

    #[test]
    fn test_single_hop_uses_flattened_field() {
        let (_, qs) = cached();
        let owned = qs
            .filter(&Filters::new().with("owner__name__startswith", "a"))
            .unwrap();
        assert_eq!(ids(&owned), vec![1]);

        let unowned = qs.filter(&Filters::new().with("owner_name__isnull", true)).unwrap();
        assert_eq!(ids(&unowned), vec![2, 4]);
    }

    #[test]
    fn test_disqualified_batch_drops_snapshot() {
        let (source, qs) = cached();
        let complex = qs
            .filter(
                &Filters::new()
                    .with("status", "open")
                    .with("owner__team__name", "core"),
            )
            .unwrap();

        assert!(!complex.is_cached());
        assert_eq!(qs.stats().fallbacks(), 1);

        complex.fetch().unwrap();
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);

        // once dropped, the snapshot never comes back on derived handles
        let further = complex.filter(&Filters::new().with("status", "open")).unwrap();
        assert!(!further.is_cached());
    }

    #[test]
    fn test_empty_filters_keep_snapshot() {
        let (_, qs) = cached();
        assert_eq!(ids(&qs.exclude(&Filters::new()).unwrap()), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_evaluation_errors_propagate() {
        let (_, qs) = cached();
        let err = qs.filter(&Filters::new().with("missing", 1));
        assert!(matches!(err, Err(QueryError::FieldNotFound { .. })));

        let err = qs.filter(&Filters::new().with("status__gt", 1));
        assert!(matches!(err, Err(QueryError::TypeMismatch { .. })));

        let err = qs.filter(&Filters::new().with("status__", 1));
        assert!(matches!(err, Err(QueryError::MalformedFilterKey(_))));
    }

    #[test]
    fn test_order_by_last_field_dominates() {
        let (_, qs) = cached();
        // status is the primary key, ties broken by priority
        let ordered = qs.order_by(&["priority", "status"]).unwrap();
        assert_eq!(ids(&ordered), vec![2, 3, 1, 4]);
        assert_eq!(ordered.query().ordering(), ["priority", "status"]);
        assert_eq!(ids(&qs), vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_order_by_descending_and_relation() {
        let (_, qs) = cached();
        assert_eq!(ids(&qs.order_by(&["-priority"]).unwrap()), vec![4, 1, 2, 3]);
        assert_eq!(ids(&qs.order_by(&["owner__name"]).unwrap()), vec![2, 4, 1, 3]);
    }

    #[test]
    fn test_order_by_fallbacks() {
        let (_, qs) = cached();
        assert!(!qs.order_by(&["?"]).unwrap().is_cached());
        assert!(!qs.order_by(&["owner__team__name"]).unwrap().is_cached());
        assert_eq!(qs.stats().fallbacks(), 2);
    }

    #[test]
    fn test_using_same_alias_copies_snapshot() {
        let (_, qs) = cached();
        let mut copy = qs.using("default").unwrap();
        assert!(copy.is_cached());

        copy.snapshot_mut().unwrap().rows_mut().truncate(1);
        assert_eq!(copy.count().unwrap(), 1);
        assert_eq!(qs.count().unwrap(), 4);
    }

    #[test]
    fn test_using_other_alias_drops_snapshot() {
        let (source, qs) = cached();
        let replica = qs.using("replica").unwrap();

        assert!(!replica.is_cached());
        assert_eq!(replica.alias(), "replica");
        assert!(replica.fetch().unwrap().is_empty());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_malformed_key_fails_without_snapshot() {
        let source = Arc::new(CountingSource::default());
        let qs = CachedQuerySet::<Task>::uncached(source.clone());

        for negate in [false, true] {
            let err = qs.with_filter(&Filters::new().with("status__", "open"), negate);
            assert!(matches!(err, Err(QueryError::MalformedFilterKey(_))));
        }
        assert_eq!(source.fetches.load(Ordering::SeqCst), 0);

        // unsupported terms are still fine on an uncached handle
        let fallback = qs.filter(&Filters::new().with("status__regex", "^o")).unwrap();
        assert!(!fallback.is_cached());
        assert_eq!(qs.stats().fallbacks(), 0);
    }

    #[test]
    fn test_uncached_handle_always_delegates() {
        let source = Arc::new(CountingSource::default());
        let qs = CachedQuerySet::<Task>::uncached(source.clone());
        let filtered = qs.filter(&Filters::new().with("status", "open")).unwrap();

        assert!(!filtered.is_cached());
        assert!(!filtered.exists().unwrap());
        assert!(filtered.first().unwrap().is_none());
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
        assert_eq!(filtered.stats().misses(), 2);
    }

    #[test]
    fn test_hits_recorded() {
        let (_, qs) = cached();
        qs.fetch().unwrap();
        qs.count().unwrap();
        assert_eq!(qs.stats().hits(), 2);
        assert_eq!(qs.stats().hit_rate(), 1.0);
    }
}
