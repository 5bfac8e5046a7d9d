//! Model type -> snapshot registry

use crate::snapshot::Snapshot;
use ahash::AHashMap;
use parking_lot::RwLock;
use query_core::Model;
use std::any::{Any, TypeId};
use std::time::{Duration, Instant};

/// Registered snapshot for one model type
struct RegistryEntry {
    model: &'static str,
    loaded_at: Instant,
    /// Always a `Snapshot<M>` for the `TypeId` it is stored under
    snapshot: Box<dyn Any + Send + Sync>,
}

/// Maps each model type to its current snapshot.
///
/// A type without an entry always goes to the authoritative source.
#[derive(Default)]
pub struct SnapshotRegistry {
    entries: RwLock<AHashMap<TypeId, RegistryEntry>>,
}

impl SnapshotRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot` for `M`, replacing any previous one.
    ///
    /// Returns true when an entry was replaced.
    pub fn insert<M: Model>(&self, snapshot: Snapshot<M>) -> bool {
        let entry = RegistryEntry {
            model: M::NAME,
            loaded_at: Instant::now(),
            snapshot: Box::new(snapshot),
        };
        self.entries.write().insert(TypeId::of::<M>(), entry).is_some()
    }

    /// Shallow copy of the snapshot registered for `M`
    pub fn get<M: Model>(&self) -> Option<Snapshot<M>> {
        self.entries
            .read()
            .get(&TypeId::of::<M>())
            .and_then(|entry| entry.snapshot.downcast_ref::<Snapshot<M>>())
            .cloned()
    }

    pub fn contains<M: Model>(&self) -> bool {
        self.entries.read().contains_key(&TypeId::of::<M>())
    }

    /// How long ago the snapshot for `M` was registered
    pub fn age<M: Model>(&self) -> Option<Duration> {
        self.entries
            .read()
            .get(&TypeId::of::<M>())
            .map(|entry| entry.loaded_at.elapsed())
    }

    /// Remove the snapshot for `M`
    pub fn evict<M: Model>(&self) -> bool {
        self.entries.write().remove(&TypeId::of::<M>()).is_some()
    }

    /// Replace the whole registry with an empty one; returns how many
    /// snapshots were dropped
    pub fn clear(&self) -> usize {
        let dropped = std::mem::take(&mut *self.entries.write());
        dropped.len()
    }

    /// Names of the models with a registered snapshot, sorted
    pub fn models(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.entries.read().values().map(|e| e.model).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl std::fmt::Debug for SnapshotRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotRegistry")
            .field("models", &self.models())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use query_core::{ModelMeta, Value};
    use std::sync::Arc;
    use std::thread;

    #[derive(Debug)]
    struct Tag(&'static str);

    impl Model for Tag {
        const NAME: &'static str = "Tag";

        fn meta() -> ModelMeta<Self> {
            Self::meta_builder().field("name", |t| Value::from(t.0))
        }
    }

    #[derive(Debug)]
    struct Author(i64);

    impl Model for Author {
        const NAME: &'static str = "Author";

        fn meta() -> ModelMeta<Self> {
            Self::meta_builder().field("id", |a| Value::from(a.0))
        }
    }

    fn tags(names: &[&'static str]) -> Snapshot<Tag> {
        Snapshot::from_rows(names.iter().map(|n| Arc::new(Tag(*n))).collect())
    }

    #[test]
    fn test_insert_get() {
        let registry = SnapshotRegistry::new();
        assert!(registry.get::<Tag>().is_none());

        assert!(!registry.insert(tags(&["rust", "sql"])));
        let snapshot = registry.get::<Tag>().unwrap();
        assert_eq!(snapshot.len(), 2);
        assert!(registry.get::<Author>().is_none());
    }

    #[test]
    fn test_last_writer_wins() {
        let registry = SnapshotRegistry::new();
        registry.insert(tags(&["a"]));
        assert!(registry.insert(tags(&["b", "c", "d"])));

        assert_eq!(registry.get::<Tag>().unwrap().len(), 3);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_returns_independent_copy() {
        let registry = SnapshotRegistry::new();
        registry.insert(tags(&["a", "b"]));

        let mut copy = registry.get::<Tag>().unwrap();
        copy.rows_mut().clear();

        assert_eq!(registry.get::<Tag>().unwrap().len(), 2);
    }

    #[test]
    fn test_evict_and_clear() {
        let registry = SnapshotRegistry::new();
        registry.insert(tags(&["a"]));
        registry.insert(Snapshot::from_rows(vec![Arc::new(Author(1))]));
        assert_eq!(registry.models(), vec!["Author", "Tag"]);

        assert!(registry.evict::<Tag>());
        assert!(!registry.evict::<Tag>());
        assert!(registry.contains::<Author>());

        assert_eq!(registry.clear(), 1);
        assert!(registry.is_empty());
        assert!(registry.age::<Author>().is_none());
    }

    #[test]
    fn test_concurrent_access() {
        let registry = Arc::new(SnapshotRegistry::new());
        let mut handles = vec![];

        for i in 0..8 {
            let registry = Arc::clone(&registry);
            handles.push(thread::spawn(move || {
                if i % 2 == 0 {
                    registry.insert(Snapshot::from_rows(vec![Arc::new(Author(i))]));
                } else {
                    registry.get::<Author>();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.get::<Author>().unwrap().len(), 1);
    }
}
