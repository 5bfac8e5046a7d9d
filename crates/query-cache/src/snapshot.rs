//! Snapshot of a model's instances

use query_core::{Model, ModelMeta};
use std::fmt;
use std::sync::Arc;

/// Ordered, shared references to cached instances plus the model's field table.
///
/// Cloning copies the row vector, never the instances.
pub struct Snapshot<M> {
    meta: Arc<ModelMeta<M>>,
    rows: Vec<Arc<M>>,
}

impl<M: Model> Snapshot<M> {
    /// Snapshot using the model's own field table
    pub fn from_rows(rows: Vec<Arc<M>>) -> Self {
        Self::new(Arc::new(M::meta()), rows)
    }
}

impl<M> Snapshot<M> {
    pub fn new(meta: Arc<ModelMeta<M>>, rows: Vec<Arc<M>>) -> Self {
        Self { meta, rows }
    }

    /// A snapshot with the same field table and different rows
    pub fn derive(&self, rows: Vec<Arc<M>>) -> Self {
        Self {
            meta: Arc::clone(&self.meta),
            rows,
        }
    }

    pub fn meta(&self) -> &ModelMeta<M> {
        &self.meta
    }

    pub fn rows(&self) -> &[Arc<M>] {
        &self.rows
    }

    /// Mutable access to this copy's row sequence
    pub fn rows_mut(&mut self) -> &mut Vec<Arc<M>> {
        &mut self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

impl<M> Clone for Snapshot<M> {
    fn clone(&self) -> Self {
        Self {
            meta: Arc::clone(&self.meta),
            rows: self.rows.clone(),
        }
    }
}

impl<M> fmt::Debug for Snapshot<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Snapshot")
            .field("model", &self.meta.name())
            .field("rows", &self.rows.len())
            .finish()
    }
}
