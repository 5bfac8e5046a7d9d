//! Field access capability for cacheable model types
//!
//! Each cacheable type describes its readable fields once, as a table of
//! plain getter functions keyed by field name. Lookups and orderings on
//! cached instances go through this table instead of any runtime reflection.

use crate::error::{QueryError, Result};
use crate::types::Value;
use std::collections::HashMap;
use std::fmt;

/// Reads one field from a model instance
pub type FieldGetter<M> = fn(&M) -> Value;

/// A model type whose instances can be held in a snapshot
pub trait Model: Send + Sync + 'static {
    /// Model name used by the authoritative source
    const NAME: &'static str;

    /// Build the field table for this model
    fn meta() -> ModelMeta<Self>
    where
        Self: Sized;

    /// Empty field table named after this model, ready for `.field(..)`
    /// calls whose getter closures infer `&Self`
    fn meta_builder() -> ModelMeta<Self>
    where
        Self: Sized,
    {
        ModelMeta::new(Self::NAME)
    }
}

/// Model name plus field-name -> getter table
pub struct ModelMeta<M> {
    name: &'static str,
    fields: HashMap<&'static str, FieldGetter<M>>,
}

impl<M> ModelMeta<M> {
    /// Create an empty field table for the named model
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            fields: HashMap::new(),
        }
    }

    /// Register a readable field
    ///
    /// Related-model values reachable through one relationship hop are
    /// registered under their flattened name, e.g. `author_name` for the
    /// filter key `author__name`.
    pub fn field(mut self, name: &'static str, getter: FieldGetter<M>) -> Self {
        self.fields.insert(name, getter);
        self
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Registered field names, sorted
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.fields.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Read `field` from `instance`
    pub fn get(&self, instance: &M, field: &str) -> Result<Value> {
        self.fields
            .get(field)
            .map(|getter| getter(instance))
            .ok_or_else(|| QueryError::field_not_found(self.name, field))
    }
}

impl<M> Clone for ModelMeta<M> {
    fn clone(&self) -> Self {
        Self {
            name: self.name,
            fields: self.fields.clone(),
        }
    }
}

impl<M> fmt::Debug for ModelMeta<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelMeta")
            .field("name", &self.name)
            .field("fields", &self.field_names())
            .finish()
    }
}
