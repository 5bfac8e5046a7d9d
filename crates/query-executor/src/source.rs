//! Authoritative source seam
//!
//! The real backing store is consulted to build every derived query and to
//! materialize results whenever no snapshot can answer them.

use query_core::Result;
use query_planner::Filters;
use std::fmt::Debug;
use std::sync::Arc;

/// One `filter(...)` or `exclude(...)` call recorded on a source query
#[derive(Debug, Clone, PartialEq)]
pub struct FilterClause {
    pub filters: Filters,
    pub negate: bool,
}

/// Description of an authoritative query: model, alias, filters, ordering
#[derive(Debug, Clone, PartialEq)]
pub struct SourceQuery {
    model: String,
    alias: String,
    clauses: Vec<FilterClause>,
    ordering: Vec<String>,
}

impl SourceQuery {
    /// Unfiltered, unordered query for `model` on `alias`
    pub fn new(model: impl Into<String>, alias: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            alias: alias.into(),
            clauses: Vec::new(),
            ordering: Vec::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn alias(&self) -> &str {
        &self.alias
    }

    pub fn clauses(&self) -> &[FilterClause] {
        &self.clauses
    }

    pub fn ordering(&self) -> &[String] {
        &self.ordering
    }

    /// Append a filter (or exclude, when `negate`) clause
    pub fn with_clause(mut self, filters: Filters, negate: bool) -> Self {
        self.clauses.push(FilterClause { filters, negate });
        self
    }

    /// Replace the ordering
    pub fn with_ordering(mut self, fields: &[String]) -> Self {
        self.ordering = fields.to_vec();
        self
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = alias.into();
        self
    }

    pub fn is_unfiltered(&self) -> bool {
        self.clauses.is_empty()
    }
}

/// The backing store for model `M`
///
/// The query-building methods have default implementations that only extend
/// the [`SourceQuery`] description; stores may override them to validate.
pub trait AuthoritativeSource<M>: Debug + Send + Sync {
    /// Alias used by queries that never called `using`
    fn default_alias(&self) -> &str;

    /// Default handle: every instance of `model`
    fn all(&self, model: &str) -> SourceQuery {
        SourceQuery::new(model, self.default_alias())
    }

    fn filter(&self, query: &SourceQuery, filters: &Filters, negate: bool) -> Result<SourceQuery> {
        Ok(query.clone().with_clause(filters.clone(), negate))
    }

    fn order_by(&self, query: &SourceQuery, fields: &[String]) -> Result<SourceQuery> {
        Ok(query.clone().with_ordering(fields))
    }

    fn using(&self, query: &SourceQuery, alias: &str) -> Result<SourceQuery> {
        Ok(query.clone().with_alias(alias))
    }

    /// Materialize `query` into an ordered sequence of instances
    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Arc<M>>>;
}
