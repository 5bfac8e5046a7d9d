//! Filter keyword -> lookup planning
//!
//! Decides whether a batch of filter keywords can be answered from a cached
//! snapshot. Each key is split on the relationship separator; a trailing
//! query term selects the lookup kind. Keys that cross more than one
//! relationship, or that use a term without an in-memory comparator,
//! disqualify the whole batch so the caller falls back to the source.

use crate::filters::Filters;
use crate::lookup::{Lookup, LookupKind};
use ahash::AHashSet;
use query_core::{QueryError, Result};
use std::fmt;

/// Query terms the ORM recognizes as a trailing lookup segment
pub const DEFAULT_QUERY_TERMS: &[&str] = &[
    "exact",
    "iexact",
    "contains",
    "icontains",
    "gt",
    "gte",
    "lt",
    "lte",
    "in",
    "startswith",
    "istartswith",
    "endswith",
    "iendswith",
    "range",
    "year",
    "month",
    "day",
    "week_day",
    "isnull",
    "is_null",
    "search",
    "regex",
    "iregex",
];

/// Separator and query-term vocabulary used to split filter keys
#[derive(Debug, Clone)]
pub struct LookupSyntax {
    separator: String,
    delimiter: String,
    query_terms: AHashSet<String>,
}

impl Default for LookupSyntax {
    fn default() -> Self {
        Self {
            separator: "__".to_string(),
            delimiter: "_".to_string(),
            query_terms: DEFAULT_QUERY_TERMS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl LookupSyntax {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the relationship separator (default `__`)
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Set the delimiter used to flatten one relationship hop (default `_`)
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    pub fn is_query_term(&self, token: &str) -> bool {
        self.query_terms.contains(token)
    }

    /// Flatten a field path of at most one relationship hop.
    ///
    /// Returns `None` for deeper paths and paths with empty segments.
    pub fn flatten_field(&self, path: &str) -> Option<String> {
        let parts: Vec<&str> = path.split(self.separator.as_str()).collect();
        match parts.as_slice() {
            [field] if !field.is_empty() => Some(field.to_string()),
            [relation, field] if !relation.is_empty() && !field.is_empty() => {
                Some(format!("{}{}{}", relation, self.delimiter, field))
            }
            _ => None,
        }
    }
}

/// Why a filter batch cannot be evaluated in memory
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackReason {
    /// Recognized query term without an in-memory comparator
    UnsupportedLookup { key: String, term: String },
    /// Key traverses more than one relationship
    MultiHop { key: String, hops: usize },
}

impl fmt::Display for FallbackReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallbackReason::UnsupportedLookup { key, term } => {
                write!(f, "unsupported lookup '{}' in '{}'", term, key)
            }
            FallbackReason::MultiHop { key, hops } => {
                write!(f, "'{}' spans {} relationships", key, hops)
            }
        }
    }
}

/// Outcome of planning a filter batch
#[derive(Debug, Clone, PartialEq)]
pub enum LookupPlan {
    InMemory(Vec<Lookup>),
    Fallback(FallbackReason),
}

impl LookupPlan {
    pub fn into_lookups(self) -> Option<Vec<Lookup>> {
        match self {
            LookupPlan::InMemory(lookups) => Some(lookups),
            LookupPlan::Fallback(_) => None,
        }
    }

    pub fn is_in_memory(&self) -> bool {
        matches!(self, LookupPlan::InMemory(_))
    }
}

/// Flattened field and kind for one key, or the reason it cannot be cached
type KeyPlan = std::result::Result<(String, LookupKind), FallbackReason>;

#[derive(Debug, Clone)]
pub struct LookupPlanner {
    syntax: LookupSyntax,
}

impl Default for LookupPlanner {
    fn default() -> Self {
        Self::new(LookupSyntax::default())
    }
}

impl LookupPlanner {
    pub fn new(syntax: LookupSyntax) -> Self {
        Self { syntax }
    }

    pub fn syntax(&self) -> &LookupSyntax {
        &self.syntax
    }

    /// Plan a whole filter batch.
    ///
    /// Malformed keys are errors even when an earlier key already
    /// disqualified the batch.
    pub fn plan(&self, filters: &Filters) -> Result<LookupPlan> {
        let mut lookups = Vec::with_capacity(filters.len());
        let mut fallback = None;

        for (key, value) in filters.iter() {
            match self.plan_one(key)? {
                Ok((field, kind)) => lookups.push(Lookup::new(field, value.clone(), kind)),
                Err(reason) => {
                    if fallback.is_none() {
                        fallback = Some(reason);
                    }
                }
            }
        }

        Ok(match fallback {
            Some(reason) => LookupPlan::Fallback(reason),
            None => LookupPlan::InMemory(lookups),
        })
    }

    /// Split a single key into `(flattened field, kind)`
    fn plan_one(&self, key: &str) -> Result<KeyPlan> {
        if key.is_empty() {
            return Err(QueryError::MalformedFilterKey(key.to_string()));
        }

        let mut parts: Vec<&str> = key.split(self.syntax.separator()).collect();
        if parts.iter().any(|p| p.is_empty()) {
            return Err(QueryError::MalformedFilterKey(key.to_string()));
        }

        let has_term = parts.len() > 1
            && parts
                .last()
                .is_some_and(|last| self.syntax.is_query_term(last));
        let term = if has_term {
            parts.pop().unwrap_or("exact")
        } else {
            "exact"
        };

        let Some(kind) = LookupKind::from_token(term) else {
            return Ok(Err(FallbackReason::UnsupportedLookup {
                key: key.to_string(),
                term: term.to_string(),
            }));
        };

        let field = match parts.as_slice() {
            [field] => field.to_string(),
            [relation, field] => format!("{}{}{}", relation, self.syntax.delimiter(), field),
            _ => {
                return Ok(Err(FallbackReason::MultiHop {
                    key: key.to_string(),
                    hops: parts.len() - 1,
                }))
            }
        };

        Ok(Ok((field, kind)))
    }
}

/// Parse a filter batch with the given syntax.
///
/// `Ok(None)` means the batch must be answered by the authoritative source.
pub fn parse_lookups(filters: &Filters, syntax: &LookupSyntax) -> Result<Option<Vec<Lookup>>> {
    let planner = LookupPlanner::new(syntax.clone());
    Ok(planner.plan(filters)?.into_lookups())
}
