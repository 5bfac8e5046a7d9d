//! Lookup planning for in-memory queryset evaluation
//!
//! Turns ORM-style filter keywords (`age__gte`, `author__name`) into
//! [`Lookup`]s that the executor can evaluate against cached instances,
//! or reports that the batch needs the authoritative source.

pub mod filters;
pub mod lookup;
pub mod planner;

pub use filters::Filters;
pub use lookup::{Lookup, LookupKind};
pub use planner::{
    parse_lookups, FallbackReason, LookupPlan, LookupPlanner, LookupSyntax, DEFAULT_QUERY_TERMS,
};
