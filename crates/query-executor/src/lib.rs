//! In-memory evaluation for cached querysets
//!
//! - [`resolver`]: lookup kind -> comparator
//! - [`operators`]: filter/exclude/sort over snapshot rows
//! - [`source`]: the authoritative source consulted on cache misses

pub mod operators;
pub mod resolver;
pub mod source;

pub use operators::{filter_rows, sort_rows, OrderField, OrderingPolicy};
pub use resolver::{evaluate, resolve, Comparator};
pub use source::{AuthoritativeSource, FilterClause, SourceQuery};
