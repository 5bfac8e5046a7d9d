//! Authoritative storage backends
//!
//! [`MemoryStore`] keeps rows in memory per connection alias and answers
//! source queries with conventional relational semantics.

pub mod memory;

pub use memory::MemoryStore;
