//! Cache configuration options

use query_core::{QueryError, Result};
use query_executor::OrderingPolicy;
use query_planner::LookupSyntax;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for the snapshot cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Whether snapshots are loaded and used at all
    pub enabled: bool,
    /// Separator between relationship hops and the lookup term in filter keys
    pub lookup_separator: String,
    /// Joins the two segments of a single-hop key into a flattened field name
    pub flatten_delimiter: String,
    /// Tie-break policy for multi-field orderings on cached rows
    pub ordering: OrderingPolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            lookup_separator: "__".to_string(),
            flatten_delimiter: "_".to_string(),
            ordering: OrderingPolicy::LastFieldDominant,
        }
    }
}

impl CacheConfig {
    /// Create a disabled cache configuration
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Parse a JSON configuration; missing keys take their defaults
    pub fn from_json(contents: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings that make filter keys impossible to split
    pub fn validate(&self) -> Result<()> {
        if self.lookup_separator.is_empty() {
            return Err(QueryError::ConfigError(
                "lookup_separator must not be empty".to_string(),
            ));
        }
        if self.flatten_delimiter.contains(self.lookup_separator.as_str()) {
            return Err(QueryError::ConfigError(format!(
                "flatten_delimiter {:?} must not contain lookup_separator {:?}",
                self.flatten_delimiter, self.lookup_separator
            )));
        }
        Ok(())
    }

    /// Load a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Enable or disable the cache
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the relationship separator
    pub fn with_lookup_separator(mut self, separator: impl Into<String>) -> Self {
        self.lookup_separator = separator.into();
        self
    }

    /// Set the flattening delimiter
    pub fn with_flatten_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.flatten_delimiter = delimiter.into();
        self
    }

    /// Set the multi-field ordering policy
    pub fn with_ordering(mut self, ordering: OrderingPolicy) -> Self {
        self.ordering = ordering;
        self
    }

    /// Lookup syntax described by this configuration
    pub fn lookup_syntax(&self) -> LookupSyntax {
        LookupSyntax::new()
            .with_separator(self.lookup_separator.as_str())
            .with_delimiter(self.flatten_delimiter.as_str())
    }
}
