//! In-memory authoritative source
//!
//! Holds rows per connection alias and answers [`SourceQuery`] descriptions
//! the way a relational backend would: relationship paths of any depth,
//! conventional multi-key ordering, and `week_day` lookups. Used as the
//! reference backend for cached querysets.

use ahash::AHashMap;
use chrono::{Datelike, NaiveDate};
use parking_lot::RwLock;
use query_core::{Model, ModelMeta, QueryError, Result, Value};
use query_executor::{evaluate, sort_rows, AuthoritativeSource, OrderField, OrderingPolicy, SourceQuery};
use query_planner::{Filters, Lookup, LookupKind, LookupSyntax};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::trace;

/// Condition parsed from one filter key
enum Condition {
    Lookup(Lookup),
    /// Weekday number, 1 = Sunday .. 7 = Saturday
    WeekDay { field: String, value: Value },
}

/// Memory-backed store for model `M`
pub struct MemoryStore<M: Model> {
    default_alias: String,
    tables: RwLock<AHashMap<String, Vec<Arc<M>>>>,
    meta: ModelMeta<M>,
    syntax: LookupSyntax,
    fetches: AtomicU64,
}

impl<M: Model> MemoryStore<M> {
    /// Create an empty store whose default alias is `default`
    pub fn new() -> Self {
        Self::with_alias("default")
    }

    /// Create an empty store with a specific default alias
    pub fn with_alias(alias: impl Into<String>) -> Self {
        let default_alias = alias.into();
        let mut tables = AHashMap::new();
        tables.insert(default_alias.clone(), Vec::new());
        Self {
            default_alias,
            tables: RwLock::new(tables),
            meta: M::meta(),
            syntax: LookupSyntax::default(),
            fetches: AtomicU64::new(0),
        }
    }

    /// Use a custom separator/delimiter for filter keys
    pub fn with_syntax(mut self, syntax: LookupSyntax) -> Self {
        self.syntax = syntax;
        self
    }

    /// Builder form of [`MemoryStore::extend`] on the default alias
    pub fn with_rows(self, rows: impl IntoIterator<Item = M>) -> Self {
        self.extend(rows);
        self
    }

    /// Append a row under the default alias
    pub fn insert(&self, row: M) {
        let alias = self.default_alias.clone();
        self.insert_into(&alias, row);
    }

    /// Append a row under `alias`, creating the alias if needed
    pub fn insert_into(&self, alias: &str, row: M) {
        self.tables
            .write()
            .entry(alias.to_string())
            .or_default()
            .push(Arc::new(row));
    }

    pub fn extend(&self, rows: impl IntoIterator<Item = M>) {
        let mut tables = self.tables.write();
        let table = tables.entry(self.default_alias.clone()).or_default();
        table.extend(rows.into_iter().map(Arc::new));
    }

    /// Remove every row under `alias` for which `predicate` holds
    pub fn delete_where(&self, alias: &str, predicate: impl Fn(&M) -> bool) -> usize {
        let mut tables = self.tables.write();
        match tables.get_mut(alias) {
            Some(table) => {
                let before = table.len();
                table.retain(|row| !predicate(&**row));
                before - table.len()
            }
            None => 0,
        }
    }

    /// Number of rows stored under `alias`
    pub fn len(&self, alias: &str) -> usize {
        self.tables.read().get(alias).map_or(0, Vec::len)
    }

    pub fn aliases(&self) -> Vec<String> {
        let mut aliases: Vec<_> = self.tables.read().keys().cloned().collect();
        aliases.sort();
        aliases
    }

    /// How many times `fetch` has been called
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Relaxed)
    }

    /// Split a key on the separator; every leading segment is part of the
    /// field path, joined with the delimiter
    fn parse_key(&self, key: &str, value: &Value) -> Result<Condition> {
        let mut parts: Vec<&str> = key.split(self.syntax.separator()).collect();
        if key.is_empty() || parts.iter().any(|p| p.is_empty()) {
            return Err(QueryError::MalformedFilterKey(key.to_string()));
        }

        let term = match parts.last() {
            Some(last) if parts.len() > 1 && self.syntax.is_query_term(last) => parts.pop(),
            _ => None,
        };
        let field = parts.join(self.syntax.delimiter());

        match term {
            None => Ok(Condition::Lookup(Lookup::new(field, value.clone(), LookupKind::Exact))),
            Some("week_day") => Ok(Condition::WeekDay {
                field,
                value: value.clone(),
            }),
            Some(token) => match LookupKind::from_token(token) {
                Some(kind) => Ok(Condition::Lookup(Lookup::new(field, value.clone(), kind))),
                None => Err(QueryError::SourceError(format!(
                    "lookup '{}' is not supported by the memory store",
                    token
                ))),
            },
        }
    }

    fn holds(&self, row: &M, condition: &Condition) -> Result<bool> {
        match condition {
            Condition::Lookup(lookup) => evaluate(lookup, &self.meta.get(row, &lookup.field)?),
            Condition::WeekDay { field, value } => {
                let expected = value
                    .as_i64()
                    .ok_or_else(|| QueryError::type_mismatch("INT64", value.data_type().to_string()))?;
                Ok(match self.meta.get(row, field)? {
                    Value::Date(d) => week_day(d) == expected,
                    Value::Timestamp(ts) => week_day(ts.date()) == expected,
                    Value::Null => false,
                    other => {
                        return Err(QueryError::type_mismatch(
                            "DATE or TIMESTAMP",
                            other.data_type().to_string(),
                        ))
                    }
                })
            }
        }
    }

    fn apply_clause(&self, rows: Vec<Arc<M>>, filters: &Filters, negate: bool) -> Result<Vec<Arc<M>>> {
        let conditions = filters
            .iter()
            .map(|(key, value)| self.parse_key(key, value))
            .collect::<Result<Vec<_>>>()?;
        if conditions.is_empty() {
            return Ok(rows);
        }

        let mut kept = Vec::with_capacity(rows.len());
        for row in rows {
            let mut all = true;
            for condition in &conditions {
                if !self.holds(&row, condition)? {
                    all = false;
                    break;
                }
            }
            if all != negate {
                kept.push(row);
            }
        }
        Ok(kept)
    }

    fn flatten_ordering(&self, fields: &[String]) -> Vec<String> {
        fields
            .iter()
            .filter(|field| field.as_str() != "?")
            .map(|field| {
                let order = OrderField::parse(field);
                let name = order
                    .name
                    .split(self.syntax.separator())
                    .collect::<Vec<_>>()
                    .join(self.syntax.delimiter());
                if order.descending {
                    format!("-{}", name)
                } else {
                    name
                }
            })
            .collect()
    }
}

fn week_day(date: NaiveDate) -> i64 {
    date.weekday().number_from_sunday() as i64
}

impl<M: Model> Default for MemoryStore<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: Model> fmt::Debug for MemoryStore<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryStore")
            .field("model", &M::NAME)
            .field("default_alias", &self.default_alias)
            .field("aliases", &self.aliases())
            .finish()
    }
}

impl<M: Model> AuthoritativeSource<M> for MemoryStore<M> {
    fn default_alias(&self) -> &str {
        &self.default_alias
    }

    fn fetch(&self, query: &SourceQuery) -> Result<Vec<Arc<M>>> {
        self.fetches.fetch_add(1, Ordering::Relaxed);

        if query.model() != M::NAME {
            return Err(QueryError::SourceError(format!(
                "store holds '{}', query asks for '{}'",
                M::NAME,
                query.model()
            )));
        }

        let mut rows = self
            .tables
            .read()
            .get(query.alias())
            .cloned()
            .ok_or_else(|| QueryError::SourceError(format!("unknown alias '{}'", query.alias())))?;

        for clause in query.clauses() {
            rows = self.apply_clause(rows, &clause.filters, clause.negate)?;
        }

        let ordering = self.flatten_ordering(query.ordering());
        sort_rows(&mut rows, &self.meta, &ordering, OrderingPolicy::FirstFieldDominant)?;

        trace!(
            model = M::NAME,
            alias = query.alias(),
            clauses = query.clauses().len(),
            rows = rows.len(),
            "memory store fetch"
        );
        Ok(rows)
    }
}
