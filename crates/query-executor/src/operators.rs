//! In-memory operators over snapshot rows

use crate::resolver::{resolve, Comparator};
use query_core::{ModelMeta, Result, Value};
use query_planner::Lookup;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::sync::Arc;

/// How multi-field orderings break ties on cached rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrderingPolicy {
    /// One stable sort per field, in the order given: the last field named
    /// ends up as the primary key.
    #[default]
    LastFieldDominant,
    /// Conventional multi-key ordering: the first field named is primary.
    FirstFieldDominant,
}

/// Keep rows for which every lookup holds, or drop them when `negate`.
///
/// No lookups means no restriction in either direction.
pub fn filter_rows<M>(
    rows: &[Arc<M>],
    meta: &ModelMeta<M>,
    lookups: &[Lookup],
    negate: bool,
) -> Result<Vec<Arc<M>>> {
    if lookups.is_empty() {
        return Ok(rows.to_vec());
    }

    let resolved: Vec<(&Lookup, Comparator)> =
        lookups.iter().map(|l| (l, resolve(l.kind))).collect();

    let mut kept = Vec::with_capacity(rows.len());
    for row in rows {
        if matches_all(&**row, meta, &resolved)? != negate {
            kept.push(Arc::clone(row));
        }
    }
    Ok(kept)
}

fn matches_all<M>(row: &M, meta: &ModelMeta<M>, resolved: &[(&Lookup, Comparator)]) -> Result<bool> {
    for (lookup, compare) in resolved {
        let value = meta.get(row, &lookup.field)?;
        if !compare(&value, &lookup.value)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Field name plus direction, parsed from `"name"` / `"-name"`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrderField<'a> {
    pub name: &'a str,
    pub descending: bool,
}

impl<'a> OrderField<'a> {
    pub fn parse(field: &'a str) -> Self {
        match field.strip_prefix('-') {
            Some(name) => Self {
                name,
                descending: true,
            },
            None => Self {
                name: field,
                descending: false,
            },
        }
    }
}

/// Sort rows in place by `fields` according to `policy`
pub fn sort_rows<M>(
    rows: &mut [Arc<M>],
    meta: &ModelMeta<M>,
    fields: &[String],
    policy: OrderingPolicy,
) -> Result<()> {
    match policy {
        OrderingPolicy::LastFieldDominant => {
            for field in fields {
                sort_by_field(rows, meta, OrderField::parse(field))?;
            }
        }
        OrderingPolicy::FirstFieldDominant => {
            for field in fields.iter().rev() {
                sort_by_field(rows, meta, OrderField::parse(field))?;
            }
        }
    }
    Ok(())
}

/// One stable pass keyed on a single field
fn sort_by_field<M>(rows: &mut [Arc<M>], meta: &ModelMeta<M>, field: OrderField<'_>) -> Result<()> {
    let mut keyed = rows
        .iter()
        .map(|row| Ok((meta.get(row, field.name)?, Arc::clone(row))))
        .collect::<Result<Vec<(Value, Arc<M>)>>>()?;

    check_sortable(keyed.iter().map(|(key, _)| key))?;

    // every pair of keys is comparable from here on
    keyed.sort_by(|(a, _), (b, _)| {
        let ordering = a.sort_cmp(b).unwrap_or(Ordering::Equal);
        if field.descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    for (slot, (_, row)) in rows.iter_mut().zip(keyed) {
        *slot = row;
    }
    Ok(())
}

/// Non-null keys must all be comparable with each other and none may be NaN.
///
/// Comparability is shared by a whole type class (numbers, strings, ...),
/// so checking each key against itself and against the first non-null key
/// covers every pair.
fn check_sortable<'a>(keys: impl Iterator<Item = &'a Value>) -> Result<()> {
    let mut first: Option<&Value> = None;
    for key in keys.filter(|k| !k.is_null()) {
        key.try_cmp(key)?;
        match first {
            Some(first) => {
                first.try_cmp(key)?;
            }
            None => first = Some(key),
        }
    }
    Ok(())
}
