//! Lookup kind -> comparator resolution
//!
//! Every comparator takes `(field value, filter argument)`. Null field values
//! never satisfy ordering, string or date lookups. Operands of incompatible
//! types are reported as `TypeMismatch` rather than coerced.

use chrono::{Datelike, NaiveDate};
use query_core::{DataType, QueryError, Result, Value};
use query_planner::{Lookup, LookupKind};
use std::cmp::Ordering;

/// Binary comparison over `(field value, argument)`
pub type Comparator = fn(&Value, &Value) -> Result<bool>;

pub fn resolve(kind: LookupKind) -> Comparator {
    match kind {
        LookupKind::Exact => exact,
        LookupKind::IExact => iexact,
        LookupKind::Gt => gt,
        LookupKind::Gte => gte,
        LookupKind::Lt => lt,
        LookupKind::Lte => lte,
        LookupKind::Contains => contains,
        LookupKind::IContains => icontains,
        LookupKind::In => in_list,
        LookupKind::StartsWith => starts_with,
        LookupKind::IStartsWith => istarts_with,
        LookupKind::EndsWith => ends_with,
        LookupKind::IEndsWith => iends_with,
        LookupKind::Range => range,
        LookupKind::Year => year,
        LookupKind::Month => month,
        LookupKind::Day => day,
        LookupKind::IsNull => is_null,
    }
}

/// Evaluate a single lookup against an already extracted field value
pub fn evaluate(lookup: &Lookup, field_value: &Value) -> Result<bool> {
    resolve(lookup.kind)(field_value, &lookup.value)
}

fn mismatch(expected: impl Into<String>, found: &Value) -> QueryError {
    QueryError::type_mismatch(expected, found.data_type().to_string())
}

fn is_numeric(v: &Value) -> bool {
    matches!(v.data_type(), DataType::Int64 | DataType::Float64)
}

fn exact(a: &Value, b: &Value) -> Result<bool> {
    if a.is_null() || b.is_null() {
        return Ok(a.is_null() && b.is_null());
    }
    if a.data_type() != b.data_type() && !(is_numeric(a) && is_numeric(b)) {
        return Err(mismatch(a.data_type().to_string(), b));
    }
    Ok(a.loose_eq(b))
}

fn ordered(a: &Value, b: &Value, accept: fn(Ordering) -> bool) -> Result<bool> {
    if a.is_null() || b.is_null() {
        return Ok(false);
    }
    Ok(accept(a.try_cmp(b)?))
}

fn gt(a: &Value, b: &Value) -> Result<bool> {
    ordered(a, b, |o| o == Ordering::Greater)
}

fn gte(a: &Value, b: &Value) -> Result<bool> {
    ordered(a, b, |o| o != Ordering::Less)
}

fn lt(a: &Value, b: &Value) -> Result<bool> {
    ordered(a, b, |o| o == Ordering::Less)
}

fn lte(a: &Value, b: &Value) -> Result<bool> {
    ordered(a, b, |o| o != Ordering::Greater)
}

/// Both operands as strings; `None` when the field value is null
fn strings<'a>(a: &'a Value, b: &'a Value) -> Result<Option<(&'a str, &'a str)>> {
    if a.is_null() {
        return Ok(None);
    }
    let lhs = a.as_str().ok_or_else(|| mismatch("UTF8", a))?;
    let rhs = b.as_str().ok_or_else(|| mismatch("UTF8", b))?;
    Ok(Some((lhs, rhs)))
}

fn string_test(a: &Value, b: &Value, fold: bool, test: fn(&str, &str) -> bool) -> Result<bool> {
    Ok(match strings(a, b)? {
        Some((lhs, rhs)) if fold => test(&lhs.to_lowercase(), &rhs.to_lowercase()),
        Some((lhs, rhs)) => test(lhs, rhs),
        None => false,
    })
}

fn iexact(a: &Value, b: &Value) -> Result<bool> {
    string_test(a, b, true, |l, r| l == r)
}

fn contains(a: &Value, b: &Value) -> Result<bool> {
    match a {
        Value::List(items) => Ok(items.iter().any(|item| item.loose_eq(b))),
        _ => string_test(a, b, false, |l, r| l.contains(r)),
    }
}

fn icontains(a: &Value, b: &Value) -> Result<bool> {
    string_test(a, b, true, |l, r| l.contains(r))
}

fn starts_with(a: &Value, b: &Value) -> Result<bool> {
    string_test(a, b, false, |l, r| l.starts_with(r))
}

fn istarts_with(a: &Value, b: &Value) -> Result<bool> {
    string_test(a, b, true, |l, r| l.starts_with(r))
}

fn ends_with(a: &Value, b: &Value) -> Result<bool> {
    string_test(a, b, false, |l, r| l.ends_with(r))
}

fn iends_with(a: &Value, b: &Value) -> Result<bool> {
    string_test(a, b, true, |l, r| l.ends_with(r))
}

fn in_list(a: &Value, b: &Value) -> Result<bool> {
    let items = b.as_list().ok_or_else(|| mismatch("LIST", b))?;
    if a.is_null() {
        return Ok(false);
    }
    Ok(items.iter().any(|item| a.loose_eq(item)))
}

fn range(a: &Value, b: &Value) -> Result<bool> {
    let (low, high) = match b.as_list() {
        Some([low, high]) => (low, high),
        _ => return Err(mismatch("LIST of (low, high)", b)),
    };
    if a.is_null() {
        return Ok(false);
    }
    Ok(a.try_cmp(low)? != Ordering::Less && a.try_cmp(high)? != Ordering::Greater)
}

fn date_part(a: &Value, b: &Value, part: fn(NaiveDate) -> i64) -> Result<bool> {
    let expected = b.as_i64().ok_or_else(|| mismatch("INT64", b))?;
    match a {
        Value::Null => Ok(false),
        Value::Date(d) => Ok(part(*d) == expected),
        Value::Timestamp(ts) => Ok(part(ts.date()) == expected),
        _ => Err(mismatch("DATE or TIMESTAMP", a)),
    }
}

fn year(a: &Value, b: &Value) -> Result<bool> {
    date_part(a, b, |d| d.year() as i64)
}

fn month(a: &Value, b: &Value) -> Result<bool> {
    date_part(a, b, |d| d.month() as i64)
}

fn day(a: &Value, b: &Value) -> Result<bool> {
    date_part(a, b, |d| d.day() as i64)
}

/// Matches when the field's nullness equals the boolean argument
fn is_null(a: &Value, b: &Value) -> Result<bool> {
    let want_null = b.as_bool().ok_or_else(|| mismatch("BOOLEAN", b))?;
    Ok(a.is_null() == want_null)
}
