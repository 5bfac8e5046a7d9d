use query_core::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lookup kinds that can be evaluated against cached instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LookupKind {
    Exact,
    IExact,
    Gt,
    Gte,
    Lt,
    Lte,
    Contains,
    IContains,
    In,
    StartsWith,
    IStartsWith,
    EndsWith,
    IEndsWith,
    Range,
    Year,
    Month,
    Day,
    IsNull,
}

impl LookupKind {
    pub const ALL: [LookupKind; 18] = [
        LookupKind::Exact,
        LookupKind::IExact,
        LookupKind::Gt,
        LookupKind::Gte,
        LookupKind::Lt,
        LookupKind::Lte,
        LookupKind::Contains,
        LookupKind::IContains,
        LookupKind::In,
        LookupKind::StartsWith,
        LookupKind::IStartsWith,
        LookupKind::EndsWith,
        LookupKind::IEndsWith,
        LookupKind::Range,
        LookupKind::Year,
        LookupKind::Month,
        LookupKind::Day,
        LookupKind::IsNull,
    ];

    /// Map a query-term token to a supported kind.
    ///
    /// `isnull` is accepted as another spelling of `is_null`.
    pub fn from_token(token: &str) -> Option<Self> {
        let kind = match token {
            "exact" => LookupKind::Exact,
            "iexact" => LookupKind::IExact,
            "gt" => LookupKind::Gt,
            "gte" => LookupKind::Gte,
            "lt" => LookupKind::Lt,
            "lte" => LookupKind::Lte,
            "contains" => LookupKind::Contains,
            "icontains" => LookupKind::IContains,
            "in" => LookupKind::In,
            "startswith" => LookupKind::StartsWith,
            "istartswith" => LookupKind::IStartsWith,
            "endswith" => LookupKind::EndsWith,
            "iendswith" => LookupKind::IEndsWith,
            "range" => LookupKind::Range,
            "year" => LookupKind::Year,
            "month" => LookupKind::Month,
            "day" => LookupKind::Day,
            "is_null" | "isnull" => LookupKind::IsNull,
            _ => return None,
        };
        Some(kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LookupKind::Exact => "exact",
            LookupKind::IExact => "iexact",
            LookupKind::Gt => "gt",
            LookupKind::Gte => "gte",
            LookupKind::Lt => "lt",
            LookupKind::Lte => "lte",
            LookupKind::Contains => "contains",
            LookupKind::IContains => "icontains",
            LookupKind::In => "in",
            LookupKind::StartsWith => "startswith",
            LookupKind::IStartsWith => "istartswith",
            LookupKind::EndsWith => "endswith",
            LookupKind::IEndsWith => "iendswith",
            LookupKind::Range => "range",
            LookupKind::Year => "year",
            LookupKind::Month => "month",
            LookupKind::Day => "day",
            LookupKind::IsNull => "is_null",
        }
    }
}

impl fmt::Display for LookupKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A parsed filter: read `field`, compare it to `value` using `kind`
#[derive(Debug, Clone, PartialEq)]
pub struct Lookup {
    /// Attribute name on the cached instance (already flattened)
    pub field: String,
    /// Filter argument
    pub value: Value,
    pub kind: LookupKind,
}

impl Lookup {
    pub fn new(field: impl Into<String>, value: Value, kind: LookupKind) -> Self {
        Self {
            field: field.into(),
            value,
            kind,
        }
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.kind, self.value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_round_trip() {
        for kind in LookupKind::ALL {
            assert_eq!(LookupKind::from_token(kind.as_str()), Some(kind));
        }
    }

    #[test]
    fn test_isnull_alias() {
        assert_eq!(LookupKind::from_token("isnull"), Some(LookupKind::IsNull));
        assert_eq!(LookupKind::from_token("regex"), None);
        assert_eq!(LookupKind::from_token("week_day"), None);
    }

    #[test]
    fn test_lookup_display() {
        let lookup = Lookup::new("age", Value::Int64(30), LookupKind::Gte);
        assert_eq!(lookup.to_string(), "age gte 30");
    }
}
