//! Query predicates and value expressions.
//!
//! A `Filter` is evaluated against a document's fields with `_id` present as
//! its lowercase hex string. Missing attributes and explicit nulls are treated
//! alike: neither takes part in comparisons.

use std::cmp::Ordering;

use rivalscope_core::ObjectId;
use serde_json::Value;

use crate::types::{get_path, Fields, ID_FIELD};

/// A value computed from a document.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Attribute at a dotted path.
    Field(String),
    /// First operand that evaluates to a non-null value.
    FirstNonNull(Vec<Expr>),
    /// Lowercased string form; numbers are stringified, other types yield nothing.
    ToLower(Box<Expr>),
    Literal(Value),
}

impl Expr {
    pub fn field(path: impl Into<String>) -> Self {
        Self::Field(path.into())
    }

    pub fn first_non_null<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::FirstNonNull(paths.into_iter().map(|p| Self::Field(p.into())).collect())
    }

    pub fn to_lower(self) -> Self {
        Self::ToLower(Box::new(self))
    }

    /// Evaluate against `fields`; `None` stands for missing or null.
    pub fn eval(&self, fields: &Fields) -> Option<Value> {
        match self {
            Self::Field(path) => get_path(fields, path).filter(|v| !v.is_null()).cloned(),
            Self::FirstNonNull(operands) => operands.iter().find_map(|e| e.eval(fields)),
            Self::ToLower(inner) => match inner.eval(fields)? {
                Value::String(s) => Some(Value::String(s.to_lowercase())),
                Value::Number(n) => Some(Value::String(n.to_string())),
                _ => None,
            },
            Self::Literal(v) if v.is_null() => None,
            Self::Literal(v) => Some(v.clone()),
        }
    }
}

/// A predicate over documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Matches every document.
    All,
    And(Vec<Filter>),
    /// Matches when any branch matches; an empty `Or` matches nothing.
    Or(Vec<Filter>),
    /// Equality; array values match when any element is equal. A null operand
    /// matches missing or null values.
    Eq(Expr, Value),
    In(Expr, Vec<Value>),
    /// Case-insensitive literal substring match on string values.
    Contains(Expr, String),
    /// Ordered comparison on numbers or strings of the same kind.
    Gte(Expr, Value),
    /// The attribute is present, even when null.
    Exists(String),
    NotNull(Expr),
    IdEq(ObjectId),
    IdGte(ObjectId),
}

impl Filter {
    pub fn eq(path: &str, value: impl Into<Value>) -> Self {
        Self::Eq(Expr::field(path), value.into())
    }

    pub fn is_in<I, V>(path: &str, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        Self::In(Expr::field(path), values.into_iter().map(Into::into).collect())
    }

    pub fn contains(path: &str, needle: &str) -> Self {
        Self::Contains(Expr::field(path), needle.to_string())
    }

    pub fn gte(path: &str, value: impl Into<Value>) -> Self {
        Self::Gte(Expr::field(path), value.into())
    }

    pub fn exists(path: &str) -> Self {
        Self::Exists(path.to_string())
    }

    /// Conjunction that drops `All` operands and flattens nested `And`s.
    pub fn and(filters: impl IntoIterator<Item = Filter>) -> Self {
        let mut parts = Vec::new();
        for f in filters {
            match f {
                Self::All => {}
                Self::And(inner) => parts.extend(inner),
                other => parts.push(other),
            }
        }
        match parts.len() {
            0 => Self::All,
            1 => parts.remove(0),
            _ => Self::And(parts),
        }
    }

    pub fn or(filters: impl IntoIterator<Item = Filter>) -> Self {
        let parts: Vec<Filter> = filters.into_iter().collect();
        if parts.len() == 1 {
            return parts.into_iter().next().unwrap_or(Self::All);
        }
        Self::Or(parts)
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    pub fn matches(&self, fields: &Fields) -> bool {
        match self {
            Self::All => true,
            Self::And(parts) => parts.iter().all(|f| f.matches(fields)),
            Self::Or(parts) => parts.iter().any(|f| f.matches(fields)),
            Self::Eq(expr, expected) => value_matches(expr.eval(fields).as_ref(), expected),
            Self::In(expr, candidates) => {
                let actual = expr.eval(fields);
                candidates.iter().any(|c| value_matches(actual.as_ref(), c))
            }
            Self::Contains(expr, needle) => {
                let needle = needle.to_lowercase();
                match expr.eval(fields) {
                    Some(Value::String(s)) => s.to_lowercase().contains(&needle),
                    Some(Value::Array(items)) => items.iter().any(|item| {
                        item.as_str()
                            .map(|s| s.to_lowercase().contains(&needle))
                            .unwrap_or(false)
                    }),
                    _ => false,
                }
            }
            Self::Gte(expr, bound) => expr
                .eval(fields)
                .and_then(|actual| compare_values(&actual, bound))
                .map(|ord| ord != Ordering::Less)
                .unwrap_or(false),
            Self::Exists(path) => get_path(fields, path).is_some(),
            Self::NotNull(expr) => expr.eval(fields).is_some(),
            Self::IdEq(id) => document_id(fields) == Some(*id),
            Self::IdGte(bound) => document_id(fields).map(|id| id >= *bound).unwrap_or(false),
        }
    }

    /// Tightest identifier lower bound among the top-level conjuncts, for
    /// pushing into an index range scan.
    pub fn id_lower_bound(&self) -> Option<ObjectId> {
        match self {
            Self::IdGte(bound) | Self::IdEq(bound) => Some(*bound),
            Self::And(parts) => parts.iter().filter_map(Filter::id_lower_bound).max(),
            _ => None,
        }
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::All
    }
}

fn document_id(fields: &Fields) -> Option<ObjectId> {
    fields
        .get(ID_FIELD)
        .and_then(Value::as_str)
        .and_then(|s| ObjectId::parse_str(s).ok())
}

fn value_matches(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| values_equal(item, expected))
        }
        Some(v) => values_equal(v, expected),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

/// Ordering between two values of the same kind; `None` across kinds.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}
