// moviedb-core/src/query.rs
// Filter documents with a small subset of the usual query language

use std::cmp::Ordering;

use serde_json::Value;

use crate::document::{is_date, is_object_id, Document};
use crate::error::{MovieDbError, Result};
use crate::index::IndexKey;

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    Eq(Value),
    Ne(Value),
    Gt(Value),
    Gte(Value),
    Lt(Value),
    Lte(Value),
    In(Vec<Value>),
    Exists(bool),
}

/// Parsed filter: every field condition must hold
#[derive(Debug, Clone, Default)]
pub struct Query {
    conditions: Vec<(String, Vec<Operator>)>,
}

impl Query {
    /// Empty filter, matches everything
    pub fn all() -> Self {
        Self::default()
    }

    pub fn from_value(filter: &Value) -> Result<Self> {
        let obj = filter.as_object().ok_or_else(|| {
            MovieDbError::InvalidQuery("Filter must be a JSON object".to_string())
        })?;

        let mut conditions = Vec::with_capacity(obj.len());
        for (field, condition) in obj {
            if field.starts_with('$') {
                return Err(MovieDbError::InvalidQuery(format!(
                    "Unsupported top-level operator '{}'",
                    field
                )));
            }
            conditions.push((field.clone(), Self::parse_condition(field, condition)?));
        }
        Ok(Query { conditions })
    }

    fn parse_condition(field: &str, condition: &Value) -> Result<Vec<Operator>> {
        let ops = match condition.as_object() {
            Some(map)
                if !map.is_empty()
                    && !is_object_id(condition)
                    && !is_date(condition)
                    && map.keys().all(|k| k.starts_with('$')) =>
            {
                map
            }
            _ => return Ok(vec![Operator::Eq(condition.clone())]),
        };

        let mut parsed = Vec::with_capacity(ops.len());
        for (op, operand) in ops {
            let operator = match op.as_str() {
                "$eq" => Operator::Eq(operand.clone()),
                "$ne" => Operator::Ne(operand.clone()),
                "$gt" => Operator::Gt(operand.clone()),
                "$gte" => Operator::Gte(operand.clone()),
                "$lt" => Operator::Lt(operand.clone()),
                "$lte" => Operator::Lte(operand.clone()),
                "$in" => {
                    let values = operand.as_array().ok_or_else(|| {
                        MovieDbError::InvalidQuery(format!("$in on '{}' needs an array", field))
                    })?;
                    Operator::In(values.clone())
                }
                "$exists" => {
                    let flag = operand.as_bool().ok_or_else(|| {
                        MovieDbError::InvalidQuery(format!(
                            "$exists on '{}' needs a boolean",
                            field
                        ))
                    })?;
                    Operator::Exists(flag)
                }
                other => {
                    return Err(MovieDbError::InvalidQuery(format!(
                        "Unsupported operator '{}' on field '{}'",
                        other, field
                    )))
                }
            };
            parsed.push(operator);
        }
        Ok(parsed)
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Fields constrained by a plain equality, usable for index lookups
    pub fn equality_conditions(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.conditions.iter().filter_map(|(field, ops)| match ops.as_slice() {
            [Operator::Eq(value)] if !value.is_array() => Some((field.as_str(), value)),
            _ => None,
        })
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(field, ops)| {
            let actual = doc.get(field);
            ops.iter().all(|op| operator_matches(op, actual))
        })
    }
}

fn operator_matches(op: &Operator, actual: Option<&Value>) -> bool {
    match op {
        Operator::Eq(expected) => value_equals(actual, expected),
        Operator::Ne(expected) => !value_equals(actual, expected),
        Operator::Gt(bound) => compare_matches(actual, bound, |o| o == Ordering::Greater),
        Operator::Gte(bound) => compare_matches(actual, bound, |o| o != Ordering::Less),
        Operator::Lt(bound) => compare_matches(actual, bound, |o| o == Ordering::Less),
        Operator::Lte(bound) => compare_matches(actual, bound, |o| o != Ordering::Greater),
        Operator::In(candidates) => candidates.iter().any(|c| value_equals(actual, c)),
        Operator::Exists(flag) => actual.is_some() == *flag,
    }
}

/// Equality with array membership: `{"genres": g}` matches `genres: [g, ...]`
fn value_equals(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        None => expected.is_null(),
        Some(Value::Array(items)) if !expected.is_array() => {
            items.iter().any(|item| scalar_equals(item, expected))
        }
        Some(value) => scalar_equals(value, expected),
    }
}

fn scalar_equals(a: &Value, b: &Value) -> bool {
    if is_comparable(a) && is_comparable(b) {
        IndexKey::from(a) == IndexKey::from(b)
    } else {
        a == b
    }
}

fn compare_matches(actual: Option<&Value>, bound: &Value, accept: impl Fn(Ordering) -> bool) -> bool {
    match actual {
        Some(Value::Array(items)) => items
            .iter()
            .any(|item| compare_values(item, bound).map(&accept).unwrap_or(false)),
        Some(value) => compare_values(value, bound).map(accept).unwrap_or(false),
        None => false,
    }
}

/// Ordering between two values of the same type bracket, None across types
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    if !is_comparable(a) || !is_comparable(b) {
        return None;
    }
    let (ka, kb) = (IndexKey::from(a), IndexKey::from(b));
    if std::mem::discriminant(&ka) == std::mem::discriminant(&kb)
        || (is_number_key(&ka) && is_number_key(&kb))
    {
        Some(ka.cmp(&kb))
    } else {
        None
    }
}

fn is_number_key(key: &IndexKey) -> bool {
    matches!(key, IndexKey::Int(_) | IndexKey::Float(_))
}

fn is_comparable(value: &Value) -> bool {
    match value {
        Value::Array(_) => false,
        Value::Object(_) => is_object_id(value) || is_date(value),
        _ => true,
    }
}
