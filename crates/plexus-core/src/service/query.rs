//! Typed property queries for the service registry.
//!
//! Queries are small expression trees over a registration's property
//! map, not strings evaluated at runtime. They are serde-derivable so
//! hosts can keep canned queries in configuration files.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, Result};

/// Comparison operator for a single property predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompareOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// A boolean predicate over a service registration's properties.
///
/// `All` matches every registration, mirroring the empty query of the
/// lookup operations. Missing properties never match a `Compare` or
/// `Has` node; an *ordering* comparison between values that cannot be
/// ordered (say, a number against a string) is a malformed predicate
/// and fails the whole lookup with `InvalidQuery`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Query {
    All,
    Has(String),
    Compare {
        property: String,
        op: CompareOp,
        value: Value,
    },
    Not(Box<Query>),
    And(Vec<Query>),
    Or(Vec<Query>),
}

impl Default for Query {
    fn default() -> Self {
        Query::All
    }
}

impl Query {
    pub fn eq(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Eq, value)
    }

    pub fn ne(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Ne, value)
    }

    pub fn lt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Lt, value)
    }

    pub fn le(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Le, value)
    }

    pub fn gt(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Gt, value)
    }

    pub fn ge(property: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::compare(property, CompareOp::Ge, value)
    }

    pub fn has(property: impl Into<String>) -> Self {
        Query::Has(property.into())
    }

    pub fn compare(property: impl Into<String>, op: CompareOp, value: impl Into<Value>) -> Self {
        Query::Compare {
            property: property.into(),
            op,
            value: value.into(),
        }
    }

    pub fn and(self, other: Query) -> Self {
        match self {
            Query::And(mut queries) => {
                queries.push(other);
                Query::And(queries)
            }
            query => Query::And(vec![query, other]),
        }
    }

    pub fn or(self, other: Query) -> Self {
        match self {
            Query::Or(mut queries) => {
                queries.push(other);
                Query::Or(queries)
            }
            query => Query::Or(vec![query, other]),
        }
    }

    pub fn negate(self) -> Self {
        Query::Not(Box::new(self))
    }

    /// Evaluate against a property map.
    pub fn matches(&self, properties: &HashMap<String, Value>) -> Result<bool> {
        match self {
            Query::All => Ok(true),
            Query::Has(property) => Ok(properties.contains_key(property)),
            Query::Compare {
                property,
                op,
                value,
            } => {
                let Some(actual) = properties.get(property) else {
                    return Ok(false);
                };
                match op {
                    CompareOp::Eq => Ok(actual == value),
                    CompareOp::Ne => Ok(actual != value),
                    _ => {
                        let ordering = compare_values(actual, value).ok_or_else(|| {
                            RegistryError::InvalidQuery(format!(
                                "cannot order {actual} against {value} for property '{property}'"
                            ))
                        })?;
                        Ok(match op {
                            CompareOp::Lt => ordering == Ordering::Less,
                            CompareOp::Le => ordering != Ordering::Greater,
                            CompareOp::Gt => ordering == Ordering::Greater,
                            CompareOp::Ge => ordering != Ordering::Less,
                            CompareOp::Eq | CompareOp::Ne => unreachable!(),
                        })
                    }
                }
            }
            Query::Not(query) => Ok(!query.matches(properties)?),
            Query::And(queries) => {
                for query in queries {
                    if !query.matches(properties)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Query::Or(queries) => {
                for query in queries {
                    if query.matches(properties)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
        }
    }
}

/// Ordering between two property values, where one exists: numbers by
/// numeric value, strings lexicographically, booleans false < true.
/// Everything else (and any mixed pair) is unordered.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

/// Full lookup arguments for `get_service` / `get_services`.
///
/// `minimize` and `maximize` name a property used to rank matches;
/// supplying both is contradictory and fails validation before any
/// matching happens.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ServiceQuery {
    #[serde(default)]
    pub query: Query,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimize: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximize: Option<String>,
}

impl ServiceQuery {
    /// Match every registration under the protocol.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn new(query: Query) -> Self {
        Self {
            query,
            minimize: None,
            maximize: None,
        }
    }

    /// Rank matches ascending by `property`.
    pub fn minimizing(mut self, property: impl Into<String>) -> Self {
        self.minimize = Some(property.into());
        self
    }

    /// Rank matches descending by `property`.
    pub fn maximizing(mut self, property: impl Into<String>) -> Self {
        self.maximize = Some(property.into());
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.minimize.is_some() && self.maximize.is_some() {
            return Err(RegistryError::InvalidQuery(
                "minimize and maximize are mutually exclusive".to_string(),
            ));
        }
        Ok(())
    }
}
