//! The contributed-extension handle type.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// One contribution to an extension point.
///
/// An `Extension` is a cheap-to-clone handle around a JSON value: the
/// registry stores these handles, never copies of the underlying data,
/// so a contribution shared between the registry and its contributor
/// is the same allocation. Equality is value equality, which is what
/// removal by lookup relies on.
#[derive(Debug, Clone)]
pub struct Extension(Arc<Value>);

impl Extension {
    /// Wrap a value as a contribution.
    pub fn new(value: impl Into<Value>) -> Self {
        Self(Arc::new(value.into()))
    }

    /// Borrow the contributed value.
    pub fn value(&self) -> &Value {
        &self.0
    }
}

impl Deref for Extension {
    type Target = Value;

    fn deref(&self) -> &Value {
        &self.0
    }
}

impl From<Value> for Extension {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}

impl PartialEq for Extension {
    fn eq(&self, other: &Self) -> bool {
        // Pointer equality short-circuits the common case of comparing
        // a handle against a clone of itself.
        Arc::ptr_eq(&self.0, &other.0) || self.0 == other.0
    }
}

impl Eq for Extension {}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Manual serde impls: the handle serializes as its inner value, and
// deserializing allocates a fresh handle.
impl Serialize for Extension {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Extension {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::new)
    }
}
