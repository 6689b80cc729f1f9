//! Extension point declarations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, Result};

/// A named slot that a component declares, inviting others to
/// contribute extensions to it.
///
/// Points are declared once at plugin activation time and are
/// immutable afterwards; they are never removed during normal
/// operation. The optional `schema` describes the expected shape of a
/// contribution and is carried as metadata for hosts that validate or
/// document their slots.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtensionPoint {
    /// Globally unique identifier, e.g. `"plexus.ui.commands"`.
    pub id: String,

    /// Human-readable description of what contributions mean.
    #[serde(default)]
    pub description: String,

    /// Expected contribution shape, if the declaring component cares.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ExtensionPoint {
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            schema: None,
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }
}

/// Directory of declared extension points.
///
/// Leaf component with no locking of its own: the owning registry
/// guards it together with the contribution map so that validation and
/// mutation observe a single consistent state.
#[derive(Debug, Default)]
pub struct ExtensionPointRegistry {
    points: HashMap<String, ExtensionPoint>,
}

impl ExtensionPointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a point. Redeclaring an existing id replaces the
    /// descriptor; contributions already made to it are kept.
    pub fn declare(&mut self, point: ExtensionPoint) {
        tracing::debug!(id = %point.id, "declared extension point");
        self.points.insert(point.id.clone(), point);
    }

    pub fn get(&self, id: &str) -> Option<&ExtensionPoint> {
        self.points.get(id)
    }

    pub fn ids(&self) -> Vec<String> {
        self.points.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Validation used by every mutator of the extension registry:
    /// fail fast when the point was never declared.
    pub fn check(&self, id: &str) -> Result<()> {
        if self.points.contains_key(id) {
            Ok(())
        } else {
            Err(RegistryError::UnknownExtensionPoint(id.to_string()))
        }
    }
}
