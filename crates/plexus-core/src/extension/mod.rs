//! The extension point mechanism.
//!
//! Components declare named slots (extension points) and other
//! components contribute data to them (extensions) without either side
//! knowing about the other's existence. This module provides:
//! - `ExtensionPoint` / `ExtensionPointRegistry` - slot declarations
//! - `Extension` - the contributed-value handle
//! - `ExtensionListener` / `ListenerRegistry` - change notification
//! - `InMemoryExtensionRegistry` - the registry implementation
//!
//! The read and write surfaces are split into two traits so consumers
//! that only discover contributions can be handed a read-only view.

pub mod listener;
pub mod point;
pub mod registry;
pub mod types;

use std::sync::Arc;

pub use listener::{ExtensionEvent, ExtensionListener, ListenerRegistry};
pub use point::{ExtensionPoint, ExtensionPointRegistry};
pub use registry::InMemoryExtensionRegistry;
pub use types::Extension;

use crate::error::Result;

/// Read access to contributed extensions.
///
/// Absence is not an error here: reading a point nobody has
/// contributed to (or that was never declared) yields an empty
/// sequence, and an unknown point id yields `None` from
/// `get_extension_point`.
pub trait ExtensionRegistry: Send + Sync {
    /// The current contribution sequence for a point, in contribution
    /// order.
    fn get_extensions(&self, extension_point_id: &str) -> Vec<Extension>;

    /// The declaration for a point, if it was ever declared.
    fn get_extension_point(&self, extension_point_id: &str) -> Option<ExtensionPoint>;

    /// Ids of every declared point.
    fn extension_point_ids(&self) -> Vec<String>;

    /// Subscribe to changes of one point, or of all points when
    /// `extension_point_id` is `None`. The listener is held weakly.
    fn add_listener(
        &self,
        listener: &Arc<dyn ExtensionListener>,
        extension_point_id: Option<&str>,
    );

    /// Remove a subscription previously made with the same listener
    /// and filter.
    fn remove_listener(
        &self,
        listener: &Arc<dyn ExtensionListener>,
        extension_point_id: Option<&str>,
    );
}

/// Write access to the registry.
///
/// Every mutator validates that the target point was declared and
/// fails fast with `UnknownExtensionPoint` otherwise, committing
/// nothing. Listeners for the affected point (and wildcard listeners)
/// are notified synchronously after the mutation commits.
pub trait MutableExtensionRegistry: ExtensionRegistry {
    /// Declare an extension point.
    fn add_extension_point(&self, point: ExtensionPoint);

    /// Contribute a single extension; appends at the end of the
    /// point's sequence.
    fn add_extension(&self, extension_point_id: &str, extension: Extension) -> Result<()> {
        self.add_extensions(extension_point_id, vec![extension])
    }

    /// Contribute a batch of extensions; the block is appended at the
    /// current end of the sequence, preserving its internal order.
    fn add_extensions(&self, extension_point_id: &str, extensions: Vec<Extension>) -> Result<()>;

    /// Remove a single contribution, matched by value equality.
    fn remove_extension(&self, extension_point_id: &str, extension: &Extension) -> Result<()> {
        self.remove_extensions(extension_point_id, std::slice::from_ref(extension))
    }

    /// Remove a batch of contributions. If an item is not present the
    /// call fails with `UnknownExtension`; items earlier in the batch
    /// stay removed and no change event is fired for the failed call.
    fn remove_extensions(&self, extension_point_id: &str, extensions: &[Extension]) -> Result<()>;

    /// Replace the point's entire sequence atomically.
    fn set_extensions(&self, extension_point_id: &str, extensions: Vec<Extension>) -> Result<()>;
}
