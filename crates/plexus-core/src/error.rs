//! Error types for the registry crate.
//!
//! Lookup misses on read paths are deliberately *not* errors: they
//! surface as `None` or an empty sequence. The variants here cover the
//! cases where the caller named something the registry has never heard
//! of, or supplied a query that cannot be evaluated.

use thiserror::Error;

use crate::extension::Extension;
use crate::service::ServiceId;

/// Errors produced by the extension and service registries.
#[derive(Debug, Clone, Error)]
pub enum RegistryError {
    /// A mutation referenced an extension point that was never declared.
    #[error("unknown extension point: {0}")]
    UnknownExtensionPoint(String),

    /// A removal referenced an extension that is not currently
    /// contributed to the named point. Items removed earlier in the
    /// same batch stay removed.
    #[error("unknown extension for point '{extension_point_id}': {extension}")]
    UnknownExtension {
        extension_point_id: String,
        extension: Extension,
    },

    /// A property lookup or unregistration referenced a service id
    /// that was never registered or has already been removed.
    #[error("unknown service id: {0}")]
    UnknownServiceId(ServiceId),

    /// The query arguments are contradictory or the predicate cannot
    /// be evaluated against the stored property values.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RegistryError>;
