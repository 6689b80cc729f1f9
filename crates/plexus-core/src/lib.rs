//! Runtime extension-point and service registry.
//!
//! Plexus lets a modular application assemble itself from
//! loosely-coupled parts discovered at startup. One component declares
//! a named slot (an extension point); others contribute data to it
//! (extensions) without either side knowing about the other. A
//! separate directory publishes service objects by capability
//! ("protocol") with per-registration property maps and a typed query
//! mechanism.
//!
//! All operations are synchronous and in-memory. Registries are safe
//! to share across threads; change listeners run on the mutating
//! thread after the registry lock has been released, so they may call
//! back into the registry freely.

pub mod error;
pub mod extension;
pub mod plugin;
pub mod service;

pub use error::{RegistryError, Result};
pub use extension::{
    Extension, ExtensionEvent, ExtensionListener, ExtensionPoint, ExtensionRegistry,
    InMemoryExtensionRegistry, MutableExtensionRegistry,
};
pub use plugin::{Plugin, PluginContext};
pub use service::{
    Protocol, ProtocolId, Query, ServiceId, ServiceObject, ServiceProperties, ServiceQuery,
    ServiceRegistry,
};

/// Re-exports commonly used types.
pub mod prelude {
    pub use crate::error::{RegistryError, Result};
    pub use crate::extension::{
        Extension, ExtensionEvent, ExtensionListener, ExtensionPoint, ExtensionRegistry,
        InMemoryExtensionRegistry, MutableExtensionRegistry,
    };
    pub use crate::plugin::{Plugin, PluginContext};
    pub use crate::service::{
        CompareOp, Protocol, ProtocolId, Query, ServiceId, ServiceObject, ServiceQuery,
        ServiceRegistry,
    };
}
