//! Service publication and discovery by capability.
//!
//! Where the extension mechanism fills declared slots with data, the
//! service registry answers "who can do X right now": objects are
//! published under a protocol id and looked up with a typed property
//! query, optionally ranked by a property value.

pub mod query;
pub mod registry;

pub use query::{CompareOp, Query, ServiceQuery};
pub use registry::{
    Protocol, ProtocolId, ServiceId, ServiceObject, ServiceProperties, ServiceRegistry,
};
