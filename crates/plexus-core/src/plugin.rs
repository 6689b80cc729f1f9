//! The contract a plugin loader programs against.
//!
//! The registries are created once at application start and handed to
//! every plugin by reference; there is no ambient global registry.
//! Loading, discovery, and dependency ordering belong to the host, not
//! to this crate.

use std::sync::Arc;

use crate::extension::InMemoryExtensionRegistry;
use crate::service::ServiceRegistry;

/// The registries a plugin works with during its lifetime.
///
/// Cloning is cheap (two `Arc` bumps); hosts typically clone one
/// context into each component they construct.
#[derive(Clone, Default)]
pub struct PluginContext {
    pub extensions: Arc<InMemoryExtensionRegistry>,
    pub services: Arc<ServiceRegistry>,
}

impl PluginContext {
    pub fn new() -> Self {
        Self::default()
    }
}

/// An independently activatable unit of the host application.
///
/// `start` runs at activation time and is where a plugin declares its
/// extension points, contributes to points declared by others, and
/// publishes services. `stop` runs at shutdown and should withdraw
/// what `start` published.
pub trait Plugin: Send + Sync {
    fn id(&self) -> &str;

    fn start(&self, context: &PluginContext) -> anyhow::Result<()>;

    fn stop(&self, _context: &PluginContext) -> anyhow::Result<()> {
        Ok(())
    }
}
