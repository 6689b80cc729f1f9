//! The service registry.
//!
//! A "Yellow Pages" directory: services are published and looked up by
//! protocol, i.e. by what they can do, not by name. Many services may
//! share a protocol; each registration carries a live property map
//! used by queries and ranking.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{RegistryError, Result};
use crate::service::query::{compare_values, ServiceQuery};

/// Process-unique handle for one service registration. Ids are never
/// reused for the lifetime of the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceId(u64);

impl fmt::Display for ServiceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A capability identity, e.g. `"plexus.resource.loader"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProtocolId(String);

impl ProtocolId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ProtocolId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ProtocolId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The protocol a service is registered under, together with every
/// broader capability it declares itself assignable to.
///
/// This is the explicit capability index that stands in for subtype
/// polymorphism: a registration under `Protocol::new("app.text_editor")
/// .satisfying("app.editor")` is discoverable under both ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Protocol {
    pub id: ProtocolId,
    #[serde(default)]
    pub satisfies: Vec<ProtocolId>,
}

impl Protocol {
    pub fn new(id: impl Into<ProtocolId>) -> Self {
        Self {
            id: id.into(),
            satisfies: Vec::new(),
        }
    }

    /// Declare that this protocol also satisfies a broader capability.
    pub fn satisfying(mut self, id: impl Into<ProtocolId>) -> Self {
        self.satisfies.push(id.into());
        self
    }

    /// Every capability id this protocol is discoverable under.
    fn capability_ids(&self) -> impl Iterator<Item = &ProtocolId> {
        std::iter::once(&self.id).chain(self.satisfies.iter())
    }
}

/// The published object. Consumers downcast to the concrete type the
/// protocol implies.
pub type ServiceObject = Arc<dyn Any + Send + Sync>;

/// A registration's property map. This is the registry's own storage,
/// not a snapshot: mutating it through the returned handle is
/// immediately visible to subsequent queries. The registry does not
/// serialize those external mutations against queries.
pub type ServiceProperties = Arc<RwLock<HashMap<String, Value>>>;

struct ServiceRegistration {
    protocol: Protocol,
    object: ServiceObject,
    properties: ServiceProperties,
}

#[derive(Default)]
struct Tables {
    services: HashMap<ServiceId, ServiceRegistration>,
    /// Registration order per capability id, including the ids a
    /// protocol merely satisfies.
    by_capability: HashMap<ProtocolId, Vec<ServiceId>>,
}

/// Directory of published services, keyed by capability.
#[derive(Default)]
pub struct ServiceRegistry {
    tables: Mutex<Tables>,
    next_id: AtomicU64,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a service under a protocol. `properties` defaults to an
    /// empty map. Returns the id used for later property lookup and
    /// unregistration.
    pub fn register_service(
        &self,
        protocol: Protocol,
        object: ServiceObject,
        properties: Option<HashMap<String, Value>>,
    ) -> ServiceId {
        let id = ServiceId(self.next_id.fetch_add(1, AtomicOrdering::Relaxed) + 1);
        tracing::debug!(service_id = %id, protocol = %protocol.id, "registered service");

        let mut tables = self.tables.lock();
        for capability in protocol.capability_ids() {
            tables
                .by_capability
                .entry(capability.clone())
                .or_default()
                .push(id);
        }
        tables.services.insert(
            id,
            ServiceRegistration {
                protocol,
                object,
                properties: Arc::new(RwLock::new(properties.unwrap_or_default())),
            },
        );
        id
    }

    /// Remove a registration. The id is dead afterwards and will never
    /// be handed out again.
    pub fn unregister_service(&self, id: ServiceId) -> Result<()> {
        let mut tables = self.tables.lock();
        let registration = tables
            .services
            .remove(&id)
            .ok_or(RegistryError::UnknownServiceId(id))?;
        for capability in registration.protocol.capability_ids() {
            if let Some(ids) = tables.by_capability.get_mut(capability) {
                ids.retain(|candidate| *candidate != id);
            }
        }
        tracing::debug!(service_id = %id, protocol = %registration.protocol.id, "unregistered service");
        Ok(())
    }

    /// The live property map of a registration.
    pub fn get_service_properties(&self, id: ServiceId) -> Result<ServiceProperties> {
        self.tables
            .lock()
            .services
            .get(&id)
            .map(|registration| registration.properties.clone())
            .ok_or(RegistryError::UnknownServiceId(id))
    }

    /// One service matching the protocol and query, or `None`. With
    /// several matches and no ranking the choice is arbitrary; with
    /// `minimize`/`maximize` the extreme-valued match wins.
    pub fn get_service(
        &self,
        protocol: impl Into<ProtocolId>,
        query: &ServiceQuery,
    ) -> Result<Option<ServiceObject>> {
        Ok(self.get_services(protocol, query)?.into_iter().next())
    }

    /// Every service matching the protocol and query, in registration
    /// order; `minimize`/`maximize` reorder by the named property
    /// instead.
    pub fn get_services(
        &self,
        protocol: impl Into<ProtocolId>,
        query: &ServiceQuery,
    ) -> Result<Vec<ServiceObject>> {
        query.validate()?;
        let protocol = protocol.into();

        let mut matches: Vec<(ServiceObject, Option<Value>)> = Vec::new();
        let rank_property = query.minimize.as_deref().or(query.maximize.as_deref());
        {
            let tables = self.tables.lock();
            let Some(ids) = tables.by_capability.get(&protocol) else {
                return Ok(Vec::new());
            };
            for id in ids {
                let registration = &tables.services[id];
                let properties = registration.properties.read();
                if query.query.matches(&properties)? {
                    let rank = rank_property.and_then(|p| properties.get(p).cloned());
                    matches.push((registration.object.clone(), rank));
                }
            }
        }

        if rank_property.is_some() {
            matches = rank_matches(matches, query.maximize.is_some());
        }
        Ok(matches.into_iter().map(|(object, _)| object).collect())
    }

    /// Number of live registrations.
    pub fn len(&self) -> usize {
        self.tables.lock().services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.lock().services.is_empty()
    }
}

/// Stable-sort matches by their ranking value. Matches without an
/// orderable value (missing property, or a non-scalar) trail in
/// registration order.
fn rank_matches(
    matches: Vec<(ServiceObject, Option<Value>)>,
    descending: bool,
) -> Vec<(ServiceObject, Option<Value>)> {
    let mut ranked = Vec::new();
    let mut unranked = Vec::new();
    for entry in matches {
        let orderable = matches!(
            entry.1,
            Some(Value::Number(_)) | Some(Value::String(_)) | Some(Value::Bool(_))
        );
        if orderable {
            ranked.push(entry);
        } else {
            unranked.push(entry);
        }
    }

    ranked.sort_by(|a, b| {
        let ordering = match (&a.1, &b.1) {
            (Some(a), Some(b)) => compare_values(a, b).unwrap_or(std::cmp::Ordering::Equal),
            _ => std::cmp::Ordering::Equal,
        };
        if descending {
            ordering.reverse()
        } else {
            ordering
        }
    });

    ranked.extend(unranked);
    ranked
}
