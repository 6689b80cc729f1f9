//! The in-memory extension registry.
//!
//! One mutex guards the declared points, the contribution sequences,
//! and the listener table, so every mutation observes a single
//! consistent state. The lock is held across the in-memory change and
//! the listener snapshot only; listeners run after the lock is
//! released, so a listener may call straight back into the registry.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::{RegistryError, Result};
use crate::extension::listener::{notify_listeners, ExtensionEvent, ExtensionListener, ListenerRegistry};
use crate::extension::point::{ExtensionPoint, ExtensionPointRegistry};
use crate::extension::types::Extension;
use crate::extension::{ExtensionRegistry, MutableExtensionRegistry};

#[derive(Default)]
struct Inner {
    points: ExtensionPointRegistry,
    contributions: HashMap<String, Vec<Extension>>,
    listeners: ListenerRegistry,
}

/// Process-local extension registry.
///
/// Constructed explicitly at application start and handed by reference
/// (usually inside an `Arc`) to every component that declares points
/// or contributes to them; there is no ambient global instance.
#[derive(Default)]
pub struct InMemoryExtensionRegistry {
    inner: Mutex<Inner>,
}

impl InMemoryExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ExtensionRegistry for InMemoryExtensionRegistry {
    fn get_extensions(&self, extension_point_id: &str) -> Vec<Extension> {
        let inner = self.inner.lock();
        inner
            .contributions
            .get(extension_point_id)
            .cloned()
            .unwrap_or_default()
    }

    fn get_extension_point(&self, extension_point_id: &str) -> Option<ExtensionPoint> {
        self.inner.lock().points.get(extension_point_id).cloned()
    }

    fn extension_point_ids(&self) -> Vec<String> {
        self.inner.lock().points.ids()
    }

    fn add_listener(
        &self,
        listener: &Arc<dyn ExtensionListener>,
        extension_point_id: Option<&str>,
    ) {
        self.inner.lock().listeners.subscribe(listener, extension_point_id);
    }

    fn remove_listener(
        &self,
        listener: &Arc<dyn ExtensionListener>,
        extension_point_id: Option<&str>,
    ) {
        self.inner.lock().listeners.unsubscribe(listener, extension_point_id);
    }
}

impl MutableExtensionRegistry for InMemoryExtensionRegistry {
    fn add_extension_point(&self, point: ExtensionPoint) {
        self.inner.lock().points.declare(point);
    }

    fn add_extensions(&self, extension_point_id: &str, extensions: Vec<Extension>) -> Result<()> {
        let (snapshot, index) = {
            let mut inner = self.inner.lock();
            inner.points.check(extension_point_id)?;

            let sequence = inner
                .contributions
                .entry(extension_point_id.to_string())
                .or_default();
            let index = sequence.len();
            sequence.extend(extensions.iter().cloned());

            (inner.listeners.snapshot(extension_point_id), index)
        };

        tracing::debug!(
            extension_point = extension_point_id,
            count = extensions.len(),
            index,
            "added extensions"
        );
        notify_listeners(
            &snapshot,
            &ExtensionEvent {
                extension_point_id: extension_point_id.to_string(),
                added: extensions,
                removed: Vec::new(),
                index: Some(index),
            },
        );
        Ok(())
    }

    fn remove_extensions(&self, extension_point_id: &str, extensions: &[Extension]) -> Result<()> {
        let snapshot = {
            let mut inner = self.inner.lock();
            inner.points.check(extension_point_id)?;

            // Items removed before an unknown one stay removed; the
            // error path fires no change event.
            for extension in extensions {
                let sequence = inner
                    .contributions
                    .entry(extension_point_id.to_string())
                    .or_default();
                match sequence.iter().position(|e| e == extension) {
                    Some(position) => {
                        sequence.remove(position);
                    }
                    None => {
                        return Err(RegistryError::UnknownExtension {
                            extension_point_id: extension_point_id.to_string(),
                            extension: extension.clone(),
                        });
                    }
                }
            }

            inner.listeners.snapshot(extension_point_id)
        };

        tracing::debug!(
            extension_point = extension_point_id,
            count = extensions.len(),
            "removed extensions"
        );
        notify_listeners(
            &snapshot,
            &ExtensionEvent {
                extension_point_id: extension_point_id.to_string(),
                added: Vec::new(),
                removed: extensions.to_vec(),
                index: None,
            },
        );
        Ok(())
    }

    fn set_extensions(&self, extension_point_id: &str, extensions: Vec<Extension>) -> Result<()> {
        let (snapshot, old) = {
            let mut inner = self.inner.lock();
            inner.points.check(extension_point_id)?;

            let old = inner
                .contributions
                .insert(extension_point_id.to_string(), extensions.clone())
                .unwrap_or_default();

            (inner.listeners.snapshot(extension_point_id), old)
        };

        tracing::debug!(
            extension_point = extension_point_id,
            count = extensions.len(),
            "replaced extensions"
        );
        notify_listeners(
            &snapshot,
            &ExtensionEvent {
                extension_point_id: extension_point_id.to_string(),
                added: extensions,
                removed: old,
                index: None,
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex as PlMutex;
    use serde_json::json;

    fn registry_with_point(id: &str) -> InMemoryExtensionRegistry {
        let registry = InMemoryExtensionRegistry::new();
        registry.add_extension_point(ExtensionPoint::new(id, "test point"));
        registry
    }

    fn ext(value: impl Into<serde_json::Value>) -> Extension {
        Extension::new(value)
    }

    struct Recorder {
        events: PlMutex<Vec<ExtensionEvent>>,
    }

    impl Recorder {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                events: PlMutex::new(Vec::new()),
            })
        }

        fn events(&self) -> Vec<ExtensionEvent> {
            self.events.lock().clone()
        }
    }

    impl ExtensionListener for Recorder {
        fn extensions_changed(&self, event: &ExtensionEvent) -> anyhow::Result<()> {
            self.events.lock().push(event.clone());
            Ok(())
        }
    }

    #[test]
    fn test_add_preserves_contribution_order() {
        let registry = registry_with_point("app.menus");

        registry
            .add_extensions("app.menus", vec![ext("a"), ext("b")])
            .unwrap();
        registry.add_extension("app.menus", ext("c")).unwrap();

        assert_eq!(
            registry.get_extensions("app.menus"),
            vec![ext("a"), ext("b"), ext("c")]
        );
    }

    #[test]
    fn test_remove_shifts_nothing_else() {
        let registry = registry_with_point("app.menus");
        registry
            .add_extensions("app.menus", vec![ext("a"), ext("b"), ext("c")])
            .unwrap();

        registry.remove_extension("app.menus", &ext("b")).unwrap();

        assert_eq!(
            registry.get_extensions("app.menus"),
            vec![ext("a"), ext("c")]
        );
    }

    #[test]
    fn test_set_then_get_round_trips() {
        let registry = registry_with_point("app.toolbar");
        let items = vec![ext(json!({"order": 1})), ext(json!({"order": 2}))];

        registry.set_extensions("app.toolbar", items.clone()).unwrap();

        assert_eq!(registry.get_extensions("app.toolbar"), items);
    }

    #[test]
    fn test_unknown_point_fails_every_mutator() {
        let registry = InMemoryExtensionRegistry::new();

        let unknown = |r: Result<()>| {
            assert!(matches!(
                r.unwrap_err(),
                RegistryError::UnknownExtensionPoint(id) if id == "missing"
            ));
        };

        unknown(registry.add_extension("missing", ext(1)));
        unknown(registry.add_extensions("missing", vec![ext(1)]));
        unknown(registry.remove_extension("missing", &ext(1)));
        unknown(registry.set_extensions("missing", vec![ext(1)]));
    }

    #[test]
    fn test_reading_an_undeclared_point_is_empty_not_an_error() {
        let registry = InMemoryExtensionRegistry::new();
        assert!(registry.get_extensions("missing").is_empty());
        assert!(registry.get_extension_point("missing").is_none());
    }

    #[test]
    fn test_remove_of_absent_extension_leaves_sequence_unchanged() {
        let registry = registry_with_point("app.menus");
        registry
            .add_extensions("app.menus", vec![ext("a"), ext("b")])
            .unwrap();

        let err = registry
            .remove_extension("app.menus", &ext("z"))
            .unwrap_err();

        assert!(matches!(
            err,
            RegistryError::UnknownExtension { extension_point_id, extension }
                if extension_point_id == "app.menus" && extension == ext("z")
        ));
        assert_eq!(
            registry.get_extensions("app.menus"),
            vec![ext("a"), ext("b")]
        );
    }

    #[test]
    fn test_failed_batch_removal_keeps_earlier_removals() {
        let registry = registry_with_point("app.menus");
        registry
            .add_extensions("app.menus", vec![ext("a"), ext("b"), ext("c")])
            .unwrap();

        let err = registry
            .remove_extensions("app.menus", &[ext("a"), ext("z"), ext("c")])
            .unwrap_err();

        assert!(matches!(err, RegistryError::UnknownExtension { .. }));
        // "a" was processed before the failure and stays removed.
        assert_eq!(
            registry.get_extensions("app.menus"),
            vec![ext("b"), ext("c")]
        );
    }

    #[test]
    fn test_listener_sees_add_with_insertion_index() {
        let registry = registry_with_point("app.menus");
        let recorder = Recorder::new();
        let listener: Arc<dyn ExtensionListener> = recorder.clone();
        registry.add_listener(&listener, Some("app.menus"));

        registry.add_extension("app.menus", ext("x")).unwrap();

        let events = recorder.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].extension_point_id, "app.menus");
        assert_eq!(events[0].added, vec![ext("x")]);
        assert!(events[0].removed.is_empty());
        assert_eq!(events[0].index, Some(0));
    }

    #[test]
    fn test_insertion_index_is_the_old_length() {
        let registry = registry_with_point("app.menus");
        registry
            .add_extensions("app.menus", vec![ext("a"), ext("b")])
            .unwrap();

        let recorder = Recorder::new();
        let listener: Arc<dyn ExtensionListener> = recorder.clone();
        registry.add_listener(&listener, Some("app.menus"));

        registry
            .add_extensions("app.menus", vec![ext("c"), ext("d")])
            .unwrap();

        assert_eq!(recorder.events()[0].index, Some(2));
    }

    #[test]
    fn test_listener_on_other_point_receives_nothing() {
        let registry = registry_with_point("app.menus");
        registry.add_extension_point(ExtensionPoint::new("app.toolbar", ""));

        let recorder = Recorder::new();
        let listener: Arc<dyn ExtensionListener> = recorder.clone();
        registry.add_listener(&listener, Some("app.toolbar"));

        registry.add_extension("app.menus", ext("x")).unwrap();

        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_wildcard_listener_sees_every_point() {
        let registry = registry_with_point("app.menus");
        registry.add_extension_point(ExtensionPoint::new("app.toolbar", ""));

        let recorder = Recorder::new();
        let listener: Arc<dyn ExtensionListener> = recorder.clone();
        registry.add_listener(&listener, None);

        registry.add_extension("app.menus", ext("x")).unwrap();
        registry.add_extension("app.toolbar", ext("y")).unwrap();

        let points: Vec<String> = recorder
            .events()
            .iter()
            .map(|e| e.extension_point_id.clone())
            .collect();
        assert_eq!(points, vec!["app.menus", "app.toolbar"]);
    }

    #[test]
    fn test_set_reports_old_sequence_as_removed() {
        let registry = registry_with_point("app.menus");
        registry
            .add_extensions("app.menus", vec![ext("a"), ext("b")])
            .unwrap();

        let recorder = Recorder::new();
        let listener: Arc<dyn ExtensionListener> = recorder.clone();
        registry.add_listener(&listener, Some("app.menus"));

        registry
            .set_extensions("app.menus", vec![ext("c")])
            .unwrap();

        let events = recorder.events();
        assert_eq!(events[0].added, vec![ext("c")]);
        assert_eq!(events[0].removed, vec![ext("a"), ext("b")]);
        assert_eq!(events[0].index, None);
    }

    #[test]
    fn test_removed_listener_is_no_longer_notified() {
        let registry = registry_with_point("app.menus");
        let recorder = Recorder::new();
        let listener: Arc<dyn ExtensionListener> = recorder.clone();

        registry.add_listener(&listener, Some("app.menus"));
        registry.add_extension("app.menus", ext("x")).unwrap();
        registry.remove_listener(&listener, Some("app.menus"));
        registry.add_extension("app.menus", ext("y")).unwrap();

        assert_eq!(recorder.events().len(), 1);
    }

    #[test]
    fn test_failed_mutation_fires_no_event() {
        let registry = registry_with_point("app.menus");
        registry.add_extension("app.menus", ext("a")).unwrap();

        let recorder = Recorder::new();
        let listener: Arc<dyn ExtensionListener> = recorder.clone();
        registry.add_listener(&listener, Some("app.menus"));

        let _ = registry.remove_extensions("app.menus", &[ext("a"), ext("z")]);

        assert!(recorder.events().is_empty());
    }

    #[test]
    fn test_listener_may_reenter_the_registry() {
        struct Reentrant {
            registry: Arc<InMemoryExtensionRegistry>,
            seen: PlMutex<Vec<usize>>,
        }

        impl ExtensionListener for Reentrant {
            fn extensions_changed(&self, event: &ExtensionEvent) -> anyhow::Result<()> {
                // Reading back from inside a notification must not
                // deadlock: the lock is already released.
                let current = self.registry.get_extensions(&event.extension_point_id);
                self.seen.lock().push(current.len());
                Ok(())
            }
        }

        let registry = Arc::new(InMemoryExtensionRegistry::new());
        registry.add_extension_point(ExtensionPoint::new("app.menus", ""));

        let reentrant = Arc::new(Reentrant {
            registry: registry.clone(),
            seen: PlMutex::new(Vec::new()),
        });
        let listener: Arc<dyn ExtensionListener> = reentrant.clone();
        registry.add_listener(&listener, Some("app.menus"));

        registry.add_extension("app.menus", ext("x")).unwrap();

        assert_eq!(*reentrant.seen.lock(), vec![1]);
    }

    #[test]
    fn test_dropped_listener_is_skipped() {
        let registry = registry_with_point("app.menus");
        {
            let transient = Recorder::new();
            let listener: Arc<dyn ExtensionListener> = transient.clone();
            registry.add_listener(&listener, Some("app.menus"));
        }

        // The subscriber is gone; the mutation must simply not call it.
        registry.add_extension("app.menus", ext("x")).unwrap();
        assert_eq!(registry.get_extensions("app.menus"), vec![ext("x")]);
    }
}
