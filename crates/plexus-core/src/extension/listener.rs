//! Change notification for extension points.
//!
//! Listeners subscribe to one extension point or to all of them. The
//! registry holds each subscription weakly: subscribing does not keep
//! the subscriber alive, and a subscriber that has been dropped is
//! pruned instead of invoked.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use crate::extension::Extension;

/// A change to one extension point's contribution sequence.
///
/// For additions `index` is the position the new items were appended
/// at; removals and wholesale replacement carry no index.
#[derive(Debug, Clone)]
pub struct ExtensionEvent {
    pub extension_point_id: String,
    pub added: Vec<Extension>,
    pub removed: Vec<Extension>,
    pub index: Option<usize>,
}

/// Callback interface for extension point changes.
///
/// Listeners run synchronously on the mutating thread, strictly after
/// the registry lock has been released, so a listener may call back
/// into the registry without deadlocking. A returned error is logged
/// and does not affect the committed mutation or later listeners.
pub trait ExtensionListener: Send + Sync {
    fn extensions_changed(&self, event: &ExtensionEvent) -> anyhow::Result<()>;
}

struct Subscription {
    seq: u64,
    listener: Weak<dyn ExtensionListener>,
}

impl Subscription {
    fn is_for(&self, listener: &Arc<dyn ExtensionListener>) -> bool {
        // Identity is the allocation the subscriber handed us, not the
        // (possibly fat) vtable pointer.
        std::ptr::eq(
            self.listener.as_ptr() as *const (),
            Arc::as_ptr(listener) as *const (),
        )
    }
}

/// Ordered, weakly-held listener subscriptions.
///
/// Owned by the extension registry and guarded by its lock; `snapshot`
/// is the only operation the mutators call while holding that lock.
#[derive(Default)]
pub struct ListenerRegistry {
    by_point: HashMap<String, Vec<Subscription>>,
    wildcard: Vec<Subscription>,
    next_seq: u64,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to changes of `point_id`, or to every point when
    /// `point_id` is `None`.
    pub fn subscribe(&mut self, listener: &Arc<dyn ExtensionListener>, point_id: Option<&str>) {
        let subscription = Subscription {
            seq: self.next_seq,
            listener: Arc::downgrade(listener),
        };
        self.next_seq += 1;
        match point_id {
            Some(id) => self.by_point.entry(id.to_string()).or_default().push(subscription),
            None => self.wildcard.push(subscription),
        }
    }

    /// Drop the first live subscription matching the listener and
    /// filter. Unsubscribing something never subscribed is a no-op.
    pub fn unsubscribe(&mut self, listener: &Arc<dyn ExtensionListener>, point_id: Option<&str>) {
        let subscriptions = match point_id {
            Some(id) => match self.by_point.get_mut(id) {
                Some(subscriptions) => subscriptions,
                None => return,
            },
            None => &mut self.wildcard,
        };
        if let Some(pos) = subscriptions.iter().position(|s| s.is_for(listener)) {
            subscriptions.remove(pos);
        }
    }

    /// Live listeners for `point_id` plus all wildcard listeners, in
    /// global subscription order. Dead subscriptions are pruned.
    pub fn snapshot(&mut self, point_id: &str) -> Vec<Arc<dyn ExtensionListener>> {
        let mut live: Vec<(u64, Arc<dyn ExtensionListener>)> = Vec::new();

        let mut collect = |subscriptions: &mut Vec<Subscription>| {
            subscriptions.retain(|s| match s.listener.upgrade() {
                Some(listener) => {
                    live.push((s.seq, listener));
                    true
                }
                None => false,
            });
        };

        if let Some(subscriptions) = self.by_point.get_mut(point_id) {
            collect(subscriptions);
        }
        collect(&mut self.wildcard);

        live.sort_by_key(|(seq, _)| *seq);
        live.into_iter().map(|(_, listener)| listener).collect()
    }
}

/// Invoke a snapshot of listeners, isolating failures per listener: an
/// error or panic is logged and the remaining listeners still run.
pub(crate) fn notify_listeners(listeners: &[Arc<dyn ExtensionListener>], event: &ExtensionEvent) {
    for listener in listeners {
        match catch_unwind(AssertUnwindSafe(|| listener.extensions_changed(event))) {
            Ok(Ok(())) => {}
            Ok(Err(error)) => {
                tracing::warn!(
                    extension_point = %event.extension_point_id,
                    %error,
                    "extension listener failed"
                );
            }
            Err(_) => {
                tracing::warn!(
                    extension_point = %event.extension_point_id,
                    "extension listener panicked"
                );
            }
        }
    }
}
