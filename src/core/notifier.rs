/// In-process pub/sub for runtime events.
///
/// Handlers register per event kind and run in registration order.
/// Delivery is re-entrant: a handler may emit further events, register
/// new handlers, or unsubscribe handlers (including itself) mid-flight.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

use tracing::error;

use crate::core::event::{EventKind, RuntimeEvent};

/// Identifies one subscription. Returned by `on`/`once`, consumed by
/// `off`. Closures cannot be compared, so the id is the identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Rc<RefCell<dyn FnMut(&RuntimeEvent)>>;

struct Subscription {
    id: SubscriptionId,
    kind: EventKind,
    handler: Handler,
    once: bool,
}

struct Registry {
    subscriptions: Vec<Subscription>,
    next_id: u64,
}

/// Cloneable handle to a shared subscription registry. Every clone
/// delivers to the same subscribers.
#[derive(Clone)]
pub struct Notifier {
    registry: Rc<RefCell<Registry>>,
}

impl Notifier {
    pub fn new() -> Notifier {
        Notifier {
            registry: Rc::new(RefCell::new(Registry {
                subscriptions: Vec::new(),
                next_id: 1,
            })),
        }
    }

    /// Register a handler for one event kind.
    pub fn on<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&RuntimeEvent) + 'static,
    {
        self.register(kind, handler, false)
    }

    /// Register a handler that is removed after its first delivery.
    pub fn once<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: FnMut(&RuntimeEvent) + 'static,
    {
        self.register(kind, handler, true)
    }

    fn register<F>(&self, kind: EventKind, handler: F, once: bool) -> SubscriptionId
    where
        F: FnMut(&RuntimeEvent) + 'static,
    {
        let mut registry = self.registry.borrow_mut();
        let id = SubscriptionId(registry.next_id);
        registry.next_id += 1;
        registry.subscriptions.push(Subscription {
            id,
            kind,
            handler: Rc::new(RefCell::new(handler)),
            once,
        });
        id
    }

    /// Remove a subscription. Returns true if it was still registered.
    pub fn off(&self, id: SubscriptionId) -> bool {
        let mut registry = self.registry.borrow_mut();
        let before = registry.subscriptions.len();
        registry.subscriptions.retain(|s| s.id != id);
        registry.subscriptions.len() != before
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.registry.borrow_mut().subscriptions.clear();
    }

    /// Number of handlers currently registered for a kind.
    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.registry
            .borrow()
            .subscriptions
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }

    /// Deliver an event to every handler registered for its kind.
    ///
    /// The delivery list is snapshotted up front, so handlers registered
    /// during this emit wait for the next one. Each entry is re-checked
    /// against the registry right before it runs, so a handler removed
    /// mid-delivery stays silent. A panicking handler is reported and
    /// skipped without stopping the rest of the batch.
    pub fn emit(&self, event: &RuntimeEvent) {
        let kind = event.kind();
        let batch: Vec<(SubscriptionId, Handler, bool)> = {
            let registry = self.registry.borrow();
            registry
                .subscriptions
                .iter()
                .filter(|s| s.kind == kind)
                .map(|s| (s.id, Rc::clone(&s.handler), s.once))
                .collect()
        };

        for (id, handler, once) in batch {
            let still_registered = self
                .registry
                .borrow()
                .subscriptions
                .iter()
                .any(|s| s.id == id);
            if !still_registered {
                continue;
            }
            if once {
                self.off(id);
            }

            // The registry is not borrowed here, so the handler is free
            // to call back into this notifier.
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
                (handler.borrow_mut())(event);
            }));
            if let Err(payload) = outcome {
                error!(
                    "handler for {} panicked: {}",
                    kind.name(),
                    panic_message(payload.as_ref())
                );
            }
        }
    }
}

impl Default for Notifier {
    fn default() -> Notifier {
        Notifier::new()
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}
