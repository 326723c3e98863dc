use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use serde_json::Value;

/// A raw event handler receiving the payload values of one delivery.
pub type EventHandler = Arc<dyn Fn(&[Value]) + Send + Sync>;

static NEXT_SLOT_ID: AtomicU64 = AtomicU64::new(1);

thread_local! {
    /// Slots whose handler is currently running on this thread.
    static RUNNING: RefCell<Vec<u64>> = const { RefCell::new(Vec::new()) };
}

fn running_here(id: u64) -> bool {
    RUNNING.with(|running| running.borrow().contains(&id))
}

fn running_any() -> bool {
    RUNNING.with(|running| !running.borrow().is_empty())
}

struct RunningGuard(u64);

impl RunningGuard {
    fn enter(id: u64) -> Self {
        RUNNING.with(|running| running.borrow_mut().push(id));
        Self(id)
    }
}

impl Drop for RunningGuard {
    fn drop(&mut self) {
        RUNNING.with(|running| {
            let mut running = running.borrow_mut();
            if let Some(pos) = running.iter().rposition(|id| *id == self.0) {
                running.remove(pos);
            }
        });
    }
}

/// One registered handler.
///
/// `gate` is read-held for the duration of every run; disposal clears `live`
/// and then write-acquires the gate, so it returns only once in-flight runs
/// on other threads have drained. A thread that is itself inside a handler
/// never waits on a gate: two handlers disposing each other would block
/// forever.
struct HandlerSlot {
    id: u64,
    handler: EventHandler,
    live: AtomicBool,
    gate: RwLock<()>,
}

impl HandlerSlot {
    fn run(&self, args: &[Value]) {
        if running_here(self.id) {
            // Re-entrant delivery, the gate is already held by this thread.
            if self.live.load(Ordering::Acquire) {
                (self.handler)(args);
            }
            return;
        }

        let _gate = self.gate.read().unwrap_or_else(PoisonError::into_inner);
        if !self.live.load(Ordering::Acquire) {
            return;
        }
        let _running = RunningGuard::enter(self.id);
        (self.handler)(args);
    }

    fn retire(&self) {
        self.live.store(false, Ordering::Release);
        if !running_any() {
            drop(self.gate.write().unwrap_or_else(PoisonError::into_inner));
        }
    }
}

struct Inner {
    event: String,
    slots: RwLock<Vec<Arc<HandlerSlot>>>,
}

/// The registration point of one hub event.
///
/// A subscription fans each received payload out to every live handler.
/// Cloning is cheap and clones share the same handler list.
#[derive(Clone)]
pub struct Subscription {
    inner: Arc<Inner>,
}

impl Subscription {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                event: event.into(),
                slots: RwLock::new(Vec::new()),
            }),
        }
    }

    /// The event name this subscription was created for.
    pub fn event(&self) -> &str {
        &self.inner.event
    }

    /// Number of live handlers.
    pub fn handler_count(&self) -> usize {
        self.inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// True when no handle and no other clone refers to this subscription.
    pub fn is_unused(&self) -> bool {
        Arc::strong_count(&self.inner) == 1
    }

    /// Registers a handler and returns the handle that removes it again.
    pub fn add_handler(&self, handler: EventHandler) -> SubscriptionHandle {
        let slot = Arc::new(HandlerSlot {
            id: NEXT_SLOT_ID.fetch_add(1, Ordering::Relaxed),
            handler,
            live: AtomicBool::new(true),
            gate: RwLock::new(()),
        });

        self.inner
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::clone(&slot));

        tracing::trace!(event = %self.inner.event, slot = slot.id, "handler added");

        SubscriptionHandle {
            subscription: self.clone(),
            slot,
            disposed: AtomicBool::new(false),
        }
    }

    /// Delivers one payload to every live handler.
    pub fn on_received(&self, args: &[Value]) {
        let snapshot: Vec<Arc<HandlerSlot>> = self
            .inner
            .slots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tracing::trace!(
            event = %self.inner.event,
            handlers = snapshot.len(),
            args = args.len(),
            "event received"
        );

        for slot in snapshot {
            slot.run(args);
        }
    }

    fn remove(&self, id: u64) {
        self.inner
            .slots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|slot| slot.id != id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("event", &self.inner.event)
            .field("handlers", &self.handler_count())
            .finish()
    }
}

/// A live event registration owned by the caller.
///
/// Disposing the handle (explicitly or by dropping it) removes the handler
/// exactly once. After `dispose` returns no new run of the handler starts.
/// Called from outside any handler, `dispose` also waits for runs already in
/// flight on other threads. Called from inside a handler (this one or any
/// other), it does not wait, so a run that started before the call may still
/// be finishing elsewhere.
#[must_use = "dropping the handle removes the event handler"]
pub struct SubscriptionHandle {
    subscription: Subscription,
    slot: Arc<HandlerSlot>,
    disposed: AtomicBool,
}

impl SubscriptionHandle {
    /// The event this handle is registered for.
    pub fn event(&self) -> &str {
        self.subscription.event()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// Removes the handler. Calling it again has no effect.
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        self.subscription.remove(self.slot.id);
        self.slot.retire();
        tracing::trace!(event = %self.subscription.event(), slot = self.slot.id, "handler disposed");
    }
}

impl Drop for SubscriptionHandle {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle")
            .field("event", &self.event())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}
