//! Arity specific event registration entry points.
//!
//! A hub proxy only knows raw payloads. Each entry point here binds a handler
//! of a fixed parameter count to a proxy subscription, rejecting deliveries
//! that carry fewer values than the handler declares. Trailing extra values
//! are ignored.

use std::sync::Arc;

use serde_json::Value;

use crate::{EventHandler, HandlerError, HubProxy, MAX_ARITY, SubscriptionHandle};

/// A handler that receives exactly the number of values its entry point admits.
pub type ArityHandler = Arc<dyn Fn(&[Value]) -> Result<(), HandlerError> + Send + Sync>;

/// Signature shared by every registration entry point.
pub type RegisterFn = fn(&dyn HubProxy, &str, ArityHandler) -> SubscriptionHandle;

/// A registration entry point for handlers of one arity.
#[derive(Clone, Copy)]
pub struct EntryPoint {
    pub arity: usize,
    pub register: RegisterFn,
}

impl std::fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryPoint").field("arity", &self.arity).finish()
    }
}

/// The complete family, indexed by arity.
pub static ENTRY_POINTS: [EntryPoint; MAX_ARITY + 1] = [
    EntryPoint { arity: 0, register: on_arity::<0> },
    EntryPoint { arity: 1, register: on_arity::<1> },
    EntryPoint { arity: 2, register: on_arity::<2> },
    EntryPoint { arity: 3, register: on_arity::<3> },
    EntryPoint { arity: 4, register: on_arity::<4> },
    EntryPoint { arity: 5, register: on_arity::<5> },
    EntryPoint { arity: 6, register: on_arity::<6> },
    EntryPoint { arity: 7, register: on_arity::<7> },
];

/// Registers `handler` for `event`, admitting payloads of at least `N` values.
pub fn on_arity<const N: usize>(
    proxy: &dyn HubProxy,
    event: &str,
    handler: ArityHandler,
) -> SubscriptionHandle {
    let subscription = proxy.subscribe(event);
    let event_name = event.to_owned();

    let bound: EventHandler = Arc::new(move |args: &[Value]| {
        if args.len() < N {
            let err = HandlerError::MissingArguments {
                expected: N,
                received: args.len(),
            };
            tracing::warn!(event = %event_name, error = %err, "dropping event");
            return;
        }
        if let Err(err) = handler(&args[..N]) {
            tracing::warn!(event = %event_name, error = %err, "event handler rejected payload");
        }
    });

    tracing::debug!(event, arity = N, "binding event handler");
    subscription.add_handler(bound)
}
