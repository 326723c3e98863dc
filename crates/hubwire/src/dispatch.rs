use hubwire_contract::ContractError;
use hubwire_core::extensions::ArityHandler;
use hubwire_core::{CallbackSignature, ENTRY_POINTS, EntryPoint, HubProxy, MAX_ARITY, SubscriptionHandle};

/// Selects the registration entry point matching a callback's arity.
#[derive(Debug, Clone, Copy)]
pub struct ArityDispatcher {
    table: &'static [EntryPoint],
}

impl Default for ArityDispatcher {
    fn default() -> Self {
        Self::new(&ENTRY_POINTS)
    }
}

impl ArityDispatcher {
    /// A dispatcher over a custom entry point table.
    pub const fn new(table: &'static [EntryPoint]) -> Self {
        Self { table }
    }

    pub fn table(&self) -> &'static [EntryPoint] {
        self.table
    }

    /// Registers `handler` for `event` through the entry point whose arity
    /// equals the signature's parameter count.
    pub fn register(
        &self,
        proxy: &dyn HubProxy,
        event: &str,
        signature: &CallbackSignature,
        handler: ArityHandler,
    ) -> Result<SubscriptionHandle, ContractError> {
        let arity = signature.arity();
        if arity > MAX_ARITY {
            return Err(ContractError::UnsupportedArity {
                event: event.to_owned(),
                arity,
                max: MAX_ARITY,
            });
        }

        let entry = self
            .table
            .iter()
            .find(|entry| entry.arity == arity)
            .ok_or_else(|| ContractError::NoMatchingHandler {
                event: event.to_owned(),
                arity,
            })?;

        tracing::debug!(event, %signature, arity, "dispatching subscription");
        Ok((entry.register)(proxy, event, handler))
    }
}
