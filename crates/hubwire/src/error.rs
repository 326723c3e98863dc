use thiserror::Error;

/// Unified error type for hubwire.
///
/// Aggregates the synchronous contract errors and the asynchronous hub errors
/// so `proxy.invoke(..)?.await?` works in one function.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HubwireError {
    /// The call or subscription was rejected before reaching the hub.
    #[error("Contract error: {0}")]
    Contract(#[from] hubwire_contract::ContractError),

    /// The hub or the connection failed.
    #[error("Hub error: {0}")]
    Hub(#[from] hubwire_core::HubError),
}
