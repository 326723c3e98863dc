//! Typed hub proxies.
//!
//! Declare what the hub exposes and what it raises as traits, then call and
//! subscribe through them instead of through method name strings:
//!
//! ```ignore
//! #[hubwire::contract(rename_all = "PascalCase")]
//! pub trait Calculator {
//!     fn add(&self, a: i32, b: i32) -> i32;
//! }
//!
//! let calc = TypedHubProxy::<dyn Calculator, dyn Notifications>::new(proxy)?;
//! let sum = calc.invoke(|s| s.add(2, 3))?.await?;
//! ```

extern crate self as hubwire;

mod callback;
mod dispatch;
mod error;
mod proxy;
pub mod telemetry;

pub use hubwire_contract as contract;
pub use hubwire_core as core;
pub use hubwire_macros::contract;

pub use callback::Callback;
pub use dispatch::ArityDispatcher;
pub use error::HubwireError;
pub use proxy::{InvokeFuture, TypedHubProxy};

pub use hubwire_contract::{Arg, Call, Contract, ContractError, MemberRef};
pub use hubwire_core::{HubError, HubProxy, JsonSerializer, SubscriptionHandle, Value};
