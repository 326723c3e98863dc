mod descriptor;
mod error;
pub mod extensions;
mod proxy;
mod serializer;
mod subscription;

pub use descriptor::{CallbackSignature, InvocationDescriptor, MAX_ARITY};
pub use error::{HandlerError, HubError};
pub use extensions::{ENTRY_POINTS, EntryPoint};
pub use proxy::{HubProxy, HubProxyExt, ProgressHandler};
pub use serializer::JsonSerializer;
pub use subscription::{EventHandler, Subscription, SubscriptionHandle};

/// The value type carried on the wire.
pub use serde_json::Value;
