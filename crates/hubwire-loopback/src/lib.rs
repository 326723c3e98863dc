mod hub;
mod method;

pub use hub::{LoopbackHub, LoopbackHubBuilder};
pub use method::{MethodContext, MethodHandler};
