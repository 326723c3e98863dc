use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{HubError, JsonSerializer, Subscription};

/// Callback receiving raw progress updates of a long running invocation.
pub type ProgressHandler = Arc<dyn Fn(Value) + Send + Sync>;

/// The untyped, name based client proxy for a remote hub.
///
/// Implementations own the connection, the subscription table and the hub
/// state. Everything typed in hubwire is layered on top of this surface.
#[async_trait]
pub trait HubProxy: Send + Sync {
    /// Invokes a hub method by name and resolves with its raw result.
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, HubError>;

    /// Invokes a hub method, forwarding progress updates to `on_progress`.
    async fn invoke_with_progress(
        &self,
        method: &str,
        on_progress: ProgressHandler,
        args: Vec<Value>,
    ) -> Result<Value, HubError>;

    /// Returns the subscription point for an event, creating it on first use.
    fn subscribe(&self, event: &str) -> Subscription;

    /// Delivers an event to local subscribers as if the hub had pushed it.
    fn invoke_event(&self, event: &str, args: Vec<Value>);

    /// Reads a value from the hub state.
    fn state(&self, name: &str) -> Option<Value>;

    /// Writes a value into the hub state.
    fn set_state(&self, name: &str, value: Value);

    /// The serializer used by the connection.
    fn serializer(&self) -> &JsonSerializer;
}

/// Typed conveniences over any [`HubProxy`].
pub trait HubProxyExt: HubProxy {
    /// Invokes a hub method and decodes its result as `R`.
    fn invoke_as<'a, R>(
        &'a self,
        method: &'a str,
        args: Vec<Value>,
    ) -> BoxFuture<'a, Result<R, HubError>>
    where
        R: DeserializeOwned + Send + 'a,
    {
        Box::pin(async move {
            let value = self.invoke(method, args).await?;
            self.serializer().from_wire(value)
        })
    }

    /// Invokes a hub method with progress updates and decodes its result as `R`.
    fn invoke_as_with_progress<'a, R>(
        &'a self,
        method: &'a str,
        on_progress: ProgressHandler,
        args: Vec<Value>,
    ) -> BoxFuture<'a, Result<R, HubError>>
    where
        R: DeserializeOwned + Send + 'a,
    {
        Box::pin(async move {
            let value = self.invoke_with_progress(method, on_progress, args).await?;
            self.serializer().from_wire(value)
        })
    }
}

impl<P: HubProxy + ?Sized> HubProxyExt for P {}
