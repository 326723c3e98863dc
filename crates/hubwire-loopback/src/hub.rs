use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use hubwire_core::{
    HubError, HubProxy, InvocationDescriptor, JsonSerializer, ProgressHandler, Subscription, Value,
};

use crate::{MethodContext, MethodHandler};

/// An in-process hub.
///
/// Invocations run locally registered methods, events are delivered straight
/// to local subscribers, and every invocation is recorded in order.
pub struct LoopbackHub {
    name: String,
    case_sensitive: bool,
    invoke_timeout: Option<Duration>,
    serializer: JsonSerializer,
    connected: AtomicBool,
    methods: RwLock<HashMap<String, MethodHandler>>,
    subscriptions: Mutex<HashMap<String, Subscription>>,
    state: RwLock<HashMap<String, Value>>,
    invocations: Mutex<Vec<InvocationDescriptor>>,
}

impl LoopbackHub {
    pub fn builder() -> LoopbackHubBuilder {
        LoopbackHubBuilder::default()
    }

    /// A hub with default settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self::builder().hub_name(name).build()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn key(&self, name: &str) -> String {
        if self.case_sensitive {
            name.to_owned()
        } else {
            name.to_ascii_lowercase()
        }
    }

    /// Registers an asynchronous hub method.
    pub fn method<F, Fut>(&self, name: &str, handler: F)
    where
        F: Fn(MethodContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, HubError>> + Send + 'static,
    {
        let handler: MethodHandler = Arc::new(move |ctx| Box::pin(handler(ctx)));
        self.methods
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.key(name), handler);
        tracing::debug!(hub = %self.name, method = name, "method registered");
    }

    /// Registers a hub method that completes immediately.
    pub fn method_fn<F>(&self, name: &str, handler: F)
    where
        F: Fn(&MethodContext) -> Result<Value, HubError> + Send + Sync + 'static,
    {
        let handler = Arc::new(handler);
        self.method(name, move |ctx| {
            let handler = Arc::clone(&handler);
            async move { handler(&ctx) }
        });
    }

    /// Pushes an event to local subscribers, as the remote hub would.
    pub fn push(&self, event: &str, args: Vec<Value>) {
        let subscription = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.key(event))
            .cloned();

        match subscription {
            Some(subscription) => subscription.on_received(&args),
            None => tracing::trace!(hub = %self.name, event, "no subscribers"),
        }
    }

    /// Live handler count for an event.
    pub fn handler_count(&self, event: &str) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.key(event))
            .map_or(0, Subscription::handler_count)
    }

    /// Number of events with a subscription entry.
    pub fn subscription_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Every invocation received so far, in arrival order.
    pub fn invocations(&self) -> Vec<InvocationDescriptor> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_invocations(&self) {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Simulates a dropped connection: later invocations fail with `Disconnected`.
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::Release);
        tracing::debug!(hub = %self.name, "disconnected");
    }

    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::Release);
    }

    async fn dispatch(
        &self,
        method: &str,
        progress: Option<ProgressHandler>,
        args: Vec<Value>,
    ) -> Result<Value, HubError> {
        self.invocations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(InvocationDescriptor::new(method, args.clone()));

        if !self.connected.load(Ordering::Acquire) {
            return Err(HubError::Disconnected);
        }

        let handler = {
            let methods = self.methods.read().unwrap_or_else(PoisonError::into_inner);
            methods.get(&self.key(method)).cloned()
        };
        let handler = handler.ok_or_else(|| HubError::MethodNotFound(method.to_owned()))?;

        tracing::debug!(hub = %self.name, method, args = args.len(), "invoking");
        let pending = handler(MethodContext::new(method, args, progress));

        match self.invoke_timeout {
            Some(limit) => tokio::time::timeout(limit, pending)
                .await
                .map_err(|_| HubError::Timeout(method.to_owned()))?,
            None => pending.await,
        }
    }
}

#[async_trait]
impl HubProxy for LoopbackHub {
    async fn invoke(&self, method: &str, args: Vec<Value>) -> Result<Value, HubError> {
        self.dispatch(method, None, args).await
    }

    async fn invoke_with_progress(
        &self,
        method: &str,
        on_progress: ProgressHandler,
        args: Vec<Value>,
    ) -> Result<Value, HubError> {
        self.dispatch(method, Some(on_progress), args).await
    }

    fn subscribe(&self, event: &str) -> Subscription {
        let mut subscriptions = self
            .subscriptions
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Entries only the map still refers to can never gain a handler again.
        subscriptions.retain(|_, subscription| !subscription.is_unused());
        subscriptions
            .entry(self.key(event))
            .or_insert_with(|| Subscription::new(event))
            .clone()
    }

    fn invoke_event(&self, event: &str, args: Vec<Value>) {
        self.push(event, args);
    }

    fn state(&self, name: &str) -> Option<Value> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&self.key(name))
            .cloned()
    }

    fn set_state(&self, name: &str, value: Value) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(self.key(name), value);
    }

    fn serializer(&self) -> &JsonSerializer {
        &self.serializer
    }
}

/// Builder for [`LoopbackHub`].
#[derive(Default)]
pub struct LoopbackHubBuilder {
    name: Option<String>,
    case_sensitive: bool,
    invoke_timeout: Option<Duration>,
    serializer: Option<JsonSerializer>,
}

impl LoopbackHubBuilder {
    /// Sets the hub name (default: "hub").
    pub fn hub_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Treat method, event and state names case sensitively (default: false).
    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.case_sensitive = case_sensitive;
        self
    }

    /// Fail invocations that take longer than `limit`.
    pub fn invoke_timeout(mut self, limit: Duration) -> Self {
        self.invoke_timeout = Some(limit);
        self
    }

    pub fn serializer(mut self, serializer: JsonSerializer) -> Self {
        self.serializer = Some(serializer);
        self
    }

    pub fn build(self) -> LoopbackHub {
        LoopbackHub {
            name: self.name.unwrap_or_else(|| "hub".to_string()),
            case_sensitive: self.case_sensitive,
            invoke_timeout: self.invoke_timeout,
            serializer: self.serializer.unwrap_or_default(),
            connected: AtomicBool::new(true),
            methods: RwLock::new(HashMap::new()),
            subscriptions: Mutex::new(HashMap::new()),
            state: RwLock::new(HashMap::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }
}
