use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use futures::future::BoxFuture;
use hubwire_contract::{Call, Contract, ContractError, MemberRef, extract_invocation, extract_member_name};
use hubwire_core::{
    HubError, HubProxy, HubProxyExt, InvocationDescriptor, JsonSerializer, ProgressHandler,
    SubscriptionHandle, Value,
};
use serde::de::DeserializeOwned;

use crate::{ArityDispatcher, Callback};

/// The pending result of a hub invocation.
pub type InvokeFuture<R> = BoxFuture<'static, Result<R, HubError>>;

/// A statically typed view over an untyped [`HubProxy`].
///
/// `S` is the server contract (methods the hub exposes) and `C` the client
/// contract (events the hub raises). Both are `dyn Trait` for traits annotated
/// with [`contract`](crate::contract).
///
/// ```ignore
/// let chat = TypedHubProxy::<dyn ChatServer, dyn ChatClient>::new(proxy)?;
/// let joined: u32 = chat.invoke(|s| s.join("ana"))?.await?;
/// let _handle = chat.on(|c| c.message(), |user: String, text: String| {
///     println!("{user}: {text}");
/// })?;
/// ```
pub struct TypedHubProxy<S: ?Sized, C: ?Sized> {
    proxy: Arc<dyn HubProxy>,
    dispatcher: ArityDispatcher,
    _contracts: PhantomData<fn(&S, &C)>,
}

impl<S, C> TypedHubProxy<S, C>
where
    S: Contract + ?Sized,
    C: Contract + ?Sized,
{
    /// Wraps `proxy` after checking that both contracts are pure interfaces.
    pub fn new(proxy: Arc<dyn HubProxy>) -> Result<Self, ContractError> {
        hubwire_contract::validate::<S>()?;
        hubwire_contract::validate::<C>()?;

        tracing::debug!(
            server = S::info().name,
            client = C::info().name,
            "typed hub proxy created"
        );
        Ok(Self {
            proxy,
            dispatcher: ArityDispatcher::default(),
            _contracts: PhantomData,
        })
    }

    /// Replaces the entry point dispatcher used by [`on`](Self::on).
    pub fn with_dispatcher(mut self, dispatcher: ArityDispatcher) -> Self {
        self.dispatcher = dispatcher;
        self
    }

    /// The untyped proxy underneath.
    pub fn inner(&self) -> &Arc<dyn HubProxy> {
        &self.proxy
    }

    pub fn state(&self, name: &str) -> Option<Value> {
        self.proxy.state(name)
    }

    pub fn set_state(&self, name: &str, value: Value) {
        self.proxy.set_state(name, value);
    }

    pub fn serializer(&self) -> &JsonSerializer {
        self.proxy.serializer()
    }

    fn server_call<R>(&self, call: Call<R>) -> Result<InvocationDescriptor, ContractError> {
        let descriptor = extract_invocation(Some(call.lambda()))?;
        S::info().check_invocation(&descriptor)?;
        Ok(descriptor)
    }

    /// Invokes a server method and decodes its result as `R`.
    ///
    /// The expression is analyzed before this returns; hub failures arrive
    /// through the future.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn invoke<R>(
        &self,
        call: impl FnOnce(&S::Calls) -> Call<R>,
    ) -> Result<InvokeFuture<R>, ContractError>
    where
        R: DeserializeOwned + Send + 'static,
    {
        let (method, args) = self.server_call(call(&S::Calls::default()))?.into_parts();
        tracing::debug!(method = %method, args = args.len(), "invoke");

        let proxy = Arc::clone(&self.proxy);
        Ok(Box::pin(async move { proxy.invoke_as::<R>(&method, args).await }))
    }

    /// Invokes a server method, discarding whatever it returns.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn send<R>(
        &self,
        call: impl FnOnce(&S::Calls) -> Call<R>,
    ) -> Result<InvokeFuture<()>, ContractError> {
        let (method, args) = self.server_call(call(&S::Calls::default()))?.into_parts();
        tracing::debug!(method = %method, args = args.len(), "send");

        let proxy = Arc::clone(&self.proxy);
        Ok(Box::pin(async move {
            proxy.invoke(&method, args).await.map(|_| ())
        }))
    }

    /// Like [`invoke`](Self::invoke), reporting progress updates decoded as `P`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn invoke_with_progress<R, P>(
        &self,
        call: impl FnOnce(&S::Calls) -> Call<R>,
        on_progress: impl Fn(P) + Send + Sync + 'static,
    ) -> Result<InvokeFuture<R>, ContractError>
    where
        R: DeserializeOwned + Send + 'static,
        P: DeserializeOwned + 'static,
    {
        let (method, args) = self.server_call(call(&S::Calls::default()))?.into_parts();
        let progress = self.progress_handler(&method, on_progress);
        tracing::debug!(method = %method, args = args.len(), "invoke with progress");

        let proxy = Arc::clone(&self.proxy);
        Ok(Box::pin(async move {
            proxy
                .invoke_as_with_progress::<R>(&method, progress, args)
                .await
        }))
    }

    /// Like [`send`](Self::send), reporting progress updates decoded as `P`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn send_with_progress<R, P>(
        &self,
        call: impl FnOnce(&S::Calls) -> Call<R>,
        on_progress: impl Fn(P) + Send + Sync + 'static,
    ) -> Result<InvokeFuture<()>, ContractError>
    where
        P: DeserializeOwned + 'static,
    {
        let (method, args) = self.server_call(call(&S::Calls::default()))?.into_parts();
        let progress = self.progress_handler(&method, on_progress);
        tracing::debug!(method = %method, args = args.len(), "send with progress");

        let proxy = Arc::clone(&self.proxy);
        Ok(Box::pin(async move {
            proxy
                .invoke_with_progress(&method, progress, args)
                .await
                .map(|_| ())
        }))
    }

    fn progress_handler<P>(
        &self,
        method: &str,
        on_progress: impl Fn(P) + Send + Sync + 'static,
    ) -> ProgressHandler
    where
        P: DeserializeOwned + 'static,
    {
        let serializer = self.proxy.serializer().clone();
        let method = method.to_owned();
        Arc::new(move |value: Value| match serializer.from_wire::<P>(value) {
            Ok(update) => on_progress(update),
            Err(err) => {
                tracing::warn!(method = %method, error = %err, "skipping undecodable progress update")
            }
        })
    }

    /// Raises a client event locally, as if the hub had pushed it.
    ///
    /// Arguments go through the serializer's wire conversion first.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn raise_client_event<R>(
        &self,
        call: impl FnOnce(&C::Calls) -> Call<R>,
    ) -> Result<(), ContractError> {
        let descriptor = extract_invocation(Some(call(&C::Calls::default()).lambda()))?;
        C::info().check_invocation(&descriptor)?;

        let (event, args) = descriptor.into_parts();
        let serializer = self.proxy.serializer();
        let args: Vec<Value> = args
            .into_iter()
            .map(|value| serializer.normalize(value))
            .collect();

        tracing::debug!(event = %event, args = args.len(), "raising client event");
        self.proxy.invoke_event(&event, args);
        Ok(())
    }

    /// Subscribes `callback` to a client event.
    ///
    /// The returned handle deregisters the callback when disposed or dropped.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn on<A, F>(
        &self,
        member: impl FnOnce(&C::Members) -> MemberRef<A>,
        callback: F,
    ) -> Result<SubscriptionHandle, ContractError>
    where
        F: Callback<A>,
    {
        let reference = member(&C::Members::default());
        let event = extract_member_name(Some(reference.lambda()))?;
        let info = C::info().check_member(&event)?;

        let signature = F::signature();
        if info.params.len() != signature.arity() {
            return Err(ContractError::InvalidExpressionShape(format!(
                "{}.{} raises {} values, the callback takes {}",
                C::info().name,
                info.wire_name,
                info.params.len(),
                signature.arity()
            )));
        }

        let handler = callback.into_handler(self.proxy.serializer().clone());
        self.dispatcher
            .register(self.proxy.as_ref(), &event, &signature, handler)
    }
}

impl<S: ?Sized, C: ?Sized> Clone for TypedHubProxy<S, C> {
    fn clone(&self) -> Self {
        Self {
            proxy: Arc::clone(&self.proxy),
            dispatcher: self.dispatcher,
            _contracts: PhantomData,
        }
    }
}

impl<S: ?Sized, C: ?Sized> fmt::Debug for TypedHubProxy<S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedHubProxy")
            .field("dispatcher", &self.dispatcher)
            .finish_non_exhaustive()
    }
}
