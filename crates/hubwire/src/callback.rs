//! Typed event callbacks.
//!
//! `Fn()` through `Fn(T1, .., T7)` implement [`Callback`] for the tuple of
//! their parameter types. The impl yields the parameter type names, used to
//! pick the registration entry point, and an erased handler that decodes each
//! payload value with the proxy's serializer before calling through.

use std::any::type_name;
use std::sync::Arc;

use hubwire_core::extensions::ArityHandler;
use hubwire_core::{CallbackSignature, HandlerError, JsonSerializer, Value};
use serde::de::DeserializeOwned;

/// A typed event callback taking the parameters `A` (a tuple).
pub trait Callback<A>: Send + Sync + 'static {
    /// Parameter type names, in order.
    fn signature() -> CallbackSignature;

    /// Erases the callback into a handler over raw payload values.
    fn into_handler(self, serializer: JsonSerializer) -> ArityHandler;
}

fn decode<T: DeserializeOwned>(
    serializer: &JsonSerializer,
    args: &[Value],
    index: usize,
) -> Result<T, HandlerError> {
    let value = args.get(index).ok_or(HandlerError::MissingArguments {
        expected: index + 1,
        received: args.len(),
    })?;
    serializer
        .from_wire(value.clone())
        .map_err(|err| HandlerError::Decode {
            index,
            type_name: type_name::<T>(),
            reason: err.to_string(),
        })
}

impl<F> Callback<()> for F
where
    F: Fn() + Send + Sync + 'static,
{
    fn signature() -> CallbackSignature {
        CallbackSignature::new(Vec::new())
    }

    fn into_handler(self, _serializer: JsonSerializer) -> ArityHandler {
        Arc::new(move |_args: &[Value]| -> Result<(), HandlerError> {
            self();
            Ok(())
        })
    }
}

macro_rules! impl_callback {
    ($($ty:ident $index:tt),+) => {
        impl<F, $($ty),+> Callback<($($ty,)+)> for F
        where
            F: Fn($($ty),+) + Send + Sync + 'static,
            $($ty: DeserializeOwned + 'static,)+
        {
            fn signature() -> CallbackSignature {
                CallbackSignature::new(vec![$(type_name::<$ty>()),+])
            }

            fn into_handler(self, serializer: JsonSerializer) -> ArityHandler {
                Arc::new(move |args: &[Value]| -> Result<(), HandlerError> {
                    self($(decode::<$ty>(&serializer, args, $index)?),+);
                    Ok(())
                })
            }
        }
    };
}

impl_callback!(T1 0);
impl_callback!(T1 0, T2 1);
impl_callback!(T1 0, T2 1, T3 2);
impl_callback!(T1 0, T2 1, T3 2, T4 3);
impl_callback!(T1 0, T2 1, T3 2, T4 3, T5 4);
impl_callback!(T1 0, T2 1, T3 2, T4 3, T5 4, T6 5);
impl_callback!(T1 0, T2 1, T3 2, T4 3, T5 4, T6 5, T7 6);
