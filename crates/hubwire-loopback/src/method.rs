use std::sync::Arc;

use futures::future::BoxFuture;
use hubwire_core::{HubError, ProgressHandler, Value};

/// A locally registered hub method.
pub type MethodHandler =
    Arc<dyn Fn(MethodContext) -> BoxFuture<'static, Result<Value, HubError>> + Send + Sync>;

/// What a hub method receives for one invocation.
pub struct MethodContext {
    method: String,
    args: Vec<Value>,
    progress: Option<ProgressHandler>,
}

impl MethodContext {
    pub(crate) fn new(method: &str, args: Vec<Value>, progress: Option<ProgressHandler>) -> Self {
        Self {
            method: method.to_owned(),
            args,
            progress,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn into_args(self) -> Vec<Value> {
        self.args
    }

    /// Returns argument `index`, or a remote error naming the missing position.
    pub fn arg(&self, index: usize) -> Result<&Value, HubError> {
        self.args.get(index).ok_or_else(|| HubError::Remote {
            method: self.method.clone(),
            message: format!("missing argument {index}"),
        })
    }

    /// Sends a progress update to the caller, if it asked for them.
    pub fn report_progress(&self, value: Value) {
        match &self.progress {
            Some(progress) => progress(value),
            None => tracing::trace!(method = %self.method, "progress dropped, caller not listening"),
        }
    }
}
