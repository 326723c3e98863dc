use thiserror::Error;

/// Failures reported by an untyped hub proxy.
///
/// These only ever travel through the asynchronous result of an invocation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum HubError {
    /// The remote hub method raised an error.
    #[error("Remote invocation of '{method}' failed: {message}")]
    Remote { method: String, message: String },

    /// The hub has no method with this name.
    #[error("Hub method '{0}' not found")]
    MethodNotFound(String),

    /// The invocation did not complete in time.
    #[error("Invocation of '{0}' timed out")]
    Timeout(String),

    /// The underlying connection failed.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The connection is not started or was closed.
    #[error("Connection is disconnected")]
    Disconnected,

    /// A value could not be converted to or from its wire form.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for HubError {
    fn from(err: serde_json::Error) -> Self {
        HubError::Serialization(err.to_string())
    }
}

/// Failure while delivering an event payload to a registered handler.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandlerError {
    /// The payload carried fewer values than the handler declares.
    #[error("Expected {expected} event arguments, received {received}")]
    MissingArguments { expected: usize, received: usize },

    /// A payload value could not be decoded into the declared parameter type.
    #[error("Event argument {index} could not be decoded as {type_name}: {reason}")]
    Decode {
        index: usize,
        type_name: &'static str,
        reason: String,
    },
}
