use serde_json::Value;

/// Largest callback arity the entry-point family covers.
pub const MAX_ARITY: usize = 7;

/// A resolved remote call: the wire name of a method and its evaluated arguments.
///
/// Arguments keep the declaration order of the method's formal parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct InvocationDescriptor {
    method: String,
    args: Vec<Value>,
}

impl InvocationDescriptor {
    pub fn new(method: impl Into<String>, args: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    pub fn arity(&self) -> usize {
        self.args.len()
    }

    pub fn into_parts(self) -> (String, Vec<Value>) {
        (self.method, self.args)
    }
}

/// The declared parameter types of an event callback, in order.
///
/// Only used to pick the matching entry point at registration time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackSignature {
    params: Vec<&'static str>,
}

impl CallbackSignature {
    pub fn new(params: Vec<&'static str>) -> Self {
        Self { params }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn params(&self) -> &[&'static str] {
        &self.params
    }
}

impl std::fmt::Display for CallbackSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({})", self.params.join(", "))
    }
}
