use thiserror::Error;

/// Errors raised by the typed layer itself.
///
/// All of them are reported synchronously, before any request reaches the hub.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// A contract type is not a pure capability interface.
    #[error("Contract type '{name}' is invalid: {reason}")]
    ContractTypeInvalid { name: String, reason: String },

    /// The expression does not denote exactly one qualifying member reference.
    #[error("Invalid expression shape: {0}")]
    InvalidExpressionShape(String),

    /// No expression was supplied.
    #[error("Expression is null")]
    NullExpression,

    /// An argument sub-expression could not be reduced to a value.
    #[error("Argument {index} of '{method}' could not be evaluated: {reason}")]
    ArgumentEvaluation {
        method: String,
        index: usize,
        reason: String,
    },

    /// The callback declares more parameters than the entry points cover.
    #[error("Callback for '{event}' takes {arity} parameters, at most {max} are supported")]
    UnsupportedArity {
        event: String,
        arity: usize,
        max: usize,
    },

    /// No registration entry point accepts the callback's arity.
    #[error("No registration entry point accepts {arity} parameters for '{event}'")]
    NoMatchingHandler { event: String, arity: usize },
}
