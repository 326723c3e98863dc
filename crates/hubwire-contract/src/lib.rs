mod analyzer;
mod builder;
mod contract;
mod error;
mod expr;

pub use analyzer::{extract_invocation, extract_member_name};
pub use builder::{Arg, Call, MemberRef};
pub use contract::{Contract, ContractInfo, ContractKind, MemberInfo, validate};
pub use error::ContractError;
pub use expr::{BinaryOp, EvalError, Expr, Lambda, UnaryOp, evaluate};
