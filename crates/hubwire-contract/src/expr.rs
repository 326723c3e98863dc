//! The expression model used to describe calls on a contract.
//!
//! An [`Expr`] is a small tree: the contract parameter, constant and captured
//! values, member and index reads, collection constructors, operators and
//! calls. Argument trees are reduced to plain wire values by [`evaluate`].

use std::cmp::Ordering;
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
        };
        f.write_str(symbol)
    }
}

/// A node of a call expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// The contract instance the lambda receives.
    Parameter,
    /// A literal value.
    Constant(Value),
    /// A local variable captured at the call site.
    Captured { name: String, value: Value },
    /// A value that failed to serialize when it was captured.
    Unrepresentable(String),
    /// A field or property read.
    Member { target: Box<Expr>, name: String },
    /// An array element or object entry read.
    Index { target: Box<Expr>, index: Box<Expr> },
    /// A method call.
    Call {
        target: Box<Expr>,
        method: String,
        args: Vec<Expr>,
    },
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary { op: UnaryOp, operand: Box<Expr> },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

impl Expr {
    pub fn parameter() -> Self {
        Expr::Parameter
    }

    /// A literal. Values that cannot be serialized become [`Expr::Unrepresentable`].
    pub fn constant<T: Serialize + ?Sized>(value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Expr::Constant(value),
            Err(err) => Expr::Unrepresentable(err.to_string()),
        }
    }

    pub fn captured<T: Serialize + ?Sized>(name: impl Into<String>, value: &T) -> Self {
        match serde_json::to_value(value) {
            Ok(value) => Expr::Captured {
                name: name.into(),
                value,
            },
            Err(err) => Expr::Unrepresentable(err.to_string()),
        }
    }

    pub fn member(self, name: impl Into<String>) -> Self {
        Expr::Member {
            target: Box::new(self),
            name: name.into(),
        }
    }

    pub fn index(self, index: Expr) -> Self {
        Expr::Index {
            target: Box::new(self),
            index: Box::new(index),
        }
    }

    pub fn call(self, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            target: Box::new(self),
            method: method.into(),
            args,
        }
    }

    pub fn unary(op: UnaryOp, operand: Expr) -> Self {
        Expr::Unary {
            op,
            operand: Box::new(operand),
        }
    }

    pub fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn conditional(condition: Expr, then: Expr, otherwise: Expr) -> Self {
        Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        }
    }

    pub fn is_parameter(&self) -> bool {
        matches!(self, Expr::Parameter)
    }

    /// Short node name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Expr::Parameter => "parameter",
            Expr::Constant(_) => "constant",
            Expr::Captured { .. } => "captured value",
            Expr::Unrepresentable(_) => "unrepresentable value",
            Expr::Member { .. } => "member access",
            Expr::Index { .. } => "index access",
            Expr::Call { .. } => "call",
            Expr::Array(_) => "array",
            Expr::Object(_) => "object",
            Expr::Unary { .. } => "unary operation",
            Expr::Binary { .. } => "binary operation",
            Expr::Conditional { .. } => "conditional",
        }
    }

    /// Finds the first node that may not appear inside an argument:
    /// a reference to the contract parameter or any call.
    ///
    /// This is structural, so branches that evaluation would skip are checked too.
    pub(crate) fn argument_violation(&self) -> Option<EvalError> {
        match self {
            Expr::Parameter => Some(EvalError::ContractReference),
            Expr::Call { method, .. } => Some(EvalError::NestedCall(method.clone())),
            Expr::Constant(_) | Expr::Captured { .. } | Expr::Unrepresentable(_) => None,
            Expr::Member { target, .. } => target.argument_violation(),
            Expr::Index { target, index } => target
                .argument_violation()
                .or_else(|| index.argument_violation()),
            Expr::Array(items) => items.iter().find_map(Expr::argument_violation),
            Expr::Object(fields) => fields.iter().find_map(|(_, e)| e.argument_violation()),
            Expr::Unary { operand, .. } => operand.argument_violation(),
            Expr::Binary { lhs, rhs, .. } => {
                lhs.argument_violation().or_else(|| rhs.argument_violation())
            }
            Expr::Conditional {
                condition,
                then,
                otherwise,
            } => condition
                .argument_violation()
                .or_else(|| then.argument_violation())
                .or_else(|| otherwise.argument_violation()),
        }
    }
}

/// A single parameter lambda over a contract, `|c| body`.
#[derive(Debug, Clone, PartialEq)]
pub struct Lambda {
    body: Expr,
}

impl Lambda {
    pub fn new(body: Expr) -> Self {
        Self { body }
    }

    pub fn body(&self) -> &Expr {
        &self.body
    }

    pub fn into_body(self) -> Expr {
        self.body
    }
}

/// Why an expression could not be reduced to a value.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("expression refers to the contract parameter")]
    ContractReference,

    #[error("expression contains a nested call to '{0}'")]
    NestedCall(String),

    #[error("{0}")]
    Failed(String),
}

fn failed(message: impl Into<String>) -> EvalError {
    EvalError::Failed(message.into())
}

/// Reduces an argument expression to its value.
pub fn evaluate(expr: &Expr) -> Result<Value, EvalError> {
    match expr {
        Expr::Parameter => Err(EvalError::ContractReference),
        Expr::Constant(value) => Ok(value.clone()),
        Expr::Captured { value, .. } => Ok(value.clone()),
        Expr::Unrepresentable(reason) => Err(failed(reason.clone())),
        Expr::Member { target, name } => read_member(evaluate(target)?, name),
        Expr::Index { target, index } => {
            let target = evaluate(target)?;
            let index = evaluate(index)?;
            read_index(target, &index)
        }
        Expr::Call { method, .. } => Err(EvalError::NestedCall(method.clone())),
        Expr::Array(items) => items
            .iter()
            .map(evaluate)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        Expr::Object(fields) => {
            let mut map = Map::with_capacity(fields.len());
            for (key, field) in fields {
                map.insert(key.clone(), evaluate(field)?);
            }
            Ok(Value::Object(map))
        }
        Expr::Unary { op, operand } => apply_unary(*op, evaluate(operand)?),
        Expr::Binary {
            op: op @ (BinaryOp::And | BinaryOp::Or),
            lhs,
            rhs,
        } => {
            let left = expect_bool(&evaluate(lhs)?, *op)?;
            match (op, left) {
                (BinaryOp::And, false) => Ok(Value::Bool(false)),
                (BinaryOp::Or, true) => Ok(Value::Bool(true)),
                _ => apply_binary(*op, Value::Bool(left), evaluate(rhs)?),
            }
        }
        Expr::Binary { op, lhs, rhs } => apply_binary(*op, evaluate(lhs)?, evaluate(rhs)?),
        Expr::Conditional {
            condition,
            then,
            otherwise,
        } => match evaluate(condition)? {
            Value::Bool(true) => evaluate(then),
            Value::Bool(false) => evaluate(otherwise),
            other => Err(failed(format!(
                "conditional expects a boolean condition, found {}",
                type_name(&other)
            ))),
        },
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn expect_bool(value: &Value, op: BinaryOp) -> Result<bool, EvalError> {
    value.as_bool().ok_or_else(|| {
        failed(format!(
            "operator {op} expects booleans, found {}",
            type_name(value)
        ))
    })
}

fn read_member(target: Value, name: &str) -> Result<Value, EvalError> {
    match target {
        Value::Object(mut map) => map
            .remove(name)
            .ok_or_else(|| failed(format!("object has no member '{name}'"))),
        other => Err(failed(format!(
            "cannot read member '{name}' of {}",
            type_name(&other)
        ))),
    }
}

fn read_index(target: Value, index: &Value) -> Result<Value, EvalError> {
    match (target, index) {
        (Value::Array(mut items), Value::Number(n)) => {
            let len = items.len();
            match n.as_u64().and_then(|i| usize::try_from(i).ok()) {
                Some(i) if i < len => Ok(items.swap_remove(i)),
                _ => Err(failed(format!("index {n} is out of bounds for length {len}"))),
            }
        }
        (Value::Object(mut map), Value::String(key)) => map
            .remove(key)
            .ok_or_else(|| failed(format!("object has no entry '{key}'"))),
        (target, index) => Err(failed(format!(
            "cannot index {} with {}",
            type_name(&target),
            type_name(index)
        ))),
    }
}

/// Integers widen to `i128` so the whole `i64` and `u64` ranges fold exactly.
#[derive(Debug, Clone, Copy)]
enum Num {
    Int(i128),
    Float(f64),
}

impl Num {
    fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Number(n) => n
                .as_i64()
                .map(i128::from)
                .or_else(|| n.as_u64().map(i128::from))
                .map(Num::Int)
                .or_else(|| n.as_f64().map(Num::Float)),
            _ => None,
        }
    }

    fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

fn int_value(i: i128) -> Option<Value> {
    i64::try_from(i)
        .map(Value::from)
        .or_else(|_| u64::try_from(i).map(Value::from))
        .ok()
}

fn float_value(f: f64) -> Result<Value, EvalError> {
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| failed(format!("result {f} is not a finite number")))
}

fn apply_unary(op: UnaryOp, operand: Value) -> Result<Value, EvalError> {
    match (op, &operand) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, _) => match Num::of(&operand) {
            Some(Num::Int(i)) => i
                .checked_neg()
                .and_then(int_value)
                .ok_or_else(|| failed(format!("integer overflow negating {i}"))),
            Some(Num::Float(f)) => float_value(-f),
            None => Err(failed(format!("cannot negate {}", type_name(&operand)))),
        },
        (UnaryOp::Not, other) => Err(failed(format!("cannot apply ! to {}", type_name(other)))),
    }
}

fn apply_binary(op: BinaryOp, lhs: Value, rhs: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add if lhs.is_string() || rhs.is_string() => {
            Ok(Value::String(format!("{}{}", text(&lhs)?, text(&rhs)?)))
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            match (Num::of(&lhs), Num::of(&rhs)) {
                (Some(l), Some(r)) => arithmetic(op, l, r),
                _ => Err(failed(format!(
                    "operator {op} is not defined for {} and {}",
                    type_name(&lhs),
                    type_name(&rhs)
                ))),
            }
        }
        BinaryOp::Eq => Ok(Value::Bool(loosely_equal(&lhs, &rhs))),
        BinaryOp::Ne => Ok(Value::Bool(!loosely_equal(&lhs, &rhs))),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = compare(&lhs, &rhs).ok_or_else(|| {
                failed(format!(
                    "operator {op} cannot compare {} and {}",
                    type_name(&lhs),
                    type_name(&rhs)
                ))
            })?;
            let holds = match op {
                BinaryOp::Lt => ordering == Ordering::Less,
                BinaryOp::Le => ordering != Ordering::Greater,
                BinaryOp::Gt => ordering == Ordering::Greater,
                _ => ordering != Ordering::Less,
            };
            Ok(Value::Bool(holds))
        }
        BinaryOp::And | BinaryOp::Or => {
            let (l, r) = (expect_bool(&lhs, op)?, expect_bool(&rhs, op)?);
            Ok(Value::Bool(if op == BinaryOp::And { l && r } else { l || r }))
        }
    }
}

fn arithmetic(op: BinaryOp, lhs: Num, rhs: Num) -> Result<Value, EvalError> {
    if let (Num::Int(a), Num::Int(b)) = (lhs, rhs) {
        let result = match op {
            BinaryOp::Add => a.checked_add(b),
            BinaryOp::Sub => a.checked_sub(b),
            BinaryOp::Mul => a.checked_mul(b),
            BinaryOp::Div | BinaryOp::Rem if b == 0 => return Err(failed("division by zero")),
            BinaryOp::Div => a.checked_div(b),
            BinaryOp::Rem => a.checked_rem(b),
            _ => return Err(failed(format!("operator {op} is not arithmetic"))),
        };
        return result
            .and_then(int_value)
            .ok_or_else(|| failed(format!("integer overflow in {a} {op} {b}")));
    }

    let (a, b) = (lhs.as_f64(), rhs.as_f64());
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div | BinaryOp::Rem if b == 0.0 => return Err(failed("division by zero")),
        BinaryOp::Div => a / b,
        BinaryOp::Rem => a % b,
        _ => return Err(failed(format!("operator {op} is not arithmetic"))),
    };
    float_value(result)
}

fn text(value: &Value) -> Result<String, EvalError> {
    match value {
        Value::Null => Ok(String::new()),
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(failed(format!(
            "cannot concatenate {} with a string",
            type_name(other)
        ))),
    }
}

fn loosely_equal(lhs: &Value, rhs: &Value) -> bool {
    match (Num::of(lhs), Num::of(rhs)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => a == b,
        (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
        _ => lhs == rhs,
    }
}

fn compare(lhs: &Value, rhs: &Value) -> Option<Ordering> {
    match (lhs, rhs) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => match (Num::of(lhs)?, Num::of(rhs)?) {
            (Num::Int(a), Num::Int(b)) => Some(a.cmp(&b)),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn lit(value: Value) -> Expr {
        Expr::Constant(value)
    }

    #[test]
    fn test_integer_arithmetic_folds() {
        let expr = Expr::binary(
            BinaryOp::Mul,
            Expr::binary(BinaryOp::Add, lit(json!(2)), lit(json!(3))),
            lit(json!(4)),
        );
        assert_eq!(evaluate(&expr).unwrap(), json!(20));
    }

    #[test]
    fn test_mixed_arithmetic_promotes_to_float() {
        let expr = Expr::binary(BinaryOp::Div, lit(json!(7)), lit(json!(2.0)));
        assert_eq!(evaluate(&expr).unwrap(), json!(3.5));
    }

    #[test]
    fn test_division_by_zero_fails() {
        let expr = Expr::binary(BinaryOp::Rem, lit(json!(7)), lit(json!(0)));
        assert_eq!(
            evaluate(&expr).unwrap_err(),
            EvalError::Failed("division by zero".into())
        );
    }

    #[test]
    fn test_integer_overflow_fails() {
        let expr = Expr::binary(BinaryOp::Mul, lit(json!(i64::MAX)), lit(json!(4)));
        assert!(matches!(evaluate(&expr), Err(EvalError::Failed(_))));
    }

    #[test]
    fn test_unsigned_integers_stay_exact() {
        let near_max = Expr::binary(BinaryOp::Add, lit(json!(u64::MAX - 1)), lit(json!(0)));
        assert_eq!(evaluate(&near_max).unwrap(), json!(u64::MAX - 1));

        let spread = Expr::binary(BinaryOp::Sub, lit(json!(u64::MAX)), lit(json!(i64::MAX)));
        assert_eq!(evaluate(&spread).unwrap(), json!(u64::MAX - i64::MAX as u64));

        let equal = Expr::binary(BinaryOp::Eq, lit(json!(u64::MAX)), lit(json!(u64::MAX - 1)));
        assert_eq!(evaluate(&equal).unwrap(), json!(false));

        let past_max = Expr::binary(BinaryOp::Add, lit(json!(u64::MAX)), lit(json!(1)));
        assert!(matches!(evaluate(&past_max), Err(EvalError::Failed(_))));

        let below_min = Expr::binary(BinaryOp::Sub, lit(json!(i64::MIN)), lit(json!(1)));
        assert!(matches!(evaluate(&below_min), Err(EvalError::Failed(_))));

        let negated = Expr::unary(UnaryOp::Neg, lit(json!(u64::MAX)));
        assert!(matches!(evaluate(&negated), Err(EvalError::Failed(_))));
    }

    #[test]
    fn test_string_concatenation() {
        let expr = Expr::binary(
            BinaryOp::Add,
            Expr::captured("prefix", "room-"),
            lit(json!(42)),
        );
        assert_eq!(evaluate(&expr).unwrap(), json!("room-42"));
    }

    #[test]
    fn test_member_and_index_reads() {
        let settings = Expr::captured("settings", &json!({ "rooms": ["lobby", "dev"] }));
        let expr = settings.member("rooms").index(lit(json!(1)));
        assert_eq!(evaluate(&expr).unwrap(), json!("dev"));

        let missing = Expr::captured("settings", &json!({})).member("rooms");
        assert!(matches!(evaluate(&missing), Err(EvalError::Failed(_))));
    }

    #[test]
    fn test_comparisons() {
        let lt = Expr::binary(BinaryOp::Lt, lit(json!(1)), lit(json!(1.5)));
        assert_eq!(evaluate(&lt).unwrap(), json!(true));

        let eq = Expr::binary(BinaryOp::Eq, lit(json!(2)), lit(json!(2.0)));
        assert_eq!(evaluate(&eq).unwrap(), json!(true));

        let strings = Expr::binary(BinaryOp::Ge, lit(json!("b")), lit(json!("a")));
        assert_eq!(evaluate(&strings).unwrap(), json!(true));

        let mismatched = Expr::binary(BinaryOp::Lt, lit(json!("a")), lit(json!(1)));
        assert!(evaluate(&mismatched).is_err());
    }

    #[test]
    fn test_logic_short_circuits() {
        let failing = Expr::Unrepresentable("boom".into());
        let expr = Expr::binary(BinaryOp::Or, lit(json!(true)), failing.clone());
        assert_eq!(evaluate(&expr).unwrap(), json!(true));

        let expr = Expr::binary(BinaryOp::And, lit(json!(false)), failing.clone());
        assert_eq!(evaluate(&expr).unwrap(), json!(false));

        let expr = Expr::binary(BinaryOp::And, lit(json!(true)), failing);
        assert_eq!(
            evaluate(&expr).unwrap_err(),
            EvalError::Failed("boom".into())
        );

        let expr = Expr::binary(BinaryOp::Or, lit(json!(false)), lit(json!(true)));
        assert_eq!(evaluate(&expr).unwrap(), json!(true));

        let expr = Expr::binary(BinaryOp::And, lit(json!(true)), lit(json!(5)));
        assert!(matches!(evaluate(&expr), Err(EvalError::Failed(_))));
    }

    #[test]
    fn test_conditional_and_collections() {
        let expr = Expr::Object(vec![
            (
                "level".to_string(),
                Expr::conditional(lit(json!(false)), lit(json!("high")), lit(json!("low"))),
            ),
            (
                "ids".to_string(),
                Expr::Array(vec![lit(json!(1)), Expr::unary(UnaryOp::Neg, lit(json!(2)))]),
            ),
        ]);
        assert_eq!(
            evaluate(&expr).unwrap(),
            json!({ "level": "low", "ids": [1, -2] })
        );
    }

    #[test]
    fn test_argument_violation_is_structural() {
        // The call sits in a branch evaluation would never reach.
        let expr = Expr::binary(
            BinaryOp::And,
            lit(json!(false)),
            Expr::parameter().call("Ping", vec![]),
        );
        assert_eq!(
            expr.argument_violation(),
            Some(EvalError::NestedCall("Ping".into()))
        );

        let property = Expr::parameter().member("Name");
        assert_eq!(
            property.argument_violation(),
            Some(EvalError::ContractReference)
        );

        assert_eq!(lit(json!(1)).argument_violation(), None);
    }
}
