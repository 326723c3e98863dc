use hubwire_core::InvocationDescriptor;

use crate::expr::{EvalError, evaluate};
use crate::{ContractError, Expr, Lambda};

/// Resolves a call lambda `|c| c.method(args..)` into the method's wire name
/// and its evaluated arguments.
///
/// The body must be exactly one call on the contract parameter. Arguments may
/// be arbitrarily nested value expressions but must neither call anything nor
/// read from the contract.
pub fn extract_invocation(lambda: Option<&Lambda>) -> Result<InvocationDescriptor, ContractError> {
    let lambda = lambda.ok_or(ContractError::NullExpression)?;

    let (method, args) = match lambda.body() {
        Expr::Call {
            target,
            method,
            args,
        } if target.is_parameter() => (method, args),
        Expr::Call { method, target, .. } => {
            return Err(ContractError::InvalidExpressionShape(format!(
                "call to '{method}' targets a {} instead of the contract",
                target.kind()
            )));
        }
        other => {
            return Err(ContractError::InvalidExpressionShape(format!(
                "expected a single contract method call, found a {}",
                other.kind()
            )));
        }
    };

    let mut values = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        if let Some(violation) = arg.argument_violation() {
            return Err(ContractError::InvalidExpressionShape(format!(
                "argument {index} of '{method}': {violation}"
            )));
        }
        let value = evaluate(arg).map_err(|err| match err {
            EvalError::Failed(reason) => ContractError::ArgumentEvaluation {
                method: method.clone(),
                index,
                reason,
            },
            other => ContractError::InvalidExpressionShape(format!(
                "argument {index} of '{method}': {other}"
            )),
        })?;
        values.push(value);
    }

    tracing::trace!(method = %method, args = values.len(), "extracted invocation");
    Ok(InvocationDescriptor::new(method.clone(), values))
}

/// Resolves a member reference lambda `|c| c.event` into the member's wire name.
///
/// A call on the contract is accepted too; its arguments are not evaluated.
pub fn extract_member_name(lambda: Option<&Lambda>) -> Result<String, ContractError> {
    let lambda = lambda.ok_or(ContractError::NullExpression)?;

    match lambda.body() {
        Expr::Member { target, name } if target.is_parameter() => Ok(name.clone()),
        Expr::Call { target, method, .. } if target.is_parameter() => Ok(method.clone()),
        Expr::Member { name, target } | Expr::Call {
            method: name,
            target,
            ..
        } => Err(ContractError::InvalidExpressionShape(format!(
            "'{name}' is reached through a {} instead of the contract",
            target.kind()
        ))),
        other => Err(ContractError::InvalidExpressionShape(format!(
            "expected a contract member reference, found a {}",
            other.kind()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::BinaryOp;
    use serde_json::json;

    fn call(method: &str, args: Vec<Expr>) -> Lambda {
        Lambda::new(Expr::parameter().call(method, args))
    }

    #[test]
    fn test_extracts_name_and_ordered_args() {
        let descriptor = extract_invocation(Some(&call(
            "Add",
            vec![Expr::constant(&2), Expr::constant(&3)],
        )))
        .unwrap();
        assert_eq!(descriptor.method(), "Add");
        assert_eq!(descriptor.args(), &[json!(2), json!(3)]);
    }

    #[test]
    fn test_evaluates_nested_arguments() {
        let base = 40;
        let lambda = call(
            "Echo",
            vec![Expr::binary(
                BinaryOp::Add,
                Expr::captured("base", &base),
                Expr::constant(&2),
            )],
        );
        let descriptor = extract_invocation(Some(&lambda)).unwrap();
        assert_eq!(descriptor.args(), &[json!(42)]);
    }

    #[test]
    fn test_zero_argument_call() {
        let descriptor = extract_invocation(Some(&call("Ping", vec![]))).unwrap();
        assert_eq!(descriptor.method(), "Ping");
        assert!(descriptor.args().is_empty());
    }

    #[test]
    fn test_null_expression() {
        assert_eq!(
            extract_invocation(None).unwrap_err(),
            ContractError::NullExpression
        );
        assert_eq!(
            extract_member_name(None).unwrap_err(),
            ContractError::NullExpression
        );
    }

    #[test]
    fn test_non_call_bodies_are_rejected() {
        let bodies = [
            Expr::parameter(),
            Expr::constant(&1),
            Expr::parameter().member("Name"),
            Expr::Array(vec![Expr::parameter().call("Ping", vec![])]),
        ];
        for body in bodies {
            let err = extract_invocation(Some(&Lambda::new(body))).unwrap_err();
            assert!(matches!(err, ContractError::InvalidExpressionShape(_)), "{err:?}");
        }
    }

    #[test]
    fn test_multiple_calls_are_rejected() {
        let chained = Expr::parameter()
            .call("First", vec![])
            .call("Second", vec![]);
        let err = extract_invocation(Some(&Lambda::new(chained))).unwrap_err();
        assert!(matches!(err, ContractError::InvalidExpressionShape(_)));

        let nested = call("Outer", vec![Expr::parameter().call("Inner", vec![])]);
        let err = extract_invocation(Some(&nested)).unwrap_err();
        assert!(matches!(err, ContractError::InvalidExpressionShape(msg) if msg.contains("Inner")));
    }

    #[test]
    fn test_contract_reads_in_arguments_are_rejected() {
        let lambda = call("Send", vec![Expr::parameter().member("Name")]);
        assert!(matches!(
            extract_invocation(Some(&lambda)),
            Err(ContractError::InvalidExpressionShape(_))
        ));
    }

    #[test]
    fn test_failed_argument_reports_position() {
        let lambda = call(
            "Divide",
            vec![
                Expr::constant(&1),
                Expr::binary(BinaryOp::Div, Expr::constant(&1), Expr::constant(&0)),
            ],
        );
        assert_eq!(
            extract_invocation(Some(&lambda)).unwrap_err(),
            ContractError::ArgumentEvaluation {
                method: "Divide".into(),
                index: 1,
                reason: "division by zero".into(),
            }
        );
    }

    #[test]
    fn test_member_name_from_reference_or_call() {
        let reference = Lambda::new(Expr::parameter().member("OnMessage"));
        assert_eq!(extract_member_name(Some(&reference)).unwrap(), "OnMessage");

        let hookup = Lambda::new(
            Expr::parameter().call("OnMessage", vec![Expr::Unrepresentable("skipped".into())]),
        );
        assert_eq!(extract_member_name(Some(&hookup)).unwrap(), "OnMessage");
    }

    #[test]
    fn test_member_name_rejects_other_shapes() {
        let deep = Lambda::new(Expr::parameter().member("Inner").member("OnMessage"));
        assert!(matches!(
            extract_member_name(Some(&deep)),
            Err(ContractError::InvalidExpressionShape(_))
        ));

        let constant = Lambda::new(Expr::constant("OnMessage"));
        assert!(matches!(
            extract_member_name(Some(&constant)),
            Err(ContractError::InvalidExpressionShape(_))
        ));
    }
}
