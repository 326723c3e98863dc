use std::collections::HashMap;

use hubwire_contract::{
    BinaryOp, ContractError, Expr, Lambda, UnaryOp, extract_invocation, extract_member_name,
};
use serde::Serialize;
use serde_json::json;

#[derive(Serialize)]
struct Order {
    id: u64,
    lines: Vec<String>,
}

fn call(method: &str, args: Vec<Expr>) -> Lambda {
    Lambda::new(Expr::parameter().call(method, args))
}

#[test]
fn test_arguments_fold_into_values() {
    let order = Order {
        id: 7,
        lines: vec!["tea".into(), "scone".into()],
    };
    let discount = 0.25;

    let lambda = call(
        "PlaceOrder",
        vec![
            Expr::captured("order", &order).member("id"),
            Expr::captured("order", &order)
                .member("lines")
                .index(Expr::constant(&1)),
            Expr::Object(vec![
                ("rush".into(), Expr::unary(UnaryOp::Not, Expr::constant(&false))),
                (
                    "discount".into(),
                    Expr::binary(
                        BinaryOp::Mul,
                        Expr::captured("discount", &discount),
                        Expr::constant(&100),
                    ),
                ),
            ]),
            Expr::conditional(
                Expr::binary(BinaryOp::Gt, Expr::constant(&3), Expr::constant(&2)),
                Expr::constant("express"),
                Expr::constant("standard"),
            ),
        ],
    );

    let descriptor = extract_invocation(Some(&lambda)).unwrap();
    assert_eq!(descriptor.method(), "PlaceOrder");
    assert_eq!(
        descriptor.args(),
        &[
            json!(7),
            json!("scone"),
            json!({ "rush": true, "discount": 25.0 }),
            json!("express"),
        ]
    );
}

#[test]
fn test_argument_order_and_count_are_preserved() {
    let args: Vec<Expr> = (0..7).map(|i| Expr::constant(&i)).collect();
    let descriptor = extract_invocation(Some(&call("Seven", args))).unwrap();
    assert_eq!(descriptor.arity(), 7);
    assert_eq!(descriptor.args(), &(0..7).map(|i| json!(i)).collect::<Vec<_>>()[..]);

    let descriptor = extract_invocation(Some(&call("Ping", vec![]))).unwrap();
    assert_eq!(descriptor.arity(), 0);
}

#[test]
fn test_shape_errors() {
    assert_eq!(extract_invocation(None), Err(ContractError::NullExpression));
    assert_eq!(extract_member_name(None), Err(ContractError::NullExpression));

    let shapes = [
        Lambda::new(Expr::constant(&1)),
        Lambda::new(Expr::parameter()),
        Lambda::new(Expr::parameter().member("Ping")),
        Lambda::new(Expr::constant("text").call("Len", vec![])),
        call("Outer", vec![Expr::parameter().call("Inner", vec![])]),
        call("Outer", vec![Expr::parameter().member("State")]),
        call(
            "Outer",
            vec![Expr::Array(vec![
                Expr::constant(&1),
                Expr::constant(&2).call("Abs", vec![]),
            ])],
        ),
    ];
    for lambda in &shapes {
        assert!(
            matches!(
                extract_invocation(Some(lambda)),
                Err(ContractError::InvalidExpressionShape(_))
            ),
            "accepted {lambda:?}"
        );
    }
}

#[test]
fn test_evaluation_errors_name_the_argument() {
    let mut by_point = HashMap::new();
    by_point.insert((1, 2), "a");

    let cases = [
        (
            call(
                "Load",
                vec![Expr::constant(&1), Expr::captured("by_point", &by_point)],
            ),
            1,
        ),
        (
            call(
                "Load",
                vec![Expr::binary(
                    BinaryOp::Sub,
                    Expr::constant("a"),
                    Expr::constant(&1),
                )],
            ),
            0,
        ),
        (
            call("Load", vec![Expr::constant(&json!({})).member("missing")]),
            0,
        ),
    ];

    for (lambda, expected) in cases {
        match extract_invocation(Some(&lambda)) {
            Err(ContractError::ArgumentEvaluation { method, index, .. }) => {
                assert_eq!(method, "Load");
                assert_eq!(index, expected);
            }
            other => panic!("unexpected {other:?}"),
        }
    }
}

#[test]
fn test_member_names() {
    let event = Lambda::new(Expr::parameter().member("Received"));
    assert_eq!(extract_member_name(Some(&event)).unwrap(), "Received");

    let method = call("Send", vec![Expr::parameter()]);
    assert_eq!(extract_member_name(Some(&method)).unwrap(), "Send");

    let nested = Lambda::new(Expr::parameter().member("Inner").member("Received"));
    assert!(matches!(
        extract_member_name(Some(&nested)),
        Err(ContractError::InvalidExpressionShape(_))
    ));
}
