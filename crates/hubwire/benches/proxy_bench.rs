use std::sync::Arc;

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use hubwire::contract::{BinaryOp, Expr, extract_invocation};
use hubwire::{Arg, TypedHubProxy};
use hubwire_loopback::LoopbackHub;
use serde_json::json;

#[hubwire::contract(rename_all = "PascalCase")]
pub trait Board {
    fn post(&self, topic: String, body: String, priority: u8);
}

#[hubwire::contract(rename_all = "PascalCase")]
pub trait BoardEvents {
    fn posted(&self, topic: String, body: String, priority: u8);
}

fn bench_extract_invocation(c: &mut Criterion) {
    let calls = BoardCalls::default();
    let topic = String::from("releases");

    c.bench_function("extract_invocation_constants", |b| {
        b.iter(|| {
            let call = calls.post("releases", "v0.3.0 is out", 1);
            black_box(extract_invocation(Some(call.lambda())).unwrap());
        })
    });

    c.bench_function("extract_invocation_folded", |b| {
        b.iter(|| {
            let call = calls.post(
                Arg::captured("topic", &topic),
                Arg::from_expr(Expr::binary(
                    BinaryOp::Add,
                    Expr::constant("v0.3.0"),
                    Expr::constant(" is out"),
                )),
                Arg::from_expr(Expr::binary(
                    BinaryOp::Mul,
                    Expr::constant(&2),
                    Expr::constant(&3),
                )),
            );
            black_box(extract_invocation(Some(call.lambda())).unwrap());
        })
    });
}

fn bench_event_dispatch(c: &mut Criterion) {
    let hub = Arc::new(LoopbackHub::new("board"));
    let board = TypedHubProxy::<dyn Board, dyn BoardEvents>::new(hub.clone()).unwrap();
    let _handle = board
        .on(|e| e.posted(), |topic: String, body: String, priority: u8| {
            black_box((topic, body, priority));
        })
        .unwrap();

    let payload = vec![json!("releases"), json!("v0.3.0 is out"), json!(1)];
    c.bench_function("push_three_argument_event", |b| {
        b.iter(|| hub.push("Posted", black_box(payload.clone())))
    });

    c.bench_function("subscribe_and_dispose", |b| {
        b.iter(|| {
            let handle = board.on(|e| e.posted(), |_: String, _: String, _: u8| {}).unwrap();
            handle.dispose();
        })
    });
}

criterion_group!(benches, bench_extract_invocation, bench_event_dispatch);
criterion_main!(benches);
