//! Store dispatch benchmarks
//!
//! Measures the cost of reducing an action through the Store, with and
//! without an effect round-trip.
//!
//! Run with: `cargo bench -p ticket-verifier-runtime`

#![allow(missing_docs)]
#![allow(clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use ticket_verifier_core::{effect::Effect, reducer::Reducer, smallvec, Effects};
use ticket_verifier_runtime::Store;

#[derive(Default)]
struct CartState {
    boys: u32,
    girls: u32,
    quoted_cents: u64,
}

#[derive(Clone, Debug)]
enum CartAction {
    AddBoy,
    AddGirl,
    Requote,
    Quoted(u64),
}

struct CartReducer;

impl Reducer for CartReducer {
    type State = CartState;
    type Action = CartAction;
    type Environment = (u64, u64);

    fn reduce(
        &self,
        state: &mut CartState,
        action: CartAction,
        prices: &(u64, u64),
    ) -> Effects<CartAction> {
        match action {
            CartAction::AddBoy => state.boys += 1,
            CartAction::AddGirl => state.girls += 1,
            CartAction::Requote => {
                let total =
                    u64::from(state.boys) * prices.0 + u64::from(state.girls) * prices.1;
                return smallvec![Effect::future(async move { Some(CartAction::Quoted(total)) })];
            }
            CartAction::Quoted(total) => state.quoted_cents = total,
        }
        smallvec![]
    }
}

fn bench_pure_dispatch(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let _guard = runtime.enter();
    let store = Store::new(CartState::default(), CartReducer, (1400, 1400));

    c.bench_function("store_send_pure", |b| {
        b.iter(|| {
            let _ = black_box(store.send(CartAction::AddBoy));
            let _ = black_box(store.send(CartAction::AddGirl));
        });
    });
}

fn bench_effect_round_trip(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().expect("runtime");
    let store = {
        let _guard = runtime.enter();
        Store::new(CartState::default(), CartReducer, (1400, 1400))
    };

    c.bench_function("store_send_with_future_effect", |b| {
        b.to_async(&runtime).iter(|| {
            let store = store.clone();
            async move {
                let mut handle = store.send(CartAction::Requote).expect("send");
                handle.wait().await;
                black_box(store.state(|s| s.quoted_cents));
            }
        });
    });
}

criterion_group!(benches, bench_pure_dispatch, bench_effect_round_trip);
criterion_main!(benches);
