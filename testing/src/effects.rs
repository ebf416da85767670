//! Effect driver for reducer tests
//!
//! Runs the effects a reducer returns without a `Store`: futures are awaited
//! in place, produced actions are fed back into the reducer, and delayed
//! actions are recorded instead of waited for. That last rule keeps polling
//! loops from running forever inside a test.

#![allow(clippy::panic)] // Test infrastructure reports runaway loops by panicking

use std::collections::VecDeque;
use std::time::Duration;

use futures::future::BoxFuture;
use ticket_verifier_core::effect::Effect;
use ticket_verifier_core::reducer::Reducer;

/// Upper bound on feedback iterations before a test is declared runaway
const MAX_STEPS: usize = 1_000;

/// Actions produced by running a batch of effects
#[derive(Debug)]
pub struct Drained<A> {
    /// Actions produced by futures, in completion order
    pub actions: Vec<A>,
    /// Delayed actions that were scheduled but not dispatched
    pub delayed: Vec<(Duration, A)>,
}

impl<A> Default for Drained<A> {
    fn default() -> Self {
        Self {
            actions: Vec::new(),
            delayed: Vec::new(),
        }
    }
}

/// Run effects once, without feeding anything back
///
/// `Parallel` groups run one after another in declaration order so tests are
/// deterministic.
pub async fn drain<A, I>(effects: I) -> Drained<A>
where
    A: Send + 'static,
    I: IntoIterator<Item = Effect<A>>,
{
    let mut out = Drained::default();
    for effect in effects {
        drain_one(effect, &mut out).await;
    }
    out
}

fn drain_one<A: Send + 'static>(effect: Effect<A>, out: &mut Drained<A>) -> BoxFuture<'_, ()> {
    Box::pin(async move {
        match effect {
            Effect::None => {}
            Effect::Parallel(effects) | Effect::Sequential(effects) => {
                for effect in effects {
                    drain_one(effect, out).await;
                }
            }
            Effect::Delay { duration, action } => out.delayed.push((duration, *action)),
            Effect::Future(future) => {
                if let Some(action) = future.await {
                    out.actions.push(action);
                }
            }
        }
    })
}

/// Everything that happened while a reducer settled
#[derive(Debug)]
pub struct Settled<A> {
    /// Every action reduced, starting with the one sent
    pub history: Vec<A>,
    /// Delayed actions scheduled along the way (not dispatched)
    pub delayed: Vec<(Duration, A)>,
}

impl<A> Settled<A> {
    /// Whether any reduced action matches `predicate`
    pub fn saw(&self, predicate: impl Fn(&A) -> bool) -> bool {
        self.history.iter().any(predicate)
    }

    /// Number of reduced actions matching `predicate`
    pub fn count(&self, predicate: impl Fn(&A) -> bool) -> usize {
        self.history.iter().filter(|a| predicate(a)).count()
    }
}

/// Send an action and keep reducing until no effect produces another one
///
/// # Panics
///
/// Panics if the reducer keeps producing actions for more than 1,000 steps.
pub async fn settle<R>(
    reducer: &R,
    state: &mut R::State,
    env: &R::Environment,
    action: R::Action,
) -> Settled<R::Action>
where
    R: Reducer,
    R::Action: Clone + Send + 'static,
{
    let mut queue = VecDeque::from([action]);
    let mut settled = Settled {
        history: Vec::new(),
        delayed: Vec::new(),
    };

    while let Some(action) = queue.pop_front() {
        assert!(
            settled.history.len() < MAX_STEPS,
            "reducer did not settle after {MAX_STEPS} actions"
        );
        settled.history.push(action.clone());

        let effects = reducer.reduce(state, action, env);
        let drained = drain(effects).await;
        queue.extend(drained.actions);
        settled.delayed.extend(drained.delayed);
    }

    settled
}
