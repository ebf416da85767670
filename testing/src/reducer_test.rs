//! Given/when/then harness for reducers
//!
//! A test names the state it starts from, the actions the user performs, and
//! what must hold afterwards. Every action but the last only sets the scene:
//! its effects are dropped, the way a form that is typed into and then
//! unmounted never sees its responses. Effect assertions apply to the last
//! action, which is the one under test.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use ticket_verifier_core::{Effects, effect::Effect, reducer::Reducer};

type StateCheck<S> = Box<dyn FnOnce(&S)>;
type EffectCheck<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Given/when/then test of one reducer
///
/// # Example
///
/// ```ignore
/// ReducerTest::new(OrderFormReducer::new())
///     .with_env(h.env)
///     .given_state(OrderFormState::default())
///     .when_action(OrderFormAction::SetEmail("ada.example.org".into()))
///     .when_action(OrderFormAction::Submit)
///     .then_state(|state| {
///         assert_eq!(state.errors.get(Field::Email), Some("Invalid email address"));
///     })
///     .then_effects(assertions::assert_no_effects)
///     .run();
/// ```
pub struct ReducerTest<R: Reducer> {
    reducer: R,
    env: Option<R::Environment>,
    state: Option<R::State>,
    actions: Vec<R::Action>,
    state_checks: Vec<StateCheck<R::State>>,
    effect_checks: Vec<EffectCheck<R::Action>>,
}

impl<R: Reducer> ReducerTest<R> {
    /// Test `reducer`
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            env: None,
            state: None,
            actions: Vec::new(),
            state_checks: Vec::new(),
            effect_checks: Vec::new(),
        }
    }

    /// Environment the reducer sees
    #[must_use]
    pub fn with_env(mut self, env: R::Environment) -> Self {
        self.env = Some(env);
        self
    }

    /// Starting state
    #[must_use]
    pub fn given_state(mut self, state: R::State) -> Self {
        self.state = Some(state);
        self
    }

    /// Append an action; the last one appended is the one under test
    #[must_use]
    pub fn when_action(mut self, action: R::Action) -> Self {
        self.actions.push(action);
        self
    }

    /// Append several actions in order
    #[must_use]
    pub fn when_actions(mut self, actions: impl IntoIterator<Item = R::Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Check the state after the last action
    #[must_use]
    pub fn then_state(mut self, check: impl FnOnce(&R::State) + 'static) -> Self {
        self.state_checks.push(Box::new(check));
        self
    }

    /// Check the effects returned by the last action
    #[must_use]
    pub fn then_effects(mut self, check: impl FnOnce(&[Effect<R::Action>]) + 'static) -> Self {
        self.effect_checks.push(Box::new(check));
        self
    }

    /// Reduce every action, run the checks, and hand back the final state
    ///
    /// # Panics
    ///
    /// Panics if the state, environment, or an action is missing, or if a
    /// check fails.
    #[allow(clippy::panic)] // Test code can panic
    pub fn run(self) -> R::State {
        let Some(mut state) = self.state else {
            panic!("starting state must be set with given_state()");
        };
        let Some(env) = self.env else {
            panic!("environment must be set with with_env()");
        };
        assert!(!self.actions.is_empty(), "no action set with when_action()");

        let mut effects = Effects::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env);
        }

        for check in self.state_checks {
            check(&state);
        }
        for check in self.effect_checks {
            check(&effects);
        }
        state
    }
}

/// Checks for the effects a reducer returns
///
/// Every backend request is an [`Effect::Future`] and every poll is an
/// [`Effect::Delay`]; groups are searched recursively.
pub mod assertions {
    use std::time::Duration;

    use ticket_verifier_core::effect::Effect;

    /// Nothing happens outside the state change
    ///
    /// # Panics
    ///
    /// Panics if any effect other than `Effect::None` is returned.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A: std::fmt::Debug>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(|e| matches!(e, Effect::None)),
            "expected no effects, found {effects:?}"
        );
    }

    /// Exactly `expected` requests are issued
    ///
    /// # Panics
    ///
    /// Panics if the number of futures differs.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_requests<A>(effects: &[Effect<A>], expected: usize) {
        let issued: usize = effects.iter().map(futures_in).sum();
        assert_eq!(issued, expected, "expected {expected} requests, found {issued}");
    }

    /// A follow-up action is scheduled after `interval`
    ///
    /// # Panics
    ///
    /// Panics if no `Delay` with that duration is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_schedules<A>(effects: &[Effect<A>], interval: Duration) {
        assert!(
            effects.iter().any(|e| delays_by(e, interval)),
            "expected an action scheduled after {interval:?}"
        );
    }

    fn futures_in<A>(effect: &Effect<A>) -> usize {
        match effect {
            Effect::Future(_) => 1,
            Effect::Parallel(inner) | Effect::Sequential(inner) => inner.iter().map(futures_in).sum(),
            Effect::None | Effect::Delay { .. } => 0,
        }
    }

    fn delays_by<A>(effect: &Effect<A>, interval: Duration) -> bool {
        match effect {
            Effect::Delay { duration, .. } => *duration == interval,
            Effect::Parallel(inner) | Effect::Sequential(inner) => {
                inner.iter().any(|e| delays_by(e, interval))
            }
            Effect::None | Effect::Future(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ticket_verifier_core::{Effects, smallvec};

    const POLL: Duration = Duration::from_secs(5);

    #[derive(Clone, Debug, Default)]
    struct Tickets {
        sold: u32,
        mounted: bool,
    }

    #[derive(Clone, Debug)]
    enum TicketAction {
        Mount,
        Unmount,
        Sell,
        Loaded,
    }

    struct TicketReducer;

    impl Reducer for TicketReducer {
        type State = Tickets;
        type Action = TicketAction;
        type Environment = ();

        fn reduce(&self, state: &mut Tickets, action: TicketAction, (): &()) -> Effects<TicketAction> {
            match action {
                TicketAction::Mount => {
                    state.mounted = true;
                    smallvec![Effect::merge(vec![
                        Effect::future(async { Some(TicketAction::Loaded) }),
                        Effect::Delay {
                            duration: POLL,
                            action: Box::new(TicketAction::Mount),
                        },
                    ])]
                }
                TicketAction::Unmount => {
                    state.mounted = false;
                    Effects::new()
                }
                TicketAction::Sell => {
                    state.sold += 1;
                    smallvec![Effect::None]
                }
                TicketAction::Loaded => Effects::new(),
            }
        }
    }

    #[test]
    fn mount_requests_and_schedules_a_poll() {
        ReducerTest::new(TicketReducer)
            .with_env(())
            .given_state(Tickets::default())
            .when_action(TicketAction::Mount)
            .then_state(|state| assert!(state.mounted))
            .then_effects(|effects| {
                assertions::assert_requests(effects, 1);
                assertions::assert_schedules(effects, POLL);
            })
            .run();
    }

    #[test]
    fn only_the_last_action_is_under_test() {
        let state = ReducerTest::new(TicketReducer)
            .with_env(())
            .given_state(Tickets::default())
            .when_actions([TicketAction::Mount, TicketAction::Sell, TicketAction::Sell])
            .then_effects(assertions::assert_no_effects)
            .run();
        assert_eq!(state.sold, 2);
        assert!(state.mounted);
    }

    #[test]
    fn unmount_after_mount_ends_quietly() {
        ReducerTest::new(TicketReducer)
            .with_env(())
            .given_state(Tickets::default())
            .when_action(TicketAction::Mount)
            .when_action(TicketAction::Unmount)
            .then_state(|state| assert!(!state.mounted))
            .then_effects(|effects| assertions::assert_requests(effects, 0))
            .run();
    }
}
