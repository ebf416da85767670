//! # Ticket Verifier Core
//!
//! Core traits and types for the Ticket Verifier console.
//!
//! Every screen of the console (auth, order form, admin dashboard, router) is
//! a reducer: a pure function from `(State, Action, Environment)` to updated
//! state plus a list of effect descriptions. Effects are executed by the
//! `Store` in the runtime crate, and any action they produce is fed back into
//! the same reducer.
//!
//! ## Core Concepts
//!
//! - **State**: what a screen currently shows (form fields, cached queries)
//! - **Action**: user intents and backend results
//! - **Reducer**: `(State, Action, Environment) → Effects`
//! - **Effect**: a description of I/O, never the I/O itself
//! - **Environment**: injected dependencies (API, storage, clock)
//!
//! ## Example
//!
//! ```
//! use ticket_verifier_core::{effect::Effect, reducer::Reducer, smallvec, SmallVec};
//!
//! #[derive(Default)]
//! struct TabState {
//!     selected: usize,
//! }
//!
//! enum TabAction {
//!     Select(usize),
//! }
//!
//! struct TabReducer;
//!
//! impl Reducer for TabReducer {
//!     type State = TabState;
//!     type Action = TabAction;
//!     type Environment = ();
//!
//!     fn reduce(
//!         &self,
//!         state: &mut TabState,
//!         action: TabAction,
//!         _env: &(),
//!     ) -> SmallVec<[Effect<TabAction>; 4]> {
//!         match action {
//!             TabAction::Select(index) => state.selected = index,
//!         }
//!         smallvec![Effect::None]
//!     }
//! }
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, NaiveDate, Utc};
pub use smallvec::{smallvec, SmallVec};

/// Effects returned by a single `reduce` call.
///
/// Most reducers return zero to two effects, so four inline slots avoid a heap
/// allocation on the hot path.
pub type Effects<Action> = SmallVec<[effect::Effect<Action>; 4]>;

/// Reducer module - the trait every screen implements
pub mod reducer {
    use super::Effects;

    /// The Reducer trait - core abstraction for console logic
    ///
    /// # Type Parameters
    ///
    /// - `State`: The screen state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    ///
    /// Reducers must not perform I/O directly. Anything that talks to the
    /// backend or to local storage is returned as an [`Effect`](crate::effect::Effect).
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// # Arguments
        ///
        /// - `state`: Mutable reference to current state
        /// - `action`: The action to process
        /// - `env`: Reference to injected dependencies
        ///
        /// # Returns
        ///
        /// Effects to be executed by the runtime
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> Effects<Self::Action>;
    }
}

/// Effect module - side effect descriptions
pub mod effect {
    use futures::future::BoxFuture;
    use std::future::Future;
    use std::sync::Arc;
    use std::time::Duration;

    /// Effect type - describes a side effect to be executed
    ///
    /// Effects are NOT executed immediately. They are descriptions of what
    /// should happen, returned from reducers and executed by the Store runtime.
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects concurrently
        Parallel(Vec<Effect<Action>>),

        /// Run effects one after another, each finishing before the next starts
        Sequential(Vec<Effect<Action>>),

        /// Dispatch an action after a delay (polling, notices that expire)
        Delay {
            /// How long to wait
            duration: Duration,
            /// Action to dispatch after delay
            action: Box<Action>,
        },

        /// Arbitrary async computation
        ///
        /// If the future resolves to `Some(action)`, the action is fed back
        /// into the reducer.
        Future(BoxFuture<'static, Option<Action>>),
    }

    impl<Action> std::fmt::Debug for Effect<Action>
    where
        Action: std::fmt::Debug,
    {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                }
                Effect::Sequential(effects) => {
                    f.debug_tuple("Effect::Sequential").field(effects).finish()
                }
                Effect::Delay { duration, action } => f
                    .debug_struct("Effect::Delay")
                    .field("duration", duration)
                    .field("action", action)
                    .finish(),
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action: Send + 'static> Effect<Action> {
        /// Wrap an async block as an effect
        pub fn future<F>(future: F) -> Self
        where
            F: Future<Output = Option<Action>> + Send + 'static,
        {
            Effect::Future(Box::pin(future))
        }

        /// Fire-and-forget work that never produces an action
        pub fn fire_and_forget<F>(future: F) -> Self
        where
            F: Future<Output = ()> + Send + 'static,
        {
            Effect::Future(Box::pin(async move {
                future.await;
                None
            }))
        }

        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Chain effects to run sequentially
        #[must_use]
        pub const fn chain(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Sequential(effects)
        }

        /// Returns `true` for [`Effect::None`]
        #[must_use]
        pub const fn is_none(&self) -> bool {
            matches!(self, Effect::None)
        }

        /// Lift the produced action into a parent action type
        ///
        /// Used when a parent reducer embeds a child reducer, e.g. the console
        /// shell forwarding order-form effects.
        #[must_use]
        pub fn map<B, F>(self, f: F) -> Effect<B>
        where
            B: Send + 'static,
            F: Fn(Action) -> B + Send + Sync + 'static,
        {
            self.map_shared(Arc::new(f))
        }

        fn map_shared<B>(self, f: Arc<dyn Fn(Action) -> B + Send + Sync>) -> Effect<B>
        where
            B: Send + 'static,
        {
            match self {
                Effect::None => Effect::None,
                Effect::Parallel(effects) => Effect::Parallel(
                    effects
                        .into_iter()
                        .map(|effect| effect.map_shared(Arc::clone(&f)))
                        .collect(),
                ),
                Effect::Sequential(effects) => Effect::Sequential(
                    effects
                        .into_iter()
                        .map(|effect| effect.map_shared(Arc::clone(&f)))
                        .collect(),
                ),
                Effect::Delay { duration, action } => Effect::Delay {
                    duration,
                    action: Box::new(f(*action)),
                },
                Effect::Future(future) => {
                    Effect::Future(Box::pin(async move { future.await.map(|a| f(a)) }))
                }
            }
        }
    }
}

/// Environment module - dependency injection traits shared by all screens
pub mod environment {
    use chrono::{DateTime, NaiveDate, Utc};

    /// Clock trait - abstracts time operations for testability
    ///
    /// The wave form uses the clock to default start dates to "today".
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;

        /// Today's date in UTC
        fn today(&self) -> NaiveDate {
            self.now().date_naive()
        }
    }

    /// Production clock backed by the system time
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::effect::Effect;
    use super::environment::{Clock, SystemClock};
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum Child {
        Loaded(u32),
    }

    #[derive(Debug, PartialEq)]
    enum Parent {
        Child(Child),
    }

    #[tokio::test]
    async fn map_lifts_future_output() {
        let effect: Effect<Child> = Effect::future(async { Some(Child::Loaded(7)) });
        let mapped = effect.map(Parent::Child);

        let Effect::Future(future) = mapped else {
            panic!("expected a future effect");
        };
        assert_eq!(future.await, Some(Parent::Child(Child::Loaded(7))));
    }

    #[test]
    fn map_lifts_delayed_action() {
        let effect = Effect::Delay {
            duration: Duration::from_secs(5),
            action: Box::new(Child::Loaded(1)),
        };

        match effect.map(Parent::Child) {
            Effect::Delay { duration, action } => {
                assert_eq!(duration, Duration::from_secs(5));
                assert_eq!(*action, Parent::Child(Child::Loaded(1)));
            }
            other => panic!("unexpected effect {other:?}"),
        }
    }

    #[test]
    fn map_preserves_structure() {
        let effect: Effect<Child> = Effect::chain(vec![Effect::None, Effect::merge(vec![])]);
        let Effect::Sequential(inner) = effect.map(Parent::Child) else {
            panic!("expected sequential");
        };
        assert_eq!(inner.len(), 2);
        assert!(inner[0].is_none());
        assert!(matches!(inner[1], Effect::Parallel(ref v) if v.is_empty()));
    }

    #[test]
    fn system_clock_today_matches_now() {
        let clock = SystemClock;
        assert_eq!(clock.today(), clock.now().date_naive());
    }
}
