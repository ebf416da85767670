//! # Ticket Verifier Runtime
//!
//! The Store runtime that coordinates reducer execution and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: owns a screen's state, runs its reducer, executes effects
//! - **Feedback loop**: actions produced by effects are reduced again
//! - **`EffectHandle`**: lets callers wait until an action and everything it
//!   cascaded into has finished
//!
//! ## Example
//!
//! ```ignore
//! use ticket_verifier_runtime::Store;
//!
//! let store = Store::new(OrderFormState::default(), OrderFormReducer, env);
//!
//! let mut handle = store.send(OrderFormAction::Submit)?;
//! handle.wait().await;
//!
//! let status = store.state(|s| s.submission.clone());
//! ```

use futures::future::{join_all, BoxFuture};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use ticket_verifier_core::{effect::Effect, reducer::Reducer};
use tokio::sync::{broadcast, watch};

pub use store::Store;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug, Clone, PartialEq, Eq)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Timeout waiting for an action or for effects to settle
        #[error("Timeout waiting for action")]
        Timeout,

        /// Action broadcast channel closed
        #[error("Action broadcast channel closed")]
        ChannelClosed,
    }
}

pub use error::StoreError;

/// Handle for waiting on the effects started by one `send`
///
/// Effects that feed an action back into the store are tracked by the same
/// handle, so `wait` returns only once the whole cascade has settled.
/// A self-rescheduling effect (polling) therefore never completes; wait for a
/// specific action with [`Store::send_and_wait_for`] instead.
#[derive(Clone)]
pub struct EffectHandle {
    pending: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, Tracking) {
        let pending = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            pending: Arc::clone(&pending),
            completion: rx,
        };
        let tracking = Tracking {
            pending,
            notifier: Arc::new(tx),
        };
        (handle, tracking)
    }

    /// A handle with nothing to wait for
    #[must_use]
    pub fn completed() -> Self {
        let (handle, _tracking) = Self::new();
        handle
    }

    /// Number of effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Wait until all tracked effects have completed
    pub async fn wait(&mut self) {
        while self.pending.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

    /// Wait with an upper bound
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Timeout`] if effects are still running when the
    /// timeout elapses.
    pub async fn wait_with_timeout(&mut self, timeout: Duration) -> Result<(), StoreError> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| StoreError::Timeout)
    }
}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.pending())
            .finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct Tracking {
    pending: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl Tracking {
    fn increment(&self) {
        self.pending.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.pending.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }
}

/// The Store and its effect executor
pub mod store {
    use super::{
        broadcast, join_all, Arc, AtomicBool, BoxFuture, Duration, Effect, EffectHandle, Mutex,
        Ordering, PoisonError, Reducer, StoreError, Tracking,
    };

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind a mutex; reducers are synchronous so the lock is
    ///    never held across an await point)
    /// 2. Reducer (console logic)
    /// 3. Environment (API client, storage, clock)
    /// 4. Effect execution, feeding produced actions back into the reducer
    ///
    /// Cloning a Store is cheap and yields another handle to the same state.
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        inner: Arc<Inner<S, A, E, R>>,
    }

    struct Inner<S, A, E, R> {
        state: Mutex<S>,
        reducer: R,
        environment: E,
        shutdown: AtomicBool,
        /// Every action produced by an effect is broadcast here.
        action_broadcast: broadcast::Sender<A>,
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        fn clone(&self) -> Self {
            Self {
                inner: Arc::clone(&self.inner),
            }
        }
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self::with_broadcast_capacity(initial_state, reducer, environment, 64)
        }

        /// Create a store with a custom action broadcast capacity
        #[must_use]
        pub fn with_broadcast_capacity(
            initial_state: S,
            reducer: R,
            environment: E,
            capacity: usize,
        ) -> Self {
            let (action_broadcast, _) = broadcast::channel(capacity.max(1));
            Self {
                inner: Arc::new(Inner {
                    state: Mutex::new(initial_state),
                    reducer,
                    environment,
                    shutdown: AtomicBool::new(false),
                    action_broadcast,
                }),
            }
        }

        /// Send an action to the store
        ///
        /// The reducer runs immediately on the caller's thread; effects are
        /// spawned on the current tokio runtime.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] after [`Store::shutdown`].
        #[tracing::instrument(skip_all, name = "store_send")]
        pub fn send(&self, action: A) -> Result<EffectHandle, StoreError> {
            if self.inner.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            let (handle, tracking) = EffectHandle::new();
            self.dispatch(action, &tracking);
            Ok(handle)
        }

        /// Send an action and wait for a matching action produced by effects
        ///
        /// Subscribes before sending so the result cannot be missed.
        ///
        /// # Errors
        ///
        /// - [`StoreError::Timeout`]: no matching action within `timeout`
        /// - [`StoreError::ChannelClosed`]: the broadcast channel closed
        /// - [`StoreError::ShutdownInProgress`]: the store is shutting down
        pub async fn send_and_wait_for<F>(
            &self,
            action: A,
            predicate: F,
            timeout: Duration,
        ) -> Result<A, StoreError>
        where
            F: Fn(&A) -> bool,
        {
            let mut rx = self.inner.action_broadcast.subscribe();
            let _handle = self.send(action)?;

            tokio::time::timeout(timeout, async {
                loop {
                    match rx.recv().await {
                        Ok(action) if predicate(&action) => return Ok(action),
                        Ok(_) => {}
                        Err(broadcast::error::RecvError::Lagged(skipped)) => {
                            tracing::warn!(skipped, "Action observer lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => {
                            return Err(StoreError::ChannelClosed);
                        }
                    }
                }
            })
            .await
            .map_err(|_| StoreError::Timeout)?
        }

        /// Subscribe to actions produced by effects
        #[must_use]
        pub fn subscribe_actions(&self) -> broadcast::Receiver<A> {
            self.inner.action_broadcast.subscribe()
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let total = store.state(|s| s.quote().total);
        /// ```
        pub fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
            f(&state)
        }

        /// Access the environment the store was built with
        #[must_use]
        pub fn environment(&self) -> &E {
            &self.inner.environment
        }

        /// Stop accepting actions
        ///
        /// Effects already running finish, but their results are dropped, which
        /// also ends any polling loop.
        pub fn shutdown(&self) {
            tracing::debug!("Store shutting down");
            self.inner.shutdown.store(true, Ordering::Release);
        }

        /// Returns `true` once [`Store::shutdown`] has been called
        #[must_use]
        pub fn is_shut_down(&self) -> bool {
            self.inner.shutdown.load(Ordering::Acquire)
        }

        fn dispatch(&self, action: A, tracking: &Tracking) {
            let effects = {
                let mut state = self.inner.state.lock().unwrap_or_else(PoisonError::into_inner);
                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();
                self.inner
                    .reducer
                    .reduce(&mut state, action, &self.inner.environment)
            };

            metrics::counter!("store.actions.total").increment(1);
            #[allow(clippy::cast_precision_loss)]
            metrics::histogram!("store.effects.count").record(effects.len() as f64);
            tracing::trace!(effects = effects.len(), "Reducer completed");

            for effect in effects {
                self.execute(effect, tracking.clone());
            }
        }

        fn execute(&self, effect: Effect<A>, tracking: Tracking) {
            if effect.is_none() {
                return;
            }

            tracking.increment();
            let store = self.clone();
            tokio::spawn(async move {
                store.run(effect, tracking.clone()).await;
                tracking.decrement();
            });
        }

        fn run(&self, effect: Effect<A>, tracking: Tracking) -> BoxFuture<'static, ()> {
            let store = self.clone();
            Box::pin(async move {
                match effect {
                    Effect::None => {}
                    Effect::Future(future) => {
                        if let Some(action) = future.await {
                            store.feedback(action, &tracking);
                        }
                    }
                    Effect::Delay { duration, action } => {
                        tokio::time::sleep(duration).await;
                        store.feedback(*action, &tracking);
                    }
                    Effect::Parallel(effects) => {
                        join_all(
                            effects
                                .into_iter()
                                .map(|effect| store.run(effect, tracking.clone())),
                        )
                        .await;
                    }
                    Effect::Sequential(effects) => {
                        for effect in effects {
                            store.run(effect, tracking.clone()).await;
                        }
                    }
                }
            })
        }

        fn feedback(&self, action: A, tracking: &Tracking) {
            if self.inner.shutdown.load(Ordering::Acquire) {
                tracing::debug!("Dropping effect result: store is shutting down");
                return;
            }
            let _ = self.inner.action_broadcast.send(action.clone());
            self.dispatch(action, tracking);
        }
    }
}
