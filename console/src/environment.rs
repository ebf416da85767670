//! Dependencies injected into every console reducer

use std::sync::Arc;
use std::time::Duration;

use ticket_verifier_api::{LocalStore, SessionEvents, TicketApi};
use ticket_verifier_core::environment::Clock;

/// Environment shared by the auth, order form, and dashboard reducers
#[derive(Clone)]
pub struct ConsoleEnvironment {
    /// Backend client
    pub api: Arc<dyn TicketApi>,
    /// Local key-value storage (drafts, selected tab, legacy token)
    pub storage: Arc<dyn LocalStore>,
    /// Clock for form defaults
    pub clock: Arc<dyn Clock>,
    /// Session event bus
    pub session: SessionEvents,
    /// Current-wave polling interval; `None` disables polling
    pub poll_interval: Option<Duration>,
}

impl ConsoleEnvironment {
    /// Creates a new `ConsoleEnvironment` with polling disabled
    #[must_use]
    pub fn new(
        api: Arc<dyn TicketApi>,
        storage: Arc<dyn LocalStore>,
        clock: Arc<dyn Clock>,
        session: SessionEvents,
    ) -> Self {
        Self {
            api,
            storage,
            clock,
            session,
            poll_interval: None,
        }
    }

    /// Enable current-wave polling
    #[must_use]
    pub const fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }
}

impl std::fmt::Debug for ConsoleEnvironment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsoleEnvironment")
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}
