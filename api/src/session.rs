//! Session event bus
//!
//! A process-wide broadcast that lets every interested store resynchronise
//! with the session without wiring callbacks between them. The HTTP client
//! publishes [`SessionEvent::Unauthorized`] from its `401` interceptor; the
//! auth reducer publishes [`SessionEvent::AuthStateChanged`] after login and
//! logout.

use tokio::sync::broadcast;

/// Capacity of the broadcast channel; lagging receivers skip old events
const CHANNEL_CAPACITY: usize = 32;

/// Something happened to the session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// Login or logout completed; consumers should re-validate
    AuthStateChanged,
    /// The backend answered `401`; the session is gone
    Unauthorized,
}

/// Cloneable handle to the session broadcast
#[derive(Debug, Clone)]
pub struct SessionEvents {
    sender: broadcast::Sender<SessionEvent>,
}

impl SessionEvents {
    /// Create a new, independent bus
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event to every current subscriber
    ///
    /// Publishing with no subscribers is not an error.
    pub fn publish(&self, event: SessionEvent) {
        let receivers = self.sender.send(event).unwrap_or(0);
        tracing::debug!(?event, receivers, "Session event published");
    }

    /// Subscribe to events published from now on
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.sender.subscribe()
    }
}

impl Default for SessionEvents {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_subscriber_sees_the_event() {
        let bus = SessionEvents::new();
        let mut first = bus.subscribe();
        let mut second = bus.clone().subscribe();

        bus.publish(SessionEvent::Unauthorized);

        assert_eq!(first.recv().await.unwrap(), SessionEvent::Unauthorized);
        assert_eq!(second.recv().await.unwrap(), SessionEvent::Unauthorized);
    }

    #[test]
    fn publishing_without_subscribers_is_fine() {
        SessionEvents::new().publish(SessionEvent::AuthStateChanged);
    }
}
