// Reconnect state machine for the candle feed transport
use std::time::Duration;

const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting { attempt: u32 },
    Connected,
    ReconnectScheduled { attempt: u32, delay: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// Caller asks for a connection.
    Connect,
    Opened,
    Closed { clean: bool },
    Failed,
    /// The scheduled reconnect delay has passed.
    RetryElapsed,
    /// Caller gives up on the feed.
    Disconnect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Fixed(Duration),
    /// `base * 2^(attempt - 1)`, capped at `max`.
    Exponential { base: Duration, max: Duration },
}

impl Backoff {
    /// Delay before reconnect number `attempt` (1-based).
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base, max } => {
                let factor = 2u32.checked_pow(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
                base.checked_mul(factor).map_or(max, |d| d.min(max))
            }
        }
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::Fixed(DEFAULT_RETRY_DELAY)
    }
}

#[derive(Debug, Clone)]
pub struct FeedConnection {
    state: ConnectionState,
    backoff: Backoff,
    max_attempts: Option<u32>,
}

impl Default for FeedConnection {
    fn default() -> Self {
        FeedConnection::new(Backoff::default(), None)
    }
}

impl FeedConnection {
    /// `max_attempts` bounds consecutive reconnects; `None` retries forever.
    pub fn new(backoff: Backoff, max_attempts: Option<u32>) -> Self {
        FeedConnection {
            state: ConnectionState::Disconnected,
            backoff,
            max_attempts,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == ConnectionState::Connected
    }

    /// Applies `event` and returns the new state. Events that make no sense
    /// in the current state leave it unchanged.
    pub fn handle(&mut self, event: ConnectionEvent) -> ConnectionState {
        use ConnectionEvent as E;
        use ConnectionState as S;

        let next = match (self.state, event) {
            (_, E::Disconnect) => S::Disconnected,
            (S::Disconnected, E::Connect) => S::Connecting { attempt: 0 },
            (S::Connecting { .. }, E::Opened) => S::Connected,
            (S::Connecting { attempt }, E::Failed | E::Closed { clean: false }) => self.schedule(attempt + 1),
            (S::Connected, E::Failed | E::Closed { clean: false }) => self.schedule(1),
            (S::Connecting { .. } | S::Connected, E::Closed { clean: true }) => S::Disconnected,
            (S::ReconnectScheduled { attempt, .. }, E::RetryElapsed) => S::Connecting { attempt },
            (state, event) => {
                tracing::debug!(?state, ?event, "Ignoring feed event");
                state
            }
        };

        if next != self.state {
            match next {
                S::Connected => tracing::info!("Feed connected"),
                S::ReconnectScheduled { attempt, delay } => {
                    tracing::warn!(attempt, delay_secs = delay.as_secs_f64(), "Feed lost, reconnect scheduled")
                }
                S::Disconnected => tracing::info!("Feed disconnected"),
                S::Connecting { attempt } => tracing::debug!(attempt, "Feed connecting"),
            }
        }
        self.state = next;
        next
    }

    fn schedule(&self, attempt: u32) -> ConnectionState {
        if self.max_attempts.is_some_and(|max| attempt > max) {
            tracing::warn!(attempts = attempt - 1, "Max reconnection attempts reached");
            return ConnectionState::Disconnected;
        }
        ConnectionState::ReconnectScheduled {
            attempt,
            delay: self.backoff.delay(attempt),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connect_and_clean_close() {
        let mut conn = FeedConnection::default();
        assert_eq!(conn.handle(ConnectionEvent::Connect), ConnectionState::Connecting { attempt: 0 });
        assert_eq!(conn.handle(ConnectionEvent::Opened), ConnectionState::Connected);
        assert!(conn.is_connected());
        assert_eq!(conn.handle(ConnectionEvent::Closed { clean: true }), ConnectionState::Disconnected);
    }

    #[test]
    fn test_unclean_close_schedules_fixed_retry() {
        let mut conn = FeedConnection::default();
        conn.handle(ConnectionEvent::Connect);
        conn.handle(ConnectionEvent::Opened);
        assert_eq!(
            conn.handle(ConnectionEvent::Closed { clean: false }),
            ConnectionState::ReconnectScheduled {
                attempt: 1,
                delay: Duration::from_secs(5)
            }
        );
        assert_eq!(conn.handle(ConnectionEvent::RetryElapsed), ConnectionState::Connecting { attempt: 1 });
        assert_eq!(conn.handle(ConnectionEvent::Opened), ConnectionState::Connected);
    }

    #[test]
    fn test_repeated_failures_count_attempts() {
        let backoff = Backoff::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
        };
        let mut conn = FeedConnection::new(backoff, Some(3));
        conn.handle(ConnectionEvent::Connect);

        for (attempt, secs) in [(1, 1), (2, 2), (3, 4)] {
            assert_eq!(
                conn.handle(ConnectionEvent::Failed),
                ConnectionState::ReconnectScheduled {
                    attempt,
                    delay: Duration::from_secs(secs)
                }
            );
            conn.handle(ConnectionEvent::RetryElapsed);
        }
        assert_eq!(conn.handle(ConnectionEvent::Failed), ConnectionState::Disconnected);
    }

    #[test]
    fn test_successful_open_resets_attempts() {
        let mut conn = FeedConnection::new(Backoff::default(), Some(1));
        conn.handle(ConnectionEvent::Connect);
        conn.handle(ConnectionEvent::Failed);
        conn.handle(ConnectionEvent::RetryElapsed);
        conn.handle(ConnectionEvent::Opened);
        assert!(matches!(
            conn.handle(ConnectionEvent::Failed),
            ConnectionState::ReconnectScheduled { attempt: 1, .. }
        ));
    }

    #[test]
    fn test_exponential_backoff_is_capped() {
        let backoff = Backoff::Exponential {
            base: Duration::from_secs(1),
            max: Duration::from_secs(60),
        };
        assert_eq!(backoff.delay(1), Duration::from_secs(1));
        assert_eq!(backoff.delay(6), Duration::from_secs(32));
        assert_eq!(backoff.delay(7), Duration::from_secs(60));
        assert_eq!(backoff.delay(100), Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_events_are_ignored() {
        let mut conn = FeedConnection::default();
        assert_eq!(conn.handle(ConnectionEvent::Opened), ConnectionState::Disconnected);
        assert_eq!(conn.handle(ConnectionEvent::RetryElapsed), ConnectionState::Disconnected);
        conn.handle(ConnectionEvent::Connect);
        assert_eq!(conn.handle(ConnectionEvent::Connect), ConnectionState::Connecting { attempt: 0 });
    }

    #[test]
    fn test_disconnect_cancels_pending_retry() {
        let mut conn = FeedConnection::default();
        conn.handle(ConnectionEvent::Connect);
        conn.handle(ConnectionEvent::Failed);
        assert_eq!(conn.handle(ConnectionEvent::Disconnect), ConnectionState::Disconnected);
        assert_eq!(conn.handle(ConnectionEvent::RetryElapsed), ConnectionState::Disconnected);
    }
}
