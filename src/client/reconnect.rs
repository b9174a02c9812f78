use std::time::{Duration, Instant};

/// Reconnect policy: immediate first attempt, then a fixed 1s interval
/// between subsequent attempts — deliberately not exponential backoff.
/// The budget bounds total elapsed time, not attempt count; `None` means
/// unbounded.
pub struct ReconnectPolicy {
    interval: Duration,
    budget: Option<Duration>,
    started_at: Option<Instant>,
    attempts: usize,
}

impl ReconnectPolicy {
    pub fn new(budget: Option<Duration>) -> Self {
        Self {
            interval: Duration::from_secs(1),
            budget,
            started_at: None,
            attempts: 0,
        }
    }

    /// Call once when entering `Reconnecting`.
    pub fn begin(&mut self) {
        self.started_at = Some(Instant::now());
        self.attempts = 0;
    }

    pub fn reset(&mut self) {
        self.started_at = None;
        self.attempts = 0;
    }

    /// Returns the delay before the next attempt, or `None` if the
    /// reconnect budget has been exhausted and the session should move
    /// to `Disconnected(Fatal)`.
    pub fn next_delay(&mut self) -> Option<Duration> {
        let started_at = *self.started_at.get_or_insert_with(Instant::now);
        if let Some(budget) = self.budget {
            if started_at.elapsed() >= budget {
                return None;
            }
        }
        let delay = if self.attempts == 0 {
            Duration::ZERO
        } else {
            self.interval
        };
        self.attempts += 1;
        Some(delay)
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_is_immediate() {
        let mut policy = ReconnectPolicy::new(None);
        policy.begin();
        assert_eq!(policy.next_delay(), Some(Duration::ZERO));
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(1)));
        assert_eq!(policy.next_delay(), Some(Duration::from_secs(1)));
    }

    #[test]
    fn budget_exhaustion_returns_none() {
        let mut policy = ReconnectPolicy::new(Some(Duration::from_millis(1)));
        policy.begin();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(policy.next_delay(), None);
    }

    #[test]
    fn reset_restarts_the_budget_window() {
        let mut policy = ReconnectPolicy::new(Some(Duration::from_secs(10)));
        policy.begin();
        policy.next_delay();
        policy.reset();
        policy.begin();
        assert_eq!(policy.attempts(), 0);
    }
}
