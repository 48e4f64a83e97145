//! Timing policies shared by the orchestrator and configuration.

use std::time::Duration;

/// Default interval between completion probes
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
/// Default maximum wait for the completion marker
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(300);
/// Default number of submission attempts
pub const DEFAULT_RETRY_BUDGET: u32 = 5;
/// Default fixed pause between submission attempts
pub const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_secs(2);
/// Floor applied to the poll interval so a zero interval cannot spin
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Polling policy: how often to probe and for how long
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    /// Pause between two probes
    pub interval: Duration,
    /// Give up once this much time has elapsed
    pub deadline: Duration,
}

impl PollPolicy {
    pub fn new(interval: Duration, deadline: Duration) -> Self {
        Self { interval, deadline }
    }

    /// Interval actually slept between probes
    pub fn effective_interval(&self) -> Duration {
        self.interval.max(MIN_POLL_INTERVAL)
    }

    /// Upper bound on the number of probes a full wait performs
    ///
    /// Saturates at `u64::MAX` for deadlines too long to count.
    pub fn max_probes(&self) -> u64 {
        let interval = self.effective_interval().as_nanos();
        u64::try_from(self.deadline.as_nanos().div_ceil(interval))
            .unwrap_or(u64::MAX)
            .saturating_add(1)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            deadline: DEFAULT_DEADLINE,
        }
    }
}

/// Retry policy for the submission step: fixed budget, fixed backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub budget: u32,
    /// Pause between attempts
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(budget: u32, backoff: Duration) -> Self {
        Self { budget, backoff }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            budget: DEFAULT_RETRY_BUDGET,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let poll = PollPolicy::default();
        assert_eq!(poll.interval, Duration::from_secs(5));
        assert_eq!(poll.deadline, Duration::from_secs(300));

        let retry = RetryPolicy::default();
        assert_eq!(retry.budget, 5);
        assert_eq!(retry.backoff, Duration::from_secs(2));
    }

    #[test]
    fn test_max_probes() {
        let poll = PollPolicy::new(Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(poll.max_probes(), 11);

        // Last probe lands exactly on the deadline
        let poll = PollPolicy::new(Duration::from_secs(3), Duration::from_secs(10));
        assert_eq!(poll.max_probes(), 5);

        let poll = PollPolicy::new(Duration::ZERO, Duration::from_millis(10));
        assert_eq!(poll.effective_interval(), MIN_POLL_INTERVAL);
        assert_eq!(poll.max_probes(), 11);
    }

    #[test]
    fn test_max_probes_saturates() {
        let poll = PollPolicy::new(Duration::from_millis(1), Duration::from_millis(u64::MAX));
        assert_eq!(poll.max_probes(), u64::MAX);

        let poll = PollPolicy::new(Duration::ZERO, Duration::MAX);
        assert_eq!(poll.max_probes(), u64::MAX);
    }
}
