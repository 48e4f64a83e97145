//! Deadline-bounded, cancellable polling primitive

use std::future::Future;
use std::time::Duration;

use contracts::PollPolicy;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// How a poll loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The probe returned `true`
    Ready { elapsed: Duration, polls: u64 },
    /// The deadline passed without the probe succeeding
    TimedOut { elapsed: Duration, polls: u64 },
    /// The cancellation token fired
    Cancelled { elapsed: Duration, polls: u64 },
}

impl PollOutcome {
    pub fn elapsed(&self) -> Duration {
        match self {
            Self::Ready { elapsed, .. }
            | Self::TimedOut { elapsed, .. }
            | Self::Cancelled { elapsed, .. } => *elapsed,
        }
    }

    /// Number of probes performed
    pub fn polls(&self) -> u64 {
        match self {
            Self::Ready { polls, .. }
            | Self::TimedOut { polls, .. }
            | Self::Cancelled { polls, .. } => *polls,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }
}

/// Run `probe` every `policy.interval` until it returns `true`, the
/// deadline passes or `cancel` fires.
///
/// The first probe runs immediately. Sleeps are clamped to the time left, so
/// the last probe happens exactly at the deadline and the loop never
/// oversleeps it. Cancellation interrupts a sleep in progress and always
/// wins over a timeout.
pub async fn poll_until<F, Fut>(
    policy: &PollPolicy,
    cancel: &CancellationToken,
    mut probe: F,
) -> PollOutcome
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let started = Instant::now();
    let interval = policy.effective_interval();
    let mut polls = 0u64;

    loop {
        if cancel.is_cancelled() {
            return PollOutcome::Cancelled {
                elapsed: started.elapsed(),
                polls,
            };
        }

        polls += 1;
        if probe().await {
            return PollOutcome::Ready {
                elapsed: started.elapsed(),
                polls,
            };
        }

        let elapsed = started.elapsed();
        if elapsed >= policy.deadline {
            return PollOutcome::TimedOut { elapsed, polls };
        }

        let nap = interval.min(policy.deadline - elapsed);
        debug!(
            poll = polls,
            elapsed_ms = elapsed.as_millis() as u64,
            next_in_ms = nap.as_millis() as u64,
            "Not ready yet"
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return PollOutcome::Cancelled {
                    elapsed: started.elapsed(),
                    polls,
                };
            }
            _ = tokio::time::sleep(nap) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    fn policy(interval_secs: u64, deadline_secs: u64) -> PollPolicy {
        PollPolicy::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(deadline_secs),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_on_first_poll_after_signal() {
        let started = Instant::now();
        let cancel = CancellationToken::new();

        // Signal appears after 3 intervals
        let outcome = poll_until(&policy(5, 50), &cancel, || async move {
            started.elapsed() >= Duration::from_secs(15)
        })
        .await;

        assert_eq!(
            outcome,
            PollOutcome::Ready {
                elapsed: Duration::from_secs(15),
                polls: 4
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_exactly_at_deadline() {
        let cancel = CancellationToken::new();
        let outcome = poll_until(&policy(3, 10), &cancel, || async { false }).await;

        // Probes at 0, 3, 6, 9 and the clamped final one at 10
        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                elapsed: Duration::from_secs(10),
                polls: 5
            }
        );
        assert_eq!(outcome.polls(), policy(3, 10).max_probes());
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_deadline_probes_once() {
        let cancel = CancellationToken::new();
        let outcome = poll_until(&policy(5, 0), &cancel, || async { false }).await;
        assert_eq!(
            outcome,
            PollOutcome::TimedOut {
                elapsed: Duration::ZERO,
                polls: 1
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_sleep() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(7)).await;
            trigger.cancel();
        });

        let outcome = poll_until(&policy(5, 300), &cancel, || async { false }).await;

        assert_eq!(
            outcome,
            PollOutcome::Cancelled {
                elapsed: Duration::from_secs(7),
                polls: 2
            }
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_already_cancelled_never_probes() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let probes = Arc::new(AtomicU64::new(0));

        let counter = Arc::clone(&probes);
        let outcome = poll_until(&policy(5, 300), &cancel, move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { true }
        })
        .await;

        assert!(matches!(outcome, PollOutcome::Cancelled { polls: 0, .. }));
        assert_eq!(probes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_during_long_interval_is_not_timeout() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        let outcome = poll_until(&policy(20, 30), &cancel, || async { false }).await;
        assert!(matches!(outcome, PollOutcome::Cancelled { .. }));
    }
}
