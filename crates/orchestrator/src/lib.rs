//! # Orchestrator
//!
//! External-worker pipeline orchestration core.
//!
//! Responsibilities:
//! - Submit job inputs to the shared store with bounded retry
//! - Poll for the completion marker under a deadline, cancellable
//! - Collect declared artifacts (required / optional)
//! - Drive the job state machine and guarantee worker teardown
//!
//! ## Flow
//!
//! ```text
//! start worker -> submit -> poll until (done | timeout | cancel) -> collect
//!       \______________________ teardown (exactly once) ______________/
//! ```

pub mod collect;
pub mod diagnostics;
pub mod guard;
pub mod orchestrator;
pub mod poll;
pub mod state;
pub mod submit;

pub use collect::{collect_outputs, Collected};
pub use diagnostics::best_effort;
pub use guard::TeardownGuard;
pub use orchestrator::Orchestrator;
pub use poll::{poll_until, PollOutcome};
pub use state::JobStateMachine;
pub use submit::{submit, SubmissionOutcome};
pub use tokio_util::sync::CancellationToken;
