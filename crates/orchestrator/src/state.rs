//! Job state machine
//!
//! `Idle -> Submitting -> Polling -> Collecting -> Done`, with `Failed`
//! reachable from every non-terminal state. No transition skips a state.

use contracts::{ContractError, JobState};
use tracing::debug;

/// Tracks the state of one job and rejects illegal transitions
#[derive(Debug, Clone)]
pub struct JobStateMachine {
    state: JobState,
    history: Vec<JobState>,
}

impl JobStateMachine {
    pub fn new() -> Self {
        Self {
            state: JobState::Idle,
            history: vec![JobState::Idle],
        }
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Every state visited, in order
    pub fn history(&self) -> &[JobState] {
        &self.history
    }

    /// Whether `from -> to` is a legal transition
    pub fn is_allowed(from: JobState, to: JobState) -> bool {
        use JobState::*;

        matches!(
            (from, to),
            (Idle, Submitting)
                | (Submitting, Polling)
                | (Polling, Collecting)
                | (Collecting, Done)
                | (Idle | Submitting | Polling | Collecting, Failed)
        )
    }

    /// Move to `to`
    ///
    /// # Errors
    /// `ContractError::InvalidTransition` when the move is not allowed; the
    /// current state is left unchanged.
    pub fn transition(&mut self, to: JobState) -> Result<JobState, ContractError> {
        let from = self.state;
        if !Self::is_allowed(from, to) {
            return Err(ContractError::InvalidTransition {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        debug!(%from, %to, "Job state transition");
        observability::record_state(to);
        self.state = to;
        self.history.push(to);
        Ok(to)
    }

    /// Move to `Failed` unless already terminal
    pub fn fail(&mut self) -> JobState {
        if !self.state.is_terminal() {
            // Failed is reachable from every non-terminal state
            let _ = self.transition(JobState::Failed);
        }
        self.state
    }
}

impl Default for JobStateMachine {
    fn default() -> Self {
        Self::new()
    }
}
