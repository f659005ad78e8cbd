use std::fmt;

use serde::{Deserialize, Serialize};

/// Lifecycle of a single workflow run.
///
/// Idle → Running → {Cancelled, Completed, Failed}. The three end states are
/// terminal; a new run needs a new workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    Idle,
    Running,
    Cancelled,
    Completed,
    Failed,
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkflowState::Idle => write!(f, "IDLE"),
            WorkflowState::Running => write!(f, "RUNNING"),
            WorkflowState::Cancelled => write!(f, "CANCELLED"),
            WorkflowState::Completed => write!(f, "COMPLETED"),
            WorkflowState::Failed => write!(f, "FAILED"),
        }
    }
}

/// A transition the state machine refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    pub from: WorkflowState,
    pub to: WorkflowState,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid transition {} -> {}", self.from, self.to)
    }
}

impl WorkflowState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            WorkflowState::Cancelled | WorkflowState::Completed | WorkflowState::Failed
        )
    }

    /// Validates `self -> to` and returns the new state.
    ///
    /// - `Idle` may only move to `Running`.
    /// - `Running` may move to any terminal state.
    /// - Terminal states accept nothing.
    pub fn transition(self, to: WorkflowState) -> Result<WorkflowState, InvalidTransition> {
        let allowed = match self {
            WorkflowState::Idle => to == WorkflowState::Running,
            WorkflowState::Running => to.is_terminal(),
            WorkflowState::Cancelled | WorkflowState::Completed | WorkflowState::Failed => false,
        };
        if allowed {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [WorkflowState; 5] = [
        WorkflowState::Idle,
        WorkflowState::Running,
        WorkflowState::Cancelled,
        WorkflowState::Completed,
        WorkflowState::Failed,
    ];

    #[test]
    fn idle_only_starts() {
        assert_eq!(
            WorkflowState::Idle.transition(WorkflowState::Running),
            Ok(WorkflowState::Running)
        );
        for to in [
            WorkflowState::Idle,
            WorkflowState::Cancelled,
            WorkflowState::Completed,
            WorkflowState::Failed,
        ] {
            assert!(WorkflowState::Idle.transition(to).is_err(), "Idle -> {to}");
        }
    }

    #[test]
    fn running_ends_in_any_terminal_state() {
        for to in [
            WorkflowState::Cancelled,
            WorkflowState::Completed,
            WorkflowState::Failed,
        ] {
            assert_eq!(WorkflowState::Running.transition(to), Ok(to));
        }
        assert!(WorkflowState::Running.transition(WorkflowState::Idle).is_err());
        assert!(WorkflowState::Running.transition(WorkflowState::Running).is_err());
    }

    #[test]
    fn terminal_states_are_final() {
        for from in ALL.into_iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert_eq!(
                    from.transition(to),
                    Err(InvalidTransition { from, to }),
                    "{from} -> {to}"
                );
            }
        }
    }

    #[test]
    fn invalid_transition_display() {
        let err = WorkflowState::Completed
            .transition(WorkflowState::Running)
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid transition COMPLETED -> RUNNING");
    }

    #[test]
    fn state_display() {
        assert_eq!(WorkflowState::Idle.to_string(), "IDLE");
        assert_eq!(WorkflowState::Running.to_string(), "RUNNING");
        assert_eq!(WorkflowState::Cancelled.to_string(), "CANCELLED");
        assert_eq!(WorkflowState::Completed.to_string(), "COMPLETED");
        assert_eq!(WorkflowState::Failed.to_string(), "FAILED");
    }
}
