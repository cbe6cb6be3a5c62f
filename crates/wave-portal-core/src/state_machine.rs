use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle of a single wave submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubmissionStatus {
    #[default]
    Idle,
    Pending,
    Confirmed,
    Failed,
}

impl SubmissionStatus {
    /// True from transaction acceptance until confirmation or failure.
    pub fn in_flight(self) -> bool {
        matches!(self, SubmissionStatus::Pending)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionAction {
    Send,
    Confirm,
    Fail,
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateTransition {
    pub from: SubmissionStatus,
    pub to: SubmissionStatus,
    pub action: SubmissionAction,
    pub reason: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal submission transition: {from:?} via {action:?}")]
pub struct TransitionError {
    pub from: SubmissionStatus,
    pub action: SubmissionAction,
}

pub fn submission_transition(
    from: SubmissionStatus,
    action: SubmissionAction,
) -> Result<(SubmissionStatus, StateTransition), TransitionError> {
    use SubmissionAction as A;
    use SubmissionStatus as S;

    let (to, reason) = match (from, action) {
        (S::Idle, A::Send) => (S::Pending, "transaction accepted into pending pool"),
        (S::Pending, A::Confirm) => (S::Confirmed, "transaction confirmed"),
        (S::Idle, A::Fail) => (S::Failed, "send failed"),
        (S::Pending, A::Fail) => (S::Failed, "confirmation failed"),
        (S::Confirmed, A::Reset) | (S::Failed, A::Reset) => (S::Idle, "ready for next wave"),
        _ => return Err(TransitionError { from, action }),
    };

    Ok((
        to,
        StateTransition {
            from,
            to,
            action,
            reason,
        },
    ))
}
