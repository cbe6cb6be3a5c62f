use thiserror::Error;

use crate::ports::PortError;
use crate::state_machine::TransitionError;

/// Coarse error classes surfaced to the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ProviderAbsent,
    PermissionDenied,
    NotConnected,
    Remote,
    Transition,
    State,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PortalError {
    #[error("no wallet provider detected")]
    ProviderAbsent,
    #[error("wallet permission denied: {0}")]
    PermissionDenied(String),
    #[error("no wallet account connected")]
    NotConnected,
    #[error(transparent)]
    Remote(#[from] PortError),
    #[error(transparent)]
    Transition(#[from] TransitionError),
    #[error("a wave submission is already in progress")]
    SubmissionInProgress,
    #[error("portal state unavailable: {0}")]
    State(String),
}

impl PortalError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PortalError::ProviderAbsent => ErrorKind::ProviderAbsent,
            PortalError::PermissionDenied(_) => ErrorKind::PermissionDenied,
            PortalError::NotConnected => ErrorKind::NotConnected,
            PortalError::Remote(_) => ErrorKind::Remote,
            PortalError::Transition(_) | PortalError::SubmissionInProgress => {
                ErrorKind::Transition
            }
            PortalError::State(_) => ErrorKind::State,
        }
    }
}
