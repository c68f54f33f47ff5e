use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a project.
///
/// Normal operation moves strictly forward through
/// `Created -> Ready -> Processing -> Completed`; `Error` is reachable from
/// any non-terminal state to record an unrecoverable worker failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProjectState {
    Created,
    Ready,
    Processing,
    Completed,
    Error,
}

impl ProjectState {
    /// Terminal states accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, ProjectState::Completed | ProjectState::Error)
    }

    /// Whether moving from `self` to `next` is a legal transition.
    ///
    /// Backwards transitions are never legal and the `Ready` gate cannot be
    /// skipped on the way to `Processing`.
    pub fn can_transition_to(self, next: ProjectState) -> bool {
        match (self, next) {
            (ProjectState::Created, ProjectState::Ready)
            | (ProjectState::Ready, ProjectState::Processing)
            | (ProjectState::Processing, ProjectState::Completed) => true,
            (from, ProjectState::Error) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for ProjectState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProjectState::Created => "Created",
            ProjectState::Ready => "Ready",
            ProjectState::Processing => "Processing",
            ProjectState::Completed => "Completed",
            ProjectState::Error => "Error",
        };
        write!(f, "{name}")
    }
}
