//! Lifecycle state machines
//!
//! Every lifecycle is a closed enum plus an exhaustive transition table.
//! Status is never written directly; [`Lifecycle::transition`] checks the
//! table and refuses anything not listed in it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MatchEngineError, Result};

/// A finite-state lifecycle with a fixed transition table
pub trait Lifecycle: Copy + Eq + fmt::Display + fmt::Debug + 'static {
    /// Entity name used in transition errors
    const ENTITY: &'static str;

    /// Every permitted `(from, to)` edge
    fn transitions() -> &'static [(Self, Self)];

    fn can_transition_to(self, next: Self) -> bool {
        Self::transitions().iter().any(|&(from, to)| from == self && to == next)
    }

    /// States with no outgoing edge
    fn is_terminal(self) -> bool {
        !Self::transitions().iter().any(|&(from, _)| from == self)
    }

    /// Validate a transition, returning the new state
    fn transition(self, next: Self) -> Result<Self> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(MatchEngineError::invalid_transition(Self::ENTITY, self, next))
        }
    }
}

/// Batch matching: a client browsing suggested assistants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionStatus {
    Suggested,
    Reviewed,
    Accepted,
    Rejected,
    Expired,
    Completed,
}

impl SuggestionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggested => "suggested",
            Self::Reviewed => "reviewed",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Expired => "expired",
            Self::Completed => "completed",
        }
    }
}

const SUGGESTION_TRANSITIONS: &[(SuggestionStatus, SuggestionStatus)] = &[
    (SuggestionStatus::Suggested, SuggestionStatus::Reviewed),
    (SuggestionStatus::Suggested, SuggestionStatus::Expired),
    (SuggestionStatus::Reviewed, SuggestionStatus::Accepted),
    (SuggestionStatus::Reviewed, SuggestionStatus::Rejected),
    (SuggestionStatus::Reviewed, SuggestionStatus::Expired),
    (SuggestionStatus::Accepted, SuggestionStatus::Completed),
];

impl Lifecycle for SuggestionStatus {
    const ENTITY: &'static str = "suggestion";

    fn transitions() -> &'static [(Self, Self)] {
        SUGGESTION_TRANSITIONS
    }
}

/// Live routing: work that needs an assistant now
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LiveStatus {
    Waiting,
    InProgress,
    Completed,
    Expired,
}

impl LiveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Waiting => "waiting",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Expired => "expired",
        }
    }
}

const LIVE_TRANSITIONS: &[(LiveStatus, LiveStatus)] = &[
    (LiveStatus::Waiting, LiveStatus::InProgress),
    (LiveStatus::Waiting, LiveStatus::Expired),
    (LiveStatus::InProgress, LiveStatus::Completed),
];

impl Lifecycle for LiveStatus {
    const ENTITY: &'static str = "live assignment";

    fn transitions() -> &'static [(Self, Self)] {
        LIVE_TRANSITIONS
    }
}

/// Reassignment of in-progress work to another assistant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoffStatus {
    Pending,
    Accepted,
    Rejected,
    Completed,
}

impl HandoffStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
            Self::Completed => "completed",
        }
    }
}

const HANDOFF_TRANSITIONS: &[(HandoffStatus, HandoffStatus)] = &[
    (HandoffStatus::Pending, HandoffStatus::Accepted),
    (HandoffStatus::Pending, HandoffStatus::Rejected),
    (HandoffStatus::Accepted, HandoffStatus::Completed),
];

impl Lifecycle for HandoffStatus {
    const ENTITY: &'static str = "handoff";

    fn transitions() -> &'static [(Self, Self)] {
        HANDOFF_TRANSITIONS
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(SuggestionStatus, LiveStatus, HandoffStatus);

/// Status of an assignment, whichever lifecycle it follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "lifecycle", content = "status", rename_all = "snake_case")]
pub enum AssignmentStatus {
    Suggestion(SuggestionStatus),
    Live(LiveStatus),
}

impl AssignmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Suggestion(status) => status.as_str(),
            Self::Live(status) => status.as_str(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        match self {
            Self::Suggestion(status) => status.is_terminal(),
            Self::Live(status) => status.is_terminal(),
        }
    }
}

impl fmt::Display for AssignmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_suggestion_table() {
        use SuggestionStatus::*;
        assert!(Suggested.can_transition_to(Reviewed));
        assert!(!Suggested.can_transition_to(Accepted));
        assert!(Reviewed.can_transition_to(Rejected));
        assert!(!Rejected.can_transition_to(Accepted));
        assert!(Accepted.can_transition_to(Completed));
        assert!(Rejected.is_terminal());
        assert!(Expired.is_terminal());
        assert!(!Accepted.is_terminal());
    }

    #[test]
    fn test_live_table() {
        use LiveStatus::*;
        assert_eq!(Waiting.transition(InProgress).unwrap(), InProgress);
        assert!(InProgress.transition(Expired).is_err());
        assert!(Completed.is_terminal());
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = HandoffStatus::Rejected.transition(HandoffStatus::Accepted).unwrap_err();
        match err {
            MatchEngineError::InvalidTransition { entity, from, to } => {
                assert_eq!(entity, "handoff");
                assert_eq!(from, "rejected");
                assert_eq!(to, "accepted");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_every_state_reachable_or_initial() {
        let initial = [SuggestionStatus::Suggested];
        for state in [
            SuggestionStatus::Reviewed,
            SuggestionStatus::Accepted,
            SuggestionStatus::Rejected,
            SuggestionStatus::Expired,
            SuggestionStatus::Completed,
        ] {
            assert!(
                initial.contains(&state) || SUGGESTION_TRANSITIONS.iter().any(|&(_, to)| to == state),
                "{} unreachable",
                state
            );
        }
    }
}
