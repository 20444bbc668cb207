//! Assignment and handoff records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::states::{AssignmentStatus, HandoffStatus, LiveStatus, SuggestionStatus};
use crate::assignment::Reservation;
use crate::profile::{AssistantId, Hours};

/// Assignment identifier
pub type AssignmentId = Uuid;

/// Links one request to one assistant and the capacity held for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub assignment_id: AssignmentId,

    /// Client, chat or task that asked for help
    pub requester_id: String,

    /// Unset while a live request is still waiting
    pub assistant_id: Option<AssistantId>,

    /// Weekly hours requested
    pub hours: Hours,

    pub status: AssignmentStatus,

    /// Capacity currently held for this assignment
    pub reservation: Option<Reservation>,

    /// Composite score of the suggestion, for batch matches
    pub match_score: Option<u8>,

    /// Live routing priority, lower is more urgent
    pub priority: u8,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    /// When capacity was committed: suggestion accepted, or live work started
    pub accepted_at: Option<DateTime<Utc>>,
    /// When the assignment reached a terminal state
    pub completed_at: Option<DateTime<Utc>>,
}

impl Assignment {
    pub(crate) fn suggestion(
        requester_id: &str,
        assistant_id: AssistantId,
        hours: Hours,
        match_score: u8,
    ) -> Self {
        let now = Utc::now();
        Self {
            assignment_id: Uuid::new_v4(),
            requester_id: requester_id.to_string(),
            assistant_id: Some(assistant_id),
            hours,
            status: AssignmentStatus::Suggestion(SuggestionStatus::Suggested),
            reservation: None,
            match_score: Some(match_score),
            priority: 0,
            created_at: now,
            updated_at: now,
            reviewed_at: None,
            accepted_at: None,
            completed_at: None,
        }
    }

    pub(crate) fn live(requester_id: &str, hours: Hours, priority: u8) -> Self {
        let now = Utc::now();
        Self {
            assignment_id: Uuid::new_v4(),
            requester_id: requester_id.to_string(),
            assistant_id: None,
            hours,
            status: AssignmentStatus::Live(LiveStatus::Waiting),
            reservation: None,
            match_score: None,
            priority,
            created_at: now,
            updated_at: now,
            reviewed_at: None,
            accepted_at: None,
            completed_at: None,
        }
    }

    /// Whether the assignment currently holds assistant capacity
    pub fn is_active(&self) -> bool {
        matches!(
            self.status,
            AssignmentStatus::Suggestion(SuggestionStatus::Accepted) | AssignmentStatus::Live(LiveStatus::InProgress)
        )
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Reassignment of active work to another assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Handoff {
    pub handoff_id: Uuid,
    pub assignment_id: AssignmentId,
    pub from_assistant: AssistantId,
    pub to_assistant: AssistantId,
    pub hours: Hours,
    pub status: HandoffStatus,
    pub reason: Option<String>,

    /// Reservation on the originating assistant that could not be released
    /// when the handoff was accepted
    ///
    /// The old assistant stays over-counted until this is released through
    /// [`crate::engine::MatchEngine::release_reservation`].
    pub unreleased: Option<Reservation>,

    pub requested_at: DateTime<Utc>,
    pub responded_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}
