//! Assignment manager
//!
//! Owns assignment and handoff records and moves them through their
//! lifecycles. Each record sits behind its own async mutex, which is held
//! across the reservation call for that record, so two callers acting on the
//! same assignment are serialized while unrelated assignments never wait on
//! each other.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use super::records::{Assignment, AssignmentId, Handoff};
use super::states::{AssignmentStatus, HandoffStatus, Lifecycle, LiveStatus, SuggestionStatus};
use crate::assignment::{AssignOutcome, AssignmentCoordinator, Reservation};
use crate::error::{MatchEngineError, Result};
use crate::events::{AssignmentEvent, AssignmentEvents, EventKind};
use crate::profile::{AssistantId, AssistantProfile, Hours};
use crate::scoring::MatchResult;

/// Result of accepting a reviewed suggestion
#[derive(Debug, Clone, PartialEq)]
pub enum AcceptOutcome {
    /// Capacity reserved, suggestion accepted
    Accepted(Assignment),
    /// The assistant has no room left; the suggestion stays reviewed
    NoCapacity(Assignment),
}

/// Result of routing a waiting live request
#[derive(Debug, Clone, PartialEq)]
pub enum RouteOutcome {
    Routed(Assignment),
    /// Nobody could take it; the request is still waiting
    Waiting(Assignment),
}

/// Result of accepting a handoff
#[derive(Debug, Clone, PartialEq)]
pub enum HandoffOutcome {
    Accepted(Handoff),
    /// The receiving assistant has no room; the handoff stays pending
    NoCapacity(Handoff),
}

/// Counts by lifecycle state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentStats {
    pub total: usize,
    pub suggested: usize,
    pub reviewed: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub waiting: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub expired: usize,
    pub handoffs_pending: usize,
    pub handoffs_accepted: usize,
}

pub struct AssignmentManager {
    coordinator: Arc<AssignmentCoordinator>,
    events: AssignmentEvents,
    assignments: DashMap<AssignmentId, Arc<Mutex<Assignment>>>,
    handoffs: DashMap<Uuid, Arc<Mutex<Handoff>>>,
}

impl AssignmentManager {
    pub fn new(coordinator: Arc<AssignmentCoordinator>, events: AssignmentEvents) -> Self {
        Self {
            coordinator,
            events,
            assignments: DashMap::new(),
            handoffs: DashMap::new(),
        }
    }

    pub fn coordinator(&self) -> &Arc<AssignmentCoordinator> {
        &self.coordinator
    }

    pub fn events(&self) -> &AssignmentEvents {
        &self.events
    }

    fn entry(&self, id: &AssignmentId) -> Result<Arc<Mutex<Assignment>>> {
        self.assignments
            .get(id)
            .map(|e| e.value().clone())
            .ok_or_else(|| MatchEngineError::not_found(format!("assignment {}", id)))
    }

    fn handoff_entry(&self, id: &Uuid) -> Result<Arc<Mutex<Handoff>>> {
        self.handoffs
            .get(id)
            .map(|e| e.value().clone())
            .ok_or_else(|| MatchEngineError::not_found(format!("handoff {}", id)))
    }

    async fn insert(&self, assignment: Assignment) -> Assignment {
        let event = AssignmentEvent::new(
            kind_of(&assignment.status),
            assignment.assignment_id,
            assignment.requester_id.clone(),
            assignment.assistant_id.clone(),
            None,
            assignment.status.as_str(),
        );
        self.assignments
            .insert(assignment.assignment_id, Arc::new(Mutex::new(assignment.clone())));
        self.events.publish(event).await;
        assignment
    }

    /// Move a locked assignment to `next` and publish the transition
    async fn apply(&self, assignment: &mut Assignment, next: AssignmentStatus) -> Result<()> {
        let previous = assignment.status;
        assignment.status = match (previous, next) {
            (AssignmentStatus::Suggestion(from), AssignmentStatus::Suggestion(to)) => {
                AssignmentStatus::Suggestion(from.transition(to)?)
            }
            (AssignmentStatus::Live(from), AssignmentStatus::Live(to)) => AssignmentStatus::Live(from.transition(to)?),
            (from, to) => return Err(MatchEngineError::invalid_transition("assignment", from, to)),
        };

        let now = Utc::now();
        assignment.updated_at = now;
        if assignment.status.is_terminal() {
            assignment.completed_at = Some(now);
        }

        info!(
            "🔄 Assignment {} {} -> {}",
            assignment.assignment_id, previous, assignment.status
        );
        self.events
            .publish(AssignmentEvent::new(
                kind_of(&assignment.status),
                assignment.assignment_id,
                assignment.requester_id.clone(),
                assignment.assistant_id.clone(),
                Some(previous.as_str()),
                assignment.status.as_str(),
            ))
            .await;
        Ok(())
    }

    /// Check a transition without applying it
    fn check(assignment: &Assignment, next: AssignmentStatus) -> Result<()> {
        let allowed = match (assignment.status, next) {
            (AssignmentStatus::Suggestion(from), AssignmentStatus::Suggestion(to)) => from.can_transition_to(to),
            (AssignmentStatus::Live(from), AssignmentStatus::Live(to)) => from.can_transition_to(to),
            _ => false,
        };
        if allowed {
            Ok(())
        } else {
            let entity = match assignment.status {
                AssignmentStatus::Suggestion(_) => SuggestionStatus::ENTITY,
                AssignmentStatus::Live(_) => LiveStatus::ENTITY,
            };
            Err(MatchEngineError::invalid_transition(entity, assignment.status, next))
        }
    }

    // Suggestion lifecycle

    /// Record one `suggested` assignment per ranked match
    ///
    /// No capacity is reserved at suggestion time.
    pub async fn create_suggestions(
        &self,
        requester_id: &str,
        matches: &[MatchResult],
        hours: Hours,
    ) -> Vec<Assignment> {
        let mut created = Vec::with_capacity(matches.len());
        for result in matches {
            let assignment = Assignment::suggestion(requester_id, result.assistant_id.clone(), hours, result.score);
            created.push(self.insert(assignment).await);
        }
        info!("💡 Created {} suggestions for {}", created.len(), requester_id);
        created
    }

    pub async fn mark_reviewed(&self, id: &AssignmentId) -> Result<Assignment> {
        let entry = self.entry(id)?;
        let mut assignment = entry.lock().await;
        self.apply(&mut assignment, AssignmentStatus::Suggestion(SuggestionStatus::Reviewed))
            .await?;
        assignment.reviewed_at = Some(assignment.updated_at);
        Ok(assignment.clone())
    }

    /// Accept a reviewed suggestion, reserving capacity on its assistant
    pub async fn accept_suggestion(&self, id: &AssignmentId) -> Result<AcceptOutcome> {
        let entry = self.entry(id)?;
        let mut assignment = entry.lock().await;
        let accepted = AssignmentStatus::Suggestion(SuggestionStatus::Accepted);
        Self::check(&assignment, accepted)?;

        let assistant_id = assignment
            .assistant_id
            .clone()
            .ok_or_else(|| MatchEngineError::internal(format!("suggestion {} has no assistant", id)))?;

        match self.coordinator.assign(&[assistant_id], assignment.hours).await? {
            AssignOutcome::Committed(reservation) => {
                assignment.reservation = Some(reservation);
                self.apply(&mut assignment, accepted).await?;
                assignment.accepted_at = Some(assignment.updated_at);
                Ok(AcceptOutcome::Accepted(assignment.clone()))
            }
            AssignOutcome::Exhausted { .. } => {
                warn!("Suggestion {} could not be accepted: assistant has no capacity", id);
                Ok(AcceptOutcome::NoCapacity(assignment.clone()))
            }
        }
    }

    pub async fn reject_suggestion(&self, id: &AssignmentId) -> Result<Assignment> {
        let entry = self.entry(id)?;
        let mut assignment = entry.lock().await;
        self.apply(&mut assignment, AssignmentStatus::Suggestion(SuggestionStatus::Rejected))
            .await?;
        Ok(assignment.clone())
    }

    // Live routing lifecycle

    /// Record a live request in `waiting`
    pub async fn open_live(&self, requester_id: &str, hours: Hours, priority: u8) -> Result<Assignment> {
        if hours.is_zero() {
            return Err(MatchEngineError::validation("requested hours must be greater than zero"));
        }
        Ok(self.insert(Assignment::live(requester_id, hours, priority)).await)
    }

    /// Try to start a waiting request on the least-loaded assistant in `pool`
    pub async fn route_live(&self, id: &AssignmentId, pool: &[AssistantProfile]) -> Result<RouteOutcome> {
        let entry = self.entry(id)?;
        let mut assignment = entry.lock().await;
        let in_progress = AssignmentStatus::Live(LiveStatus::InProgress);
        Self::check(&assignment, in_progress)?;

        match self.coordinator.assign_least_loaded(pool, assignment.hours).await? {
            AssignOutcome::Committed(reservation) => {
                assignment.assistant_id = Some(reservation.assistant_id.clone());
                assignment.reservation = Some(reservation);
                self.apply(&mut assignment, in_progress).await?;
                assignment.accepted_at = Some(assignment.updated_at);
                Ok(RouteOutcome::Routed(assignment.clone()))
            }
            AssignOutcome::Exhausted { .. } => Ok(RouteOutcome::Waiting(assignment.clone())),
        }
    }

    /// Link an already committed reservation to a new `in_progress` assignment
    ///
    /// This is the second half of a direct assignment. If the caller abandons
    /// the request between the reservation and this call, it must release the
    /// reservation instead.
    pub async fn create_in_progress(
        &self,
        requester_id: &str,
        reservation: Reservation,
        match_score: Option<u8>,
    ) -> Result<Assignment> {
        if !self.coordinator.is_outstanding(&reservation.reservation_id) {
            return Err(MatchEngineError::not_found(format!(
                "reservation {} is not outstanding",
                reservation.reservation_id
            )));
        }

        let mut assignment = Assignment::live(requester_id, reservation.hours, 0);
        let now = Utc::now();
        assignment.status = AssignmentStatus::Live(LiveStatus::InProgress);
        assignment.assistant_id = Some(reservation.assistant_id.clone());
        assignment.reservation = Some(reservation);
        assignment.match_score = match_score;
        assignment.accepted_at = Some(now);
        Ok(self.insert(assignment).await)
    }

    // Shared terminal transitions

    /// Finish active work and release its capacity
    pub async fn complete(&self, id: &AssignmentId) -> Result<Assignment> {
        let entry = self.entry(id)?;
        let mut assignment = entry.lock().await;
        let next = match assignment.status {
            AssignmentStatus::Suggestion(_) => AssignmentStatus::Suggestion(SuggestionStatus::Completed),
            AssignmentStatus::Live(_) => AssignmentStatus::Live(LiveStatus::Completed),
        };
        Self::check(&assignment, next)?;

        if let Some(reservation) = assignment.reservation.clone() {
            self.coordinator.release(&reservation).await?;
            assignment.reservation = None;
        }
        self.apply(&mut assignment, next).await?;
        Ok(assignment.clone())
    }

    /// Expire a suggestion that was never acted on, or a request that waited too long
    pub async fn expire(&self, id: &AssignmentId) -> Result<Assignment> {
        let entry = self.entry(id)?;
        let mut assignment = entry.lock().await;
        let next = match assignment.status {
            AssignmentStatus::Suggestion(_) => AssignmentStatus::Suggestion(SuggestionStatus::Expired),
            AssignmentStatus::Live(_) => AssignmentStatus::Live(LiveStatus::Expired),
        };
        Self::check(&assignment, next)?;

        if let Some(reservation) = assignment.reservation.clone() {
            self.coordinator.release(&reservation).await?;
            assignment.reservation = None;
        }
        self.apply(&mut assignment, next).await?;
        Ok(assignment.clone())
    }

    // Handoff sub-lifecycle

    /// Ask to move active work to another assistant
    pub async fn request_handoff(
        &self,
        assignment_id: &AssignmentId,
        to_assistant: AssistantId,
        reason: Option<String>,
    ) -> Result<Handoff> {
        let entry = self.entry(assignment_id)?;
        let assignment = entry.lock().await;

        let from_assistant = match (&assignment.assistant_id, assignment.is_active()) {
            (Some(assistant), true) => assistant.clone(),
            _ => {
                return Err(MatchEngineError::validation(format!(
                    "assignment {} is {} and cannot be handed off",
                    assignment_id, assignment.status
                )))
            }
        };
        if from_assistant == to_assistant {
            return Err(MatchEngineError::validation("handoff target is already assigned"));
        }

        let handoff = Handoff {
            handoff_id: Uuid::new_v4(),
            assignment_id: *assignment_id,
            from_assistant,
            to_assistant,
            hours: assignment.hours,
            status: HandoffStatus::Pending,
            reason,
            unreleased: None,
            requested_at: Utc::now(),
            responded_at: None,
            completed_at: None,
        };
        self.handoffs
            .insert(handoff.handoff_id, Arc::new(Mutex::new(handoff.clone())));

        info!(
            "🔀 Handoff {} requested: {} -> {} for assignment {}",
            handoff.handoff_id, handoff.from_assistant, handoff.to_assistant, assignment_id
        );
        self.publish_handoff(&handoff, &assignment.requester_id, None).await;
        Ok(handoff)
    }

    /// Accept a pending handoff
    ///
    /// Capacity is reserved on the receiving assistant before it is released
    /// on the originating one, so an interruption leaves both charged rather
    /// than neither. If the release fails the old reservation is kept on the
    /// handoff record as `unreleased`.
    pub async fn accept_handoff(&self, handoff_id: &Uuid) -> Result<HandoffOutcome> {
        let handoff_entry = self.handoff_entry(handoff_id)?;
        let mut handoff = handoff_entry.lock().await;
        handoff.status.transition(HandoffStatus::Accepted)?;

        let entry = self.entry(&handoff.assignment_id)?;
        let mut assignment = entry.lock().await;
        if !assignment.is_active() || assignment.assistant_id.as_ref() != Some(&handoff.from_assistant) {
            return Err(MatchEngineError::validation(format!(
                "assignment {} is no longer held by {}",
                handoff.assignment_id, handoff.from_assistant
            )));
        }

        let new_reservation = match self
            .coordinator
            .assign(&[handoff.to_assistant.clone()], handoff.hours)
            .await?
        {
            AssignOutcome::Committed(reservation) => reservation,
            AssignOutcome::Exhausted { .. } => {
                warn!(
                    "Handoff {} cannot be accepted: {} has no capacity",
                    handoff_id, handoff.to_assistant
                );
                return Ok(HandoffOutcome::NoCapacity(handoff.clone()));
            }
        };

        let old_reservation = assignment.reservation.replace(new_reservation);
        assignment.assistant_id = Some(handoff.to_assistant.clone());
        assignment.updated_at = Utc::now();

        if let Some(old) = old_reservation {
            if let Err(e) = self.coordinator.release(&old).await {
                warn!(
                    "Handoff {}: reservation {} on {} not released ({}), assistant stays over-counted",
                    handoff_id, old.reservation_id, old.assistant_id, e
                );
                handoff.unreleased = Some(old);
            }
        }

        handoff.status = HandoffStatus::Accepted;
        handoff.responded_at = Some(Utc::now());
        info!(
            "✅ Handoff {} accepted: assignment {} now with {}",
            handoff_id, handoff.assignment_id, handoff.to_assistant
        );
        self.publish_handoff(&handoff, &assignment.requester_id, Some(HandoffStatus::Pending))
            .await;
        Ok(HandoffOutcome::Accepted(handoff.clone()))
    }

    pub async fn reject_handoff(&self, handoff_id: &Uuid) -> Result<Handoff> {
        self.finish_handoff(handoff_id, HandoffStatus::Rejected).await
    }

    pub async fn complete_handoff(&self, handoff_id: &Uuid) -> Result<Handoff> {
        self.finish_handoff(handoff_id, HandoffStatus::Completed).await
    }

    async fn finish_handoff(&self, handoff_id: &Uuid, next: HandoffStatus) -> Result<Handoff> {
        let handoff_entry = self.handoff_entry(handoff_id)?;
        let mut handoff = handoff_entry.lock().await;
        let previous = handoff.status;
        handoff.status = previous.transition(next)?;

        let now = Utc::now();
        match next {
            HandoffStatus::Rejected => handoff.responded_at = Some(now),
            _ => handoff.completed_at = Some(now),
        }

        let requester_id = match self.entry(&handoff.assignment_id) {
            Ok(entry) => entry.lock().await.requester_id.clone(),
            Err(_) => String::new(),
        };
        info!("🔀 Handoff {} {} -> {}", handoff_id, previous, next);
        self.publish_handoff(&handoff, &requester_id, Some(previous)).await;
        Ok(handoff.clone())
    }

    async fn publish_handoff(&self, handoff: &Handoff, requester_id: &str, previous: Option<HandoffStatus>) {
        let event = AssignmentEvent::new(
            EventKind::Handoff,
            handoff.assignment_id,
            requester_id,
            Some(handoff.to_assistant.clone()),
            previous.map(|s| s.as_str()),
            handoff.status.as_str(),
        )
        .with_handoff(handoff.handoff_id);
        self.events.publish(event).await;
    }

    // Queries

    pub async fn get(&self, id: &AssignmentId) -> Option<Assignment> {
        let entry = self.entry(id).ok()?;
        let assignment = entry.lock().await;
        Some(assignment.clone())
    }

    pub async fn get_handoff(&self, id: &Uuid) -> Option<Handoff> {
        let entry = self.handoff_entry(id).ok()?;
        let handoff = entry.lock().await;
        Some(handoff.clone())
    }

    pub async fn stats(&self) -> AssignmentStats {
        let assignments: Vec<_> = self.assignments.iter().map(|e| e.value().clone()).collect();
        let handoffs: Vec<_> = self.handoffs.iter().map(|e| e.value().clone()).collect();

        let mut stats = AssignmentStats {
            total: assignments.len(),
            ..Default::default()
        };
        for entry in assignments {
            let status = entry.lock().await.status;
            let counter = match status {
                AssignmentStatus::Suggestion(SuggestionStatus::Suggested) => &mut stats.suggested,
                AssignmentStatus::Suggestion(SuggestionStatus::Reviewed) => &mut stats.reviewed,
                AssignmentStatus::Suggestion(SuggestionStatus::Accepted) => &mut stats.accepted,
                AssignmentStatus::Suggestion(SuggestionStatus::Rejected) => &mut stats.rejected,
                AssignmentStatus::Live(LiveStatus::Waiting) => &mut stats.waiting,
                AssignmentStatus::Live(LiveStatus::InProgress) => &mut stats.in_progress,
                AssignmentStatus::Suggestion(SuggestionStatus::Completed)
                | AssignmentStatus::Live(LiveStatus::Completed) => &mut stats.completed,
                AssignmentStatus::Suggestion(SuggestionStatus::Expired)
                | AssignmentStatus::Live(LiveStatus::Expired) => &mut stats.expired,
            };
            *counter += 1;
        }
        for entry in handoffs {
            match entry.lock().await.status {
                HandoffStatus::Pending => stats.handoffs_pending += 1,
                HandoffStatus::Accepted => stats.handoffs_accepted += 1,
                HandoffStatus::Rejected | HandoffStatus::Completed => {}
            }
        }
        stats
    }

    /// Assignment currently holding `reservation_id`, if any
    pub async fn holder_of(&self, reservation_id: &Uuid) -> Option<AssignmentId> {
        let assignments: Vec<_> = self.assignments.iter().map(|e| e.value().clone()).collect();
        for entry in assignments {
            let assignment = entry.lock().await;
            if assignment
                .reservation
                .as_ref()
                .is_some_and(|r| r.reservation_id == *reservation_id)
            {
                return Some(assignment.assignment_id);
            }
        }
        None
    }

    /// Drop terminal assignments and handoffs that finished before `cutoff`
    ///
    /// Records locked by an in-flight operation are kept for the next pass,
    /// as are handoffs still carrying an unreleased reservation. Returns the
    /// ids of the purged assignments.
    pub fn purge_terminal(&self, cutoff: DateTime<Utc>) -> Vec<AssignmentId> {
        let mut purged = Vec::new();
        self.assignments.retain(|id, entry| {
            let Ok(assignment) = entry.try_lock() else {
                return true;
            };
            let finished = assignment.completed_at.unwrap_or(assignment.updated_at);
            if assignment.is_terminal() && finished < cutoff {
                purged.push(*id);
                false
            } else {
                true
            }
        });

        let mut purged_handoffs = 0usize;
        self.handoffs.retain(|_, entry| {
            let Ok(handoff) = entry.try_lock() else {
                return true;
            };
            let finished = match handoff.status {
                HandoffStatus::Completed => handoff.completed_at,
                HandoffStatus::Rejected => handoff.responded_at,
                HandoffStatus::Pending | HandoffStatus::Accepted => None,
            };
            match finished {
                Some(at) if at < cutoff && handoff.unreleased.is_none() => {
                    purged_handoffs += 1;
                    false
                }
                _ => true,
            }
        });

        if !purged.is_empty() || purged_handoffs > 0 {
            info!(
                "🧹 Purged {} finished assignments and {} handoffs older than {}",
                purged.len(),
                purged_handoffs,
                cutoff
            );
        }
        purged
    }
}

fn kind_of(status: &AssignmentStatus) -> EventKind {
    match status {
        AssignmentStatus::Suggestion(_) => EventKind::Suggestion,
        AssignmentStatus::Live(_) => EventKind::Live,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AssignmentConfig, EventConfig};
    use crate::store::{InMemoryProfileStore, ProfileStore};

    fn manager(profiles: Vec<AssistantProfile>) -> AssignmentManager {
        let store = Arc::new(InMemoryProfileStore::with_profiles(profiles).unwrap());
        let coordinator = Arc::new(AssignmentCoordinator::new(store, &AssignmentConfig::default()));
        AssignmentManager::new(coordinator, AssignmentEvents::new(&EventConfig::default()))
    }

    fn va(id: &str, load: u32) -> AssistantProfile {
        AssistantProfile::new(id).with_capacity(Hours::whole(40), Hours::whole(load))
    }

    fn suggestion_for(id: &str) -> MatchResult {
        MatchResult {
            assistant_id: AssistantId::from(id),
            score: 90,
            breakdown: crate::scoring::ScoreBreakdown {
                skills: 100.0,
                industry: 100.0,
                timezone: 100.0,
                language: 100.0,
                budget: 50.0,
                bonus: 0.0,
            },
            estimated_monthly_cost: 0,
        }
    }

    async fn load_of(manager: &AssignmentManager, id: &str) -> Hours {
        manager
            .coordinator()
            .store()
            .get(&AssistantId::from(id))
            .await
            .unwrap()
            .unwrap()
            .current_load
    }

    #[tokio::test]
    async fn test_suggestion_accept_reserves_and_complete_releases() {
        let manager = manager(vec![va("a", 20)]);
        let created = manager
            .create_suggestions("client-1", &[suggestion_for("a")], Hours::whole(10))
            .await;
        let id = created[0].assignment_id;
        assert_eq!(load_of(&manager, "a").await, Hours::whole(20));

        assert!(matches!(
            manager.accept_suggestion(&id).await,
            Err(MatchEngineError::InvalidTransition { .. })
        ));

        manager.mark_reviewed(&id).await.unwrap();
        let accepted = match manager.accept_suggestion(&id).await.unwrap() {
            AcceptOutcome::Accepted(a) => a,
            other => panic!("unexpected {:?}", other),
        };
        assert!(accepted.reservation.is_some());
        assert!(accepted.accepted_at.is_some());
        assert_eq!(load_of(&manager, "a").await, Hours::whole(30));

        let done = manager.complete(&id).await.unwrap();
        assert_eq!(done.status, AssignmentStatus::Suggestion(SuggestionStatus::Completed));
        assert!(done.completed_at.is_some());
        assert_eq!(load_of(&manager, "a").await, Hours::whole(20));
    }

    #[tokio::test]
    async fn test_accept_without_capacity_stays_reviewed() {
        let manager = manager(vec![va("a", 35)]);
        let id = manager
            .create_suggestions("client-1", &[suggestion_for("a")], Hours::whole(10))
            .await[0]
            .assignment_id;
        manager.mark_reviewed(&id).await.unwrap();

        match manager.accept_suggestion(&id).await.unwrap() {
            AcceptOutcome::NoCapacity(a) => {
                assert_eq!(a.status, AssignmentStatus::Suggestion(SuggestionStatus::Reviewed))
            }
            other => panic!("unexpected {:?}", other),
        }
        let rejected = manager.reject_suggestion(&id).await.unwrap();
        assert!(rejected.is_terminal());
        assert_eq!(load_of(&manager, "a").await, Hours::whole(35));
    }

    #[tokio::test]
    async fn test_live_routing_waits_then_routes() {
        let manager = manager(vec![va("a", 38), va("b", 39)]);
        let live = manager.open_live("chat-1", Hours::whole(5), 1).await.unwrap();
        let pool = manager.coordinator().store().list().await.unwrap();

        match manager.route_live(&live.assignment_id, &pool).await.unwrap() {
            RouteOutcome::Waiting(a) => assert_eq!(a.status, AssignmentStatus::Live(LiveStatus::Waiting)),
            other => panic!("unexpected {:?}", other),
        }

        manager.coordinator().store().upsert(va("c", 0)).await.unwrap();
        let pool = manager.coordinator().store().list().await.unwrap();
        match manager.route_live(&live.assignment_id, &pool).await.unwrap() {
            RouteOutcome::Routed(a) => {
                assert_eq!(a.assistant_id, Some(AssistantId::from("c")));
                assert_eq!(a.status, AssignmentStatus::Live(LiveStatus::InProgress));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(manager.expire(&live.assignment_id).await.is_err());
    }

    #[tokio::test]
    async fn test_handoff_moves_capacity() {
        let manager = manager(vec![va("from", 0), va("to", 0)]);
        let reservation = manager
            .coordinator()
            .assign(&[AssistantId::from("from")], Hours::whole(8))
            .await
            .unwrap()
            .reservation()
            .cloned()
            .unwrap();
        let assignment = manager.create_in_progress("task-1", reservation, Some(77)).await.unwrap();

        let handoff = manager
            .request_handoff(&assignment.assignment_id, AssistantId::from("to"), Some("vacation".into()))
            .await
            .unwrap();
        assert_eq!(handoff.status, HandoffStatus::Pending);

        let accepted = match manager.accept_handoff(&handoff.handoff_id).await.unwrap() {
            HandoffOutcome::Accepted(h) => h,
            other => panic!("unexpected {:?}", other),
        };
        assert!(accepted.unreleased.is_none());
        assert_eq!(load_of(&manager, "from").await, Hours::ZERO);
        assert_eq!(load_of(&manager, "to").await, Hours::whole(8));

        let moved = manager.get(&assignment.assignment_id).await.unwrap();
        assert_eq!(moved.assistant_id, Some(AssistantId::from("to")));

        let completed = manager.complete_handoff(&handoff.handoff_id).await.unwrap();
        assert_eq!(completed.status, HandoffStatus::Completed);
        assert!(manager.reject_handoff(&handoff.handoff_id).await.is_err());
    }

    #[tokio::test]
    async fn test_handoff_without_capacity_stays_pending() {
        let manager = manager(vec![va("from", 0), va("to", 39)]);
        let reservation = manager
            .coordinator()
            .assign(&[AssistantId::from("from")], Hours::whole(8))
            .await
            .unwrap()
            .reservation()
            .cloned()
            .unwrap();
        let assignment = manager.create_in_progress("task-1", reservation, None).await.unwrap();
        let handoff = manager
            .request_handoff(&assignment.assignment_id, AssistantId::from("to"), None)
            .await
            .unwrap();

        assert!(matches!(
            manager.accept_handoff(&handoff.handoff_id).await.unwrap(),
            HandoffOutcome::NoCapacity(_)
        ));
        assert_eq!(load_of(&manager, "from").await, Hours::whole(8));
        assert_eq!(manager.get_handoff(&handoff.handoff_id).await.unwrap().status, HandoffStatus::Pending);
    }

    #[tokio::test]
    async fn test_events_and_stats() {
        let manager = manager(vec![va("a", 0), va("b", 0)]);
        let mut rx = manager.events().subscribe();
        let created = manager
            .create_suggestions("client-1", &[suggestion_for("a"), suggestion_for("b")], Hours::whole(5))
            .await;
        manager.mark_reviewed(&created[0].assignment_id).await.unwrap();
        manager.expire(&created[1].assignment_id).await.unwrap();
        manager.open_live("chat-1", Hours::whole(1), 0).await.unwrap();

        let first = rx.recv().await.unwrap();
        assert_eq!(first.kind, EventKind::Suggestion);
        assert_eq!(first.old_status, None);
        assert_eq!(first.new_status, "suggested");

        let stats = manager.stats().await;
        assert_eq!(stats.total, 3);
        assert_eq!(stats.reviewed, 1);
        assert_eq!(stats.expired, 1);
        assert_eq!(stats.waiting, 1);
        assert_eq!(manager.events().history().await.len(), 5);
    }

    #[tokio::test]
    async fn test_holder_of_tracks_linked_reservation() {
        let manager = manager(vec![va("a", 0)]);
        let reservation = manager
            .coordinator()
            .assign(&[AssistantId::from("a")], Hours::whole(4))
            .await
            .unwrap()
            .reservation()
            .cloned()
            .unwrap();
        assert_eq!(manager.holder_of(&reservation.reservation_id).await, None);

        let assignment = manager.create_in_progress("task-1", reservation.clone(), None).await.unwrap();
        assert_eq!(
            manager.holder_of(&reservation.reservation_id).await,
            Some(assignment.assignment_id)
        );

        manager.complete(&assignment.assignment_id).await.unwrap();
        assert_eq!(manager.holder_of(&reservation.reservation_id).await, None);
    }

    #[tokio::test]
    async fn test_purge_terminal_keeps_open_records() {
        let manager = manager(vec![va("a", 0), va("b", 0)]);
        let created = manager
            .create_suggestions("client-1", &[suggestion_for("a"), suggestion_for("b")], Hours::whole(5))
            .await;
        let finished = created[0].assignment_id;
        let open = created[1].assignment_id;
        manager.expire(&finished).await.unwrap();

        let live = manager.open_live("chat-1", Hours::whole(2), 0).await.unwrap();
        let pool = manager.coordinator().store().list().await.unwrap();
        manager.route_live(&live.assignment_id, &pool).await.unwrap();
        let handoff = manager
            .request_handoff(&live.assignment_id, AssistantId::from("b"), None)
            .await
            .unwrap();
        manager.reject_handoff(&handoff.handoff_id).await.unwrap();

        // Nothing finished before an old cutoff
        assert!(manager.purge_terminal(Utc::now() - chrono::Duration::hours(1)).is_empty());

        let purged = manager.purge_terminal(Utc::now() + chrono::Duration::seconds(1));
        assert_eq!(purged, vec![finished]);
        assert!(manager.get(&finished).await.is_none());
        assert!(manager.get(&open).await.is_some());
        assert!(manager.get(&live.assignment_id).await.is_some());
        assert!(manager.get_handoff(&handoff.handoff_id).await.is_none());
        assert_eq!(manager.stats().await.total, 2);
    }
}
