//! Assignment transition events
//!
//! Every lifecycle transition the [`crate::lifecycle::AssignmentManager`]
//! performs is published here, both to live subscribers over a tokio
//! broadcast channel and into a bounded in-memory history for audit and
//! notification collaborators that poll.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::EventConfig;
use crate::profile::AssistantId;

/// Which lifecycle a transition belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Suggestion,
    Live,
    Handoff,
}

/// A single lifecycle transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssignmentEvent {
    pub event_id: Uuid,
    pub assignment_id: Uuid,
    /// Set for handoff transitions
    pub handoff_id: Option<Uuid>,
    pub assistant_id: Option<AssistantId>,
    pub requester_id: String,
    pub kind: EventKind,
    /// `None` when the record was just created
    pub old_status: Option<String>,
    pub new_status: String,
    pub timestamp: DateTime<Utc>,
}

impl AssignmentEvent {
    pub fn new(
        kind: EventKind,
        assignment_id: Uuid,
        requester_id: impl Into<String>,
        assistant_id: Option<AssistantId>,
        old_status: Option<&str>,
        new_status: &str,
    ) -> Self {
        Self {
            event_id: Uuid::new_v4(),
            assignment_id,
            handoff_id: None,
            assistant_id,
            requester_id: requester_id.into(),
            kind,
            old_status: old_status.map(str::to_string),
            new_status: new_status.to_string(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_handoff(mut self, handoff_id: Uuid) -> Self {
        self.handoff_id = Some(handoff_id);
        self
    }
}

/// Broadcast hub with bounded history
#[derive(Clone)]
pub struct AssignmentEvents {
    sender: broadcast::Sender<AssignmentEvent>,
    history: Arc<RwLock<VecDeque<AssignmentEvent>>>,
    max_history: usize,
}

impl AssignmentEvents {
    pub fn new(config: &EventConfig) -> Self {
        let (sender, _) = broadcast::channel(config.broadcast_capacity.max(1));
        Self {
            sender,
            history: Arc::new(RwLock::new(VecDeque::with_capacity(config.max_history.min(1024)))),
            max_history: config.max_history,
        }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AssignmentEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Record and broadcast an event
    pub async fn publish(&self, event: AssignmentEvent) {
        debug!(
            "📡 {:?} {} {} -> {}",
            event.kind,
            event.assignment_id,
            event.old_status.as_deref().unwrap_or("(new)"),
            event.new_status
        );

        {
            let mut history = self.history.write().await;
            history.push_back(event.clone());
            while history.len() > self.max_history {
                history.pop_front();
            }
        }

        // No subscribers is not an error
        if self.sender.send(event).is_err() {
            trace!("No event subscribers");
        }
    }

    /// Recorded events, oldest first
    pub async fn history(&self) -> Vec<AssignmentEvent> {
        self.history.read().await.iter().cloned().collect()
    }

    /// Recorded events for one assignment, oldest first
    pub async fn history_for(&self, assignment_id: Uuid) -> Vec<AssignmentEvent> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.assignment_id == assignment_id)
            .cloned()
            .collect()
    }

    /// Recorded events within a time range
    pub async fn history_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<AssignmentEvent> {
        self.history
            .read()
            .await
            .iter()
            .filter(|e| e.timestamp >= start && e.timestamp <= end)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(new_status: &str) -> AssignmentEvent {
        AssignmentEvent::new(EventKind::Live, Uuid::new_v4(), "client-1", None, None, new_status)
    }

    #[tokio::test]
    async fn test_subscribers_receive_events() {
        let events = AssignmentEvents::new(&EventConfig::default());
        let mut rx = events.subscribe();
        events.publish(event("waiting")).await;
        let received = rx.recv().await.unwrap();
        assert_eq!(received.new_status, "waiting");
        assert_eq!(received.old_status, None);
    }

    #[tokio::test]
    async fn test_history_is_bounded() {
        let config = EventConfig {
            broadcast_capacity: 4,
            max_history: 3,
        };
        let events = AssignmentEvents::new(&config);
        for status in ["a", "b", "c", "d", "e"] {
            events.publish(event(status)).await;
        }
        let history: Vec<_> = events.history().await.into_iter().map(|e| e.new_status).collect();
        assert_eq!(history, ["c", "d", "e"]);
    }

    #[tokio::test]
    async fn test_history_for_assignment() {
        let events = AssignmentEvents::new(&EventConfig::default());
        let tracked = event("waiting");
        let id = tracked.assignment_id;
        events.publish(tracked).await;
        events.publish(event("waiting")).await;
        events
            .publish(AssignmentEvent::new(EventKind::Live, id, "client-1", None, Some("waiting"), "expired"))
            .await;
        assert_eq!(events.history_for(id).await.len(), 2);
    }
}
