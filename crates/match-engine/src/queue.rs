//! # Waiting Queue
//!
//! Live requests that found no assistant with spare capacity wait here until
//! [`crate::engine::MatchEngine::retry_waiting`] routes them or
//! [`crate::engine::MatchEngine::expire_waiting`] gives up on them.
//!
//! Lower priority numbers are more urgent. Entries with the same priority keep
//! arrival order.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::QueueConfig;
use crate::error::{MatchEngineError, Result};

/// A live assignment waiting for capacity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueuedRequest {
    pub assignment_id: Uuid,
    pub priority: u8,
    pub queued_at: DateTime<Utc>,
    /// Routing attempts made since the request was first queued
    pub retry_count: u32,
}

/// Queue statistics
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub waiting: usize,
    pub max_size: usize,
    /// Longest current wait in seconds
    pub oldest_wait_seconds: i64,
}

/// Priority queue of waiting live assignments
#[derive(Debug)]
pub struct WaitingQueue {
    entries: VecDeque<QueuedRequest>,
    max_size: usize,
    max_wait_seconds: u64,
}

impl WaitingQueue {
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            entries: VecDeque::new(),
            max_size: config.max_size,
            max_wait_seconds: config.max_wait_seconds,
        }
    }

    /// Add a request, returning its position
    ///
    /// A request that is already queued is left where it is and `Ok(None)` is
    /// returned. A full queue is a validation error.
    pub fn enqueue(&mut self, assignment_id: Uuid, priority: u8) -> Result<Option<usize>> {
        self.insert(QueuedRequest {
            assignment_id,
            priority,
            queued_at: Utc::now(),
            retry_count: 0,
        })
    }

    /// Put a request back after a failed routing attempt
    ///
    /// The original `queued_at` is kept so retries do not reset the wait clock.
    pub fn requeue(&mut self, mut request: QueuedRequest) -> Result<Option<usize>> {
        request.retry_count += 1;
        self.insert(request)
    }

    fn insert(&mut self, request: QueuedRequest) -> Result<Option<usize>> {
        if self.contains(&request.assignment_id) {
            warn!("Request {} already queued, not re-queuing", request.assignment_id);
            return Ok(None);
        }
        if self.entries.len() >= self.max_size {
            return Err(MatchEngineError::validation(format!(
                "waiting queue is full ({} requests)",
                self.max_size
            )));
        }

        let position = self
            .entries
            .iter()
            .position(|existing| existing.priority > request.priority)
            .unwrap_or(self.entries.len());

        info!(
            "📥 Queued request {} at position {} (priority {}, retry {})",
            request.assignment_id, position, request.priority, request.retry_count
        );
        self.entries.insert(position, request);
        Ok(Some(position))
    }

    /// Take the most urgent request
    pub fn dequeue(&mut self) -> Option<QueuedRequest> {
        self.entries.pop_front()
    }

    /// Take every request, most urgent first
    pub fn drain(&mut self) -> Vec<QueuedRequest> {
        self.entries.drain(..).collect()
    }

    pub fn remove(&mut self, assignment_id: &Uuid) -> bool {
        let before = self.entries.len();
        self.entries.retain(|r| &r.assignment_id != assignment_id);
        self.entries.len() != before
    }

    pub fn contains(&self, assignment_id: &Uuid) -> bool {
        self.entries.iter().any(|r| &r.assignment_id == assignment_id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop requests that waited longer than the configured maximum
    pub fn remove_expired(&mut self, now: DateTime<Utc>) -> Vec<Uuid> {
        let max_wait = self.max_wait_seconds as i64;
        let mut expired = Vec::new();

        self.entries.retain(|request| {
            let waited = now.signed_duration_since(request.queued_at).num_seconds();
            if waited > max_wait {
                warn!("⏰ Removing expired request {} (waited {} seconds)", request.assignment_id, waited);
                expired.push(request.assignment_id);
                false
            } else {
                true
            }
        });

        expired
    }

    pub fn stats(&self, now: DateTime<Utc>) -> QueueStats {
        QueueStats {
            waiting: self.entries.len(),
            max_size: self.max_size,
            oldest_wait_seconds: self
                .entries
                .iter()
                .map(|r| now.signed_duration_since(r.queued_at).num_seconds())
                .max()
                .unwrap_or(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn queue(max_size: usize) -> WaitingQueue {
        WaitingQueue::new(&QueueConfig {
            max_size,
            max_wait_seconds: 60,
        })
    }

    #[test]
    fn test_priority_then_fifo() {
        let mut q = queue(10);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        q.enqueue(a, 5).unwrap();
        q.enqueue(b, 5).unwrap();
        assert_eq!(q.enqueue(c, 1).unwrap(), Some(0));

        let order: Vec<_> = q.drain().into_iter().map(|r| r.assignment_id).collect();
        assert_eq!(order, [c, a, b]);
    }

    #[test]
    fn test_duplicate_is_noop_and_full_is_error() {
        let mut q = queue(1);
        let a = Uuid::new_v4();
        assert_eq!(q.enqueue(a, 1).unwrap(), Some(0));
        assert_eq!(q.enqueue(a, 0).unwrap(), None);
        assert!(matches!(q.enqueue(Uuid::new_v4(), 1), Err(MatchEngineError::Validation(_))));
    }

    #[test]
    fn test_requeue_keeps_wait_clock() {
        let mut q = queue(10);
        let a = Uuid::new_v4();
        q.enqueue(a, 3).unwrap();
        let request = q.dequeue().unwrap();
        let queued_at = request.queued_at;
        q.requeue(request).unwrap();

        let again = q.dequeue().unwrap();
        assert_eq!(again.queued_at, queued_at);
        assert_eq!(again.retry_count, 1);
    }

    #[test]
    fn test_remove_expired() {
        let mut q = queue(10);
        let (old, fresh) = (Uuid::new_v4(), Uuid::new_v4());
        q.enqueue(old, 1).unwrap();
        q.enqueue(fresh, 1).unwrap();

        let now = Utc::now() + Duration::seconds(61);
        // Only `old` is older than 60 seconds when fresh is re-stamped
        q.entries[1].queued_at = now;
        assert_eq!(q.remove_expired(now), [old]);
        assert!(q.contains(&fresh));
        assert!(q.remove(&fresh));
        assert!(q.is_empty());
    }
}
