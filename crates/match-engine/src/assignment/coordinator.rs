//! Capacity reservation across a candidate pool

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::AssignmentConfig;
use crate::error::{MatchEngineError, Result};
use crate::profile::{AssistantId, AssistantProfile, AssistantStatus, Hours};
use crate::scoring::MatchResult;
use crate::store::{ProfileStore, ReserveOutcome};

/// Committed capacity on one assistant
///
/// Returned by a successful walk. Until the caller links it to an assignment
/// record it can be undone with [`AssignmentCoordinator::release`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: Uuid,
    pub assistant_id: AssistantId,
    pub hours: Hours,
    /// Assistant load right after this reservation committed
    pub load_after: Hours,
    pub reserved_at: DateTime<Utc>,
}

impl Reservation {
    fn new(assistant_id: AssistantId, hours: Hours, load_after: Hours) -> Self {
        Self {
            reservation_id: Uuid::new_v4(),
            assistant_id,
            hours,
            load_after,
            reserved_at: Utc::now(),
        }
    }
}

/// Result of walking a candidate pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AssignOutcome {
    Committed(Reservation),
    /// Nobody in the pool could take the work
    Exhausted {
        /// Distinct candidates tried
        attempted: usize,
        /// Candidates refused for lack of capacity or that timed out
        contended: usize,
    },
}

impl AssignOutcome {
    pub fn reservation(&self) -> Option<&Reservation> {
        match self {
            Self::Committed(reservation) => Some(reservation),
            Self::Exhausted { .. } => None,
        }
    }

    pub fn is_committed(&self) -> bool {
        matches!(self, Self::Committed(_))
    }
}

/// Walks candidates in preference order, reserving on the first that accepts
///
/// Each candidate gets exactly one atomic `try_reserve` attempt, bounded by
/// the configured timeout. A refusal or a timeout moves the walk to the next
/// candidate; no lock is held from one candidate to the next. A store error
/// ends the walk immediately and is returned as-is so that an outage is never
/// reported as "no capacity".
///
/// Attempts run on their own task. One that times out keeps running, and if
/// it still commits, the late reservation is recorded as outstanding and
/// released again. It only stays outstanding if that release fails.
pub struct AssignmentCoordinator {
    store: Arc<dyn ProfileStore>,
    attempt_timeout: Duration,
    outstanding: Arc<DashMap<Uuid, Reservation>>,
    late_commits: Arc<AtomicU64>,
}

impl AssignmentCoordinator {
    pub fn new(store: Arc<dyn ProfileStore>, config: &AssignmentConfig) -> Self {
        Self {
            store,
            attempt_timeout: config.attempt_timeout(),
            outstanding: Arc::new(DashMap::new()),
            late_commits: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    /// Reserve `hours` on the first candidate that can take them
    pub async fn assign(&self, candidates: &[AssistantId], hours: Hours) -> Result<AssignOutcome> {
        if hours.is_zero() {
            return Err(MatchEngineError::validation("requested hours must be greater than zero"));
        }

        let mut seen = HashSet::with_capacity(candidates.len());
        let mut attempted = 0;
        let mut contended = 0;

        for assistant_id in candidates {
            if !seen.insert(assistant_id) {
                continue;
            }
            attempted += 1;

            let mut attempt = self.spawn_attempt(assistant_id, hours);
            let outcome = match timeout(self.attempt_timeout, &mut attempt).await {
                Ok(Ok(Ok(outcome))) => outcome,
                Ok(Ok(Err(e))) => {
                    error!("Failed to reserve assistant {}: {}", assistant_id, e);
                    return Err(e);
                }
                Ok(Err(e)) => {
                    error!("Reservation task for assistant {} failed: {}", assistant_id, e);
                    return Err(MatchEngineError::internal(format!("reservation task failed: {}", e)));
                }
                Err(_) => {
                    warn!(
                        "⏱️ Reservation attempt on assistant {} timed out after {:?}, trying next candidate",
                        assistant_id, self.attempt_timeout
                    );
                    self.reclaim_late(attempt, assistant_id.clone(), hours);
                    contended += 1;
                    continue;
                }
            };

            match outcome {
                ReserveOutcome::Reserved { load_after } => {
                    let reservation = Reservation::new(assistant_id.clone(), hours, load_after);
                    self.outstanding.insert(reservation.reservation_id, reservation.clone());
                    info!(
                        "🎯 Assigned {} to assistant {} after {} attempt(s)",
                        hours, assistant_id, attempted
                    );
                    return Ok(AssignOutcome::Committed(reservation));
                }
                ReserveOutcome::InsufficientCapacity { spare } => {
                    debug!("Assistant {} has only {} spare, trying next candidate", assistant_id, spare);
                    contended += 1;
                }
                ReserveOutcome::NotAvailable { status } => {
                    debug!("Assistant {} is {}, trying next candidate", assistant_id, status);
                }
                ReserveOutcome::NotFound => {
                    warn!("Assistant {} not found in profile store, skipping", assistant_id);
                }
            }
        }

        info!(
            "❌ No capacity for {} across {} candidate(s) ({} contended)",
            hours, attempted, contended
        );
        Ok(AssignOutcome::Exhausted { attempted, contended })
    }

    fn spawn_attempt(&self, assistant_id: &AssistantId, hours: Hours) -> JoinHandle<Result<ReserveOutcome>> {
        let store = self.store.clone();
        let assistant_id = assistant_id.clone();
        tokio::spawn(async move { store.try_reserve(&assistant_id, hours).await })
    }

    /// Follow a timed-out attempt and undo it if it commits after all
    fn reclaim_late(&self, attempt: JoinHandle<Result<ReserveOutcome>>, assistant_id: AssistantId, hours: Hours) {
        let store = self.store.clone();
        let outstanding = self.outstanding.clone();
        let late_commits = self.late_commits.clone();

        tokio::spawn(async move {
            let load_after = match attempt.await {
                Ok(Ok(ReserveOutcome::Reserved { load_after })) => load_after,
                Ok(Ok(outcome)) => {
                    debug!("Timed-out attempt on assistant {} ended without reserving: {:?}", assistant_id, outcome);
                    return;
                }
                Ok(Err(e)) => {
                    debug!("Timed-out attempt on assistant {} failed: {}", assistant_id, e);
                    return;
                }
                Err(e) => {
                    error!("Timed-out reservation task for assistant {} failed: {}", assistant_id, e);
                    return;
                }
            };

            late_commits.fetch_add(1, Ordering::Relaxed);
            let reservation = Reservation::new(assistant_id, hours, load_after);
            warn!(
                "⏱️ Late reservation {} committed {} on assistant {}, releasing it",
                reservation.reservation_id, hours, reservation.assistant_id
            );
            outstanding.insert(reservation.reservation_id, reservation.clone());

            match store.release(&reservation.assistant_id, hours).await {
                Ok(load_after) => {
                    outstanding.remove(&reservation.reservation_id);
                    info!(
                        "🔄 Released late reservation {} on assistant {} (load now {})",
                        reservation.reservation_id, reservation.assistant_id, load_after
                    );
                }
                Err(e) => {
                    error!(
                        "Late reservation {} on assistant {} stays outstanding: {}",
                        reservation.reservation_id, reservation.assistant_id, e
                    );
                }
            }
        });
    }

    /// Walk a ranked match list in rank order
    pub async fn assign_ranked(&self, ranked: &[MatchResult], hours: Hours) -> Result<AssignOutcome> {
        let candidates: Vec<AssistantId> = ranked.iter().map(|m| m.assistant_id.clone()).collect();
        self.assign(&candidates, hours).await
    }

    /// Walk available assistants from least to most loaded
    ///
    /// Used for live routing where speed matters more than fit. Ties on load
    /// go to the smaller assistant id.
    pub async fn assign_least_loaded(&self, pool: &[AssistantProfile], hours: Hours) -> Result<AssignOutcome> {
        let candidates = least_loaded_order(pool, hours);
        debug!("Least-loaded walk over {} of {} assistants", candidates.len(), pool.len());
        self.assign(&candidates, hours).await
    }

    /// Undo a reservation
    ///
    /// Returns `false` if the reservation was already released. If the store
    /// refuses the release the reservation stays outstanding so the caller can
    /// retry.
    pub async fn release(&self, reservation: &Reservation) -> Result<bool> {
        let Some((_, held)) = self.outstanding.remove(&reservation.reservation_id) else {
            debug!("Reservation {} already released", reservation.reservation_id);
            return Ok(false);
        };

        match self.store.release(&held.assistant_id, held.hours).await {
            Ok(load_after) => {
                info!(
                    "🔄 Released reservation {} ({} on assistant {}, load now {})",
                    held.reservation_id, held.hours, held.assistant_id, load_after
                );
                Ok(true)
            }
            Err(e) => {
                error!("Failed to release reservation {}: {}", held.reservation_id, e);
                self.outstanding.insert(held.reservation_id, held);
                Err(e)
            }
        }
    }

    /// Whether a reservation is still held
    pub fn is_outstanding(&self, reservation_id: &Uuid) -> bool {
        self.outstanding.contains_key(reservation_id)
    }

    /// Number of reservations not yet released
    pub fn outstanding(&self) -> usize {
        self.outstanding.len()
    }

    /// Outstanding reservations on one assistant
    pub fn outstanding_for(&self, assistant_id: &AssistantId) -> Vec<Reservation> {
        self.outstanding
            .iter()
            .filter(|r| r.assistant_id == *assistant_id)
            .map(|r| r.value().clone())
            .collect()
    }

    /// Attempts that committed after their timeout had already moved the walk on
    pub fn late_commits(&self) -> u64 {
        self.late_commits.load(Ordering::Relaxed)
    }

    /// Total hours held by outstanding reservations
    pub fn outstanding_hours(&self) -> Hours {
        self.outstanding
            .iter()
            .fold(Hours::ZERO, |acc, r| acc.checked_add(r.hours).unwrap_or(acc))
    }
}

/// Available assistants with room for `hours`, least loaded first
fn least_loaded_order(pool: &[AssistantProfile], hours: Hours) -> Vec<AssistantId> {
    let mut eligible: Vec<&AssistantProfile> = pool
        .iter()
        .filter(|p| p.status == AssistantStatus::Available && p.spare_hours() >= hours)
        .collect();
    eligible.sort_by(|a, b| a.current_load.cmp(&b.current_load).then_with(|| a.id.cmp(&b.id)));
    eligible.into_iter().map(|p| p.id.clone()).collect()
}
