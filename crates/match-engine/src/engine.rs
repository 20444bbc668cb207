//! # Match Engine
//!
//! [`MatchEngine`] wires the profile store, ranking service, assignment
//! coordinator, lifecycle manager, waiting queue and event hub together and
//! exposes the operations a caller actually needs:
//!
//! | Operation | Path |
//! |-----------|------|
//! | [`find_matches`](MatchEngine::find_matches) | store snapshot → rank |
//! | [`suggest_matches`](MatchEngine::suggest_matches) | rank → `suggested` records, nothing reserved |
//! | [`assign_best_match`](MatchEngine::assign_best_match) | rank → coordinator walk → `in_progress` record |
//! | [`open_live_request`](MatchEngine::open_live_request) | least-loaded walk → `in_progress`, or queued |
//! | [`retry_waiting`](MatchEngine::retry_waiting) | route queued requests that now fit |
//! | [`expire_waiting`](MatchEngine::expire_waiting) | expire requests that waited too long |
//!
//! ```
//! use staffline_match_engine::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let engine = MatchEngine::in_memory(EngineConfig::default())?;
//! engine
//!     .register_assistant(
//!         AssistantProfile::new("va-001")
//!             .with_skills(["email"])
//!             .with_capacity(Hours::whole(40), Hours::whole(30)),
//!     )
//!     .await?;
//!
//! let requirements = MatchRequirements::builder()
//!     .required_skills(["email"])
//!     .hours_per_week(5.0)
//!     .build()?;
//!
//! match engine.assign_best_match("client-42", &requirements).await? {
//!     BestMatchOutcome::Assigned { assignment, .. } => {
//!         println!("assigned to {:?}", assignment.assistant_id)
//!     }
//!     BestMatchOutcome::Exhausted { attempted, .. } => println!("no capacity across {}", attempted),
//! }
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::assignment::{AssignOutcome, AssignmentCoordinator, Reservation};
use crate::config::EngineConfig;
use crate::database::SqliteProfileStore;
use crate::error::{MatchEngineError, Result};
use crate::events::AssignmentEvents;
use crate::lifecycle::{Assignment, AssignmentManager, AssignmentStats, AssignmentStatus, LiveStatus, RouteOutcome};
use crate::profile::{AssistantId, AssistantProfile, AssistantStatus, Hours};
use crate::queue::{QueueStats, QueuedRequest, WaitingQueue};
use crate::ranking::{RankingReport, RankingService};
use crate::requirements::MatchRequirements;
use crate::scoring::MatchResult;
use crate::store::{InMemoryProfileStore, ProfileStore};

/// Result of [`MatchEngine::assign_best_match`]
#[derive(Debug, Clone, PartialEq)]
pub enum BestMatchOutcome {
    Assigned {
        assignment: Assignment,
        /// Ranking entry of the assistant that took the work
        matched: MatchResult,
    },
    /// Every qualified candidate was full or unavailable
    Exhausted { attempted: usize, contended: usize },
}

/// Result of [`MatchEngine::open_live_request`]
#[derive(Debug, Clone, PartialEq)]
pub enum LiveRequestOutcome {
    Routed(Assignment),
    Queued { assignment: Assignment, position: usize },
}

/// Routing counters since the engine started
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingStats {
    /// Ranked direct assignments that committed
    pub assigned_directly: u64,
    /// Live requests routed as soon as they were opened
    pub routed_live: u64,
    /// Live requests that had to wait
    pub queued: u64,
    /// Waiting requests routed by a retry pass
    pub routed_from_queue: u64,
    /// Direct assignments that found no capacity
    pub exhausted: u64,
    /// Waiting requests expired
    pub expired: u64,
}

/// Snapshot of engine state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineStats {
    pub assistants: usize,
    pub available_assistants: usize,
    /// Sum of `current_load` across all assistants
    pub committed_hours: Hours,
    pub outstanding_reservations: usize,
    /// Reservations that committed after their attempt had timed out
    pub late_commits: u64,
    pub assignments: AssignmentStats,
    pub queue: QueueStats,
    pub routing: RoutingStats,
}

/// Matching and assignment facade
pub struct MatchEngine {
    config: EngineConfig,
    store: Arc<dyn ProfileStore>,
    ranking: RankingService,
    coordinator: Arc<AssignmentCoordinator>,
    manager: Arc<AssignmentManager>,
    queue: Arc<RwLock<WaitingQueue>>,
    events: AssignmentEvents,
    routing_stats: Arc<RwLock<RoutingStats>>,
}

impl MatchEngine {
    /// Build an engine over an existing profile store
    pub fn new(config: EngineConfig, store: Arc<dyn ProfileStore>) -> Result<Self> {
        config.validate().map_err(MatchEngineError::Configuration)?;

        let events = AssignmentEvents::new(&config.events);
        let coordinator = Arc::new(AssignmentCoordinator::new(store.clone(), &config.assignment));
        let manager = Arc::new(AssignmentManager::new(coordinator.clone(), events.clone()));

        info!(
            "🚀 Match engine ready (limit {}, attempt timeout {}ms, queue {})",
            config.ranking.default_limit, config.assignment.attempt_timeout_ms, config.queue.max_size
        );

        Ok(Self {
            ranking: RankingService::new(config.ranking.clone()),
            queue: Arc::new(RwLock::new(WaitingQueue::new(&config.queue))),
            routing_stats: Arc::new(RwLock::new(RoutingStats::default())),
            config,
            store,
            coordinator,
            manager,
            events,
        })
    }

    /// Engine with profiles kept in process memory
    pub fn in_memory(config: EngineConfig) -> Result<Self> {
        Self::new(config, Arc::new(InMemoryProfileStore::new()))
    }

    /// Engine over the SQLite database named by `config.database.url`
    pub async fn with_sqlite(config: EngineConfig) -> Result<Self> {
        let url = config
            .database
            .url
            .clone()
            .ok_or_else(|| MatchEngineError::configuration("database.url is not set"))?;
        config.validate().map_err(MatchEngineError::Configuration)?;
        let store = SqliteProfileStore::new(&url).await?;
        Self::new(config, Arc::new(store))
    }

    // Profiles

    /// Add or replace an assistant profile
    pub async fn register_assistant(&self, profile: AssistantProfile) -> Result<()> {
        debug!("Registering assistant {}", profile.id);
        self.store.upsert(profile).await
    }

    pub async fn set_assistant_status(&self, id: &AssistantId, status: AssistantStatus) -> Result<()> {
        self.store.set_status(id, status).await
    }

    // Matching

    /// Top matches from the current profile snapshot
    pub async fn find_matches(&self, requirements: &MatchRequirements, limit: Option<usize>) -> Result<Vec<MatchResult>> {
        let pool = self.store.list().await?;
        Ok(self.ranking.rank(&pool, requirements, limit))
    }

    /// Top matches plus the reason every other assistant was disqualified
    pub async fn find_matches_with_report(
        &self,
        requirements: &MatchRequirements,
        limit: Option<usize>,
    ) -> Result<RankingReport> {
        let pool = self.store.list().await?;
        Ok(self.ranking.rank_with_report(&pool, requirements, limit))
    }

    /// Rank and record the top matches as suggestions for the client to review
    pub async fn suggest_matches(
        &self,
        requester_id: &str,
        requirements: &MatchRequirements,
        limit: Option<usize>,
    ) -> Result<Vec<Assignment>> {
        let matches = self.find_matches(requirements, limit).await?;
        Ok(self
            .manager
            .create_suggestions(requester_id, &matches, requirements.hours_per_week())
            .await)
    }

    /// Assign the best-ranked assistant that still has room
    ///
    /// Every qualified assistant is a candidate, in rank order. The
    /// reservation is committed first and then linked to a new `in_progress`
    /// assignment; if linking fails the reservation is released again.
    pub async fn assign_best_match(
        &self,
        requester_id: &str,
        requirements: &MatchRequirements,
    ) -> Result<BestMatchOutcome> {
        let pool = self.store.list().await?;
        let ranked = self.ranking.rank(&pool, requirements, Some(pool.len()));
        let hours = requirements.hours_per_week();

        let reservation = match self.coordinator.assign_ranked(&ranked, hours).await? {
            AssignOutcome::Committed(reservation) => reservation,
            AssignOutcome::Exhausted { attempted, contended } => {
                self.routing_stats.write().await.exhausted += 1;
                return Ok(BestMatchOutcome::Exhausted { attempted, contended });
            }
        };

        let matched = ranked
            .iter()
            .find(|m| m.assistant_id == reservation.assistant_id)
            .cloned()
            .ok_or_else(|| MatchEngineError::internal("reserved assistant missing from ranking"));
        let linked = match matched {
            Ok(matched) => self
                .manager
                .create_in_progress(requester_id, reservation.clone(), Some(matched.score))
                .await
                .map(|assignment| (assignment, matched)),
            Err(e) => Err(e),
        };

        match linked {
            Ok((assignment, matched)) => {
                self.routing_stats.write().await.assigned_directly += 1;
                Ok(BestMatchOutcome::Assigned { assignment, matched })
            }
            Err(e) => {
                error!("Failed to record assignment for {}: {}", requester_id, e);
                self.coordinator.release(&reservation).await?;
                Err(e)
            }
        }
    }

    // Live routing

    /// Open a live request and route it to the least-loaded available assistant
    ///
    /// When nobody has room the request is queued. If the queue is full the
    /// request is expired and the queue error is returned.
    pub async fn open_live_request(&self, requester_id: &str, hours: Hours, priority: u8) -> Result<LiveRequestOutcome> {
        let assignment = self.manager.open_live(requester_id, hours, priority).await?;
        let pool = self.store.list().await?;

        match self.manager.route_live(&assignment.assignment_id, &pool).await? {
            RouteOutcome::Routed(assignment) => {
                self.routing_stats.write().await.routed_live += 1;
                Ok(LiveRequestOutcome::Routed(assignment))
            }
            RouteOutcome::Waiting(assignment) => {
                let enqueued = self.queue.write().await.enqueue(assignment.assignment_id, priority);
                match enqueued {
                    Ok(position) => {
                        self.routing_stats.write().await.queued += 1;
                        Ok(LiveRequestOutcome::Queued {
                            position: position.unwrap_or_default(),
                            assignment,
                        })
                    }
                    Err(e) => {
                        warn!("Live request {} could not be queued: {}", assignment.assignment_id, e);
                        self.manager.expire(&assignment.assignment_id).await?;
                        Err(e)
                    }
                }
            }
        }
    }

    /// Route waiting requests that now fit, most urgent first
    ///
    /// Returns the assignments that were routed. Requests that still do not
    /// fit go back in the queue with their original wait clock. On a store
    /// error every request not yet routed is put back before the error is
    /// returned.
    pub async fn retry_waiting(&self) -> Result<Vec<Assignment>> {
        let pending = self.queue.write().await.drain();
        if pending.is_empty() {
            return Ok(Vec::new());
        }
        debug!("Retrying {} waiting request(s)", pending.len());

        let mut routed = Vec::new();
        let mut still_waiting = Vec::new();
        let mut failure = None;
        let mut pool = match self.store.list().await {
            Ok(pool) => pool,
            Err(e) => {
                self.restore(pending).await;
                return Err(e);
            }
        };

        let mut pending = pending.into_iter();
        for request in pending.by_ref() {
            let waiting = matches!(
                self.manager.get(&request.assignment_id).await.map(|a| a.status),
                Some(AssignmentStatus::Live(LiveStatus::Waiting))
            );
            if !waiting {
                debug!("Dropping {} from queue, no longer waiting", request.assignment_id);
                continue;
            }

            match self.manager.route_live(&request.assignment_id, &pool).await {
                Ok(RouteOutcome::Routed(assignment)) => {
                    routed.push(assignment);
                    match self.store.list().await {
                        Ok(fresh) => pool = fresh,
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                Ok(RouteOutcome::Waiting(_)) => still_waiting.push(request),
                Err(e) => {
                    still_waiting.push(request);
                    failure = Some(e);
                    break;
                }
            }
        }
        still_waiting.extend(pending);

        {
            let mut queue = self.queue.write().await;
            for request in still_waiting {
                if let Err(e) = queue.requeue(request) {
                    error!("Failed to re-queue waiting request: {}", e);
                }
            }
        }
        self.routing_stats.write().await.routed_from_queue += routed.len() as u64;

        if !routed.is_empty() {
            info!("📤 Routed {} waiting request(s)", routed.len());
        }
        match failure {
            Some(e) => Err(e),
            None => Ok(routed),
        }
    }

    async fn restore(&self, requests: Vec<QueuedRequest>) {
        let mut queue = self.queue.write().await;
        for request in requests {
            if let Err(e) = queue.requeue(request) {
                error!("Failed to re-queue waiting request: {}", e);
            }
        }
    }

    /// Expire requests that waited longer than `queue.max_wait_seconds`
    pub async fn expire_waiting(&self) -> Result<Vec<Uuid>> {
        let expired = self.queue.write().await.remove_expired(Utc::now());
        for id in &expired {
            match self.manager.expire(id).await {
                Ok(_) => {}
                Err(MatchEngineError::InvalidTransition { .. }) => {
                    debug!("Queued request {} already left waiting", id);
                }
                Err(e) => return Err(e),
            }
        }
        self.routing_stats.write().await.expired += expired.len() as u64;
        Ok(expired)
    }

    /// Release a reservation that is not linked to live work
    ///
    /// Returns `false` when it was already released. A reservation still held
    /// by an assignment is refused; finish that assignment with `complete` or
    /// `expire` instead.
    pub async fn release_reservation(&self, reservation: &Reservation) -> Result<bool> {
        if let Some(holder) = self.manager.holder_of(&reservation.reservation_id).await {
            return Err(MatchEngineError::validation(format!(
                "reservation {} is held by assignment {}",
                reservation.reservation_id, holder
            )));
        }
        self.coordinator.release(reservation).await
    }

    pub async fn stats(&self) -> Result<EngineStats> {
        let pool = self.store.list().await?;
        let committed_hours = pool
            .iter()
            .fold(Hours::ZERO, |acc, p| acc.checked_add(p.current_load).unwrap_or(acc));

        Ok(EngineStats {
            assistants: pool.len(),
            available_assistants: pool
                .iter()
                .filter(|p| p.status == AssistantStatus::Available)
                .count(),
            committed_hours,
            outstanding_reservations: self.coordinator.outstanding(),
            late_commits: self.coordinator.late_commits(),
            assignments: self.manager.stats().await,
            queue: self.queue.read().await.stats(Utc::now()),
            routing: self.routing_stats.read().await.clone(),
        })
    }

    // Accessors

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn ProfileStore> {
        &self.store
    }

    pub fn ranking(&self) -> &RankingService {
        &self.ranking
    }

    pub fn coordinator(&self) -> &Arc<AssignmentCoordinator> {
        &self.coordinator
    }

    pub fn manager(&self) -> &Arc<AssignmentManager> {
        &self.manager
    }

    pub fn events(&self) -> &AssignmentEvents {
        &self.events
    }

    pub async fn queued(&self) -> usize {
        self.queue.read().await.len()
    }
}
