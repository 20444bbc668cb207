//! # Staffline Match Engine
//!
//! Matches clients who need help with virtual assistants who can give it, and
//! commits assistant capacity without ever over-booking anyone.
//!
//! ## Overview
//!
//! - **Scoring**: hard filters (availability, capacity, skills, budget, tier,
//!   vetting) followed by a weighted 0-100 composite over skills, industry,
//!   timezone, language and budget fit, plus a small quality bonus
//! - **Ranking**: deterministic top-N ordering with explicit tie-breaks
//! - **Assignment**: an atomic check-and-increment reservation per assistant,
//!   walked in preference order until one assistant accepts
//! - **Lifecycles**: explicit transition tables for suggestions, live
//!   requests and handoffs, with every transition broadcast as an event
//! - **Persistence**: in-memory or SQLite (sqlx) profile stores
//!
//! ## Architecture
//!
//! ```text
//!                      ┌─────────────────┐
//!                      │   MatchEngine   │
//!                      └─────────────────┘
//!                               │
//!        ┌──────────────────────┼──────────────────────┐
//!        │                      │                      │
//! ┌──────────────┐   ┌───────────────────┐   ┌──────────────────┐
//! │RankingService│   │ AssignmentManager │   │   WaitingQueue   │
//! └──────────────┘   └───────────────────┘   └──────────────────┘
//!        │                      │
//! ┌──────────────┐   ┌───────────────────────┐   ┌──────────────────┐
//! │   scoring    │   │ AssignmentCoordinator │──▶│ AssignmentEvents │
//! └──────────────┘   └───────────────────────┘   └──────────────────┘
//!                               │
//!                      ┌─────────────────┐
//!                      │  ProfileStore   │ (in-memory or SQLite)
//!                      └─────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use staffline_match_engine::prelude::*;
//!
//! # async fn example() -> Result<()> {
//! let engine = MatchEngine::in_memory(EngineConfig::default())?;
//!
//! engine
//!     .register_assistant(
//!         AssistantProfile::new("va-001")
//!             .with_skills(["email", "calendar"])
//!             .with_industries(["healthcare"])
//!             .with_timezone("America/New_York")
//!             .with_rate(30.0)
//!             .with_capacity(Hours::whole(40), Hours::whole(10))
//!             .vetted(),
//!     )
//!     .await?;
//!
//! let requirements = MatchRequirements::builder()
//!     .required_skills(["email"])
//!     .industry("healthcare")
//!     .timezone("America/New_York")
//!     .budget(35.0)
//!     .hours_per_week(10.0)
//!     .build()?;
//!
//! for m in engine.find_matches(&requirements, None).await? {
//!     println!("{} scored {} (~{}/month)", m.assistant_id, m.score, m.estimated_monthly_cost);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Key Modules
//!
//! - [`scoring`]: per-candidate filters and weighted scoring
//! - [`ranking`]: ordering and truncation of scored candidates
//! - [`store`]: the [`store::ProfileStore`] trait and the in-memory store
//! - [`database`]: the SQLite profile store
//! - [`assignment`]: candidate walks and compensating release
//! - [`lifecycle`]: assignment and handoff state machines
//! - [`queue`]: waiting live requests
//! - [`events`]: transition broadcasting and history
//! - [`engine`]: the [`MatchEngine`] facade
//! - [`config`]: configuration and validation
//! - [`error`]: error handling and result types

// Core modules
pub mod config;
pub mod error;

// Domain model
pub mod profile;
pub mod requirements;

// Matching
pub mod ranking;
pub mod scoring;

// Capacity and assignment
pub mod assignment;
pub mod database;
pub mod lifecycle;
pub mod queue;
pub mod store;

pub mod engine;
pub mod events;

// Re-exports for convenience
pub use config::EngineConfig;
pub use engine::MatchEngine;
pub use error::{MatchEngineError, Result};

pub mod prelude {
    //! Commonly used types and traits
    //!
    //! Re-exports the items most callers need, so a single import is enough
    //! to rank, assign and drive lifecycles.

    pub use crate::{EngineConfig, MatchEngine, MatchEngineError, Result};

    pub use crate::engine::{BestMatchOutcome, EngineStats, LiveRequestOutcome, RoutingStats};

    pub use crate::config::{AssignmentConfig, DatabaseConfig, EventConfig, QueueConfig, RankingConfig};

    pub use crate::profile::{
        AssistantId, AssistantProfile, AssistantStatus, BackgroundCheckStatus, FluencyLevel, Hours,
        LanguageSkill, ServiceTier,
    };
    pub use crate::requirements::{MatchRequirements, MatchRequirementsBuilder};

    pub use crate::ranking::{RankingReport, RankingService, Rejection};
    pub use crate::scoring::{DisqualificationReason, MatchResult, ScoreBreakdown, ScoreOutcome};

    pub use crate::assignment::{AssignOutcome, AssignmentCoordinator, Reservation};
    pub use crate::database::SqliteProfileStore;
    pub use crate::store::{InMemoryProfileStore, ProfileStore, ReserveOutcome};

    pub use crate::lifecycle::{
        AcceptOutcome, Assignment, AssignmentId, AssignmentManager, AssignmentStats, AssignmentStatus,
        Handoff, HandoffOutcome, HandoffStatus, Lifecycle, LiveStatus, RouteOutcome, SuggestionStatus,
    };

    pub use crate::events::{AssignmentEvent, AssignmentEvents, EventKind};
    pub use crate::queue::{QueueStats, QueuedRequest, WaitingQueue};
}
