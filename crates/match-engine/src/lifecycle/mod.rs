//! Assignment lifecycles
//!
//! - [`states`]: transition tables for suggestions, live requests and handoffs
//! - [`records`]: the assignment and handoff records
//! - [`manager`]: [`AssignmentManager`], which owns the records and performs
//!   every transition

pub mod manager;
pub mod records;
pub mod states;

pub use manager::{AcceptOutcome, AssignmentManager, AssignmentStats, HandoffOutcome, RouteOutcome};
pub use records::{Assignment, AssignmentId, Handoff};
pub use states::{AssignmentStatus, HandoffStatus, Lifecycle, LiveStatus, SuggestionStatus};
