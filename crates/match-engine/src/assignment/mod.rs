//! # Assignment Coordination
//!
//! Turns a preference-ordered candidate list into at most one committed
//! capacity reservation. The coordinator never decides who is preferred; it
//! takes the order it is given (ranked matches, or least-loaded for live
//! routing) and walks it until one assistant accepts.

pub mod coordinator;

pub use coordinator::{AssignOutcome, AssignmentCoordinator, Reservation};
