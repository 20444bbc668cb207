use thiserror::Error;

/// Error types for matching and assignment operations
///
/// Disqualifying a candidate and running out of candidates are normal outcomes
/// (see [`crate::scoring::ScoreOutcome`] and [`crate::assignment::AssignOutcome`]),
/// so neither appears here. Everything in this enum is something the caller has
/// to react to.
///
/// # Examples
///
/// ```
/// use staffline_match_engine::{MatchEngineError, Result};
///
/// fn check_budget(budget: f64) -> Result<()> {
///     if budget <= 0.0 {
///         return Err(MatchEngineError::validation("budget must be greater than zero"));
///     }
///     Ok(())
/// }
///
/// match check_budget(0.0) {
///     Err(MatchEngineError::Validation(msg)) => println!("rejected: {}", msg),
///     other => panic!("unexpected: {:?}", other),
/// }
/// ```
#[derive(Error, Debug)]
pub enum MatchEngineError {
    /// Malformed or missing input
    ///
    /// Raised before any scoring happens; no partial result is ever produced
    /// alongside this error.
    ///
    /// # Examples
    /// - Budget of zero or below
    /// - No required skills
    /// - Unknown service tier
    /// - Unresolvable client timezone
    #[error("Validation error: {0}")]
    Validation(String),

    /// The profile store cannot serve reads or writes
    ///
    /// This is an infrastructure failure and is retryable. It is kept distinct
    /// from an exhausted candidate pool so callers never report "no assistants
    /// available" during a dependency outage.
    #[error("Profile store unavailable: {0}")]
    StoreUnavailable(String),

    /// Requested assistant, assignment, handoff or reservation does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// A lifecycle transition that is not in the transition table
    #[error("Invalid {entity} transition: {from} -> {to}")]
    InvalidTransition {
        entity: &'static str,
        from: String,
        to: String,
    },

    /// An operation would break a capacity invariant
    ///
    /// The atomic reservation primitive makes overcommit unreachable; seeing
    /// this means a release was issued for hours that were never reserved.
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unexpected internal failure
    #[error("Internal error: {0}")]
    Internal(String),
}

impl MatchEngineError {
    /// Create a new Validation error with the provided message
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new StoreUnavailable error with the provided message
    pub fn store_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Create a new NotFound error with the provided message
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvariantViolation error with the provided message
    pub fn invariant<S: Into<String>>(msg: S) -> Self {
        Self::InvariantViolation(msg.into())
    }

    /// Create a new Configuration error with the provided message
    pub fn configuration<S: Into<String>>(msg: S) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a new Internal error with the provided message
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Create an InvalidTransition error for a lifecycle entity
    pub fn invalid_transition(
        entity: &'static str,
        from: impl std::fmt::Display,
        to: impl std::fmt::Display,
    ) -> Self {
        Self::InvalidTransition {
            entity,
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Whether the caller may retry the same operation later
    ///
    /// ```
    /// use staffline_match_engine::MatchEngineError;
    ///
    /// assert!(MatchEngineError::store_unavailable("pool timed out").is_retryable());
    /// assert!(!MatchEngineError::validation("bad tier").is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<sqlx::Error> for MatchEngineError {
    fn from(err: sqlx::Error) -> Self {
        Self::StoreUnavailable(err.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for MatchEngineError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        Self::StoreUnavailable(format!("migration failed: {}", err))
    }
}

impl From<serde_json::Error> for MatchEngineError {
    fn from(err: serde_json::Error) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Result type for matching engine operations
pub type Result<T> = std::result::Result<T, MatchEngineError>;
