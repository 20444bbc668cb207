//! Fixed-point hour quantities
//!
//! Capacity arithmetic runs on hundredths of an hour so that reserving and then
//! releasing the same amount always lands on the exact starting value, no
//! matter how many other reservations interleave.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{MatchEngineError, Result};

/// Number of hours in a week, the upper bound for any weekly figure
pub const HOURS_PER_WEEK: u32 = 168;

/// A non-negative amount of hours with two decimal places of precision
///
/// Serializes as a plain floating-point hour value (`12.5`).
///
/// ```
/// use staffline_match_engine::profile::Hours;
///
/// let capacity = Hours::whole(40);
/// let load = Hours::from_f64(37.5).unwrap();
/// assert_eq!(capacity.saturating_sub(load), Hours::from_f64(2.5).unwrap());
/// assert!(Hours::from_f64(-1.0).is_err());
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Hours(u32);

impl Hours {
    pub const ZERO: Hours = Hours(0);

    /// Build from hundredths of an hour
    pub const fn from_centi(centi: u32) -> Self {
        Hours(centi)
    }

    /// Build from a whole number of hours
    pub const fn whole(hours: u32) -> Self {
        Hours(hours.saturating_mul(100))
    }

    /// Build from a floating-point hour value, rounding to the nearest hundredth
    pub fn from_f64(hours: f64) -> Result<Self> {
        if !hours.is_finite() || hours < 0.0 {
            return Err(MatchEngineError::validation(format!(
                "hours must be a finite, non-negative number (got {})",
                hours
            )));
        }
        let centi = (hours * 100.0).round();
        if centi > u32::MAX as f64 {
            return Err(MatchEngineError::validation(format!("hours value {} is too large", hours)));
        }
        Ok(Hours(centi as u32))
    }

    /// Hundredths of an hour
    pub const fn centi(self) -> u32 {
        self.0
    }

    pub fn as_f64(self) -> f64 {
        self.0 as f64 / 100.0
    }

    pub fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Hours) -> Option<Hours> {
        self.0.checked_add(other.0).map(Hours)
    }

    pub fn checked_sub(self, other: Hours) -> Option<Hours> {
        self.0.checked_sub(other.0).map(Hours)
    }

    pub fn saturating_sub(self, other: Hours) -> Hours {
        Hours(self.0.saturating_sub(other.0))
    }
}

impl TryFrom<f64> for Hours {
    type Error = MatchEngineError;

    fn try_from(value: f64) -> Result<Self> {
        Hours::from_f64(value)
    }
}

impl From<Hours> for f64 {
    fn from(hours: Hours) -> f64 {
        hours.as_f64()
    }
}

impl fmt::Display for Hours {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}h", self.as_f64())
    }
}
