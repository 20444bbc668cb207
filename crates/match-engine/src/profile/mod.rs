//! Assistant profiles
//!
//! An [`AssistantProfile`] is a snapshot read from the profile store. Scoring
//! and ranking only read it; the only mutable field, `current_load`, changes
//! exclusively through [`crate::store::ProfileStore::try_reserve`] and
//! [`crate::store::ProfileStore::release`].
//!
//! # Examples
//!
//! ```
//! use staffline_match_engine::profile::{AssistantProfile, Hours, ServiceTier};
//!
//! let profile = AssistantProfile::new("va-001")
//!     .with_skills(["email", "calendar"])
//!     .with_rate(30.0)
//!     .with_tier(ServiceTier::Specialized)
//!     .with_capacity(Hours::whole(40), Hours::whole(25))
//!     .vetted();
//!
//! assert!(profile.validate().is_ok());
//! assert_eq!(profile.spare_hours(), Hours::whole(15));
//! ```

pub mod hours;
pub mod types;

pub use hours::{Hours, HOURS_PER_WEEK};
pub use types::{
    AssistantId, AssistantProfile, AssistantStatus, BackgroundCheckStatus, FluencyLevel,
    LanguageSkill, ServiceTier,
};

/// Canonical form for skill, tool, industry and language tags
///
/// Tags compare case-insensitively and treat spaces and hyphens like underscores,
/// so "Real Estate", "real-estate" and "real_estate" are the same industry.
pub fn normalize_tag(tag: &str) -> String {
    tag.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_tag() {
        assert_eq!(normalize_tag("  Real Estate "), "real_estate");
        assert_eq!(normalize_tag("real-estate"), "real_estate");
        assert_eq!(normalize_tag("EMAIL"), "email");
    }
}
