//! Scoring engine
//!
//! [`score`] is a pure function of one profile snapshot and one set of
//! requirements. It either disqualifies the candidate with a reason, or
//! produces a [`MatchResult`] with a 0-100 composite score and the per-category
//! breakdown that led to it.
//!
//! # Composite Score
//!
//! | Category | Weight |
//! |----------|--------|
//! | Skills   | 0.40   |
//! | Industry | 0.20   |
//! | Timezone | 0.15   |
//! | Language | 0.15   |
//! | Budget   | 0.10   |
//!
//! A track-record bonus of at most 10 points is added on top of the weighted
//! sum and the total is clamped to 100.
//!
//! # Examples
//!
//! ```
//! use staffline_match_engine::profile::{AssistantProfile, Hours, ServiceTier};
//! use staffline_match_engine::requirements::MatchRequirements;
//! use staffline_match_engine::scoring::{score, ScoreOutcome};
//!
//! let requirements = MatchRequirements::builder()
//!     .required_skills(["email", "calendar"])
//!     .budget(35.0)
//!     .hours_per_week(10.0)
//!     .build()
//!     .unwrap();
//!
//! let profile = AssistantProfile::new("A")
//!     .with_skills(["email", "calendar"])
//!     .with_rate(30.0)
//!     .with_tier(ServiceTier::Specialized)
//!     .with_capacity(Hours::whole(40), Hours::whole(25))
//!     .vetted();
//!
//! match score(&profile, &requirements) {
//!     ScoreOutcome::Scored(result) => assert_eq!(result.score, 100),
//!     ScoreOutcome::Disqualified(reason) => panic!("disqualified: {}", reason),
//! }
//! ```

pub mod categories;
pub mod industries;
pub mod timezone;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::profile::{
    AssistantId, AssistantProfile, AssistantStatus, BackgroundCheckStatus, Hours, ServiceTier,
};
use crate::requirements::MatchRequirements;

pub use categories::{CategoryWeights, MAX_BONUS, WEIGHTS};

/// Average number of weeks in a month used for cost estimates
pub const WEEKS_PER_MONTH: f64 = 4.33;

/// Why a candidate was removed before scoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DisqualificationReason {
    /// Status other than available
    NotAvailable(AssistantStatus),
    /// Spare hours below the requested hours per week
    InsufficientCapacity { spare: Hours, requested: Hours },
    /// Required skills found in neither the skill set nor the tool set
    MissingSkills(Vec<String>),
    /// Hourly rate above the client budget
    OverBudget { rate: f64, budget: f64 },
    TierTooLow { tier: ServiceTier, required: ServiceTier },
    BackgroundCheckNotApproved(BackgroundCheckStatus),
    NdaNotSigned,
}

impl DisqualificationReason {
    /// Stable reason code for callers that explain empty result sets
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotAvailable(_) => "not_available",
            Self::InsufficientCapacity { .. } => "insufficient_capacity",
            Self::MissingSkills(_) => "missing_skills",
            Self::OverBudget { .. } => "over_budget",
            Self::TierTooLow { .. } => "tier_too_low",
            Self::BackgroundCheckNotApproved(_) => "background_check_not_approved",
            Self::NdaNotSigned => "nda_not_signed",
        }
    }
}

impl fmt::Display for DisqualificationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAvailable(status) => write!(f, "assistant is {}", status),
            Self::InsufficientCapacity { spare, requested } => {
                write!(f, "insufficient spare capacity: {} free, {} requested", spare, requested)
            }
            Self::MissingSkills(skills) => write!(f, "missing required skills: {}", skills.join(", ")),
            Self::OverBudget { rate, budget } => {
                write!(f, "hourly rate {:.2} exceeds budget {:.2}", rate, budget)
            }
            Self::TierTooLow { tier, required } => {
                write!(f, "tier {} is below required tier {}", tier, required)
            }
            Self::BackgroundCheckNotApproved(status) => {
                write!(f, "background check is {}", status)
            }
            Self::NdaNotSigned => write!(f, "NDA not signed"),
        }
    }
}

/// Per-category scores, each rounded to two decimals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub skills: f64,
    pub industry: f64,
    pub timezone: f64,
    pub language: f64,
    pub budget: f64,
    pub bonus: f64,
}

impl ScoreBreakdown {
    /// Weighted category sum plus bonus, clamped to 0-100
    pub fn composite(&self) -> f64 {
        let weighted = self.skills * WEIGHTS.skills
            + self.industry * WEIGHTS.industry
            + self.timezone * WEIGHTS.timezone
            + self.language * WEIGHTS.language
            + self.budget * WEIGHTS.budget;
        (weighted + self.bonus).clamp(0.0, 100.0)
    }
}

/// A scored, qualified candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub assistant_id: AssistantId,

    /// Composite score, 0-100
    pub score: u8,

    pub breakdown: ScoreBreakdown,

    /// `hourly_rate × hours_per_week × 4.33`, rounded to a whole unit
    pub estimated_monthly_cost: u64,
}

/// Result of scoring a single candidate
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Disqualified(DisqualificationReason),
    Scored(MatchResult),
}

impl ScoreOutcome {
    pub fn is_disqualified(&self) -> bool {
        matches!(self, Self::Disqualified(_))
    }

    pub fn into_result(self) -> Option<MatchResult> {
        match self {
            Self::Scored(result) => Some(result),
            Self::Disqualified(_) => None,
        }
    }
}

/// Score one candidate against a set of requirements
pub fn score(profile: &AssistantProfile, requirements: &MatchRequirements) -> ScoreOutcome {
    if let Some(reason) = disqualify(profile, requirements) {
        return ScoreOutcome::Disqualified(reason);
    }

    let breakdown = ScoreBreakdown {
        skills: round2(categories::skills_score(profile, requirements)),
        industry: round2(categories::industry_score(profile, requirements)),
        timezone: round2(categories::timezone_score(profile, requirements)),
        language: round2(categories::language_score(profile, requirements)),
        budget: round2(categories::budget_score(profile, requirements)),
        bonus: round2(categories::bonus(profile)),
    };
    let composite = breakdown.composite().round() as u8;

    ScoreOutcome::Scored(MatchResult {
        assistant_id: profile.id.clone(),
        score: composite,
        breakdown,
        estimated_monthly_cost: estimated_monthly_cost(profile.hourly_rate, requirements.hours_per_week()),
    })
}

/// Monthly cost estimate for a weekly commitment
pub fn estimated_monthly_cost(hourly_rate: f64, hours_per_week: Hours) -> u64 {
    let cost = hourly_rate * hours_per_week.as_f64() * WEEKS_PER_MONTH;
    if cost.is_finite() && cost > 0.0 {
        cost.round() as u64
    } else {
        0
    }
}

/// Hard filters, in order; the first failing filter wins
fn disqualify(profile: &AssistantProfile, requirements: &MatchRequirements) -> Option<DisqualificationReason> {
    if profile.status != AssistantStatus::Available {
        return Some(DisqualificationReason::NotAvailable(profile.status));
    }

    let requested = requirements.hours_per_week();
    let spare = profile.spare_hours();
    if spare < requested {
        return Some(DisqualificationReason::InsufficientCapacity { spare, requested });
    }

    let missing: Vec<String> = requirements
        .required_skills()
        .iter()
        .filter(|skill| !profile.has_skill(skill))
        .cloned()
        .collect();
    if !missing.is_empty() {
        return Some(DisqualificationReason::MissingSkills(missing));
    }

    if let Some(budget) = requirements.budget() {
        if profile.hourly_rate > budget {
            return Some(DisqualificationReason::OverBudget {
                rate: profile.hourly_rate,
                budget,
            });
        }
    }

    if profile.tier < requirements.min_tier() {
        return Some(DisqualificationReason::TierTooLow {
            tier: profile.tier,
            required: requirements.min_tier(),
        });
    }

    if profile.background_check != BackgroundCheckStatus::Approved {
        return Some(DisqualificationReason::BackgroundCheckNotApproved(profile.background_check));
    }

    if !profile.nda_signed {
        return Some(DisqualificationReason::NdaNotSigned);
    }

    None
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assistant_a(load: u32) -> AssistantProfile {
        AssistantProfile::new("A")
            .with_skills(["email", "calendar"])
            .with_rate(30.0)
            .with_tier(ServiceTier::Specialized)
            .with_capacity(Hours::whole(40), Hours::whole(load))
            .vetted()
    }

    fn request() -> MatchRequirements {
        MatchRequirements::builder()
            .required_skills(["email", "calendar"])
            .budget(35.0)
            .hours_per_week(10.0)
            .build()
            .unwrap()
    }

    #[test]
    fn test_insufficient_spare_capacity_disqualifies() {
        let outcome = score(&assistant_a(35), &request());
        match outcome {
            ScoreOutcome::Disqualified(DisqualificationReason::InsufficientCapacity { spare, requested }) => {
                assert_eq!(spare, Hours::whole(5));
                assert_eq!(requested, Hours::whole(10));
            }
            other => panic!("expected capacity disqualification, got {:?}", other),
        }
    }

    #[test]
    fn test_exact_match_scores_full_marks() {
        let result = score(&assistant_a(25), &request()).into_result().unwrap();
        assert_eq!(result.score, 100);
        assert_eq!(result.breakdown.skills, 100.0);
        assert_eq!(result.breakdown.industry, 100.0);
        assert_eq!(result.breakdown.timezone, 100.0);
        assert_eq!(result.breakdown.language, 100.0);
        assert_eq!(result.breakdown.budget, 100.0);
        assert_eq!(result.breakdown.bonus, 0.0);
        // 30 × 10 × 4.33
        assert_eq!(result.estimated_monthly_cost, 1299);
    }

    #[test]
    fn test_filter_order() {
        let busy = assistant_a(0).with_status(AssistantStatus::Busy);
        assert_eq!(
            score(&busy, &request()),
            ScoreOutcome::Disqualified(DisqualificationReason::NotAvailable(AssistantStatus::Busy))
        );

        let missing = AssistantProfile::new("B").with_skills(["email"]).vetted();
        match score(&missing, &request()) {
            ScoreOutcome::Disqualified(reason) => {
                assert_eq!(reason, DisqualificationReason::MissingSkills(vec!["calendar".to_string()]));
                assert_eq!(reason.code(), "missing_skills");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_tool_counts_as_required_skill() {
        let profile = AssistantProfile::new("B")
            .with_skills(["email"])
            .with_tool("Calendar", 7)
            .vetted();
        assert!(!score(&profile, &request()).is_disqualified());
    }

    #[test]
    fn test_commercial_and_trust_filters() {
        let pricey = assistant_a(0).with_rate(40.0);
        assert_eq!(score(&pricey, &request()).into_result(), None);

        let exec_request = MatchRequirements::builder()
            .required_skills(["email"])
            .min_tier("executive")
            .hours_per_week(5.0)
            .build()
            .unwrap();
        match score(&assistant_a(0), &exec_request) {
            ScoreOutcome::Disqualified(reason) => assert_eq!(reason.code(), "tier_too_low"),
            other => panic!("unexpected {:?}", other),
        }

        let unchecked = assistant_a(0).with_background_check(BackgroundCheckStatus::Pending);
        match score(&unchecked, &request()) {
            ScoreOutcome::Disqualified(reason) => assert_eq!(reason.code(), "background_check_not_approved"),
            other => panic!("unexpected {:?}", other),
        }

        let no_nda = assistant_a(0).with_nda(false);
        assert_eq!(
            score(&no_nda, &request()),
            ScoreOutcome::Disqualified(DisqualificationReason::NdaNotSigned)
        );
    }

    #[test]
    fn test_bonus_is_clamped() {
        let star = assistant_a(0)
            .with_rating(5.0)
            .with_response_minutes(5)
            .with_experience(10);
        let result = score(&star, &request()).into_result().unwrap();
        assert_eq!(result.breakdown.bonus, 10.0);
        assert_eq!(result.score, 100);
    }

    #[test]
    fn test_weighted_composite() {
        let requirements = MatchRequirements::builder()
            .required_skills(["email"])
            .industry("healthcare")
            .hours_per_week(10.0)
            .build()
            .unwrap();
        let profile = AssistantProfile::new("C")
            .with_skills(["email"])
            .with_industries(["gaming"])
            .vetted();
        let result = score(&profile, &requirements).into_result().unwrap();
        // 40 + 0.20 × 40 + 15 + 15 + 10
        assert_eq!(result.breakdown.industry, 40.0);
        assert_eq!(result.score, 88);
    }

    #[test]
    fn test_reason_serializes_with_code_tag() {
        let json = serde_json::to_value(DisqualificationReason::NdaNotSigned).unwrap();
        assert_eq!(json["reason"], "nda_not_signed");
    }
}
