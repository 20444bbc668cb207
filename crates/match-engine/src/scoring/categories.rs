//! Category scores
//!
//! Each function maps one aspect of a candidate to a 0-100 score. The
//! thresholds are fixed business constants; they are behavioral contracts and
//! must not be tuned per deployment.

use crate::profile::{normalize_tag, AssistantProfile};
use crate::requirements::MatchRequirements;

use super::industries;
use super::timezone;

/// Category weights for the composite score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CategoryWeights {
    pub skills: f64,
    pub industry: f64,
    pub timezone: f64,
    pub language: f64,
    pub budget: f64,
}

pub const WEIGHTS: CategoryWeights = CategoryWeights {
    skills: 0.40,
    industry: 0.20,
    timezone: 0.15,
    language: 0.15,
    budget: 0.10,
};

/// Maximum bonus on top of the weighted sum
pub const MAX_BONUS: f64 = 10.0;

const SKILL_BASELINE: f64 = 70.0;
const SKILL_PREFERRED_POINTS: f64 = 30.0;
const SKILL_PROFICIENCY_POINTS: f64 = 30.0;

const BUDGET_BAND_LOW: f64 = 0.70;
const BUDGET_BAND_HIGH: f64 = 0.90;
const BUDGET_BELOW_BAND_SLOPE: f64 = 100.0;
const BUDGET_ABOVE_BAND_SLOPE: f64 = 200.0;

/// Skill category
///
/// 70 once every required skill is present, up to 30 more for the share of
/// preferred skills matched (full credit when none were asked for), and up to
/// 30 more from the average 0-10 proficiency of the required skills that have
/// a recorded proficiency. Capped at 100.
///
/// Preferred skills only ever add to the preferred share, so matching one
/// more of them never lowers the score.
pub fn skills_score(profile: &AssistantProfile, requirements: &MatchRequirements) -> f64 {
    let preferred = requirements.preferred_skills();
    let matched_preferred = preferred.iter().filter(|s| profile.has_skill(s)).count();

    let preferred_fraction = if preferred.is_empty() {
        1.0
    } else {
        matched_preferred as f64 / preferred.len() as f64
    };

    let proficiencies: Vec<f64> = requirements
        .required_skills()
        .iter()
        .filter_map(|skill| profile.proficiency(skill))
        .map(f64::from)
        .collect();
    let average_proficiency = if proficiencies.is_empty() {
        0.0
    } else {
        proficiencies.iter().sum::<f64>() / proficiencies.len() as f64
    };

    let score = SKILL_BASELINE
        + SKILL_PREFERRED_POINTS * preferred_fraction
        + SKILL_PROFICIENCY_POINTS * (average_proficiency / 10.0).min(1.0);
    score.min(100.0)
}

/// Industry category
pub fn industry_score(profile: &AssistantProfile, requirements: &MatchRequirements) -> f64 {
    let Some(target) = requirements.industry() else {
        return 100.0;
    };

    let experience: Vec<String> = profile.industries.iter().map(|i| normalize_tag(i)).collect();
    if experience.iter().any(|i| i == target) {
        100.0
    } else if experience.iter().any(|i| industries::is_related(target, i)) {
        70.0
    } else if !experience.is_empty() {
        40.0
    } else {
        0.0
    }
}

/// Timezone category
///
/// Only identical identifiers score 100; distinct zones at the same offset
/// fall in the 2 hour band. An assistant whose zone is missing or unknown
/// lands in the lowest band.
pub fn timezone_score(profile: &AssistantProfile, requirements: &MatchRequirements) -> f64 {
    let Some(client) = requirements.timezone() else {
        return 100.0;
    };
    let Some(assistant) = profile.timezone.as_deref() else {
        return 30.0;
    };

    if client.trim().eq_ignore_ascii_case(assistant.trim()) {
        return 100.0;
    }

    match timezone::offset_difference_hours(client, assistant) {
        Some(diff) if diff <= 2.0 => 90.0,
        Some(diff) if diff <= 4.0 => 70.0,
        Some(diff) if diff <= 6.0 => 50.0,
        _ => 30.0,
    }
}

/// Language category
pub fn language_score(profile: &AssistantProfile, requirements: &MatchRequirements) -> f64 {
    let required = requirements.languages();
    if required.is_empty() {
        return 100.0;
    }

    let matched = required.iter().filter(|l| profile.speaks(l)).count();
    let fraction = matched as f64 / required.len() as f64;

    if matched == required.len() {
        100.0
    } else if fraction >= 0.75 {
        85.0
    } else if fraction >= 0.5 {
        60.0
    } else {
        fraction * 50.0
    }
}

/// Budget category
///
/// Using 70-90% of the stated budget scores 100. Below the band the score
/// drops one point per percentage point, above it two points per percentage
/// point.
pub fn budget_score(profile: &AssistantProfile, requirements: &MatchRequirements) -> f64 {
    let Some(budget) = requirements.budget() else {
        return 100.0;
    };

    let utilization = profile.hourly_rate / budget;
    let score = if utilization < BUDGET_BAND_LOW {
        100.0 - (BUDGET_BAND_LOW - utilization) * BUDGET_BELOW_BAND_SLOPE
    } else if utilization <= BUDGET_BAND_HIGH {
        100.0
    } else {
        100.0 - (utilization - BUDGET_BAND_HIGH) * BUDGET_ABOVE_BAND_SLOPE
    };
    score.clamp(0.0, 100.0)
}

/// Additive bonus for track record, at most [`MAX_BONUS`]
pub fn bonus(profile: &AssistantProfile) -> f64 {
    let rating = if profile.rating >= 4.5 {
        5.0
    } else if profile.rating >= 4.0 {
        3.0
    } else if profile.rating >= 3.5 {
        1.0
    } else {
        0.0
    };

    let response = match profile.avg_response_minutes {
        Some(m) if m <= 30 => 3.0,
        Some(m) if m <= 60 => 2.0,
        Some(m) if m <= 120 => 1.0,
        _ => 0.0,
    };

    let experience = if profile.years_experience >= 5 {
        2.0
    } else if profile.years_experience >= 3 {
        1.0
    } else {
        0.0
    };

    f64::min(rating + response + experience, MAX_BONUS)
}
