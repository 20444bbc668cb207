//! Client match requirements
//!
//! [`MatchRequirements`] can only be obtained through [`MatchRequirementsBuilder::build`],
//! which normalizes tags and rejects malformed input up front. Once built the
//! value is immutable, so a scoring pass always sees exactly what was validated.
//!
//! # Examples
//!
//! ```
//! use staffline_match_engine::requirements::MatchRequirements;
//!
//! let requirements = MatchRequirements::builder()
//!     .required_skills(["Email", "Calendar"])
//!     .preferred_skills(["quickbooks"])
//!     .industry("Real Estate")
//!     .budget(35.0)
//!     .timezone("America/New_York")
//!     .languages(["English"])
//!     .min_tier("specialized")
//!     .hours_per_week(10.0)
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(requirements.required_skills(), ["email", "calendar"]);
//! assert_eq!(requirements.industry(), Some("real_estate"));
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{MatchEngineError, Result};
use crate::profile::{normalize_tag, Hours, ServiceTier, HOURS_PER_WEEK};
use crate::scoring::timezone;

/// Validated, immutable client requirements
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchRequirements {
    required_skills: Vec<String>,
    preferred_skills: Vec<String>,
    industry: Option<String>,
    budget: Option<f64>,
    timezone: Option<String>,
    languages: Vec<String>,
    min_tier: ServiceTier,
    hours_per_week: Hours,
}

impl MatchRequirements {
    pub fn builder() -> MatchRequirementsBuilder {
        MatchRequirementsBuilder::default()
    }

    /// Skills every candidate must have
    pub fn required_skills(&self) -> &[String] {
        &self.required_skills
    }

    /// Skills that raise the score when present
    pub fn preferred_skills(&self) -> &[String] {
        &self.preferred_skills
    }

    pub fn industry(&self) -> Option<&str> {
        self.industry.as_deref()
    }

    /// Maximum hourly rate
    pub fn budget(&self) -> Option<f64> {
        self.budget
    }

    pub fn timezone(&self) -> Option<&str> {
        self.timezone.as_deref()
    }

    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn min_tier(&self) -> ServiceTier {
        self.min_tier
    }

    pub fn hours_per_week(&self) -> Hours {
        self.hours_per_week
    }
}

/// Loosely-typed requirement input, as received from an intake layer
///
/// Every field is optional here; [`MatchRequirementsBuilder::build`] decides
/// what is acceptable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct MatchRequirementsBuilder {
    required_skills: Vec<String>,
    preferred_skills: Vec<String>,
    industry: Option<String>,
    budget: Option<f64>,
    timezone: Option<String>,
    languages: Vec<String>,
    tier: Option<String>,
    hours_per_week: Option<f64>,
}

impl MatchRequirementsBuilder {
    pub fn required_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.required_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn preferred_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.preferred_skills = skills.into_iter().map(Into::into).collect();
        self
    }

    pub fn industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn budget(mut self, budget: f64) -> Self {
        self.budget = Some(budget);
        self
    }

    pub fn timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn languages<I, S>(mut self, languages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.languages = languages.into_iter().map(Into::into).collect();
        self
    }

    pub fn min_tier(mut self, tier: impl Into<String>) -> Self {
        self.tier = Some(tier.into());
        self
    }

    pub fn hours_per_week(mut self, hours: f64) -> Self {
        self.hours_per_week = Some(hours);
        self
    }

    /// Validate and freeze the requirements
    ///
    /// # Validation Rules
    ///
    /// - At least one required skill, and no blank skill or language tags
    /// - Budget, when given, is finite and greater than zero
    /// - Hours per week are given, greater than zero and at most 168
    /// - Tier, when given, is a known tier
    /// - Client timezone, when given, resolves to a UTC offset
    pub fn build(self) -> Result<MatchRequirements> {
        let required_skills = normalize_list("required skill", &self.required_skills)?;
        if required_skills.is_empty() {
            return Err(MatchEngineError::validation("at least one required skill must be specified"));
        }
        let preferred_skills = normalize_list("preferred skill", &self.preferred_skills)?;
        let languages = normalize_list("language", &self.languages)?;

        if let Some(budget) = self.budget {
            if !budget.is_finite() || budget <= 0.0 {
                return Err(MatchEngineError::validation(format!(
                    "budget must be greater than zero (got {})",
                    budget
                )));
            }
        }

        let hours = self
            .hours_per_week
            .ok_or_else(|| MatchEngineError::validation("hours per week must be specified"))?;
        let hours_per_week = Hours::from_f64(hours)?;
        if hours_per_week.is_zero() {
            return Err(MatchEngineError::validation("hours per week must be greater than zero"));
        }
        if hours_per_week > Hours::whole(HOURS_PER_WEEK) {
            return Err(MatchEngineError::validation(format!(
                "hours per week cannot exceed {}",
                HOURS_PER_WEEK
            )));
        }

        let min_tier = match self.tier.as_deref().map(str::trim) {
            None | Some("") => ServiceTier::General,
            Some(tier) => tier.parse()?,
        };

        let industry = self
            .industry
            .as_deref()
            .map(normalize_tag)
            .filter(|industry| !industry.is_empty());

        let timezone = match self.timezone.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(tz) => {
                if timezone::utc_offset_minutes(tz).is_none() {
                    return Err(MatchEngineError::validation(format!("Unknown timezone: {}", tz)));
                }
                Some(tz.to_string())
            }
        };

        Ok(MatchRequirements {
            required_skills,
            preferred_skills,
            industry,
            budget: self.budget,
            timezone,
            languages,
            min_tier,
            hours_per_week,
        })
    }
}

/// Normalize tags, reject blanks, drop duplicates while keeping first-seen order
fn normalize_list(what: &str, raw: &[String]) -> Result<Vec<String>> {
    let mut out: Vec<String> = Vec::with_capacity(raw.len());
    for tag in raw {
        let normalized = normalize_tag(tag);
        if normalized.is_empty() {
            return Err(MatchEngineError::validation(format!("blank {} tag", what)));
        }
        if !out.contains(&normalized) {
            out.push(normalized);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> MatchRequirementsBuilder {
        MatchRequirements::builder()
            .required_skills(["email"])
            .hours_per_week(10.0)
    }

    #[test]
    fn test_minimal_requirements() {
        let req = base().build().unwrap();
        assert_eq!(req.min_tier(), ServiceTier::General);
        assert_eq!(req.budget(), None);
        assert_eq!(req.hours_per_week(), Hours::whole(10));
    }

    #[test]
    fn test_rejects_non_positive_budget() {
        assert!(matches!(base().budget(0.0).build(), Err(MatchEngineError::Validation(_))));
        assert!(matches!(base().budget(-5.0).build(), Err(MatchEngineError::Validation(_))));
    }

    #[test]
    fn test_rejects_empty_required_skills() {
        let result = MatchRequirements::builder().hours_per_week(5.0).build();
        assert!(matches!(result, Err(MatchEngineError::Validation(_))));
    }

    #[test]
    fn test_rejects_blank_skill() {
        let result = base().preferred_skills(["  "]).build();
        assert!(matches!(result, Err(MatchEngineError::Validation(_))));
    }

    #[test]
    fn test_rejects_unknown_tier() {
        let result = base().min_tier("platinum").build();
        assert!(matches!(result, Err(MatchEngineError::Validation(_))));
    }

    #[test]
    fn test_rejects_missing_or_zero_hours() {
        let result = MatchRequirements::builder().required_skills(["email"]).build();
        assert!(result.is_err());
        assert!(base().hours_per_week(0.0).build().is_err());
        assert!(base().hours_per_week(200.0).build().is_err());
    }

    #[test]
    fn test_rejects_unknown_timezone() {
        assert!(base().timezone("Mars/Olympus_Mons").build().is_err());
        assert!(base().timezone("UTC+5:30").build().is_ok());
    }

    #[test]
    fn test_non_ascii_offset_is_validation_error() {
        let result = base().timezone("UTC+1é1").build();
        assert!(matches!(result, Err(MatchEngineError::Validation(_))));
    }

    #[test]
    fn test_deduplicates_skills() {
        let req = base().required_skills(["Email", "email ", "calendar"]).build().unwrap();
        assert_eq!(req.required_skills(), ["email", "calendar"]);
    }

    #[test]
    fn test_builder_from_json() {
        let builder: MatchRequirementsBuilder = serde_json::from_str(
            r#"{ "requiredSkills": ["email"], "budget": 35, "tier": "executive", "hoursPerWeek": 10 }"#,
        )
        .unwrap();
        let req = builder.build().unwrap();
        assert_eq!(req.min_tier(), ServiceTier::Executive);
        assert_eq!(req.budget(), Some(35.0));
    }
}
