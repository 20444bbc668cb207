//! Core types for assistant profiles

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::hours::{Hours, HOURS_PER_WEEK};
use super::normalize_tag;
use crate::error::{MatchEngineError, Result};

/// Assistant identifier type for strongly-typed assistant references
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssistantId(pub String);

impl From<String> for AssistantId {
    fn from(s: String) -> Self {
        AssistantId(s)
    }
}

impl From<&str> for AssistantId {
    fn from(s: &str) -> Self {
        AssistantId(s.to_string())
    }
}

impl AssistantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AssistantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for AssistantId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Assistant status
///
/// Only [`AssistantStatus::Available`] assistants can be scored or reserved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssistantStatus {
    /// Accepting new work
    Available,

    /// Working, not accepting new assignments
    Busy,

    /// Temporarily away
    Unavailable,

    /// Deactivated account
    Inactive,
}

impl AssistantStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssistantStatus::Available => "available",
            AssistantStatus::Busy => "busy",
            AssistantStatus::Unavailable => "unavailable",
            AssistantStatus::Inactive => "inactive",
        }
    }
}

impl std::str::FromStr for AssistantStatus {
    type Err = MatchEngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "available" => Ok(AssistantStatus::Available),
            "busy" => Ok(AssistantStatus::Busy),
            "unavailable" => Ok(AssistantStatus::Unavailable),
            "inactive" => Ok(AssistantStatus::Inactive),
            _ => Err(MatchEngineError::validation(format!("Unknown assistant status: {}", s))),
        }
    }
}

impl fmt::Display for AssistantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Service tier, totally ordered from general to technical
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceTier {
    #[default]
    General,
    Specialized,
    Executive,
    Technical,
}

impl ServiceTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceTier::General => "general",
            ServiceTier::Specialized => "specialized",
            ServiceTier::Executive => "executive",
            ServiceTier::Technical => "technical",
        }
    }
}

impl std::str::FromStr for ServiceTier {
    type Err = MatchEngineError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "general" => Ok(ServiceTier::General),
            "specialized" => Ok(ServiceTier::Specialized),
            "executive" => Ok(ServiceTier::Executive),
            "technical" => Ok(ServiceTier::Technical),
            _ => Err(MatchEngineError::validation(format!("Unknown service tier: {}", s))),
        }
    }
}

impl fmt::Display for ServiceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Spoken language fluency
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FluencyLevel {
    Basic,
    Conversational,
    Professional,
    Fluent,
    Native,
}

impl FluencyLevel {
    /// Professional, fluent and native speakers count toward language requirements
    pub fn is_working_level(&self) -> bool {
        matches!(self, FluencyLevel::Professional | FluencyLevel::Fluent | FluencyLevel::Native)
    }
}

/// A language the assistant speaks
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LanguageSkill {
    pub language: String,
    pub fluency: FluencyLevel,
}

/// Background check progress
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundCheckStatus {
    #[default]
    NotStarted,
    Pending,
    Approved,
    Rejected,
}

impl fmt::Display for BackgroundCheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BackgroundCheckStatus::NotStarted => "not_started",
            BackgroundCheckStatus::Pending => "pending",
            BackgroundCheckStatus::Approved => "approved",
            BackgroundCheckStatus::Rejected => "rejected",
        };
        f.write_str(s)
    }
}

/// Assistant information and profile snapshot
///
/// `current_load` is owned by the profile store once the profile is stored;
/// the engine only changes it through the store's atomic reserve and release
/// primitives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssistantProfile {
    /// Unique assistant identifier
    pub id: AssistantId,

    /// Skill tags
    #[serde(default)]
    pub skills: BTreeSet<String>,

    /// Tool name to proficiency on a 0-10 scale
    #[serde(default)]
    pub tool_proficiency: BTreeMap<String, u8>,

    /// Industries the assistant has worked in
    #[serde(default)]
    pub industries: BTreeSet<String>,

    /// Spoken languages
    #[serde(default)]
    pub languages: Vec<LanguageSkill>,

    /// Timezone identifier (IANA name or UTC offset)
    #[serde(default)]
    pub timezone: Option<String>,

    #[serde(default)]
    pub years_experience: u32,

    /// Hourly rate in whole currency units
    pub hourly_rate: f64,

    #[serde(default)]
    pub tier: ServiceTier,

    /// Hours per week the assistant can be committed to
    pub weekly_capacity: Hours,

    /// Hours per week already committed
    #[serde(default)]
    pub current_load: Hours,

    pub status: AssistantStatus,

    #[serde(default)]
    pub background_check: BackgroundCheckStatus,

    #[serde(default)]
    pub nda_signed: bool,

    /// Average client rating, 0-5
    #[serde(default)]
    pub rating: f64,

    #[serde(default)]
    pub completed_tasks: u32,

    /// Average response time in minutes, if known
    #[serde(default)]
    pub avg_response_minutes: Option<u32>,
}

impl AssistantProfile {
    /// Create a profile with a 40 hour week, no load and no credentials
    pub fn new(id: impl Into<AssistantId>) -> Self {
        Self {
            id: id.into(),
            skills: BTreeSet::new(),
            tool_proficiency: BTreeMap::new(),
            industries: BTreeSet::new(),
            languages: Vec::new(),
            timezone: None,
            years_experience: 0,
            hourly_rate: 0.0,
            tier: ServiceTier::General,
            weekly_capacity: Hours::whole(40),
            current_load: Hours::ZERO,
            status: AssistantStatus::Available,
            background_check: BackgroundCheckStatus::NotStarted,
            nda_signed: false,
            rating: 0.0,
            completed_tasks: 0,
            avg_response_minutes: None,
        }
    }

    pub fn with_skills<I, S>(mut self, skills: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.skills.extend(skills.into_iter().map(Into::into));
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>, proficiency: u8) -> Self {
        self.tool_proficiency.insert(tool.into(), proficiency);
        self
    }

    pub fn with_industries<I, S>(mut self, industries: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.industries.extend(industries.into_iter().map(Into::into));
        self
    }

    pub fn with_language(mut self, language: impl Into<String>, fluency: FluencyLevel) -> Self {
        self.languages.push(LanguageSkill {
            language: language.into(),
            fluency,
        });
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    pub fn with_experience(mut self, years: u32) -> Self {
        self.years_experience = years;
        self
    }

    pub fn with_rate(mut self, hourly_rate: f64) -> Self {
        self.hourly_rate = hourly_rate;
        self
    }

    pub fn with_tier(mut self, tier: ServiceTier) -> Self {
        self.tier = tier;
        self
    }

    pub fn with_capacity(mut self, weekly_capacity: Hours, current_load: Hours) -> Self {
        self.weekly_capacity = weekly_capacity;
        self.current_load = current_load;
        self
    }

    pub fn with_status(mut self, status: AssistantStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_background_check(mut self, status: BackgroundCheckStatus) -> Self {
        self.background_check = status;
        self
    }

    pub fn with_nda(mut self, signed: bool) -> Self {
        self.nda_signed = signed;
        self
    }

    /// Approved background check and signed NDA
    pub fn vetted(self) -> Self {
        self.with_background_check(BackgroundCheckStatus::Approved).with_nda(true)
    }

    pub fn with_rating(mut self, rating: f64) -> Self {
        self.rating = rating;
        self
    }

    pub fn with_completed_tasks(mut self, count: u32) -> Self {
        self.completed_tasks = count;
        self
    }

    pub fn with_response_minutes(mut self, minutes: u32) -> Self {
        self.avg_response_minutes = Some(minutes);
        self
    }

    /// Hours still free this week
    pub fn spare_hours(&self) -> Hours {
        self.weekly_capacity.saturating_sub(self.current_load)
    }

    /// Whether the skill set or the tool set contains a normalized tag
    pub fn has_skill(&self, normalized: &str) -> bool {
        self.skills
            .iter()
            .chain(self.tool_proficiency.keys())
            .any(|s| normalize_tag(s) == normalized)
    }

    /// Proficiency recorded for a normalized tool or skill tag
    pub fn proficiency(&self, normalized: &str) -> Option<u8> {
        self.tool_proficiency
            .iter()
            .find(|(tool, _)| normalize_tag(tool) == normalized)
            .map(|(_, level)| *level)
    }

    /// Whether the assistant speaks a normalized language at working level
    pub fn speaks(&self, normalized: &str) -> bool {
        self.languages
            .iter()
            .any(|l| l.fluency.is_working_level() && normalize_tag(&l.language) == normalized)
    }

    /// Check the structural invariants of a profile snapshot
    pub fn validate(&self) -> Result<()> {
        if self.id.0.trim().is_empty() {
            return Err(MatchEngineError::validation("assistant id cannot be empty"));
        }

        if !self.hourly_rate.is_finite() || self.hourly_rate < 0.0 {
            return Err(MatchEngineError::validation(format!(
                "assistant {}: hourly rate must be finite and non-negative",
                self.id
            )));
        }

        if !self.rating.is_finite() || !(0.0..=5.0).contains(&self.rating) {
            return Err(MatchEngineError::validation(format!(
                "assistant {}: rating {} outside 0-5",
                self.id, self.rating
            )));
        }

        if let Some((tool, level)) = self.tool_proficiency.iter().find(|(_, level)| **level > 10) {
            return Err(MatchEngineError::validation(format!(
                "assistant {}: proficiency {} for {} outside 0-10",
                self.id, level, tool
            )));
        }

        if self.skills.iter().any(|s| s.trim().is_empty()) {
            return Err(MatchEngineError::validation(format!(
                "assistant {}: blank skill tag",
                self.id
            )));
        }

        if self.weekly_capacity > Hours::whole(HOURS_PER_WEEK) {
            return Err(MatchEngineError::validation(format!(
                "assistant {}: weekly capacity {} exceeds {} hours",
                self.id, self.weekly_capacity, HOURS_PER_WEEK
            )));
        }

        if self.current_load > self.weekly_capacity {
            return Err(MatchEngineError::validation(format!(
                "assistant {}: current load {} exceeds weekly capacity {}",
                self.id, self.current_load, self.weekly_capacity
            )));
        }

        Ok(())
    }

    /// Copy with trimmed, lower-cased tags
    pub fn normalized(&self) -> Self {
        let mut profile = self.clone();
        profile.skills = self.skills.iter().map(|s| normalize_tag(s)).collect();
        profile.tool_proficiency = self
            .tool_proficiency
            .iter()
            .map(|(tool, level)| (normalize_tag(tool), *level))
            .collect();
        profile.industries = self.industries.iter().map(|s| normalize_tag(s)).collect();
        for language in &mut profile.languages {
            language.language = normalize_tag(&language.language);
        }
        profile.timezone = self.timezone.as_ref().map(|tz| tz.trim().to_string());
        profile
    }
}
