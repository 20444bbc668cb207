//! Ranking service
//!
//! Scores a candidate pool, drops disqualified candidates and sorts the rest
//! into a total order. Two rankings of the same pool with the same
//! requirements are always identical, whatever order the pool arrived in.
//!
//! Ordering, most significant first:
//!
//! 1. Composite score, descending
//! 2. Rating, descending
//! 3. Average response time, ascending (unknown response time sorts last)
//! 4. Completed tasks, descending
//! 5. Assistant id, ascending

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::RankingConfig;
use crate::profile::{AssistantId, AssistantProfile};
use crate::requirements::MatchRequirements;
use crate::scoring::{self, DisqualificationReason, MatchResult, ScoreOutcome};

/// A candidate that did not make it into the ranking, and why
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rejection {
    pub assistant_id: AssistantId,
    pub reason: DisqualificationReason,
}

/// Ranked matches plus everyone who was filtered out
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RankingReport {
    pub matches: Vec<MatchResult>,
    /// Disqualified candidates, sorted by assistant id
    pub disqualified: Vec<Rejection>,
}

/// Applies the scoring engine across a candidate pool
#[derive(Debug, Clone)]
pub struct RankingService {
    default_limit: usize,
}

impl Default for RankingService {
    fn default() -> Self {
        Self::new(RankingConfig::default())
    }
}

impl RankingService {
    pub fn new(config: RankingConfig) -> Self {
        Self {
            default_limit: config.default_limit,
        }
    }

    pub fn default_limit(&self) -> usize {
        self.default_limit
    }

    /// Top matches for the requirements, at most `limit` (or the configured default)
    pub fn rank(
        &self,
        pool: &[AssistantProfile],
        requirements: &MatchRequirements,
        limit: Option<usize>,
    ) -> Vec<MatchResult> {
        self.rank_with_report(pool, requirements, limit).matches
    }

    /// Rank the pool and keep the disqualification reasons
    pub fn rank_with_report(
        &self,
        pool: &[AssistantProfile],
        requirements: &MatchRequirements,
        limit: Option<usize>,
    ) -> RankingReport {
        let limit = limit.unwrap_or(self.default_limit);

        let mut scored: Vec<(&AssistantProfile, MatchResult)> = Vec::with_capacity(pool.len());
        let mut disqualified = Vec::new();

        for profile in pool {
            match scoring::score(profile, requirements) {
                ScoreOutcome::Scored(result) => scored.push((profile, result)),
                ScoreOutcome::Disqualified(reason) => {
                    debug!("Assistant {} disqualified: {}", profile.id, reason);
                    disqualified.push(Rejection {
                        assistant_id: profile.id.clone(),
                        reason,
                    });
                }
            }
        }

        scored.sort_by(|(pa, ra), (pb, rb)| compare_candidates(pa, ra, pb, rb));
        disqualified.sort_by(|a, b| a.assistant_id.cmp(&b.assistant_id));

        debug!(
            "Ranked {} candidates: {} qualified, {} disqualified, returning top {}",
            pool.len(),
            scored.len(),
            disqualified.len(),
            limit.min(scored.len())
        );

        RankingReport {
            matches: scored.into_iter().take(limit).map(|(_, result)| result).collect(),
            disqualified,
        }
    }
}

fn compare_candidates(
    profile_a: &AssistantProfile,
    result_a: &MatchResult,
    profile_b: &AssistantProfile,
    result_b: &MatchResult,
) -> Ordering {
    result_b
        .score
        .cmp(&result_a.score)
        .then_with(|| profile_b.rating.total_cmp(&profile_a.rating))
        .then_with(|| compare_response(profile_a.avg_response_minutes, profile_b.avg_response_minutes))
        .then_with(|| profile_b.completed_tasks.cmp(&profile_a.completed_tasks))
        .then_with(|| profile_a.id.cmp(&profile_b.id))
}

/// Faster response first; unknown response time after every known one
fn compare_response(a: Option<u32>, b: Option<u32>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
