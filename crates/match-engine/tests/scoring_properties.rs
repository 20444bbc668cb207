//! Scoring and Ranking Properties
//!
//! Randomized checks over generated profiles and requirements:
//! - An assistant is scored only if it covers every required skill
//! - Scores and category values stay inside their ranges
//! - Gaining a preferred skill, as a skill or as a tool at any proficiency,
//!   never lowers a score
//! - Ranking output does not depend on pool order

use proptest::prelude::*;
use std::collections::BTreeSet;

use staffline_match_engine::prelude::*;
use staffline_match_engine::scoring::{self, MAX_BONUS};

const SKILLS: &[&str] = &["email", "calendar", "crm", "excel", "social_media", "bookkeeping", "research", "travel"];
const ZONES: &[&str] = &["UTC", "America/New_York", "Europe/London", "Asia/Manila", "Asia/Kolkata"];
const INDUSTRIES: &[&str] = &["healthcare", "real_estate", "legal", "finance", "ecommerce"];

fn skill() -> impl Strategy<Value = &'static str> {
    prop::sample::select(SKILLS.to_vec())
}

prop_compose! {
    fn arb_profile()(
        skills in prop::collection::btree_set(skill(), 0..6),
        tools in prop::collection::btree_map(skill(), 0u8..=10, 0..3),
        industries in prop::collection::btree_set(prop::sample::select(INDUSTRIES.to_vec()), 0..3),
        timezone in prop::option::of(prop::sample::select(ZONES.to_vec())),
        rate in 10.0f64..80.0,
        load in 0u32..=40,
        rating in 0.0f64..5.0,
        completed in 0u32..200,
        response in prop::option::of(1u32..240),
        speaks_spanish in any::<bool>(),
    ) -> AssistantProfile {
        let mut profile = AssistantProfile::new("va")
            .with_skills(skills)
            .with_industries(industries)
            .with_rate(rate)
            .with_capacity(Hours::whole(40), Hours::whole(load))
            .with_rating(rating)
            .with_completed_tasks(completed)
            .with_language("english", FluencyLevel::Native)
            .vetted();
        for (tool, level) in tools {
            profile = profile.with_tool(tool, level);
        }
        if let Some(tz) = timezone {
            profile = profile.with_timezone(tz);
        }
        if let Some(minutes) = response {
            profile = profile.with_response_minutes(minutes);
        }
        if speaks_spanish {
            profile = profile.with_language("spanish", FluencyLevel::Conversational);
        }
        profile
    }
}

prop_compose! {
    fn arb_requirements()(
        required in prop::collection::btree_set(skill(), 1..3),
        preferred in prop::collection::btree_set(skill(), 0..3),
        industry in prop::option::of(prop::sample::select(INDUSTRIES.to_vec())),
        budget in prop::option::of(15.0f64..90.0),
        timezone in prop::option::of(prop::sample::select(ZONES.to_vec())),
        wants_spanish in any::<bool>(),
        hours in 1u32..20,
    ) -> MatchRequirements {
        let mut builder = MatchRequirements::builder()
            .required_skills(required)
            .preferred_skills(preferred)
            .hours_per_week(f64::from(hours));
        if let Some(industry) = industry {
            builder = builder.industry(industry);
        }
        if let Some(budget) = budget {
            builder = builder.budget(budget);
        }
        if let Some(tz) = timezone {
            builder = builder.timezone(tz);
        }
        if wants_spanish {
            builder = builder.languages(["spanish"]);
        }
        builder.build().unwrap()
    }
}

fn arb_pool() -> impl Strategy<Value = Vec<AssistantProfile>> {
    prop::collection::vec(arb_profile(), 1..12).prop_map(|mut pool| {
        for (i, profile) in pool.iter_mut().enumerate() {
            profile.id = AssistantId::from(format!("va-{:02}", i));
        }
        pool
    })
}

fn covered(profile: &AssistantProfile) -> BTreeSet<String> {
    profile
        .skills
        .iter()
        .chain(profile.tool_proficiency.keys())
        .cloned()
        .collect()
}

proptest! {
    #[test]
    fn test_scored_only_when_required_skills_covered(
        profile in arb_profile(),
        requirements in arb_requirements(),
    ) {
        let has_all = requirements
            .required_skills()
            .iter()
            .all(|s| covered(&profile).contains(s));

        match scoring::score(&profile, &requirements) {
            ScoreOutcome::Scored(_) => prop_assert!(has_all),
            ScoreOutcome::Disqualified(DisqualificationReason::MissingSkills(missing)) => {
                prop_assert!(!has_all);
                for skill in missing {
                    prop_assert!(!covered(&profile).contains(&skill));
                }
            }
            ScoreOutcome::Disqualified(_) => {}
        }
    }

    #[test]
    fn test_scores_stay_in_range(
        profile in arb_profile(),
        requirements in arb_requirements(),
    ) {
        if let ScoreOutcome::Scored(result) = scoring::score(&profile, &requirements) {
            prop_assert!(result.score <= 100);
            let b = &result.breakdown;
            for category in [b.skills, b.industry, b.timezone, b.language, b.budget] {
                prop_assert!((0.0..=100.0).contains(&category), "category {} out of range", category);
            }
            prop_assert!((0.0..=MAX_BONUS).contains(&b.bonus));
        }
    }

    #[test]
    fn test_preferred_skill_never_lowers_score(
        profile in arb_profile(),
        requirements in arb_requirements(),
        tool_level in prop::option::of(0u8..=10),
    ) {
        // Cover the required skills so the profile is scored at all
        let base = profile.with_skills(requirements.required_skills().to_vec());
        let Some(extra) = requirements
            .preferred_skills()
            .iter()
            .find(|s| !covered(&base).contains(*s))
            .cloned()
        else {
            return Ok(());
        };

        let before = scoring::score(&base, &requirements);
        // The new match arrives either as a plain skill or as a tool at any level
        let gained = match tool_level {
            Some(level) => base.clone().with_tool(extra, level),
            None => base.clone().with_skills([extra]),
        };
        let after = scoring::score(&gained, &requirements);
        match (before, after) {
            (ScoreOutcome::Scored(before), ScoreOutcome::Scored(after)) => {
                prop_assert!(after.score >= before.score, "{} dropped to {}", before.score, after.score);
                prop_assert!(after.breakdown.skills >= before.breakdown.skills);
            }
            (ScoreOutcome::Disqualified(a), ScoreOutcome::Disqualified(b)) => prop_assert_eq!(a, b),
            (before, after) => prop_assert!(false, "outcome changed: {:?} -> {:?}", before, after),
        }
    }

    #[test]
    fn test_ranking_ignores_pool_order(
        (pool, shuffled) in arb_pool().prop_flat_map(|pool| (Just(pool.clone()), Just(pool).prop_shuffle())),
        requirements in arb_requirements(),
        limit in 1usize..8,
    ) {
        let ranking = RankingService::default();
        let first = ranking.rank_with_report(&pool, &requirements, Some(limit));
        let second = ranking.rank_with_report(&shuffled, &requirements, Some(limit));
        prop_assert_eq!(&first, &second);
        prop_assert!(first.matches.len() <= limit);

        for pair in first.matches.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }
}
