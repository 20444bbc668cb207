//! Profile store abstraction
//!
//! The store owns durable assistant profiles and is the source of truth for
//! each assistant's committed load. Capacity only ever moves through
//! [`ProfileStore::try_reserve`] and [`ProfileStore::release`]; there is no
//! read-then-write path for `current_load` anywhere in the engine.
//!
//! Two implementations ship with the crate:
//!
//! - [`InMemoryProfileStore`]: a `DashMap` keyed by assistant id. The
//!   check-and-increment runs under the entry's shard guard, so contention is
//!   per assistant and the guard is never held across an `.await`.
//! - [`crate::database::SqliteProfileStore`]: a single conditional `UPDATE`.

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{MatchEngineError, Result};
use crate::profile::{AssistantId, AssistantProfile, AssistantStatus, Hours};

/// Outcome of an atomic check-and-reserve
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReserveOutcome {
    /// Load was incremented; `load_after` is the committed load afterwards
    Reserved { load_after: Hours },
    /// Not enough spare hours left
    InsufficientCapacity { spare: Hours },
    /// Assistant is not accepting work
    NotAvailable { status: AssistantStatus },
    NotFound,
}

impl ReserveOutcome {
    pub fn is_reserved(&self) -> bool {
        matches!(self, Self::Reserved { .. })
    }
}

/// Storage for assistant profiles with an atomic capacity primitive
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Fetch one profile snapshot
    async fn get(&self, id: &AssistantId) -> Result<Option<AssistantProfile>>;

    /// All profiles, ordered by assistant id
    async fn list(&self) -> Result<Vec<AssistantProfile>>;

    /// Insert or replace a profile after validating it
    ///
    /// A new profile may carry an initial `current_load`. Replacing an
    /// existing profile keeps the stored load, and is refused with a
    /// validation error if the new weekly capacity is below that load.
    async fn upsert(&self, profile: AssistantProfile) -> Result<()>;

    /// Change an assistant's availability status
    async fn set_status(&self, id: &AssistantId, status: AssistantStatus) -> Result<()>;

    /// Add `hours` to the assistant's load if, and only if, the assistant is
    /// available and the new load stays within weekly capacity
    ///
    /// The check and the increment are one indivisible operation.
    async fn try_reserve(&self, id: &AssistantId, hours: Hours) -> Result<ReserveOutcome>;

    /// Subtract previously reserved `hours`, returning the load afterwards
    ///
    /// Releasing more than is currently committed is an
    /// [`MatchEngineError::InvariantViolation`]; the load is never clamped.
    async fn release(&self, id: &AssistantId, hours: Hours) -> Result<Hours>;
}

pub(crate) fn capacity_below_load(id: &AssistantId, capacity: Hours, committed: Hours) -> MatchEngineError {
    MatchEngineError::validation(format!(
        "weekly capacity {} for assistant {} is below its committed load {}",
        capacity, id, committed
    ))
}

pub(crate) fn ensure_positive(hours: Hours) -> Result<()> {
    if hours.is_zero() {
        return Err(MatchEngineError::validation("reservation hours must be greater than zero"));
    }
    Ok(())
}

/// Profile store held entirely in process memory
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: DashMap<AssistantId, AssistantProfile>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from profile snapshots, validating each one
    pub fn with_profiles(profiles: impl IntoIterator<Item = AssistantProfile>) -> Result<Self> {
        let store = Self::new();
        for profile in profiles {
            store.insert(profile)?;
        }
        Ok(store)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    fn insert(&self, profile: AssistantProfile) -> Result<()> {
        profile.validate()?;
        let mut profile = profile.normalized();

        match self.profiles.entry(profile.id.clone()) {
            Entry::Occupied(mut entry) => {
                let committed = entry.get().current_load;
                if profile.weekly_capacity < committed {
                    return Err(capacity_below_load(&profile.id, profile.weekly_capacity, committed));
                }
                profile.current_load = committed;
                entry.insert(profile);
            }
            Entry::Vacant(entry) => {
                entry.insert(profile);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get(&self, id: &AssistantId) -> Result<Option<AssistantProfile>> {
        Ok(self.profiles.get(id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<AssistantProfile>> {
        let mut profiles: Vec<AssistantProfile> =
            self.profiles.iter().map(|entry| entry.value().clone()).collect();
        profiles.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(profiles)
    }

    async fn upsert(&self, profile: AssistantProfile) -> Result<()> {
        let id = profile.id.clone();
        self.insert(profile)?;
        debug!("Assistant {} upserted", id);
        Ok(())
    }

    async fn set_status(&self, id: &AssistantId, status: AssistantStatus) -> Result<()> {
        let mut entry = self
            .profiles
            .get_mut(id)
            .ok_or_else(|| MatchEngineError::not_found(format!("assistant {}", id)))?;
        entry.status = status;
        debug!("Assistant {} status updated to {}", id, status);
        Ok(())
    }

    async fn try_reserve(&self, id: &AssistantId, hours: Hours) -> Result<ReserveOutcome> {
        ensure_positive(hours)?;

        let Some(mut entry) = self.profiles.get_mut(id) else {
            return Ok(ReserveOutcome::NotFound);
        };
        let profile = entry.value_mut();

        if profile.status != AssistantStatus::Available {
            return Ok(ReserveOutcome::NotAvailable { status: profile.status });
        }

        match profile.current_load.checked_add(hours) {
            Some(load_after) if load_after <= profile.weekly_capacity => {
                profile.current_load = load_after;
                info!("🔒 Reserved {} on assistant {} (load now {}/{})", hours, id, load_after, profile.weekly_capacity);
                Ok(ReserveOutcome::Reserved { load_after })
            }
            _ => Ok(ReserveOutcome::InsufficientCapacity {
                spare: profile.spare_hours(),
            }),
        }
    }

    async fn release(&self, id: &AssistantId, hours: Hours) -> Result<Hours> {
        ensure_positive(hours)?;

        let mut entry = self
            .profiles
            .get_mut(id)
            .ok_or_else(|| MatchEngineError::not_found(format!("assistant {}", id)))?;
        let profile = entry.value_mut();

        let load_after = profile.current_load.checked_sub(hours).ok_or_else(|| {
            warn!("Refusing to release {} from assistant {} with load {}", hours, id, profile.current_load);
            MatchEngineError::invariant(format!(
                "release of {} exceeds committed load {} on assistant {}",
                hours, profile.current_load, id
            ))
        })?;
        profile.current_load = load_after;
        info!("🔓 Released {} on assistant {} (load now {})", hours, id, load_after);
        Ok(load_after)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> InMemoryProfileStore {
        InMemoryProfileStore::with_profiles([AssistantProfile::new("va-1")
            .with_skills(["Email"])
            .with_capacity(Hours::whole(40), Hours::whole(30))])
        .unwrap()
    }

    #[tokio::test]
    async fn test_reserve_within_capacity() {
        let store = store();
        let id = AssistantId::from("va-1");
        let outcome = store.try_reserve(&id, Hours::whole(10)).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::Reserved { load_after: Hours::whole(40) });

        let outcome = store.try_reserve(&id, Hours::from_centi(1)).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::InsufficientCapacity { spare: Hours::ZERO });
    }

    #[tokio::test]
    async fn test_reserve_requires_available_status() {
        let store = store();
        let id = AssistantId::from("va-1");
        store.set_status(&id, AssistantStatus::Busy).await.unwrap();
        let outcome = store.try_reserve(&id, Hours::whole(1)).await.unwrap();
        assert_eq!(outcome, ReserveOutcome::NotAvailable { status: AssistantStatus::Busy });
        assert_eq!(store.get(&id).await.unwrap().unwrap().current_load, Hours::whole(30));
    }

    #[tokio::test]
    async fn test_unknown_assistant() {
        let store = store();
        let id = AssistantId::from("ghost");
        assert_eq!(store.try_reserve(&id, Hours::whole(1)).await.unwrap(), ReserveOutcome::NotFound);
        assert!(matches!(
            store.release(&id, Hours::whole(1)).await,
            Err(MatchEngineError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_release_never_goes_negative() {
        let store = store();
        let id = AssistantId::from("va-1");
        assert_eq!(store.release(&id, Hours::whole(30)).await.unwrap(), Hours::ZERO);
        assert!(matches!(
            store.release(&id, Hours::whole(1)).await,
            Err(MatchEngineError::InvariantViolation(_))
        ));
    }

    #[tokio::test]
    async fn test_zero_hours_rejected() {
        let store = store();
        let id = AssistantId::from("va-1");
        assert!(matches!(
            store.try_reserve(&id, Hours::ZERO).await,
            Err(MatchEngineError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_upsert_keeps_committed_load() {
        let store = store();
        let id = AssistantId::from("va-1");
        store.try_reserve(&id, Hours::whole(5)).await.unwrap();

        // A profile edit carrying a stale zero load must not free capacity
        store
            .upsert(
                AssistantProfile::new("va-1")
                    .with_skills(["Email", "CRM"])
                    .with_capacity(Hours::whole(40), Hours::ZERO),
            )
            .await
            .unwrap();
        let profile = store.get(&id).await.unwrap().unwrap();
        assert_eq!(profile.current_load, Hours::whole(35));
        assert!(profile.skills.contains("crm"));
        assert_eq!(
            store.try_reserve(&id, Hours::whole(10)).await.unwrap(),
            ReserveOutcome::InsufficientCapacity { spare: Hours::whole(5) }
        );

        let shrunk = AssistantProfile::new("va-1").with_capacity(Hours::whole(20), Hours::ZERO);
        assert!(matches!(store.upsert(shrunk).await, Err(MatchEngineError::Validation(_))));
        assert_eq!(store.get(&id).await.unwrap().unwrap().weekly_capacity, Hours::whole(40));
    }

    #[tokio::test]
    async fn test_upsert_validates_and_normalizes() {
        let store = InMemoryProfileStore::new();
        let bad = AssistantProfile::new("bad").with_capacity(Hours::whole(5), Hours::whole(6));
        assert!(store.upsert(bad).await.is_err());

        store.upsert(AssistantProfile::new("b").with_skills([" Email "])).await.unwrap();
        store.upsert(AssistantProfile::new("a")).await.unwrap();
        let listed = store.list().await.unwrap();
        assert_eq!(listed[0].id, AssistantId::from("a"));
        assert!(listed[1].skills.contains("email"));
    }
}
