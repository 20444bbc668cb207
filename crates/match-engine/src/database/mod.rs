//! # SQLite Profile Store (sqlx)
//!
//! Persists assistant profiles in a single `assistants` table. The profile
//! body is stored as JSON, while the columns the reservation primitive needs
//! (`status`, `weekly_capacity`, `current_load`) are real columns so that a
//! reservation is one conditional `UPDATE`:
//!
//! ```sql
//! UPDATE assistants
//!    SET current_load = current_load + ?, version = version + 1, updated_at = ?
//!  WHERE assistant_id = ?
//!    AND status = 'available'
//!    AND current_load + ? <= weekly_capacity
//! ```
//!
//! SQLite serializes writers, so the row can never be observed between the
//! check and the increment. The column values always win over whatever the
//! stored JSON says about status and load.
//!
//! ## Quick Start
//!
//! ```rust
//! use staffline_match_engine::database::SqliteProfileStore;
//! use staffline_match_engine::profile::{AssistantId, AssistantProfile, Hours};
//! use staffline_match_engine::store::ProfileStore;
//!
//! # async fn example() -> staffline_match_engine::Result<()> {
//! let store = SqliteProfileStore::new_in_memory().await?;
//! store.upsert(AssistantProfile::new("va-001").with_skills(["email"])).await?;
//!
//! let outcome = store.try_reserve(&AssistantId::from("va-001"), Hours::whole(10)).await?;
//! assert!(outcome.is_reserved());
//! # Ok(())
//! # }
//! ```

use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous};
use sqlx::{Row, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{MatchEngineError, Result};
use crate::profile::{AssistantId, AssistantProfile, AssistantStatus, Hours};
use crate::store::{capacity_below_load, ensure_positive, ProfileStore, ReserveOutcome};

const PROFILE_COLUMNS: &str = "assistant_id, profile_json, status, weekly_capacity, current_load";

/// Profile store backed by SQLite through a sqlx connection pool
#[derive(Clone)]
pub struct SqliteProfileStore {
    pool: SqlitePool,
}

impl SqliteProfileStore {
    /// Connect to `database_url` and run migrations
    pub async fn new(database_url: &str) -> Result<Self> {
        info!("🗄️ Initializing SQLite profile store: {}", database_url);

        let options = SqliteConnectOptions::from_str(database_url)?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5))
            .create_if_missing(true);

        // Every connection to `sqlite::memory:` opens its own database, so an
        // in-memory store keeps exactly one connection alive for its lifetime
        let pool_options = if database_url.contains(":memory:") {
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new().max_connections(8)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| MatchEngineError::store_unavailable(format!("failed to connect to database: {}", e)))?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        info!("✅ SQLite profile store ready");
        Ok(Self { pool })
    }

    /// In-memory database for tests and one-shot runs
    pub async fn new_in_memory() -> Result<Self> {
        Self::new("sqlite::memory:").await
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Current `(status, weekly_capacity, current_load)` of one row
    async fn capacity_row(&self, id: &AssistantId) -> Result<Option<(AssistantStatus, Hours, Hours)>> {
        let row = sqlx::query("SELECT status, weekly_capacity, current_load FROM assistants WHERE assistant_id = ?")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => Ok(Some((
                row.try_get::<String, _>("status")?.parse()?,
                hours_column(&row, "weekly_capacity")?,
                hours_column(&row, "current_load")?,
            ))),
            None => Ok(None),
        }
    }
}

fn hours_column(row: &SqliteRow, column: &str) -> Result<Hours> {
    let raw: i64 = row.try_get(column)?;
    u32::try_from(raw)
        .map(Hours::from_centi)
        .map_err(|_| MatchEngineError::internal(format!("column {} holds out-of-range value {}", column, raw)))
}

fn profile_from_row(row: &SqliteRow) -> Result<AssistantProfile> {
    let raw: String = row.try_get("profile_json")?;
    let mut profile: AssistantProfile = serde_json::from_str(&raw)
        .map_err(|e| MatchEngineError::internal(format!("corrupt profile row: {}", e)))?;

    profile.id = AssistantId(row.try_get("assistant_id")?);
    profile.status = row.try_get::<String, _>("status")?.parse()?;
    profile.weekly_capacity = hours_column(row, "weekly_capacity")?;
    profile.current_load = hours_column(row, "current_load")?;
    Ok(profile)
}

#[async_trait]
impl ProfileStore for SqliteProfileStore {
    async fn get(&self, id: &AssistantId) -> Result<Option<AssistantProfile>> {
        let row = sqlx::query(&format!("SELECT {} FROM assistants WHERE assistant_id = ?", PROFILE_COLUMNS))
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(profile_from_row).transpose()
    }

    async fn list(&self) -> Result<Vec<AssistantProfile>> {
        let rows = sqlx::query(&format!("SELECT {} FROM assistants ORDER BY assistant_id", PROFILE_COLUMNS))
            .fetch_all(&self.pool)
            .await?;

        let profiles = rows.iter().map(profile_from_row).collect::<Result<Vec<_>>>()?;
        debug!("Loaded {} assistant profiles", profiles.len());
        Ok(profiles)
    }

    async fn upsert(&self, profile: AssistantProfile) -> Result<()> {
        profile.validate()?;
        let profile = profile.normalized();
        let body = serde_json::to_string(&profile)
            .map_err(|e| MatchEngineError::internal(format!("failed to encode profile: {}", e)))?;

        // The snapshot's load only seeds a new row; an existing row keeps the
        // load committed through try_reserve
        let result = sqlx::query(
            "INSERT INTO assistants (assistant_id, profile_json, status, weekly_capacity, current_load, version, updated_at)
             VALUES (?, ?, ?, ?, ?, 0, ?)
             ON CONFLICT(assistant_id) DO UPDATE SET
                profile_json = excluded.profile_json,
                status = excluded.status,
                weekly_capacity = excluded.weekly_capacity,
                version = assistants.version + 1,
                updated_at = excluded.updated_at
             WHERE assistants.current_load <= excluded.weekly_capacity",
        )
        .bind(profile.id.as_str())
        .bind(body)
        .bind(profile.status.as_str())
        .bind(i64::from(profile.weekly_capacity.centi()))
        .bind(i64::from(profile.current_load.centi()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            let committed = match self.capacity_row(&profile.id).await? {
                Some((_, _, load)) => load,
                None => return Err(MatchEngineError::internal(format!("upsert of assistant {} wrote nothing", profile.id))),
            };
            warn!("Refusing to shrink assistant {} below committed load {}", profile.id, committed);
            return Err(capacity_below_load(&profile.id, profile.weekly_capacity, committed));
        }

        info!("✅ Assistant {} upserted", profile.id);
        Ok(())
    }

    async fn set_status(&self, id: &AssistantId, status: AssistantStatus) -> Result<()> {
        let result = sqlx::query(
            "UPDATE assistants SET status = ?, version = version + 1, updated_at = ? WHERE assistant_id = ?",
        )
        .bind(status.as_str())
        .bind(Utc::now())
        .bind(id.as_str())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MatchEngineError::not_found(format!("assistant {}", id)));
        }
        debug!("Assistant {} status updated to {}", id, status);
        Ok(())
    }

    async fn try_reserve(&self, id: &AssistantId, hours: Hours) -> Result<ReserveOutcome> {
        ensure_positive(hours)?;
        let delta = i64::from(hours.centi());

        let reserved = sqlx::query(
            "UPDATE assistants
                SET current_load = current_load + ?, version = version + 1, updated_at = ?
              WHERE assistant_id = ?
                AND status = 'available'
                AND current_load + ? <= weekly_capacity
             RETURNING current_load",
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(id.as_str())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = reserved {
            let load_after = hours_column(&row, "current_load")?;
            info!("🔒 Reserved {} on assistant {} (load now {})", hours, id, load_after);
            return Ok(ReserveOutcome::Reserved { load_after });
        }

        // The conditional update matched nothing; report why
        let outcome = match self.capacity_row(id).await? {
            None => ReserveOutcome::NotFound,
            Some((status, _, _)) if status != AssistantStatus::Available => ReserveOutcome::NotAvailable { status },
            Some((_, capacity, load)) => ReserveOutcome::InsufficientCapacity {
                spare: capacity.saturating_sub(load),
            },
        };
        debug!("Reservation of {} on assistant {} refused: {:?}", hours, id, outcome);
        Ok(outcome)
    }

    async fn release(&self, id: &AssistantId, hours: Hours) -> Result<Hours> {
        ensure_positive(hours)?;
        let delta = i64::from(hours.centi());

        let released = sqlx::query(
            "UPDATE assistants
                SET current_load = current_load - ?, version = version + 1, updated_at = ?
              WHERE assistant_id = ?
                AND current_load >= ?
             RETURNING current_load",
        )
        .bind(delta)
        .bind(Utc::now())
        .bind(id.as_str())
        .bind(delta)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(row) = released {
            let load_after = hours_column(&row, "current_load")?;
            info!("🔓 Released {} on assistant {} (load now {})", hours, id, load_after);
            return Ok(load_after);
        }

        match self.capacity_row(id).await? {
            None => Err(MatchEngineError::not_found(format!("assistant {}", id))),
            Some((_, _, load)) => {
                warn!("Refusing to release {} from assistant {} with load {}", hours, id, load);
                Err(MatchEngineError::invariant(format!(
                    "release of {} exceeds committed load {} on assistant {}",
                    hours, load, id
                )))
            }
        }
    }
}
