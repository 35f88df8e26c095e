use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use super::due;
use crate::error::{AppResult, SettlementError};
use crate::store::models::HabitRecord;
use crate::store::SettlementStore;

/// Follower qualifying for a share of a forfeited stake. Derived during
/// enrichment, never persisted.
#[derive(Debug, Clone)]
pub struct ReciprocalFollower {
    pub habit_id: Uuid,
    pub owner_id: i64,
    pub stake: i64,
    pub title: String,
}

/// Unfulfilled habit with its qualifying followers resolved
#[derive(Debug, Clone)]
pub struct EnrichedHabit {
    pub habit: HabitRecord,
    /// Owner's display name, shown to followers in "received" report lines
    pub owner_display: String,
    pub followers: Vec<ReciprocalFollower>,
}

/// Resolves each unfulfilled record's follower list into concrete qualifying
/// followers: mutual follow plus own-habit completion on the reference date.
///
/// Failures are isolated per entity: a broken follower drops only that
/// follower, a broken record drops only that record.
pub async fn enrich(
    store: &dyn SettlementStore,
    reference_date: NaiveDate,
    unfulfilled: Vec<HabitRecord>,
) -> Vec<EnrichedHabit> {
    let mut enriched = Vec::with_capacity(unfulfilled.len());
    for habit in unfulfilled {
        let habit_id = habit.id;
        match enrich_one(store, reference_date, habit).await {
            Ok(record) => enriched.push(record),
            Err(err) => warn!(%habit_id, "skipping record during enrichment: {err}"),
        }
    }
    enriched
}

async fn enrich_one(
    store: &dyn SettlementStore,
    reference_date: NaiveDate,
    habit: HabitRecord,
) -> AppResult<EnrichedHabit> {
    let owner_display = match store.find_user(habit.owner_id).await? {
        Some(user) => user.display_name(),
        None => habit.owner_id.to_string(),
    };

    let mut followers = Vec::new();
    for follower_id in &habit.followers {
        match resolve_follower(store, reference_date, &habit, *follower_id).await {
            Ok(Some(follower)) => followers.push(follower),
            Ok(None) => {}
            Err(err) => {
                warn!(habit = %habit.id, follower = %follower_id, "skipping follower: {err}");
            }
        }
    }

    Ok(EnrichedHabit {
        habit,
        owner_display,
        followers,
    })
}

async fn resolve_follower(
    store: &dyn SettlementStore,
    reference_date: NaiveDate,
    habit: &HabitRecord,
    follower_id: Uuid,
) -> AppResult<Option<ReciprocalFollower>> {
    let follower = store
        .find_habit(follower_id)
        .await?
        .ok_or(SettlementError::HabitNotFound(follower_id))?;

    // One-directional follows never qualify
    if !follower.follows(habit.id) {
        return Ok(None);
    }

    if !due::is_completed(store, reference_date, follower.owner_id, follower.id).await? {
        return Ok(None);
    }

    Ok(Some(ReciprocalFollower {
        habit_id: follower.id,
        owner_id: follower.owner_id,
        stake: follower.stake,
        title: follower.title,
    }))
}
