use chrono::{Datelike, NaiveDate};
use uuid::Uuid;

use crate::error::AppResult;
use crate::store::models::HabitRecord;
use crate::store::SettlementStore;

/// Weekday index of a date, 0 = Monday .. 6 = Sunday, matching the
/// scheduling convention stored on habit records
pub fn weekday_index(date: NaiveDate) -> i16 {
    (date.weekday().number_from_monday() - 1) as i16
}

/// Whether the habit was marked done by its owner on the given date.
/// A missing completion record or entry means "not completed".
pub async fn is_completed(
    store: &dyn SettlementStore,
    date: NaiveDate,
    user_id: i64,
    habit_id: Uuid,
) -> AppResult<bool> {
    let completion = store.find_completion(user_id, date).await?;
    Ok(completion.map(|r| r.is_done(habit_id)).unwrap_or(false))
}

/// All stake-bearing habits scheduled for the reference date that were not
/// completed by their owners.
///
/// Store failures here abort the whole run; nothing has been mutated yet, so
/// the next scheduled tick retries naturally.
pub async fn resolve_unfulfilled(
    store: &dyn SettlementStore,
    reference_date: NaiveDate,
) -> AppResult<Vec<HabitRecord>> {
    let weekday = weekday_index(reference_date);
    let due = store.find_due_stake_habits(weekday).await?;

    let mut unfulfilled = Vec::with_capacity(due.len());
    for habit in due {
        if !is_completed(store, reference_date, habit.owner_id, habit.id).await? {
            unfulfilled.push(habit);
        }
    }

    Ok(unfulfilled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::models::UserAccount;

    fn habit(id: Uuid, owner_id: i64, stake: i64, days: Vec<i16>) -> HabitRecord {
        HabitRecord {
            id,
            owner_id,
            title: format!("habit-{owner_id}"),
            stake,
            days,
            followers: vec![],
        }
    }

    fn user(id: i64) -> UserAccount {
        UserAccount {
            id,
            username: format!("user{id}"),
            balance: 1000,
            language: None,
        }
    }

    #[test]
    fn test_weekday_index_is_zero_based_from_monday() {
        // 2024-01-01 was a Monday
        assert_eq!(
            weekday_index(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()),
            0
        );
        assert_eq!(
            weekday_index(NaiveDate::from_ymd_opt(2024, 1, 7).unwrap()),
            6
        );
    }

    #[tokio::test]
    async fn test_missing_completion_record_means_not_completed() {
        let store = MemoryStore::new();
        let habit_id = Uuid::new_v4();
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        assert!(!is_completed(&store, date, 1, habit_id).await.unwrap());

        store.mark_done(1, date, habit_id, false);
        assert!(!is_completed(&store, date, 1, habit_id).await.unwrap());

        store.mark_done(1, date, habit_id, true);
        assert!(is_completed(&store, date, 1, habit_id).await.unwrap());
    }

    #[tokio::test]
    async fn test_resolve_filters_by_weekday_stake_and_completion() {
        let store = MemoryStore::new();
        // Monday
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();

        let due_id = Uuid::new_v4();
        let done_id = Uuid::new_v4();
        store.insert_user(user(1));
        store.insert_user(user(2));
        store.insert_habit(habit(due_id, 1, 100, vec![0]));
        store.insert_habit(habit(done_id, 2, 100, vec![0]));
        // Wrong weekday and zero stake never enter the due set
        store.insert_habit(habit(Uuid::new_v4(), 1, 100, vec![3]));
        store.insert_habit(habit(Uuid::new_v4(), 2, 0, vec![0]));

        store.mark_done(2, date, done_id, true);

        let unfulfilled = resolve_unfulfilled(&store, date).await.unwrap();
        assert_eq!(unfulfilled.len(), 1);
        assert_eq!(unfulfilled[0].id, due_id);
    }

    #[tokio::test]
    async fn test_unreachable_store_aborts_resolution() {
        let store = MemoryStore::new();
        store.break_due_query();

        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(resolve_unfulfilled(&store, date).await.is_err());
    }
}
