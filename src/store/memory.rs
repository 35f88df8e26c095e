use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use uuid::Uuid;

use super::models::{CompletionEntry, CompletionRecord, HabitRecord, UserAccount};
use super::SettlementStore;
use crate::error::{AppError, AppResult, SettlementError};

/// In-memory stand-in for the Postgres store, used by unit tests
///
/// Supports targeted fault injection so per-entity error isolation can be
/// exercised without a database.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    users: HashMap<i64, UserAccount>,
    habits: HashMap<Uuid, HabitRecord>,
    completions: HashMap<(i64, NaiveDate), CompletionRecord>,
    pool: BTreeMap<String, i64>,
    claimed: HashSet<NaiveDate>,
    broken_habits: HashSet<Uuid>,
    broken_increments: HashSet<i64>,
    due_query_broken: bool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: UserAccount) {
        self.inner.lock().users.insert(user.id, user);
    }

    pub fn insert_habit(&self, habit: HabitRecord) {
        self.inner.lock().habits.insert(habit.id, habit);
    }

    pub fn mark_done(&self, user_id: i64, date: NaiveDate, habit_id: Uuid, done: bool) {
        let mut inner = self.inner.lock();
        let record = inner
            .completions
            .entry((user_id, date))
            .or_insert_with(|| CompletionRecord {
                user_id,
                date,
                entries: Vec::new(),
            });
        record.entries.push(CompletionEntry { habit_id, done });
    }

    pub fn balance_of(&self, user_id: i64) -> i64 {
        self.inner
            .lock()
            .users
            .get(&user_id)
            .map(|u| u.balance)
            .unwrap_or(0)
    }

    pub fn pool_balance(&self, key: &str) -> i64 {
        self.inner.lock().pool.get(key).copied().unwrap_or(0)
    }

    pub fn is_claimed(&self, date: NaiveDate) -> bool {
        self.inner.lock().claimed.contains(&date)
    }

    /// Make lookups of one habit record fail with a store error
    pub fn break_habit(&self, id: Uuid) {
        self.inner.lock().broken_habits.insert(id);
    }

    /// Make balance increments for one user fail with a store error
    pub fn break_increments_for(&self, user_id: i64) {
        self.inner.lock().broken_increments.insert(user_id);
    }

    /// Make the due-set query fail, simulating an unreachable store
    pub fn break_due_query(&self) {
        self.inner.lock().due_query_broken = true;
    }

    fn store_failure(what: &str) -> AppError {
        AppError::Internal(format!("simulated store failure: {what}"))
    }
}

#[async_trait]
impl SettlementStore for MemoryStore {
    async fn find_due_stake_habits(&self, weekday: i16) -> AppResult<Vec<HabitRecord>> {
        let inner = self.inner.lock();
        if inner.due_query_broken {
            return Err(Self::store_failure("due query"));
        }

        let mut due: Vec<HabitRecord> = inner
            .habits
            .values()
            .filter(|h| h.is_due_on(weekday))
            .cloned()
            .collect();
        due.sort_by_key(|h| h.id);
        Ok(due)
    }

    async fn find_habit(&self, id: Uuid) -> AppResult<Option<HabitRecord>> {
        let inner = self.inner.lock();
        if inner.broken_habits.contains(&id) {
            return Err(Self::store_failure("habit lookup"));
        }
        Ok(inner.habits.get(&id).cloned())
    }

    async fn find_completion(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<CompletionRecord>> {
        Ok(self.inner.lock().completions.get(&(user_id, date)).cloned())
    }

    async fn find_user(&self, user_id: i64) -> AppResult<Option<UserAccount>> {
        Ok(self.inner.lock().users.get(&user_id).cloned())
    }

    async fn increment_user_balance(&self, user_id: i64, delta: i64) -> AppResult<()> {
        let mut inner = self.inner.lock();
        if inner.broken_increments.contains(&user_id) {
            return Err(Self::store_failure("balance increment"));
        }
        match inner.users.get_mut(&user_id) {
            Some(user) => {
                user.balance += delta;
                Ok(())
            }
            None => Err(SettlementError::UserNotFound(user_id).into()),
        }
    }

    async fn increment_pool_balance(&self, key: &str, delta: i64) -> AppResult<()> {
        *self.inner.lock().pool.entry(key.to_string()).or_insert(0) += delta;
        Ok(())
    }

    async fn try_claim_run(&self, date: NaiveDate) -> AppResult<bool> {
        Ok(self.inner.lock().claimed.insert(date))
    }
}
