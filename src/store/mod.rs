pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::AppResult;
use self::models::{CompletionRecord, HabitRecord, UserAccount};

/// Store capabilities the settlement engine needs, injected once at process
/// start so an in-memory fake can stand in for Postgres in tests.
///
/// Balance mutations are expressed as increments (never absolute writes) so
/// unrelated features mutating the same accounts stay safe.
#[async_trait]
pub trait SettlementStore: Send + Sync {
    /// All stake-bearing habit records scheduled for the given weekday
    /// (0 = Monday .. 6 = Sunday)
    async fn find_due_stake_habits(&self, weekday: i16) -> AppResult<Vec<HabitRecord>>;

    async fn find_habit(&self, id: Uuid) -> AppResult<Option<HabitRecord>>;

    async fn find_completion(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<CompletionRecord>>;

    async fn find_user(&self, user_id: i64) -> AppResult<Option<UserAccount>>;

    /// Atomic `balance += delta` on a user account
    async fn increment_user_balance(&self, user_id: i64, delta: i64) -> AppResult<()>;

    /// Atomic `balance += delta` on the singleton pool, upserting on absence
    async fn increment_pool_balance(&self, key: &str, delta: i64) -> AppResult<()>;

    /// Claim the reference date for settlement. Returns false if another run
    /// already settled it, which makes duplicate execution a clean no-op.
    async fn try_claim_run(&self, date: NaiveDate) -> AppResult<bool>;
}
