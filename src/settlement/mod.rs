// Nightly stake settlement: Resolve -> Enrich -> Compute -> Apply
pub mod apply;
pub mod due;
pub mod enrich;
pub mod payout;
pub mod report;
pub mod scheduler;

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::delivery::Deliverer;
use crate::error::AppResult;
use crate::store::SettlementStore;
use self::apply::AppliedResult;
use self::enrich::EnrichedHabit;

/// Outcome of one settlement run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub already_settled: bool,
    pub unfulfilled_records: usize,
    pub pool_delta: i64,
    pub applied: AppliedResult,
}

/// The settlement engine: a strict linear batch pipeline over one reference
/// date. Runs unattended; a run either completes (with per-entity errors
/// swallowed at their boundaries) or aborts on a store-connectivity failure
/// before any state was mutated.
pub struct SettlementEngine {
    store: Arc<dyn SettlementStore>,
    deliverer: Arc<dyn Deliverer>,
}

impl SettlementEngine {
    pub fn new(store: Arc<dyn SettlementStore>, deliverer: Arc<dyn Deliverer>) -> Self {
        Self { store, deliverer }
    }

    pub async fn run(&self, reference_date: NaiveDate) -> AppResult<RunSummary> {
        let unfulfilled = due::resolve_unfulfilled(self.store.as_ref(), reference_date).await?;
        info!(
            %reference_date,
            count = unfulfilled.len(),
            "resolved unfulfilled staked habits"
        );

        let enriched = enrich::enrich(self.store.as_ref(), reference_date, unfulfilled).await;
        let owner_balances = self.owner_balances(&enriched).await;
        let plan = payout::compute_payouts(&enriched, &owner_balances);

        debug_assert_eq!(plan.delta_sum(), 0);

        // One-shot ledger close: claim the date right before mutating, so an
        // aborted run above leaves the date open for the next tick.
        if !self.store.try_claim_run(reference_date).await? {
            info!(%reference_date, "reference date already settled, skipping");
            return Ok(RunSummary {
                already_settled: true,
                ..RunSummary::default()
            });
        }

        let applied = apply::apply(
            self.store.as_ref(),
            self.deliverer.as_ref(),
            &plan,
            reference_date,
        )
        .await;

        info!(
            %reference_date,
            records = enriched.len(),
            pool_delta = plan.pool_delta,
            increments = applied.increments_applied,
            reports = applied.reports_delivered,
            "settlement run completed"
        );

        Ok(RunSummary {
            already_settled: false,
            unfulfilled_records: enriched.len(),
            pool_delta: plan.pool_delta,
            applied,
        })
    }

    /// Owner balances read once per owner, at computation time; the
    /// calculator tracks what each owner has left across their records. A
    /// failed or empty lookup settles that owner's records against a zero
    /// balance, which skips them without aborting the batch.
    async fn owner_balances(&self, enriched: &[EnrichedHabit]) -> BTreeMap<i64, i64> {
        let mut balances = BTreeMap::new();
        for record in enriched {
            let owner_id = record.habit.owner_id;
            if balances.contains_key(&owner_id) {
                continue;
            }
            let balance = match self.store.find_user(owner_id).await {
                Ok(Some(user)) => user.balance,
                Ok(None) => {
                    warn!(owner_id, "owner account missing, treating balance as zero");
                    0
                }
                Err(err) => {
                    warn!(owner_id, "balance read failed, skipping owner's records: {err}");
                    0
                }
            };
            balances.insert(owner_id, balance);
        }
        balances
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::memory::RecordingDeliverer;
    use crate::store::memory::MemoryStore;
    use crate::store::models::{HabitRecord, UserAccount, POOL_KEY};
    use uuid::Uuid;

    // Monday
    const DATE: &str = "2024-01-01";

    fn date() -> NaiveDate {
        DATE.parse().unwrap()
    }

    fn user(id: i64, balance: i64) -> UserAccount {
        UserAccount {
            id,
            username: format!("user{id}"),
            balance,
            language: None,
        }
    }

    fn habit(id: Uuid, owner_id: i64, stake: i64, followers: Vec<Uuid>) -> HabitRecord {
        HabitRecord {
            id,
            owner_id,
            title: format!("habit-of-{owner_id}"),
            stake,
            days: vec![0],
            followers,
        }
    }

    fn engine(store: Arc<MemoryStore>, deliverer: Arc<RecordingDeliverer>) -> SettlementEngine {
        SettlementEngine::new(store, deliverer)
    }

    #[tokio::test]
    async fn test_end_to_end_run_moves_stake_to_followers() {
        let store = Arc::new(MemoryStore::new());
        let deliverer = Arc::new(RecordingDeliverer::new());

        let owner_habit = Uuid::new_v4();
        let follower_b = Uuid::new_v4();
        let follower_c = Uuid::new_v4();

        store.insert_user(user(1, 1000));
        store.insert_user(user(2, 0));
        store.insert_user(user(3, 0));
        store.insert_habit(habit(owner_habit, 1, 100, vec![follower_b, follower_c]));
        store.insert_habit(habit(follower_b, 2, 50, vec![owner_habit]));
        store.insert_habit(habit(follower_c, 3, 50, vec![owner_habit]));

        // Followers completed their own habits; the owner did not
        store.mark_done(2, date(), follower_b, true);
        store.mark_done(3, date(), follower_c, true);

        let summary = engine(store.clone(), deliverer.clone())
            .run(date())
            .await
            .unwrap();

        assert!(!summary.already_settled);
        assert_eq!(summary.unfulfilled_records, 1);
        assert_eq!(summary.pool_delta, 0);
        assert_eq!(store.balance_of(1), 900);
        assert_eq!(store.balance_of(2), 50);
        assert_eq!(store.balance_of(3), 50);
        assert_eq!(store.pool_balance(POOL_KEY), 0);
        assert_eq!(deliverer.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_no_qualifying_followers_routes_stake_to_pool() {
        let store = Arc::new(MemoryStore::new());
        let deliverer = Arc::new(RecordingDeliverer::new());

        let owner_habit = Uuid::new_v4();
        let one_way = Uuid::new_v4();

        store.insert_user(user(1, 1000));
        store.insert_user(user(2, 0));
        store.insert_habit(habit(owner_habit, 1, 100, vec![one_way]));
        // Completed but not reciprocal
        store.insert_habit(habit(one_way, 2, 50, vec![]));
        store.mark_done(2, date(), one_way, true);

        let summary = engine(store.clone(), deliverer.clone())
            .run(date())
            .await
            .unwrap();

        assert_eq!(summary.pool_delta, 100);
        assert_eq!(store.balance_of(1), 900);
        assert_eq!(store.balance_of(2), 0);
        assert_eq!(store.pool_balance(POOL_KEY), 100);
        // Only the owner has transaction lines
        assert_eq!(deliverer.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_completed_owner_is_not_settled() {
        let store = Arc::new(MemoryStore::new());
        let deliverer = Arc::new(RecordingDeliverer::new());

        let owner_habit = Uuid::new_v4();
        store.insert_user(user(1, 1000));
        store.insert_habit(habit(owner_habit, 1, 100, vec![]));
        store.mark_done(1, date(), owner_habit, true);

        let summary = engine(store.clone(), deliverer.clone())
            .run(date())
            .await
            .unwrap();

        assert_eq!(summary.unfulfilled_records, 0);
        assert_eq!(store.balance_of(1), 1000);
        assert!(deliverer.sent().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_for_same_date_is_a_noop() {
        let store = Arc::new(MemoryStore::new());
        let deliverer = Arc::new(RecordingDeliverer::new());

        let owner_habit = Uuid::new_v4();
        store.insert_user(user(1, 1000));
        store.insert_habit(habit(owner_habit, 1, 100, vec![]));

        let engine = engine(store.clone(), deliverer.clone());
        let first = engine.run(date()).await.unwrap();
        let second = engine.run(date()).await.unwrap();

        assert!(!first.already_settled);
        assert!(second.already_settled);
        // Settled once, not twice
        assert_eq!(store.balance_of(1), 900);
        assert_eq!(store.pool_balance(POOL_KEY), 100);
        assert!(store.is_claimed(date()));
    }

    #[tokio::test]
    async fn test_store_outage_aborts_without_claiming_the_date() {
        let store = Arc::new(MemoryStore::new());
        let deliverer = Arc::new(RecordingDeliverer::new());
        store.break_due_query();

        let result = engine(store.clone(), deliverer).run(date()).await;

        assert!(result.is_err());
        // Nothing mutated, date still open for the next tick
        assert!(!store.is_claimed(date()));
    }

    #[tokio::test]
    async fn test_owner_with_two_unfulfilled_records_ends_at_zero_not_negative() {
        let store = Arc::new(MemoryStore::new());
        let deliverer = Arc::new(RecordingDeliverer::new());

        let habit_a = Uuid::new_v4();
        let habit_b = Uuid::new_v4();
        let follower = Uuid::new_v4();

        store.insert_user(user(1, 100));
        store.insert_user(user(2, 0));
        store.insert_habit(habit(habit_a, 1, 100, vec![follower]));
        store.insert_habit(habit(habit_b, 1, 100, vec![follower]));
        store.insert_habit(habit(follower, 2, 50, vec![habit_a, habit_b]));
        store.mark_done(2, date(), follower, true);

        let summary = engine(store.clone(), deliverer.clone())
            .run(date())
            .await
            .unwrap();

        // Both records are unfulfilled but only 100 is there to seize
        assert_eq!(summary.unfulfilled_records, 2);
        assert_eq!(store.balance_of(1), 0);
        assert_eq!(store.balance_of(2), 100);
        assert_eq!(store.pool_balance(POOL_KEY), 0);
    }

    #[tokio::test]
    async fn test_broke_owner_record_skipped_entirely() {
        let store = Arc::new(MemoryStore::new());
        let deliverer = Arc::new(RecordingDeliverer::new());

        let owner_habit = Uuid::new_v4();
        let follower = Uuid::new_v4();
        store.insert_user(user(1, 0));
        store.insert_user(user(2, 10));
        store.insert_habit(habit(owner_habit, 1, 100, vec![follower]));
        store.insert_habit(habit(follower, 2, 50, vec![owner_habit]));
        store.mark_done(2, date(), follower, true);

        let summary = engine(store.clone(), deliverer.clone())
            .run(date())
            .await
            .unwrap();

        assert_eq!(summary.pool_delta, 0);
        assert_eq!(store.balance_of(1), 0);
        assert_eq!(store.balance_of(2), 10);
        assert!(deliverer.sent().is_empty());
    }
}
