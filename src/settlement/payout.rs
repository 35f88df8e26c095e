use std::collections::BTreeMap;

use super::enrich::EnrichedHabit;

/// Stake forfeited by an owner, attributed to the habit that was missed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentLine {
    pub amount: i64,
    pub habit_title: String,
}

/// Share of a forfeited stake won by a follower's owner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedLine {
    pub amount: i64,
    pub from_display: String,
    pub from_habit: String,
    pub for_habit: String,
}

/// Per-user transaction lines accumulated over one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserTransactions {
    pub sent: Vec<SentLine>,
    pub received: Vec<ReceivedLine>,
}

impl UserTransactions {
    pub fn total_sent(&self) -> i64 {
        self.sent.iter().map(|l| l.amount).sum()
    }

    pub fn total_received(&self) -> i64 {
        self.received.iter().map(|l| l.amount).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.sent.is_empty() && self.received.is_empty()
    }
}

/// Outcome of the payout computation: balance deltas to apply plus the
/// per-user transaction log to report from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayoutPlan {
    pub per_user_delta: BTreeMap<i64, i64>,
    pub pool_delta: i64,
    pub log: BTreeMap<i64, UserTransactions>,
}

impl PayoutPlan {
    /// Conservation check: everything seized is distributed or pooled
    pub fn delta_sum(&self) -> i64 {
        self.per_user_delta.values().sum::<i64>() + self.pool_delta
    }
}

/// Computes the escrow-and-distribute plan for every enriched record.
///
/// Pure computation: owner balances are read by the caller beforehand, so
/// this stage performs no I/O and is deterministic over its inputs. An owner
/// absent from `owner_balances` is treated as having no funds. Each record
/// settles against what its owner has left after earlier records in the same
/// run, so an owner with several unfulfilled records is never seized past
/// their balance.
pub fn compute_payouts(
    enriched: &[EnrichedHabit],
    owner_balances: &BTreeMap<i64, i64>,
) -> PayoutPlan {
    let mut plan = PayoutPlan::default();
    let mut remaining = owner_balances.clone();
    for record in enriched {
        let owner_id = record.habit.owner_id;
        let balance = remaining.get(&owner_id).copied().unwrap_or(0);
        let seized = settle_record(&mut plan, record, balance);
        if seized > 0 {
            *remaining.entry(owner_id).or_insert(0) -= seized;
        }
    }
    plan
}

/// Settles one record against the owner's remaining balance and returns the
/// amount seized from the owner
fn settle_record(plan: &mut PayoutPlan, record: &EnrichedHabit, owner_balance: i64) -> i64 {
    let owner_id = record.habit.owner_id;

    // Escrow is bounded by the live balance; a broke owner forfeits nothing
    let stake_of_owner = record.habit.stake.min(owner_balance);
    if stake_of_owner <= 0 {
        return 0;
    }

    *plan.per_user_delta.entry(owner_id).or_default() -= stake_of_owner;
    plan.log.entry(owner_id).or_default().sent.push(SentLine {
        amount: stake_of_owner,
        habit_title: record.habit.title.clone(),
    });

    let sum_follower_stakes: i64 = record
        .followers
        .iter()
        .filter(|f| f.stake > 0)
        .map(|f| f.stake)
        .sum();

    if sum_follower_stakes <= 0 {
        // No qualifying followers with positive stake: pool takes it all
        plan.pool_delta += stake_of_owner;
        return stake_of_owner;
    }

    let mut distributed = 0i64;
    for follower in record.followers.iter().filter(|f| f.stake > 0) {
        // Floor division keeps the total distributed within the escrow
        let win_amount =
            (stake_of_owner as i128 * follower.stake as i128 / sum_follower_stakes as i128) as i64;
        if win_amount <= 0 {
            continue;
        }

        distributed += win_amount;
        *plan.per_user_delta.entry(follower.owner_id).or_default() += win_amount;
        plan.log
            .entry(follower.owner_id)
            .or_default()
            .received
            .push(ReceivedLine {
                amount: win_amount,
                from_display: record.owner_display.clone(),
                from_habit: record.habit.title.clone(),
                for_habit: follower.title.clone(),
            });
    }

    let remainder = stake_of_owner - distributed;
    if remainder > 0 {
        plan.pool_delta += remainder;
    }

    stake_of_owner
}
