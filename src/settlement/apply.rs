use chrono::NaiveDate;
use tracing::{info, warn};

use super::payout::PayoutPlan;
use super::report::{self, Locale};
use crate::delivery::Deliverer;
use crate::store::models::{DEFAULT_LANGUAGE, POOL_KEY};
use crate::store::SettlementStore;

/// Counters from the apply stage, for the run summary log line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedResult {
    pub increments_applied: usize,
    pub increments_failed: usize,
    pub reports_delivered: usize,
    pub deliveries_failed: usize,
}

/// Applies all balance deltas as atomic increments, then delivers one report
/// per affected user in that user's language.
///
/// Balances are applied before any delivery is attempted, so the financial
/// effect of the run never depends on notification success. Every failure in
/// this stage is user-level: logged and skipped, never fatal.
pub async fn apply(
    store: &dyn SettlementStore,
    deliverer: &dyn Deliverer,
    plan: &PayoutPlan,
    reference_date: NaiveDate,
) -> AppliedResult {
    let mut result = AppliedResult::default();

    for (&user_id, &delta) in &plan.per_user_delta {
        if delta == 0 {
            continue;
        }
        match store.increment_user_balance(user_id, delta).await {
            Ok(()) => result.increments_applied += 1,
            Err(err) => {
                result.increments_failed += 1;
                warn!(user_id, delta, "balance increment failed: {err}");
            }
        }
    }

    if plan.pool_delta > 0 {
        if let Err(err) = store.increment_pool_balance(POOL_KEY, plan.pool_delta).await {
            warn!(delta = plan.pool_delta, "pool increment failed: {err}");
        } else {
            info!(delta = plan.pool_delta, "pool credited");
        }
    }

    for (&user_id, tx) in &plan.log {
        if tx.is_empty() {
            continue;
        }

        let language = match store.find_user(user_id).await {
            Ok(Some(user)) => user.language_or_default().to_string(),
            Ok(None) => DEFAULT_LANGUAGE.to_string(),
            Err(err) => {
                warn!(user_id, "language lookup failed, using default: {err}");
                DEFAULT_LANGUAGE.to_string()
            }
        };

        let text = report::render_report(Locale::from_tag(&language), reference_date, tx);
        match deliverer.deliver(user_id, &text).await {
            Ok(()) => result.reports_delivered += 1,
            Err(err) => {
                result.deliveries_failed += 1;
                warn!(user_id, "report delivery failed: {err}");
            }
        }
    }

    result
}
