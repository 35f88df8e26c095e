// Settlement scheduler - fires the nightly settlement run
//
// The run settles the most recently fully-elapsed calendar day in a fixed
// reference timezone. Both the execution hour and the reference offset are
// configuration, not constants.

use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use tokio::task::JoinHandle;
use tracing::{error, info};

use super::SettlementEngine;

/// Settlement schedule configuration
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// UTC hour to execute settlement (0-23)
    pub execution_hour: u32,
    /// Offset of the reference timezone from UTC, in minutes
    pub reference_offset_minutes: i64,
}

/// The most recently fully-elapsed calendar day in the reference timezone
pub fn reference_date(now: DateTime<Utc>, offset_minutes: i64) -> NaiveDate {
    (now + Duration::minutes(offset_minutes)).date_naive() - Duration::days(1)
}

/// Daily settlement scheduler
pub struct SettlementScheduler {
    config: ScheduleConfig,
    engine: Arc<SettlementEngine>,
}

impl SettlementScheduler {
    pub fn new(config: ScheduleConfig, engine: Arc<SettlementEngine>) -> Self {
        Self { config, engine }
    }

    /// Start the scheduler (runs in background)
    pub fn start(&self) -> JoinHandle<()> {
        let config = self.config.clone();
        let engine = self.engine.clone();

        tokio::spawn(async move {
            Self::run_daily(&config, &engine).await;
        })
    }

    async fn run_daily(config: &ScheduleConfig, engine: &Arc<SettlementEngine>) {
        loop {
            let now = Utc::now();
            let next_execution = Self::calculate_next_execution(now, config.execution_hour);
            let wait = next_execution.signed_duration_since(now);

            if wait.num_seconds() > 0 {
                info!(
                    "⏰ Next settlement scheduled for {} UTC",
                    next_execution.format("%Y-%m-%d %H:%M:%S")
                );
                tokio::time::sleep(std::time::Duration::from_secs(wait.num_seconds() as u64))
                    .await;
            }

            let date = reference_date(Utc::now(), config.reference_offset_minutes);
            info!(reference_date = %date, "🔄 Starting settlement run");

            match engine.run(date).await {
                Ok(summary) if summary.already_settled => {
                    info!(reference_date = %date, "✓ Date was already settled");
                }
                Ok(summary) => {
                    info!(
                        reference_date = %date,
                        records = summary.unfulfilled_records,
                        pool_delta = summary.pool_delta,
                        "✓ Settlement run completed"
                    );
                }
                // State was not mutated; the next tick retries naturally
                Err(err) => error!(reference_date = %date, "❌ Settlement run aborted: {err:?}"),
            }
        }
    }

    /// Calculate the next daily execution instant
    fn calculate_next_execution(now: DateTime<Utc>, execution_hour: u32) -> DateTime<Utc> {
        let today = now
            .date_naive()
            .and_hms_opt(execution_hour, 0, 0)
            .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).unwrap());
        let today_dt = Utc.from_utc_datetime(&today);

        if today_dt <= now {
            let tomorrow = (now.date_naive() + Duration::days(1))
                .and_hms_opt(execution_hour, 0, 0)
                .unwrap_or_else(|| now.date_naive().and_hms_opt(0, 0, 0).unwrap());
            Utc.from_utc_datetime(&tomorrow)
        } else {
            today_dt
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    #[test]
    fn test_calculate_next_execution() {
        // Current time: 2024-01-01 10:00:00 UTC
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();

        // Execution hour 14:00 is still ahead today
        let next = SettlementScheduler::calculate_next_execution(now, 14);
        assert_eq!(next.hour(), 14);
        assert_eq!(next.day(), 1);

        // Execution hour 09:00 already passed, so tomorrow
        let next = SettlementScheduler::calculate_next_execution(now, 9);
        assert_eq!(next.hour(), 9);
        assert_eq!(next.day(), 2);
    }

    #[test]
    fn test_reference_date_is_yesterday_in_reference_timezone() {
        let now = Utc.with_ymd_and_hms(2024, 1, 2, 0, 5, 0).unwrap();

        // UTC reference: Jan 2 just started, so Jan 1 is settled
        assert_eq!(
            reference_date(now, 0),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );

        // UTC-1: still Jan 1 there, so Dec 31 is the last elapsed day
        assert_eq!(
            reference_date(now, -60),
            NaiveDate::from_ymd_opt(2023, 12, 31).unwrap()
        );

        // UTC+3: well into Jan 2, Jan 1 is settled
        assert_eq!(
            reference_date(now, 180),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
        );
    }
}
