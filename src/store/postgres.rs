use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::models::{CompletionEntry, CompletionRecord, HabitRecord, UserAccount};
use super::SettlementStore;
use crate::error::{AppResult, SettlementError};

/// Postgres-backed store - the source of truth for accounts and habits
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SettlementStore for PgStore {
    async fn find_due_stake_habits(&self, weekday: i16) -> AppResult<Vec<HabitRecord>> {
        let habits = sqlx::query_as::<_, HabitRecord>(
            r#"
            SELECT id, owner_id, title, stake, days, followers
            FROM habits
            WHERE stake > 0 AND $1 = ANY(days)
            ORDER BY id
            "#,
        )
        .bind(weekday)
        .fetch_all(&self.pool)
        .await?;

        Ok(habits)
    }

    async fn find_habit(&self, id: Uuid) -> AppResult<Option<HabitRecord>> {
        let habit = sqlx::query_as::<_, HabitRecord>(
            r#"
            SELECT id, owner_id, title, stake, days, followers
            FROM habits
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(habit)
    }

    async fn find_completion(
        &self,
        user_id: i64,
        date: NaiveDate,
    ) -> AppResult<Option<CompletionRecord>> {
        let rows = sqlx::query(
            r#"
            SELECT habit_id, done
            FROM completions
            WHERE user_id = $1 AND date = $2
            "#,
        )
        .bind(user_id)
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let entries = rows
            .iter()
            .map(|row| {
                Ok(CompletionEntry {
                    habit_id: row.try_get("habit_id")?,
                    done: row.try_get("done")?,
                })
            })
            .collect::<Result<Vec<_>, sqlx::Error>>()?;

        Ok(Some(CompletionRecord {
            user_id,
            date,
            entries,
        }))
    }

    async fn find_user(&self, user_id: i64) -> AppResult<Option<UserAccount>> {
        let user = sqlx::query_as::<_, UserAccount>(
            r#"
            SELECT id, username, balance, language
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    async fn increment_user_balance(&self, user_id: i64, delta: i64) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET balance = balance + $2
            WHERE id = $1
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(SettlementError::UserNotFound(user_id).into());
        }

        Ok(())
    }

    async fn increment_pool_balance(&self, key: &str, delta: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO system_pool (key, balance)
            VALUES ($1, $2)
            ON CONFLICT (key)
            DO UPDATE SET balance = system_pool.balance + EXCLUDED.balance
            "#,
        )
        .bind(key)
        .bind(delta)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn try_claim_run(&self, date: NaiveDate) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO settlement_runs (date)
            VALUES ($1)
            ON CONFLICT (date) DO NOTHING
            "#,
        )
        .bind(date)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
