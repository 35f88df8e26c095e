use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// Fixed key of the singleton pool account that absorbs undistributable
/// stakes and rounding remainders. The engine only ever increments it.
pub const POOL_KEY: &str = "settlement";

/// Fallback locale when a user has no stored language preference
pub const DEFAULT_LANGUAGE: &str = "en";

/// Habit entity - a trackable commitment with an optional stake
///
/// The follows relation is record-to-record: `followers` holds ids of other
/// habit records, not user ids. Read-only to the settlement engine.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HabitRecord {
    pub id: Uuid,
    pub owner_id: i64,
    pub title: String,
    pub stake: i64,
    /// Weekday indices the habit is active on, 0 = Monday .. 6 = Sunday
    pub days: Vec<i16>,
    pub followers: Vec<Uuid>,
}

impl HabitRecord {
    pub fn is_due_on(&self, weekday: i16) -> bool {
        self.stake > 0 && self.days.contains(&weekday)
    }

    /// Whether this record follows the given habit (one direction only)
    pub fn follows(&self, habit_id: Uuid) -> bool {
        self.followers.contains(&habit_id)
    }
}

/// One check-in entry inside a daily completion record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionEntry {
    pub habit_id: Uuid,
    pub done: bool,
}

/// Daily check-in record, one per (user, calendar date)
///
/// Created by the check-in feature; the engine only reads it. Absence of the
/// record or of an entry means "not completed", never an error.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub user_id: i64,
    pub date: NaiveDate,
    pub entries: Vec<CompletionEntry>,
}

impl CompletionRecord {
    pub fn is_done(&self, habit_id: Uuid) -> bool {
        self.entries.iter().any(|e| e.habit_id == habit_id && e.done)
    }
}

/// User entity
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct UserAccount {
    /// Telegram-style numeric id
    pub id: i64,
    pub username: String,
    pub balance: i64,
    pub language: Option<String>,
}

impl UserAccount {
    pub fn display_name(&self) -> String {
        if self.username.is_empty() {
            self.id.to_string()
        } else {
            format!("@{}", self.username)
        }
    }

    pub fn language_or_default(&self) -> &str {
        self.language.as_deref().unwrap_or(DEFAULT_LANGUAGE)
    }
}
