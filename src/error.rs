use sqlx::migrate::MigrateError;
use thiserror::Error;
use uuid::Uuid;

/// Top-level error type for the entire application
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Settlement error: {0}")]
    Settlement(#[from] SettlementError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("External error: {0}")]
    External(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Settlement-run errors
///
/// Record- and follower-level variants are consumed at their entity boundary
/// (logged, entity skipped); only store connectivity failures abort a run.
#[derive(Error, Debug)]
pub enum SettlementError {
    #[error("Habit record not found: {0}")]
    HabitNotFound(Uuid),

    #[error("User account not found: {0}")]
    UserNotFound(i64),
}

/// Report-delivery errors (user-level, never fatal)
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Delivery rejected ({status}): {description}")]
    Rejected { status: u16, description: String },
}

impl From<reqwest::Error> for AppError {
    fn from(error: reqwest::Error) -> Self {
        AppError::Delivery(DeliveryError::Transport(format!("{error:?}")))
    }
}

impl From<MigrateError> for AppError {
    fn from(error: MigrateError) -> Self {
        AppError::Internal(format!("Migration error: {error:?}"))
    }
}

/// Result type alias for the application
pub type AppResult<T> = Result<T, AppError>;
