use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub bot_token: String,
    /// UTC hour (0-23) at which the daily settlement run fires
    pub settlement_hour: u32,
    /// Offset of the reference timezone from UTC, in minutes. The settled
    /// day is the most recently fully-elapsed calendar day in that timezone.
    pub reference_offset_minutes: i64,
}

impl Config {
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Ok(Self {
            database_url: std::env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/habits".to_string()),
            bot_token: std::env::var("BOT_TOKEN")
                .map_err(|_| config::ConfigError::NotFound("BOT_TOKEN".to_string()))?,
            settlement_hour: parse_env("SETTLEMENT_HOUR", 0)?,
            reference_offset_minutes: parse_env("REFERENCE_OFFSET_MINUTES", 0)?,
        })
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> Result<T, config::ConfigError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|_| config::ConfigError::Message(format!("invalid value for {name}: {raw}"))),
        Err(_) => Ok(default),
    }
}
