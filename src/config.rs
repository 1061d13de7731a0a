use anyhow::Context;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;

use crate::services::wallet_precision::DEFAULT_DECIMAL_PLACES;
use crate::validation::validate_sql_identifier;

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database_url: String,
    pub database_max_connections: u32,
    pub transaction_table: String,
    pub wallet_table: String,
    pub users_table: String,
    pub default_decimal_places: i64,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv().ok(); // Load .env file if present

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get_or = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let config = Config {
            database_url: lookup("DATABASE_URL").context("DATABASE_URL must be set")?,
            database_max_connections: get_or("DATABASE_MAX_CONNECTIONS", "5")
                .parse()
                .context("DATABASE_MAX_CONNECTIONS must be a positive integer")?,
            transaction_table: get_or("WALLET_TRANSACTION_TABLE", "transactions"),
            wallet_table: get_or("WALLET_WALLET_TABLE", "wallets"),
            users_table: get_or("WALLET_USERS_TABLE", "users"),
            default_decimal_places: match lookup("WALLET_DEFAULT_DECIMAL_PLACES") {
                Some(raw) => raw
                    .parse()
                    .context("WALLET_DEFAULT_DECIMAL_PLACES must be an integer")?,
                None => DEFAULT_DECIMAL_PLACES,
            },
            log_format: parse_log_format(&get_or("LOG_FORMAT", "text"))?,
        };

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> anyhow::Result<()> {
        validate_sql_identifier("WALLET_TRANSACTION_TABLE", &self.transaction_table)?;
        validate_sql_identifier("WALLET_WALLET_TABLE", &self.wallet_table)?;
        validate_sql_identifier("WALLET_USERS_TABLE", &self.users_table)?;

        if self.database_max_connections == 0 {
            anyhow::bail!("DATABASE_MAX_CONNECTIONS must be at least 1");
        }
        if self.default_decimal_places < 0 {
            anyhow::bail!("WALLET_DEFAULT_DECIMAL_PLACES must be non-negative");
        }

        Ok(())
    }
}

fn parse_log_format(raw: &str) -> anyhow::Result<LogFormat> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "text" | "pretty" => Ok(LogFormat::Text),
        "json" => Ok(LogFormat::Json),
        other => anyhow::bail!("LOG_FORMAT must be 'text' or 'json', got '{}'", other),
    }
}
