use std::fmt::Display;
use std::str::FromStr;

use crate::error::Error;
use crate::user::import::DEFAULT_BATCH_SIZE;

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: String,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub jwt_secret: String,
    pub token_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub import_batch_size: usize,
}

impl Config {
    pub fn from_env() -> Result<Config, Error> {
        dotenvy::dotenv().ok();

        let config = Config {
            bind_address: env_or("CIFCAST_BIND_ADDRESS", "127.0.0.1:8080"),
            mongodb_uri: env_or("CIFCAST_MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_database: env_or("CIFCAST_MONGODB_DATABASE", "cifcast"),
            jwt_secret: std::env::var("CIFCAST_JWT_SECRET")
                .map_err(|_| Error::MissingConfig { key: "CIFCAST_JWT_SECRET" })?,
            token_ttl_secs: parsed_env_or("CIFCAST_TOKEN_TTL_SECS", 3600)?,
            sweep_interval_secs: parsed_env_or("CIFCAST_SWEEP_INTERVAL_SECS", 60)?,
            import_batch_size: parsed_env_or("CIFCAST_IMPORT_BATCH_SIZE", DEFAULT_BATCH_SIZE)?,
        };

        if config.sweep_interval_secs == 0 {
            return Err(Error::InvalidConfig {
                key: "CIFCAST_SWEEP_INTERVAL_SECS",
                reason: "interval must be at least one second".to_string(),
            });
        }
        if config.import_batch_size == 0 {
            return Err(Error::InvalidConfig {
                key: "CIFCAST_IMPORT_BATCH_SIZE",
                reason: "batch size must be at least one row".to_string(),
            });
        }

        Ok(config)
    }
}

fn env_or(key: &'static str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parsed_env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, Error>
where
    T::Err: Display,
{
    match std::env::var(key) {
        Ok(raw) => raw.parse().map_err(|err: T::Err| Error::InvalidConfig {
            key,
            reason: err.to_string(),
        }),
        Err(_) => Ok(default),
    }
}
