use std::{env, fmt::Display, str::FromStr};

use tracing::info;

pub struct Config {
    pub port: u16,
    pub database_url: String,
}

impl Config {
    /// Load configuration from the environment, falling back to defaults
    /// suitable for local development.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Self {
            port: try_load("PORT", "3030"),
            database_url: try_load("DATABASE_URL", "sqlite://polls.db"),
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    let value = env::var(key).unwrap_or_else(|_| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });
    value
        .parse()
        .unwrap_or_else(|e| panic!("invalid {key} value {value:?}: {e}"))
}
