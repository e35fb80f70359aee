//! Runtime configuration read from the environment.

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::pricing::composer::{PricingSettings, DEFAULT_MAX_STAY_NIGHTS};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} has invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct Config {
    pub host: IpAddr,
    pub port: u16,
    /// Unset means the in-memory store.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub currency_decimals: u32,
    pub max_stay_nights: u32,
    pub season_cache_ttl: Duration,
    pub cache_refresh: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: IpAddr::from([0, 0, 0, 0]),
            port: 8080,
            database_url: None,
            db_max_connections: 10,
            currency_decimals: 2,
            max_stay_nights: DEFAULT_MAX_STAY_NIGHTS,
            season_cache_ttl: Duration::from_secs(300),
            cache_refresh: Duration::from_secs(600),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build from an arbitrary variable source; missing variables take defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Config::default();

        let currency_decimals = parse_or(&lookup, "CURRENCY_DECIMALS", defaults.currency_decimals)?;
        if currency_decimals > 6 {
            return Err(ConfigError::Invalid {
                name: "CURRENCY_DECIMALS",
                value: currency_decimals.to_string(),
                reason: "must be between 0 and 6".to_string(),
            });
        }

        let max_stay_nights = parse_or(&lookup, "MAX_STAY_NIGHTS", defaults.max_stay_nights)?;
        if max_stay_nights == 0 {
            return Err(ConfigError::Invalid {
                name: "MAX_STAY_NIGHTS",
                value: max_stay_nights.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            host: parse_or(&lookup, "HOST", defaults.host)?,
            port: parse_or(&lookup, "PORT", defaults.port)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
            db_max_connections: parse_or(&lookup, "DB_MAX_CONNECTIONS", defaults.db_max_connections)?,
            currency_decimals,
            max_stay_nights,
            season_cache_ttl: Duration::from_secs(parse_or(
                &lookup,
                "SEASON_CACHE_TTL_SECS",
                defaults.season_cache_ttl.as_secs(),
            )?),
            cache_refresh: Duration::from_secs(parse_or(
                &lookup,
                "CACHE_REFRESH_SECS",
                defaults.cache_refresh.as_secs(),
            )?),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn pricing_settings(&self) -> PricingSettings {
        PricingSettings {
            currency_places: self.currency_decimals,
            max_stay_nights: self.max_stay_nights,
        }
    }
}

fn parse_or<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => match value.trim().parse::<T>() {
            Ok(parsed) => Ok(parsed),
            Err(e) => Err(ConfigError::Invalid {
                name,
                reason: e.to_string(),
                value,
            }),
        },
    }
}
