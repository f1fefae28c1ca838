use std::str::FromStr;

use chrono::{DateTime, Utc};
use envconfig::Envconfig;
use kpi_common::{KpiParams, StoreConfig};

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(default = "data/customers.csv")]
    pub customers_path: String,

    #[envconfig(default = "data/orders.xml")]
    pub orders_path: String,

    #[envconfig(default = "sqlite::memory:")]
    pub database_url: String,

    #[envconfig(default = "5")]
    pub max_db_connections: u32,

    #[envconfig(default = "30")]
    pub acquire_timeout_secs: u64,

    #[envconfig(default = "2025-11-06T00:00:00Z")]
    pub as_of: EnvTimestamp,

    #[envconfig(default = "30")]
    pub window_days: NonZero,

    #[envconfig(default = "10")]
    pub top_spenders_limit: NonZero,

    #[envconfig(default = "0.000001")]
    pub sum_tolerance: f64,

    #[envconfig(default = "text")]
    pub output_format: OutputFormat,
}

impl Config {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            db_url: self.database_url.clone(),
            max_connections: Some(self.max_db_connections),
            acquire_timeout_seconds: Some(self.acquire_timeout_secs),
        }
    }

    pub fn kpi_params(&self) -> KpiParams {
        KpiParams::new(self.as_of.0)
            .window_days(self.window_days.0)
            .limit(self.top_spenders_limit.0)
    }
}

/// The reference instant, given as an RFC 3339 timestamp.
#[derive(Debug, Clone, Copy)]
pub struct EnvTimestamp(pub DateTime<Utc>);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvTimestampError;

impl FromStr for EnvTimestamp {
    type Err = ParseEnvTimestampError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ts = DateTime::parse_from_rfc3339(s).map_err(|_| ParseEnvTimestampError)?;

        Ok(EnvTimestamp(ts.with_timezone(&Utc)))
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NonZero(pub u32);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseNonZeroError;

impl FromStr for NonZero {
    type Err = ParseNonZeroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<u32>() {
            Ok(0) | Err(_) => Err(ParseNonZeroError),
            Ok(n) => Ok(NonZero(n)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Debug, PartialEq, Eq)]
pub struct ParseOutputFormatError(pub String);

impl FromStr for OutputFormat {
    type Err = ParseOutputFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            invalid => Err(ParseOutputFormatError(invalid.to_owned())),
        }
    }
}
