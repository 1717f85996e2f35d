use std::{env, path::PathBuf, str::FromStr};

use log::LevelFilter;
use log4rs::{
    append::console::ConsoleAppender,
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
};
use thiserror::Error;
use tokio::time::Duration;

use crate::LOG_CONFIG_PATH;

pub const HOST: &str = "HOST";
pub const PORT: &str = "PORT";

pub const VAR_DATA_DIR: &str = "DATA_DIR";
pub const VAR_NOTIFY_WEBHOOK_URL: &str = "NOTIFY_WEBHOOK_URL";
pub const VAR_POLL_INTERVAL_S: &str = "POLL_INTERVAL_S";
pub const VAR_NOTIFY_TIMEOUT_S: &str = "NOTIFY_TIMEOUT_S";
pub const VAR_LOG_LEVEL: &str = "LOG_LEVEL";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 9898;
const DEFAULT_DATA_DIR: &str = "./data";
const DEFAULT_POLL_INTERVAL_S: u64 = 30;
const DEFAULT_NOTIFY_TIMEOUT_S: u64 = 10;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} is not a valid value: {value:?}")]
    Invalid { name: &'static str, value: String },
    #[error("{0} must be at least one second")]
    ZeroInterval(&'static str),
}

#[derive(Clone, Debug)]
pub struct ServiceConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub webhook_url: Option<String>,
    pub poll_interval: Duration,
    /// Upper bound for each webhook request.
    pub notify_timeout: Duration,
}

impl ServiceConfig {
    pub fn from_env() -> Result<ServiceConfig, ConfigError> {
        let poll_interval = parse_seconds(VAR_POLL_INTERVAL_S, DEFAULT_POLL_INTERVAL_S)?;
        let notify_timeout = parse_seconds(VAR_NOTIFY_TIMEOUT_S, DEFAULT_NOTIFY_TIMEOUT_S)?;

        Ok(ServiceConfig {
            host: env::var(HOST).unwrap_or(String::from(DEFAULT_HOST)),
            port: parse_var(PORT, DEFAULT_PORT)?,
            data_dir: env::var(VAR_DATA_DIR)
                .map(PathBuf::from)
                .unwrap_or(PathBuf::from(DEFAULT_DATA_DIR)),
            webhook_url: env::var(VAR_NOTIFY_WEBHOOK_URL).ok().filter(|url| !url.trim().is_empty()),
            poll_interval,
            notify_timeout,
        })
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::Invalid { name, value }),
        Err(_) => Ok(default),
    }
}

fn parse_seconds(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    match parse_var(name, default)? {
        0 => Err(ConfigError::ZeroInterval(name)),
        seconds => Ok(Duration::from_secs(seconds)),
    }
}

/// Uses `log4rs.yaml` when it exists, otherwise logs to stdout.
pub fn init_logging() {
    if log4rs::init_file(LOG_CONFIG_PATH, Default::default()).is_ok() {
        return;
    }

    let level = env::var(VAR_LOG_LEVEL)
        .ok()
        .and_then(|level| LevelFilter::from_str(&level).ok())
        .unwrap_or(LevelFilter::Info);

    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {h({l})} {t} - {m}{n}")))
        .build();
    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level));

    match config {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!("Failed to initialise logging: {e}");
            }
        }
        Err(e) => eprintln!("Invalid logging config: {e}"),
    }
}

pub fn clamp<T: Ord>(value: T, min: T, max: T) -> T {
    value.max(min).min(max)
}
