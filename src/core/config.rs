use chrono::Duration;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::core::error::ConfigError;

const DEFAULT_USERS: &str = "student:password123,teacher:secret456";

/// One year.
pub const MAX_TOKEN_TTL_MINUTES: i64 = 60 * 24 * 366;

#[derive(Deserialize, Clone)]
pub struct Args {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    pub secret: String,
    #[serde(default = "default_token_ttl_minutes")]
    pub token_ttl_minutes: i64,
    #[serde(default = "default_users")]
    pub users: String,
    #[serde(default = "default_admins")]
    pub admins: String,
    #[serde(default = "default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    #[serde(default = "default_rate_limit")]
    pub rate_limit_per_second: u64,
}

fn default_host() -> String {
    "127.0.0.1".into()
}

fn default_port() -> u16 {
    8000
}

fn default_log_level() -> String {
    "info".into()
}

fn default_token_ttl_minutes() -> i64 {
    30
}

fn default_users() -> String {
    DEFAULT_USERS.into()
}

fn default_admins() -> String {
    "teacher".into()
}

fn default_bcrypt_cost() -> u32 {
    bcrypt::DEFAULT_COST
}

fn default_rate_limit() -> u64 {
    50
}

impl Default for Args {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
            secret: String::new(),
            token_ttl_minutes: default_token_ttl_minutes(),
            users: default_users(),
            admins: default_admins(),
            bcrypt_cost: default_bcrypt_cost(),
            rate_limit_per_second: default_rate_limit(),
        }
    }
}

impl std::fmt::Debug for Args {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Args")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("log_level", &self.log_level)
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("admins", &self.admins)
            .field("bcrypt_cost", &self.bcrypt_cost)
            .field("rate_limit_per_second", &self.rate_limit_per_second)
            .finish_non_exhaustive()
    }
}

impl Args {
    /// Reads `passgate.toml` when present, then `PASSGATE_*` environment
    /// variables on top of it.
    pub fn load() -> Result<Self, ConfigError> {
        let args = Config::builder()
            .add_source(File::with_name("passgate").required(false))
            .add_source(Environment::with_prefix("PASSGATE"))
            .build()?
            .try_deserialize::<Args>()?;

        args.validate()?;

        Ok(args)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        self.token_ttl()?;

        if self.rate_limit_per_second == 0 {
            return Err(ConfigError::InvalidRateLimit);
        }

        Ok(())
    }

    pub fn token_ttl(&self) -> Result<Duration, ConfigError> {
        if !(1..=MAX_TOKEN_TTL_MINUTES).contains(&self.token_ttl_minutes) {
            return Err(ConfigError::InvalidTtl(self.token_ttl_minutes));
        }

        Duration::try_minutes(self.token_ttl_minutes)
            .ok_or(ConfigError::InvalidTtl(self.token_ttl_minutes))
    }
}

/// Parses `name:password` pairs separated by commas.
pub(crate) fn parse_users(users: &str) -> Result<Vec<(String, String)>, ConfigError> {
    users
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(index, entry)| match entry.split_once(':') {
            Some((name, password)) if !name.is_empty() && !password.is_empty() => {
                Ok((name.to_string(), password.to_string()))
            }
            // never echo the entry, it holds a password
            _ => Err(ConfigError::InvalidUser(format!("entry {} is not name:password", index + 1))),
        })
        .collect()
}

pub(crate) fn parse_admins(admins: &str) -> Vec<String> {
    admins
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(String::from)
        .collect()
}
