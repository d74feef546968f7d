use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {0} must be set")]
    Missing(&'static str),
    #[error("invalid {key} value '{value}': {reason}")]
    Invalid { key: &'static str, value: String, reason: String },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(format!("expected 'postgres' or 'memory', got '{other}'")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub bind_address: IpAddr,
    pub port: u16,
    pub db_pool_size: u32,
    pub run_migrations: bool,
    pub admin_password_hash: String,
    pub schedule_poll: Duration,
    /// How long a session token stays valid after sign-in.
    pub session_ttl: chrono::Duration,
    pub bcrypt_cost: u32,
    pub public_url: String,
}

impl Config {
    pub fn load() -> Result<Config, ConfigError> {
        Config::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `load` uses the process
    /// environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Config, ConfigError> {
        let store: StoreKind = try_load(&lookup, "VOTING_STORE", "postgres")?;
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        if store == StoreKind::Postgres && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let port: u16 = try_load(&lookup, "PORT", "3000")?;
        let public_url = lookup("PUBLIC_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or_else(|| format!("http://localhost:{port}"));

        let bcrypt_cost: u32 = try_load(&lookup, "BCRYPT_COST", &bcrypt::DEFAULT_COST.to_string())?;
        if !(4..=31).contains(&bcrypt_cost) {
            return Err(ConfigError::Invalid {
                key: "BCRYPT_COST",
                value: bcrypt_cost.to_string(),
                reason: String::from("must be between 4 and 31"),
            });
        }

        let schedule_poll_secs: u64 = positive(try_load(&lookup, "SCHEDULE_POLL_SECS", "30")?, "SCHEDULE_POLL_SECS")?;
        let session_ttl_hours: u32 = positive(try_load(&lookup, "SESSION_TTL_HOURS", "12")?, "SESSION_TTL_HOURS")?;

        Ok(Config {
            store,
            database_url,
            bind_address: try_load(&lookup, "BIND_ADDRESS", "0.0.0.0")?,
            port,
            db_pool_size: positive(try_load(&lookup, "DB_POOL_SIZE", "10")?, "DB_POOL_SIZE")?,
            run_migrations: try_load(&lookup, "RUN_MIGRATIONS", "true")?,
            admin_password_hash: lookup("ADMIN_PASSWORD_HASH")
                .filter(|hash| !hash.trim().is_empty())
                .ok_or(ConfigError::Missing("ADMIN_PASSWORD_HASH"))?,
            schedule_poll: Duration::from_secs(schedule_poll_secs),
            session_ttl: chrono::Duration::hours(i64::from(session_ttl_hours)),
            bcrypt_cost,
            public_url,
        })
    }

    pub fn verification_link(&self, token: impl Display) -> String {
        format!("{}/api/verify/{token}", self.public_url)
    }
}

fn positive<T: Default + PartialEq + Display>(value: T, key: &'static str) -> Result<T, ConfigError> {
    if value == T::default() {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: String::from("must be at least 1"),
        });
    }
    Ok(value)
}

fn try_load<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: &str,
) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    let value = lookup(key).unwrap_or_else(|| {
        debug!("{key} not set, using default: {default}");
        default.to_string()
    });
    let parsed = value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        key,
        value: value.clone(),
        reason: e.to_string(),
    })?;
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config(pairs: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = pairs.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_to_a_minimal_environment() {
        let config = config(&[
            ("DATABASE_URL", "postgres://localhost/union"),
            ("ADMIN_PASSWORD_HASH", "$2b$04$abc"),
        ]).unwrap();
        assert_eq!(config.store, StoreKind::Postgres);
        assert_eq!(config.port, 3000);
        assert_eq!(config.db_pool_size, 10);
        assert!(config.run_migrations);
        assert_eq!(config.schedule_poll, Duration::from_secs(30));
        assert_eq!(config.session_ttl, chrono::Duration::hours(12));
        assert_eq!(config.bcrypt_cost, bcrypt::DEFAULT_COST);
        assert_eq!(config.verification_link("abc"), "http://localhost:3000/api/verify/abc");
    }

    #[test]
    fn postgres_requires_a_database_url() {
        let err = config(&[("ADMIN_PASSWORD_HASH", "$2b$04$abc")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));

        let memory = config(&[("VOTING_STORE", "memory"), ("ADMIN_PASSWORD_HASH", "$2b$04$abc")]).unwrap();
        assert_eq!(memory.store, StoreKind::Memory);
    }

    #[test]
    fn admin_hash_is_required() {
        let err = config(&[("VOTING_STORE", "memory")]).unwrap_err();
        assert_eq!(err, ConfigError::Missing("ADMIN_PASSWORD_HASH"));
    }

    #[test]
    fn malformed_values_are_errors_not_defaults() {
        let base = [("VOTING_STORE", "memory"), ("ADMIN_PASSWORD_HASH", "$2b$04$abc")];
        for bad in [("PORT", "eighty"), ("RUN_MIGRATIONS", "maybe"), ("SCHEDULE_POLL_SECS", "0"), ("BCRYPT_COST", "2")] {
            let mut pairs = base.to_vec();
            pairs.push(bad);
            assert!(matches!(config(&pairs), Err(ConfigError::Invalid { .. })), "{} should be rejected", bad.0);
        }
    }

    #[test]
    fn zero_sized_pool_and_lifetimes_are_rejected() {
        let base = [("VOTING_STORE", "memory"), ("ADMIN_PASSWORD_HASH", "$2b$04$abc")];
        for key in ["DB_POOL_SIZE", "SESSION_TTL_HOURS", "SCHEDULE_POLL_SECS"] {
            let mut pairs = base.to_vec();
            pairs.push((key, "0"));
            assert_eq!(
                config(&pairs).unwrap_err(),
                ConfigError::Invalid { key, value: String::from("0"), reason: String::from("must be at least 1") },
            );
        }

        let mut pairs = base.to_vec();
        pairs.push(("DB_POOL_SIZE", "1"));
        assert_eq!(config(&pairs).unwrap().db_pool_size, 1);
    }

    #[test]
    fn public_url_loses_trailing_slash() {
        let config = config(&[
            ("VOTING_STORE", "memory"),
            ("ADMIN_PASSWORD_HASH", "$2b$04$abc"),
            ("PUBLIC_URL", "https://vote.union.id/"),
        ]).unwrap();
        assert_eq!(config.verification_link("t"), "https://vote.union.id/api/verify/t");
    }
}
