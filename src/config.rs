use anyhow::{Context, bail};
use std::env;
use std::str::FromStr;
use std::time::Duration;

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub server_addr: String,

    // Rate limiting
    pub rate_protected_per_min: u32,

    pub api_prefix: String,

    pub policy_cache_ttl: Duration,
    pub policy_cache_capacity: u64,

    pub log_dir: String,
}

fn required(key: &str) -> anyhow::Result<String> {
    env::var(key).with_context(|| format!("{key} must be set"))
}

fn parsed_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let rate_protected_per_min = parsed_or("RATE_PROTECTED_PER_MIN", 1000)?;
        if rate_protected_per_min == 0 {
            bail!("RATE_PROTECTED_PER_MIN must be greater than 0");
        }

        Ok(Self {
            server_addr: required("SERVER_ADDR")?,
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            rate_protected_per_min,
            api_prefix: env::var("API_PREFIX").unwrap_or_else(|_| "/api".to_string()),
            policy_cache_ttl: Duration::from_secs(parsed_or("POLICY_CACHE_TTL_SECS", 300)?),
            policy_cache_capacity: parsed_or("POLICY_CACHE_CAPACITY", 10_000)?,
            log_dir: env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
        })
    }

    #[cfg(test)]
    pub fn for_tests() -> Self {
        Self {
            database_url: String::new(),
            jwt_secret: "test-secret".to_string(),
            server_addr: "127.0.0.1:0".to_string(),
            rate_protected_per_min: 1000,
            api_prefix: "/api".to_string(),
            policy_cache_ttl: Duration::from_secs(60),
            policy_cache_capacity: 100,
            log_dir: "logs".to_string(),
        }
    }
}
