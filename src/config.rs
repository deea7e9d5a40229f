use std::{env, fmt::Display, fs::read_to_string, path::PathBuf, str::FromStr, time::Duration};

use tracing::{info, warn};

use crate::error::ConfigError;

pub const DEFAULT_TABLE: &str = "microcopy";
pub const MAX_RETRIES_LIMIT: usize = 10;

pub struct Config {
    pub store_url: Option<String>,
    pub api_key: String,
    pub table: String,
    pub seed_file: Option<PathBuf>,
    pub ttl: Duration,
    pub request_timeout: Duration,
    pub max_retries: usize,
    pub prefetch: bool,
}

impl Config {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let store_url = non_empty(lookup("MICROCOPY_STORE_URL"))
            .map(|url| url.trim_end_matches('/').to_string());
        let api_key = non_empty(lookup("MICROCOPY_API_KEY"))
            .or_else(|| read_secret("MICROCOPY_API_KEY"))
            .unwrap_or_default();

        if store_url.is_some() && api_key.is_empty() {
            warn!("MICROCOPY_STORE_URL is set without an API key, requests will be anonymous");
        }

        let max_retries: usize = try_load(&lookup, "MICROCOPY_MAX_RETRIES", "3")?;
        if !(1..=MAX_RETRIES_LIMIT).contains(&max_retries) {
            return Err(ConfigError::Invalid {
                key: "MICROCOPY_MAX_RETRIES",
                message: format!("must be between 1 and {MAX_RETRIES_LIMIT}"),
            });
        }

        Ok(Self {
            store_url,
            api_key,
            table: try_load(&lookup, "MICROCOPY_TABLE", DEFAULT_TABLE)?,
            seed_file: non_empty(lookup("MICROCOPY_SEED_FILE")).map(PathBuf::from),
            ttl: Duration::from_secs(try_load(&lookup, "MICROCOPY_TTL_SECS", "300")?),
            request_timeout: Duration::from_secs(try_load(
                &lookup,
                "MICROCOPY_TIMEOUT_SECS",
                "10",
            )?),
            max_retries,
            prefetch: try_load(&lookup, "MICROCOPY_PREFETCH", "true")?,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn try_load<T, F>(lookup: &F, key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let raw = non_empty(lookup(key)).unwrap_or_else(|| {
        info!("{key} not set, using default: {default}");
        default.to_string()
    });

    raw.trim().parse().map_err(|e: T::Err| {
        warn!("Invalid {key} value: {e}");
        ConfigError::Invalid {
            key,
            message: e.to_string(),
        }
    })
}

fn read_secret(secret_name: &str) -> Option<String> {
    let path = format!("/run/secrets/{secret_name}");

    read_to_string(&path)
        .map(|s| s.trim().to_string())
        .map_err(|e| {
            info!("No {secret_name} secret at {path}: {e}");
        })
        .ok()
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = Config::from_lookup(lookup(&[("MICROCOPY_API_KEY", "anon")])).unwrap();
        assert_eq!(cfg.store_url, None);
        assert_eq!(cfg.table, "microcopy");
        assert_eq!(cfg.ttl, Duration::from_secs(300));
        assert_eq!(cfg.request_timeout, Duration::from_secs(10));
        assert_eq!(cfg.max_retries, 3);
        assert!(cfg.prefetch);
    }

    #[test]
    fn store_url_loses_trailing_slash() {
        let cfg = Config::from_lookup(lookup(&[
            ("MICROCOPY_STORE_URL", "https://db.example.test/"),
            ("MICROCOPY_API_KEY", "anon"),
            ("MICROCOPY_TTL_SECS", "60"),
        ]))
        .unwrap();
        assert_eq!(cfg.store_url.as_deref(), Some("https://db.example.test"));
        assert_eq!(cfg.api_key, "anon");
        assert_eq!(cfg.ttl, Duration::from_secs(60));
    }

    #[test]
    fn invalid_numbers_are_rejected() {
        let err = Config::from_lookup(lookup(&[("MICROCOPY_TTL_SECS", "five")]))
            .err()
            .expect("ttl must be numeric");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "MICROCOPY_TTL_SECS",
                ..
            }
        ));
    }

    #[test]
    fn zero_retries_is_rejected() {
        let result = Config::from_lookup(lookup(&[("MICROCOPY_MAX_RETRIES", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn retries_above_limit_are_rejected() {
        let err = Config::from_lookup(lookup(&[("MICROCOPY_MAX_RETRIES", "60")]))
            .err()
            .expect("retry count is bounded");
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "MICROCOPY_MAX_RETRIES",
                ..
            }
        ));

        let cfg = Config::from_lookup(lookup(&[("MICROCOPY_MAX_RETRIES", "10")]))
            .expect("limit itself is accepted");
        assert_eq!(cfg.max_retries, 10);
    }
}
