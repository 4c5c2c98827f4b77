use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use circle_db::DbOptions;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: PathBuf,
    pub busy_timeout: Duration,
    pub reader_pool_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("circle.db"),
            busy_timeout: Duration::from_millis(5000),
            reader_pool_size: 4,
        }
    }
}

impl Config {
    /// Reads `CIRCLE_*` variables, loading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let db_path = lookup("CIRCLE_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.db_path);

        let busy_timeout = match lookup("CIRCLE_BUSY_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(
                raw.parse()
                    .with_context(|| format!("CIRCLE_BUSY_TIMEOUT_MS is not a number: {}", raw))?,
            ),
            None => defaults.busy_timeout,
        };

        let reader_pool_size = match lookup("CIRCLE_READER_POOL_SIZE") {
            Some(raw) => raw
                .parse()
                .with_context(|| format!("CIRCLE_READER_POOL_SIZE is not a number: {}", raw))?,
            None => defaults.reader_pool_size,
        };
        anyhow::ensure!(reader_pool_size > 0, "CIRCLE_READER_POOL_SIZE must be at least 1");

        Ok(Self {
            db_path,
            busy_timeout,
            reader_pool_size,
        })
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            busy_timeout: self.busy_timeout,
            reader_pool_size: self.reader_pool_size,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = Config::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path, PathBuf::from("circle.db"));
        assert_eq!(config.busy_timeout, Duration::from_millis(5000));
        assert_eq!(config.reader_pool_size, 4);
    }

    #[test]
    fn variables_override_defaults() {
        let config = Config::from_lookup(lookup(&[
            ("CIRCLE_DB_PATH", "/var/lib/circle/data.db"),
            ("CIRCLE_BUSY_TIMEOUT_MS", "250"),
            ("CIRCLE_READER_POOL_SIZE", "2"),
        ]))
        .unwrap();
        assert_eq!(config.db_path, PathBuf::from("/var/lib/circle/data.db"));
        assert_eq!(config.db_options().busy_timeout, Duration::from_millis(250));
        assert_eq!(config.db_options().reader_pool_size, 2);
    }

    #[test]
    fn bad_numbers_are_reported() {
        assert!(Config::from_lookup(lookup(&[("CIRCLE_BUSY_TIMEOUT_MS", "soon")])).is_err());
        assert!(Config::from_lookup(lookup(&[("CIRCLE_READER_POOL_SIZE", "0")])).is_err());
    }
}
