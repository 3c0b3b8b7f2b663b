// ⚙️ Configuration - Environment-driven settings
//
// PETCLINIC_DB    database file      (default petclinic.db)
// PETCLINIC_ADDR  server bind        (default 127.0.0.1:3000)
// PETCLINIC_LOG   tracing filter     (default info, RUST_LOG wins)
// PETCLINIC_PAGE  owners per page    (default 5)

use crate::error::{ClinicError, Result};
use crate::search::PAGE_SIZE;
use std::path::PathBuf;

pub const DB_ENV: &str = "PETCLINIC_DB";
pub const ADDR_ENV: &str = "PETCLINIC_ADDR";
pub const LOG_ENV: &str = "PETCLINIC_LOG";
pub const PAGE_ENV: &str = "PETCLINIC_PAGE";

pub const DEFAULT_DB: &str = "petclinic.db";
pub const DEFAULT_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_LOG: &str = "info";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub database_path: PathBuf,
    pub bind_address: String,
    pub log_filter: String,
    pub page_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database_path: PathBuf::from(DEFAULT_DB),
            bind_address: DEFAULT_ADDR.to_string(),
            log_filter: DEFAULT_LOG.to_string(),
            page_size: PAGE_SIZE,
        }
    }
}

impl Config {
    /// Read settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`; unset or blank values fall back to defaults
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = Config::default();

        let page_size = match get(PAGE_ENV) {
            Some(raw) => match raw.parse::<usize>() {
                Ok(size) if size > 0 => size,
                _ => {
                    return Err(ClinicError::invalid_argument(format!(
                        "{} must be a positive integer, got '{}'",
                        PAGE_ENV, raw
                    )))
                }
            },
            None => defaults.page_size,
        };

        Ok(Config {
            database_path: get(DB_ENV).map(PathBuf::from).unwrap_or(defaults.database_path),
            bind_address: get(ADDR_ENV).unwrap_or(defaults.bind_address),
            log_filter: get(LOG_ENV).unwrap_or(defaults.log_filter),
            page_size,
        })
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }
}
