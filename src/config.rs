use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::error::DashboardError;

pub const DEFAULT_DATA_PATH: &str = "data/Uber_cleaned_data.parquet";
pub const DEFAULT_SECRETS_PATH: &str = "secrets.json";
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_HISTOGRAM_BINS: usize = 50;

/// Runtime configuration, read from the environment (and `.env`).
#[derive(Clone)]
pub struct DashboardConfig {
    pub data_path: PathBuf,
    pub password: Option<String>,
    pub cache_ttl: Duration,
    pub histogram_bins: usize,
}

impl std::fmt::Debug for DashboardConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DashboardConfig")
            .field("data_path", &self.data_path)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("cache_ttl", &self.cache_ttl)
            .field("histogram_bins", &self.histogram_bins)
            .finish()
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            password: None,
            cache_ttl: DEFAULT_CACHE_TTL,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
        }
    }
}

/// On-disk secrets store:
/// ```json
/// { "password": "hunter2" }
/// ```
#[derive(Debug, Default, Deserialize)]
struct SecretsFile {
    password: Option<String>,
}

impl DashboardConfig {
    /// Read the process environment.  See [`DashboardConfig::from_vars`].
    pub fn from_env() -> (Self, Vec<DashboardError>) {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build the config from a variable lookup.
    ///
    /// A malformed setting falls back to its default and is reported as a
    /// `Config` error alongside the config; the other settings are kept.
    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> (Self, Vec<DashboardError>) {
        let mut problems = Vec::new();
        let defaults = Self::default();

        let data_path = var("TRIP_DASH_DATA")
            .map(PathBuf::from)
            .unwrap_or(defaults.data_path);

        let secrets_path = var("TRIP_DASH_SECRETS")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SECRETS_PATH));

        let password = match var("TRIP_DASH_PASSWORD") {
            Some(password) => Some(password),
            None => match read_secrets(&secrets_path) {
                Ok(secrets) => secrets.password,
                Err(err) => {
                    problems.push(DashboardError::Config(format!("{err:#}")));
                    None
                }
            },
        }
        .filter(|p| !p.is_empty());

        let cache_ttl = match var("TRIP_DASH_CACHE_TTL_SECS") {
            Some(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) => Duration::from_secs(secs),
                Err(err) => {
                    problems.push(DashboardError::Config(format!(
                        "invalid TRIP_DASH_CACHE_TTL_SECS: {err}"
                    )));
                    defaults.cache_ttl
                }
            },
            None => defaults.cache_ttl,
        };

        let histogram_bins = match var("TRIP_DASH_HISTOGRAM_BINS").map(|raw| parse_bins(&raw)) {
            Some(Ok(bins)) => bins,
            Some(Err(err)) => {
                problems.push(err);
                defaults.histogram_bins
            }
            None => defaults.histogram_bins,
        };

        let config = Self {
            data_path,
            password,
            cache_ttl,
            histogram_bins,
        };
        (config, problems)
    }
}

fn parse_bins(raw: &str) -> Result<usize, DashboardError> {
    match raw.trim().parse::<usize>() {
        Ok(0) => Err(DashboardError::Config(
            "TRIP_DASH_HISTOGRAM_BINS must be at least 1".to_string(),
        )),
        Ok(bins) => Ok(bins),
        Err(err) => Err(DashboardError::Config(format!(
            "invalid TRIP_DASH_HISTOGRAM_BINS: {err}"
        ))),
    }
}

/// A missing secrets file is not an error: it just means no password.
fn read_secrets(path: &Path) -> anyhow::Result<SecretsFile> {
    if !path.exists() {
        return Ok(SecretsFile::default());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading secrets file {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing secrets file {}", path.display()))
}
