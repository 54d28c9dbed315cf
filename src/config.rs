use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

use crate::app::DEFAULT_CONCURRENCY;
use crate::domain::{Query, StructureFormat};
use crate::error::AfError;
use crate::transport::DEFAULT_TIMEOUT;

pub const DEFAULT_CONFIG_FILE: &str = "alphafetch.json";
pub const DEFAULT_OUT_DIR: &str = "alphafold_models";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub queries: Vec<String>,
    #[serde(default)]
    pub out_dir: Option<String>,
    #[serde(default)]
    pub formats: Option<Vec<StructureFormat>>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub queries: Vec<Query>,
    pub out_dir: Utf8PathBuf,
    pub formats: Vec<StructureFormat>,
    pub concurrency: usize,
    pub timeout: Duration,
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// An explicitly given path must exist; the default `alphafetch.json` is
    /// optional and its absence means "all defaults, queries from the CLI".
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, AfError> {
        let config_path = PathBuf::from(path.unwrap_or(DEFAULT_CONFIG_FILE));

        let config = if path.is_none() && !config_path.exists() {
            Config::default()
        } else {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| AfError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content).map_err(|err| AfError::ConfigParse(err.to_string()))?
        };

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, AfError> {
        let queries = config
            .queries
            .iter()
            .map(|query| query.parse())
            .collect::<Result<Vec<Query>, AfError>>()?;

        let formats = normalize_formats(
            config
                .formats
                .unwrap_or_else(StructureFormat::default_priority),
        )?;

        let concurrency = config.concurrency.unwrap_or(DEFAULT_CONCURRENCY);
        if concurrency == 0 {
            return Err(AfError::InvalidConfig(
                "concurrency must be at least 1".to_string(),
            ));
        }

        let timeout = config
            .timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_TIMEOUT);
        if timeout.is_zero() {
            return Err(AfError::InvalidConfig(
                "timeout_secs must be at least 1".to_string(),
            ));
        }

        Ok(ResolvedConfig {
            queries,
            out_dir: Utf8PathBuf::from(
                config.out_dir.unwrap_or_else(|| DEFAULT_OUT_DIR.to_string()),
            ),
            formats,
            concurrency,
            timeout,
        })
    }
}

/// Priority order is the caller's; duplicates collapse to their first
/// position. An empty list would make every fetch a no-op, so it is rejected.
pub fn normalize_formats(
    formats: Vec<StructureFormat>,
) -> Result<Vec<StructureFormat>, AfError> {
    if formats.is_empty() {
        return Err(AfError::InvalidFormat("format list is empty".to_string()));
    }
    let mut seen = Vec::with_capacity(formats.len());
    for format in formats {
        if !seen.contains(&format) {
            seen.push(format);
        }
    }
    Ok(seen)
}
