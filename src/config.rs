use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::PoseidonError;

pub const CONFIG_FILE: &str = "poseidon.json";
pub const THREADS_ENV: &str = "FQD_THREADS";

/// Optional per-directory overrides, read from `poseidon.json`.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub threads: Option<usize>,
    #[serde(default)]
    pub max_size: Option<String>,
    #[serde(default)]
    pub job_prefix: Option<String>,
    #[serde(default)]
    pub tools: Option<ToolNames>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ToolNames {
    #[serde(default)]
    pub prefetch: Option<String>,
    #[serde(default)]
    pub fasterq_dump: Option<String>,
    #[serde(default)]
    pub pigz: Option<String>,
    #[serde(default)]
    pub gzip: Option<String>,
    #[serde(default)]
    pub bsub: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    pub prefetch: String,
    pub fasterq_dump: String,
    pub pigz: String,
    pub gzip: String,
    pub bsub: String,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            prefetch: "prefetch".to_string(),
            fasterq_dump: "fasterq-dump".to_string(),
            pigz: "pigz".to_string(),
            gzip: "gzip".to_string(),
            bsub: "bsub".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfig {
    pub threads: usize,
    /// Passed to `prefetch -X`.
    pub max_size: String,
    pub job_prefix: String,
    pub tools: ToolConfig,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            threads: 4,
            max_size: "35000000".to_string(),
            job_prefix: "fastq_".to_string(),
            tools: ToolConfig::default(),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Reads `dir/poseidon.json` if present, then applies `FQD_THREADS` from `env`.
    pub fn resolve<F>(dir: &Path, env: F) -> Result<ResolvedConfig, PoseidonError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let config_path = dir.join(CONFIG_FILE);
        let config = if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .map_err(|_| PoseidonError::ConfigRead(config_path.clone()))?;
            serde_json::from_str(&content)
                .map_err(|err| PoseidonError::ConfigParse(err.to_string()))?
        } else {
            Config::default()
        };

        let mut resolved = Self::resolve_config(config);
        if let Some(value) = env(THREADS_ENV) {
            match value.trim().parse::<usize>() {
                Ok(threads) if threads > 0 => resolved.threads = threads,
                _ => warn!(value = %value, "ignoring invalid {THREADS_ENV}"),
            }
        }
        Ok(resolved)
    }

    pub fn resolve_config(config: Config) -> ResolvedConfig {
        let defaults = ResolvedConfig::default();
        let names = config.tools.unwrap_or_default();
        let tools = ToolConfig {
            prefetch: names.prefetch.unwrap_or(defaults.tools.prefetch),
            fasterq_dump: names.fasterq_dump.unwrap_or(defaults.tools.fasterq_dump),
            pigz: names.pigz.unwrap_or(defaults.tools.pigz),
            gzip: names.gzip.unwrap_or(defaults.tools.gzip),
            bsub: names.bsub.unwrap_or(defaults.tools.bsub),
        };
        ResolvedConfig {
            threads: config
                .threads
                .filter(|threads| *threads > 0)
                .unwrap_or(defaults.threads),
            max_size: config.max_size.unwrap_or(defaults.max_size),
            job_prefix: config.job_prefix.unwrap_or(defaults.job_prefix),
            tools,
        }
    }
}
