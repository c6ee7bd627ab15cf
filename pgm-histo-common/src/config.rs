use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// What a worker does when it cannot open, seek or fully read its span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IoPolicy {
    /// Keep whatever was tallied (possibly nothing) and let the job finish.
    #[default]
    Lenient,
    /// Any worker I/O failure fails the whole job.
    Strict,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub io_policy: IoPolicy,
}

fn default_chunk_size() -> usize {
    1024
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            io_policy: IoPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_format() -> String {
    "csv".into()
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

impl Config {
    pub fn config_path() -> PathBuf {
        if let Ok(env_path) = std::env::var("PGM_HISTO_CONFIG") {
            return PathBuf::from(env_path); // $PGM_HISTO_CONFIG overrides default config path
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pgm-histo")
            .join("config.toml")
    }

    pub fn load() -> crate::Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> crate::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let cfg: Self =
            toml::from_str(&content).map_err(|e| crate::HistoError::Config(e.to_string()))?;
        if cfg.engine.chunk_size == 0 {
            return Err(crate::HistoError::Config(
                "engine.chunk_size must be at least 1".into(),
            ));
        }
        Ok(cfg)
    }
}
