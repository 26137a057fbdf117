//! Pipeline configuration: YAML file, then `OWWIKI_*` environment overrides, then CLI flags.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::criteria::{ParserOptions, DEFAULT_INDENT_WIDTH, DEFAULT_TABLES_PATH};

pub const DEFAULT_RAW_DATA_DIR: &str = "output/owlib";
pub const DEFAULT_OUTPUT_DIR: &str = "assets/data/hero-quotes";
pub const DEFAULT_DATA_VERSION: &str = "2.21";

pub const ENV_RAW_DATA: &str = "OWWIKI_RAW_DATA";
pub const ENV_OUTPUT: &str = "OWWIKI_OUTPUT";
pub const ENV_TABLES: &str = "OWWIKI_TABLES";
pub const ENV_VERSION: &str = "OWWIKI_VERSION";
pub const ENV_WORKERS: &str = "OWWIKI_WORKERS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("{name} must be a non-negative integer, got '{value}'")]
    InvalidWorkers { name: String, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub raw_data_dir: PathBuf,
    pub output_dir: PathBuf,
    pub tables_path: PathBuf,
    /// Directory of `{name, key}` hero page files merged into the hero table.
    pub heroes_dir: Option<PathBuf>,
    pub data_version: String,
    /// 0 uses the global rayon pool.
    pub workers: usize,
    pub unwrap_single_group: bool,
    pub indent_width: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            raw_data_dir: PathBuf::from(DEFAULT_RAW_DATA_DIR),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            tables_path: PathBuf::from(DEFAULT_TABLES_PATH),
            heroes_dir: None,
            data_version: DEFAULT_DATA_VERSION.to_string(),
            workers: 0,
            unwrap_single_group: false,
            indent_width: DEFAULT_INDENT_WIDTH,
        }
    }
}

impl PipelineConfig {
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            indent_width: self.indent_width.max(1),
            unwrap_single_group: self.unwrap_single_group,
        }
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|name| std::env::var(name).ok())
    }

    /// Apply overrides from any variable source. Empty values are ignored.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        if let Some(value) = get(ENV_RAW_DATA) {
            self.raw_data_dir = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_OUTPUT) {
            self.output_dir = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_TABLES) {
            self.tables_path = PathBuf::from(value);
        }
        if let Some(value) = get(ENV_VERSION) {
            self.data_version = value;
        }
        if let Some(value) = get(ENV_WORKERS) {
            self.workers = value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidWorkers {
                    name: ENV_WORKERS.to_string(),
                    value,
                })?;
        }
        Ok(())
    }
}

/// Load the config file if given, otherwise start from defaults.
pub fn load_config(path: Option<&Path>) -> Result<PipelineConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(PipelineConfig::default());
    };
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    if raw.trim().is_empty() {
        return Ok(PipelineConfig::default());
    }
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config: PipelineConfig =
            serde_yaml::from_str("data_version: \"2.30\"\nworkers: 4\n").unwrap();
        assert_eq!(config.data_version, "2.30");
        assert_eq!(config.workers, 4);
        assert_eq!(config.indent_width, DEFAULT_INDENT_WIDTH);
        assert_eq!(config.tables_path, PathBuf::from(DEFAULT_TABLES_PATH));
        assert!(!config.unwrap_single_group);
    }

    #[test]
    fn env_overrides_file_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_OUTPUT, "/tmp/out"),
            (ENV_VERSION, "2.22"),
            (ENV_WORKERS, "3"),
            (ENV_TABLES, ""),
        ]
        .into_iter()
        .collect();
        let mut config = PipelineConfig::default();
        config
            .apply_env_from(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.data_version, "2.22");
        assert_eq!(config.workers, 3);
        assert_eq!(config.tables_path, PathBuf::from(DEFAULT_TABLES_PATH));
    }

    #[test]
    fn bad_worker_count_is_rejected() {
        let mut config = PipelineConfig::default();
        let err = config
            .apply_env_from(|name| (name == ENV_WORKERS).then(|| "many".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidWorkers { .. }));
    }

    #[test]
    fn indent_width_reaches_parser_options() {
        let config: PipelineConfig =
            serde_yaml::from_str("indent_width: 2\nunwrap_single_group: true\n").unwrap();
        let options = config.parser_options();
        assert_eq!(options.indent_width, 2);
        assert!(options.unwrap_single_group);

        let zero = PipelineConfig {
            indent_width: 0,
            ..PipelineConfig::default()
        };
        assert_eq!(zero.parser_options().indent_width, 1);
    }

    #[test]
    fn missing_path_means_defaults() {
        assert_eq!(load_config(None).unwrap(), PipelineConfig::default());
    }
}
