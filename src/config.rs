use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::error::LiftError;

pub const DEFAULT_CONFIG_FILE: &str = "liftmetrics.json";
pub const CONFIG_SCHEMA_VERSION: u32 = 1;
pub const DEFAULT_DATA_URL: &str =
    "https://openpowerlifting.gitlab.io/opl-csv/files/openipf-latest.zip";
pub const DEFAULT_REVISION_URL: &str = "https://openpowerlifting.gitlab.io/opl-csv/bulk-csv.html";
pub const DEFAULT_ARCHIVE_NAME: &str = "openipf-latest.zip";
pub const DEFAULT_DATABASE_NAME: &str = "openipf.db";
pub const DEFAULT_CSV_PREFIX: &str = "openipf";
/// Declared sizes above this are streamed to disk instead of buffered.
pub const DEFAULT_STREAM_THRESHOLD: u64 = 2 * 1024 * 1024 * 1024;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub data_url: Option<String>,
    #[serde(default)]
    pub revision_url: Option<String>,
    #[serde(default)]
    pub data_dir: Option<String>,
    #[serde(default)]
    pub archive_name: Option<String>,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub csv_prefix: Option<String>,
    #[serde(default)]
    pub revision_timeout_secs: Option<u64>,
    #[serde(default)]
    pub download_timeout_secs: Option<u64>,
    #[serde(default)]
    pub metrics_timeout_secs: Option<u64>,
    #[serde(default)]
    pub stream_threshold_bytes: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub data_url: String,
    pub revision_url: String,
    pub data_dir: Utf8PathBuf,
    pub archive_name: String,
    pub database_name: String,
    pub csv_prefix: String,
    pub revision_timeout: Duration,
    pub download_timeout: Duration,
    pub metrics_timeout: Duration,
    pub stream_threshold: u64,
}

impl PipelineConfig {
    pub fn archive_path(&self) -> Utf8PathBuf {
        self.data_dir.join(&self.archive_name)
    }

    pub fn database_path(&self) -> Utf8PathBuf {
        self.data_dir.join("db").join(&self.database_name)
    }

    pub fn lifters_json_path(&self) -> Utf8PathBuf {
        self.data_dir.join("lifters.json")
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads `path`, or `liftmetrics.json` in the working directory when present,
    /// falling back to built-in defaults.
    pub fn resolve(path: Option<&str>) -> Result<PipelineConfig, LiftError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(DEFAULT_CONFIG_FILE),
        };

        if path.is_none() && !config_path.exists() {
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| LiftError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| LiftError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<PipelineConfig, LiftError> {
        let schema_version = config.schema_version.unwrap_or(CONFIG_SCHEMA_VERSION);
        if schema_version != CONFIG_SCHEMA_VERSION {
            return Err(LiftError::InvalidConfig(format!(
                "unsupported schema_version {schema_version}, expected {CONFIG_SCHEMA_VERSION}"
            )));
        }

        let data_url = non_empty(config.data_url, DEFAULT_DATA_URL, "data_url")?;
        let revision_url = non_empty(config.revision_url, DEFAULT_REVISION_URL, "revision_url")?;
        let archive_name = non_empty(config.archive_name, DEFAULT_ARCHIVE_NAME, "archive_name")?;
        let database_name =
            non_empty(config.database_name, DEFAULT_DATABASE_NAME, "database_name")?;

        let data_dir = match config.data_dir {
            Some(dir) => Utf8PathBuf::from(dir),
            None => default_data_dir()?,
        };

        Ok(PipelineConfig {
            data_url,
            revision_url,
            data_dir,
            archive_name,
            database_name,
            csv_prefix: config
                .csv_prefix
                .unwrap_or_else(|| DEFAULT_CSV_PREFIX.to_string()),
            revision_timeout: seconds(config.revision_timeout_secs, 30, "revision_timeout_secs")?,
            download_timeout: seconds(
                config.download_timeout_secs,
                30 * 60,
                "download_timeout_secs",
            )?,
            metrics_timeout: seconds(config.metrics_timeout_secs, 5 * 60, "metrics_timeout_secs")?,
            stream_threshold: config
                .stream_threshold_bytes
                .unwrap_or(DEFAULT_STREAM_THRESHOLD),
        })
    }
}

pub fn default_data_dir() -> Result<Utf8PathBuf, LiftError> {
    BaseDirs::new()
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().join("liftmetrics")).ok())
        .ok_or_else(|| LiftError::Filesystem("unable to resolve data directory".to_string()))
}

fn non_empty(value: Option<String>, default: &str, field: &str) -> Result<String, LiftError> {
    match value {
        Some(value) if value.trim().is_empty() => {
            Err(LiftError::InvalidConfig(format!("{field} must not be empty")))
        }
        Some(value) => Ok(value.trim().to_string()),
        None => Ok(default.to_string()),
    }
}

fn seconds(value: Option<u64>, default: u64, field: &str) -> Result<Duration, LiftError> {
    match value.unwrap_or(default) {
        0 => Err(LiftError::InvalidConfig(format!(
            "{field} must be greater than zero"
        ))),
        secs => Ok(Duration::from_secs(secs)),
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn defaults_fill_missing_fields() {
        let config = Config {
            data_dir: Some("/tmp/lifts".to_string()),
            ..Config::default()
        };

        let resolved = ConfigLoader::resolve_config(config).unwrap();
        assert_eq!(resolved.data_url, DEFAULT_DATA_URL);
        assert_eq!(resolved.csv_prefix, "openipf");
        assert_eq!(resolved.metrics_timeout, Duration::from_secs(300));
        assert_eq!(resolved.stream_threshold, 2 * 1024 * 1024 * 1024);
        assert_eq!(
            resolved.archive_path(),
            Utf8PathBuf::from("/tmp/lifts/openipf-latest.zip")
        );
        assert!(resolved.database_path().ends_with("db/openipf.db"));
    }

    #[test]
    fn unknown_schema_version_is_rejected() {
        let config = Config {
            schema_version: Some(2),
            data_dir: Some("/tmp/lifts".to_string()),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, LiftError::InvalidConfig(_));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config = Config {
            data_dir: Some("/tmp/lifts".to_string()),
            metrics_timeout_secs: Some(0),
            ..Config::default()
        };
        let err = ConfigLoader::resolve_config(config).unwrap_err();
        assert_matches!(err, LiftError::InvalidConfig(_));
    }
}
