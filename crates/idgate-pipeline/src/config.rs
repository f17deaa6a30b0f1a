use idgate_core::CameraLens;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::sync::watch;

const DEFAULT_LIVENESS_THRESHOLD: f32 = 0.7;
const DEFAULT_IDENTIFY_THRESHOLD: f32 = 0.8;
const DEFAULT_LIVENESS_LEVEL: u8 = 0;

const ENV_LIVENESS_THRESHOLD: &str = "IDGATE_LIVENESS_THRESHOLD";
const ENV_IDENTIFY_THRESHOLD: &str = "IDGATE_IDENTIFY_THRESHOLD";
const ENV_LIVENESS_LEVEL: &str = "IDGATE_LIVENESS_LEVEL";
const ENV_CAMERA_LENS: &str = "IDGATE_CAMERA_LENS";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
    #[error("{key} must be within [0, 1], got {value}")]
    OutOfRange { key: &'static str, value: f32 },
}

/// Recognition settings, re-read at the start of every cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// A face must score strictly above this to reach template extraction.
    pub liveness_threshold: f32,
    /// The best gallery match must score strictly above this to be accepted.
    pub identify_threshold: f32,
    /// Liveness model level passed through to the analyzer.
    pub liveness_level: u8,
    pub camera_lens: CameraLens,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            liveness_threshold: DEFAULT_LIVENESS_THRESHOLD,
            identify_threshold: DEFAULT_IDENTIFY_THRESHOLD,
            liveness_level: DEFAULT_LIVENESS_LEVEL,
            camera_lens: CameraLens::default(),
        }
    }
}

impl PipelineConfig {
    /// Check both thresholds are finite and within [0, 1].
    pub fn validate(self) -> Result<Self, ConfigError> {
        for (key, value) in [
            ("liveness_threshold", self.liveness_threshold),
            ("identify_threshold", self.identify_threshold),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::OutOfRange { key, value });
            }
        }
        Ok(self)
    }

    /// Load from `IDGATE_*` environment variables; unset variables take defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from a key lookup (environment-variable names as keys).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            liveness_threshold: parse_var(&lookup, ENV_LIVENESS_THRESHOLD)?
                .unwrap_or(defaults.liveness_threshold),
            identify_threshold: parse_var(&lookup, ENV_IDENTIFY_THRESHOLD)?
                .unwrap_or(defaults.identify_threshold),
            liveness_level: parse_var(&lookup, ENV_LIVENESS_LEVEL)?
                .unwrap_or(defaults.liveness_level),
            camera_lens: parse_var(&lookup, ENV_CAMERA_LENS)?.unwrap_or(defaults.camera_lens),
        }
        .validate()
    }

    /// Parse a TOML document; missing keys take defaults.
    pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
        toml::from_str::<Self>(src)?.validate()
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let src = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&src)
    }
}

fn parse_var<F, T>(lookup: &F, key: &str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
    }
}

/// Where the pipeline reads its settings from.
///
/// Called once per cycle. An error makes the pipeline keep the last value
/// that loaded successfully.
pub trait ConfigSource: Send {
    fn load(&self) -> Result<PipelineConfig, ConfigError>;
}

/// A fixed configuration.
impl ConfigSource for PipelineConfig {
    fn load(&self) -> Result<PipelineConfig, ConfigError> {
        self.validate()
    }
}

/// Reads `IDGATE_*` environment variables on every load.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvConfigSource;

impl ConfigSource for EnvConfigSource {
    fn load(&self) -> Result<PipelineConfig, ConfigError> {
        PipelineConfig::from_env()
    }
}

/// Reads a TOML settings file on every load.
#[derive(Debug, Clone)]
pub struct FileConfigSource {
    path: PathBuf,
}

impl FileConfigSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ConfigSource for FileConfigSource {
    fn load(&self) -> Result<PipelineConfig, ConfigError> {
        PipelineConfig::from_file(&self.path)
    }
}

/// Settings pushed live by a settings screen or control plane.
#[derive(Debug, Clone)]
pub struct WatchConfigSource {
    rx: watch::Receiver<PipelineConfig>,
}

impl WatchConfigSource {
    /// Create a source seeded with `initial`, plus the sender used to update it.
    pub fn channel(initial: PipelineConfig) -> (watch::Sender<PipelineConfig>, Self) {
        let (tx, rx) = watch::channel(initial);
        (tx, Self { rx })
    }
}

impl ConfigSource for WatchConfigSource {
    fn load(&self) -> Result<PipelineConfig, ConfigError> {
        self.rx.borrow().validate()
    }
}
