use crate::error::{ModelError, ModelErrorExt};
use basis_logger::LoggingConfig;
use basis_storage::Compression;
use config::{Config, Environment, File};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tracing::info;

/// Prefix of environment overrides, e.g. `BASIS__STORAGE__SAVE_DIR`.
pub const ENV_PREFIX: &str = "BASIS";
const ENV_SEPARATOR: &str = "__";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct BasisConfig {
    pub storage: StorageConfig,
    pub logging: LoggingConfig,
}

impl BasisConfig {
    /// Loads the configuration from an optional file plus `BASIS__*` environment overrides.
    ///
    /// # Errors
    /// See [`load_config`].
    pub fn load(path: Option<&Path>) -> Result<Self, ModelError> {
        load_config(path)
    }
}

/// Where model files live and how they are written.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Read-only bootstrap files. A missing directory disables resource lookups.
    pub resource_dir: PathBuf,
    /// Save files; created on demand.
    pub save_dir: PathBuf,
    pub compression: CompressionMode,
    pub atomic_writes: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            resource_dir: PathBuf::from("resources"),
            save_dir: PathBuf::from("saves"),
            compression: CompressionMode::None,
            atomic_writes: true,
        }
    }
}

/// Compression applied to save files.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    #[default]
    None,
    Lz4,
}

impl From<CompressionMode> for Compression {
    fn from(mode: CompressionMode) -> Self {
        match mode {
            CompressionMode::None => Self::None,
            CompressionMode::Lz4 => Self::Lz4,
        }
    }
}

/// Layered configuration loader.
///
/// 1. **File**: `path`, when given, must exist. The format follows its extension
///    (`toml`, `json`, `yaml`, ...).
/// 2. **Environment**: variables prefixed with `BASIS__` override file values. Nested keys
///    use double underscores (`BASIS__STORAGE__ATOMIC_WRITES=false`).
///
/// Missing keys take their `Default` values when `T` uses `#[serde(default)]`.
///
/// # Errors
/// Returns [`ModelError::Config`] if the file is missing or unreadable, or if the merged
/// values do not deserialize into `T`.
///
/// # Example
/// ```rust
/// use basis_model::{BasisConfig, load_config};
///
/// let config: BasisConfig = load_config(None).unwrap();
/// assert!(config.storage.atomic_writes);
/// ```
pub fn load_config<T: DeserializeOwned>(path: Option<&Path>) -> Result<T, ModelError> {
    load_layered(path, environment())
}

fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .separator(ENV_SEPARATOR)
        .try_parsing(true)
}

fn load_layered<T: DeserializeOwned>(
    path: Option<&Path>,
    environment: Environment,
) -> Result<T, ModelError> {
    let mut builder = Config::builder();

    if let Some(path) = path {
        info!("Loading config from {}", path.display());
        builder = builder.add_source(File::from(path).required(true));
    }

    builder
        .add_source(environment)
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")
}
