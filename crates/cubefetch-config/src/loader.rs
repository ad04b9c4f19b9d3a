//! Config file discovery and layering.
//!
//! Layers, lowest precedence first:
//! 1. `~/.cubefetch/config.toml`
//! 2. `<dir>/.cubefetch/config.toml`
//! 3. [`ConfigOverrides`] from the command line
//!
//! A setting a layer leaves at its default never masks a lower layer.

use crate::error::{ConfigError, FileOp};
use crate::{BatchConfig, CacheConfig, ConfigOverrides, EndpointConfig, FetchConfig, LoggingConfig};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

const DOT_DIR: &str = ".cubefetch";
const FILE_NAME: &str = "config.toml";

/// Resolves a [`FetchConfig`] for a directory.
///
/// The parsed home-directory layer is kept after the first read.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    home_layer_dir: Option<PathBuf>,
    home_layer: Option<FetchConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Use `~/.cubefetch` for the global layer, when a home directory exists.
    pub fn new() -> Self {
        Self {
            home_layer_dir: dirs::home_dir().map(|home| home.join(DOT_DIR)),
            home_layer: None,
        }
    }

    /// Read the global layer from `dir` instead of the home directory.
    pub fn with_global_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            home_layer_dir: Some(dir.into()),
            home_layer: None,
        }
    }

    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.home_layer_dir.as_deref().map(|dir| dir.join(FILE_NAME))
    }

    pub fn local_config_path(&self, dir: &Path) -> PathBuf {
        dir.join(DOT_DIR).join(FILE_NAME)
    }

    /// Defaults, then the global layer, then the one under `dir`, then `overrides`.
    pub fn load(
        &mut self,
        dir: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<FetchConfig, ConfigError> {
        let layers = [self.load_global()?, self.load_local(dir)?];
        let mut config = layers
            .into_iter()
            .flatten()
            .fold(FetchConfig::default(), merge_configs);
        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
        }
        Ok(config)
    }

    /// Defaults, then the file at `path`, then `overrides`. The global and
    /// local layers are skipped.
    pub fn load_file(
        &self,
        path: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<FetchConfig, ConfigError> {
        debug!("Reading explicit config {}", path.display());
        let mut config = merge_configs(FetchConfig::default(), read_config(path)?);
        if let Some(overrides) = overrides {
            config.apply_overrides(overrides);
        }
        Ok(config)
    }

    /// The global layer on its own, `None` when there is no file.
    pub fn load_global(&mut self) -> Result<Option<FetchConfig>, ConfigError> {
        if self.home_layer.is_none() {
            let Some(path) = self.global_config_path() else {
                debug!("No home directory, global config layer skipped");
                return Ok(None);
            };
            self.home_layer = read_layer(&path)?;
        }
        Ok(self.home_layer.clone())
    }

    /// The layer under `dir` on its own, `None` when there is no file.
    pub fn load_local(&self, dir: &Path) -> Result<Option<FetchConfig>, ConfigError> {
        read_layer(&self.local_config_path(dir))
    }

    /// Write a default global config unless one exists. Returns its path.
    pub fn init_global(&self) -> Result<PathBuf, ConfigError> {
        let dir = self.home_layer_dir.as_deref().ok_or(ConfigError::NoHomeDir)?;
        write_default(dir)
    }

    /// Write a default config under `dir` unless one exists. Returns its path.
    pub fn init_local(&self, dir: &Path) -> Result<PathBuf, ConfigError> {
        write_default(&dir.join(DOT_DIR))
    }

    /// Drop the remembered global layer so the next load rereads it.
    pub fn clear_cache(&mut self) {
        self.home_layer = None;
    }
}

fn read_layer(path: &Path) -> Result<Option<FetchConfig>, ConfigError> {
    if !path.is_file() {
        trace!("No config layer at {}", path.display());
        return Ok(None);
    }
    debug!("Reading config layer {}", path.display());
    read_config(path).map(Some)
}

fn read_config(path: &Path) -> Result<FetchConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::io(FileOp::Read, path, e))?;
    toml::from_str(&text).map_err(|e| ConfigError::parse(path, e))
}

fn write_default(dir: &Path) -> Result<PathBuf, ConfigError> {
    std::fs::create_dir_all(dir).map_err(|e| ConfigError::io(FileOp::CreateDir, dir, e))?;

    let path = dir.join(FILE_NAME);
    if path.exists() {
        debug!("Keeping existing config {}", path.display());
        return Ok(path);
    }

    let text = toml::to_string_pretty(&FetchConfig::default())?;
    std::fs::write(&path, text).map_err(|e| ConfigError::io(FileOp::Write, &path, e))?;
    Ok(path)
}

/// `overlay` wins unless it still holds the default.
fn layered<T: PartialEq>(base: T, overlay: T, default: &T) -> T {
    if overlay == *default {
        base
    } else {
        overlay
    }
}

fn merge_configs(base: FetchConfig, overlay: FetchConfig) -> FetchConfig {
    FetchConfig {
        endpoint: merge_endpoint(base.endpoint, overlay.endpoint),
        batch: merge_batch(base.batch, overlay.batch),
        cache: merge_cache(base.cache, overlay.cache),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn merge_endpoint(base: EndpointConfig, overlay: EndpointConfig) -> EndpointConfig {
    let d = EndpointConfig::default();
    EndpointConfig {
        url: layered(base.url, overlay.url, &d.url),
        operation: layered(base.operation, overlay.operation, &d.operation),
        timeout_secs: layered(base.timeout_secs, overlay.timeout_secs, &d.timeout_secs),
        max_retries: layered(base.max_retries, overlay.max_retries, &d.max_retries),
        user_agent: overlay.user_agent.or(base.user_agent),
        auth: overlay.auth.or(base.auth),
    }
}

fn merge_batch(base: BatchConfig, overlay: BatchConfig) -> BatchConfig {
    let d = BatchConfig::default();
    BatchConfig {
        batch_size: layered(base.batch_size, overlay.batch_size, &d.batch_size),
        max_concurrent_batches: layered(
            base.max_concurrent_batches,
            overlay.max_concurrent_batches,
            &d.max_concurrent_batches,
        ),
        // opting out in any layer sticks
        coalesce: base.coalesce && overlay.coalesce,
    }
}

fn merge_cache(base: CacheConfig, overlay: CacheConfig) -> CacheConfig {
    let d = CacheConfig::default();
    CacheConfig {
        kind: layered(base.kind, overlay.kind, &d.kind),
        capacity: layered(base.capacity, overlay.capacity, &d.capacity),
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    let d = LoggingConfig::default();
    LoggingConfig {
        level: layered(base.level, overlay.level, &d.level),
        format: layered(base.format, overlay.format, &d.format),
    }
}
