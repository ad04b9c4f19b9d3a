//! Subcommands and the config plumbing they share.

pub mod config;
pub mod fetch;

use std::path::PathBuf;

use anyhow::{Context, Result};
use cubefetch_config::{ConfigLoader, FetchConfig};

use crate::GlobalOptions;

/// Resolve the directory holding the local config.
pub fn resolve_dir(global: &GlobalOptions) -> Result<PathBuf> {
    match global.dir {
        Some(ref dir) => {
            if !dir.is_dir() {
                anyhow::bail!("Directory not found: {}", dir.display());
            }
            Ok(dir.clone())
        }
        None => std::env::current_dir().context("Failed to get current directory"),
    }
}

/// Settings for this invocation, with the global flags applied.
pub fn load_config(global: &GlobalOptions) -> Result<FetchConfig> {
    load_config_with(global, global.to_config_overrides())
}

/// Load configuration, applying `overrides` last.
pub fn load_config_with(
    global: &GlobalOptions,
    overrides: cubefetch_config::ConfigOverrides,
) -> Result<FetchConfig> {
    let mut loader = ConfigLoader::new();

    // An explicit file replaces the global -> local layering
    if let Some(ref config_path) = global.config {
        return loader
            .load_file(config_path, Some(&overrides))
            .with_context(|| format!("Failed to load config file {}", config_path.display()));
    }

    let dir = resolve_dir(global)?;
    loader
        .load(&dir, Some(&overrides))
        .with_context(|| format!("Could not load settings for {}", dir.display()))
}
