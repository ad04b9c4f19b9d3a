//! `cubefetch config`: inspect the layered settings and create config files.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Subcommand;
use cubefetch_config::{ConfigLoader, FetchConfig};
use serde::Serialize;
use serde_json::Value;

use super::{load_config, resolve_dir};
use crate::GlobalOptions;

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the merged settings (defaults, global, local, flags)
    Show {
        /// Print JSON instead of TOML
        #[arg(long)]
        json: bool,
    },

    /// Print one setting by dotted key, e.g. `batch.batch_size`
    Get {
        key: String,

        /// Print the value as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the config files consulted for the working directory
    Path {
        #[arg(long)]
        json: bool,
    },

    /// Write a config file filled with defaults
    Init {
        /// Write ~/.cubefetch/config.toml rather than ./.cubefetch/config.toml
        #[arg(long)]
        global: bool,
    },
}

/// Where each config layer lives and whether it is present.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigPaths {
    pub global: Option<PathBuf>,
    pub global_exists: bool,
    pub local: PathBuf,
    pub local_exists: bool,
    /// Set when `--config` replaces both layers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub explicit: Option<PathBuf>,
}

pub async fn execute(cmd: ConfigCommand, global: GlobalOptions) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => show(json, &global),
        ConfigCommand::Get { key, json } => get(&key, json, &global),
        ConfigCommand::Path { json } => paths(json, &global),
        ConfigCommand::Init { global: home } => init(home, &global),
    }
}

fn show(json: bool, global: &GlobalOptions) -> Result<()> {
    let config = load_config(global)?;

    let rendered = if json {
        serde_json::to_string_pretty(&config)? + "\n"
    } else {
        toml::to_string_pretty(&config).context("Could not render settings as TOML")?
    };
    print!("{}", rendered);

    if let Err(e) = config.validate() {
        tracing::warn!("These settings will be rejected by fetch: {}", e);
    }
    Ok(())
}

fn get(key: &str, json: bool, global: &GlobalOptions) -> Result<()> {
    let config = load_config(global)?;
    let Some(value) = lookup(&config, key) else {
        bail!("Unknown configuration key: {}", key);
    };

    match value {
        Value::String(s) if !json => println!("{}", s),
        nested @ (Value::Object(_) | Value::Array(_)) => {
            println!("{}", serde_json::to_string_pretty(&nested)?)
        }
        scalar => println!("{}", scalar),
    }
    Ok(())
}

fn paths(json: bool, global: &GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let global_path = loader.global_config_path();
    let local = loader.local_config_path(&resolve_dir(global)?);

    let paths = ConfigPaths {
        global_exists: global_path.as_deref().is_some_and(|p| p.is_file()),
        global: global_path,
        local_exists: local.is_file(),
        local,
        explicit: global.config.clone(),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&paths)?);
        return Ok(());
    }

    match &paths.global {
        Some(path) => println!("global  {} [{}]", path.display(), presence(paths.global_exists)),
        None => println!("global  - [no home directory]"),
    }
    println!("local   {} [{}]", paths.local.display(), presence(paths.local_exists));
    if let Some(explicit) = &paths.explicit {
        println!("--config {} [replaces both]", explicit.display());
    }
    Ok(())
}

fn init(home: bool, global: &GlobalOptions) -> Result<()> {
    let loader = ConfigLoader::new();
    let path = if home {
        loader.init_global()
    } else {
        loader.init_local(&resolve_dir(global)?)
    }
    .context("Could not write default config")?;

    println!("Config file: {}", path.display());
    Ok(())
}

fn presence(exists: bool) -> &'static str {
    if exists {
        "present"
    } else {
        "missing"
    }
}

/// Walk `key` (`a.b.c`) through the JSON form of `config`.
fn lookup(config: &FetchConfig, key: &str) -> Option<Value> {
    let pointer = format!("/{}", key.replace('.', "/"));
    serde_json::to_value(config).ok()?.pointer(&pointer).cloned()
}
