use std::path::Path;

use anyhow::{Context, Result};
use prolog_facade::config::{self as facade_config, FacadeConfig};

/// Print the effective configuration, optionally saving it.
pub fn execute(config: &FacadeConfig, save: Option<&Path>) -> Result<()> {
    let rendered = toml::to_string_pretty(config).context("Failed to serialize config")?;
    print!("{}", rendered);

    if let Some(path) = save {
        facade_config::save(path, config)?;
        eprintln!("✓ Saved config to {}", path.display());
    }
    Ok(())
}
