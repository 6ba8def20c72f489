//! Show or persist the effective configuration.

use screenrec_common::config::{config_file_path, AppConfig};

pub fn run(config: &AppConfig, write_default: bool) -> anyhow::Result<()> {
    let path = config_file_path();
    println!("Config file: {}", path.display());
    if !path.exists() {
        println!("  (not found, using defaults)");
    }
    println!();
    println!("{}", serde_json::to_string_pretty(config)?);

    if write_default {
        let written = config.save()?;
        println!();
        println!("Configuration written to {}", written.display());
    }
    Ok(())
}
