//! `parley check-config` — load, validate, and print the effective config.

use anyhow::Context;
use parley_config::AppConfig;

pub fn run() -> anyhow::Result<()> {
    let path = AppConfig::default_path();
    let config = AppConfig::load().context("loading configuration")?;

    if path.exists() {
        println!("Config file: {}", path.display());
    } else {
        println!("Config file: {} (missing, using defaults)", path.display());
    }
    println!();
    print!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}
