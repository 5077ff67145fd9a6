//! `parley censor` — run the censorship transform over a string.

use anyhow::Context;
use parley_config::AppConfig;

pub fn run(text: &str, simple: bool) -> anyhow::Result<()> {
    let config = AppConfig::load().context("loading configuration")?;
    let censored = if simple || !config.censor.robust {
        parley_view::censor_simple(text)
    } else {
        parley_view::censor(text)
    };
    println!("{censored}");
    Ok(())
}
