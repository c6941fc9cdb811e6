use anyhow::{Context, Result};
use onecrew_core::config::ChatConfig;
use onecrew_infrastructure::ConfigService;

pub fn show(config: &ChatConfig) -> Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

pub fn path(service: &ConfigService) {
    println!("{}", service.path().display());
}

fn render(config: &ChatConfig) -> Result<String> {
    toml::to_string_pretty(&config.redacted()).context("Failed to render configuration")
}
