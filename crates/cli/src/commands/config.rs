//! Config command - configuration management

use anyhow::{Context, Result};
use std::path::PathBuf;
use tokio::fs;

use crate::args::{ConfigArgs, ConfigCommands};
use crate::config::AppConfig;

pub async fn execute(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Init { path, force } => init_config(path, force).await,
    }
}

async fn init_config(path: PathBuf, force: bool) -> Result<()> {
    if fs::try_exists(&path).await.unwrap_or(false) && !force {
        anyhow::bail!(
            "Config file already exists: {}. Use --force to overwrite.",
            path.display()
        );
    }

    let content = AppConfig::example_toml();

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(&path, content)
        .await
        .with_context(|| format!("Failed to write config file: {}", path.display()))?;

    println!("Created config file: {}", path.display());
    println!();
    println!("Next steps:");
    println!("  1. Edit the config file to set your feeds and Telegram channel");
    println!("  2. Export the API key and bot token env vars named in the file");
    println!("  3. Run 'courier doctor' to validate your setup");
    println!("  4. Run 'courier run --once --require-approval' to test");

    Ok(())
}
