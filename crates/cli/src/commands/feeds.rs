//! Feeds command - inspect the stored feed list

use anyhow::{Context, Result};
use courier_domain::ArticleStore;

use super::open_store;
use crate::args::{FeedsArgs, FeedsCommands};
use crate::config::AppConfig;

pub async fn execute(args: FeedsArgs, config: AppConfig) -> Result<()> {
    match args.command {
        FeedsCommands::List { json } => list_feeds(&config, json).await,
    }
}

async fn list_feeds(config: &AppConfig, json: bool) -> Result<()> {
    let store = open_store(config).await?;
    let feeds = store.list_feeds().await.context("Failed to list feeds")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&feeds)?);
        return Ok(());
    }

    if feeds.is_empty() {
        println!("No feeds configured. Add [[feeds]] entries to the config file.");
        return Ok(());
    }

    println!("Feeds ({}):", feeds.len());
    println!();
    for feed in &feeds {
        println!("  [{}] {}", feed.id, feed.name);
        println!("      {}", feed.url);
    }

    Ok(())
}
