use anyhow::Result;
use chrono::Local;
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

mod config;
mod discord;
mod error;
mod models;
mod parsers;
mod scrapers;
mod storage;
mod utils;
mod watcher;

use crate::config::Config;
use crate::discord::DiscordNotifier;
use crate::scrapers::{UpdateScraper, UpdatesPageScraper};
use crate::watcher::Watcher;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_logging()?;

    // Load configuration
    let config = Config::load()?;
    if config.webhooks.is_empty() {
        info!("No Discord webhook configured; a run with new links will fail");
    }

    let client = utils::http::create_client(&config)?;
    let scraper = UpdatesPageScraper::from_config(&config)?;
    info!("Watching {}", scraper.page_url());

    let store = storage::open_store(&config.state_path).await?;
    let notifier = DiscordNotifier::new(client.clone(), config.webhooks.clone())
        .with_delay(Duration::from_millis(config.notify_delay_ms));

    let watcher = Watcher::new(client, Box::new(scraper), store, Box::new(notifier));

    let Some(period) = config.check_interval_seconds else {
        // Single run for cron / CI schedulers; the exit status reports the outcome.
        let outcome = watcher.run_once().await?;
        info!("{}", outcome);
        return Ok(());
    };

    let mut ticker = interval(Duration::from_secs(period));
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;

        info!("--- Starting new check at {} ---", Local::now().format("%Y-%m-%d %H:%M:%S"));

        match watcher.run_once().await {
            Ok(outcome) => info!("{}", outcome),
            Err(e) => error!("Check failed: {}", e),
        }

        info!("Check completed, waiting {} seconds", period);
    }
}

fn init_logging() -> Result<()> {
    let filter = EnvFilter::from_default_env().add_directive("updates_watcher=info".parse()?);

    let json = std::env::var("LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    Ok(())
}
