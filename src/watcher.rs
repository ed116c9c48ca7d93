use reqwest::Client;
use std::fmt;
use tracing::{debug, error, info};

use crate::discord::Notifier;
use crate::error::WatchError;
use crate::models::UpdateLink;
use crate::scrapers::UpdateScraper;
use crate::storage::SeenStore;

/// Where a run currently is. `Error` absorbs any failed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    Fetching,
    Extracting,
    Diffing,
    Notifying,
    Persisting,
    Error,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Fetching => "fetching",
            Stage::Extracting => "extracting",
            Stage::Diffing => "diffing",
            Stage::Notifying => "notifying",
            Stage::Persisting => "persisting",
            Stage::Error => "error",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    NoNewLinks,
    Posted(Vec<UpdateLink>),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::NoNewLinks => write!(f, "No new links."),
            RunOutcome::Posted(links) => write!(f, "Posted {} new link(s).", links.len()),
        }
    }
}

/// One fetch → extract → diff → notify → persist pass over the listing page.
pub struct Watcher {
    client: Client,
    scraper: Box<dyn UpdateScraper>,
    store: Box<dyn SeenStore>,
    notifier: Box<dyn Notifier>,
}

impl Watcher {
    pub fn new(
        client: Client,
        scraper: Box<dyn UpdateScraper>,
        store: Box<dyn SeenStore>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        Self {
            client,
            scraper,
            store,
            notifier,
        }
    }

    #[cfg(test)]
    pub fn store(&self) -> &dyn SeenStore {
        self.store.as_ref()
    }

    /// Run every stage once.
    ///
    /// On any error the stored set is left exactly as it was loaded, so
    /// links that were not delivered are offered again on the next run.
    pub async fn run_once(&self) -> Result<RunOutcome, WatchError> {
        let mut stage = Stage::Idle;

        let result = self.run_stages(&mut stage).await;
        if let Err(e) = &result {
            error!("Run failed while {}: {}", stage, e);
            advance(&mut stage, Stage::Error);
        }

        result
    }

    async fn run_stages(&self, stage: &mut Stage) -> Result<RunOutcome, WatchError> {
        advance(stage, Stage::Fetching);
        let mut seen = self.store.load().await?;
        if seen.is_empty() {
            info!("No links seen yet; every link on the page counts as new");
        }
        let html = self.scraper.fetch(&self.client).await?;

        advance(stage, Stage::Extracting);
        let extracted = self.scraper.extract(&html);

        advance(stage, Stage::Diffing);
        let fresh = seen.unseen(&extracted);
        if fresh.is_empty() {
            advance(stage, Stage::Idle);
            return Ok(RunOutcome::NoNewLinks);
        }

        for link in &fresh {
            info!("New link: {}", link.url());
        }

        advance(stage, Stage::Notifying);
        self.notifier.notify(&fresh).await?;

        advance(stage, Stage::Persisting);
        seen.union(&fresh);
        self.store.save(&seen).await?;

        advance(stage, Stage::Idle);
        Ok(RunOutcome::Posted(fresh))
    }
}

fn advance(stage: &mut Stage, next: Stage) {
    debug!("{} -> {}", stage, next);
    *stage = next;
}
