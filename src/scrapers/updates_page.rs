use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use tracing::info;
use url::Url;

use crate::config::Config;
use crate::error::FetchError;
use crate::models::UpdateLink;
use crate::parsers::extract_update_links;
use crate::scrapers::UpdateScraper;
use crate::utils::http::fetch_page;

pub struct UpdatesPageScraper {
    page_url: Url,
    link_pattern: Regex,
}

impl UpdatesPageScraper {
    pub fn new(page_url: &str, link_pattern: &str) -> Result<Self> {
        let page_url = Url::parse(page_url)
            .with_context(|| format!("Invalid page URL: {}", page_url))?;
        let link_pattern = Regex::new(link_pattern)
            .with_context(|| format!("Invalid link pattern: {}", link_pattern))?;

        Ok(Self {
            page_url,
            link_pattern,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.page_url, &config.link_pattern)
    }
}

#[async_trait]
impl UpdateScraper for UpdatesPageScraper {
    async fn fetch(&self, client: &Client) -> Result<String, FetchError> {
        info!("Fetching {}", self.page_url);
        fetch_page(client, self.page_url.as_str()).await
    }

    fn extract(&self, html: &str) -> Vec<UpdateLink> {
        let links = extract_update_links(html, &self.page_url, &self.link_pattern);
        info!("Found {} update links on {}", links.len(), self.page_url);
        links
    }

    fn page_url(&self) -> &str {
        self.page_url.as_str()
    }
}
