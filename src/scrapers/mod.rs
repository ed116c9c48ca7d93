use async_trait::async_trait;
use reqwest::Client;

use crate::error::FetchError;
use crate::models::UpdateLink;

mod updates_page;

pub use updates_page::UpdatesPageScraper;

/// A listing page that announces update articles.
///
/// Fetching and extraction are separate steps so a failed fetch can be
/// told apart from a page that simply lists nothing.
#[async_trait]
pub trait UpdateScraper: Send + Sync {
    async fn fetch(&self, client: &Client) -> Result<String, FetchError>;
    fn extract(&self, html: &str) -> Vec<UpdateLink>;
    fn page_url(&self) -> &str;
}
