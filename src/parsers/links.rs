use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use std::collections::HashMap;
use url::Url;

use super::clean_text;
use crate::models::UpdateLink;

static ANCHOR_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static anchor selector is valid"));

/// Collect update links from a listing page.
///
/// Every anchor whose raw `href` matches `pattern` is resolved against
/// `base`; non-http(s) results are dropped. The result is deduplicated by
/// URL and keeps the position of each URL's first occurrence. A URL's
/// title is the first non-empty anchor text seen for it.
///
/// Markup that is empty or malformed simply yields fewer (or no) links.
pub fn extract_update_links(html: &str, base: &Url, pattern: &Regex) -> Vec<UpdateLink> {
    let document = Html::parse_document(html);

    let mut links: Vec<UpdateLink> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty() || !pattern.is_match(href) {
            continue;
        }

        let Ok(url) = base.join(href) else {
            continue;
        };
        if !matches!(url.scheme(), "http" | "https") {
            continue;
        }

        let title = clean_text(&anchor.text().collect::<String>());
        let url = url.to_string();

        match positions.get(&url) {
            Some(&index) => {
                if links[index].title.is_empty() && !title.is_empty() {
                    links[index].title = title;
                }
            }
            None => {
                positions.insert(url.clone(), links.len());
                links.push(UpdateLink::new(url, title));
            }
        }
    }

    links
}
