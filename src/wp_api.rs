use colored::*;
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::fetcher::browser_client;

/// Response header carrying the number of pages of the posts collection.
pub const TOTAL_PAGES_HEADER: &str = "x-wp-totalpages";

const JSON_ACCEPT: &str = "application/json, text/plain, */*";

#[derive(Debug, Deserialize)]
struct WpPost {
    #[serde(default)]
    link: Option<String>,
}

/// Client for the `wp/v2/posts` route of the WordPress REST API.
///
/// Uses the `?rest_route=` form, which works even when pretty permalinks
/// (and therefore `/wp-json/`) are disabled.
pub struct WpApiClient {
    client: reqwest::Client,
    endpoint: String,
}

impl WpApiClient {
    pub fn new(site: &Url, timeout: Duration) -> Result<Self> {
        let endpoint = site
            .join("index.php")
            .map_err(|e| Error::Config(format!("Invalid site URL {site}: {e}")))?;
        let client = browser_client(
            JSON_ACCEPT,
            "en-US,en;q=0.9,id;q=0.8",
            Some(site.as_str()),
            timeout,
        )?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn page_url(&self, per_page: u32, page: u32) -> String {
        format!(
            "{}?rest_route=/wp/v2/posts&per_page={}&page={}",
            self.endpoint, per_page, page
        )
    }

    /// Requests page 1 and reads the total page count.
    ///
    /// A 406 here means the site blocks non-browser clients and is fatal.
    /// The links of page 1 are returned too so the caller need not ask again.
    pub async fn probe(&self, per_page: u32) -> Result<(u32, Vec<String>)> {
        let url = self.page_url(per_page, 1);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::network(&url, e))?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            return Err(Error::AccessDenied(
                "Got 406 Not Acceptable from server. The site blocks non-browser requests \
                 and may require additional anti-bot measures."
                    .to_string(),
            ));
        }

        let response = response
            .error_for_status()
            .map_err(|e| Error::network(&url, e))?;

        let total_pages = response
            .headers()
            .get(TOTAL_PAGES_HEADER)
            .ok_or_else(|| {
                Error::Protocol(
                    "Header X-WP-TotalPages not found. REST API may be restricted.".to_string(),
                )
            })?
            .to_str()
            .ok()
            .and_then(|value| value.trim().parse::<u32>().ok())
            .ok_or_else(|| Error::Protocol("Header X-WP-TotalPages is not a number".to_string()))?;

        let links = read_links(response, &url).await?;
        Ok((total_pages, links))
    }

    /// Collects the permalink of every post, oldest request first.
    ///
    /// `max_pages` caps the number of API pages requested. A 406 after the
    /// first page stops pagination but keeps what was already gathered.
    pub async fn fetch_post_links(
        &self,
        per_page: u32,
        delay: Duration,
        max_pages: Option<u32>,
    ) -> Result<Vec<String>> {
        let (reported_pages, mut links) = self.probe(per_page).await?;
        let total_pages = max_pages.map_or(reported_pages, |cap| reported_pages.min(cap));

        info!(
            "REST API reports {} pages, fetching {}",
            reported_pages, total_pages
        );
        if total_pages == 0 {
            return Ok(Vec::new());
        }
        debug!("Page 1: {} links", links.len());

        for page in 2..=total_pages {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let url = self.page_url(per_page, page);
            let response = self
                .client
                .get(&url)
                .send()
                .await
                .map_err(|e| Error::network(&url, e))?;

            if response.status() == StatusCode::NOT_ACCEPTABLE {
                warn!(
                    "[STOP] 406 Not Acceptable on page={}. Try increasing headers/delay.",
                    page
                );
                break;
            }

            let response = response
                .error_for_status()
                .map_err(|e| Error::network(&url, e))?;

            let page_links = read_links(response, &url).await?;
            debug!("Page {}: {} links", page, page_links.len());
            links.extend(page_links);
        }

        let unique = dedup_preserving_order(links);
        info!("Collected {} post URLs from {}", unique.len(), self.endpoint.green());
        Ok(unique)
    }
}

async fn read_links(response: reqwest::Response, url: &str) -> Result<Vec<String>> {
    let body = response.text().await.map_err(|e| Error::network(url, e))?;
    let posts: Vec<WpPost> = serde_json::from_str(&body)
        .map_err(|e| Error::Protocol(format!("Posts page {url} is not a JSON array: {e}")))?;

    Ok(posts
        .into_iter()
        .filter_map(|post| post.link)
        .filter(|link| !link.is_empty())
        .collect())
}

/// Removes repeated links, keeping the first occurrence.
pub fn dedup_preserving_order(links: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    links
        .into_iter()
        .filter(|link| seen.insert(link.clone()))
        .collect()
}
