use colored::*;
use reqwest::header::{self, HeaderMap, HeaderValue};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};

/// Desktop Chrome user agent. Some WordPress hosts answer plain HTTP clients
/// with 406 Not Acceptable.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
    AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const HTML_ACCEPT: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Builds a client that looks like a browser.
///
/// `referer` is sent with every request when given.
pub fn browser_client(
    accept: &'static str,
    accept_language: &'static str,
    referer: Option<&str>,
    timeout: Duration,
) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(header::ACCEPT, HeaderValue::from_static(accept));
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static(accept_language),
    );
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

    if let Some(referer) = referer {
        let value = HeaderValue::from_str(referer)
            .map_err(|e| Error::Config(format!("Invalid referer {referer:?}: {e}")))?;
        headers.insert(header::REFERER, value);
    }

    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(headers)
        .redirect(reqwest::redirect::Policy::limited(10))
        .build()
        .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))
}

/// Fetches HTML pages for the crawler.
#[derive(Debug, Clone)]
pub struct PageFetcher {
    client: reqwest::Client,
}

impl PageFetcher {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = browser_client(HTML_ACCEPT, "en-US,en;q=0.9", None, timeout)?;
        Ok(Self { client })
    }

    /// GET `url`, failing on transport errors and non-success statuses.
    pub async fn try_fetch(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|e| Error::network(url, e))?;

        let body = response.text().await.map_err(|e| Error::network(url, e))?;
        debug!("Fetched {} bytes from {}", body.len(), url);
        Ok(body)
    }

    /// Like [`PageFetcher::try_fetch`] but logs the failure and returns `None`.
    pub async fn fetch_html(&self, url: &str) -> Option<String> {
        match self.try_fetch(url).await {
            Ok(body) => Some(body),
            Err(e) => {
                warn!("[SKIP] Failed to fetch {} ({})", url.yellow(), e);
                None
            }
        }
    }
}
