use clap::ValueEnum;
use std::path::PathBuf;
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};
use crate::naming::merged_file_name;

pub const DEFAULT_PDF_DIR: &str = "data/intermediate/pdf";
pub const DEFAULT_OUTPUT_DIR: &str = "data/output";

/// How post URLs are discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Discovery {
    /// WordPress REST API (`wp/v2/posts`)
    Api,
    /// Breadth-first HTML crawl looking for `?p=<id>` links
    Crawl,
}

/// HTML-to-PDF engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Engine {
    Wkhtmltopdf,
    Chromium,
}

#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub site: Url,
    pub discovery: Discovery,
    /// Posts per REST page
    pub per_page: u32,
    /// Pause between requests, for politeness
    pub delay: Duration,
    /// Cap on REST pages requested
    pub max_pages: Option<u32>,
    /// Crawl stops once this many post URLs are known
    pub max_posts: usize,
    /// Crawl domain filter; the site host when unset
    pub root_domain: Option<String>,
    /// Render only the first N discovered URLs
    pub limit: Option<usize>,
    pub pdf_dir: PathBuf,
    /// Merged file; `data/output/<host>-full.pdf` when unset
    pub output: Option<PathBuf>,
    pub engine: Engine,
    pub engine_path: Option<PathBuf>,
    pub timeout: Duration,
}

impl DownloadConfig {
    pub fn new(site: Url) -> Self {
        Self {
            site,
            discovery: Discovery::Api,
            per_page: 100,
            delay: Duration::from_millis(200),
            max_pages: None,
            max_posts: 20,
            root_domain: None,
            limit: None,
            pdf_dir: PathBuf::from(DEFAULT_PDF_DIR),
            output: None,
            engine: Engine::Wkhtmltopdf,
            engine_path: None,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn root_domain(&self) -> Result<String> {
        match (&self.root_domain, self.site.host_str()) {
            (Some(domain), _) => Ok(domain.clone()),
            (None, Some(host)) => Ok(host.to_string()),
            (None, None) => Err(Error::Config(format!("Site {} has no host", self.site))),
        }
    }

    pub fn output_path(&self) -> PathBuf {
        self.output.clone().unwrap_or_else(|| {
            PathBuf::from(DEFAULT_OUTPUT_DIR).join(merged_file_name(&self.site))
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.per_page == 0 {
            return Err(Error::Config("per_page must be at least 1".to_string()));
        }
        if self.max_pages == Some(0) {
            return Err(Error::Config("max_pages must be at least 1".to_string()));
        }
        if self.max_posts == 0 {
            return Err(Error::Config("max_posts must be at least 1".to_string()));
        }
        if self.limit == Some(0) {
            return Err(Error::Config("limit must be at least 1".to_string()));
        }
        self.root_domain().map(|_| ())
    }
}

/// Parses the site URL, requiring http(s) and a trailing slash so relative
/// joins stay under the site path.
pub fn parse_site(site: &str) -> Result<Url> {
    let mut url =
        Url::parse(site.trim()).map_err(|e| Error::Config(format!("Invalid site URL {site:?}: {e}")))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(Error::Config(format!("Site URL must be http(s): {site}")));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}
