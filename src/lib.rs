//! # wp2pdf
//!
//! A CLI utility to turn the posts of a WordPress blog into one PDF file.
//!
//! ## How it works
//!
//! - Post URLs come from the WordPress REST API, or from an HTML crawl
//!   looking for classic `?p=<id>` links
//! - Each post is rendered to its own PDF (`wkhtmltopdf` or headless Chromium)
//! - Rendered files are merged in discovery order
//!
//! Rendered files are kept, so a rerun only renders what is missing.
//!
//! ## Usage
//!
//! ```bash
//! wp2pdf download https://thomashealthblog.com --max-pages 1 --limit 10
//! ```

pub mod config;
pub mod crawler;
pub mod downloader;
pub mod error;
pub mod fetcher;
pub mod links;
pub mod naming;
pub mod pdf_merger;
pub mod renderer;
pub mod wp_api;

pub use config::{DownloadConfig, Discovery, Engine};
pub use crawler::Crawler;
pub use downloader::{download, discover, Downloader, RenderJob, RenderManifest, RunSummary};
pub use error::{Error, Result};
pub use fetcher::PageFetcher;
pub use pdf_merger::PdfMerger;
pub use renderer::{ChromiumRenderer, PdfRenderer, WkhtmltopdfRenderer};
pub use wp_api::WpApiClient;
