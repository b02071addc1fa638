use colored::*;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::{Discovery, DownloadConfig};
use crate::crawler::Crawler;
use crate::error::Result;
use crate::fetcher::PageFetcher;
use crate::naming::pdf_file_name;
use crate::pdf_merger::merge_pdfs;
use crate::renderer::PdfRenderer;
use crate::wp_api::WpApiClient;

/// One URL and the file it should be rendered into.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderJob {
    pub url: String,
    pub target: PathBuf,
}

/// What rendering produced, in discovery order.
#[derive(Debug, Default)]
pub struct RenderManifest {
    /// Files to merge: pre-existing and newly rendered
    pub paths: Vec<PathBuf>,
    pub rendered: usize,
    pub skipped: usize,
    /// URLs whose rendering failed
    pub failed: Vec<String>,
}

#[derive(Debug)]
pub struct RunSummary {
    pub manifest: RenderManifest,
    /// Merged file and its page count, if anything was merged
    pub merged: Option<(PathBuf, usize)>,
}

/// Finds post URLs with the configured discovery method.
///
/// Failures here are fatal: without URLs there is nothing to render.
pub async fn discover(config: &DownloadConfig) -> Result<Vec<String>> {
    let urls = match config.discovery {
        Discovery::Api => {
            let client = WpApiClient::new(&config.site, config.timeout)?;
            client
                .fetch_post_links(config.per_page, config.delay, config.max_pages)
                .await?
        }
        Discovery::Crawl => {
            let crawler = Crawler::new(PageFetcher::new(config.timeout)?);
            crawler
                .crawl(
                    config.site.as_str(),
                    &config.root_domain()?,
                    config.max_posts,
                    config.delay,
                )
                .await
        }
    };

    info!("Collected {} post URLs", urls.len());
    Ok(urls)
}

/// Renders posts one by one and merges the results.
pub struct Downloader<'a> {
    renderer: &'a dyn PdfRenderer,
    pdf_dir: PathBuf,
}

impl<'a> Downloader<'a> {
    pub fn new(renderer: &'a dyn PdfRenderer, pdf_dir: impl Into<PathBuf>) -> Self {
        Self {
            renderer,
            pdf_dir: pdf_dir.into(),
        }
    }

    pub fn jobs(&self, urls: &[String]) -> Vec<RenderJob> {
        urls.iter()
            .enumerate()
            .map(|(index, url)| RenderJob {
                url: url.clone(),
                target: self.pdf_dir.join(pdf_file_name(index + 1, url)),
            })
            .collect()
    }

    /// Renders every URL whose target file does not exist yet.
    ///
    /// A failed render is logged and left out; it never stops the batch.
    pub async fn render_all(&self, urls: &[String]) -> RenderManifest {
        let mut manifest = RenderManifest::default();
        let total = urls.len();

        for (index, job) in self.jobs(urls).into_iter().enumerate() {
            if job.target.exists() {
                info!("[SKIP] Exists: {}", job.target.display().to_string().blue());
                manifest.skipped += 1;
                manifest.paths.push(job.target);
                continue;
            }

            info!(
                "[{}/{}] Rendering: {} -> {}",
                index + 1,
                total,
                job.url.green(),
                job.target.display().to_string().blue()
            );

            match self.renderer.render(&job.url, &job.target).await {
                Ok(()) => {
                    manifest.rendered += 1;
                    manifest.paths.push(job.target);
                }
                Err(e) => {
                    warn!("[SKIP] Render failed for {}: {}", job.url.yellow(), e);
                    manifest.failed.push(job.url);
                }
            }
        }

        manifest
    }

    /// Renders `urls` then merges whatever exists into `output`.
    pub async fn run(&self, urls: &[String], output: &Path) -> Result<RunSummary> {
        let manifest = self.render_all(urls).await;

        if manifest.paths.is_empty() {
            info!("No PDFs generated. Skipping merge.");
            return Ok(RunSummary {
                manifest,
                merged: None,
            });
        }

        info!(
            "Merging {} PDFs -> {}",
            manifest.paths.len(),
            output.display().to_string().blue()
        );
        let pages = merge_pdfs(&manifest.paths, output).await?;

        Ok(RunSummary {
            manifest,
            merged: Some((output.to_path_buf(), pages)),
        })
    }
}

/// Discovery, rendering and merging as configured.
pub async fn download(config: &DownloadConfig, renderer: &dyn PdfRenderer) -> Result<RunSummary> {
    config.validate()?;

    let mut urls = discover(config).await?;
    if let Some(limit) = config.limit {
        if urls.len() > limit {
            info!("Rendering the first {} of {} URLs only.", limit, urls.len());
            urls.truncate(limit);
        }
    }

    Downloader::new(renderer, &config.pdf_dir)
        .run(&urls, &config.output_path())
        .await
}
