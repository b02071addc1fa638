use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::PrintToPdfParams;
use chromiumoxide::{Browser, BrowserConfig};
use colored::*;
use futures_util::StreamExt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::{Error, Result};

/// Turns one URL into one PDF file.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    async fn render(&self, url: &str, output: &Path) -> Result<()>;
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::io(parent, e))?;
    }
    Ok(())
}

/// Shells out to `wkhtmltopdf`.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    binary: PathBuf,
}

impl WkhtmltopdfRenderer {
    /// `binary` overrides the executable looked up on `PATH`.
    pub fn new(binary: Option<PathBuf>) -> Self {
        Self {
            binary: binary.unwrap_or_else(|| PathBuf::from("wkhtmltopdf")),
        }
    }

    pub fn args(url: &str, output: &Path) -> Vec<String> {
        vec![
            "--encoding".to_string(),
            "UTF-8".to_string(),
            "--quiet".to_string(),
            url.to_string(),
            output.display().to_string(),
        ]
    }
}

#[async_trait]
impl PdfRenderer for WkhtmltopdfRenderer {
    async fn render(&self, url: &str, output: &Path) -> Result<()> {
        ensure_parent(output).await?;

        let result = Command::new(&self.binary)
            .args(Self::args(url, output))
            .output()
            .await
            .map_err(|e| Error::Render {
                url: url.to_string(),
                reason: format!("could not run {}: {}", self.binary.display(), e),
            })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            return Err(Error::Render {
                url: url.to_string(),
                reason: format!(
                    "{} exited with {}: {}",
                    self.binary.display(),
                    result.status,
                    stderr.trim()
                ),
            });
        }

        debug!("wkhtmltopdf wrote {}", output.display());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct PdfOptions {
    pub scale: f64,
    pub margin_top: f64,
    pub margin_right: f64,
    pub margin_bottom: f64,
    pub margin_left: f64,
    pub print_background: bool,
}

impl Default for PdfOptions {
    fn default() -> Self {
        Self {
            scale: 0.75,
            margin_top: 0.4,
            margin_right: 0.4,
            margin_bottom: 0.4,
            margin_left: 0.4,
            print_background: true,
        }
    }
}

impl PdfOptions {
    fn to_params(&self) -> PrintToPdfParams {
        PrintToPdfParams {
            scale: Some(self.scale),
            margin_top: Some(self.margin_top),
            margin_right: Some(self.margin_right),
            margin_bottom: Some(self.margin_bottom),
            margin_left: Some(self.margin_left),
            print_background: Some(self.print_background),
            ..Default::default()
        }
    }
}

/// Prints pages through a headless Chromium over CDP.
///
/// Call [`ChromiumRenderer::close`] when done, otherwise the browser process
/// lingers until the handle is dropped.
pub struct ChromiumRenderer {
    browser: Browser,
    handler: JoinHandle<()>,
    pdf_options: PdfOptions,
}

impl ChromiumRenderer {
    pub async fn launch(executable: Option<PathBuf>) -> Result<Self> {
        let mut builder = BrowserConfig::builder().window_size(1920, 1080);
        if let Some(path) = executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create browser config: {e}")))?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(|e| Error::Render {
            url: "about:blank".to_string(),
            reason: format!("Failed to launch browser: {e}"),
        })?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(err) = event {
                    let err_str = err.to_string();
                    if !err_str.contains("data did not match any variant")
                        && !err_str.contains("untagged enum Message")
                    {
                        error!("Browser handler error: {}", err);
                    } else {
                        debug!("Chrome protocol message ignored: {}", err);
                    }
                }
            }
        });

        info!("Launched headless Chromium");
        Ok(Self {
            browser,
            handler,
            pdf_options: PdfOptions::default(),
        })
    }

    pub async fn close(mut self) {
        self.browser.close().await.ok();
        self.handler.abort();
    }
}

#[async_trait]
impl PdfRenderer for ChromiumRenderer {
    async fn render(&self, url: &str, output: &Path) -> Result<()> {
        let render_error = |reason: String| Error::Render {
            url: url.to_string(),
            reason,
        };

        ensure_parent(output).await?;

        let page = self
            .browser
            .new_page(url)
            .await
            .map_err(|e| render_error(format!("Failed to open page: {e}")))?;

        let printed: Result<Vec<u8>> = async {
            page.wait_for_navigation()
                .await
                .map_err(|e| render_error(format!("Failed to wait for navigation: {e}")))?;

            page.pdf(self.pdf_options.to_params())
                .await
                .map_err(|e| render_error(format!("Failed to print PDF: {e}")))
        }
        .await;

        // The tab is closed whether or not printing worked.
        page.close().await.ok();
        let pdf_data = printed?;

        fs::write(output, pdf_data)
            .await
            .map_err(|e| Error::io(output, e))?;

        debug!("Chromium wrote {}", output.display().to_string().blue());
        Ok(())
    }
}
