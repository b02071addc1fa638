use anyhow::{bail, Result};
use clap::{Args as ClapArgs, Parser, Subcommand};
use colored::*;
use std::path::PathBuf;
use std::process;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use wp2pdf::config::{parse_site, DEFAULT_PDF_DIR};
use wp2pdf::pdf_merger::{collect_pdfs, merge_pdfs};
use wp2pdf::{
    discover, download, ChromiumRenderer, Discovery, DownloadConfig, Engine, RunSummary,
    WkhtmltopdfRenderer,
};

#[derive(Parser)]
#[command(name = "wp2pdf")]
#[command(about = "CLI utility to turn the posts of a WordPress blog into a single PDF for offline reading")]
#[command(version = "0.1.0")]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(ClapArgs)]
struct DiscoveryArgs {
    /// Root URL of the WordPress site
    site: String,

    /// Where post URLs come from
    #[arg(long = "discovery", value_enum, default_value = "api")]
    discovery: Discovery,

    /// Posts per REST API page
    #[arg(long = "per-page", default_value = "100", value_parser = clap::value_parser!(u32).range(1..=100))]
    per_page: u32,

    /// Pause between requests in seconds
    #[arg(long = "delay", default_value = "0.2", value_parser = parse_seconds)]
    delay: f64,

    /// Stop after this many REST API pages
    #[arg(long = "max-pages", value_parser = clap::value_parser!(u32).range(1..))]
    max_pages: Option<u32>,

    /// Crawl: stop once this many post URLs are known
    #[arg(long = "max-posts", default_value = "20", value_parser = clap::value_parser!(u64).range(1..))]
    max_posts: u64,

    /// Crawl: accept links whose host ends with this domain (defaults to the site host)
    #[arg(long = "root-domain")]
    root_domain: Option<String>,

    /// Request timeout in seconds
    #[arg(short = 't', long = "timeout", default_value = "30.0", value_parser = parse_seconds)]
    timeout: f64,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover posts, render each one to PDF and merge them (already rendered posts are reused)
    Download {
        #[command(flatten)]
        discovery: DiscoveryArgs,

        /// Render only the first N discovered posts
        #[arg(long = "limit", value_parser = clap::value_parser!(u64).range(1..))]
        limit: Option<u64>,

        /// Directory for the per-post PDFs
        #[arg(long = "pdf-dir", default_value = DEFAULT_PDF_DIR)]
        pdf_dir: PathBuf,

        /// Merged PDF path (defaults to data/output/<host>-full.pdf)
        #[arg(short = 'o', long = "output")]
        output: Option<PathBuf>,

        /// HTML-to-PDF engine
        #[arg(long = "engine", value_enum, default_value = "wkhtmltopdf")]
        engine: Engine,

        /// Path to the engine executable, if it is not on PATH
        #[arg(long = "engine-path")]
        engine_path: Option<PathBuf>,
    },
    /// Print the discovered post URLs, one per line
    Links {
        #[command(flatten)]
        discovery: DiscoveryArgs,
    },
    /// Merge existing PDF files into a single document
    Merge {
        /// Directory containing PDF files to merge
        #[arg(short = 'd', long = "dir", default_value = DEFAULT_PDF_DIR)]
        input_dir: PathBuf,

        /// Output file path for the merged PDF
        #[arg(short = 'o', long = "output", default_value = "merged.pdf")]
        output_file: PathBuf,
    },
}

fn parse_seconds(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|_| "Not a number.")?;
    if !value.is_finite() || value < 0.0 {
        return Err("Must be zero or positive number.".to_string());
    }
    Ok(value)
}

impl DiscoveryArgs {
    fn into_config(self) -> Result<DownloadConfig> {
        let mut config = DownloadConfig::new(parse_site(&self.site)?);
        config.discovery = self.discovery;
        config.per_page = self.per_page;
        config.delay = Duration::from_secs_f64(self.delay);
        config.max_pages = self.max_pages;
        config.max_posts = usize::try_from(self.max_posts)?;
        config.root_domain = self.root_domain;
        config.timeout = Duration::from_secs_f64(self.timeout);
        Ok(config)
    }
}

fn report(summary: &RunSummary) {
    let manifest = &summary.manifest;
    info!(
        "Rendered {}, reused {}, failed {}",
        manifest.rendered,
        manifest.skipped,
        manifest.failed.len()
    );
    for url in &manifest.failed {
        warn!("Not included: {}", url.yellow());
    }
    if let Some((path, pages)) = &summary.merged {
        info!(
            "{} ({} pages)",
            format!("DONE: {}", path.display()).green(),
            pages
        );
    }
}

async fn run_download(config: DownloadConfig) -> Result<()> {
    info!("Visiting \"{}\"", config.site.as_str().green());

    let summary = match config.engine {
        Engine::Wkhtmltopdf => {
            let renderer = WkhtmltopdfRenderer::new(config.engine_path.clone());
            download(&config, &renderer).await?
        }
        Engine::Chromium => {
            let renderer = ChromiumRenderer::launch(config.engine_path.clone()).await?;
            let result = download(&config, &renderer).await;
            renderer.close().await;
            result?
        }
    };

    report(&summary);
    Ok(())
}

async fn run_links(config: DownloadConfig) -> Result<()> {
    config.validate()?;
    for url in discover(&config).await? {
        println!("{url}");
    }
    Ok(())
}

async fn run_merge(input_dir: PathBuf, output_file: PathBuf) -> Result<()> {
    if !input_dir.exists() {
        bail!("Input directory '{}' does not exist", input_dir.display());
    }

    info!("Scanning directory: {}", input_dir.display().to_string().green());
    let pdf_files = collect_pdfs(&input_dir).await?;

    if pdf_files.is_empty() {
        bail!("No PDF files found in '{}'", input_dir.display());
    }

    info!("Found {} PDF files to merge:", pdf_files.len());
    for (i, path) in pdf_files.iter().enumerate() {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        info!("  {}: {}", i + 1, name.blue());
    }

    let pages = merge_pdfs(&pdf_files, &output_file).await?;

    info!(
        "Successfully merged {} PDFs ({} pages) into: {}",
        pdf_files.len(),
        pages,
        output_file.display().to_string().green()
    );

    Ok(())
}

async fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Download {
            discovery,
            limit,
            pdf_dir,
            output,
            engine,
            engine_path,
        } => {
            let mut config = discovery.into_config()?;
            config.limit = limit.map(usize::try_from).transpose()?;
            config.pdf_dir = pdf_dir;
            config.output = output;
            config.engine = engine;
            config.engine_path = engine_path;
            run_download(config).await
        }
        Commands::Links { discovery } => run_links(discovery.into_config()?).await,
        Commands::Merge {
            input_dir,
            output_file,
        } => run_merge(input_dir, output_file).await,
    }
}

#[tokio::main]
async fn main() {
    // Set up logging with chromiumoxide errors suppressed
    let filter = EnvFilter::from_default_env()
        .add_directive("chromiumoxide::conn=off".parse().unwrap())
        .add_directive("chromiumoxide::handler=off".parse().unwrap())
        .add_directive("wp2pdf=info".parse().unwrap());

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args.command).await {
        error!("{}", format!("Error: {}", e).red());
        process::exit(1);
    }
}
