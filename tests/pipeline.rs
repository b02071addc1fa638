//! Render-and-merge runs with a fake PDF engine

mod common;

use async_trait::async_trait;
use common::{header, json, sample_pdf, TestServer};
use lopdf::Document;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;
use wp2pdf::config::parse_site;
use wp2pdf::{download, DownloadConfig, Downloader, Error, PdfRenderer, Result};

/// Writes a one-page PDF per URL, except for URLs it is told to fail on.
#[derive(Default)]
struct FakeRenderer {
    failing: HashSet<String>,
    calls: Mutex<Vec<String>>,
}

impl FakeRenderer {
    fn failing_on(urls: &[&str]) -> Self {
        Self {
            failing: urls.iter().map(|url| url.to_string()).collect(),
            ..Self::default()
        }
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PdfRenderer for FakeRenderer {
    async fn render(&self, url: &str, output: &Path) -> Result<()> {
        self.calls.lock().unwrap().push(url.to_string());

        if self.failing.contains(url) {
            return Err(Error::Render {
                url: url.to_string(),
                reason: "engine exited with 1".to_string(),
            });
        }

        std::fs::create_dir_all(output.parent().unwrap()).unwrap();
        std::fs::write(output, sample_pdf(url, 1)).unwrap();
        Ok(())
    }
}

fn urls() -> Vec<String> {
    vec![
        "https://blog.test/?p=10".to_string(),
        "https://blog.test/?p=20".to_string(),
        "https://blog.test/?p=30".to_string(),
    ]
}

#[test]
fn jobs_are_numbered_in_discovery_order() {
    let renderer = FakeRenderer::default();
    let downloader = Downloader::new(&renderer, "pdfs");

    let targets: Vec<_> = downloader
        .jobs(&urls())
        .into_iter()
        .map(|job| job.target)
        .collect();

    assert_eq!(
        targets,
        vec![
            Path::new("pdfs/0001-p-10.pdf"),
            Path::new("pdfs/0002-p-20.pdf"),
            Path::new("pdfs/0003-p-30.pdf"),
        ]
    );
}

#[tokio::test]
async fn existing_files_are_reused_without_rendering() {
    let temp = tempfile::tempdir().unwrap();
    let pdf_dir = temp.path().join("pdf");
    std::fs::create_dir_all(&pdf_dir).unwrap();
    std::fs::write(pdf_dir.join("0002-p-20.pdf"), sample_pdf("cached", 1)).unwrap();

    let renderer = FakeRenderer::default();
    let manifest = Downloader::new(&renderer, &pdf_dir)
        .render_all(&urls())
        .await;

    assert_eq!(
        renderer.calls(),
        vec!["https://blog.test/?p=10", "https://blog.test/?p=30"]
    );
    assert_eq!(
        manifest.paths,
        vec![
            pdf_dir.join("0001-p-10.pdf"),
            pdf_dir.join("0002-p-20.pdf"),
            pdf_dir.join("0003-p-30.pdf"),
        ]
    );
    assert_eq!((manifest.rendered, manifest.skipped), (2, 1));
}

#[tokio::test]
async fn failed_render_is_left_out_of_the_merge() {
    let temp = tempfile::tempdir().unwrap();
    let pdf_dir = temp.path().join("pdf");
    let output = temp.path().join("out").join("blog.pdf");

    let renderer = FakeRenderer::failing_on(&["https://blog.test/?p=20"]);
    let summary = Downloader::new(&renderer, &pdf_dir)
        .run(&urls(), &output)
        .await
        .unwrap();

    assert_eq!(
        summary.manifest.paths,
        vec![pdf_dir.join("0001-p-10.pdf"), pdf_dir.join("0003-p-30.pdf")]
    );
    assert_eq!(summary.manifest.failed, vec!["https://blog.test/?p=20"]);
    assert_eq!(summary.merged, Some((output.clone(), 2)));
    assert!(!pdf_dir.join("0002-p-20.pdf").exists());

    let merged = Document::load(&output).unwrap();
    assert_eq!(merged.get_pages().len(), 2);
}

#[tokio::test]
async fn rerun_only_renders_what_is_missing() {
    let temp = tempfile::tempdir().unwrap();
    let pdf_dir = temp.path().join("pdf");
    let output = temp.path().join("blog.pdf");

    let flaky = FakeRenderer::failing_on(&["https://blog.test/?p=20"]);
    Downloader::new(&flaky, &pdf_dir)
        .run(&urls(), &output)
        .await
        .unwrap();

    let healthy = FakeRenderer::default();
    let summary = Downloader::new(&healthy, &pdf_dir)
        .run(&urls(), &output)
        .await
        .unwrap();

    assert_eq!(healthy.calls(), vec!["https://blog.test/?p=20"]);
    assert_eq!(summary.manifest.paths.len(), 3);
    assert_eq!(Document::load(&output).unwrap().get_pages().len(), 3);
}

#[tokio::test]
async fn nothing_rendered_means_no_merge() {
    let temp = tempfile::tempdir().unwrap();
    let output = temp.path().join("blog.pdf");
    let all: Vec<&str> = vec![
        "https://blog.test/?p=10",
        "https://blog.test/?p=20",
        "https://blog.test/?p=30",
    ];

    let renderer = FakeRenderer::failing_on(&all);
    let summary = Downloader::new(&renderer, temp.path().join("pdf"))
        .run(&urls(), &output)
        .await
        .unwrap();

    assert!(summary.manifest.paths.is_empty());
    assert_eq!(summary.merged, None);
    assert!(!output.exists());
}

#[tokio::test]
async fn corrupt_cached_file_fails_the_merge() {
    let temp = tempfile::tempdir().unwrap();
    let pdf_dir = temp.path().join("pdf");
    std::fs::create_dir_all(&pdf_dir).unwrap();
    // Truncated output from an interrupted run still counts as done.
    std::fs::write(pdf_dir.join("0001-p-10.pdf"), b"%PDF-1.4\n").unwrap();

    let renderer = FakeRenderer::default();
    let err = Downloader::new(&renderer, &pdf_dir)
        .run(&urls(), &temp.path().join("blog.pdf"))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Merge(_)), "got {err:?}");
    assert_eq!(renderer.calls().len(), 2);
}

#[tokio::test]
async fn download_discovers_limits_renders_and_merges() {
    let server = TestServer::start(|_| {
        json(
            r#"[
                {"link":"https://blog.test/?p=3"},
                {"link":"https://blog.test/?p=2"},
                {"link":"https://blog.test/?p=1"}
            ]"#,
        )
        .with_header(header("X-WP-TotalPages", "1"))
    });
    let temp = tempfile::tempdir().unwrap();

    let mut config = DownloadConfig::new(parse_site(&server.base).unwrap());
    config.delay = std::time::Duration::ZERO;
    config.limit = Some(2);
    config.pdf_dir = temp.path().join("pdf");
    config.output = Some(temp.path().join("blog.pdf"));

    let renderer = FakeRenderer::default();
    let summary = download(&config, &renderer).await.unwrap();

    assert_eq!(
        renderer.calls(),
        vec!["https://blog.test/?p=3", "https://blog.test/?p=2"]
    );
    assert_eq!(
        summary.manifest.paths,
        vec![
            temp.path().join("pdf").join("0001-p-3.pdf"),
            temp.path().join("pdf").join("0002-p-2.pdf"),
        ]
    );
    assert_eq!(summary.merged, Some((temp.path().join("blog.pdf"), 2)));
}
