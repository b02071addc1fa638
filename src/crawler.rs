use colored::*;
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::fetcher::PageFetcher;
use crate::links::{extract_links, normalize_url};

/// Fallback discovery: walks the site's HTML looking for `?p=<id>` links.
pub struct Crawler {
    fetcher: PageFetcher,
}

impl Crawler {
    pub fn new(fetcher: PageFetcher) -> Self {
        Self { fetcher }
    }

    /// Breadth-first crawl from `start_url` until `max_posts` post links are
    /// known or there is nothing left to visit.
    ///
    /// Post links are collected, never visited. Other same-domain pages are
    /// queued only while the budget is not reached. Returns the posts sorted.
    pub async fn crawl(
        &self,
        start_url: &str,
        root_domain: &str,
        max_posts: usize,
        delay: Duration,
    ) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue: VecDeque<String> = VecDeque::from([normalize_url(start_url)]);
        let mut post_urls: BTreeSet<String> = BTreeSet::new();

        while post_urls.len() < max_posts {
            let Some(current_url) = queue.pop_front() else {
                break;
            };

            if !visited.insert(current_url.clone()) {
                continue;
            }

            info!("Fetching: {}", current_url.green());
            let html = self.fetcher.fetch_html(&current_url).await;

            if let Some(html) = html {
                match Url::parse(&current_url) {
                    Ok(base_url) => {
                        let links = extract_links(&html, &base_url, root_domain);
                        let before = post_urls.len();
                        post_urls.extend(links.posts);
                        debug!(
                            "{} new post links on {} ({} total)",
                            post_urls.len() - before,
                            current_url,
                            post_urls.len()
                        );

                        if post_urls.len() < max_posts {
                            queue.extend(
                                links
                                    .pages
                                    .into_iter()
                                    .filter(|page| !visited.contains(page)),
                            );
                        }
                    }
                    Err(e) => debug!("Not following links of {}: {}", current_url, e),
                }
            }

            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        info!(
            "Crawl finished: {} post URLs from {} pages",
            post_urls.len(),
            visited.len()
        );
        post_urls.into_iter().collect()
    }
}
