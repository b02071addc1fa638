use scraper::{Html, Selector};
use std::collections::{BTreeSet, HashSet};
use url::Url;

/// Query parameter carrying the numeric post id in classic WordPress links
/// (`https://example.com/?p=21654`).
pub const POST_ID_PARAM: &str = "p";

/// Links found on one crawled page, already normalized and domain filtered.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PageLinks {
    /// Post-shaped links
    pub posts: BTreeSet<String>,
    /// Other same-domain pages worth visiting, in document order
    pub pages: Vec<String>,
}

/// Whether the host of `url` ends with `root_domain`.
///
/// This is a suffix match on the host only (ports are ignored), so
/// `blog.example.com` and `notexample.com` both match `example.com`.
pub fn is_same_domain(url: &str, root_domain: &str) -> bool {
    Url::parse(url)
        .ok()
        .and_then(|parsed| parsed.host_str().map(|host| host.ends_with(root_domain)))
        .unwrap_or(false)
}

/// Strips the fragment and a single trailing slash.
pub fn normalize_url(url: &str) -> String {
    let without_fragment = url.split_once('#').map_or(url, |(head, _)| head);
    without_fragment
        .strip_suffix('/')
        .unwrap_or(without_fragment)
        .to_string()
}

/// Numeric post id from the `p` query parameter, if there is one.
///
/// Only the first non-empty `p` value is considered.
pub fn post_id(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let value = parsed
        .query_pairs()
        .find(|(key, value)| key == POST_ID_PARAM && !value.is_empty())
        .map(|(_, value)| value.into_owned())?;

    value.chars().all(|c| c.is_ascii_digit()).then_some(value)
}

/// Classic WordPress article link (`?p=<digits>`).
///
/// Sites using pretty permalinks never match.
pub fn is_post_url(url: &str) -> bool {
    post_id(url).is_some()
}

fn is_asset(url: &str) -> bool {
    Url::parse(url)
        .map(|parsed| parsed.path().contains("/wp-content/"))
        .unwrap_or(false)
}

/// Collects every `a[href]` on the page, resolved against `base_url`.
pub fn extract_links(html: &str, base_url: &Url, root_domain: &str) -> PageLinks {
    let mut links = PageLinks::default();

    let Ok(selector) = Selector::parse("a[href]") else {
        return links;
    };

    let document = Html::parse_document(html);
    let mut seen_pages = HashSet::new();

    for element in document.select(&selector) {
        let href = element.value().attr("href").unwrap_or_default().trim();
        if href.is_empty() {
            continue;
        }

        let Ok(joined) = base_url.join(href) else {
            continue;
        };
        let full_url = normalize_url(joined.as_str());

        if !is_same_domain(&full_url, root_domain) {
            continue;
        }

        if is_post_url(&full_url) {
            links.posts.insert(full_url);
        } else if !is_asset(&full_url) && seen_pages.insert(full_url.clone()) {
            links.pages.push(full_url);
        }
    }

    links
}
