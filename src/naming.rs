use url::Url;

use crate::links::post_id;

/// Upper bound on the length of a generated slug.
pub const MAX_SLUG_LEN: usize = 150;

/// Derives a stable, filesystem-safe name from a post URL.
///
/// Prefers the numeric post id (`p-21654`), falls back to the URL path
/// (`/2024/01/My Post/` becomes `2024-01-my-post`) and finally to `home`.
pub fn slugify_url(url: &str) -> String {
    let slug = match post_id(url) {
        Some(id) => format!("p-{id}"),
        None => slugify_path(url_path(url)),
    };

    slug.chars().take(MAX_SLUG_LEN).collect()
}

/// Path exactly as written in `url`, without percent-encoding it.
fn url_path(url: &str) -> &str {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();

    match without_query.split_once("://") {
        Some((_, rest)) => rest.find('/').map_or("", |start| &rest[start..]),
        // Not absolute: everything before the query is the path.
        None => without_query,
    }
}

fn slugify_path(path: &str) -> String {
    let mut slug = String::with_capacity(path.len());
    let mut in_separator_run = false;

    for c in path.trim_matches('/').chars() {
        if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
            slug.push(c.to_ascii_lowercase());
            in_separator_run = false;
        } else if !in_separator_run {
            slug.push('-');
            in_separator_run = true;
        }
    }

    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "home".to_string()
    } else {
        slug.to_string()
    }
}

/// File name for the `index`-th (1-based) post: `0007-p-21654.pdf`.
pub fn pdf_file_name(index: usize, url: &str) -> String {
    format!("{:04}-{}.pdf", index, slugify_url(url))
}

/// Default name of the merged document, derived from the site host.
pub fn merged_file_name(site: &Url) -> String {
    let host = site.host_str().unwrap_or("wordpress");
    format!("{}-full.pdf", slug::slugify(host))
}
