//! URL canonicalization and outbound link discovery.
//!
//! Every URL that enters the graph goes through [`normalize_url`]: fragment
//! stripped, scheme restricted to HTTP(S), and a trailing slash removed from any
//! non-root path. The function is idempotent, so a URL that is already
//! normalized comes back unchanged.

use crate::error::UrlError;
use scraper::{Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::trace;
use url::Url;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href], area[href]").expect("static selector"));
static BASE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("base[href]").expect("static selector"));

/// Extensions of resources that never produce crawlable text.
const SKIPPED_EXTENSIONS: &[&str] = &[
    // documents
    ".pdf", ".doc", ".docx", ".xls", ".xlsx", ".ppt", ".pptx",
    // archives
    ".zip", ".rar", ".tar", ".gz", ".tgz", ".7z", ".bz2",
    // images
    ".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp", ".ico", ".bmp",
    // media
    ".mp3", ".mp4", ".avi", ".mov", ".webm", ".wav",
    // code and styling
    ".css", ".js", ".mjs", ".json", ".xml", ".woff", ".woff2", ".ttf",
];

/// Search result pages are never worth following.
const SEARCH_RESULT_PATTERNS: &[&str] = &[
    "google.com/search",
    "duckduckgo.com/?q=",
    "bing.com/search",
];

/// Parse and canonicalize an absolute HTTP(S) URL.
pub fn normalize_url(raw: &str) -> Result<Url, UrlError> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Invalid {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    canonicalize(url)
}

/// Same as [`normalize_url`] but returns the canonical string form.
pub fn normalize(raw: &str) -> Result<String, UrlError> {
    normalize_url(raw).map(String::from)
}

fn canonicalize(mut url: Url) -> Result<Url, UrlError> {
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(UrlError::UnsupportedScheme {
                url: url.to_string(),
                scheme: other.to_string(),
            });
        }
    }

    url.set_fragment(None);

    let path = url.path();
    if path.len() > 1 && path.ends_with('/') {
        let trimmed = path.trim_end_matches('/').to_string();
        if trimmed.is_empty() {
            url.set_path("/");
        } else {
            url.set_path(&trimmed);
        }
    }

    Ok(url)
}

/// Resolve `href` against `base` and keep it only if it is worth crawling.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    // Skip empty, javascript:, mailto:, tel:, etc.
    if href.is_empty()
        || href.starts_with('#')
        || href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    let resolved = base.join(href).ok()?;
    let url = canonicalize(resolved).ok()?;

    if is_skipped_resource(&url) || is_search_result(&url) {
        trace!("Discarding non-text link {}", url);
        return None;
    }

    Some(url)
}

fn is_skipped_resource(url: &Url) -> bool {
    let path = url.path().to_ascii_lowercase();
    SKIPPED_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
}

fn is_search_result(url: &Url) -> bool {
    let text = url.as_str();
    SEARCH_RESULT_PATTERNS.iter().any(|pattern| text.contains(pattern))
}

/// Collect the crawlable outbound links of a parsed document, in document
/// order and without duplicates.
pub fn extract_links(document: &Html, page_url: &Url) -> Vec<String> {
    let base = document
        .select(&BASE_SELECTOR)
        .next()
        .and_then(|element| element.value().attr("href"))
        .and_then(|href| page_url.join(href).ok())
        .unwrap_or_else(|| page_url.clone());

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&LINK_SELECTOR) {
        if let Some(href) = element.value().attr("href")
            && let Some(url) = resolve_link(&base, href)
        {
            let url = String::from(url);
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;

    fn links_of(html: &str, page: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        extract_links(&document, &Url::parse(page).unwrap())
    }

    #[test]
    fn test_normalize_strips_fragment_and_trailing_slash() {
        assert_eq!(
            normalize("https://Example.com/docs/#intro").unwrap(),
            "https://example.com/docs"
        );
        assert_eq!(normalize("https://example.com").unwrap(), "https://example.com/");
        assert_eq!(normalize("https://example.com/").unwrap(), "https://example.com/");
        assert_eq!(
            normalize("http://example.com:80/a//").unwrap(),
            "http://example.com/a"
        );
    }

    #[test]
    fn test_normalize_keeps_query() {
        assert_eq!(
            normalize("https://example.com/search/?q=rust#top").unwrap(),
            "https://example.com/search?q=rust"
        );
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let inputs = [
            "https://example.com",
            "https://example.com/a/b/",
            "HTTP://EXAMPLE.COM:80/x/?y=1#z",
            "https://example.com/%7Euser/",
            "https://example.com/a/../b/./c/",
            "https://example.com//",
        ];
        for input in inputs {
            let once = normalize(input).unwrap();
            let twice = normalize(&once).unwrap();
            assert_eq!(once, twice, "normalize not idempotent for {input}");
        }
    }

    #[test]
    fn test_normalize_rejects_non_http() {
        assert!(matches!(
            normalize("ftp://example.com/file"),
            Err(UrlError::UnsupportedScheme { .. })
        ));
        assert!(matches!(normalize("not a url"), Err(UrlError::Invalid { .. })));
    }

    #[test]
    fn test_extract_links_resolves_relative() {
        let links = links_of(
            r#"<a href="/about">About</a><a href="team/">Team</a><a href="https://other.org/x#y">X</a>"#,
            "https://example.com/company/index.html",
        );
        assert_eq!(
            links,
            vec![
                "https://example.com/about",
                "https://example.com/company/team",
                "https://other.org/x",
            ]
        );
    }

    #[test]
    fn test_extract_links_filters_schemes_and_resources() {
        let links = links_of(
            r##"
            <a href="mailto:me@example.com">mail</a>
            <a href="javascript:void(0)">js</a>
            <a href="#section">anchor</a>
            <a href="/logo.PNG">logo</a>
            <a href="/bundle.tar.gz">archive</a>
            <a href="/style.css">css</a>
            <a href="https://www.google.com/search?q=x">search</a>
            <a href="/article">article</a>
            "##,
            "https://example.com/",
        );
        assert_eq!(links, vec!["https://example.com/article"]);
    }

    #[test]
    fn test_extract_links_deduplicates_in_order() {
        let links = links_of(
            r#"<a href="/b">b</a><a href="/a">a</a><a href="/b/">b again</a><a href="/a#x">a again</a>"#,
            "https://example.com/",
        );
        assert_eq!(links, vec!["https://example.com/b", "https://example.com/a"]);
    }

    #[test]
    fn test_extract_links_honours_base_href() {
        let links = links_of(
            r#"<html><head><base href="https://cdn.example.com/docs/"></head>
               <body><a href="guide">Guide</a></body></html>"#,
            "https://example.com/",
        );
        assert_eq!(links, vec!["https://cdn.example.com/docs/guide"]);
    }
}
