use crate::error::FetchFailure;
use crate::links::extract_links;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use url::Url;

static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("static selector"));
static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("static selector"));

/// Candidate containers for the main text, most specific first.
static MAIN_CONTENT_SELECTORS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    [
        "main",
        "article",
        "[role=\"main\"]",
        ".content",
        ".main-content",
        ".article-body",
        ".post-content",
        ".entry-content",
        ".page-content",
    ]
    .iter()
    .map(|css| Selector::parse(css).expect("static selector"))
    .collect()
});

/// Elements whose text is boilerplate or code rather than page content.
const SKIPPED_TAGS: &[&str] = &[
    "script", "style", "nav", "footer", "header", "aside", "iframe", "noscript", "template",
];

/// Text, title and links pulled out of one HTML document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPage {
    pub title: String,
    pub content: String,
    pub links: Vec<String>,
}

/// Turns raw HTML into a [`ParsedPage`], rejecting near-empty pages.
#[derive(Debug, Clone)]
pub struct PageParser {
    min_content_length: usize,
    max_content_chars: usize,
}

impl PageParser {
    pub fn new(min_content_length: usize, max_content_chars: usize) -> Self {
        Self {
            min_content_length,
            max_content_chars,
        }
    }

    pub fn parse(&self, html: &str, page_url: &Url) -> Result<ParsedPage, FetchFailure> {
        let document = Html::parse_document(html);

        let title = document
            .select(&TITLE_SELECTOR)
            .next()
            .map(|element| collapse_whitespace(&element.text().collect::<String>()))
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| page_url.to_string());

        let content = self.extract_content(&document);
        let length = content.chars().count();
        if length < self.min_content_length {
            return Err(FetchFailure::EmptyContent {
                length,
                minimum: self.min_content_length,
            });
        }

        let links = extract_links(&document, page_url);

        Ok(ParsedPage {
            title,
            content,
            links,
        })
    }

    fn extract_content(&self, document: &Html) -> String {
        let root = MAIN_CONTENT_SELECTORS
            .iter()
            .find_map(|selector| document.select(selector).next())
            .or_else(|| document.select(&BODY_SELECTOR).next());

        let Some(root) = root else {
            return String::new();
        };

        let mut raw = String::new();
        collect_text(root, &mut raw);

        collapse_whitespace(&raw)
            .chars()
            .take(self.max_content_chars)
            .collect()
    }
}

impl Default for PageParser {
    fn default() -> Self {
        Self::new(100, 5000)
    }
}

fn collect_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        if let Some(text) = child.value().as_text() {
            out.push_str(text);
            out.push(' ');
        } else if let Some(child_element) = ElementRef::wrap(child)
            && !SKIPPED_TAGS.contains(&child_element.value().name())
        {
            collect_text(child_element, out);
        }
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
