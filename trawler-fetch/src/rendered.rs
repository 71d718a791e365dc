//! Browser-rendered fetching.
//!
//! A [`Renderer`] owns the browser session; every fetch opens one
//! [`RenderTab`], navigates it, and closes it again whatever the outcome.
//! The browser session itself lives until [`PageFetcher::shutdown`].
//!
//! Opening and navigating share the fetch timeout, and closing gets
//! [`TAB_CLOSE_GRACE`], so a wedged browser still produces a failure the
//! caller can count.

use crate::content::PageParser;
use crate::error::FetchFailure;
use crate::fetcher::PageFetcher;
use crate::options::FetchOptions;
use crate::page::{FetchMethod, FetchedPage};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};
use url::Url;

/// Longest a rendered fetch waits for its tab to close.
pub const TAB_CLOSE_GRACE: Duration = Duration::from_secs(5);

/// The DOM of a page after scripts have run.
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub html: String,
    pub final_url: Option<String>,
}

/// A single browser tab, closed explicitly after each navigation.
#[async_trait]
pub trait RenderTab: Send {
    async fn navigate(&mut self, url: &Url) -> Result<RenderedDocument, FetchFailure>;

    async fn close(self);
}

/// A browser backend able to hand out tabs.
#[async_trait]
pub trait Renderer: Send {
    type Tab: RenderTab;

    /// Fails with [`FetchFailure::EnvironmentUnavailable`] when no browser can be used.
    async fn open_tab(&mut self) -> Result<Self::Tab, FetchFailure>;

    async fn shutdown(&mut self) {}
}

/// [`PageFetcher`] over a [`Renderer`].
pub struct RenderedFetcher<R> {
    renderer: R,
    parser: PageParser,
}

impl<R: Renderer> RenderedFetcher<R> {
    pub fn new(renderer: R, options: &FetchOptions) -> Self {
        Self {
            renderer,
            parser: PageParser::new(options.min_content_length, options.max_content_chars),
        }
    }
}

#[async_trait]
impl<R: Renderer> PageFetcher for RenderedFetcher<R> {
    async fn fetch(&mut self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchFailure> {
        debug!("Rendered fetch {}", url);

        let start = Instant::now();
        let mut tab = match tokio::time::timeout(timeout, self.renderer.open_tab()).await {
            Ok(opened) => opened?,
            Err(_) => return Err(FetchFailure::Timeout(timeout)),
        };
        let remaining = timeout.saturating_sub(start.elapsed());
        let navigated = tokio::time::timeout(remaining, tab.navigate(url)).await;
        if tokio::time::timeout(TAB_CLOSE_GRACE, tab.close()).await.is_err() {
            warn!("Tab for {} did not close within {:?}", url, TAB_CLOSE_GRACE);
        }

        let document = match navigated {
            Ok(result) => result?,
            Err(_) => return Err(FetchFailure::Timeout(timeout)),
        };
        let response_time = start.elapsed();

        let final_url = document
            .final_url
            .as_deref()
            .and_then(|u| Url::parse(u).ok())
            .unwrap_or_else(|| url.clone());
        let parsed = self.parser.parse(&document.html, &final_url)?;

        let mut page = FetchedPage::new(url.as_str(), FetchMethod::Rendered)
            .with_title(parsed.title)
            .with_content(parsed.content)
            .with_links(parsed.links);
        page.final_url = final_url.to_string();
        page.response_time = response_time;

        Ok(page)
    }

    async fn shutdown(&mut self) {
        self.renderer.shutdown().await;
    }
}

/// Stand-in used when the crate is built without a browser backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableRenderer;

impl UnavailableRenderer {
    pub fn new(_options: &FetchOptions) -> Self {
        UnavailableRenderer
    }
}

/// Uninhabited: [`UnavailableRenderer`] never opens a tab.
#[derive(Debug)]
pub enum NoTab {}

#[async_trait]
impl RenderTab for NoTab {
    async fn navigate(&mut self, _url: &Url) -> Result<RenderedDocument, FetchFailure> {
        match *self {}
    }

    async fn close(self) {
        match self {}
    }
}

#[async_trait]
impl Renderer for UnavailableRenderer {
    type Tab = NoTab;

    async fn open_tab(&mut self) -> Result<NoTab, FetchFailure> {
        Err(FetchFailure::EnvironmentUnavailable(
            "built without the `chromium` feature".to_string(),
        ))
    }
}
