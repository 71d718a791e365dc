use crate::error::FetchFailure;
use crate::fallback::FallbackEvent;
use crate::page::FetchedPage;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

/// Resolves a URL to page content plus outbound links.
///
/// Implementations only return data; they never see the crawl graph.
#[async_trait]
pub trait PageFetcher: Send {
    async fn fetch(&mut self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchFailure>;

    /// The degrade event, if this fetcher has fallen back from rendering.
    fn fallback_event(&self) -> Option<&FallbackEvent> {
        None
    }

    /// Release any held resources (browser sessions, connections).
    async fn shutdown(&mut self) {}
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for Box<F> {
    async fn fetch(&mut self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchFailure> {
        (**self).fetch(url, timeout).await
    }

    fn fallback_event(&self) -> Option<&FallbackEvent> {
        (**self).fallback_event()
    }

    async fn shutdown(&mut self) {
        (**self).shutdown().await
    }
}

/// Build the fetcher described by `options`.
///
/// With rendering enabled this is a [`FallbackFetcher`](crate::FallbackFetcher)
/// over the compiled-in browser backend and plain HTTP; otherwise plain HTTP alone.
pub fn build_fetcher(
    options: &crate::options::FetchOptions,
) -> Result<Box<dyn PageFetcher>, crate::error::FetchSetupError> {
    let plain = crate::plain::PlainFetcher::new(options)?;
    if !options.render {
        return Ok(Box::new(plain));
    }

    let renderer = crate::DefaultRenderer::new(options);
    let rendered = crate::rendered::RenderedFetcher::new(renderer, options);
    Ok(Box::new(crate::fallback::FallbackFetcher::new(
        rendered,
        plain,
        options.fallback_threshold,
    )))
}
