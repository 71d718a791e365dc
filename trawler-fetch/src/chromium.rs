//! Headless Chrome backend for [`RenderedFetcher`](crate::RenderedFetcher).
//!
//! The browser is launched lazily on the first tab request, so a missing
//! Chrome install surfaces as [`FetchFailure::EnvironmentUnavailable`] on the
//! first fetch rather than at construction time.

use crate::error::FetchFailure;
use crate::options::FetchOptions;
use crate::rendered::{RenderTab, RenderedDocument, Renderer};
use async_trait::async_trait;
use chromiumoxide::Page;
use chromiumoxide::browser::{Browser, BrowserConfig};
use futures::StreamExt;
use std::path::PathBuf;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use url::Url;

struct BrowserSession {
    browser: Browser,
    handler: JoinHandle<()>,
}

pub struct ChromiumRenderer {
    headless: bool,
    executable: Option<PathBuf>,
    user_agent: String,
    session: Option<BrowserSession>,
}

impl ChromiumRenderer {
    pub fn new(options: &FetchOptions) -> Self {
        Self {
            headless: options.headless,
            executable: options.browser_executable.clone(),
            user_agent: options.user_agent.clone(),
            session: None,
        }
    }

    async fn launch(&self) -> Result<BrowserSession, FetchFailure> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .arg("--disable-gpu")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", self.user_agent));
        if !self.headless {
            builder = builder.with_head();
        }
        if let Some(ref path) = self.executable {
            builder = builder.chrome_executable(path);
        }
        let config = builder
            .build()
            .map_err(FetchFailure::EnvironmentUnavailable)?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| FetchFailure::EnvironmentUnavailable(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if event.is_err() {
                    break;
                }
            }
        });

        info!("Launched headless browser");
        Ok(BrowserSession { browser, handler })
    }
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    type Tab = ChromiumTab;

    async fn open_tab(&mut self) -> Result<ChromiumTab, FetchFailure> {
        if self.session.is_none() {
            self.session = Some(self.launch().await?);
        }
        let Some(session) = self.session.as_ref() else {
            return Err(FetchFailure::EnvironmentUnavailable(
                "browser session missing".to_string(),
            ));
        };

        let opened = session.browser.new_page("about:blank").await;
        match opened {
            Ok(page) => Ok(ChromiumTab::new(page)),
            Err(e) => {
                // A browser that cannot open tabs has crashed; drop it.
                if let Some(dead) = self.session.take() {
                    dead.handler.abort();
                }
                Err(FetchFailure::EnvironmentUnavailable(e.to_string()))
            }
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.browser.close().await {
                warn!("Failed to close browser: {}", e);
            }
            if let Err(e) = session.browser.wait().await {
                warn!("Failed to reap browser process: {}", e);
            }
            session.handler.abort();
            debug!("Browser session released");
        }
    }
}

impl Drop for ChromiumRenderer {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            session.handler.abort();
        }
    }
}

/// Owns one chromiumoxide page; closes it on `close()` or, failing that, on drop.
pub struct ChromiumTab {
    page: Option<Page>,
    runtime: tokio::runtime::Handle,
}

impl ChromiumTab {
    fn new(page: Page) -> Self {
        Self {
            page: Some(page),
            runtime: tokio::runtime::Handle::current(),
        }
    }
}

#[async_trait]
impl RenderTab for ChromiumTab {
    async fn navigate(&mut self, url: &Url) -> Result<RenderedDocument, FetchFailure> {
        let Some(page) = self.page.as_ref() else {
            return Err(FetchFailure::EnvironmentUnavailable(
                "tab already closed".to_string(),
            ));
        };

        page.goto(url.as_str())
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?;
        page.wait_for_navigation()
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?;

        let html = page
            .content()
            .await
            .map_err(|e| FetchFailure::Network(e.to_string()))?;
        let final_url = page.url().await.ok().flatten();

        Ok(RenderedDocument { html, final_url })
    }

    async fn close(mut self) {
        if let Some(page) = self.page.take()
            && let Err(e) = page.close().await
        {
            warn!("Failed to close tab: {}", e);
        }
    }
}

impl Drop for ChromiumTab {
    fn drop(&mut self) {
        if let Some(page) = self.page.take() {
            self.runtime.spawn(async move {
                if let Err(e) = page.close().await {
                    warn!("Tab cleanup on drop failed: {}", e);
                } else {
                    trace!("Tab closed on drop");
                }
            });
        }
    }
}
