// Shared fixtures: an in-memory site that answers fetches from a script.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trawler_core::{CrawlConfig, CrawlMode};
use trawler_fetch::{FetchFailure, FetchMethod, FetchedPage, PageFetcher};
use url::Url;

pub const HOST: &str = "https://site.test";

/// Absolute URL on the fake host.
pub fn u(path: &str) -> String {
    format!("{}{}", HOST, path)
}

#[derive(Clone)]
enum Outcome {
    Links(Vec<String>),
    Fail(FetchFailure),
    Hang,
}

/// Scripted [`PageFetcher`]. Unknown URLs answer 404.
#[derive(Clone)]
pub struct FakeSite {
    pages: HashMap<String, Outcome>,
    method: FetchMethod,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub shutdowns: Arc<Mutex<usize>>,
}

impl FakeSite {
    pub fn new() -> Self {
        Self {
            pages: HashMap::new(),
            method: FetchMethod::Plain,
            calls: Arc::new(Mutex::new(Vec::new())),
            shutdowns: Arc::new(Mutex::new(0)),
        }
    }

    /// A page at `path` linking to each of `links` (paths on the same host).
    pub fn page(mut self, path: &str, links: &[&str]) -> Self {
        let links = links.iter().map(|l| u(l)).collect();
        self.pages.insert(u(path), Outcome::Links(links));
        self
    }

    /// A page linking to arbitrary absolute URLs.
    pub fn page_abs(mut self, url: &str, links: &[&str]) -> Self {
        let links = links.iter().map(|l| l.to_string()).collect();
        self.pages.insert(url.to_string(), Outcome::Links(links));
        self
    }

    pub fn failing(mut self, path: &str, failure: FetchFailure) -> Self {
        self.pages.insert(u(path), Outcome::Fail(failure));
        self
    }

    pub fn hanging(mut self, path: &str) -> Self {
        self.pages.insert(u(path), Outcome::Hang);
        self
    }

    /// Paths fetched so far, in order.
    pub fn fetched_paths(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|url| url.trim_start_matches(HOST).to_string())
            .collect()
    }

    pub fn shutdown_count(&self) -> usize {
        *self.shutdowns.lock().unwrap()
    }
}

#[async_trait]
impl PageFetcher for FakeSite {
    async fn fetch(&mut self, url: &Url, _timeout: Duration) -> Result<FetchedPage, FetchFailure> {
        self.calls.lock().unwrap().push(url.to_string());

        match self.pages.get(url.as_str()).cloned() {
            Some(Outcome::Links(links)) => Ok(FetchedPage::new(url.as_str(), self.method)
                .with_title(format!("Title of {}", url.path()))
                .with_content(format!("Body text of {}", url))
                .with_links(links)
                .with_status(200)),
            Some(Outcome::Fail(failure)) => Err(failure),
            Some(Outcome::Hang) => {
                tokio::time::sleep(Duration::from_secs(86_400)).await;
                Err(FetchFailure::Network("woke up".to_string()))
            }
            None => Err(FetchFailure::HttpError(404)),
        }
    }

    async fn shutdown(&mut self) {
        *self.shutdowns.lock().unwrap() += 1;
    }
}

/// A config with no politeness delay.
pub fn config(max_depth: usize, max_pages: usize) -> CrawlConfig {
    CrawlConfig {
        max_depth,
        max_pages,
        delay_seconds: 0.0,
        timeout_seconds: 5.0,
        ..CrawlConfig::default()
    }
}

pub fn hybrid_config(
    max_depth: usize,
    max_pages: usize,
    seed_page_budget: usize,
    max_dfs_depth: usize,
) -> CrawlConfig {
    CrawlConfig {
        mode: CrawlMode::Hybrid {
            seed_page_budget,
            max_dfs_depth,
        },
        ..config(max_depth, max_pages)
    }
}

pub fn seed(path: &str) -> Vec<Url> {
    vec![Url::parse(&u(path)).unwrap()]
}
