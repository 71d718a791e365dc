//! Frontier management for both crawl modes.
//!
//! One fetch is in flight at a time. Every visit goes through the same
//! sequence: visited check, page budget, politeness delay, cancellation
//! check, node creation, fetch, record. The store is only ever written here.
//!
//! In the depth-first phase a parent's links are visited in document order
//! and each fetched child is pushed as it completes, so the *last* link of a
//! page is the first one expanded further.

use crate::cancel::{CancelReason, CancelToken};
use crate::config::{CrawlConfig, CrawlMode};
use crate::graph::GraphStore;
use crate::model::{Metadata, MetadataKey, NodeId, NodeStatus};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};
use trawler_fetch::{FetchFailure, FetchedPage, PageFetcher, TAB_CLOSE_GRACE, normalize_url};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrawlPhase {
    Breadth,
    Depth,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlPhase::Breadth => f.write_str("bfs"),
            CrawlPhase::Depth => f.write_str("dfs"),
        }
    }
}

/// Sent to the progress callback just before each fetch.
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    pub phase: CrawlPhase,
    pub url: String,
    pub depth: usize,
    /// Nodes created so far, including this one.
    pub pages: usize,
    pub max_pages: usize,
}

/// Callback for reporting crawl progress
pub type ProgressCallback = Arc<dyn Fn(CrawlProgress) + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason")]
pub enum StopReason {
    FrontierExhausted,
    PageBudgetExhausted,
    Cancelled { cause: CancelReason },
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::FrontierExhausted => f.write_str("frontier exhausted"),
            StopReason::PageBudgetExhausted => f.write_str("page budget exhausted"),
            StopReason::Cancelled { cause } => write!(f, "cancelled ({})", cause),
        }
    }
}

enum Visit {
    /// Already a node; nothing was fetched.
    Seen,
    Halted(StopReason),
    Done { id: NodeId, fetched: bool },
}

pub struct TraversalScheduler<'f, F: PageFetcher + ?Sized> {
    fetcher: &'f mut F,
    store: GraphStore,
    mode: CrawlMode,
    max_depth: usize,
    max_pages: usize,
    max_links_per_page: Option<usize>,
    delay: Duration,
    timeout: Duration,
    time_budget: Option<Duration>,
    deadline: Option<Instant>,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
    dispatched: usize,
}

impl<'f, F: PageFetcher + ?Sized> TraversalScheduler<'f, F> {
    /// `config` is assumed to be validated.
    pub fn new(fetcher: &'f mut F, config: &CrawlConfig) -> Self {
        Self {
            fetcher,
            store: GraphStore::new(),
            mode: config.mode,
            max_depth: config.max_depth,
            max_pages: config.max_pages,
            max_links_per_page: config.max_links_per_page,
            delay: config.delay(),
            timeout: config.timeout(),
            time_budget: config.time_budget(),
            deadline: None,
            cancel: CancelToken::new(),
            progress: None,
            dispatched: 0,
        }
    }

    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn store(&self) -> &GraphStore {
        &self.store
    }

    pub fn into_store(self) -> GraphStore {
        self.store
    }

    /// Crawl from `seeds` until the frontier empties, the budget runs out or
    /// the run is cancelled. Per-page failures never end the run.
    pub async fn run(&mut self, seeds: &[Url]) -> StopReason {
        self.deadline = self
            .time_budget
            .and_then(|budget| Instant::now().checked_add(budget));

        let reason = match self.mode {
            CrawlMode::Bfs => {
                info!("Starting BFS crawl from {} seed(s)", seeds.len());
                self.breadth_first(seeds, self.max_pages).await
            }
            CrawlMode::Hybrid {
                seed_page_budget,
                max_dfs_depth,
            } => self.hybrid(seeds, seed_page_budget, max_dfs_depth).await,
        };

        info!(
            "Crawl stopped after {} node(s): {}",
            self.store.len(),
            reason
        );
        reason
    }

    async fn breadth_first(&mut self, seeds: &[Url], budget: usize) -> StopReason {
        let mut frontier: VecDeque<(Url, usize, Option<NodeId>)> = VecDeque::new();
        let mut queued: HashSet<String> = HashSet::new();

        for seed in seeds {
            if queued.insert(seed.to_string()) {
                frontier.push_back((seed.clone(), 0, None));
            }
        }

        while let Some((url, depth, parent)) = frontier.pop_front() {
            let id = match self
                .visit(&url, depth, parent, CrawlPhase::Breadth, budget)
                .await
            {
                Visit::Seen => continue,
                Visit::Halted(reason) => return reason,
                Visit::Done { fetched: false, .. } => continue,
                Visit::Done { id, fetched: true } => id,
            };

            if depth + 1 > self.max_depth {
                continue;
            }

            for link in self.candidate_links(id) {
                if self.store.has(link.as_str()) || !queued.insert(link.to_string()) {
                    continue;
                }
                debug!("Enqueue {} at depth {}", link, depth + 1);
                frontier.push_back((link, depth + 1, Some(id)));
            }
        }

        StopReason::FrontierExhausted
    }

    async fn hybrid(
        &mut self,
        seeds: &[Url],
        seed_page_budget: usize,
        max_dfs_depth: usize,
    ) -> StopReason {
        let seed_budget = seed_page_budget.min(self.max_pages);
        info!(
            "Starting hybrid crawl: BFS seed phase of up to {} page(s)",
            seed_budget
        );

        match self.breadth_first(seeds, seed_budget).await {
            StopReason::Cancelled { cause } => return StopReason::Cancelled { cause },
            reason => debug!("Seed phase ended: {}", reason),
        }

        // Creation order, so the last seed-phase node is deepened first.
        let mut stack: Vec<(NodeId, usize)> = self
            .store
            .snapshot()
            .into_iter()
            .filter(|node| node.status == NodeStatus::Fetched)
            .map(|node| (node.id, 0))
            .collect();

        info!(
            "Starting DFS phase from {} node(s), max DFS depth {}",
            stack.len(),
            max_dfs_depth
        );

        while let Some((id, level)) = stack.pop() {
            if level >= max_dfs_depth {
                debug!("Backtrack from {} at DFS depth {}", id, level);
                continue;
            }
            let depth = match self.store.node(id) {
                Ok(node) => node.depth,
                Err(e) => {
                    error!("DFS stack held an unknown node: {}", e);
                    continue;
                }
            };

            for link in self.candidate_links(id) {
                match self
                    .visit(&link, depth + 1, Some(id), CrawlPhase::Depth, self.max_pages)
                    .await
                {
                    Visit::Seen => {}
                    Visit::Halted(reason) => return reason,
                    Visit::Done { id: child, fetched } => {
                        if fetched {
                            stack.push((child, level + 1));
                        }
                    }
                }
            }
        }

        StopReason::FrontierExhausted
    }

    /// Outbound links of a fetched node, normalized and capped.
    fn candidate_links(&self, id: NodeId) -> Vec<Url> {
        let Ok(node) = self.store.node(id) else {
            return Vec::new();
        };
        let limit = self.max_links_per_page.unwrap_or(usize::MAX);

        let mut seen = HashSet::new();
        node.outbound_links
            .iter()
            .filter_map(|link| normalize_url(link).ok())
            .filter(|link| seen.insert(link.to_string()))
            .take(limit)
            .collect()
    }

    async fn visit(
        &mut self,
        url: &Url,
        depth: usize,
        parent: Option<NodeId>,
        phase: CrawlPhase,
        budget: usize,
    ) -> Visit {
        if self.store.has(url.as_str()) {
            return Visit::Seen;
        }
        if self.store.len() >= budget {
            return Visit::Halted(StopReason::PageBudgetExhausted);
        }
        if let Some(cause) = self.wait_turn().await {
            return Visit::Halted(StopReason::Cancelled { cause });
        }

        let id = match self.store.create_node(url.as_str(), depth, parent) {
            Ok(id) => id,
            Err(e) => {
                error!("Node creation failed for {}: {}", url, e);
                return Visit::Seen;
            }
        };
        if let Some(parent) = parent
            && let Err(e) = self.store.link_child(parent, id)
        {
            error!("Could not link {} under {}: {}", id, parent, e);
        }

        if let Some(ref progress) = self.progress {
            progress(CrawlProgress {
                phase,
                url: url.to_string(),
                depth,
                pages: self.store.len(),
                max_pages: self.max_pages,
            });
        }

        debug!("[{}] Fetching {} (depth {})", phase, url, depth);
        self.dispatched += 1;
        let started = Instant::now();
        let outcome = self.fetch(url).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        let recorded = match outcome {
            Ok(page) => {
                let metadata = page_metadata(&page, elapsed_ms);
                self.store
                    .mark_fetched(id, page.title, page.content, page.links, metadata)
                    .map(|_| true)
            }
            Err(failure) => {
                warn!("Failed to fetch {}: {}", url, failure);
                let metadata = Metadata::new()
                    .with(MetadataKey::FetchDurationMs, elapsed_ms)
                    .with(MetadataKey::FailureKind, failure.kind());
                let metadata = match &failure {
                    FetchFailure::HttpError(status) => {
                        metadata.with(MetadataKey::HttpStatus, *status)
                    }
                    _ => metadata,
                };
                self.store
                    .mark_failed(id, failure.to_string(), metadata)
                    .map(|_| false)
            }
        };

        match recorded {
            Ok(fetched) => Visit::Done { id, fetched },
            Err(e) => {
                error!("Could not record result for {}: {}", url, e);
                Visit::Done { id, fetched: false }
            }
        }
    }

    async fn fetch(&mut self, url: &Url) -> Result<FetchedPage, FetchFailure> {
        // A degrading fetcher may spend one timeout on each backend plus a tab close.
        let guard = self
            .timeout
            .saturating_mul(2)
            .saturating_add(TAB_CLOSE_GRACE);
        match tokio::time::timeout(guard, self.fetcher.fetch(url, self.timeout)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchFailure::Timeout(self.timeout)),
        }
    }

    /// Politeness delay, then the cancellation check. Returns the cancel
    /// reason if the next fetch must not be dispatched.
    async fn wait_turn(&self) -> Option<CancelReason> {
        if let Some(cause) = self.check_cancelled() {
            return Some(cause);
        }

        if self.dispatched > 0 && !self.delay.is_zero() {
            let deadline = self.deadline;
            tokio::select! {
                _ = tokio::time::sleep(self.delay) => {}
                _ = self.cancel.cancelled() => {}
                _ = async move {
                    match deadline {
                        Some(at) => tokio::time::sleep_until(at).await,
                        None => std::future::pending::<()>().await,
                    }
                } => {}
            }
        }

        self.check_cancelled()
    }

    fn check_cancelled(&self) -> Option<CancelReason> {
        if let Some(deadline) = self.deadline
            && Instant::now() >= deadline
        {
            self.cancel.cancel(CancelReason::DeadlineElapsed);
        }
        self.cancel.reason()
    }
}

fn page_metadata(page: &FetchedPage, elapsed_ms: u64) -> Metadata {
    let mut metadata = Metadata::new()
        .with(MetadataKey::FetchDurationMs, elapsed_ms)
        .with(MetadataKey::ContentLength, page.content_length)
        .with(MetadataKey::LinkCount, page.links.len())
        .with(MetadataKey::FetchMethod, page.method.as_str());
    if let Some(status) = page.status_code {
        metadata.insert(MetadataKey::HttpStatus, status);
    }
    if page.final_url != page.url {
        metadata.insert(MetadataKey::FinalUrl, page.final_url.clone());
    }
    metadata
}
