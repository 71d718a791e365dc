use crate::cancel::CancelToken;
use crate::config::CrawlConfig;
use crate::error::{CrawlError, Result};
use crate::graph::GraphMetrics;
use crate::model::{Node, NodeStatus};
use crate::scheduler::{ProgressCallback, StopReason, TraversalScheduler};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio::time::Instant;
use tracing::{info, warn};
use trawler_fetch::{FallbackEvent, PageFetcher, build_fetcher, normalize_url};
use url::Url;
use uuid::Uuid;

/// Run-level figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrawlMetrics {
    pub node_count: usize,
    pub success_count: usize,
    pub failure_count: usize,
    pub depth_histogram: BTreeMap<usize, usize>,
    pub fallback_triggered: bool,
    pub elapsed_seconds: f64,
}

/// Everything one crawl produced.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlReport {
    pub session_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub mode: String,
    pub seeds: Vec<String>,
    pub nodes: Vec<Node>,
    pub metrics: CrawlMetrics,
    pub graph: GraphMetrics,
    pub fallback: Option<FallbackEvent>,
    pub stop_reason: StopReason,
}

impl CrawlReport {
    pub fn fetched(&self) -> impl Iterator<Item = &Node> {
        self.nodes
            .iter()
            .filter(|node| node.status == NodeStatus::Fetched)
    }

    pub fn node_by_url(&self, url: &str) -> Option<&Node> {
        self.nodes.iter().find(|node| node.url == url)
    }

    /// True when nothing could be fetched at all.
    pub fn is_total_failure(&self) -> bool {
        self.metrics.node_count > 0 && self.metrics.success_count == 0
    }
}

/// One crawl run over a fetcher the session owns.
pub struct CrawlSession<F: PageFetcher> {
    id: Uuid,
    config: CrawlConfig,
    fetcher: F,
    cancel: CancelToken,
    progress: Option<ProgressCallback>,
}

impl CrawlSession<Box<dyn PageFetcher>> {
    /// Validate `config` and build the fetcher it describes.
    pub fn connect(config: CrawlConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = build_fetcher(&config.fetch)
            .map_err(|e| CrawlError::CrawlFailed(e.to_string()))?;
        Self::new(config, fetcher)
    }
}

impl<F: PageFetcher> CrawlSession<F> {
    pub fn new(config: CrawlConfig, fetcher: F) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            config,
            fetcher,
            cancel: CancelToken::new(),
            progress: None,
        })
    }

    pub fn with_progress(mut self, progress: ProgressCallback) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Handle for aborting the run from another task.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Crawl from `seeds`. The fetcher is shut down afterwards whatever happens.
    pub async fn run<I, S>(&mut self, seeds: I) -> Result<CrawlReport>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let seeds = match parse_seeds(seeds) {
            Ok(seeds) => seeds,
            Err(e) => {
                self.fetcher.shutdown().await;
                return Err(e);
            }
        };

        let started_at = Utc::now();
        let started = Instant::now();
        info!(
            "Session {} crawling {} seed(s) in {} mode",
            self.id,
            seeds.len(),
            self.config.mode
        );

        let mut scheduler = TraversalScheduler::new(&mut self.fetcher, &self.config)
            .with_cancel_token(self.cancel.clone());
        if let Some(ref progress) = self.progress {
            scheduler = scheduler.with_progress(progress.clone());
        }
        let stop_reason = scheduler.run(&seeds).await;
        let store = scheduler.into_store();

        let fallback = self.fetcher.fallback_event().cloned();
        self.fetcher.shutdown().await;
        let elapsed_seconds = started.elapsed().as_secs_f64();

        let graph = store.graph_metrics();
        let metrics = CrawlMetrics {
            node_count: graph.node_count,
            success_count: graph.fetched_count,
            failure_count: graph.failed_count,
            depth_histogram: graph.depth_histogram.clone(),
            fallback_triggered: fallback.is_some(),
            elapsed_seconds,
        };

        if metrics.node_count > 0 && metrics.success_count == 0 {
            warn!("Every fetch failed ({} node(s))", metrics.node_count);
        }
        info!(
            "Session {} finished: {} fetched, {} failed in {:.1}s",
            self.id, metrics.success_count, metrics.failure_count, elapsed_seconds
        );

        Ok(CrawlReport {
            session_id: self.id,
            started_at,
            mode: self.config.mode.to_string(),
            seeds: seeds.iter().map(Url::to_string).collect(),
            nodes: store.snapshot(),
            metrics,
            graph,
            fallback,
            stop_reason,
        })
    }
}

fn parse_seeds<I, S>(seeds: I) -> Result<Vec<Url>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parsed = Vec::new();
    for seed in seeds {
        let seed = seed.as_ref().trim();
        let url = normalize_url(seed)
            .map_err(|e| CrawlError::Configuration(format!("bad seed: {}", e)))?;
        if !parsed.contains(&url) {
            parsed.push(url);
        }
    }
    if parsed.is_empty() {
        return Err(CrawlError::Configuration(
            "at least one seed URL is required".to_string(),
        ));
    }
    Ok(parsed)
}
