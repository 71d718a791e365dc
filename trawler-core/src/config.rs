use crate::error::CrawlError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use trawler_fetch::FetchOptions;

pub const DEFAULT_MAX_DEPTH: usize = 2;
pub const DEFAULT_MAX_PAGES: usize = 50;
pub const DEFAULT_DELAY_SECONDS: f64 = 1.0;
pub const DEFAULT_TIMEOUT_SECONDS: f64 = 10.0;
pub const DEFAULT_SEED_PAGE_BUDGET: usize = 15;
pub const DEFAULT_MAX_DFS_DEPTH: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum CrawlMode {
    Bfs,
    /// Breadth-first seed phase followed by depth-first deepening.
    Hybrid {
        seed_page_budget: usize,
        max_dfs_depth: usize,
    },
}

impl CrawlMode {
    pub fn hybrid() -> Self {
        CrawlMode::Hybrid {
            seed_page_budget: DEFAULT_SEED_PAGE_BUDGET,
            max_dfs_depth: DEFAULT_MAX_DFS_DEPTH,
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "bfs" => Some(CrawlMode::Bfs),
            "hybrid" | "bfs-dfs" | "deep" => Some(CrawlMode::hybrid()),
            _ => None,
        }
    }
}

impl fmt::Display for CrawlMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrawlMode::Bfs => f.write_str("bfs"),
            CrawlMode::Hybrid { .. } => f.write_str("hybrid"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlConfig {
    pub max_depth: usize,
    pub max_pages: usize,
    /// Politeness pause between successive fetches.
    pub delay_seconds: f64,
    /// Per-fetch timeout.
    pub timeout_seconds: f64,
    pub mode: CrawlMode,
    pub max_links_per_page: Option<usize>,
    /// Wall-clock budget for the whole session.
    pub time_budget_seconds: Option<f64>,
    pub fetch: FetchOptions,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            max_pages: DEFAULT_MAX_PAGES,
            delay_seconds: DEFAULT_DELAY_SECONDS,
            timeout_seconds: DEFAULT_TIMEOUT_SECONDS,
            mode: CrawlMode::Bfs,
            max_links_per_page: None,
            time_budget_seconds: None,
            fetch: FetchOptions::default(),
        }
    }
}

impl CrawlConfig {
    pub fn validate(&self) -> Result<(), CrawlError> {
        if self.max_depth == 0 {
            return Err(invalid("max_depth must be at least 1"));
        }
        if self.max_pages == 0 {
            return Err(invalid("max_pages must be at least 1"));
        }
        if seconds(self.delay_seconds).is_none() {
            return Err(invalid("delay_seconds must be a non-negative number of seconds"));
        }
        if self.timeout_seconds <= 0.0 || seconds(self.timeout_seconds).is_none() {
            return Err(invalid("timeout_seconds must be a positive number of seconds"));
        }
        if let Some(budget) = self.time_budget_seconds
            && (budget <= 0.0 || seconds(budget).is_none())
        {
            return Err(invalid("time_budget_seconds must be a positive number of seconds"));
        }
        if self.max_links_per_page == Some(0) {
            return Err(invalid("max_links_per_page must be at least 1"));
        }
        if let CrawlMode::Hybrid {
            seed_page_budget,
            max_dfs_depth,
        } = self.mode
        {
            if seed_page_budget == 0 {
                return Err(invalid("seed_page_budget must be at least 1"));
            }
            if max_dfs_depth == 0 {
                return Err(invalid("max_dfs_depth must be at least 1"));
            }
        }
        if self.fetch.user_agent.trim().is_empty() {
            return Err(invalid("user agent must not be empty"));
        }
        Ok(())
    }

    // The accessors saturate; `validate` rejects anything they would clamp.

    pub fn delay(&self) -> Duration {
        seconds(self.delay_seconds).unwrap_or(Duration::ZERO)
    }

    pub fn timeout(&self) -> Duration {
        seconds(self.timeout_seconds).unwrap_or(Duration::MAX)
    }

    pub fn time_budget(&self) -> Option<Duration> {
        self.time_budget_seconds
            .map(|budget| seconds(budget).unwrap_or(Duration::MAX))
    }
}

/// `None` for negative, non-finite or out-of-range values.
fn seconds(value: f64) -> Option<Duration> {
    Duration::try_from_secs_f64(value).ok()
}

fn invalid(msg: &str) -> CrawlError {
    CrawlError::Configuration(msg.to_string())
}
