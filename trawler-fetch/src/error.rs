use std::time::Duration;
use thiserror::Error;

/// Why a single page could not be turned into a usable node.
///
/// Every variant is recoverable at the traversal level: the node is marked
/// failed and the crawl moves on to the next frontier entry.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("HTTP error status {0}")]
    HttpError(u16),

    #[error("rendering environment unavailable: {0}")]
    EnvironmentUnavailable(String),

    #[error("content too short ({length} < {minimum} chars)")]
    EmptyContent { length: usize, minimum: usize },

    #[error("network error: {0}")]
    Network(String),

    #[error("unsupported content type: {0}")]
    UnsupportedContent(String),
}

impl FetchFailure {
    /// Short, stable label used in node metadata and reports.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchFailure::Timeout(_) => "timeout",
            FetchFailure::HttpError(_) => "http_error",
            FetchFailure::EnvironmentUnavailable(_) => "environment_unavailable",
            FetchFailure::EmptyContent { .. } => "empty_content",
            FetchFailure::Network(_) => "network",
            FetchFailure::UnsupportedContent(_) => "unsupported_content",
        }
    }

    pub(crate) fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            FetchFailure::Timeout(timeout)
        } else if let Some(status) = error.status() {
            FetchFailure::HttpError(status.as_u16())
        } else {
            FetchFailure::Network(error.to_string())
        }
    }
}

/// A fetcher could not be built at all.
#[derive(Error, Debug)]
pub enum FetchSetupError {
    #[error("HTTP client construction failed: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("Invalid fetch option: {0}")]
    InvalidOption(String),
}

/// A URL was rejected before any request was made.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UrlError {
    #[error("Invalid URL '{url}': {reason}")]
    Invalid { url: String, reason: String },

    #[error("Unsupported scheme '{scheme}' in {url}")]
    UnsupportedScheme { url: String, scheme: String },
}

pub type Result<T> = std::result::Result<T, FetchFailure>;
