//! One-way degrade from rendered to plain fetching.
//!
//! The current backend is an explicit [`FetchMode`] advanced by the pure
//! function [`next_mode`]. Once a fetcher is in [`FetchMode::Plain`] it never
//! goes back to rendering for the rest of the session.

use crate::error::FetchFailure;
use crate::fetcher::PageFetcher;
use crate::page::FetchedPage;
use crate::rendered::TAB_CLOSE_GRACE;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    Rendered { consecutive_failures: u32 },
    Plain,
}

impl FetchMode {
    pub fn is_plain(&self) -> bool {
        matches!(self, FetchMode::Plain)
    }
}

impl Default for FetchMode {
    fn default() -> Self {
        FetchMode::Rendered {
            consecutive_failures: 0,
        }
    }
}

/// Advance the mode after one rendered attempt.
///
/// `EnvironmentUnavailable` degrades immediately; any other failure counts
/// towards `threshold` consecutive failures; a success resets the count.
pub fn next_mode(mode: FetchMode, outcome: Result<(), &FetchFailure>, threshold: u32) -> FetchMode {
    let FetchMode::Rendered {
        consecutive_failures,
    } = mode
    else {
        return FetchMode::Plain;
    };

    match outcome {
        Ok(()) => FetchMode::Rendered {
            consecutive_failures: 0,
        },
        Err(FetchFailure::EnvironmentUnavailable(_)) => FetchMode::Plain,
        Err(_) => {
            let failures = consecutive_failures + 1;
            if failures >= threshold.max(1) {
                FetchMode::Plain
            } else {
                FetchMode::Rendered {
                    consecutive_failures: failures,
                }
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "cause")]
pub enum DegradeCause {
    EnvironmentUnavailable,
    RepeatedFailures { count: u32 },
}

/// Recorded when a fetcher switches to plain HTTP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallbackEvent {
    pub url: String,
    pub cause: DegradeCause,
    pub reason: String,
    /// Rendered attempts made before the switch, including the one that triggered it.
    pub rendered_attempts: usize,
}

/// Tries `primary` (rendered) and degrades permanently to `secondary` (plain).
pub struct FallbackFetcher<P, S> {
    primary: P,
    secondary: S,
    mode: FetchMode,
    threshold: u32,
    rendered_attempts: usize,
    event: Option<FallbackEvent>,
}

impl<P: PageFetcher, S: PageFetcher> FallbackFetcher<P, S> {
    pub fn new(primary: P, secondary: S, threshold: u32) -> Self {
        Self {
            primary,
            secondary,
            mode: FetchMode::default(),
            threshold,
            rendered_attempts: 0,
            event: None,
        }
    }

    pub fn mode(&self) -> FetchMode {
        self.mode
    }

    fn record_degrade(&mut self, url: &Url, previous: FetchMode, failure: &FetchFailure) {
        let cause = match failure {
            FetchFailure::EnvironmentUnavailable(_) => DegradeCause::EnvironmentUnavailable,
            _ => {
                let count = match previous {
                    FetchMode::Rendered {
                        consecutive_failures,
                    } => consecutive_failures + 1,
                    FetchMode::Plain => 0,
                };
                DegradeCause::RepeatedFailures { count }
            }
        };

        warn!(
            "Rendered fetch degraded to plain HTTP at {} ({})",
            url, failure
        );

        self.event = Some(FallbackEvent {
            url: url.to_string(),
            cause,
            reason: failure.to_string(),
            rendered_attempts: self.rendered_attempts,
        });
    }
}

#[async_trait]
impl<P: PageFetcher, S: PageFetcher> PageFetcher for FallbackFetcher<P, S> {
    async fn fetch(&mut self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchFailure> {
        if self.mode.is_plain() {
            return self.secondary.fetch(url, timeout).await;
        }

        self.rendered_attempts += 1;
        // A primary that overruns its own timeout still counts as a failure.
        let limit = timeout.saturating_add(TAB_CLOSE_GRACE);
        let outcome = match tokio::time::timeout(limit, self.primary.fetch(url, timeout)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(FetchFailure::Timeout(timeout)),
        };
        let previous = self.mode;
        self.mode = next_mode(previous, outcome.as_ref().map(|_| ()), self.threshold);

        match outcome {
            Ok(page) => Ok(page),
            Err(failure) if self.mode.is_plain() => {
                self.record_degrade(url, previous, &failure);
                // The current URL still deserves an answer.
                self.secondary.fetch(url, timeout).await
            }
            Err(failure) => {
                debug!("Rendered fetch failed for {}: {}", url, failure);
                Err(failure)
            }
        }
    }

    fn fallback_event(&self) -> Option<&FallbackEvent> {
        self.event.as_ref()
    }

    async fn shutdown(&mut self) {
        self.primary.shutdown().await;
        self.secondary.shutdown().await;
    }
}
