//! Cooperative cancellation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tokio::sync::watch;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "detail")]
pub enum CancelReason {
    Aborted(String),
    DeadlineElapsed,
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CancelReason::Aborted(why) => write!(f, "aborted: {}", why),
            CancelReason::DeadlineElapsed => f.write_str("time budget elapsed"),
        }
    }
}

/// Shared abort signal. Clones observe the same state; the first reason wins.
#[derive(Debug, Clone)]
pub struct CancelToken {
    state: Arc<watch::Sender<Option<CancelReason>>>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            state: Arc::new(tx),
        }
    }

    pub fn cancel(&self, reason: CancelReason) {
        self.state.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    pub fn is_cancelled(&self) -> bool {
        self.state.borrow().is_some()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        self.state.borrow().clone()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        let mut rx = self.state.subscribe();
        // Only fails if the sender is gone, which `self` prevents.
        let _ = rx.wait_for(|reason| reason.is_some()).await;
    }
}
