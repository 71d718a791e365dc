use crate::model::{NodeId, NodeStatus};
use thiserror::Error;

/// Contract violations inside the graph store.
///
/// The scheduler checks `has` before creating nodes, so none of these should
/// surface during a normal crawl.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GraphError {
    #[error("node {existing} already exists for {url}")]
    DuplicateUrl { url: String, existing: NodeId },

    #[error("node {id} is already {from}")]
    InvalidTransition { id: NodeId, from: NodeStatus },

    #[error("no such node: {0}")]
    UnknownNode(NodeId),

    #[error("node {child} was not discovered by {parent}")]
    InvalidLink { parent: NodeId, child: NodeId },
}

/// Session-level failures; the only errors a crawl returns to its caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CrawlError {
    #[error("invalid configuration: {0}")]
    Configuration(String),

    #[error("crawl failed: {0}")]
    CrawlFailed(String),
}

pub type Result<T> = std::result::Result<T, CrawlError>;
