//! Arena storage for crawled nodes.
//!
//! Nodes live in a petgraph [`DiGraph`] and refer to each other only by
//! [`NodeId`]; edges are parent/child id pairs. The URL index makes
//! `create_node` an atomic check-and-create.

use crate::error::GraphError;
use crate::model::{Metadata, MetadataKey, Node, NodeId, NodeStatus};
use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphMetrics {
    pub node_count: usize,
    pub edge_count: usize,
    pub depth_histogram: BTreeMap<usize, usize>,
    /// Fetched nodes over all nodes, in `0.0..=1.0`.
    pub success_rate: f64,
    pub avg_out_degree: f64,
    pub fetched_count: usize,
    pub failed_count: usize,
    pub pending_count: usize,
    pub root_count: usize,
    pub leaf_count: usize,
    pub max_depth: usize,
    pub avg_links_per_fetched: f64,
    pub unique_domains: usize,
}

#[derive(Debug, Default)]
pub struct GraphStore {
    graph: DiGraph<Node, ()>,
    by_url: HashMap<String, NodeId>,
}

impl GraphStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a pending node for `url`.
    ///
    /// `url` is expected to be normalized already; the store keys on it verbatim.
    pub fn create_node(
        &mut self,
        url: &str,
        depth: usize,
        parent_id: Option<NodeId>,
    ) -> Result<NodeId, GraphError> {
        if let Some(existing) = self.by_url.get(url) {
            return Err(GraphError::DuplicateUrl {
                url: url.to_string(),
                existing: *existing,
            });
        }
        if let Some(parent) = parent_id {
            self.node(parent)?;
        }

        let id = NodeId(self.graph.node_count());
        let index = self
            .graph
            .add_node(Node::pending(id, url.to_string(), depth, parent_id));
        debug_assert_eq!(index.index(), id.0);

        self.by_url.insert(url.to_string(), id);
        Ok(id)
    }

    pub fn has(&self, url: &str) -> bool {
        self.by_url.contains_key(url)
    }

    pub fn lookup(&self, url: &str) -> Option<NodeId> {
        self.by_url.get(url).copied()
    }

    pub fn node(&self, id: NodeId) -> Result<&Node, GraphError> {
        self.graph
            .node_weight(NodeIndex::new(id.0))
            .ok_or(GraphError::UnknownNode(id))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        self.graph
            .node_weight_mut(NodeIndex::new(id.0))
            .ok_or(GraphError::UnknownNode(id))
    }

    fn pending_mut(&mut self, id: NodeId) -> Result<&mut Node, GraphError> {
        let node = self.node_mut(id)?;
        if node.status != NodeStatus::Pending {
            return Err(GraphError::InvalidTransition {
                id,
                from: node.status,
            });
        }
        Ok(node)
    }

    pub fn mark_fetched(
        &mut self,
        id: NodeId,
        title: String,
        content: String,
        outbound_links: Vec<String>,
        metadata: Metadata,
    ) -> Result<(), GraphError> {
        let node = self.pending_mut(id)?;
        node.title = title;
        node.content = content;
        node.outbound_links = outbound_links;
        node.metadata.extend(metadata);
        node.status = NodeStatus::Fetched;
        Ok(())
    }

    /// `reason` is stored under [`MetadataKey::FailureReason`].
    pub fn mark_failed(
        &mut self,
        id: NodeId,
        reason: impl Into<String>,
        metadata: Metadata,
    ) -> Result<(), GraphError> {
        let node = self.pending_mut(id)?;
        node.metadata.extend(metadata);
        node.metadata
            .insert(MetadataKey::FailureReason, reason.into());
        node.status = NodeStatus::Failed;
        Ok(())
    }

    /// Record `child_id` under `parent_id`. Repeating the call is a no-op.
    pub fn link_child(&mut self, parent_id: NodeId, child_id: NodeId) -> Result<(), GraphError> {
        let child_parent = self.node(child_id)?.parent_id;
        if child_parent != Some(parent_id) {
            return Err(GraphError::InvalidLink {
                parent: parent_id,
                child: child_id,
            });
        }

        let parent = self.node_mut(parent_id)?;
        if parent.child_ids.contains(&child_id) {
            return Ok(());
        }
        parent.child_ids.push(child_id);
        self.graph
            .add_edge(NodeIndex::new(parent_id.0), NodeIndex::new(child_id.0), ());
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    /// Owned copy of every node, in creation order.
    pub fn snapshot(&self) -> Vec<Node> {
        self.graph.node_weights().cloned().collect()
    }

    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|e| (NodeId(e.source().index()), NodeId(e.target().index())))
            .collect()
    }

    pub fn graph_metrics(&self) -> GraphMetrics {
        let node_count = self.graph.node_count();
        let edge_count = self.graph.edge_count();

        let mut metrics = GraphMetrics {
            node_count,
            edge_count,
            ..GraphMetrics::default()
        };

        let mut domains = HashSet::new();
        let mut fetched_links = 0usize;

        for index in self.graph.node_indices() {
            let node = &self.graph[index];
            *metrics.depth_histogram.entry(node.depth).or_insert(0) += 1;
            metrics.max_depth = metrics.max_depth.max(node.depth);

            match node.status {
                NodeStatus::Fetched => {
                    metrics.fetched_count += 1;
                    fetched_links += node.outbound_links.len();
                }
                NodeStatus::Failed => metrics.failed_count += 1,
                NodeStatus::Pending => metrics.pending_count += 1,
            }

            if node.is_root() {
                metrics.root_count += 1;
            }
            if self
                .graph
                .neighbors_directed(index, Direction::Outgoing)
                .next()
                .is_none()
            {
                metrics.leaf_count += 1;
            }
            if let Some(host) = node.host() {
                domains.insert(host);
            }
        }

        metrics.unique_domains = domains.len();
        if node_count > 0 {
            metrics.success_rate = metrics.fetched_count as f64 / node_count as f64;
            metrics.avg_out_degree = edge_count as f64 / node_count as f64;
        }
        if metrics.fetched_count > 0 {
            metrics.avg_links_per_fetched = fetched_links as f64 / metrics.fetched_count as f64;
        }

        metrics
    }
}
