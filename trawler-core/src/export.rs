//! Views of a finished crawl for downstream consumers.

use crate::graph::GraphMetrics;
use crate::model::{NodeId, NodeStatus};
use crate::session::CrawlReport;
use serde::{Deserialize, Serialize};

/// Text handed to the summarization service. Only fetched nodes qualify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageDocument {
    pub url: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportNode {
    pub id: NodeId,
    pub url: String,
    pub depth: usize,
    pub status: NodeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportEdge {
    pub from_id: NodeId,
    pub to_id: NodeId,
}

/// Node/edge lists for visualization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphExport {
    pub nodes: Vec<ExportNode>,
    pub edges: Vec<ExportEdge>,
    pub stats: GraphMetrics,
}

pub fn page_documents(report: &CrawlReport) -> Vec<PageDocument> {
    report
        .fetched()
        .map(|node| PageDocument {
            url: node.url.clone(),
            title: node.title.clone(),
            content: node.content.clone(),
        })
        .collect()
}

pub fn graph_export(report: &CrawlReport) -> GraphExport {
    let nodes = report
        .nodes
        .iter()
        .map(|node| ExportNode {
            id: node.id,
            url: node.url.clone(),
            depth: node.depth,
            status: node.status,
        })
        .collect();

    let edges = report
        .nodes
        .iter()
        .flat_map(|node| {
            node.child_ids.iter().map(move |child| ExportEdge {
                from_id: node.id,
                to_id: *child,
            })
        })
        .collect();

    GraphExport {
        nodes,
        edges,
        stats: report.graph.clone(),
    }
}
