use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Arena identifier of a node; stable for the lifetime of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Fetched,
    Failed,
}

impl NodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Fetched => "fetched",
            NodeStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Recognized metadata attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetadataKey {
    FetchDurationMs,
    HttpStatus,
    ContentLength,
    LinkCount,
    FinalUrl,
    FetchMethod,
    FailureKind,
    FailureReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Int(u64),
    Text(String),
}

impl From<u64> for MetadataValue {
    fn from(value: u64) -> Self {
        MetadataValue::Int(value)
    }
}

impl From<usize> for MetadataValue {
    fn from(value: usize) -> Self {
        MetadataValue::Int(value as u64)
    }
}

impl From<u16> for MetadataValue {
    fn from(value: u16) -> Self {
        MetadataValue::Int(u64::from(value))
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        MetadataValue::Text(value)
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        MetadataValue::Text(value.to_string())
    }
}

/// Typed attribute map attached to each node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metadata(BTreeMap<MetadataKey, MetadataValue>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: MetadataKey, value: impl Into<MetadataValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: MetadataKey, value: impl Into<MetadataValue>) {
        self.0.insert(key, value.into());
    }

    pub fn get(&self, key: MetadataKey) -> Option<&MetadataValue> {
        self.0.get(&key)
    }

    pub fn get_int(&self, key: MetadataKey) -> Option<u64> {
        match self.0.get(&key) {
            Some(MetadataValue::Int(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn get_text(&self, key: MetadataKey) -> Option<&str> {
        match self.0.get(&key) {
            Some(MetadataValue::Text(value)) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn extend(&mut self, other: Metadata) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&MetadataKey, &MetadataValue)> {
        self.0.iter()
    }
}

/// One crawled (or attempted) URL.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub url: String,
    pub title: String,
    pub content: String,
    pub depth: usize,
    pub parent_id: Option<NodeId>,
    pub child_ids: Vec<NodeId>,
    pub outbound_links: Vec<String>,
    pub status: NodeStatus,
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
}

impl Node {
    pub(crate) fn pending(id: NodeId, url: String, depth: usize, parent_id: Option<NodeId>) -> Self {
        Self {
            id,
            url,
            title: String::new(),
            content: String::new(),
            depth,
            parent_id,
            child_ids: Vec::new(),
            outbound_links: Vec::new(),
            status: NodeStatus::Pending,
            metadata: Metadata::new(),
            created_at: Utc::now(),
        }
    }

    pub fn is_fetched(&self) -> bool {
        self.status == NodeStatus::Fetched
    }

    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Host part of the node URL, if it parses.
    pub fn host(&self) -> Option<String> {
        url::Url::parse(&self.url)
            .ok()
            .and_then(|u| u.host_str().map(str::to_string))
    }
}
