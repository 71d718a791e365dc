pub mod cancel;
pub mod config;
pub mod error;
pub mod export;
pub mod graph;
pub mod model;
pub mod report;
pub mod scheduler;
pub mod session;

pub use cancel::{CancelReason, CancelToken};
pub use config::{CrawlConfig, CrawlMode};
pub use error::{CrawlError, GraphError};
pub use export::{GraphExport, PageDocument, graph_export, page_documents};
pub use graph::{GraphMetrics, GraphStore};
pub use model::{Metadata, MetadataKey, MetadataValue, Node, NodeId, NodeStatus};
pub use report::ReportFormat;
pub use scheduler::{CrawlPhase, CrawlProgress, ProgressCallback, StopReason, TraversalScheduler};
pub use session::{CrawlMetrics, CrawlReport, CrawlSession};
