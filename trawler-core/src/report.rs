// Report generation from a finished crawl

use crate::export::{graph_export, page_documents};
use crate::model::{MetadataKey, Node, NodeStatus};
use crate::session::CrawlReport;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use url::Url;

const RULE: &str = "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportFormat {
    Text,
    Json,
    Markdown,
    /// Node/edge export for visualization.
    Graph,
    /// Fetched page text for summarization.
    Documents,
}

impl ReportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Some(ReportFormat::Text),
            "json" => Some(ReportFormat::Json),
            "markdown" | "md" => Some(ReportFormat::Markdown),
            "graph" => Some(ReportFormat::Graph),
            "documents" | "docs" => Some(ReportFormat::Documents),
            _ => None,
        }
    }
}

pub fn render_report(report: &CrawlReport, format: ReportFormat) -> Result<String, serde_json::Error> {
    match format {
        ReportFormat::Text => Ok(generate_text_report(report)),
        ReportFormat::Markdown => Ok(generate_markdown_report(report)),
        ReportFormat::Json => generate_json_report(report),
        ReportFormat::Graph => serde_json::to_string_pretty(&graph_export(report)),
        ReportFormat::Documents => serde_json::to_string_pretty(&page_documents(report)),
    }
}

/// Path (plus query) of a URL, for compact listings.
pub fn extract_url_path(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let mut path = parsed.path().to_string();
            if let Some(query) = parsed.query() {
                path.push('?');
                path.push_str(query);
            }
            path
        }
        Err(_) => url.to_string(),
    }
}

fn group_by_host(nodes: &[Node]) -> BTreeMap<String, Vec<&Node>> {
    let mut by_host: BTreeMap<String, Vec<&Node>> = BTreeMap::new();
    for node in nodes {
        let host = node.host().unwrap_or_else(|| "(unknown host)".to_string());
        by_host.entry(host).or_default().push(node);
    }
    by_host
}

fn status_marker(node: &Node) -> String {
    let http = node.metadata.get_int(MetadataKey::HttpStatus);
    match (node.status, http) {
        (NodeStatus::Fetched, Some(code)) => code.to_string().green().to_string(),
        (NodeStatus::Fetched, None) => "ok".green().to_string(),
        (NodeStatus::Failed, Some(code)) => code.to_string().red().to_string(),
        (NodeStatus::Failed, None) => "ERR".red().to_string(),
        (NodeStatus::Pending, _) => "...".yellow().to_string(),
    }
}

pub fn generate_text_report(report: &CrawlReport) -> String {
    let mut out = String::new();
    let metrics = &report.metrics;

    out.push_str(RULE);
    out.push_str("\n                            TRAWLER CRAWL REPORT\n");
    out.push_str(RULE);
    out.push_str("\n\n");

    out.push_str(&format!("Session ID:   {}\n", report.session_id));
    out.push_str(&format!(
        "Started:      {}\n",
        report.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out.push_str(&format!("Duration:     {:.1} seconds\n", metrics.elapsed_seconds));
    out.push_str(&format!("Mode:         {}\n", report.mode));
    out.push_str(&format!("Seeds:        {}\n", report.seeds.join(", ")));
    out.push_str(&format!("Stopped:      {}\n\n", report.stop_reason));

    out.push_str(RULE);
    out.push_str("\n# Summary:\n");
    out.push_str(&format!("  Pages visited: {}\n", metrics.node_count));
    out.push_str(&format!("  Fetched: {}\n", metrics.success_count));
    out.push_str(&format!("  Failed: {}\n", metrics.failure_count));
    out.push_str(&format!(
        "  Success rate: {:.1}%\n",
        report.graph.success_rate * 100.0
    ));
    out.push_str(&format!("  Links between pages: {}\n", report.graph.edge_count));
    out.push_str(&format!("  Domains: {}\n", report.graph.unique_domains));
    for (depth, count) in &metrics.depth_histogram {
        out.push_str(&format!("  Depth {}: {} page(s)\n", depth, count));
    }
    if let Some(ref event) = report.fallback {
        out.push_str(&format!(
            "  {} rendering disabled at {} ({})\n",
            "Fallback:".yellow(),
            event.url,
            event.reason
        ));
    }
    if report.is_total_failure() {
        out.push_str(&format!("  {}\n", "No page could be fetched.".red()));
    }
    out.push('\n');
    out.push_str(RULE);
    out.push_str("\n\n");

    for (host, nodes) in group_by_host(&report.nodes) {
        out.push_str(&format!("## {}\n", host));
        out.push_str(&format!("  {} pages visited\n\n", nodes.len()));

        for node in nodes {
            let indent = "  ".repeat(node.depth + 1);
            let mut line = format!(
                "{}{} {}",
                indent,
                status_marker(node),
                extract_url_path(&node.url)
            );
            if node.is_fetched() && !node.title.is_empty() {
                line.push_str(&format!(" {}", node.title.dimmed()));
            }
            if let Some(reason) = node.metadata.get_text(MetadataKey::FailureReason) {
                line.push_str(&format!(" {}", reason.dimmed()));
            }
            out.push_str(&line);
            out.push('\n');
        }
        out.push('\n');
    }

    out
}

pub fn generate_markdown_report(report: &CrawlReport) -> String {
    let metrics = &report.metrics;
    let mut out = String::new();

    out.push_str("# Trawler Crawl Report\n\n");
    out.push_str(&format!("- **Session:** `{}`\n", report.session_id));
    out.push_str(&format!("- **Mode:** {}\n", report.mode));
    out.push_str(&format!("- **Seeds:** {}\n", report.seeds.join(", ")));
    out.push_str(&format!("- **Stopped:** {}\n", report.stop_reason));
    out.push_str(&format!("- **Duration:** {:.1}s\n\n", metrics.elapsed_seconds));

    out.push_str("## Summary\n\n");
    out.push_str("| Metric | Value |\n|---|---|\n");
    out.push_str(&format!("| Pages visited | {} |\n", metrics.node_count));
    out.push_str(&format!("| Fetched | {} |\n", metrics.success_count));
    out.push_str(&format!("| Failed | {} |\n", metrics.failure_count));
    out.push_str(&format!("| Edges | {} |\n", report.graph.edge_count));
    out.push_str(&format!(
        "| Average out-degree | {:.2} |\n",
        report.graph.avg_out_degree
    ));
    out.push_str(&format!(
        "| Fallback triggered | {} |\n\n",
        if metrics.fallback_triggered { "yes" } else { "no" }
    ));

    out.push_str("## Pages\n\n");
    out.push_str("| # | Depth | Status | URL | Title |\n|---|---|---|---|---|\n");
    for node in &report.nodes {
        out.push_str(&format!(
            "| {} | {} | {} | {} | {} |\n",
            node.id.index(),
            node.depth,
            node.status,
            node.url,
            node.title.replace('|', "\\|")
        ));
    }

    out
}

pub fn generate_json_report(report: &CrawlReport) -> Result<String, serde_json::Error> {
    let json_report = serde_json::json!({
        "report": {
            "metadata": {
                "generator": "Trawler",
                "version": env!("CARGO_PKG_VERSION"),
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "format": "json"
            },
            "session": {
                "id": report.session_id,
                "started_at": report.started_at.to_rfc3339(),
                "mode": report.mode,
                "seeds": report.seeds,
                "stop_reason": report.stop_reason,
                "fallback": report.fallback
            },
            "metrics": report.metrics,
            "graph": report.graph,
            "nodes": report.nodes
        }
    });

    serde_json::to_string_pretty(&json_report)
}

pub fn save_report(content: &str, path: &Path) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}
