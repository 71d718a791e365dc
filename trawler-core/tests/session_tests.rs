// Tests for crawl sessions: validation, metrics, fallback and resource release

mod common;

use async_trait::async_trait;
use common::{FakeSite, config, u};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use trawler_core::{
    CancelReason, CrawlConfig, CrawlError, CrawlMode, CrawlSession, MetadataKey, NodeStatus,
    StopReason,
};
use trawler_fetch::rendered::NoTab;
use trawler_fetch::{
    DegradeCause, FallbackFetcher, FetchFailure, FetchOptions, FetchedPage, PageFetcher,
    PlainFetcher, RenderedFetcher, Renderer,
};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Configuration Tests
// ============================================================================

#[test]
fn test_session_rejects_invalid_config() {
    let cfg = CrawlConfig {
        max_pages: 0,
        ..CrawlConfig::default()
    };
    let result = CrawlSession::new(cfg, FakeSite::new());
    assert!(matches!(result, Err(CrawlError::Configuration(_))));
}

#[test]
fn test_session_rejects_bad_hybrid_config() {
    let cfg = CrawlConfig {
        mode: CrawlMode::Hybrid {
            seed_page_budget: 5,
            max_dfs_depth: 0,
        },
        ..CrawlConfig::default()
    };
    assert!(CrawlSession::new(cfg, FakeSite::new()).is_err());
}

#[tokio::test]
async fn test_invalid_seed_fails_before_fetching() {
    let site = FakeSite::new();
    let calls = site.calls.clone();
    let mut session = CrawlSession::new(config(1, 10), site).unwrap();

    let result = session.run(["mailto:someone@site.test"]).await;

    assert!(matches!(result, Err(CrawlError::Configuration(_))));
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(session.fetcher().shutdown_count(), 1);
}

#[tokio::test]
async fn test_empty_seed_list_is_configuration_error() {
    let mut session = CrawlSession::new(config(1, 10), FakeSite::new()).unwrap();
    let seeds: Vec<String> = Vec::new();
    assert!(matches!(
        session.run(seeds).await,
        Err(CrawlError::Configuration(_))
    ));
}

#[tokio::test]
async fn test_unrepresentable_delay_is_configuration_error() {
    let cfg = CrawlConfig {
        delay_seconds: 1e20,
        ..config(1, 10)
    };
    assert!(matches!(
        CrawlSession::new(cfg, FakeSite::new()),
        Err(CrawlError::Configuration(_))
    ));
}

#[tokio::test(start_paused = true)]
async fn test_huge_time_budget_runs_to_completion() {
    let site = FakeSite::new().page("/", &["/a"]).page("/a", &[]);
    let cfg = CrawlConfig {
        time_budget_seconds: Some(1e18),
        ..config(1, 10)
    };
    let mut session = CrawlSession::new(cfg, site).unwrap();

    let report = session.run([u("/")]).await.unwrap();

    assert_eq!(report.metrics.success_count, 2);
    assert_eq!(report.stop_reason, StopReason::FrontierExhausted);
}

#[tokio::test]
async fn test_connect_builds_plain_fetcher() {
    let session = CrawlSession::connect(CrawlConfig::default()).unwrap();
    assert!(session.fetcher().fallback_event().is_none());
}

#[tokio::test]
async fn test_connect_reports_construction_failure() {
    let mut cfg = CrawlConfig::default();
    cfg.fetch.user_agent = "bad\nagent".to_string();
    let result = CrawlSession::connect(cfg);
    assert!(matches!(result, Err(CrawlError::CrawlFailed(_))));
}

// ============================================================================
// Run Scenarios
// ============================================================================

#[tokio::test]
async fn test_session_bfs_scenario_metrics() {
    let site = FakeSite::new()
        .page("/a", &["/b", "/c"])
        .page("/b", &[])
        .page("/c", &[]);
    let mut session = CrawlSession::new(config(1, 10), site).unwrap();

    let report = session.run([u("/a")]).await.unwrap();

    assert_eq!(report.metrics.node_count, 3);
    assert_eq!(report.metrics.success_count, 3);
    assert_eq!(report.metrics.failure_count, 0);
    assert_eq!(report.metrics.depth_histogram.get(&0), Some(&1));
    assert_eq!(report.metrics.depth_histogram.get(&1), Some(&2));
    assert!(!report.metrics.fallback_triggered);
    assert_eq!(report.graph.edge_count, 2);
    assert_eq!(report.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(report.seeds, vec![u("/a")]);
    assert_eq!(session.fetcher().shutdown_count(), 1);
}

#[tokio::test]
async fn test_session_all_failures_is_not_an_error() {
    let site = FakeSite::new().failing("/a", FetchFailure::Timeout(Duration::from_secs(1)));
    let mut session = CrawlSession::new(config(2, 10), site).unwrap();

    let report = session.run([u("/a")]).await.unwrap();

    assert_eq!(report.metrics.node_count, 1);
    assert_eq!(report.metrics.success_count, 0);
    assert_eq!(report.metrics.failure_count, report.metrics.node_count);
    assert!(report.is_total_failure());
    assert_eq!(report.nodes[0].status, NodeStatus::Failed);
}

#[tokio::test]
async fn test_session_node_count_within_budget() {
    let mut site = FakeSite::new();
    let links: Vec<String> = (0..20).map(|i| format!("/p{}", i)).collect();
    let link_refs: Vec<&str> = links.iter().map(String::as_str).collect();
    site = site.page("/", &link_refs);
    for link in &links {
        site = site.page(link, &link_refs);
    }
    let mut session = CrawlSession::new(config(3, 7), site).unwrap();

    let report = session.run([u("/")]).await.unwrap();

    assert_eq!(report.metrics.node_count, 7);
    assert_eq!(report.stop_reason, StopReason::PageBudgetExhausted);
}

#[tokio::test]
async fn test_cancel_token_returns_partial_report() {
    let site = FakeSite::new().page("/", &["/a"]).page("/a", &[]);
    let mut session = CrawlSession::new(config(1, 10), site).unwrap();
    session
        .cancel_token()
        .cancel(CancelReason::Aborted("shutdown".into()));

    let report = session.run([u("/")]).await.unwrap();

    assert_eq!(report.metrics.node_count, 0);
    assert!(matches!(report.stop_reason, StopReason::Cancelled { .. }));
    assert_eq!(session.fetcher().shutdown_count(), 1);
}

#[tokio::test]
async fn test_hybrid_session_reports_mode() {
    let site = FakeSite::new().page("/", &["/a"]).page("/a", &["/b"]).page("/b", &[]);
    let cfg = CrawlConfig {
        mode: CrawlMode::Hybrid {
            seed_page_budget: 1,
            max_dfs_depth: 3,
        },
        ..config(1, 10)
    };
    let mut session = CrawlSession::new(cfg, site).unwrap();

    let report = session.run([u("/")]).await.unwrap();

    assert_eq!(report.mode, "hybrid");
    assert_eq!(report.metrics.node_count, 3);
    assert_eq!(report.node_by_url(&u("/b")).unwrap().depth, 2);
}

// ============================================================================
// Fallback Tests
// ============================================================================

/// Rendering backend that is never available.
struct NoBrowser {
    calls: Arc<Mutex<usize>>,
    shutdowns: Arc<Mutex<usize>>,
}

#[async_trait]
impl PageFetcher for NoBrowser {
    async fn fetch(&mut self, _url: &Url, _timeout: Duration) -> Result<FetchedPage, FetchFailure> {
        *self.calls.lock().unwrap() += 1;
        Err(FetchFailure::EnvironmentUnavailable("chrome not found".into()))
    }

    async fn shutdown(&mut self) {
        *self.shutdowns.lock().unwrap() += 1;
    }
}

#[tokio::test]
async fn test_environment_unavailable_triggers_permanent_fallback() {
    let rendered_calls = Arc::new(Mutex::new(0));
    let rendered_shutdowns = Arc::new(Mutex::new(0));
    let rendered = NoBrowser {
        calls: rendered_calls.clone(),
        shutdowns: rendered_shutdowns.clone(),
    };
    let plain = FakeSite::new()
        .page("/", &["/a", "/b"])
        .page("/a", &[])
        .page("/b", &[]);
    let plain_calls = plain.calls.clone();
    let fetcher = FallbackFetcher::new(rendered, plain, 3);
    let mut session = CrawlSession::new(config(1, 10), fetcher).unwrap();

    let report = session.run([u("/")]).await.unwrap();

    assert!(report.metrics.fallback_triggered);
    assert_eq!(report.metrics.success_count, 3);
    assert_eq!(*rendered_calls.lock().unwrap(), 1);
    assert_eq!(plain_calls.lock().unwrap().len(), 3);
    assert!(report.nodes.iter().all(|n| {
        n.metadata.get_text(MetadataKey::FetchMethod) == Some("plain")
    }));

    let event = report.fallback.unwrap();
    assert_eq!(event.cause, DegradeCause::EnvironmentUnavailable);
    assert_eq!(event.url, u("/"));
    assert_eq!(*rendered_shutdowns.lock().unwrap(), 1);
}

/// Browser whose tab requests never complete.
struct WedgedBrowser {
    opens: Arc<Mutex<usize>>,
}

#[async_trait]
impl Renderer for WedgedBrowser {
    type Tab = NoTab;

    async fn open_tab(&mut self) -> Result<NoTab, FetchFailure> {
        *self.opens.lock().unwrap() += 1;
        std::future::pending::<Result<NoTab, FetchFailure>>().await
    }
}

#[tokio::test(start_paused = true)]
async fn test_wedged_browser_degrades_to_plain() {
    let opens = Arc::new(Mutex::new(0));
    let rendered = RenderedFetcher::new(
        WedgedBrowser {
            opens: opens.clone(),
        },
        &FetchOptions::default(),
    );
    let plain = FakeSite::new().page("/", &[]).page("/a", &[]).page("/b", &[]);
    let fetcher = FallbackFetcher::new(rendered, plain, 1);
    let mut session = CrawlSession::new(config(1, 10), fetcher).unwrap();

    let report = session.run([u("/"), u("/a"), u("/b")]).await.unwrap();

    assert!(report.metrics.fallback_triggered);
    assert_eq!(report.metrics.success_count, 3);
    assert_eq!(report.metrics.failure_count, 0);
    assert_eq!(*opens.lock().unwrap(), 1);
    assert_eq!(
        report.fallback.unwrap().cause,
        DegradeCause::RepeatedFailures { count: 1 }
    );
}

// ============================================================================
// End-to-end over HTTP
// ============================================================================

fn html_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|l| format!("<a href=\"{}\">{}</a>", l, l))
        .collect();
    format!(
        "<html><head><title>{title}</title></head><body><main><p>{title} is a page served by the \
         mock server with enough paragraph text to pass the minimum content length check.</p>\
         {anchors}</main></body></html>"
    )
}

async fn mount_html(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_end_to_end_plain_crawl() {
    let server = MockServer::start().await;
    mount_html(&server, "/", html_page("Home", &["/about", "/contact#form", "/logo.png"])).await;
    mount_html(&server, "/about", html_page("About", &["/"])).await;
    Mock::given(method("GET"))
        .and(path("/contact"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let fetcher = PlainFetcher::new(&FetchOptions::default()).unwrap();
    let mut session = CrawlSession::new(config(1, 10), fetcher).unwrap();

    let report = session.run([server.uri()]).await.unwrap();

    assert_eq!(report.metrics.node_count, 3);
    assert_eq!(report.metrics.success_count, 2);
    assert_eq!(report.metrics.failure_count, 1);

    let home = report.node_by_url(&format!("{}/", server.uri())).unwrap();
    assert_eq!(home.title, "Home");
    assert_eq!(home.depth, 0);
    assert_eq!(home.outbound_links.len(), 2);

    let contact = report
        .node_by_url(&format!("{}/contact", server.uri()))
        .unwrap();
    assert_eq!(contact.status, NodeStatus::Failed);
    assert_eq!(contact.metadata.get_int(MetadataKey::HttpStatus), Some(404));
}
