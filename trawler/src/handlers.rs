use anyhow::{Context, bail};
use clap::ArgMatches;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;
use trawler_core::report::{render_report, save_report};
use trawler_core::{
    CancelReason, CrawlConfig, CrawlMode, CrawlProgress, CrawlReport, CrawlSession, ReportFormat,
};
use trawler_fetch::FetchOptions;
use url::Url;

// Helper functions for crawl handler

/// Load URLs from either a file or a single URL argument
pub fn load_urls_from_source(
    url: Option<&Url>,
    hosts_file: Option<&PathBuf>,
) -> Result<Vec<String>, String> {
    if let Some(hosts_file_path) = hosts_file {
        load_urls_from_file(hosts_file_path)
    } else if let Some(url) = url {
        Ok(vec![url.as_str().to_string()])
    } else {
        Err("Either --url or --hosts-file must be provided".to_string())
    }
}

/// Load and parse URLs from a file
pub fn load_urls_from_file(path: &PathBuf) -> Result<Vec<String>, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read hosts file {}: {}", path.display(), e))?;

    let urls: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(parse_url_line)
        .collect();

    if urls.is_empty() {
        return Err(format!("No valid URLs found in {}", path.display()));
    }

    Ok(urls)
}

/// Parse a single line as a URL, trying to add http:// if needed
pub fn parse_url_line(line: &str) -> Option<String> {
    if let Ok(url) = Url::parse(line)
        && matches!(url.scheme(), "http" | "https")
    {
        return Some(line.to_string());
    }

    let with_scheme = format!("http://{}", line);
    if let Ok(url) = Url::parse(&with_scheme)
        && url.host_str().is_some()
    {
        return Some(with_scheme);
    }

    eprintln!("⚠️  Skipping invalid URL '{}'", line);
    None
}

/// Expand `~` in a user-supplied output path.
pub fn output_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).as_ref())
}

pub fn print_banner() {
    println!(
        "{} {}",
        "trawler".bright_cyan().bold(),
        env!("CARGO_PKG_VERSION").dimmed()
    );
    println!("{}", "graph web crawler".dimmed());
    println!();
}

/// Install the fmt subscriber on stderr. `RUST_LOG` wins over `-v`.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn arg_value<T: Clone + Send + Sync + 'static>(args: &ArgMatches, id: &str) -> anyhow::Result<T> {
    args.get_one::<T>(id)
        .cloned()
        .with_context(|| format!("missing value for --{}", id))
}

/// Build a crawl configuration from `crawl` subcommand matches.
pub fn crawl_config_from_args(args: &ArgMatches) -> anyhow::Result<CrawlConfig> {
    let raw_mode = arg_value::<String>(args, "mode")?;
    let mode = match CrawlMode::from_str(&raw_mode) {
        Some(CrawlMode::Hybrid { .. }) => CrawlMode::Hybrid {
            seed_page_budget: arg_value(args, "seed-pages")?,
            max_dfs_depth: arg_value(args, "dfs-depth")?,
        },
        Some(mode) => mode,
        None => bail!("unknown crawl mode '{}'", raw_mode),
    };

    let fetch = FetchOptions {
        user_agent: arg_value(args, "user-agent")?,
        min_content_length: arg_value(args, "min-content")?,
        render: args.get_flag("render"),
        headless: !args.get_flag("headful"),
        browser_executable: args.get_one::<PathBuf>("browser").cloned(),
        fallback_threshold: arg_value(args, "fallback-after")?,
        ..FetchOptions::default()
    };

    Ok(CrawlConfig {
        max_depth: arg_value(args, "max-depth")?,
        max_pages: arg_value(args, "max-pages")?,
        delay_seconds: arg_value(args, "delay")?,
        timeout_seconds: arg_value(args, "timeout")?,
        mode,
        max_links_per_page: args.get_one::<usize>("max-links").copied(),
        time_budget_seconds: args.get_one::<f64>("time-budget").copied(),
        fetch,
    })
}

pub fn report_format_from_args(args: &ArgMatches) -> anyhow::Result<ReportFormat> {
    let raw = arg_value::<String>(args, "format")?;
    ReportFormat::from_str(&raw).with_context(|| format!("unknown report format '{}'", raw))
}

fn crawl_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }
    let spinner = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} [{elapsed}] {msg}") {
        spinner.set_style(style);
    }
    spinner.enable_steady_tick(Duration::from_millis(100));
    spinner
}

fn print_crawl_settings(seeds: &[String], config: &CrawlConfig) {
    println!("\n🕷️  Crawling from {} seed(s)", seeds.len());
    println!("Mode: {}", config.mode);
    println!("Max depth: {}", config.max_depth);
    println!("Max pages: {}", config.max_pages);
    if let CrawlMode::Hybrid {
        seed_page_budget,
        max_dfs_depth,
    } = config.mode
    {
        println!("Seed pages: {}  DFS depth: {}", seed_page_budget, max_dfs_depth);
    }
    println!("Delay: {}s  Timeout: {}s", config.delay_seconds, config.timeout_seconds);
    println!(
        "Fetch: {}\n",
        if config.fetch.render {
            "rendered (plain HTTP fallback)"
        } else {
            "plain HTTP"
        }
    );
}

/// Run a crawl and return its report. Ctrl-C stops the crawl early; the
/// partial result is still returned.
pub async fn run_crawl(
    seeds: Vec<String>,
    config: CrawlConfig,
    quiet: bool,
) -> anyhow::Result<CrawlReport> {
    let spinner = crawl_spinner(quiet);
    let bar = spinner.clone();
    let progress = Arc::new(move |p: CrawlProgress| {
        bar.set_message(format!(
            "[{}] {}/{} depth {} {}",
            p.phase, p.pages, p.max_pages, p.depth, p.url
        ));
    });

    let mut session = CrawlSession::connect(config)?.with_progress(progress);
    info!("Session {}", session.id());

    let token = session.cancel_token();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            token.cancel(CancelReason::Aborted("interrupted".to_string()));
        }
    });

    let outcome = session.run(&seeds).await;
    interrupt.abort();
    spinner.finish_and_clear();

    let report = outcome?;
    debug!("Crawl stopped: {}", report.stop_reason);
    Ok(report)
}

pub async fn handle_crawl(sub_matches: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let url = sub_matches.get_one::<Url>("url");
    let hosts_file = sub_matches.get_one::<PathBuf>("hosts-file");

    let seeds = load_urls_from_source(url, hosts_file).map_err(anyhow::Error::msg)?;
    let config = crawl_config_from_args(sub_matches)?;
    let format = report_format_from_args(sub_matches)?;

    if !quiet {
        print_crawl_settings(&seeds, &config);
    }

    let report = run_crawl(seeds, config, quiet).await?;

    if !quiet {
        let metrics = &report.metrics;
        let mark = if report.is_total_failure() {
            "✗".red().bold()
        } else {
            "✓".green().bold()
        };
        println!(
            "{} Crawl complete: {} fetched, {} failed ({})\n",
            mark, metrics.success_count, metrics.failure_count, report.stop_reason
        );
    }

    let rendered = render_report(&report, format).context("Failed to render report")?;

    match sub_matches.get_one::<String>("output") {
        Some(raw) => {
            let path = output_path(raw);
            save_report(&rendered, &path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            if !quiet {
                println!("{} Report saved to {}", "✓".green().bold(), path.display());
            }
        }
        None => print!("{}", rendered),
    }

    Ok(())
}
