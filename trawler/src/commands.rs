use clap::{arg, command};
use trawler_fetch::options::DEFAULT_USER_AGENT;
use url::Url;

pub const CLAP_STYLING: clap::builder::styling::Styles = clap::builder::styling::Styles::styled()
    .header(clap_cargo::style::HEADER)
    .usage(clap_cargo::style::USAGE)
    .literal(clap_cargo::style::LITERAL)
    .placeholder(clap_cargo::style::PLACEHOLDER)
    .error(clap_cargo::style::ERROR)
    .valid(clap_cargo::style::VALID)
    .invalid(clap_cargo::style::INVALID);

pub const REPORT_FORMATS: [&str; 6] = ["text", "json", "markdown", "md", "graph", "documents"];

pub fn command_argument_builder() -> clap::Command {
    clap::Command::new("trawler")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("trawler")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner and non-essential output").required(false))
        .arg(
            arg!(-v --"verbose" "Increase log verbosity (-v info, -vv debug, -vvv trace)")
                .required(false)
                .action(clap::ArgAction::Count),
        )
        .subcommand_required(false)
        .subcommand(
            command!("crawl")
                .about(
                    "Crawl outward from one or more seed URLs and build a graph of the pages \
                reached.",
                )
                .arg(
                    arg!(-u --"url" <URL>)
                        .required(false)
                        .help("The seed URL to crawl from")
                        .value_parser(clap::value_parser!(Url))
                        .conflicts_with("hosts-file"),
                )
                .arg(
                    arg!(-H --"hosts-file" <PATH>)
                        .required(false)
                        .help("Path to a newline-delimited file of seed URLs")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .conflicts_with("url"),
                )
                .arg(
                    arg!(-m --"mode" <MODE>)
                        .required(false)
                        .help("Traversal policy: breadth-first, or a breadth-first seed phase followed by depth-first deepening")
                        .value_parser(["bfs", "hybrid", "bfs-dfs", "deep"])
                        .default_value("bfs"),
                )
                .arg(
                    arg!(-d --"max-depth" <DEPTH>)
                        .required(false)
                        .help("Maximum link depth from the seeds (breadth-first phases)")
                        .value_parser(clap::value_parser!(usize))
                        .env("SEARCH_MAX_DEPTH")
                        .default_value("2"),
                )
                .arg(
                    arg!(-p --"max-pages" <PAGES>)
                        .required(false)
                        .help("Maximum number of pages to visit")
                        .value_parser(clap::value_parser!(usize))
                        .env("MAX_PAGES_PER_CRAWL")
                        .default_value("50"),
                )
                .arg(
                    arg!(--"delay" <SECONDS>)
                        .required(false)
                        .help("Politeness delay between successive fetches")
                        .value_parser(clap::value_parser!(f64))
                        .env("DEFAULT_DELAY")
                        .default_value("1.0"),
                )
                .arg(
                    arg!(--"timeout" <SECONDS>)
                        .required(false)
                        .help("Per-page fetch timeout")
                        .value_parser(clap::value_parser!(f64))
                        .env("DEFAULT_TIMEOUT")
                        .default_value("10"),
                )
                .arg(
                    arg!(--"seed-pages" <PAGES>)
                        .required(false)
                        .help("Pages visited breadth-first before deepening (hybrid mode)")
                        .value_parser(clap::value_parser!(usize))
                        .env("DEEP_BFS_PAGES")
                        .default_value("15"),
                )
                .arg(
                    arg!(--"dfs-depth" <DEPTH>)
                        .required(false)
                        .help("How far below a seed-phase page to deepen (hybrid mode)")
                        .value_parser(clap::value_parser!(usize))
                        .env("DEEP_DFS_DEPTH")
                        .default_value("3"),
                )
                .arg(
                    arg!(--"max-links" <LINKS>)
                        .required(false)
                        .help("Only follow the first N links of each page")
                        .value_parser(clap::value_parser!(usize))
                        .env("SEARCH_MAX_LINKS_PER_PAGE"),
                )
                .arg(
                    arg!(--"time-budget" <SECONDS>)
                        .required(false)
                        .help("Stop the crawl after this many seconds and report what was found")
                        .value_parser(clap::value_parser!(f64)),
                )
                .arg(
                    arg!(--"render")
                        .required(false)
                        .help("Fetch pages with a headless browser, falling back to plain HTTP")
                        .action(clap::ArgAction::SetTrue),
                )
                .arg(
                    arg!(--"headful")
                        .required(false)
                        .help("Show the browser window when rendering")
                        .action(clap::ArgAction::SetTrue)
                        .requires("render"),
                )
                .arg(
                    arg!(--"browser" <PATH>)
                        .required(false)
                        .help("Path to the Chrome/Chromium executable")
                        .value_parser(clap::value_parser!(std::path::PathBuf))
                        .requires("render"),
                )
                .arg(
                    arg!(--"fallback-after" <FAILURES>)
                        .required(false)
                        .help("Consecutive rendering failures before switching to plain HTTP for good")
                        .value_parser(clap::value_parser!(u32))
                        .default_value("3"),
                )
                .arg(
                    arg!(--"user-agent" <AGENT>)
                        .required(false)
                        .help("User-Agent header sent with every request")
                        .env("USER_AGENT")
                        .default_value(DEFAULT_USER_AGENT),
                )
                .arg(
                    arg!(--"min-content" <CHARS>)
                        .required(false)
                        .help("Pages with less extracted text than this count as failed")
                        .value_parser(clap::value_parser!(usize))
                        .default_value("100"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Save report to file (default: display to screen)"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json, markdown, graph, documents")
                        .value_parser(REPORT_FORMATS)
                        .default_value("text"),
                ),
        )
}
