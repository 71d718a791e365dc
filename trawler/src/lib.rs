pub mod commands;
pub mod handlers;

// Re-export commonly used handler functions for convenience
pub use handlers::{
    crawl_config_from_args, handle_crawl, load_urls_from_file, load_urls_from_source,
    output_path, parse_url_line, run_crawl,
};
