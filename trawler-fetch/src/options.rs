use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_USER_AGENT: &str = "Trawler/0.1 (https://github.com/trapdoorsec/trawler)";

/// Settings shared by every fetch backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchOptions {
    pub user_agent: String,
    /// Pages with less extracted text than this are treated as failures.
    pub min_content_length: usize,
    pub max_content_chars: usize,
    /// Response bodies are truncated to this many bytes before parsing.
    pub max_body_bytes: usize,
    pub max_redirects: usize,
    /// Try a headless browser before plain HTTP.
    pub render: bool,
    pub headless: bool,
    pub browser_executable: Option<PathBuf>,
    /// Consecutive rendered failures tolerated before degrading to plain HTTP.
    pub fallback_threshold: u32,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            min_content_length: 100,
            max_content_chars: 5000,
            max_body_bytes: 5 * 1024 * 1024,
            max_redirects: 5,
            render: false,
            headless: true,
            browser_executable: None,
            fallback_threshold: 3,
        }
    }
}
