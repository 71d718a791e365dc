use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Which backend produced a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMethod {
    Rendered,
    Plain,
}

impl FetchMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            FetchMethod::Rendered => "rendered",
            FetchMethod::Plain => "plain",
        }
    }
}

impl fmt::Display for FetchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successfully fetched and parsed page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchedPage {
    pub url: String,
    pub final_url: String,
    pub title: String,
    pub content: String,
    pub links: Vec<String>,
    pub status_code: Option<u16>,
    pub content_length: usize,
    pub response_time: Duration,
    pub method: FetchMethod,
}

impl FetchedPage {
    pub fn new(url: impl Into<String>, method: FetchMethod) -> Self {
        let url = url.into();
        Self {
            final_url: url.clone(),
            url,
            title: String::new(),
            content: String::new(),
            links: Vec::new(),
            status_code: None,
            content_length: 0,
            response_time: Duration::from_secs(0),
            method,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self.content_length = self.content.chars().count();
        self
    }

    pub fn with_links<I, S>(mut self, links: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.links = links.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = Some(status_code);
        self
    }
}
