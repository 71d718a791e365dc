use crate::content::PageParser;
use crate::error::{FetchFailure, FetchSetupError};
use crate::fetcher::PageFetcher;
use crate::options::FetchOptions;
use crate::page::{FetchMethod, FetchedPage};
use async_trait::async_trait;
use reqwest::Client;
use std::time::{Duration, Instant};
use tracing::debug;
use url::Url;

/// Direct HTTP fetch without script execution.
pub struct PlainFetcher {
    client: Client,
    parser: PageParser,
    max_body_bytes: usize,
}

impl PlainFetcher {
    pub fn new(options: &FetchOptions) -> Result<Self, FetchSetupError> {
        if options.user_agent.trim().is_empty() {
            return Err(FetchSetupError::InvalidOption(
                "user agent must not be empty".to_string(),
            ));
        }

        let client = Client::builder()
            .user_agent(options.user_agent.as_str())
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(reqwest::redirect::Policy::limited(options.max_redirects))
            .build()?;

        Ok(Self {
            client,
            parser: PageParser::new(options.min_content_length, options.max_content_chars),
            max_body_bytes: options.max_body_bytes,
        })
    }
}

#[async_trait]
impl PageFetcher for PlainFetcher {
    async fn fetch(&mut self, url: &Url, timeout: Duration) -> Result<FetchedPage, FetchFailure> {
        debug!("Plain fetch {}", url);

        let start = Instant::now();
        let mut response = self
            .client
            .get(url.clone())
            .header(
                reqwest::header::ACCEPT,
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            )
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchFailure::from_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::HttpError(status.as_u16()));
        }

        let final_url = response.url().clone();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_ascii_lowercase());

        // Only parse HTML content; a missing header is given the benefit of the doubt.
        if let Some(ref ct) = content_type
            && !(ct.contains("text/html") || ct.contains("application/xhtml"))
        {
            return Err(FetchFailure::UnsupportedContent(ct.clone()));
        }

        let mut body: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| FetchFailure::from_reqwest(e, timeout))?
        {
            let room = self.max_body_bytes.saturating_sub(body.len());
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() >= self.max_body_bytes {
                debug!("Body of {} truncated at {} bytes", url, self.max_body_bytes);
                break;
            }
        }
        let response_time = start.elapsed();

        let parsed = self
            .parser
            .parse(&String::from_utf8_lossy(&body), &final_url)?;

        let mut page = FetchedPage::new(url.as_str(), FetchMethod::Plain)
            .with_title(parsed.title)
            .with_content(parsed.content)
            .with_links(parsed.links)
            .with_status(status.as_u16());
        page.final_url = final_url.to_string();
        page.response_time = response_time;

        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    const BODY_TEXT: &str = "A long enough paragraph of text so that the page clears the minimum \
                             content length threshold used by the parser in these tests.";

    fn fetcher() -> PlainFetcher {
        PlainFetcher::new(&FetchOptions::default()).unwrap()
    }

    async fn mount_html(server: &MockServer, route: &str, html: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_bytes(html.into_bytes()),
            )
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_plain_fetch_success() {
        let mock_server = MockServer::start().await;
        mount_html(
            &mock_server,
            "/",
            format!(
                r#"<html><head><title>Root</title></head><body>
                <p>{BODY_TEXT}</p>
                <a href="{uri}/page1">Page 1</a>
                <a href="/page2#frag">Page 2</a>
                </body></html>"#,
                uri = mock_server.uri()
            ),
        )
        .await;

        let url = Url::parse(&mock_server.uri()).unwrap();
        let page = fetcher().fetch(&url, Duration::from_secs(5)).await.unwrap();

        assert_eq!(page.title, "Root");
        assert_eq!(page.status_code, Some(200));
        assert_eq!(page.method, FetchMethod::Plain);
        assert_eq!(
            page.links,
            vec![
                format!("{}/page1", mock_server.uri()),
                format!("{}/page2", mock_server.uri()),
            ]
        );
    }

    #[tokio::test]
    async fn test_plain_fetch_http_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/missing", mock_server.uri())).unwrap();
        let result = fetcher().fetch(&url, Duration::from_secs(5)).await;

        assert_eq!(result.unwrap_err(), FetchFailure::HttpError(404));
    }

    #[tokio::test]
    async fn test_plain_fetch_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string(format!("<p>{BODY_TEXT}</p>"))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/slow", mock_server.uri())).unwrap();
        let timeout = Duration::from_millis(50);
        let result = fetcher().fetch(&url, timeout).await;

        assert_eq!(result.unwrap_err(), FetchFailure::Timeout(timeout));
    }

    #[tokio::test]
    async fn test_plain_fetch_rejects_non_html() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/json")
                    .set_body_string("{}"),
            )
            .mount(&mock_server)
            .await;

        let url = Url::parse(&format!("{}/data", mock_server.uri())).unwrap();
        let result = fetcher().fetch(&url, Duration::from_secs(5)).await;

        assert!(matches!(result, Err(FetchFailure::UnsupportedContent(_))));
    }

    #[tokio::test]
    async fn test_plain_fetch_empty_content() {
        let mock_server = MockServer::start().await;
        mount_html(&mock_server, "/thin", "<html><body>tiny</body></html>".to_string()).await;

        let url = Url::parse(&format!("{}/thin", mock_server.uri())).unwrap();
        let result = fetcher().fetch(&url, Duration::from_secs(5)).await;

        assert!(matches!(result, Err(FetchFailure::EmptyContent { .. })));
    }

    #[tokio::test]
    async fn test_plain_fetch_truncates_large_body() {
        let mock_server = MockServer::start().await;
        let filler = "lorem ipsum ".repeat(2000);
        mount_html(
            &mock_server,
            "/big",
            format!(
                r#"<html><head><title>Big</title></head><body>
                <p>{BODY_TEXT} {filler}</p>
                <a href="/after-the-cap">late link</a>
                </body></html>"#
            ),
        )
        .await;

        let options = FetchOptions {
            max_body_bytes: 4096,
            ..FetchOptions::default()
        };
        let mut fetcher = PlainFetcher::new(&options).unwrap();
        let url = Url::parse(&format!("{}/big", mock_server.uri())).unwrap();
        let page = fetcher.fetch(&url, Duration::from_secs(5)).await.unwrap();

        assert_eq!(page.title, "Big");
        assert!(page.links.is_empty());
    }

    #[test]
    fn test_plain_fetcher_rejects_empty_user_agent() {
        let options = FetchOptions {
            user_agent: "  ".to_string(),
            ..FetchOptions::default()
        };
        assert!(matches!(
            PlainFetcher::new(&options),
            Err(FetchSetupError::InvalidOption(_))
        ));
    }
}
