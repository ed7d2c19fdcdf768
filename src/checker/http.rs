// src/checker/http.rs
// =============================================================================
// This module talks HTTP.
//
// Key functionality:
// - The Transport trait: what the crawler needs from an HTTP client
// - HttpTransport: the reqwest-backed implementation used in production
// - audit_link: the non-200 probe for links found on a page
//
// The crawler only ever sees `dyn Transport`, so tests swap in an in-memory
// stub and count the requests it receives.
// =============================================================================

use crate::error::{ConfigError, CrawlError};
use async_trait::async_trait;
use regex::RegexSet;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use std::collections::HashSet;
use std::time::Duration;
use tracing::debug;
use url::Url;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

// "text/html", "application/xhtml+xml"... A missing Content-Type gets the
// benefit of the doubt.
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        Some(content_type) => content_type.to_ascii_lowercase().contains("html"),
        None => true,
    }
}

// A fetched page. The body has been read in full, once.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    /// True unless the server said the body is something other than HTML.
    pub fn is_html(&self) -> bool {
        is_html_content_type(self.content_type.as_deref())
    }
}

/// What the crawler needs from an HTTP client.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url` and read the whole body. A response declared as something
    /// other than HTML is a parse failure and its body is not read.
    async fn fetch(&self, url: &Url, headers: &HeaderMap) -> Result<FetchedPage, CrawlError>;

    /// GET `url` and report only the status code. The body is never read.
    async fn probe(&self, url: &Url, headers: &HeaderMap) -> Result<u16, CrawlError>;
}

// The production transport
//
// reqwest::Client is cheap to clone (it's a reference counter internally)
// and pools connections, so one instance serves every worker.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    // Builds the client
    //
    // Parameters:
    //   insecure: accept invalid TLS certificates (self-signed staging hosts)
    pub fn new(insecure: bool) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .danger_accept_invalid_certs(insecure)
            .build()
            .map_err(ConfigError::Client)?;

        Ok(Self { client })
    }

    async fn send(&self, url: &Url, headers: &HeaderMap) -> Result<reqwest::Response, CrawlError> {
        self.client
            .get(url.clone())
            .headers(headers.clone())
            .send()
            .await
            .map_err(|e| CrawlError::transport(url.as_str(), e))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &Url, headers: &HeaderMap) -> Result<FetchedPage, CrawlError> {
        let response = self.send(url, headers).await?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !is_html_content_type(content_type.as_deref()) {
            // Dropping the response releases the connection without
            // downloading the body
            return Err(CrawlError::Parse {
                url: url.to_string(),
                reason: format!(
                    "not an HTML document ({})",
                    content_type.as_deref().unwrap_or("unknown type")
                ),
            });
        }

        // text() consumes the response, so the body is read exactly once
        let body = response.text().await.map_err(|e| CrawlError::Parse {
            url: url.to_string(),
            reason: format!("could not read body: {}", e),
        })?;

        Ok(FetchedPage {
            status,
            content_type,
            body,
        })
    }

    async fn probe(&self, url: &Url, headers: &HeaderMap) -> Result<u16, CrawlError> {
        let response = self.send(url, headers).await?;
        Ok(response.status().as_u16())
    }
}

// Decides whether a link is a reportable non-200 anomaly
//
// Parameters:
//   transport: who does the GET
//   url: absolute URL of the link
//   headers: request headers to replay
//   excluded_status_codes: non-200 codes that are expected and not reported
//   excluded_urls: URLs matching any of these are never requested
//
// Returns: true only if the server answered with a status that is neither
// 200 nor excluded. Transport failures are NOT reported: an unreachable
// host is skipped, not flagged.
pub async fn audit_link(
    transport: &dyn Transport,
    url: &Url,
    headers: &HeaderMap,
    excluded_status_codes: &HashSet<u16>,
    excluded_urls: &RegexSet,
) -> bool {
    if excluded_urls.is_match(url.as_str()) {
        return false;
    }

    let status = match transport.probe(url, headers).await {
        Ok(status) => status,
        Err(e) => {
            debug!(%url, error = %e, "probe failed, not reporting");
            return false;
        }
    };

    if status == StatusCode::OK.as_u16() {
        return false;
    }

    !excluded_status_codes.contains(&status)
}


#[cfg(test)]
mod tests {
    use super::stub::StubTransport;
    use super::*;
    use reqwest::header::HeaderValue;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    fn no_patterns() -> RegexSet {
        RegexSet::empty()
    }

    #[tokio::test]
    async fn test_excluded_url_is_never_requested() {
        let transport = StubTransport::new().status("http://example.test/logout", 404);
        let excluded = RegexSet::new(["logout"]).unwrap();

        let anomalous = audit_link(
            &transport,
            &url("http://example.test/logout"),
            &HeaderMap::new(),
            &HashSet::new(),
            &excluded,
        )
        .await;

        assert!(!anomalous);
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn test_404_is_reported() {
        let transport = StubTransport::new().status("http://example.test/gone", 404);

        let anomalous = audit_link(
            &transport,
            &url("http://example.test/gone"),
            &HeaderMap::new(),
            &HashSet::new(),
            &no_patterns(),
        )
        .await;

        assert!(anomalous);
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn test_excluded_status_is_not_reported() {
        let transport = StubTransport::new().status("http://example.test/gone", 404);
        let excluded_codes: HashSet<u16> = [404].into_iter().collect();

        let anomalous = audit_link(
            &transport,
            &url("http://example.test/gone"),
            &HeaderMap::new(),
            &excluded_codes,
            &no_patterns(),
        )
        .await;

        assert!(!anomalous);
    }

    #[tokio::test]
    async fn test_ok_and_transport_failure_are_not_reported() {
        let transport = StubTransport::new()
            .page("http://example.test/ok", "<p>fine</p>")
            .failing("http://down.example.test/");

        for target in ["http://example.test/ok", "http://down.example.test/"] {
            let anomalous = audit_link(
                &transport,
                &url(target),
                &HeaderMap::new(),
                &HashSet::new(),
                &no_patterns(),
            )
            .await;
            assert!(!anomalous, "{} should not be reported", target);
        }
    }

    #[tokio::test]
    async fn test_other_2xx_is_reported() {
        // Only exactly 200 is fine
        let transport = StubTransport::new().status("http://example.test/moved", 204);
        assert!(
            audit_link(
                &transport,
                &url("http://example.test/moved"),
                &HeaderMap::new(),
                &HashSet::new(),
                &no_patterns(),
            )
            .await
        );
    }

    #[tokio::test]
    async fn test_http_transport_replays_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .and(header("x-audit", "yes"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw("<a href=\"/next\">next</a>", "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let mut headers = HeaderMap::new();
        headers.insert("x-audit", HeaderValue::from_static("yes"));

        let transport = HttpTransport::new(false).unwrap();
        let page = transport
            .fetch(&url(&format!("{}/page", server.uri())), &headers)
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert!(page.is_html());
        assert!(page.body.contains("/next"));
    }

    #[tokio::test]
    async fn test_http_transport_rejects_non_html_without_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/disk.iso"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(vec![0u8; 4 * 1024 * 1024], "application/octet-stream"),
            )
            .mount(&server)
            .await;

        let transport = HttpTransport::new(false).unwrap();
        let result = transport
            .fetch(&url(&format!("{}/disk.iso", server.uri())), &HeaderMap::new())
            .await;

        match result {
            Err(CrawlError::Parse { reason, .. }) => assert!(reason.contains("application/octet-stream")),
            other => panic!("expected a parse failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_http_transport_probe_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let transport = HttpTransport::new(false).unwrap();
        let status = transport
            .probe(&url(&format!("{}/missing", server.uri())), &HeaderMap::new())
            .await
            .unwrap();

        assert_eq!(status, 404);
    }

    #[tokio::test]
    async fn test_http_transport_connect_failure() {
        let transport = HttpTransport::new(false).unwrap();
        // Port 9 (discard) on localhost is almost never listening
        let result = transport
            .probe(&url("http://127.0.0.1:9/"), &HeaderMap::new())
            .await;
        assert!(matches!(result, Err(CrawlError::Transport { .. })));
    }

    #[test]
    fn test_html_content_types() {
        assert!(is_html_content_type(Some("text/html; charset=UTF-8")));
        assert!(is_html_content_type(Some("TEXT/HTML")));
        assert!(is_html_content_type(None));
        assert!(!is_html_content_type(Some("application/pdf")));
    }

    #[test]
    fn test_non_html_content_type() {
        let page = FetchedPage {
            status: 200,
            content_type: Some("image/png".to_string()),
            body: String::new(),
        };
        assert!(!page.is_html());

        let page = FetchedPage {
            content_type: Some("application/xhtml+xml".to_string()),
            ..page
        };
        assert!(page.is_html());
    }
}
