//! Fetching remote skill files.

use std::time::Duration;

use tracing::{debug, info};

/// Error that occurred while fetching a remote file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The host could not be reached or the request failed in transit.
    Network { name: String, message: String },
    /// The host answered with a non-success status.
    Status { name: String, status: u16 },
    /// The response body could not be read.
    Body { name: String, message: String },
    /// Every alternate name failed.
    FallbackExhausted { tried: Vec<String> },
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Network { name, message } => {
                write!(f, "failed to fetch {}: {}", name, message)
            }
            FetchError::Status { name, status } => {
                write!(f, "failed to fetch {}: HTTP {}", name, status)
            }
            FetchError::Body { name, message } => {
                write!(f, "failed to read {}: {}", name, message)
            }
            FetchError::FallbackExhausted { tried } => {
                write!(f, "no alternate could be fetched (tried {})", tried.join(", "))
            }
        }
    }
}

impl std::error::Error for FetchError {}

/// Source of remote file contents, keyed by remote name.
pub trait Fetch {
    fn fetch(&self, remote_name: &str) -> Result<Vec<u8>, FetchError>;
}

/// Fetches files over HTTP from `<base_url>/<remote_name>`.
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpFetcher {
    /// Build a fetcher. `timeout` of `None` waits indefinitely.
    pub fn new(
        base_url: &str,
        timeout: Option<Duration>,
        user_agent: &str,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn url_for(&self, remote_name: &str) -> String {
        format!("{}/{}", self.base_url, remote_name)
    }
}

impl Fetch for HttpFetcher {
    fn fetch(&self, remote_name: &str) -> Result<Vec<u8>, FetchError> {
        let url = self.url_for(remote_name);
        debug!(url = %url, "fetch_start");

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| FetchError::Network {
                name: remote_name.to_string(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                name: remote_name.to_string(),
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().map_err(|e| FetchError::Body {
            name: remote_name.to_string(),
            message: e.to_string(),
        })?;

        debug!(url = %url, bytes = bytes.len(), "fetch_complete");
        Ok(bytes.to_vec())
    }
}

/// Try each name in order and return the first success with the name that
/// produced it. Names after the first success are never attempted.
pub fn fetch_first<F: Fetch + ?Sized>(
    fetcher: &F,
    names: &[&str],
) -> Result<(String, Vec<u8>), FetchError> {
    let mut tried = Vec::with_capacity(names.len());

    for name in names {
        match fetcher.fetch(name) {
            Ok(bytes) => return Ok((name.to_string(), bytes)),
            Err(e) => {
                info!(name = %name, error = %e, "fallback_candidate_failed");
                tried.push(name.to_string());
            }
        }
    }

    Err(FetchError::FallbackExhausted { tried })
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryFetcher;
    use super::*;

    #[test]
    fn test_fetch_first_uses_first_success() {
        let fetcher = MemoryFetcher::default()
            .with("a.md", "first")
            .with("b.md", "second");

        let (name, bytes) = fetch_first(&fetcher, &["a.md", "b.md"]).unwrap();
        assert_eq!(name, "a.md");
        assert_eq!(bytes, b"first");
        assert!(!fetcher.attempted("b.md"));
    }

    #[test]
    fn test_fetch_first_falls_through_failures() {
        let fetcher = MemoryFetcher::default().with("c.md", "third");

        let (name, bytes) = fetch_first(&fetcher, &["a.md", "b.md", "c.md"]).unwrap();
        assert_eq!(name, "c.md");
        assert_eq!(bytes, b"third");
        assert_eq!(*fetcher.attempts.borrow(), vec!["a.md", "b.md", "c.md"]);
    }

    #[test]
    fn test_fetch_first_exhausted() {
        let fetcher = MemoryFetcher::default();

        let err = fetch_first(&fetcher, &["a.md", "b.md"]).unwrap_err();
        assert_eq!(
            err,
            FetchError::FallbackExhausted {
                tried: vec!["a.md".to_string(), "b.md".to_string()]
            }
        );
        assert_eq!(
            err.to_string(),
            "no alternate could be fetched (tried a.md, b.md)"
        );
    }

    #[test]
    fn test_error_display_names_file() {
        let err = FetchError::Status {
            name: "ralph".to_string(),
            status: 404,
        };
        assert_eq!(err.to_string(), "failed to fetch ralph: HTTP 404");
    }

    fn http_fetcher(base_url: &str) -> HttpFetcher {
        HttpFetcher::new(base_url, Some(Duration::from_secs(5)), "ralph-install-test").unwrap()
    }

    #[test]
    fn test_http_fetch_returns_exact_bytes() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/SKILL.md")
            .with_status(200)
            .with_body("# Ralph")
            .create();

        let bytes = http_fetcher(&server.url()).fetch("SKILL.md").unwrap();
        assert_eq!(bytes, b"# Ralph");
        mock.assert();
    }

    #[test]
    fn test_http_fetch_sends_user_agent() {
        let mut server = mockito::Server::new();
        let mock = server
            .mock("GET", "/ralph")
            .match_header("user-agent", "ralph-install-test")
            .with_status(200)
            .with_body("#!/bin/sh\n")
            .create();

        http_fetcher(&server.url()).fetch("ralph").unwrap();
        mock.assert();
    }

    #[test]
    fn test_http_error_status() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/missing.md").with_status(404).create();

        let err = http_fetcher(&server.url()).fetch("missing.md").unwrap_err();
        assert_eq!(
            err,
            FetchError::Status {
                name: "missing.md".to_string(),
                status: 404,
            }
        );
    }

    #[test]
    fn test_http_server_error_status() {
        let mut server = mockito::Server::new();
        let _mock = server.mock("GET", "/plan.md").with_status(503).create();

        let err = http_fetcher(&server.url()).fetch("plan.md").unwrap_err();
        assert!(matches!(err, FetchError::Status { status: 503, .. }));
    }

    #[test]
    fn test_http_connection_refused() {
        // Bind then release a port so nothing is listening on it.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = http_fetcher(&format!("http://127.0.0.1:{}", port))
            .fetch("SKILL.md")
            .unwrap_err();
        match err {
            FetchError::Network { name, .. } => assert_eq!(name, "SKILL.md"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_http_fetch_first_stops_at_success() {
        let mut server = mockito::Server::new();
        let first = server
            .mock("GET", "/a.md")
            .with_status(404)
            .expect(1)
            .create();
        let second = server
            .mock("GET", "/b.md")
            .with_status(200)
            .with_body("second")
            .expect(1)
            .create();
        let third = server.mock("GET", "/c.md").expect(0).create();

        let fetcher = http_fetcher(&server.url());
        let (name, bytes) = fetch_first(&fetcher, &["a.md", "b.md", "c.md"]).unwrap();

        assert_eq!(name, "b.md");
        assert_eq!(bytes, b"second");
        first.assert();
        second.assert();
        third.assert();
    }

    #[test]
    fn test_url_for_strips_trailing_slash() {
        let fetcher = HttpFetcher::new("https://example.com/raw/", None, "test").unwrap();
        assert_eq!(fetcher.url_for("SKILL.md"), "https://example.com/raw/SKILL.md");
    }
}
