use crate::error::Result;
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// Per-request deadline applied by [`HttpExecutor::new`].
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// The request could not be built, e.g. a malformed URL.
    Construction,
    /// Connection refused, DNS failure, error while transferring.
    Transport,
    /// The per-request deadline elapsed.
    Timeout,
    /// The invocation's task ended without recording an outcome.
    Aborted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            FailureKind::Construction => "could not build request",
            FailureKind::Transport => "request failed",
            FailureKind::Timeout => "timed out",
            FailureKind::Aborted => "aborted",
        };
        write!(f, "{}: {}", label, self.message)
    }
}

/// Classified result of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Status(u16),
    Failure(Failure),
}

impl Outcome {
    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Status(code) => Some(*code),
            Outcome::Failure(_) => None,
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }
}

impl From<reqwest::Error> for Outcome {
    fn from(err: reqwest::Error) -> Self {
        let kind = if err.is_timeout() {
            FailureKind::Timeout
        } else if err.is_builder() {
            FailureKind::Construction
        } else {
            FailureKind::Transport
        };
        Outcome::Failure(Failure::new(kind, err.to_string()))
    }
}

#[async_trait]
pub trait Executor: Send + Sync {
    /// Runs one invocation against `url`. Never fails: errors become
    /// [`Outcome::Failure`].
    async fn execute(&self, url: &str) -> Outcome;
}

pub struct HttpExecutor {
    client: Client,
    timeout: Duration,
}

impl HttpExecutor {
    pub fn new() -> Result<Self> {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("stressor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self { client, timeout })
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl Executor for HttpExecutor {
    async fn execute(&self, url: &str) -> Outcome {
        let parsed = match url::Url::parse(url) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Outcome::Failure(Failure::new(
                    FailureKind::Construction,
                    format!("invalid URL '{}': {}", url, e),
                ));
            }
        };

        let response = match self.client.get(parsed).send().await {
            Ok(response) => response,
            Err(e) => return Outcome::from(e),
        };

        let status = response.status().as_u16();
        log::debug!("{} -> {}", url, status);

        // Drain so the connection goes back to the pool; the status is
        // already known, so a broken body does not change the outcome.
        if let Err(e) = response.bytes().await {
            log::debug!("Discarding body of {} failed: {}", url, e);
        }

        Outcome::Status(status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn server_returning(status: u16) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/target"))
            .respond_with(ResponseTemplate::new(status))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn any_status_code_is_an_outcome() {
        for status in [200, 204, 301, 404, 503] {
            let server = server_returning(status).await;
            let executor = HttpExecutor::new().unwrap();

            let outcome = executor
                .execute(&format!("{}/target", server.uri()))
                .await;

            assert_eq!(outcome, Outcome::Status(status));
        }
    }

    #[tokio::test]
    async fn malformed_url_is_a_construction_failure() {
        let executor = HttpExecutor::new().unwrap();

        match executor.execute("not a url").await {
            Outcome::Failure(failure) => {
                assert_eq!(failure.kind, FailureKind::Construction);
                assert!(failure.message.contains("not a url"));
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn refused_connection_is_a_transport_failure() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let executor = HttpExecutor::new().unwrap();
        let outcome = executor.execute(&format!("http://{}/", addr)).await;

        match outcome {
            Outcome::Failure(failure) => assert_eq!(failure.kind, FailureKind::Transport),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn slow_response_is_a_timeout_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
            .mount(&server)
            .await;

        let executor = HttpExecutor::with_timeout(Duration::from_millis(100)).unwrap();
        let outcome = executor.execute(&server.uri()).await;

        match outcome {
            Outcome::Failure(failure) => assert_eq!(failure.kind, FailureKind::Timeout),
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn default_timeout_is_ten_seconds() {
        let executor = HttpExecutor::new().unwrap();
        assert_eq!(executor.timeout(), Duration::from_secs(10));
    }
}
