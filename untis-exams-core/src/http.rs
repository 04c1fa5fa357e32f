use std::time::Duration;

use reqwest::{
    Client, ClientBuilder, Response,
    header::{self, HeaderMap, HeaderValue},
};

use crate::{Error, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const USER_AGENT: &str = concat!("untis-exams/", env!("CARGO_PKG_VERSION"));

/// Builds the shared HTTP client used by sessions, school search and the
/// calendar backend.
pub struct HttpClientBuilder {
    pub client_builder: ClientBuilder,
}

impl HttpClientBuilder {
    pub fn new() -> Self {
        let client_builder = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .default_headers({
                let mut headers = HeaderMap::new();
                headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
                headers.insert(
                    header::ACCEPT_ENCODING,
                    HeaderValue::from_static("br;q=1.0, gzip;q=0.9, deflate;q=0.8"),
                );
                headers
            });

        Self { client_builder }
    }

    /// Per-request timeout. An elapsed timeout surfaces as [`Error::Timeout`]
    /// and leaves any session state untouched.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.client_builder = self.client_builder.timeout(timeout);
        self
    }

    pub fn user_agent(mut self, user_agent: &str) -> Self {
        self.client_builder = self.client_builder.user_agent(user_agent.to_string());
        self
    }

    pub fn build(self) -> Result<Client> {
        self.client_builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {e}")))
    }
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps transport failures, separating timeouts from everything else.
pub(crate) fn handle_error_req(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Http(error)
    }
}

/// Turns a non-2xx response into [`Error::HttpStatus`], keeping the body for
/// the error message.
pub(crate) async fn ensure_success(endpoint: &'static str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(Error::HttpStatus {
        endpoint,
        status,
        body,
    })
}
