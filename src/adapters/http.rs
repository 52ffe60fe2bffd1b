use crate::domain::ports::{FetchError, ServiceClient};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub const DEFAULT_USER_AGENT: &str = concat!("bulk-nominatim/", env!("CARGO_PKG_VERSION"));

/// Plain GET client for a Nominatim-compatible service.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
}

impl NominatimClient {
    pub fn new(user_agent: &str, timeout: Option<Duration>) -> Result<Self> {
        let mut builder = Client::builder().user_agent(user_agent);
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait]
impl ServiceClient for NominatimClient {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(describe_transport_error(&e)))?;

        let status = response.status();
        tracing::debug!("Service response status: {}", status);
        if !status.is_success() {
            return Err(FetchError::Status(describe_status(status)));
        }

        response
            .text()
            .await
            .map_err(|e| FetchError::Transport(describe_transport_error(&e)))
    }
}

pub fn describe_status(status: StatusCode) -> String {
    match status {
        StatusCode::TOO_MANY_REQUESTS => {
            "HTTP 429 Too Many Requests: the service is rate limiting this client".to_string()
        }
        StatusCode::FORBIDDEN => {
            "HTTP 403 Forbidden: access denied, check the usage policy and user agent".to_string()
        }
        _ => format!(
            "HTTP {} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        ),
    }
}

/// Human-readable text for a request that never produced a response.
pub fn describe_transport_error(err: &reqwest::Error) -> String {
    let kind = if err.is_timeout() {
        "The connection to the remote server timed out"
    } else if err.is_connect() {
        "The remote server refused the connection or could not be reached"
    } else if err.is_redirect() {
        "Too many redirects or an invalid redirect"
    } else if err.is_builder() {
        "The request URL is invalid"
    } else if err.is_body() || err.is_decode() {
        "The response body could not be read"
    } else if err.is_request() {
        "The request could not be sent"
    } else {
        "An unknown network error was detected"
    };
    format!("{} ({})", kind, err)
}
