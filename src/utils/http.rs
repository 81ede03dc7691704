//! HTTP transport backed by `reqwest`.

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::sources::{HarvestError, Transport};

/// Shared HTTP client performing one GET per fetch
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Arc<Client>,
}

impl HttpTransport {
    /// Create a transport with the default user agent and no request timeout
    pub fn new() -> Result<Self, HarvestError> {
        Self::with_timeout(None)
    }

    /// Create a transport, optionally bounding each request
    pub fn with_timeout(timeout: Option<Duration>) -> Result<Self, HarvestError> {
        let mut builder = Client::builder()
            .user_agent(concat!(
                env!("CARGO_PKG_NAME"),
                "/",
                env!("CARGO_PKG_VERSION")
            ))
            .connect_timeout(Duration::from_secs(10))
            .pool_idle_timeout(Duration::from_secs(90));

        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| HarvestError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client: Arc::new(client),
        })
    }

    /// Create from an existing reqwest Client
    pub fn from_client(client: Arc<Client>) -> Self {
        Self { client }
    }

    /// Get the underlying client
    pub fn client(&self) -> &Client {
        &self.client
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/atom+xml")
            .send()
            .await
            .map_err(|e| HarvestError::Transport(format!("Failed to fetch {}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::Transport(format!(
                "{} returned status: {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| HarvestError::Transport(format!("Failed to read response: {}", e)))?;

        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fetch_returns_body() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body("<feed/>")
            .create_async()
            .await;

        let transport = HttpTransport::new().unwrap();
        let url = format!("{}/api/query?id_list=2301.12345", server.url());
        let body = transport.fetch(&url).await.unwrap();

        assert_eq!(body, b"<feed/>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_non_success_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/query")
            .with_status(503)
            .create_async()
            .await;

        let transport = HttpTransport::new().unwrap();
        let url = format!("{}/api/query", server.url());
        let err = transport.fetch(&url).await.unwrap_err();

        assert!(matches!(err, HarvestError::Transport(ref msg) if msg.contains("503")));
    }

    #[tokio::test]
    async fn test_fetch_connection_refused() {
        let transport = HttpTransport::new().unwrap();
        // port 9 (discard) is not expected to be listening
        let err = transport
            .fetch("http://127.0.0.1:9/api/query")
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::sources::ErrorKind::Transport);
    }
}
