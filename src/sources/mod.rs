//! Fetching and decoding pages from the arXiv export API.
//!
//! The harvest engine talks to the network only through the [`Transport`]
//! trait, and turns response bodies into pages with [`decode_page`]. Swapping
//! the transport is how tests drive the engine with scripted responses.
//!
//! - [`HttpTransport`](crate::utils::HttpTransport): `reqwest`-backed transport used by the binary
//! - [`ScriptedTransport`]: replays canned responses, records requested URLs
//! - [`decode_page`]: Atom feed to [`Page`](crate::models::Page)

mod arxiv;
pub mod mock;

pub use arxiv::{decode_page, normalize_id};
pub use mock::ScriptedTransport;

use async_trait::async_trait;

/// Fetches one request URL.
///
/// Implementations perform exactly one request per call and never retry on
/// their own. Retry policy belongs to the harvest engine.
#[async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Fetch `url` and return the raw response body
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, HarvestError>;
}

/// Failure class of a [`HarvestError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidQuery,
    Transport,
    Decode,
    Persistence,
}

/// Errors that can end a crawl
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HarvestError {
    /// The query failed validation; nothing was sent
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Network failure or non-success HTTP status
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be decoded
    #[error("Decode error: {0}")]
    Decode(String),

    /// Artifact could not be serialized or written
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl HarvestError {
    /// Failure class, for callers that branch on it
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarvestError::InvalidQuery(_) => ErrorKind::InvalidQuery,
            HarvestError::Transport(_) => ErrorKind::Transport,
            HarvestError::Decode(_) => ErrorKind::Decode,
            HarvestError::Persistence(_) => ErrorKind::Persistence,
        }
    }
}

impl From<reqwest::Error> for HarvestError {
    fn from(err: reqwest::Error) -> Self {
        HarvestError::Transport(err.to_string())
    }
}

impl From<quick_xml::Error> for HarvestError {
    fn from(err: quick_xml::Error) -> Self {
        HarvestError::Decode(format!("XML: {}", err))
    }
}

impl From<serde_json::Error> for HarvestError {
    fn from(err: serde_json::Error) -> Self {
        HarvestError::Persistence(format!("JSON: {}", err))
    }
}

impl From<std::io::Error> for HarvestError {
    fn from(err: std::io::Error) -> Self {
        HarvestError::Persistence(err.to_string())
    }
}
