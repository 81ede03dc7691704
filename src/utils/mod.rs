//! Utility modules supporting harvests.
//!
//! - [`HttpTransport`]: `reqwest` client implementing [`Transport`](crate::sources::Transport)
//!
//! # HTTP Transport
//!
//! ```rust,no_run
//! use arxiv_harvest::sources::Transport;
//! use arxiv_harvest::utils::HttpTransport;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = HttpTransport::new()?;
//! let body = transport
//!     .fetch("http://export.arxiv.org/api/query?id_list=2301.12345")
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod http;

pub use http::HttpTransport;
