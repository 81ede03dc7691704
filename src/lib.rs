//! # arxiv-harvest
//!
//! Harvest arXiv metadata by walking the paginated export API.
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - [`models`]: Query, Record and Page
//! - [`sources`]: Transport trait, Atom decoding and errors
//! - [`harvest`]: the crawl loop and the two persistence strategies
//! - [`categories`]: arXiv subject classification codes
//! - [`utils`]: HTTP transport
//! - [`config`]: Configuration management
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use arxiv_harvest::{HarvestConfig, Harvester, Query};
//! use arxiv_harvest::models::{SortBy, SortOrder};
//! use arxiv_harvest::utils::HttpTransport;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let transport = Arc::new(HttpTransport::new()?);
//! let harvester = Harvester::new(transport, HarvestConfig::default());
//!
//! let mut query = Query::search("cat:math.GT")
//!     .max_results(1000)
//!     .sort_by(SortBy::SubmittedDate)
//!     .sort_order(SortOrder::Ascending);
//!
//! let report = harvester.harvest_to_file(&mut query, "math_GT.json").await?;
//! println!("{} records", report.records);
//! # Ok(())
//! # }
//! ```

pub mod categories;
pub mod config;
pub mod harvest;
pub mod models;
pub mod sources;
pub mod utils;

// Re-export commonly used types
pub use config::HarvestConfig;
pub use harvest::{HarvestReport, Harvester, StopReason};
pub use models::{Page, Query, Record};
pub use sources::{HarvestError, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
