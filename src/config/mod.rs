//! Configuration management.
//!
//! [`HarvestConfig`] holds every limit the harvest engine enforces. It is built
//! once, from defaults, an optional TOML file and command-line flags, and then
//! handed to the engine by value.

mod file_config;

pub use file_config::{
    ConfigFile, ConfigFileError, HarvestSection, LoggingConfig, OutputConfig,
};

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::models::{SortBy, SortOrder};

/// Base URL for the arXiv export API
pub const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// Largest page size the API accepts
pub const MAX_PAGE_SIZE: usize = 2000;

/// Consecutive empty responses tolerated before giving up
pub const RETRY_BUDGET: u32 = 10;

/// Pause between two successful requests
pub const REQUEST_DELAY: Duration = Duration::from_secs(10);

/// Pause after the server answers with an empty page
pub const RETRY_DELAY: Duration = Duration::from_secs(60);

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "ARXIV_HARVEST";

/// Limits and pacing for one crawl
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    /// Endpoint the rendered query string is appended to
    pub base_url: String,

    /// Upper bound for `max_results`
    pub max_page_size: usize,

    /// Consecutive empty responses tolerated
    pub retry_budget: u32,

    /// Pause after each successful page
    pub request_delay: Duration,

    /// Pause after an empty response
    pub retry_delay: Duration,

    /// Accepted `sortBy` values
    pub sort_keys: Vec<String>,

    /// Accepted `sortOrder` values
    pub sort_orders: Vec<String>,

    /// Stop after this many fetches even if the source is not exhausted
    pub max_rounds: Option<u64>,

    /// Per-request timeout for the HTTP transport (none by default)
    pub request_timeout: Option<Duration>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: ARXIV_API_URL.to_string(),
            max_page_size: MAX_PAGE_SIZE,
            retry_budget: RETRY_BUDGET,
            request_delay: REQUEST_DELAY,
            retry_delay: RETRY_DELAY,
            sort_keys: SortBy::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            sort_orders: SortOrder::ALL
                .iter()
                .map(|o| o.as_str().to_string())
                .collect(),
            max_rounds: None,
            request_timeout: None,
        }
    }
}

impl HarvestConfig {
    /// Set the API endpoint
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the page size limit
    pub fn max_page_size(mut self, max: usize) -> Self {
        self.max_page_size = max;
        self
    }

    /// Set the retry budget
    pub fn retry_budget(mut self, budget: u32) -> Self {
        self.retry_budget = budget;
        self
    }

    /// Set the pause between successful requests
    pub fn request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    /// Set the pause after an empty response
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = delay;
        self
    }

    /// Cap the number of fetches
    pub fn max_rounds(mut self, rounds: Option<u64>) -> Self {
        self.max_rounds = rounds;
        self
    }

    /// Set the HTTP request timeout
    pub fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Load configuration from an optional file, with `ARXIV_HARVEST_*`
/// environment overrides applied on top.
///
/// Without a file the environment is layered over the built-in defaults.
/// Nested keys use a double underscore, e.g.
/// `ARXIV_HARVEST_HARVEST__RETRY_BUDGET=3`.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, ConfigFileError> {
    let mut builder = config::Config::builder();

    if let Some(path) = path {
        if !path.is_file() {
            return Err(ConfigFileError::Io(format!(
                "{} is not a readable file",
                path.display()
            )));
        }
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .map_err(|e| ConfigFileError::Parse(e.to_string()))?;

    settings
        .try_deserialize()
        .map_err(|e| ConfigFileError::Parse(e.to_string()))
}

/// Look for a configuration file in the default locations.
///
/// Checks `./arxiv-harvest.toml`, then `<config dir>/arxiv-harvest/config.toml`.
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("arxiv-harvest.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("arxiv-harvest").join("config.toml"))
        .filter(|path| path.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let config = HarvestConfig::default();
        assert_eq!(config.max_page_size, 2000);
        assert_eq!(config.retry_budget, 10);
        assert_eq!(config.request_delay, Duration::from_secs(10));
        assert_eq!(config.retry_delay, Duration::from_secs(60));
        assert!(config.retry_delay > config.request_delay);
        assert_eq!(
            config.sort_keys,
            vec!["relevance", "lastUpdatedDate", "submittedDate"]
        );
        assert_eq!(config.sort_orders, vec!["ascending", "descending"]);
        assert!(config.max_rounds.is_none());
    }

    #[test]
    fn test_load_config_layers_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[harvest]
retry_budget = 4
request_delay_secs = 3

[output]
directory = "/tmp/harvest"
"#,
        )
        .unwrap();

        let file = load_config(Some(path.as_path())).unwrap();
        let config = file.harvest_config();
        assert_eq!(config.retry_budget, 4);
        assert_eq!(config.request_delay, Duration::from_secs(3));
        assert_eq!(config.retry_delay, RETRY_DELAY);
        assert_eq!(file.output.directory, PathBuf::from("/tmp/harvest"));
    }

    #[test]
    fn test_load_config_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/arxiv-harvest.toml")));
        assert!(matches!(result, Err(ConfigFileError::Io(_))));
    }
}
