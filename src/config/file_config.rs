//! Configuration file support for arxiv-harvest.
//!
//! # Configuration File Format
//!
//! ```toml
//! [harvest]
//! base_url = "http://export.arxiv.org/api/query"
//! max_page_size = 2000
//! retry_budget = 10
//! request_delay_secs = 10
//! retry_delay_secs = 60
//! max_rounds = 500
//! request_timeout_secs = 120
//!
//! [output]
//! directory = "./harvest"
//!
//! [logging]
//! level = "info"
//! ```

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use super::{HarvestConfig, ARXIV_API_URL, MAX_PAGE_SIZE, REQUEST_DELAY, RETRY_BUDGET, RETRY_DELAY};

/// Configuration file structure
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Harvest limits and pacing
    #[serde(default)]
    pub harvest: HarvestSection,

    /// Output section
    #[serde(default)]
    pub output: OutputConfig,

    /// Logging section
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// `[harvest]` section
#[derive(Debug, Deserialize)]
pub struct HarvestSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_max_page_size")]
    pub max_page_size: usize,

    #[serde(default = "default_retry_budget")]
    pub retry_budget: u32,

    #[serde(default = "default_request_delay")]
    pub request_delay_secs: u64,

    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default)]
    pub max_rounds: Option<u64>,

    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Default for HarvestSection {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            max_page_size: default_max_page_size(),
            retry_budget: default_retry_budget(),
            request_delay_secs: default_request_delay(),
            retry_delay_secs: default_retry_delay(),
            max_rounds: None,
            request_timeout_secs: None,
        }
    }
}

fn default_base_url() -> String {
    ARXIV_API_URL.to_string()
}

fn default_max_page_size() -> usize {
    MAX_PAGE_SIZE
}

fn default_retry_budget() -> u32 {
    RETRY_BUDGET
}

fn default_request_delay() -> u64 {
    REQUEST_DELAY.as_secs()
}

fn default_retry_delay() -> u64 {
    RETRY_DELAY.as_secs()
}

/// `[output]` section
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Directory artifacts are written to
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl ConfigFile {
    /// Engine configuration described by the `[harvest]` section
    pub fn harvest_config(&self) -> HarvestConfig {
        let section = &self.harvest;
        HarvestConfig::default()
            .base_url(section.base_url.clone())
            .max_page_size(section.max_page_size)
            .retry_budget(section.retry_budget)
            .request_delay(Duration::from_secs(section.request_delay_secs))
            .retry_delay(Duration::from_secs(section.retry_delay_secs))
            .max_rounds(section.max_rounds)
            .request_timeout(section.request_timeout_secs.map(Duration::from_secs))
    }
}

/// Configuration file errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigFileError {
    /// The file is missing or unreadable
    #[error("IO error: {0}")]
    Io(String),

    /// TOML syntax, or a value of the wrong type
    #[error("Parse error: {0}")]
    Parse(String),
}
