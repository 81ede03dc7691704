//! Paginated query model for the arXiv export API.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::config::HarvestConfig;
use crate::sources::HarvestError;

/// Sort key accepted by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortBy {
    Relevance,
    LastUpdatedDate,
    SubmittedDate,
}

impl SortBy {
    /// Every sort key, in API order
    pub const ALL: [SortBy; 3] = [
        SortBy::Relevance,
        SortBy::LastUpdatedDate,
        SortBy::SubmittedDate,
    ];

    /// Wire value of the sort key
    pub fn as_str(&self) -> &'static str {
        match self {
            SortBy::Relevance => "relevance",
            SortBy::LastUpdatedDate => "lastUpdatedDate",
            SortBy::SubmittedDate => "submittedDate",
        }
    }
}

impl fmt::Display for SortBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sort direction accepted by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Ascending,
    Descending,
}

impl SortOrder {
    /// Every sort direction, in API order
    pub const ALL: [SortOrder; 2] = [SortOrder::Ascending, SortOrder::Descending];

    /// Wire value of the sort direction
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::Ascending => "ascending",
            SortOrder::Descending => "descending",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A paginated search request.
///
/// Sort key and direction are kept as raw strings so a query read from a file
/// or the command line can be checked against the enumerations configured in
/// [`HarvestConfig`] before anything is sent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    /// Free-text search expression, e.g. `cat:math.GT`
    pub search_query: String,

    /// Explicit arXiv identifiers
    pub id_list: Vec<String>,

    /// Zero-based offset of the first result
    pub start: usize,

    /// Page size
    pub max_results: usize,

    /// Sort key
    pub sort_by: Option<String>,

    /// Sort direction
    pub sort_order: Option<String>,
}

impl Query {
    /// Create a query from a search expression
    pub fn search(expression: impl Into<String>) -> Self {
        Self {
            search_query: expression.into(),
            ..Default::default()
        }
    }

    /// Create a query for a list of identifiers
    pub fn ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            id_list: ids.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    /// Set the start offset
    pub fn start(mut self, start: usize) -> Self {
        self.start = start;
        self
    }

    /// Set the page size
    pub fn max_results(mut self, max: usize) -> Self {
        self.max_results = max;
        self
    }

    /// Set the sort key
    pub fn sort_by(mut self, sort: SortBy) -> Self {
        self.sort_by = Some(sort.as_str().to_string());
        self
    }

    /// Set the sort direction
    pub fn sort_order(mut self, order: SortOrder) -> Self {
        self.sort_order = Some(order.as_str().to_string());
        self
    }

    /// Check the query against the configured limits.
    pub fn validate(&self, config: &HarvestConfig) -> Result<(), HarvestError> {
        if self.search_query.is_empty() && self.id_list.is_empty() {
            return Err(HarvestError::InvalidQuery(
                "neither a search expression nor an id list was given".to_string(),
            ));
        }

        if self.max_results > config.max_page_size {
            return Err(HarvestError::InvalidQuery(format!(
                "max_results {} exceeds the limit of {}",
                self.max_results, config.max_page_size
            )));
        }

        if let Some(sort_by) = &self.sort_by {
            if !config.sort_keys.iter().any(|k| k == sort_by) {
                return Err(HarvestError::InvalidQuery(format!(
                    "unknown sortBy value: {}",
                    sort_by
                )));
            }
        }

        if let Some(sort_order) = &self.sort_order {
            if !config.sort_orders.iter().any(|o| o == sort_order) {
                return Err(HarvestError::InvalidQuery(format!(
                    "unknown sortOrder value: {}",
                    sort_order
                )));
            }
        }

        Ok(())
    }

    /// Render the query string.
    ///
    /// Parameters appear in the order `search_query`, `id_list`, `start`,
    /// `max_results`, `sortBy`, `sortOrder`; empty and zero values are left
    /// out. Values are emitted as given, without percent-encoding.
    pub fn render(&self) -> String {
        let mut params: Vec<String> = Vec::with_capacity(6);

        if !self.search_query.is_empty() {
            params.push(format!("search_query={}", self.search_query));
        }
        if !self.id_list.is_empty() {
            params.push(format!("id_list={}", self.id_list.join(",")));
        }
        if self.start != 0 {
            params.push(format!("start={}", self.start));
        }
        if self.max_results != 0 {
            params.push(format!("max_results={}", self.max_results));
        }
        if let Some(sort_by) = self.sort_by.as_deref().filter(|s| !s.is_empty()) {
            params.push(format!("sortBy={}", sort_by));
        }
        if let Some(sort_order) = self.sort_order.as_deref().filter(|s| !s.is_empty()) {
            params.push(format!("sortOrder={}", sort_order));
        }

        params.join("&")
    }

    /// Full request URL against `base_url`
    pub fn url(&self, base_url: &str) -> String {
        format!("{}?{}", base_url, self.render())
    }

    /// Advance the cursor by one page. The offset saturates at `usize::MAX`.
    pub fn next(&mut self) {
        self.start = self.start.saturating_add(self.max_results);
    }
}
