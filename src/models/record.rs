//! Harvested records and the decoded page that carries them.

use serde::{Deserialize, Serialize};

/// One arXiv entry.
///
/// Field names in the serialized form match the JSON dumps produced by earlier
/// harvests, so old and new artifacts can be concatenated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    /// Abstract page URL, e.g. `http://arxiv.org/abs/2301.12345v1`
    pub id: String,

    pub updated: String,

    pub published: String,

    pub title: String,

    /// Abstract text
    pub summary: String,

    pub authors: Vec<Author>,

    /// Author comment (page counts, figures, ...)
    pub comment: String,

    pub doi: String,

    pub journal_ref: String,

    pub primary_category: Category,

    pub categories: Vec<Category>,

    #[serde(rename = "link")]
    pub links: Vec<Link>,
}

/// Record author
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub affiliation: String,
}

/// Subject classification term (arXiv, MSC or ACM class)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Category {
    pub name: String,
}

impl Category {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Link to the abstract page, PDF, DOI, ...
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Link {
    pub title: String,
    pub href: String,
    pub rel: String,
}

/// Result of decoding one API response
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    /// Entries in response order
    pub records: Vec<Record>,

    /// `opensearch:itemsPerPage` as declared by the server
    pub items_per_page: usize,

    /// `opensearch:totalResults`
    pub total_results: usize,

    /// `opensearch:startIndex`
    pub start_index: usize,
}

impl Page {
    /// Whether the page carries no records
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of records on the page
    pub fn len(&self) -> usize {
        self.records.len()
    }
}
