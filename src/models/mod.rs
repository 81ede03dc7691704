//! Core data models for queries, records and pages.

mod query;
mod record;

pub use query::{Query, SortBy, SortOrder};
pub use record::{Author, Category, Link, Page, Record};
