//! Persistence strategies for harvested pages.
//!
//! - [`Accumulator`]: keep every record in memory, write once at the end
//! - [`PerPageWriter`]: write each page to its own file as it arrives

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use super::Round;
use crate::models::{Page, Record};
use crate::sources::HarvestError;

/// Whether the engine should keep going after a page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SinkFlow {
    Continue,
    /// Treated by the engine exactly like an exhausted source
    Stop,
}

/// Receives every non-empty page of a crawl, in order
#[async_trait]
pub trait PageSink: Send {
    /// Take ownership of one page fetched for `round`
    async fn accept(&mut self, round: Round, page: Page) -> Result<SinkFlow, HarvestError>;
}

/// Serialize records as a compact JSON array and write them to `path`,
/// creating missing parent directories.
pub(crate) async fn write_records(path: &Path, records: &[Record]) -> Result<(), HarvestError> {
    let json = serde_json::to_vec(records)?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            HarvestError::Persistence(format!("Failed to create {}: {}", parent.display(), e))
        })?;
    }

    tokio::fs::write(path, json)
        .await
        .map_err(|e| HarvestError::Persistence(format!("Failed to write {}: {}", path.display(), e)))
}

/// Whole-run strategy: buffer every record, write one artifact at the end
#[derive(Debug, Default)]
pub struct Accumulator {
    records: Vec<Record>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records collected so far, in crawl order
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn into_records(self) -> Vec<Record> {
        self.records
    }

    /// Write everything collected as one JSON array
    pub async fn write_to(&self, path: &Path) -> Result<(), HarvestError> {
        write_records(path, &self.records).await?;
        tracing::info!("Wrote {} records to {}", self.records.len(), path.display());
        Ok(())
    }
}

#[async_trait]
impl PageSink for Accumulator {
    async fn accept(&mut self, _round: Round, page: Page) -> Result<SinkFlow, HarvestError> {
        self.records.extend(page.records);
        Ok(SinkFlow::Continue)
    }
}

/// File name pattern for per-page artifacts.
///
/// The pattern must contain both `{start}` and `{end}`; they are replaced by
/// the round's start offset and `start + page_size - 1`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pattern: String,
}

impl ArtifactName {
    pub const START: &'static str = "{start}";
    pub const END: &'static str = "{end}";

    /// Parse a pattern such as `dumps/math_GT_{start}-{end}.json`
    pub fn new(pattern: impl Into<String>) -> Result<Self, HarvestError> {
        let pattern = pattern.into();
        if !pattern.contains(Self::START) || !pattern.contains(Self::END) {
            return Err(HarvestError::Persistence(format!(
                "Artifact pattern {:?} must contain {} and {}",
                pattern,
                Self::START,
                Self::END
            )));
        }
        Ok(Self { pattern })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// File name for a page covering `start..=end`
    pub fn render(&self, start: usize, end: usize) -> PathBuf {
        PathBuf::from(
            self.pattern
                .replace(Self::START, &start.to_string())
                .replace(Self::END, &end.to_string()),
        )
    }
}

/// Per-page strategy: one artifact per round, written as soon as it arrives
#[derive(Debug)]
pub struct PerPageWriter {
    name: ArtifactName,
    written: Vec<PathBuf>,
}

impl PerPageWriter {
    pub fn new(name: ArtifactName) -> Self {
        Self {
            name,
            written: Vec::new(),
        }
    }

    /// Paths written so far, in crawl order
    pub fn written(&self) -> &[PathBuf] {
        &self.written
    }

    pub fn into_written(self) -> Vec<PathBuf> {
        self.written
    }
}

#[async_trait]
impl PageSink for PerPageWriter {
    async fn accept(&mut self, round: Round, page: Page) -> Result<SinkFlow, HarvestError> {
        if page.is_empty() {
            return Ok(SinkFlow::Stop);
        }

        let path = self.name.render(round.start, round.end());
        write_records(&path, &page.records).await?;
        tracing::info!("Wrote {} records to {}", page.len(), path.display());
        self.written.push(path);
        Ok(SinkFlow::Continue)
    }
}
