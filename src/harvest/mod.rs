//! The fetch, classify and advance loop.
//!
//! A crawl is a sequence of rounds. Each round fetches one page for the
//! current cursor and classifies it:
//!
//! 1. transport or decode failure: the crawl ends with that error
//! 2. declared `itemsPerPage` of zero: the server is throttling; back off and
//!    repeat the round, up to the retry budget
//! 3. no records: the source is exhausted
//! 4. otherwise the page goes to the [`PageSink`], the cursor advances and the
//!    engine pauses before the next round
//!
//! Rounds never overlap. The only suspension points besides the fetch itself
//! are the two delays from [`HarvestConfig`].

mod sink;

pub use sink::{Accumulator, ArtifactName, PageSink, PerPageWriter, SinkFlow};

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::time::sleep;

use crate::config::HarvestConfig;
use crate::models::{Page, Query};
use crate::sources::{decode_page, HarvestError, Transport};

/// Cursor position of a round handed to the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Round {
    /// Start offset of the request
    pub start: usize,

    /// Requested page size
    pub page_size: usize,
}

impl Round {
    /// Inclusive end offset, `start + page_size - 1`
    pub fn end(&self) -> usize {
        self.start.saturating_add(self.page_size).saturating_sub(1)
    }
}

/// Why a crawl ended without an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// A page came back without records
    Exhausted,
    /// The sink reported an empty page
    SinkStopped,
    /// Too many consecutive empty responses
    RetryBudgetExceeded,
    /// `max_rounds` fetches were performed
    RoundLimit,
}

/// Summary of a finished crawl
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HarvestReport {
    /// Network fetches performed, retries included
    pub fetches: u64,
    /// Pages accepted by the sink
    pub pages: u64,
    /// Records in accepted pages
    pub records: u64,
    /// Back-offs taken after empty responses
    pub retries: u64,
    /// Cursor after the last accepted page
    pub next_start: usize,
    pub stop: StopReason,
}

/// How a fetched page is handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Throttled,
    Exhausted,
    Records,
}

fn classify(page: &Page) -> Outcome {
    // checked before the record count
    if page.items_per_page == 0 {
        Outcome::Throttled
    } else if page.is_empty() {
        Outcome::Exhausted
    } else {
        Outcome::Records
    }
}

/// Drives a crawl against one [`Transport`]
#[derive(Debug, Clone)]
pub struct Harvester {
    transport: Arc<dyn Transport>,
    config: HarvestConfig,
}

impl Harvester {
    /// Create a harvester with the given transport and limits
    pub fn new(transport: Arc<dyn Transport>, config: HarvestConfig) -> Self {
        Self { transport, config }
    }

    /// Limits this harvester enforces
    pub fn config(&self) -> &HarvestConfig {
        &self.config
    }

    /// Fetch and decode the page for the current cursor
    async fn fetch_page(&self, query: &Query) -> Result<Page, HarvestError> {
        let url = query.url(&self.config.base_url);
        tracing::info!("Downloading {}", url);
        let body = self.transport.fetch(&url).await?;
        decode_page(&body)
    }

    /// Run a crawl to completion, handing every non-empty page to `sink`.
    ///
    /// The query is validated before the first request. On return the
    /// query's cursor points past the last page the sink accepted.
    pub async fn run<S>(&self, query: &mut Query, sink: &mut S) -> Result<HarvestReport, HarvestError>
    where
        S: PageSink + ?Sized,
    {
        query.validate(&self.config)?;

        let mut fetches: u64 = 0;
        let mut pages: u64 = 0;
        let mut records: u64 = 0;
        let mut retries: u64 = 0;
        let mut consecutive_empty: u32 = 0;

        let stop = loop {
            if self.config.max_rounds.is_some_and(|max| fetches >= max) {
                tracing::warn!("Stopping after {} rounds at start={}", fetches, query.start);
                break StopReason::RoundLimit;
            }

            fetches += 1;
            let page = self.fetch_page(query).await?;
            tracing::debug!(
                "start={} itemsPerPage={} totalResults={} entries={}",
                page.start_index,
                page.items_per_page,
                page.total_results,
                page.len()
            );

            match classify(&page) {
                Outcome::Throttled => {
                    if consecutive_empty >= self.config.retry_budget {
                        tracing::warn!(
                            "Giving up at start={} after {} empty responses",
                            query.start,
                            consecutive_empty
                        );
                        break StopReason::RetryBudgetExceeded;
                    }
                    consecutive_empty += 1;
                    retries += 1;
                    tracing::warn!(
                        "Empty response at start={}, retry {}/{} in {:?}",
                        query.start,
                        consecutive_empty,
                        self.config.retry_budget,
                        self.config.retry_delay
                    );
                    sleep(self.config.retry_delay).await;
                    continue;
                }
                Outcome::Exhausted => break StopReason::Exhausted,
                Outcome::Records => {}
            }

            consecutive_empty = 0;
            let round = Round {
                start: query.start,
                page_size: query.max_results,
            };
            let count = page.len() as u64;

            if sink.accept(round, page).await? == SinkFlow::Stop {
                break StopReason::SinkStopped;
            }

            pages += 1;
            records += count;
            query.next();
            sleep(self.config.request_delay).await;
        };

        tracing::info!(
            "Harvest finished ({:?}): {} records in {} pages, {} fetches",
            stop,
            records,
            pages,
            fetches
        );

        Ok(HarvestReport {
            fetches,
            pages,
            records,
            retries,
            next_start: query.start,
            stop,
        })
    }

    /// Harvest everything into memory, then write one JSON array to `path`.
    ///
    /// Nothing is written if the crawl fails, and a failed write loses the
    /// whole crawl.
    pub async fn harvest_to_file(
        &self,
        query: &mut Query,
        path: impl AsRef<Path>,
    ) -> Result<HarvestReport, HarvestError> {
        let mut accumulator = Accumulator::new();
        let report = self.run(query, &mut accumulator).await?;
        accumulator.write_to(path.as_ref()).await?;
        Ok(report)
    }

    /// Harvest page by page, writing one JSON array per page.
    ///
    /// Returns the report and the paths written, in order. Artifacts are
    /// named by the requested bounds, so the page size must be set.
    pub async fn harvest_per_page(
        &self,
        query: &mut Query,
        name: ArtifactName,
    ) -> Result<(HarvestReport, Vec<PathBuf>), HarvestError> {
        if query.max_results == 0 {
            return Err(HarvestError::InvalidQuery(
                "per-page harvesting needs a non-zero max_results".to_string(),
            ));
        }

        let mut writer = PerPageWriter::new(name);
        let report = self.run(query, &mut writer).await?;
        Ok((report, writer.into_written()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SortBy, SortOrder};
    use crate::sources::mock::atom_feed;
    use crate::sources::ScriptedTransport;
    use async_trait::async_trait;
    use std::time::Duration;
    use tempfile::tempdir;
    use tokio::time::Instant;

    /// Sink that remembers what it was given
    #[derive(Default)]
    struct RecordingSink {
        rounds: Vec<Round>,
        sizes: Vec<usize>,
    }

    #[async_trait]
    impl PageSink for RecordingSink {
        async fn accept(&mut self, round: Round, page: Page) -> Result<SinkFlow, HarvestError> {
            self.rounds.push(round);
            self.sizes.push(page.len());
            Ok(SinkFlow::Continue)
        }
    }

    fn config() -> HarvestConfig {
        HarvestConfig::default()
            .request_delay(Duration::from_secs(1))
            .retry_delay(Duration::from_secs(60))
    }

    fn query(page_size: usize) -> Query {
        Query::search("cat:math.GT")
            .max_results(page_size)
            .sort_by(SortBy::SubmittedDate)
            .sort_order(SortOrder::Ascending)
    }

    fn harvester(transport: &Arc<ScriptedTransport>, config: HarvestConfig) -> Harvester {
        Harvester::new(transport.clone(), config)
    }

    #[test]
    fn test_round_end() {
        let round = Round {
            start: 200,
            page_size: 50,
        };
        assert_eq!(round.end(), 249);
        assert_eq!(
            Round {
                start: 0,
                page_size: 0
            }
            .end(),
            0
        );
        assert_eq!(
            Round {
                start: usize::MAX,
                page_size: 10
            }
            .end(),
            usize::MAX - 1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_stops_when_source_is_exhausted() {
        let transport = Arc::new(ScriptedTransport::from_bodies([
            atom_feed(0, 100, 200, 100),
            atom_feed(100, 100, 200, 100),
            atom_feed(200, 100, 200, 0),
        ]));
        let mut query = query(100);
        let mut sink = RecordingSink::default();

        let report = harvester(&transport, config())
            .run(&mut query, &mut sink)
            .await
            .unwrap();

        assert_eq!(transport.fetch_count(), 3);
        assert_eq!(sink.sizes, vec![100, 100]);
        assert_eq!(report.stop, StopReason::Exhausted);
        assert_eq!(report.fetches, 3);
        assert_eq!(report.pages, 2);
        assert_eq!(report.records, 200);
        assert_eq!(query.start, 200);
        assert_eq!(report.next_start, 200);

        let requests = transport.requests();
        assert!(!requests[0].contains("start="));
        assert!(requests[1].contains("&start=100&"));
        assert!(requests[2].contains("&start=200&"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_throttled_responses_until_budget() {
        let transport = Arc::new(ScriptedTransport::from_bodies([atom_feed(0, 0, 0, 0)]));
        let mut query = query(100).start(300);
        let mut sink = RecordingSink::default();
        let config = config().retry_budget(3);
        let retry_delay = config.retry_delay;

        let started = Instant::now();
        let report = harvester(&transport, config)
            .run(&mut query, &mut sink)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert_eq!(transport.fetch_count(), 4);
        assert!(sink.rounds.is_empty());
        assert_eq!(query.start, 300);
        assert_eq!(report.stop, StopReason::RetryBudgetExceeded);
        assert_eq!(report.retries, 3);
        assert!(elapsed >= retry_delay * 3);
        assert!(elapsed < retry_delay * 4);
        assert!(transport.requests().iter().all(|url| url.contains("start=300")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_counter_resets_after_success() {
        let transport = Arc::new(ScriptedTransport::from_bodies([
            atom_feed(0, 0, 0, 0),
            atom_feed(0, 0, 0, 0),
            atom_feed(0, 10, 30, 10),
            atom_feed(0, 0, 0, 0),
            atom_feed(0, 0, 0, 0),
            atom_feed(10, 10, 30, 10),
            atom_feed(20, 10, 30, 0),
        ]));
        let mut query = query(10);
        let mut sink = RecordingSink::default();

        let report = harvester(&transport, config().retry_budget(2))
            .run(&mut query, &mut sink)
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::Exhausted);
        assert_eq!(report.retries, 4);
        assert_eq!(report.pages, 2);
        assert_eq!(transport.fetch_count(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_terminal() {
        let failure = HarvestError::Transport("connection reset by peer".to_string());
        let transport = Arc::new(ScriptedTransport::new(vec![
            Ok(atom_feed(0, 100, 1000, 100).into_bytes()),
            Err(failure.clone()),
            Ok(atom_feed(200, 100, 1000, 100).into_bytes()),
        ]));
        let mut query = query(100);
        let mut sink = RecordingSink::default();

        let err = harvester(&transport, config())
            .run(&mut query, &mut sink)
            .await
            .unwrap_err();

        assert_eq!(err, failure);
        assert_eq!(sink.rounds.len(), 1);
        assert_eq!(query.start, 100);
        assert_eq!(transport.fetch_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_decode_error_is_terminal() {
        let transport = Arc::new(ScriptedTransport::from_bodies(["<feed><entry>"]));
        let mut query = query(100);
        let mut sink = RecordingSink::default();

        let err = harvester(&transport, config())
            .run(&mut query, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::Decode(_)));
        assert_eq!(transport.fetch_count(), 1);
        assert!(sink.rounds.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_feed_body_is_terminal_not_throttling() {
        let transport = Arc::new(ScriptedTransport::from_bodies(["Rate exceeded."]));
        let mut query = query(100);
        let mut sink = RecordingSink::default();

        let err = harvester(&transport, config().retry_budget(3))
            .run(&mut query, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::Decode(_)));
        assert_eq!(transport.fetch_count(), 1);
        assert!(sink.rounds.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_whole_run_write_failure_fails_harvest() {
        let transport = Arc::new(ScriptedTransport::from_bodies([
            atom_feed(0, 10, 10, 10),
            atom_feed(10, 10, 10, 0),
        ]));
        let dir = tempdir().unwrap();
        let mut query = query(10);

        // the target is an existing directory, so only the final write fails
        let err = harvester(&transport, config())
            .harvest_to_file(&mut query, dir.path())
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::Persistence(_)));
        assert_eq!(transport.fetch_count(), 2);
        assert_eq!(query.start, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_page_requires_page_size() {
        let transport = Arc::new(ScriptedTransport::from_bodies([atom_feed(0, 10, 10, 10)]));
        let dir = tempdir().unwrap();
        let pattern = dir.path().join("{start}-{end}.json");
        let name = ArtifactName::new(pattern.to_string_lossy()).unwrap();
        let mut query = query(0).start(200);

        let err = harvester(&transport, config())
            .harvest_per_page(&mut query, name)
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::InvalidQuery(_)));
        assert_eq!(transport.fetch_count(), 0);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_invalid_query_fails_before_fetching() {
        let transport = Arc::new(ScriptedTransport::from_bodies([atom_feed(0, 10, 10, 10)]));
        let mut query = Query::default().max_results(10);
        let mut sink = RecordingSink::default();

        let err = harvester(&transport, config())
            .run(&mut query, &mut sink)
            .await
            .unwrap_err();

        assert!(matches!(err, HarvestError::InvalidQuery(_)));
        assert_eq!(transport.fetch_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_paces_successful_rounds() {
        let transport = Arc::new(ScriptedTransport::from_bodies([
            atom_feed(0, 5, 10, 5),
            atom_feed(5, 5, 10, 5),
            atom_feed(10, 5, 10, 0),
        ]));
        let mut query = query(5);
        let mut sink = RecordingSink::default();
        let config = config().request_delay(Duration::from_secs(10));

        let started = Instant::now();
        harvester(&transport, config)
            .run(&mut query, &mut sink)
            .await
            .unwrap();
        let elapsed = started.elapsed();

        assert!(elapsed >= Duration::from_secs(20));
        assert!(elapsed < Duration::from_secs(30));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cursor_advances_by_page_size_not_record_count() {
        let transport = Arc::new(ScriptedTransport::from_bodies([
            atom_feed(0, 100, 1000, 37),
            atom_feed(100, 100, 1000, 0),
        ]));
        let mut query = query(100);
        let mut sink = RecordingSink::default();

        harvester(&transport, config())
            .run(&mut query, &mut sink)
            .await
            .unwrap();

        assert_eq!(sink.sizes, vec![37]);
        assert_eq!(query.start, 100);
        assert!(transport.requests()[1].contains("start=100"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_round_limit() {
        let transport = Arc::new(ScriptedTransport::from_bodies([atom_feed(0, 10, 1000, 10)]));
        let mut query = query(10);
        let mut sink = RecordingSink::default();

        let report = harvester(&transport, config().max_rounds(Some(3)))
            .run(&mut query, &mut sink)
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::RoundLimit);
        assert_eq!(transport.fetch_count(), 3);
        assert_eq!(sink.rounds.len(), 3);
        assert_eq!(query.start, 30);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_stop_ends_crawl_without_advancing() {
        struct StopImmediately;

        #[async_trait]
        impl PageSink for StopImmediately {
            async fn accept(&mut self, _round: Round, _page: Page) -> Result<SinkFlow, HarvestError> {
                Ok(SinkFlow::Stop)
            }
        }

        let transport = Arc::new(ScriptedTransport::from_bodies([atom_feed(0, 10, 100, 10)]));
        let mut query = query(10);

        let report = harvester(&transport, config())
            .run(&mut query, &mut StopImmediately)
            .await
            .unwrap();

        assert_eq!(report.stop, StopReason::SinkStopped);
        assert_eq!(report.pages, 0);
        assert_eq!(query.start, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sink_error_propagates() {
        struct FailingSink;

        #[async_trait]
        impl PageSink for FailingSink {
            async fn accept(&mut self, _round: Round, _page: Page) -> Result<SinkFlow, HarvestError> {
                Err(HarvestError::Persistence("disk full".to_string()))
            }
        }

        let transport = Arc::new(ScriptedTransport::from_bodies([atom_feed(0, 10, 100, 10)]));
        let mut query = query(10);

        let err = harvester(&transport, config())
            .run(&mut query, &mut FailingSink)
            .await
            .unwrap_err();

        assert_eq!(err, HarvestError::Persistence("disk full".to_string()));
        assert_eq!(query.start, 0);
        assert_eq!(transport.fetch_count(), 1);
    }

    #[test]
    fn test_classify_prefers_throttle_signal() {
        let page = Page {
            records: vec![Default::default()],
            items_per_page: 0,
            ..Default::default()
        };
        assert_eq!(classify(&page), Outcome::Throttled);

        let page = Page {
            items_per_page: 10,
            ..Default::default()
        };
        assert_eq!(classify(&page), Outcome::Exhausted);
    }
}
