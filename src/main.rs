use anyhow::{bail, Context, Result};
use arxiv_harvest::categories::{self, CATEGORIES};
use arxiv_harvest::config::{find_config_file, load_config};
use arxiv_harvest::harvest::{Accumulator, ArtifactName, PageSink, PerPageWriter, Round, SinkFlow};
use arxiv_harvest::models::{Page, Query, SortBy, SortOrder};
use arxiv_harvest::sources::{normalize_id, HarvestError};
use arxiv_harvest::utils::HttpTransport;
use arxiv_harvest::{HarvestReport, Harvester};
use async_trait::async_trait;
use clap::{ArgGroup, Parser, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// arxiv-harvest - Download arXiv metadata for a whole category, query or id list
#[derive(Parser, Debug)]
#[command(name = "arxiv-harvest")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Download arXiv metadata for a whole category, query or id list", long_about = None)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .multiple(true)
        .args(["cat", "query", "ids", "list_categories"])
))]
struct Cli {
    /// Category to harvest (e.g. math.GT, cs.AI)
    #[arg(long)]
    cat: Option<String>,

    /// Raw search expression, combined with --cat using AND
    #[arg(long)]
    query: Option<String>,

    /// arXiv identifier to fetch (can be repeated)
    #[arg(long = "id", value_name = "ID")]
    ids: Vec<String>,

    /// Accept a category that is not in the built-in catalog
    #[arg(long)]
    allow_unknown: bool,

    /// Seconds to wait between requests (default: 10, or the config file)
    #[arg(long)]
    wait: Option<u64>,

    /// Number of entries for each request
    #[arg(long, default_value_t = 1000)]
    step: usize,

    /// Offset of the first entry
    #[arg(long, default_value_t = 0)]
    start: usize,

    /// Sort by field
    #[arg(long, value_enum, default_value_t = SortField::Submitted)]
    sort_by: SortField,

    /// Sort order
    #[arg(long, value_enum, default_value_t = Order::Asc)]
    sort_order: Order,

    /// Write everything at the end, or one file per page
    #[arg(long, value_enum, default_value_t = Mode::Whole)]
    mode: Mode,

    /// Output file (whole mode) or pattern with {start} and {end} (per-page mode)
    #[arg(long, short)]
    output: Option<String>,

    /// Stop after this many requests
    #[arg(long)]
    max_rounds: Option<u64>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    /// Print the known categories and exit
    #[arg(long)]
    list_categories: bool,
}

/// Sort field for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum SortField {
    /// Sort by relevance
    Relevance,
    /// Sort by last update
    Updated,
    /// Sort by submission date
    Submitted,
}

/// Sort order
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Order {
    /// Ascending order
    Asc,
    /// Descending order
    Desc,
}

/// Persistence strategy
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Mode {
    /// Keep everything in memory and write one file at the end
    Whole,
    /// Write one file per page as it arrives
    PerPage,
}

/// Sink decorator that keeps a spinner up to date
struct Progress<'a, S: ?Sized> {
    inner: &'a mut S,
    bar: ProgressBar,
    records: usize,
}

impl<'a, S: ?Sized> Progress<'a, S> {
    fn new(inner: &'a mut S, bar: ProgressBar) -> Self {
        Self {
            inner,
            bar,
            records: 0,
        }
    }
}

#[async_trait]
impl<'a, S> PageSink for Progress<'a, S>
where
    S: PageSink + ?Sized,
{
    async fn accept(&mut self, round: Round, page: Page) -> Result<SinkFlow, HarvestError> {
        let count = page.len();
        let total = page.total_results;
        let flow = self.inner.accept(round, page).await?;
        self.records += count;
        self.bar.set_message(format!(
            "{} records, last page {}-{} of {}",
            self.records,
            round.start,
            round.end(),
            total
        ));
        Ok(flow)
    }
}

fn spinner(hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let bar = ProgressBar::new_spinner();
    bar.set_style(ProgressStyle::with_template(
        "{spinner} [{elapsed_precise}] {msg}",
    )?);
    bar.enable_steady_tick(Duration::from_millis(200));
    Ok(bar)
}

/// Build the initial query from the command line
fn build_query(cli: &Cli) -> Result<Query> {
    let mut terms = Vec::new();

    if let Some(cat) = &cli.cat {
        if !cli.allow_unknown && !categories::is_known_category(cat) {
            bail!(
                "Unknown category {:?}; see --list-categories or pass --allow-unknown",
                cat
            );
        }
        terms.push(categories::category_query(cat));
    }
    if let Some(expr) = &cli.query {
        terms.push(expr.clone());
    }

    let id_list = cli
        .ids
        .iter()
        .map(|id| normalize_id(id))
        .collect::<Result<Vec<_>, _>>()?;

    let query = Query {
        search_query: terms.join(" AND "),
        id_list,
        ..Default::default()
    };

    Ok(query
        .start(cli.start)
        .max_results(cli.step)
        .sort_by(match cli.sort_by {
            SortField::Relevance => SortBy::Relevance,
            SortField::Updated => SortBy::LastUpdatedDate,
            SortField::Submitted => SortBy::SubmittedDate,
        })
        .sort_order(match cli.sort_order {
            Order::Asc => SortOrder::Ascending,
            Order::Desc => SortOrder::Descending,
        }))
}

/// Stem used in default output names
fn output_stem(cli: &Cli) -> String {
    match (&cli.cat, &cli.query) {
        (Some(cat), _) => categories::file_stem(cat),
        (None, Some(_)) => "query".to_string(),
        (None, None) => "ids".to_string(),
    }
}

/// Per-page artifact pattern from `--output`, or the default for `stem`
fn artifact_name(output: Option<&str>, stem: &str, directory: &Path) -> Result<ArtifactName> {
    let pattern = match output {
        Some(pattern) => {
            if !pattern.contains(ArtifactName::START) || !pattern.contains(ArtifactName::END) {
                bail!(
                    "--output {:?} must contain {} and {} in per-page mode",
                    pattern,
                    ArtifactName::START,
                    ArtifactName::END
                );
            }
            pattern.to_string()
        }
        None => format!("data_{}_{{start}}-{{end}}.json", stem),
    };
    Ok(ArtifactName::new(directory.join(pattern).to_string_lossy())?)
}

fn print_summary(report: &HarvestReport) {
    println!(
        "Harvested {} records in {} pages ({} requests, {} retries), stopped: {:?}, next start: {}",
        report.records,
        report.pages,
        report.fetches,
        report.retries,
        report.stop,
        report.next_start
    );
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.list_categories {
        for code in CATEGORIES {
            println!("{}", code);
        }
        return Ok(());
    }

    // Config file (explicit or discovered) under ARXIV_HARVEST_* overrides
    let config_path = cli.config.clone().or_else(find_config_file);
    let file = load_config(config_path.as_deref()).with_context(|| match &config_path {
        Some(path) => format!("Failed to load config file {}", path.display()),
        None => "Failed to read configuration from the environment".to_string(),
    })?;

    // Initialize tracing based on verbosity
    let log_level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => file.logging.level.as_str(),
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("arxiv_harvest={}", log_level)),
    );
    let registry = tracing_subscriber::registry().with(filter);
    if cli.log_json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }

    if let Some(path) = &config_path {
        tracing::info!("Using config file: {}", path.display());
    }

    let mut config = file.harvest_config();
    if let Some(wait) = cli.wait {
        config = config.request_delay(Duration::from_secs(wait));
    }
    if cli.max_rounds.is_some() {
        config = config.max_rounds(cli.max_rounds);
    }

    let mut query = build_query(&cli)?;
    let transport = Arc::new(HttpTransport::with_timeout(config.request_timeout)?);
    let harvester = Harvester::new(transport, config);

    let bar = spinner(cli.quiet || !std::io::stderr().is_terminal())?;
    let stem = output_stem(&cli);

    match cli.mode {
        Mode::Whole => {
            let name = cli.output.clone().unwrap_or_else(|| {
                format!("data_{}_{}.json", stem, chrono::Utc::now().timestamp())
            });
            let path = file.output.directory.join(name);

            let mut accumulator = Accumulator::new();
            let result = {
                let mut progress = Progress::new(&mut accumulator, bar.clone());
                harvester.run(&mut query, &mut progress).await
            };
            let report =
                result.with_context(|| format!("Harvest failed at start={}", query.start))?;
            bar.finish_and_clear();

            accumulator
                .write_to(&path)
                .await
                .with_context(|| format!("Failed to save {} records", accumulator.records().len()))?;

            if !cli.quiet {
                print_summary(&report);
                println!("Saved to {}", path.display());
            }
        }
        Mode::PerPage => {
            let name = artifact_name(cli.output.as_deref(), &stem, &file.output.directory)?;

            let mut writer = PerPageWriter::new(name);
            let result = {
                let mut progress = Progress::new(&mut writer, bar.clone());
                harvester.run(&mut query, &mut progress).await
            };
            let report = result.with_context(|| {
                format!(
                    "Harvest failed at start={} after writing {} files",
                    query.start,
                    writer.written().len()
                )
            })?;
            bar.finish_and_clear();

            if !cli.quiet {
                print_summary(&report);
                println!("Wrote {} files", writer.written().len());
            }
        }
    }

    Ok(())
}
