use crate::infra::{PlatformSnapshot, SnapshotPlatform};
use crate::report::{OutputFormat, ScoreReport};
use adler_scoring::config::AppConfig;
use adler_scoring::error::AppError;
use adler_scoring::housekeeping::{
    CleanupSummary, HousekeepingError, PlatformEvent, ScoreHousekeeper,
};
use adler_scoring::scoring::{
    resolve_user, BatchOptions, BatchScoreAggregator, ConcurrentBatchScorer, ContainerId,
    ElementId, Oracles, UserId,
};
use chrono::{DateTime, Utc};
use clap::{ArgGroup, Args};
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct SnapshotArgs {
    /// Platform snapshot (JSON) to read scores and records from
    #[arg(long)]
    pub(crate) snapshot: PathBuf,
}

#[derive(Args, Debug)]
pub(crate) struct ScoresArgs {
    #[command(flatten)]
    pub(crate) source: SnapshotArgs,
    /// Comma-separated element ids
    #[arg(long, value_delimiter = ',', required = true)]
    pub(crate) elements: Vec<i64>,
    /// User to score; defaults to ADLER_DEFAULT_USER
    #[arg(long)]
    pub(crate) user: Option<i64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug)]
pub(crate) struct ElementArgs {
    #[command(flatten)]
    pub(crate) source: SnapshotArgs,
    #[arg(long)]
    pub(crate) element: i64,
    /// User to score; defaults to ADLER_DEFAULT_USER
    #[arg(long)]
    pub(crate) user: Option<i64>,
    #[arg(long, value_enum, default_value_t = OutputFormat::Json)]
    pub(crate) format: OutputFormat,
}

#[derive(Args, Debug)]
#[command(group(
    ArgGroup::new("target")
        .required(true)
        .multiple(true)
        .args(["container", "element", "orphans"])
))]
pub(crate) struct CleanupArgs {
    #[command(flatten)]
    pub(crate) source: SnapshotArgs,
    /// Deleted course, or the course that owned the deleted element
    #[arg(long)]
    pub(crate) container: Option<i64>,
    /// Deleted course module
    #[arg(long, requires = "container")]
    pub(crate) element: Option<i64>,
    /// Only purge score records whose element no longer exists
    #[arg(long, conflicts_with_all = ["container", "element"])]
    pub(crate) orphans: bool,
    /// Persist the cleaned snapshot back to disk
    #[arg(long)]
    pub(crate) write: bool,
}

impl CleanupArgs {
    /// `None` means a plain orphan sweep.
    fn event(&self) -> Option<PlatformEvent> {
        match (self.container, self.element) {
            (Some(container), Some(element)) => Some(PlatformEvent::ElementDeleted {
                element_id: ElementId(element),
                container_id: ContainerId(container),
            }),
            (Some(container), None) => Some(PlatformEvent::ContainerDeleted {
                container_id: ContainerId(container),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct CleanupReport {
    pub(crate) generated_at: DateTime<Utc>,
    #[serde(flatten)]
    pub(crate) summary: CleanupSummary,
    pub(crate) written: bool,
}

fn open(source: &SnapshotArgs) -> Result<Arc<SnapshotPlatform>, AppError> {
    let snapshot = PlatformSnapshot::load(&source.snapshot)?;
    Ok(Arc::new(SnapshotPlatform::new(snapshot)))
}

pub(crate) async fn run_scores<W: Write>(
    args: ScoresArgs,
    config: &AppConfig,
    out: W,
) -> Result<(), AppError> {
    let user = resolve_user(args.user.map(UserId), &config.default_user)?;
    let platform = open(&args.source)?;
    let report = score_batch(
        platform,
        &args.elements,
        user,
        BatchOptions::from(&config.scoring),
    )
    .await?;
    report.write(args.format, out)?;
    Ok(())
}

pub(crate) async fn score_batch(
    platform: Arc<SnapshotPlatform>,
    elements: &[i64],
    user: UserId,
    options: BatchOptions,
) -> Result<ScoreReport, AppError> {
    let aggregator = Arc::new(BatchScoreAggregator::new(Oracles::from_platform(platform)));
    let scorer = ConcurrentBatchScorer::new(aggregator, options);
    let scores = scorer
        .scores_for(elements.iter().copied().map(ElementId), user)
        .await?;
    Ok(ScoreReport::from_batch(user, &scores, Utc::now()))
}

pub(crate) fn run_element<W: Write>(
    args: ElementArgs,
    config: &AppConfig,
    out: W,
) -> Result<(), AppError> {
    let user = resolve_user(args.user.map(UserId), &config.default_user)?;
    let platform = open(&args.source)?;
    let report = score_element(platform, ElementId(args.element), user)?;
    report.write(args.format, out)?;
    Ok(())
}

pub(crate) fn score_element(
    platform: Arc<SnapshotPlatform>,
    element_id: ElementId,
    user: UserId,
) -> Result<ScoreReport, AppError> {
    let aggregator = BatchScoreAggregator::new(Oracles::from_platform(platform));
    let score = aggregator.score_one(element_id, user)?;
    Ok(ScoreReport::single(user, element_id, score, Utc::now()))
}

pub(crate) fn run_cleanup<W: Write>(args: CleanupArgs, mut out: W) -> Result<(), AppError> {
    let platform = open(&args.source)?;
    let summary = clean_up(Arc::clone(&platform), args.event())?;

    if args.write {
        let snapshot = platform.snapshot().map_err(HousekeepingError::from)?;
        snapshot.save(&args.source.snapshot)?;
        info!(path = %args.source.snapshot.display(), "cleaned snapshot written");
    }

    let report = CleanupReport {
        generated_at: Utc::now(),
        summary,
        written: args.write,
    };
    serde_json::to_writer_pretty(&mut out, &report)?;
    writeln!(out)?;
    Ok(())
}

pub(crate) fn clean_up(
    platform: Arc<SnapshotPlatform>,
    event: Option<PlatformEvent>,
) -> Result<CleanupSummary, AppError> {
    let housekeeper = ScoreHousekeeper::new(Arc::clone(&platform), platform);
    let summary = match event {
        Some(event) => housekeeper.handle(event)?,
        None => housekeeper.on_container_content_deleted()?,
    };
    Ok(summary)
}
