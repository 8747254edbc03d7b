use crate::batch::BatchReport;
use crate::batch::error::{ErrorKind, Result};
use crate::transfer::error::Result as TransferResult;
use crate::transfer::{Status, TransferOutcome, transfer};
use crate::{Context, ImportItem, ImportOptions, PathPlanner};
use async_stream::stream;
use futures::stream::FuturesUnordered;
use futures::{Stream, StreamExt};
use std::path::PathBuf;
use time::UtcDateTime;
use tokio_util::sync::CancellationToken;

/// Events emitted by [`import`].
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started) exactly once, after the batch was accepted.
/// 2. [`Progress`](Self::Progress) once per file, in completion order.
/// 3. [`Complete`](Self::Complete) exactly once, with outcomes in submission
///    order.
///
/// A batch-level error ends the stream instead, before `Started`.
#[derive(Debug)]
pub enum ImportEvent {
    Started { total: usize },
    Progress(Progress),
    Complete(BatchReport),
}

/// A file has reached its final status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Progress {
    /// Position of the file in the submitted selection.
    pub index: usize,
    pub total: usize,
    pub source: PathBuf,
    pub hash: String,
    pub destination: Option<PathBuf>,
    pub status: Status,
}

impl Progress {
    fn new(index: usize, total: usize, outcome: &TransferOutcome) -> Self {
        Self {
            index,
            total,
            source: outcome.item.source.clone(),
            hash: outcome.item.hash.clone(),
            destination: outcome.destination.clone(),
            status: outcome.status,
        }
    }
}

/// Streams [`ImportEvent`]s while importing `items` according to `options`.
///
/// Destinations are planned for every item before the first transfer starts.
/// Transfers then run concurrently, up to [`Context::concurrency`] at a time;
/// another item is started (in submission order) each time one finishes.
///
/// Cancelling `cancel` stops new transfers from starting. Transfers already
/// running are allowed to finish, and every item that never started is
/// reported as [`Status::Skipped`].
///
/// # Errors
/// Yields a single [`ErrorKind::InvalidOptions`] or
/// [`ErrorKind::ConverterUnavailable`] and ends, without touching any file.
pub fn import<'a>(
    ctx: &'a Context,
    items: Vec<ImportItem>,
    options: ImportOptions,
    cancel: CancellationToken,
) -> impl Stream<Item = Result<ImportEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        let started_at = UtcDateTime::now();
        if let Err(e) = preflight(ctx, &options).await {
            yield Err(e);
            return;
        }
        let total = items.len();
        tracing::info!(
            total,
            destination = %options.destination_root.display(),
            pattern = options.sub_folder.id(),
            convert = options.convert_to_dng,
            delete_original = options.delete_original,
            "Import started"
        );
        yield Ok(ImportEvent::Started { total });

        // Planned sequentially, so that concurrent transfers never compete for a name.
        let planner = PathPlanner::new(ctx.raw_formats.clone());
        let mut planned = Vec::with_capacity(total);
        for item in items {
            let destination = planner.resolve(&item, &options).await;
            planned.push((item, destination));
        }

        let start = |(index, (item, destination)): (usize, (ImportItem, TransferResult<PathBuf>))| {
            let (planner, options) = (&planner, &options);
            async move {
                let outcome = match destination {
                    Ok(destination) => transfer(ctx, planner, item, destination, options).await,
                    Err(e) => {
                        tracing::error!(source = %item.source.display(), error = ?e, "No destination for file");
                        TransferOutcome::failed(item, None, e)
                    },
                };
                (index, outcome)
            }
        };

        let mut outcomes: Vec<Option<TransferOutcome>> = std::iter::repeat_with(|| None).take(total).collect();
        let mut pending = planned.into_iter().enumerate();
        let mut processing = FuturesUnordered::new();
        if !cancel.is_cancelled() {
            processing.extend(pending.by_ref().take(ctx.effective_concurrency()).map(&start));
        }
        while let Some((index, outcome)) = processing.next().await {
            yield Ok(ImportEvent::Progress(Progress::new(index, total, &outcome)));
            outcomes[index] = Some(outcome);
            // Pop-n-push, FIFO.
            if !cancel.is_cancelled() {
                if let Some(next) = pending.next() {
                    processing.push(start(next));
                }
            }
        }

        let cancelled = cancel.is_cancelled();
        for (index, (item, destination)) in pending {
            let outcome = TransferOutcome::skipped(item, destination.ok());
            yield Ok(ImportEvent::Progress(Progress::new(index, total, &outcome)));
            outcomes[index] = Some(outcome);
        }

        let report = BatchReport {
            outcomes: outcomes.into_iter().flatten().collect(),
            started_at,
            finished_at: UtcDateTime::now(),
            cancelled,
        };
        tracing::info!(
            total,
            converted = report.converted(),
            copied = report.copied(),
            failed = report.failed(),
            skipped = report.skipped(),
            cancelled,
            "Import finished"
        );
        yield Ok(ImportEvent::Complete(report));
    })
}

/// Drives [`import`] to completion, calling `on_progress` for every file.
pub async fn run<F>(
    ctx: &Context,
    items: Vec<ImportItem>,
    options: ImportOptions,
    cancel: CancellationToken,
    mut on_progress: F,
) -> Result<BatchReport>
where
    F: FnMut(&Progress),
{
    let mut events = std::pin::pin!(import(ctx, items, options, cancel));
    while let Some(event) = events.next().await {
        match event? {
            ImportEvent::Started { .. } => {},
            ImportEvent::Progress(progress) => on_progress(&progress),
            ImportEvent::Complete(report) => return Ok(report),
        }
    }
    exn::bail!(ErrorKind::Incomplete)
}

/// Rejects batches that cannot succeed before any file is touched.
async fn preflight(ctx: &Context, options: &ImportOptions) -> Result<()> {
    options.validate()?;
    if let Ok(metadata) = tokio::fs::metadata(&options.destination_root).await {
        if !metadata.is_dir() {
            exn::bail!(ErrorKind::InvalidOptions(format!(
                "destination root is not a directory: {}",
                options.destination_root.display()
            )));
        }
    }
    if options.convert_to_dng {
        let available = match &ctx.converter {
            Some(converter) => converter.is_available().await,
            None => false,
        };
        if !available {
            tracing::error!("DNG conversion requested but no converter is available");
            exn::bail!(ErrorKind::ConverterUnavailable);
        }
    }
    Ok(())
}
