mod cli;

use crate::cli::{Cli, Commands, ImportArgs};
use clap::Parser;
use futures::StreamExt;
use miette::{IntoDiagnostic, miette};
use photo_import_config::Config;
use photo_import_library::{
    BatchReport, CancellationToken, Context, ImportItem, Progress, Status, describe, discover, run,
};
use std::fmt::Debug;
use std::path::{Path, PathBuf};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> miette::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = Config::load(cli.config.as_deref()).map_err(report)?;
    match cli.command {
        Commands::Import(args) => import(config, args).await,
        Commands::List { source } => list(config, &source).await,
        Commands::Probe => probe(config).await,
    }
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

/// `exn` errors render as their whole tree, with locations.
fn report(err: impl Debug) -> miette::Report {
    miette!("{err:?}")
}

async fn import(mut config: Config, args: ImportArgs) -> miette::Result<()> {
    args.apply_to(&mut config);
    config.validate().map_err(report)?;

    let destination = args.destination.map(absolute).transpose()?;
    let options = config.import_options(destination).map_err(report)?;
    let ctx = config.context().map_err(report)?;

    let items = collect(&ctx, &args.sources).await?;
    if items.is_empty() {
        println!("Nothing to import.");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if interrupts(&cancel, || async { tokio::signal::ctrl_c().await.is_ok() }).await {
                // Running converters are not waited for.
                tracing::error!("Interrupted again; quitting");
                std::process::exit(130);
            }
        }
    });

    let report = run(&ctx, items, options, cancel, print_progress).await.map_err(report)?;
    summarize(&report)
}

/// Cancels `cancel` on the first interrupt, then returns `true` on the second.
async fn interrupts<F, Fut>(cancel: &CancellationToken, mut interrupted: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    if !interrupted().await {
        return false;
    }
    tracing::warn!("Interrupted; finishing files already in progress (interrupt again to quit)");
    cancel.cancel();
    interrupted().await
}

fn absolute(path: PathBuf) -> miette::Result<PathBuf> {
    std::path::absolute(path).into_diagnostic()
}

/// Expands directories into their photos; plain files are taken as given.
async fn collect(ctx: &Context, sources: &[PathBuf]) -> miette::Result<Vec<ImportItem>> {
    let mut items = Vec::new();
    for source in sources {
        let source = absolute(source.clone())?;
        if source.is_dir() {
            let mut found = std::pin::pin!(discover(ctx, &source));
            while let Some(item) = found.next().await {
                match item {
                    Ok(item) => items.push(item),
                    Err(e) => tracing::warn!(error = ?e, "Skipping unreadable part of source"),
                }
            }
        } else {
            items.push(describe(ctx, source).await.map_err(report)?);
        }
    }
    Ok(items)
}

fn print_progress(progress: &Progress) {
    let destination = progress.destination.as_deref().map(Path::display);
    match destination {
        Some(destination) => println!(
            "[{}/{}] {:<9} {} -> {}",
            progress.index + 1,
            progress.total,
            progress.status.to_string(),
            progress.source.display(),
            destination
        ),
        None => println!(
            "[{}/{}] {:<9} {}",
            progress.index + 1,
            progress.total,
            progress.status.to_string(),
            progress.source.display()
        ),
    }
}

fn summarize(report: &BatchReport) -> miette::Result<()> {
    println!(
        "{} converted, {} copied, {} failed, {} skipped, {} originals deleted in {:.1}s",
        report.converted(),
        report.copied(),
        report.failed(),
        report.skipped(),
        report.originals_deleted(),
        report.duration().as_seconds_f64(),
    );
    for outcome in &report.outcomes {
        if let Some(error) = &outcome.error {
            let label = match outcome.status {
                Status::Failed => "failed",
                _ => "warning",
            };
            eprintln!("{label}: {}: {}", outcome.item.source.display(), **error);
        }
    }
    match (report.failed(), report.cancelled) {
        (0, false) => Ok(()),
        (0, true) => Err(miette!("import cancelled; {} files skipped", report.skipped())),
        (failed, _) => Err(miette!("{failed} of {} files failed", report.total())),
    }
}

async fn list(config: Config, source: &Path) -> miette::Result<()> {
    let ctx = config.context().map_err(report)?;
    let mut found = std::pin::pin!(discover(&ctx, source));
    while let Some(item) = found.next().await {
        let item = item.map_err(report)?;
        let date = item.captured_at.map(|d| d.to_string()).unwrap_or_else(|| "-".into());
        println!("{}  {:<10}  {}", &item.hash[..12], date, item.source.display());
    }
    Ok(())
}

async fn probe(config: Config) -> miette::Result<()> {
    let ctx = config.context().map_err(report)?;
    match &ctx.converter {
        Some(converter) if converter.is_available().await => println!("DNG converter: {}", converter.name()),
        _ => println!("DNG converter: not found"),
    }
    match &ctx.exiftool {
        Some(_) => println!("exiftool: found"),
        None => println!("exiftool: not found"),
    }
    Ok(())
}
