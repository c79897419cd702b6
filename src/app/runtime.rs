use std::io::{self, IsTerminal};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use harvester_core::{
    AggMode, Aggregator, DescriptorSource, DownloadEngine, DownloadReport, DownloadTask,
    HttpClient, HttpPageFetcher, Pacing, PageSource, ProgressObserver, RetryPolicy, SaveDir,
    SearchQuery,
};
use tracing::{debug, info, warn};

use crate::ProcessExit;
use crate::app::{exit_handler, output, progress_manager::HarvestProgress, terminal};
use crate::cli::Args;

pub(crate) async fn run_harvester() -> Result<ProcessExit> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    let default_level =
        terminal::resolve_default_log_level(args.log_level, args.quiet, args.verbose);
    terminal::init_tracing(default_level, args.log_format);

    debug!(?args, "CLI arguments parsed");
    info!(collection = %args.collection, "Harvester starting");

    let save_dir = SaveDir::new(&args.save);
    if save_dir
        .ensure_exists()
        .context("cannot prepare the save directory")?
    {
        warn!(dir = %save_dir.root().display(), "Save directory did not exist; created it");
    }

    let connect_timeout = Duration::from_secs(args.connect_timeout);
    let read_timeout = Duration::from_secs(args.read_timeout);

    let query = SearchQuery::new(&args.api_base, args.collection.clone())?;
    let fetcher = HttpPageFetcher::with_timeouts(query, connect_timeout, read_timeout)?;
    let checkpoint_key = args
        .cache
        .as_ref()
        .map(|path| path.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut aggregator = Aggregator::new(fetcher, args.mode.into())
        .with_checkpoint(checkpoint_key)
        .with_max_pages(args.max_pages)
        .restore()
        .context("cannot resume from checkpoint")?;

    let task = DownloadTask::new(
        HttpClient::with_timeouts(connect_timeout, read_timeout)?,
        DescriptorSource::new(&args.download_base)?,
        save_dir,
    )
    .with_pacing(Pacing::new(
        Duration::from_millis(args.min_delay_ms),
        Duration::from_millis(args.max_delay_ms),
    ));
    let engine = DownloadEngine::new(
        usize::from(args.workers),
        RetryPolicy::with_max_retries(u32::from(args.max_retries)),
        task,
    )?;

    let progress = HarvestProgress::new(terminal::should_show_progress(
        io::stderr().is_terminal(),
        args.quiet,
        terminal::is_dumb_terminal(),
    ));

    let report = tokio::select! {
        result = harvest(&mut aggregator, &engine, &progress) => result,
        Ok(()) = tokio::signal::ctrl_c() => {
            progress.finish();
            warn!("Interrupted. Run again to resume.");
            return Ok(ProcessExit::Failure);
        }
    };
    progress.finish();
    let report = report?;

    info!(
        succeeded = report.succeeded().len(),
        skipped = report.skipped().len(),
        failed = report.failed().len(),
        retries = report.retries(),
        "Harvest complete"
    );
    output::print_summary(&report, args.quiet);

    Ok(exit_handler::determine_exit_outcome(&report))
}

/// Lists the collection and downloads every descriptor.
///
/// In iterative mode each page is downloaded as soon as it arrives. Any
/// identifiers restored from a checkpoint are handed to the engine first,
/// since the run that saved them may have stopped before downloading them.
async fn harvest<S: PageSource>(
    aggregator: &mut Aggregator<S>,
    engine: &DownloadEngine,
    progress: &dyn ProgressObserver,
) -> Result<DownloadReport> {
    match aggregator.mode() {
        AggMode::Full => {
            let identifiers = aggregator
                .aggregate()
                .await
                .context("listing the collection failed")?;
            info!(identifiers = identifiers.len(), "Collection listed");
            Ok(engine
                .download_all_with_progress(&identifiers, progress)
                .await)
        }
        AggMode::Iterative => {
            let mut report = DownloadReport::new();

            let restored = aggregator.state().buffer().to_vec();
            if !restored.is_empty() {
                info!(identifiers = restored.len(), "Re-checking identifiers from checkpoint");
                report.merge(engine.download_all_with_progress(&restored, progress).await);
            }

            while !aggregator.is_exhausted() {
                let identifiers = aggregator
                    .aggregate()
                    .await
                    .context("listing the collection failed")?;
                debug!(
                    page = aggregator.state().page_index(),
                    identifiers = identifiers.len(),
                    "Page listed"
                );
                report.merge(
                    engine
                        .download_all_with_progress(&identifiers, progress)
                        .await,
                );
            }
            Ok(report)
        }
    }
}
