//! Batch run: progress bar, Ctrl-C cancellation, report output and summary.

use std::path::Path;
use std::time::Duration;

use clover_core::{
    report_file_name, write_report_file, BatchStats, CancelFlag, Clover, ReportName,
};

use super::setup::RunContext;

/// Run the batch described by `ctx` and write its report.
pub async fn run_batch(ctx: RunContext) -> anyhow::Result<()> {
    let clover = Clover::new(ctx.config);
    let orchestrator = clover.orchestrator(&ctx.output_root);
    let plan = orchestrator.plan(&ctx.source_root)?;

    let total_files = plan.total_files();
    let total_bytes = plan.total_bytes();
    if total_files == 0 {
        tracing::warn!("No files found under {:?}", ctx.source_root);
    }

    let cancel = CancelFlag::new();
    let signal_task = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupted, finishing in-flight files");
                cancel.cancel();
            }
        })
    };

    let progress = create_progress_bar(total_files as u64);
    let outcome = orchestrator
        .run_plan(plan, &cancel, |p| {
            progress.set_position(p.completed_files as u64);
            let elapsed = progress.elapsed().as_secs_f64();
            if elapsed > 0.0 {
                progress.set_message(format!(
                    "{:.1} img/sec, {} records",
                    p.completed_files as f64 / elapsed,
                    p.records
                ));
            }
        })
        .await;
    signal_task.abort();
    progress.finish_and_clear();
    let outcome = outcome?;

    let report_path = ctx.report_path.unwrap_or_else(|| {
        let name = ReportName {
            dataset: &clover.config().general.dataset_name,
            dtype: ctx.dtype.as_deref(),
            phase: ctx.phase.as_deref(),
            target_short_side: clover.config().processing.target_short_side,
            tiles: outcome.stats.accepted,
        };
        ctx.output_root.join(report_file_name(&name, ctx.format))
    });
    write_report_file(&report_path, &outcome.report, ctx.format)?;

    print_summary(&outcome.stats, total_bytes, &report_path, outcome.report.cancelled);

    if outcome.report.cancelled {
        anyhow::bail!("Run cancelled; partial report written to {:?}", report_path);
    }
    Ok(())
}

/// Create a progress bar for batch processing.
fn create_progress_bar(total: u64) -> indicatif::ProgressBar {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.enable_steady_tick(Duration::from_millis(200));
    pb.set_message("starting...");
    pb
}

/// Print a formatted summary table after batch processing.
fn print_summary(stats: &BatchStats, total_bytes: u64, report_path: &Path, cancelled: bool) {
    let mb_processed = total_bytes as f64 / 1_000_000.0;
    let throughput = if stats.total_seconds > 0.0 {
        mb_processed / stats.total_seconds
    } else {
        0.0
    };

    eprintln!();
    eprintln!("  ====================================");
    eprintln!("               Summary");
    eprintln!("  ====================================");
    eprintln!("    Subdirs:      {:>8}", stats.subdirectories);
    eprintln!("    Files:        {:>8}", stats.files);
    eprintln!("    Accepted:     {:>8}", stats.accepted);
    eprintln!("    Suspect:      {:>8}", stats.suspect);
    if stats.corrupt > 0 {
        eprintln!("    Corrupt:      {:>8}", stats.corrupt);
    }
    eprintln!("  ------------------------------------");
    eprintln!("    Records:      {:>8}", stats.records);
    eprintln!("    Duration:     {:>7.1}s", stats.total_seconds);
    eprintln!("    Rate:         {:>7.1} img/sec", stats.files_per_second);
    eprintln!("    Throughput:   {:>7.1} MB/sec", throughput);
    if cancelled {
        eprintln!("    Status:       cancelled");
    }
    eprintln!("  ====================================");
    eprintln!("    Report: {}", report_path.display());
}

#[cfg(test)]
mod tests {
    use super::*;
    use clover_core::{Config, ReportFormat};

    fn context(src: &Path, out: &Path) -> RunContext {
        RunContext {
            config: Config::default(),
            source_root: src.to_path_buf(),
            output_root: out.to_path_buf(),
            report_path: None,
            format: ReportFormat::Csv,
            dtype: Some("edr".to_string()),
            phase: Some("12".to_string()),
        }
    }

    #[tokio::test]
    async fn test_run_batch_writes_named_report() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        std::fs::create_dir(src.path().join("A")).unwrap();
        std::fs::write(src.path().join("A/empty.png"), b"").unwrap();

        run_batch(context(src.path(), out.path())).await.unwrap();

        let report = out.path().join("lroc_edr_12_256px_0tiles.csv");
        let content = std::fs::read_to_string(report).unwrap();
        assert_eq!(content.lines().count(), 2);
        assert!(content.contains("Zero byte size file."));
        assert!(out.path().join("A/suspect/empty.png").exists());
    }

    #[tokio::test]
    async fn test_run_batch_explicit_report_path() {
        let src = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let report = out.path().join("reports/run.jsonl");
        let ctx = RunContext {
            report_path: Some(report.clone()),
            format: ReportFormat::JsonLines,
            ..context(src.path(), out.path())
        };

        run_batch(ctx).await.unwrap();
        assert!(report.exists());
    }
}
