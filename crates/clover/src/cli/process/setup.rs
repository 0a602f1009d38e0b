//! Run setup: config overrides and path resolution.

use clover_core::config::expand_tilde;
use clover_core::pipeline::dataset_root;
use clover_core::{Config, ReportFormat};
use std::path::PathBuf;

use super::ProcessArgs;

/// Everything needed to run one batch, assembled by `setup_run()`.
pub(crate) struct RunContext {
    pub config: Config,
    pub source_root: PathBuf,
    pub output_root: PathBuf,
    pub report_path: Option<PathBuf>,
    pub format: ReportFormat,
    pub dtype: Option<String>,
    pub phase: Option<String>,
}

/// Load config, apply CLI overrides, and resolve the source and output roots.
pub fn setup_run(args: &ProcessArgs) -> anyhow::Result<RunContext> {
    let mut config = Config::load()?;
    apply_overrides(&mut config, args);
    config.validate()?;

    let (dtype, phase) = resolve_layout(args.dtype.as_deref(), args.phase.as_deref());
    let source_root = dataset_root(&config.data_source(), dtype.as_deref(), phase.as_deref());
    if !source_root.is_dir() {
        anyhow::bail!(
            "Source directory does not exist: {:?}\n\n  Hint: Check --source, --dtype and --phase.",
            source_root
        );
    }

    let format = match args.format {
        Some(format) => format.into(),
        None => ReportFormat::parse(&config.output.format).unwrap_or_default(),
    };

    tracing::info!("Input data will come from: {:?}", source_root);
    tracing::info!("Output dataset will be made in: {:?}", config.out_path());

    Ok(RunContext {
        output_root: config.out_path(),
        report_path: args.report.as_ref().map(|p| expand_tilde(p)),
        config,
        source_root,
        format,
        dtype,
        phase,
    })
}

/// Copy CLI overrides into the loaded config.
fn apply_overrides(config: &mut Config, args: &ProcessArgs) {
    if let Some(source) = &args.source {
        config.general.data_source = expand_tilde(source);
    }
    if let Some(output) = &args.output {
        config.general.out_path = expand_tilde(output);
    }
    if let Some(size) = args.target_size {
        config.processing.target_short_side = size;
    }
    if let Some(workers) = args.workers {
        config.processing.parallel_workers = workers;
    }
    if args.max_images.is_some() {
        config.processing.max_images = args.max_images;
    }
    if let Some(format) = args.format {
        config.output.format = format.to_string();
    }
}

/// A phase without a data type implies the `edr` archive.
fn resolve_layout(dtype: Option<&str>, phase: Option<&str>) -> (Option<String>, Option<String>) {
    let dtype = match (dtype, phase) {
        (Some(d), _) => Some(d.to_string()),
        (None, Some(_)) => Some("edr".to_string()),
        (None, None) => None,
    };
    (dtype, phase.map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::process::OutputFormat;

    #[test]
    fn test_overrides_replace_config_values() {
        let mut config = Config::default();
        let args = ProcessArgs {
            source: Some(PathBuf::from("/archive")),
            output: Some(PathBuf::from("/curated")),
            target_size: Some(512),
            workers: Some(3),
            max_images: Some(10),
            format: Some(OutputFormat::Jsonl),
            ..ProcessArgs::default()
        };
        apply_overrides(&mut config, &args);

        assert_eq!(config.general.data_source, PathBuf::from("/archive"));
        assert_eq!(config.general.out_path, PathBuf::from("/curated"));
        assert_eq!(config.processing.target_short_side, 512);
        assert_eq!(config.processing.parallel_workers, 3);
        assert_eq!(config.processing.max_images, Some(10));
        assert_eq!(config.output.format, "jsonl");
    }

    #[test]
    fn test_no_overrides_keep_defaults() {
        let mut config = Config::default();
        apply_overrides(&mut config, &ProcessArgs::default());
        assert_eq!(config.processing.target_short_side, 256);
        assert_eq!(config.output.format, "csv");
    }

    #[test]
    fn test_resolve_layout() {
        assert_eq!(resolve_layout(None, None), (None, None));
        assert_eq!(
            resolve_layout(None, Some("12")),
            (Some("edr".to_string()), Some("12".to_string()))
        );
        assert_eq!(
            resolve_layout(Some("cdr"), None),
            (Some("cdr".to_string()), None)
        );
    }
}
