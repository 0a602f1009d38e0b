//! The `clover process` command for curating an image archive.

mod batch;
mod setup;
pub mod types;

pub use types::OutputFormat;

use clap::Args;
use std::path::PathBuf;

use batch::run_batch;
use setup::setup_run;

/// Arguments for the `process` command.
#[derive(Args, Debug)]
pub struct ProcessArgs {
    /// Archive root holding data-type directories (defaults to config `general.data_source`)
    #[arg(short, long)]
    pub source: Option<PathBuf>,

    /// Output root for tiles and suspect folders (defaults to config `general.out_path`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Data type directory under the source root (edr when only --phase is given)
    #[arg(long)]
    pub dtype: Option<String>,

    /// Mission phase directory under the data type, e.g. 12
    #[arg(long)]
    pub phase: Option<String>,

    /// Short side of emitted tiles in pixels
    #[arg(long)]
    pub target_size: Option<u32>,

    /// Number of parallel workers
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Stop after this many input files
    #[arg(long, visible_alias = "num-images")]
    pub max_images: Option<usize>,

    /// Report format
    #[arg(short, long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Report file path (defaults to a generated name under the output root)
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Manual Default impl for constructing ProcessArgs outside of clap.
impl Default for ProcessArgs {
    fn default() -> Self {
        Self {
            source: None,
            output: None,
            dtype: None,
            phase: None,
            target_size: None,
            workers: None,
            max_images: None,
            format: None,
            report: None,
        }
    }
}

/// Execute the process command.
pub async fn execute(args: ProcessArgs) -> anyhow::Result<()> {
    let ctx = setup_run(&args)?;
    run_batch(ctx).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        args: ProcessArgs,
    }

    #[test]
    fn process_args_default_has_no_layout() {
        let args = ProcessArgs::default();
        assert!(args.dtype.is_none());
        assert!(args.phase.is_none());
    }

    #[test]
    fn process_args_default_overrides_are_none() {
        let args = ProcessArgs::default();
        assert!(args.source.is_none());
        assert!(args.output.is_none());
        assert!(args.target_size.is_none());
        assert!(args.workers.is_none());
        assert!(args.max_images.is_none());
        assert!(args.format.is_none());
        assert!(args.report.is_none());
    }

    #[test]
    fn process_args_parse_flags() {
        let cli = TestCli::parse_from([
            "clover",
            "--source",
            "/data",
            "--phase",
            "12",
            "--workers",
            "8",
            "--format",
            "jsonl",
            "--max-images",
            "100",
        ]);
        assert_eq!(cli.args.source, Some(PathBuf::from("/data")));
        assert_eq!(cli.args.phase.as_deref(), Some("12"));
        assert_eq!(cli.args.workers, Some(8));
        assert_eq!(cli.args.format, Some(OutputFormat::Jsonl));
        assert_eq!(cli.args.max_images, Some(100));
    }

    #[test]
    fn process_args_num_images_alias() {
        let cli = TestCli::parse_from(["clover", "--num-images", "5"]);
        assert_eq!(cli.args.max_images, Some(5));
    }
}
