use {
    gbpack::prelude::*,
    clap::Args,
    indicatif::{ProgressBar, ProgressStyle},
    miette::{Context, IntoDiagnostic},
    std::path::PathBuf,
};

#[derive(Args)]
pub struct PackArgs {
    /// manifest TSV path (§6.1)
    #[arg(short = 'm', long)]
    manifest: PathBuf,

    /// source root directory that relative_path is resolved against
    #[arg(short = 's', long)]
    source_root: PathBuf,

    /// output pack path
    #[arg(short = 'o', long)]
    output: PathBuf,

    /// worker count (default: min(8, CPU))
    #[arg(short = 'w', long)]
    workers: Option<usize>,

    /// in-flight submission limit (default: 2 * workers)
    #[arg(short = 'i', long)]
    in_flight: Option<usize>,
}

fn style(template: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("##-")
}

pub fn execute(args: PackArgs) -> Result<()> {
    let rows = read_rows(&args.manifest)
        .into_diagnostic()
        .with_context(|| format!("failed to read manifest: {}", args.manifest.display()))?;

    let workers = args
        .workers
        .unwrap_or_else(|| std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1).min(8));
    let in_flight = args.in_flight.unwrap_or(workers * 2);

    let records_bar = ProgressBar::new(rows.len() as u64).with_message("pack:records").with_style(
        style("[{elapsed_precise}] pack:records {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}"),
    );
    let aliases_bar = ProgressBar::new(rows.len() as u64).with_message("pack:aliases").with_style(
        style("[{elapsed_precise}] pack:aliases {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}"),
    );
    let write_bar = ProgressBar::new(1).with_message("pack:write").with_style(
        style("[{elapsed_precise}] pack:write   {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}"),
    );

    let progress = |stage: BuildStage, completed: u64, total: u64| match stage {
        BuildStage::Records => {
            records_bar.set_length(total);
            records_bar.set_position(completed);
            if completed == total {
                records_bar.finish_with_message("done");
            }
        }
        BuildStage::Aliases => {
            aliases_bar.set_length(total);
            aliases_bar.set_position(completed);
            if completed == total {
                aliases_bar.finish_with_message("done");
            }
        }
        BuildStage::Write => {
            write_bar.set_length(total);
            write_bar.set_position(completed);
            if completed == total {
                write_bar.finish_with_message("done");
            }
        }
    };

    let builder = PackBuilder::new(&args.source_root, &args.output);
    let summary = builder
        .build(&rows, workers, in_flight, &progress)
        .into_diagnostic()
        .context("pack build failed")?;

    println!(
        "wrote {} ({} assets, {} aliases, {} failed, {} bytes of payload)",
        args.output.display(),
        summary.asset_count,
        summary.alias_count,
        summary.failed_count,
        summary.payload_size,
    );

    Ok(())
}
