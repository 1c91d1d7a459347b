use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use mvextract::{
    CancellationToken, DumpMode, ExtractionOptions, ExtractionPipeline, StepCallback, StepInfo,
};

const CLI_AFTER_HELP: &str = "Examples:\n  mvextract input.mp4 --verbose\n  mvextract input.mp4 --dump\n  mvextract rtsp://camera.local/stream --dump captures/cam0";

#[derive(Debug, Parser)]
#[command(
    name = "mvextract",
    version,
    about = "Extract motion vectors from a video stream",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// File path or URL of the video stream.
    video_url: String,

    /// Show a preview video with overlaid motion vectors.
    #[arg(short, long)]
    preview: bool,

    /// Show detailed text output for every frame.
    #[arg(short, long)]
    verbose: bool,

    /// Dump frames, motion vectors, frame types, and timestamps to the
    /// optionally specified output directory.
    #[arg(short, long, value_name = "DIR", num_args = 0..=1)]
    dump: Option<Option<PathBuf>>,
}

/// Prints one line per extracted frame, mirroring the step callback data.
struct VerboseSteps;

impl StepCallback for VerboseSteps {
    fn on_step(&self, info: &StepInfo) {
        println!(
            "Frame {} | timestamp: {:.4} | type: {} | motion vectors: {} | read: {:.2?}",
            info.step, info.timestamp, info.coding_type, info.motion_vector_count, info.read_time
        );
    }
}

/// Keeps a spinner ticking with the current step counter.
struct SpinnerSteps {
    bar: ProgressBar,
}

impl StepCallback for SpinnerSteps {
    fn on_step(&self, info: &StepInfo) {
        self.bar.set_message(format!(
            "frame {} ({} motion vectors)",
            info.step, info.motion_vector_count
        ));
        self.bar.tick();
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();
}

fn dump_mode(dump: Option<Option<PathBuf>>) -> DumpMode {
    match dump {
        None => DumpMode::Disabled,
        Some(None) => DumpMode::Default,
        Some(Some(directory)) => DumpMode::Explicit(directory),
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    init_logging(cli.verbose);
    mvextract::set_native_log_level(cli.verbose);

    if cli.preview {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "this build has no preview surface; --preview is ignored".yellow()
        );
    }

    let stop = CancellationToken::new();
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.cancel())?;
    }

    let mut options = ExtractionOptions::new()
        .with_dump(dump_mode(cli.dump))
        .with_stop(stop);

    let spinner = if cli.verbose {
        options = options.with_step_callback(Arc::new(VerboseSteps));
        None
    } else {
        let bar = ProgressBar::new_spinner();
        bar.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
        options = options.with_step_callback(Arc::new(SpinnerSteps { bar: bar.clone() }));
        Some(bar)
    };

    let pipeline = ExtractionPipeline::open(&cli.video_url, options)?;
    let report = pipeline.run()?;

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    println!(
        "{} {} frames in {:.2?}{}",
        "done:".green().bold(),
        report.frames,
        report.elapsed,
        report
            .average_read_time
            .map(|average| format!(" (average read time {average:.2?})"))
            .unwrap_or_default()
    );

    Ok(())
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}
