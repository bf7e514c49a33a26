use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use scenechapter::{
    PipelineOptions, PipelineReport, SceneChapterError, ScenePipeline, SystemToolRunner, ToolPaths,
};
use tracing_subscriber::EnvFilter;

const CLI_AFTER_HELP: &str = "Examples:\n  scenechapter -i talk.mp4 -o out\n  RUST_LOG=debug scenechapter -i talk.mp4 -o out\n\nRequires ffmpeg, ffprobe and mkvpropedit on PATH (or FFMPEG, FFPROBE, MKVPROPEDIT).";

#[derive(Debug, Parser)]
#[command(
    name = "scenechapter",
    version,
    about = "Remux a video to Matroska and insert chapter points at scene changes",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Input video file.
    #[arg(short = 'i', long = "input", value_name = "INPUT")]
    input: PathBuf,

    /// Output directory; receives the chapter file.
    #[arg(short = 'o', long = "output", value_name = "OUTPUT")]
    output: PathBuf,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    // A second init (tests, embedding) is harmless.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

fn print_summary(report: &PipelineReport) {
    for entry in report.chapters.entries() {
        println!("  {} {}", entry.timestamp().cyan(), entry.name);
    }
    println!(
        "{} {}",
        "success:".green().bold(),
        format!(
            "{} chapter(s) from {} scene change(s) across {} frame(s) -> {}",
            report.chapters.len(),
            report.scene_changes.len(),
            report.frames_probed,
            report.remuxed_path.display()
        )
        .green()
    );
    println!("chapter file: {}", report.chapter_file.display());
}

fn report_error(error: &(dyn std::error::Error + 'static)) {
    eprintln!("{} {error}", "error:".red().bold());
    if let Some(SceneChapterError::ExternalTool { stderr, .. }) =
        error.downcast_ref::<SceneChapterError>()
        && !stderr.is_empty()
    {
        eprintln!("{}", stderr.dimmed());
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    let options = PipelineOptions::new().with_tools(ToolPaths::from_env());
    let pipeline = ScenePipeline::new(options)?;
    let report = pipeline.run(&cli.input, &cli.output, &SystemToolRunner)?;

    if report.scene_changes.is_empty() {
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "no scene changes detected; only the opening chapter was written".yellow()
        );
    }
    print_summary(&report);
    Ok(())
}

fn main() {
    if let Err(error) = run() {
        report_error(error.as_ref());
        std::process::exit(1);
    }
}
