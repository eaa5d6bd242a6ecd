use std::{path::PathBuf, sync::Arc};

use clap::{CommandFactory, Parser};
use clap_complete::Shell;
use colored::Colorize;
use framelabel::{
    AnalyzeOptions, Analyzer, CloudVisionClient, DEFAULT_QUALITY, FfmpegLogLevel,
    FfmpegStreamOpener, FormatInfo, LabelFormat, LabelReport, ProgressCallback, ProgressInfo,
    SamplingPolicy, Stage, VisionConfig, YtDlpResolver,
};
use indicatif::{ProgressBar, ProgressStyle};

const CLI_AFTER_HELP: &str = concat!(
    "Examples:\n",
    "  framelabel dQw4w9WgXcQ\n",
    "  framelabel https://www.youtube.com/watch?v=dQw4w9WgXcQ 360p 30 8 120 --format list\n",
    "  framelabel dQw4w9WgXcQ --list-formats\n",
    "  framelabel --completions zsh > _framelabel\n",
    "\n",
    "Environment:\n",
    "  FRAMELABEL_VISION_API_KEY / GOOGLE_API_KEY   Cloud Vision API key\n",
    "  GOOGLE_OAUTH_ACCESS_TOKEN                    bearer token used when no API key is set\n",
    "  GOOGLE_CLOUD_QUOTA_PROJECT                   billing project for user credentials\n",
    "  FRAMELABEL_YTDLP                             path to the yt-dlp executable\n",
    "  RUST_LOG                                     log filter (overrides --verbose)",
);

#[derive(Debug, Parser)]
#[command(
    name = "framelabel",
    version,
    about = "Sample frames from a hosted video and label them with Cloud Vision",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    /// Video URL or platform content identifier.
    #[arg(required_unless_present = "completions")]
    content_id: Option<String>,

    /// Quality tag of the stream variant to sample (yt-dlp format note).
    #[arg(default_value = DEFAULT_QUALITY)]
    quality: String,

    /// Capture every Nth frame.
    #[arg(default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    skip_frames: u64,

    /// Maximum number of frames to capture.
    #[arg(default_value_t = 4, value_parser = clap::value_parser!(u64).range(1..))]
    max_frames: u64,

    /// Number of leading frames to discard before sampling.
    #[arg(default_value_t = 0)]
    start_frame: u64,

    /// Aggregate labels as a deduplicated set or a per-frame list.
    #[arg(long, default_value = "set")]
    format: LabelFormat,

    /// Print the report as JSON.
    #[arg(long)]
    json: bool,

    /// Show debug logging.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar for sampling and labeling.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<FfmpegLogLevel>,

    /// Directory under which the per-run scratch directory is created.
    #[arg(long)]
    scratch_dir: Option<PathBuf>,

    /// JPEG quality of captured frames.
    #[arg(long, default_value_t = 90, value_parser = clap::value_parser!(u8).range(1..=100))]
    jpeg_quality: u8,

    /// Maximum labels requested per frame.
    #[arg(long)]
    max_results: Option<u32>,

    /// List the stream variants available for the content and exit.
    #[arg(long)]
    list_formats: bool,

    /// Generate a shell completion script and exit.
    #[arg(long, value_enum)]
    completions: Option<Shell>,
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(0);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        let message = match info.stage {
            Stage::FrameSampling => "capturing frames",
            Stage::LabelDetection => "labeling frames",
            _ => "working",
        };
        if let Some(total) = info.total {
            self.bar.set_length(total);
        }
        self.bar.set_position(info.current);
        self.bar.set_message(message);
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .format_target(false)
        .init();
}

fn analyze_options(cli: &Cli) -> AnalyzeOptions {
    let sampling =
        SamplingPolicy::new(cli.skip_frames, cli.max_frames).with_start_frame(cli.start_frame);
    let mut options = AnalyzeOptions::new()
        .with_quality(cli.quality.clone())
        .with_sampling(sampling)
        .with_format(cli.format)
        .with_jpeg_quality(cli.jpeg_quality);
    if let Some(root) = &cli.scratch_dir {
        options = options.with_scratch_root(root.clone());
    }
    options
}

fn print_formats(formats: &[FormatInfo]) {
    println!("{:<12} {:<14} {:<6} {:<11} {}", "ID", "NOTE", "EXT", "SIZE", "VCODEC");
    for format in formats {
        let size = match (format.width, format.height) {
            (Some(width), Some(height)) => format!("{width}x{height}"),
            _ => "-".to_string(),
        };
        println!(
            "{:<12} {:<14} {:<6} {:<11} {}",
            format.format_id.as_deref().unwrap_or("-"),
            format.format_note.as_deref().unwrap_or("-"),
            format.ext.as_deref().unwrap_or("-"),
            size,
            format.vcodec.as_deref().unwrap_or("-"),
        );
    }
}

fn print_report(report: &LabelReport, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    match report {
        LabelReport::Set(labels) => {
            println!("\n{}", "Labels:".bold());
            let line: Vec<&str> = labels.iter().map(String::as_str).collect();
            println!("{}", line.join(" "));
        }
        LabelReport::List(frames) => {
            println!("\n{}", "Labels per frame:".bold());
            for frame in frames {
                println!("{} {}", format!("{}:", frame.frame).cyan(), frame.labels.join(", "));
            }
        }
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(shell) = cli.completions {
        let mut command = Cli::command();
        clap_complete::generate(shell, &mut command, "framelabel", &mut std::io::stdout());
        return Ok(());
    }

    init_logging(cli.verbose);
    if let Some(level) = cli.log_level {
        framelabel::set_ffmpeg_log_level(level);
    }

    let content_id = cli
        .content_id
        .clone()
        .ok_or("a content identifier is required")?;
    let resolver = YtDlpResolver::from_env();

    if cli.list_formats {
        print_formats(&resolver.formats(&content_id)?);
        return Ok(());
    }

    let mut vision = VisionConfig::from_env()?;
    if let Some(max_results) = cli.max_results {
        vision = vision.with_max_results(max_results);
    }
    let detector = CloudVisionClient::new(vision)?;

    let mut options = analyze_options(&cli);
    let progress = if cli.progress {
        let progress = Arc::new(TerminalProgress::new()?);
        options = options.with_progress(progress.clone());
        Some(progress)
    } else {
        None
    };

    let analyzer = Analyzer::new(resolver, FfmpegStreamOpener, detector, options);
    let report = analyzer.analyze(&content_id);

    if let Some(progress) = progress {
        progress.bar.finish_and_clear();
    }

    print_report(&report?, cli.json)
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use framelabel::{FfmpegLogLevel, LabelFormat};

    use super::{Cli, analyze_options};

    #[test]
    fn positional_defaults() {
        let cli = Cli::try_parse_from(["framelabel", "abc123"]).unwrap();
        assert_eq!(cli.content_id.as_deref(), Some("abc123"));
        assert_eq!(cli.quality, "240p");
        assert_eq!(cli.skip_frames, 60);
        assert_eq!(cli.max_frames, 4);
        assert_eq!(cli.start_frame, 0);
        assert_eq!(cli.format, LabelFormat::Set);
    }

    #[test]
    fn all_positionals_and_flags() {
        let cli = Cli::try_parse_from([
            "framelabel",
            "abc123",
            "360p",
            "30",
            "8",
            "120",
            "--format",
            "list",
            "--log-level",
            "warn",
        ])
        .unwrap();
        assert_eq!(cli.quality, "360p");
        assert_eq!(cli.log_level, Some(FfmpegLogLevel::Warning));

        let options = analyze_options(&cli);
        assert_eq!(options.sampling().skip_frames(), 30);
        assert_eq!(options.sampling().max_frames(), 8);
        assert_eq!(options.sampling().start_frame(), 120);
        assert_eq!(options.format(), LabelFormat::List);
    }

    #[test]
    fn zero_skip_or_max_rejected() {
        assert!(Cli::try_parse_from(["framelabel", "abc", "240p", "0"]).is_err());
        assert!(Cli::try_parse_from(["framelabel", "abc", "240p", "60", "0"]).is_err());
    }

    #[test]
    fn unknown_format_rejected() {
        assert!(Cli::try_parse_from(["framelabel", "abc", "--format", "tree"]).is_err());
    }

    #[test]
    fn completions_without_content_id() {
        let cli = Cli::try_parse_from(["framelabel", "--completions", "bash"]).unwrap();
        assert!(cli.content_id.is_none());
        assert!(Cli::try_parse_from(["framelabel"]).is_err());
    }
}
