use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use colored::Colorize;
use framegrab::{
    ExportRequest, ExportStatus, FrameExporter, FrameIndex, FrameIndexer, ImageEncoding,
    IndexOptions, MediaTime, ProgressCallback, ProgressInfo,
    ffmpeg::{FfmpegFrameGenerator, FfmpegLogLevel, FfmpegSource},
};
use indicatif::{ProgressBar, ProgressStyle};
use log::LevelFilter;
use serde_json::json;

const CLI_AFTER_HELP: &str = "Examples:\n  framegrab index input.mp4 --json\n  framegrab nearest input.mp4 00:01:02.5\n  framegrab export input.mp4 --at 1.5 --at 00:00:03 --out frames --format png --snap --progress\n  framegrab completions zsh > _framegrab";

/// Timescale used for times typed on the command line (microseconds).
const CLI_TIMESCALE: i32 = 1_000_000;

#[derive(Debug, Parser)]
#[command(
    name = "framegrab",
    version,
    about = "Index video frame times and export exact still frames",
    after_help = CLI_AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOptions,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Parser, Clone, Default)]
struct GlobalOptions {
    /// Show additional logging output.
    #[arg(long)]
    verbose: bool,

    /// Show a progress bar where supported.
    #[arg(long)]
    progress: bool,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[arg(long)]
    log_level: Option<String>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Read the presentation time of every frame.
    #[command(
        about = "Index frame times",
        after_help = "Examples:\n  framegrab index input.mp4\n  framegrab index input.mp4 --json --limit 500000"
    )]
    Index {
        /// Input media path.
        input: PathBuf,
        /// Give up on videos with more frames than this.
        #[arg(long, default_value_t = framegrab::DEFAULT_FRAME_LIMIT)]
        limit: usize,
        /// Output the index as machine-readable JSON.
        #[arg(long)]
        json: bool,
    },

    /// Find the real frame closest to a time.
    #[command(
        about = "Find the nearest frame",
        after_help = "Examples:\n  framegrab nearest input.mp4 12.04\n  framegrab nearest input.mp4 00:00:12.04"
    )]
    Nearest {
        /// Input media path.
        input: PathBuf,
        /// Time in seconds, MM:SS or HH:MM:SS.
        time: String,
    },

    /// Export frames at the given times.
    #[command(
        about = "Export still frames",
        after_help = "Examples:\n  framegrab export input.mp4 --at 2 --at 4 --out frames\n  framegrab export input.mp4 --at 00:01:00 --format jpeg --quality 80 --snap"
    )]
    Export {
        /// Input media path.
        input: PathBuf,
        /// Time of a frame to export (repeatable).
        #[arg(long = "at", required = true)]
        times: Vec<String>,
        /// Output directory. A temporary directory is used when omitted.
        #[arg(long)]
        out: Option<PathBuf>,
        /// Output format (jpeg, jpg, png).
        #[arg(long, default_value = "jpeg")]
        format: String,
        /// JPEG quality, 1-100.
        #[arg(long, default_value_t = 95)]
        quality: u8,
        /// Frames decoded per chunk.
        #[arg(long, default_value_t = framegrab::DEFAULT_CHUNK_SIZE)]
        chunk_size: usize,
        /// Snap each time to the nearest real frame before exporting.
        #[arg(long)]
        snap: bool,
    },

    /// Generate shell completions.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

fn parse_timecode(value: &str) -> Result<Duration, Box<dyn std::error::Error>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("time value cannot be empty".into());
    }

    if let Ok(seconds) = trimmed.parse::<f64>() {
        return seconds_to_duration(seconds);
    }

    let parts: Vec<&str> = trimmed.split(':').collect();
    if parts.len() < 2 || parts.len() > 3 {
        return Err(format!("invalid time format: {trimmed}").into());
    }

    let (hours, minutes, seconds_str) = if parts.len() == 3 {
        (parts[0].parse::<u64>()?, parts[1].parse::<u64>()?, parts[2])
    } else {
        (0_u64, parts[0].parse::<u64>()?, parts[1])
    };

    let seconds = seconds_str.parse::<f64>()?;
    let total_seconds = (hours as f64 * 3600.0) + (minutes as f64 * 60.0) + seconds;
    seconds_to_duration(total_seconds)
}

/// Negative values clamp to zero; NaN, infinities and overflows are errors.
fn seconds_to_duration(seconds: f64) -> Result<Duration, Box<dyn std::error::Error>> {
    if !seconds.is_finite() {
        return Err(format!("invalid time value: {seconds}").into());
    }
    Ok(Duration::try_from_secs_f64(seconds.max(0.0))?)
}

fn parse_media_time(value: &str) -> Result<MediaTime, Box<dyn std::error::Error>> {
    let time = MediaTime::from_duration(parse_timecode(value)?, CLI_TIMESCALE);
    if !time.is_numeric() {
        return Err(format!("time value out of range: {value}").into());
    }
    Ok(time)
}

fn parse_encoding(format: &str, quality: u8) -> Option<ImageEncoding> {
    match format.to_ascii_lowercase().as_str() {
        "jpeg" | "jpg" => Some(ImageEncoding::Jpeg { quality }),
        "png" => Some(ImageEncoding::Png),
        _ => None,
    }
}

fn seconds(time: MediaTime) -> f64 {
    time.as_seconds().unwrap_or(f64::NAN)
}

fn apply_global_options(global: &GlobalOptions) -> Result<(), Box<dyn std::error::Error>> {
    let level = if global.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    if let Some(level) = &global.log_level {
        let parsed =
            FfmpegLogLevel::from_name(level).ok_or(format!("unsupported --log-level: {level}"))?;
        framegrab::ffmpeg::set_ffmpeg_log_level(parsed);
    }

    Ok(())
}

struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    fn new(total: u64) -> Result<Self, Box<dyn std::error::Error>> {
        let bar = ProgressBar::new(total);
        let style =
            ProgressStyle::with_template("{spinner:.green} {bar:40.cyan/blue} {pos}/{len} {msg}")?;
        bar.set_style(style.progress_chars("##-"));
        Ok(Self { bar })
    }
}

impl ProgressCallback for TerminalProgress {
    fn on_progress(&self, info: &ProgressInfo) {
        self.bar.set_position(info.current);
        if let Some(time) = info.current_time {
            self.bar.set_message(format!("{:.3}s", seconds(time)));
        }
    }
}

async fn build_index(
    input: &Path,
    limit: usize,
) -> Result<FrameIndex, Box<dyn std::error::Error>> {
    let source = Arc::new(FfmpegSource::open(input)?);
    let options = IndexOptions::new().with_frame_limit(limit);
    Ok(FrameIndexer::new().index(source, options).await?)
}

async fn run_command(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Index { input, limit, json } => {
            let index = build_index(&input, limit).await?;
            if json {
                let payload = json!({
                    "frames": index.len(),
                    "first_seconds": index.span().map(|(first, _)| seconds(first)),
                    "last_seconds": index.span().map(|(_, last)| seconds(last)),
                    "times": index.times().iter().map(|time| json!({
                        "value": time.value,
                        "timescale": time.timescale,
                    })).collect::<Vec<_>>(),
                });
                println!("{}", serde_json::to_string_pretty(&payload)?);
            } else {
                println!("Frames: {}", index.len());
                if let Some((first, last)) = index.span() {
                    println!("First: {first}");
                    println!("Last: {last}");
                }
            }
        }
        Commands::Nearest { input, time } => {
            let target = parse_media_time(&time)?;
            let index = build_index(&input, framegrab::DEFAULT_FRAME_LIMIT).await?;
            let frame = index.nearest_time(target).ok_or("video has no frames")?;
            println!("Frame {} at {}", frame.index, frame.time);
        }
        Commands::Export {
            input,
            times,
            out,
            format,
            quality,
            chunk_size,
            snap,
        } => {
            let encoding = parse_encoding(&format, quality)
                .ok_or(format!("unsupported --format: {format}"))?;

            let mut targets = times
                .iter()
                .map(|value| parse_media_time(value))
                .collect::<Result<Vec<_>, _>>()?;

            if snap {
                let index = build_index(&input, framegrab::DEFAULT_FRAME_LIMIT).await?;
                for target in &mut targets {
                    if let Some(frame) = index.nearest_time(*target) {
                        *target = frame.time;
                    }
                }
            }

            let mut request = ExportRequest::new(targets.clone())
                .with_encoding(encoding)
                .with_chunk_size(chunk_size);
            if let Some(out) = out {
                request = request.with_output_directory(out);
            }

            let progress = if cli.global.progress {
                let progress = Arc::new(TerminalProgress::new(targets.len() as u64)?);
                request = request.with_progress(progress.clone());
                Some(progress)
            } else {
                None
            };

            let generator = Arc::new(FfmpegFrameGenerator::open(&input)?);
            let handle = FrameExporter::new(generator).start(request)?;
            let directory = handle.output_directory().to_path_buf();

            match handle.wait().await {
                ExportStatus::Succeeded(files) => {
                    if let Some(progress) = progress {
                        progress.bar.finish_with_message("done");
                    }
                    if cli.global.verbose {
                        for (file, time) in files.iter().zip(&targets) {
                            eprintln!("saved {:.3}s -> {}", seconds(*time), file.display());
                        }
                    }
                    println!(
                        "{} {}",
                        "success:".green().bold(),
                        format!("Exported {} frame(s) to {}", files.len(), directory.display())
                            .green()
                    );
                }
                ExportStatus::Failed(error) => return Err(error.into()),
                ExportStatus::Cancelled => return Err("export cancelled".into()),
                ExportStatus::Progressed(_) => return Err("export stopped unexpectedly".into()),
            }
        }
        Commands::Completions { shell } => {
            let mut command = Cli::command();
            clap_complete::generate(shell, &mut command, "framegrab", &mut std::io::stdout());
        }
    }

    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    apply_global_options(&cli.global)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime.block_on(run_command(cli))
}

fn main() {
    if let Err(error) = run() {
        eprintln!("{} {error}", "error:".red().bold());
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_encoding, parse_media_time, parse_timecode};
    use framegrab::{ImageEncoding, MediaTime};

    #[test]
    fn parse_timecode_formats() {
        let seconds = parse_timecode("75").unwrap();
        assert_eq!(seconds.as_secs(), 75);

        let mm_ss = parse_timecode("01:15").unwrap();
        assert_eq!(mm_ss.as_secs(), 75);

        let hh_mm_ss = parse_timecode("00:01:15.5").unwrap();
        assert_eq!(hh_mm_ss.as_millis(), 75_500);

        assert!(parse_timecode("").is_err());
        assert!(parse_timecode("1:2:3:4").is_err());
    }

    #[test]
    fn parse_timecode_rejects_non_finite_and_huge_values() {
        for value in ["inf", "-inf", "NaN", "1e300", "00:00:inf", "1:NaN"] {
            assert!(parse_timecode(value).is_err(), "{value} was accepted");
        }
        assert_eq!(parse_timecode("-3").unwrap().as_secs(), 0);
    }

    #[test]
    fn parse_media_time_uses_microseconds() {
        let time = parse_media_time("1.5").unwrap();
        assert_eq!(time, MediaTime::new(1_500_000, 1_000_000));

        // Fits in a Duration but not in i64 microseconds.
        assert!(parse_media_time("1e15").is_err());
    }

    #[test]
    fn parse_encoding_aliases() {
        assert_eq!(
            parse_encoding("JPG", 80),
            Some(ImageEncoding::Jpeg { quality: 80 })
        );
        assert_eq!(parse_encoding("png", 80), Some(ImageEncoding::Png));
        assert!(parse_encoding("gif", 80).is_none());
    }
}
