use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, Level};

use vid_compress::ffmpeg_backend::DEFAULT_THREADS;
use vid_compress::input::{
    parse_positive, parse_size_mb, trim_window, DEFAULT_GIF_FPS, DEFAULT_GIF_HEIGHT,
};
use vid_compress::{
    compress, compute_plan, format_clip_duration, output_path_for, probe_duration, AppConfig,
    Codec, CompressError, ConversionOutput, EncodePlan, EncodeRequest, FfmpegBackend, GifRequest,
    Mp4Request, NoReveal, Preset, Reveal, SystemReveal,
};

#[derive(Parser)]
#[command(name = "vid-compress")]
#[command(version, long_about = None)]
#[command(about = "Compress a video to a target size (MP4) or turn it into a GIF")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Print the encode plan without running ffmpeg
    #[arg(long, global = true)]
    dry_run: bool,

    /// Machine-readable output on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Show the output in the file manager when done
    #[arg(long, global = true)]
    reveal: bool,

    /// Reject malformed MM:SS times instead of treating them as 00:00
    #[arg(long, global = true)]
    strict_times: bool,

    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args)]
struct TrimArgs {
    /// Trim start (MM:SS)
    #[arg(long)]
    start: Option<String>,
    /// Trim end (MM:SS), defaults to the end of the clip
    #[arg(long)]
    end: Option<String>,
    #[arg(long, default_value_t = DEFAULT_THREADS)]
    threads: u32,
}

#[derive(Subcommand)]
enum Commands {
    /// Re-encode to an MP4 of roughly the given size
    Mp4 {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        /// 8MB, 10MB, 25MB or a custom number of MB
        #[arg(short, long, default_value = "10MB")]
        size: String,
        #[arg(long, value_enum, default_value_t = Codec::default())]
        codec: Codec,
        #[arg(long, value_enum, default_value_t = Preset::default())]
        preset: Preset,
        /// Two-pass rate control (libx264 only)
        #[arg(long)]
        two_pass: bool,
        #[command(flatten)]
        trim: TrimArgs,
    },

    /// Convert to a looping 16:9 GIF
    Gif {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
        #[arg(long, default_value_t = DEFAULT_GIF_FPS.to_string())]
        fps: String,
        /// Output height in pixels (240, 320, 480, 720, 1080 or custom)
        #[arg(long, default_value_t = DEFAULT_GIF_HEIGHT.to_string())]
        height: String,
        #[command(flatten)]
        trim: TrimArgs,
    },

    /// Print the clip duration
    Probe {
        #[arg(value_name = "INPUT")]
        input: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    if let Err(e) = shared_utils::logging::init_logging(
        "vid_compress",
        shared_utils::logging::LogConfig::default().with_level(level),
    ) {
        eprintln!("⚠️  Could not initialize logging: {:#}", e);
    }

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            match e.downcast_ref::<CompressError>() {
                Some(err) => eprintln!("{}", err.user_message()),
                None => eprintln!("❌ Error: {:#}", e),
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = AppConfig::from_env();

    match cli.command {
        Commands::Probe { ref input } => {
            let input = config.resolve_input(input);
            let backend = config.backend()?.with_progress(false);
            let duration = probe_with_spinner(&backend, &input, !cli.json)?;
            if cli.json {
                println!(
                    "{}",
                    serde_json::json!({
                        "input_path": input.display().to_string(),
                        "duration_secs": duration,
                        "duration": format_clip_duration(duration),
                    })
                );
            } else {
                println!("⏱️  {}: {}", input.display(), format_clip_duration(duration));
            }
            Ok(())
        }

        Commands::Mp4 {
            ref input,
            ref size,
            codec,
            preset,
            two_pass,
            ref trim,
        } => {
            let input = config.resolve_input(input);
            let target_size_mb = parse_size_mb(size)?;
            let backend = config
                .backend()?
                .with_threads(trim.threads)
                .with_two_pass(two_pass)
                .with_progress(!cli.json);
            let duration = probe_with_spinner(&backend, &input, !cli.json)?;
            let window = trim_window(
                trim.start.as_deref(),
                trim.end.as_deref(),
                duration,
                cli.strict_times,
            )?;

            info!("🎬 MP4 target {}MB, {} / {}", target_size_mb, codec, preset);
            let request = EncodeRequest::Mp4(Mp4Request {
                target_size_mb,
                codec,
                preset,
                trim: window,
            });
            execute(&cli, &backend, &input, &request)
        }

        Commands::Gif {
            ref input,
            ref fps,
            ref height,
            ref trim,
        } => {
            let input = config.resolve_input(input);
            let fps = parse_positive("fps", fps)?;
            let vertical_resolution_px = parse_positive("resolution", height)?;
            let backend = config
                .backend()?
                .with_threads(trim.threads)
                .with_progress(!cli.json);
            let duration = probe_with_spinner(&backend, &input, !cli.json)?;
            let window = trim_window(
                trim.start.as_deref(),
                trim.end.as_deref(),
                duration,
                cli.strict_times,
            )?;

            info!("🎞️  GIF {}p @ {} fps", vertical_resolution_px, fps);
            let request = EncodeRequest::Gif(GifRequest {
                fps,
                vertical_resolution_px,
                trim: window,
            });
            execute(&cli, &backend, &input, &request)
        }
    }
}

fn probe_with_spinner(
    backend: &FfmpegBackend,
    input: &Path,
    visible: bool,
) -> anyhow::Result<f64> {
    let spinner = shared_utils::create_spinner("Reading video...", visible);
    let duration = probe_duration(backend, input);
    spinner.finish_and_clear();
    Ok(duration?)
}

fn execute(
    cli: &Cli,
    backend: &FfmpegBackend,
    input: &Path,
    request: &EncodeRequest,
) -> anyhow::Result<()> {
    if cli.dry_run {
        let plan = compute_plan(request)?;
        let output = output_path_for(input, request.output_format());
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "input_path": input.display().to_string(),
                    "output_path": output.display().to_string(),
                    "plan": plan,
                }))?
            );
        } else {
            print_plan(input, &output, &plan);
        }
        return Ok(());
    }

    let result = compress(backend, input, request)?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }

    let revealer: Box<dyn Reveal> = if cli.reveal {
        Box::new(SystemReveal)
    } else {
        Box::new(NoReveal)
    };
    // the file is already written; a file-manager failure is not fatal
    let _ = revealer.reveal(Path::new(&result.output_path));
    Ok(())
}

fn print_plan(input: &Path, output: &Path, plan: &EncodePlan) {
    println!("\n📋 Encode Plan");
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("📁 Input:  {}", input.display());
    println!("📦 Output: {}", output.display());
    println!("✂️  Trim:   {}", plan.trim());
    match plan {
        EncodePlan::Mp4(p) => {
            println!("🎬 Video:  {} kbps, {} ({})", p.video_bitrate_kbps, p.codec, p.preset);
            println!("🎵 Audio:  {} kbps AAC", p.audio_bitrate_kbps);
            println!("📐 Frame:  {}x{} @ {} fps", p.output_width, p.output_height, p.fps);
        }
        EncodePlan::Gif(p) => {
            println!("📐 Frame:  {}x{} @ {} fps", p.output_width, p.output_height, p.fps);
        }
    }
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
}

fn print_result(result: &ConversionOutput) {
    println!();
    println!("{}", result.message);
    println!("   Output: {}", result.output_path);
    println!(
        "   Size:   {:.2} MB in {:.1}s",
        result.output_size as f64 / (1024.0 * 1024.0),
        result.elapsed_secs
    );
}
