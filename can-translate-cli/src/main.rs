//! CAN Translate CLI Application
//!
//! Replays candump-style CAN frames through the translation core:
//! - Loads the vehicle definition (signals, buses, raw catalog) from TOML
//! - Decodes, rate-limits and translates every frame
//! - Writes JSON lines or length-delimited protobuf to stdout or a file

use anyhow::{Context, Result};
use can_translate::{ManualClock, OutputFormat, Translator, WriterSink};
use clap::{Parser, ValueEnum};
use std::fs::File;
use std::io::{self, BufRead, BufReader, BufWriter, Write};
use std::path::PathBuf;

mod config;
mod input;

/// CAN Translate - Turn raw CAN frames into vehicle messages
#[derive(Parser, Debug)]
#[command(name = "can-translate-cli")]
#[command(about = "Translate CAN frames into JSON or protobuf vehicle messages", long_about = None)]
#[command(version)]
struct Args {
    /// Path to the vehicle definition (TOML)
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// Frame input in candump format (default: stdin)
    #[arg(short, long, value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file for serialized messages (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Override the output format from the vehicle definition
    #[arg(short, long, value_enum)]
    format: Option<FormatArg>,

    /// Drive sampling clocks from the recorded frame timestamps
    #[arg(long)]
    replay_time: bool,

    /// Maximum number of frames to process
    #[arg(long, value_name = "COUNT")]
    max_frames: Option<usize>,

    /// Verbosity level (can be repeated: -v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress all logging except errors
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum FormatArg {
    Json,
    Proto,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Json => OutputFormat::Json,
            FormatArg::Proto => OutputFormat::Proto,
        }
    }
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    // Initialize logging
    init_logging(args.verbose, args.quiet);

    log::info!("CAN Translate CLI v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Using translator library v{}", can_translate::VERSION);

    run(&args)
}

fn run(args: &Args) -> Result<()> {
    let mut vehicle = config::load_config(&args.config)?;
    if let Some(format) = args.format {
        vehicle.output_format = format.into();
    }
    log::debug!("Configuration loaded: {:?}", args.config);

    let output: Box<dyn Write + Send> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path).with_context(|| format!("Failed to create output file: {:?}", path))?,
        )),
        None => Box::new(io::stdout()),
    };

    let mut translator = Translator::from_config(&vehicle, WriterSink::new(output))
        .context("Failed to build translator")?;
    let replay_clock = ManualClock::new(0);
    if args.replay_time {
        translator = translator.with_time_source(replay_clock.clone());
    }

    let reader: Box<dyn BufRead> = match &args.input {
        Some(path) => Box::new(BufReader::new(
            File::open(path).with_context(|| format!("Failed to open input file: {:?}", path))?,
        )),
        None => Box::new(BufReader::new(io::stdin())),
    };

    let mut frames = 0usize;
    for (line_number, line) in reader.lines().enumerate() {
        if args.max_frames.is_some_and(|max| frames >= max) {
            log::info!("Reached frame limit of {}", frames);
            break;
        }

        let line = line.context("Failed to read input")?;
        let frame = match input::parse_frame_line(&line) {
            Ok(Some(frame)) => frame,
            Ok(None) => continue,
            Err(e) => {
                log::warn!("Skipping line {}: {:#}", line_number + 1, e);
                continue;
            }
        };

        if let (true, Some(timestamp)) = (args.replay_time, frame.timestamp_ms) {
            replay_clock.set(timestamp);
        }
        translator.process_frame(&frame);
        frames += 1;
    }

    translator.flush().context("Failed to flush output")?;

    let stats = translator.stats();
    log::info!(
        "Processed {} frames: {} translated, {} passed through, {} ignored",
        stats.frames_processed,
        stats.frames_translated,
        stats.frames_passed_through,
        stats.frames_ignored
    );
    log::info!(
        "Sent {} {} messages ({} bytes), dropped {}",
        stats.pipeline.messages_sent,
        vehicle.output_format,
        stats.pipeline.bytes_sent,
        stats.pipeline.messages_dropped
    );
    let registry = translator.registry();
    log::info!(
        "{} of {} raw definitions cataloged, {} frames refused",
        stats.registered_messages,
        registry.capacity(),
        stats.registry_rejections
    );
    for definition in registry.definitions() {
        log::debug!("  0x{:X} on bus {}", definition.id, definition.bus);
    }

    Ok(())
}

/// Initialize logging based on verbosity level
fn init_logging(verbose: u8, quiet: bool) {
    use env_logger::Builder;
    use log::LevelFilter;

    let level = if quiet {
        LevelFilter::Error
    } else {
        match verbose {
            0 => LevelFilter::Info,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        }
    };

    Builder::new()
        .filter_level(level)
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}] {}",
                record.level(),
                record.target(),
                record.args()
            )
        })
        .init();
}
