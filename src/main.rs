use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use clip_detector::{
    CandidateDetector, CandidateResponse, CaptionScorer, CaptionTrackParser, ChapterExtractor,
    Config, DetectionMode, JsonFileRegistry, RegistrationStatus, SectionSource,
};
use serde::Serialize;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("clip-detector")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Detect song and segment boundaries in hosted videos")
        .subcommand_required(true)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("Configuration file (defaults to the standard search paths)")
                .global(true),
        )
        .arg(
            Arg::new("library")
                .short('l')
                .long("library")
                .value_name("DIR")
                .help("Directory of yt-dlp downloads (info.json and caption files)")
                .global(true),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable verbose logging")
                .action(clap::ArgAction::SetTrue)
                .global(true),
        )
        .subcommand(
            Command::new("detect")
                .about("Detect clip candidates for a video id")
                .arg(Arg::new("video-id").value_name("VIDEO_ID").required(true))
                .arg(
                    Arg::new("mode")
                        .short('m')
                        .long("mode")
                        .value_name("MODE")
                        .help("chapters, captions or combined (defaults to the configured mode)"),
                ),
        )
        .subcommand(
            Command::new("register")
                .about("Register a video URL and detect its candidates")
                .arg(Arg::new("url").value_name("URL").required(true)),
        )
        .subcommand(
            Command::new("extract")
                .about("Extract chapters from a local text file")
                .arg(Arg::new("file").value_name("FILE").required(true))
                .arg(
                    Arg::new("duration")
                        .short('d')
                        .long("duration")
                        .value_name("SECONDS")
                        .value_parser(clap::value_parser!(u32))
                        .help("Video duration used for the last chapter's end"),
                )
                .arg(
                    Arg::new("comment")
                        .long("comment")
                        .help("Treat the text as a comment (needs at least two timestamps)")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("captions")
                .about("Score the segments of a local SRT or WebVTT caption track")
                .arg(Arg::new("file").value_name("FILE").required(true)),
        )
}

#[tokio::main]
async fn main() -> Result<()> {
    let matches = cli().get_matches();

    let mut config = match matches.get_one::<String>("config") {
        Some(path) => Config::load_from(&PathBuf::from(path))?,
        None => Config::load().unwrap_or_default(),
    };
    if let Some(dir) = matches.get_one::<String>("library") {
        config.library.dir = PathBuf::from(dir);
    }

    init_logging(&config, matches.get_flag("verbose"));
    config.validate()?;

    match matches.subcommand() {
        Some(("detect", sub)) => run_detect(&config, sub).await,
        Some(("register", sub)) => run_register(&config, sub).await,
        Some(("extract", sub)) => run_extract(&config, sub).await,
        Some(("captions", sub)) => run_captions(&config, sub).await,
        _ => Ok(()),
    }
}

fn init_logging(config: &Config, verbose: bool) {
    let level = if verbose { "debug" } else { config.output.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("clip_detector={},warn", level)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_json<T: Serialize>(config: &Config, value: &T) -> Result<()> {
    let output = if config.output.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{}", output);
    Ok(())
}

async fn run_detect(config: &Config, matches: &ArgMatches) -> Result<()> {
    let video_id = matches
        .get_one::<String>("video-id")
        .context("VIDEO_ID is required")?;
    let mode = match matches.get_one::<String>("mode") {
        Some(mode) => mode.parse::<DetectionMode>()?,
        None => config.detection.default_mode,
    };

    let detector = CandidateDetector::from_config(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupted, stopping comment scan");
            on_interrupt.cancel();
        }
    });

    let start_time = std::time::Instant::now();
    let candidates = detector.detect_with_cancel(video_id, mode, &cancel).await?;
    info!("🎉 Detection completed in {:.2}s", start_time.elapsed().as_secs_f64());

    let response: Vec<CandidateResponse> = candidates.iter().map(CandidateResponse::from).collect();
    print_json(config, &response)
}

async fn run_register(config: &Config, matches: &ArgMatches) -> Result<()> {
    let url = matches.get_one::<String>("url").context("URL is required")?;

    let detector = CandidateDetector::from_config(config)?;
    let registry = JsonFileRegistry::open(&config.registry.path).await?;

    let outcome = detector.register_and_detect(url, &registry).await?;
    let verb = match outcome.status {
        RegistrationStatus::Created => "Registered",
        RegistrationStatus::Reused => "Reused",
    };
    info!(
        "📊 {} video {} with {} candidates",
        verb,
        outcome.video.video_id,
        outcome.candidates.len()
    );

    print_json(config, &outcome)
}

async fn run_extract(config: &Config, matches: &ArgMatches) -> Result<()> {
    let file = matches.get_one::<String>("file").context("FILE is required")?;
    let duration = matches.get_one::<u32>("duration").copied();
    let source = if matches.get_flag("comment") {
        SectionSource::Comment
    } else {
        SectionSource::VideoDescription
    };

    let text = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Cannot read {}", file))?;

    let candidates = ChapterExtractor::new().extract(&text, duration, source);
    info!("📝 {} chapters in {}", candidates.len(), file);
    print_json(config, &candidates)
}

async fn run_captions(config: &Config, matches: &ArgMatches) -> Result<()> {
    let file = matches.get_one::<String>("file").context("FILE is required")?;

    let content = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Cannot read {}", file))?;

    let segments = CaptionTrackParser::parse_segments(&content);
    let candidates = CaptionScorer::new().score(&segments);
    info!("🎵 Scored {} caption segments from {}", candidates.len(), file);
    print_json(config, &candidates)
}
