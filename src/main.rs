use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use fscram::shuffle::constants::DEFAULT_CONFIG_FILE_NAME;
use fscram::utils::{format_bytes, format_duration, setup_logging};
use fscram::{ShuffleConfig, ShuffleCoordinator, ShuffleMode};

#[derive(Parser)]
#[command(name = "fscram")]
#[command(about = "🔀 fscram: reshuffles the lines of a file with a pool of concurrent workers")]
#[command(version)]
struct Args {
    #[arg(help = "Input file whose lines will be shuffled")]
    input: PathBuf,

    #[arg(help = "Output file for the shuffled lines (created or truncated)")]
    output: PathBuf,

    #[arg(short, long, help = "Configuration file (JSON)")]
    config: Option<PathBuf>,

    #[arg(short, long, help = "Seed for a reproducible shuffle")]
    seed: Option<u64>,

    #[arg(short, long, help = "Ordering mode: permuted or interleaved")]
    mode: Option<ShuffleMode>,

    #[arg(long, help = "Base jitter in microseconds (0 disables sleeping)")]
    jitter_micros: Option<u64>,

    #[arg(long, help = "Maximum number of concurrent workers (1-1024)")]
    max_workers: Option<usize>,

    #[arg(long, help = "Give up after this many seconds")]
    deadline_seconds: Option<u64>,

    #[arg(short, long, help = "Verbose output")]
    verbose: bool,
}

fn load_config(args: &Args) -> Result<ShuffleConfig> {
    let mut config = match &args.config {
        Some(path) if path.exists() => ShuffleConfig::from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        Some(path) => {
            println!("📄 Config file not found, using defaults: {}", path.display());
            ShuffleConfig::default()
        }
        None => {
            let default_path = PathBuf::from(DEFAULT_CONFIG_FILE_NAME);
            if default_path.exists() {
                ShuffleConfig::from_file(&default_path)
                    .with_context(|| format!("Failed to load configuration from {}", default_path.display()))?
            } else {
                ShuffleConfig::default()
            }
        }
    };

    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(jitter) = args.jitter_micros {
        config.jitter_micros = jitter;
    }
    if let Some(max_workers) = args.max_workers {
        config.max_workers = max_workers;
    }
    if args.deadline_seconds.is_some() {
        config.deadline_seconds = args.deadline_seconds;
    }
    if args.verbose {
        config.verbose = true;
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) if err.kind() == ErrorKind::MissingRequiredArgument => {
            print!("{}", err.render());
            std::process::exit(2);
        }
        Err(err) => err.exit(),
    };
    let config = load_config(&args)?;

    setup_logging(if config.verbose { "verbose" } else { "normal" })?;

    println!("🔀 fscram");
    println!("🔍 Input: {}", args.input.display());
    println!("📝 Output: {}", args.output.display());

    if config.verbose {
        if let Ok(metadata) = std::fs::metadata(&args.input) {
            println!("📊 Input size: {}", format_bytes(metadata.len()));
        }
        println!("🧵 Max workers: {}", config.max_workers);
        println!("⏳ Base jitter: {}µs", config.jitter_micros);
    }

    let shutdown_flag = Arc::new(AtomicBool::new(false));
    let shutdown_flag_clone = shutdown_flag.clone();

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\n🛑 Shutdown signal received. Stopping workers...");
            shutdown_flag_clone.store(true, Ordering::Relaxed);
        }
    });

    let start_time = Instant::now();
    let coordinator = ShuffleCoordinator::new(config)?.with_shutdown_signal(shutdown_flag);

    let stats = coordinator
        .shuffle(&args.input, &args.output)
        .await
        .with_context(|| format!("Failed to shuffle {}", args.input.display()))?;

    let elapsed = start_time.elapsed();

    println!("\n🎉 Shuffle completed successfully! 🎉");
    println!("=======================================");
    println!("📊 Lines shuffled: {}", stats.lines_written);
    println!("🧵 Workers: {} (quota {} lines each)", stats.workers_spawned, stats.quota);
    match stats.mode {
        ShuffleMode::Permuted => println!("🎲 Seed: {} (pass --seed {} to reproduce)", stats.seed, stats.seed),
        ShuffleMode::Interleaved => println!("🎲 Order: interleaved by worker scheduling"),
    }
    println!("⏱️ Time: {}", format_duration(elapsed.max(Duration::from_millis(stats.processing_time_ms))));
    println!("📜 Output written to: {}", args.output.display());

    Ok(())
}
