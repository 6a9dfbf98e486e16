mod extract;
mod feed;
mod logging;
mod store;
mod transport;
mod util;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufRead, BufReader};

use cardclaim_engine::{BotSettings, ClaimArbiter, ConfigStore, Jitter};
use feed::ReplaySummary;
use store::FileSettingsStore;
use transport::ConsoleTransport;
use util::parse_assignment;

#[derive(Debug, Parser)]
#[command(name = "cardclaim-bot", version)]
#[command(about = "Replay chat transcripts through the card claim arbitration engine")]
struct Args {
    /// Settings file (created with defaults when missing)
    #[arg(long, default_value = "config/settings.json")]
    config: PathBuf,

    /// JSON-lines transcript of inbound events; reads stdin when omitted
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Seed for every random draw, making a replay reproducible
    #[arg(long)]
    seed: Option<u64>,

    /// Append log lines to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Print the default settings as JSON and exit
    #[arg(long)]
    print_default_config: bool,

    /// Print the current claim probabilities and exit
    #[arg(long)]
    show_probs: bool,

    /// Set a claim probability, e.g. `tier3=0.5` or `tierS=80%` (repeatable)
    #[arg(long = "set-prob", value_name = "CATEGORY=VALUE", value_parser = parse_assignment)]
    set_prob: Vec<(String, f64)>,

    /// Start with claiming switched off
    #[arg(long)]
    disabled: bool,

    /// Keep running this many seconds after the transcript so follow-ups can fire
    #[arg(long, default_value_t = 0)]
    linger_secs: u64,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref(), args.verbose)?;

    if args.print_default_config {
        println!("{}", BotSettings::default().to_json_pretty()?);
        return Ok(());
    }

    let store = FileSettingsStore::load_or_init(&args.config)?;
    if apply_admin_options(&args, &store)? {
        return Ok(());
    }

    announce_banner(&store);
    let start_time = Instant::now();

    let transport = Arc::new(ConsoleTransport::default());
    let jitter = args.seed.map_or_else(Jitter::from_entropy, Jitter::from_seed);
    let config: Arc<dyn ConfigStore> = Arc::new(store.clone());
    let arbiter = ClaimArbiter::spawn(&store.snapshot(), Arc::clone(&config), transport.clone(), jitter);
    if args.disabled {
        arbiter.set_enabled(false);
    }

    let reader = open_transcript(&args).await?;
    let summary = feed::replay(reader, &arbiter, config.as_ref()).await?;

    arbiter.queue().wait_idle().await;
    if args.linger_secs > 0 {
        tokio::time::sleep(Duration::from_secs(args.linger_secs)).await;
    }

    print_summary(&summary, &transport, start_time);
    Ok(())
}

/// Handle `--set-prob` / `--show-probs`. Returns whether to exit afterwards.
fn apply_admin_options(args: &Args, store: &FileSettingsStore) -> Result<bool> {
    for (category, value) in &args.set_prob {
        let message = store.set_probability(category, *value)?;
        println!("✅ {message}");
    }
    if !args.show_probs && args.set_prob.is_empty() {
        return Ok(false);
    }
    println!("{}", "Current claim probabilities:".bold());
    println!("{}", store.probabilities());
    Ok(true)
}

fn announce_banner(store: &FileSettingsStore) {
    println!("{}", "🎴 Card Claim Bot (transcript replay)".bright_cyan().bold());
    println!("{}", "======================================".cyan());
    println!("Settings: {}", store.path().display());
}

async fn open_transcript(args: &Args) -> Result<Box<dyn AsyncBufRead + Unpin>> {
    match &args.transcript {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open transcript {}", path.display()))?;
            Ok(Box::new(BufReader::new(file)))
        }
        None => Ok(Box::new(BufReader::new(tokio::io::stdin()))),
    }
}

fn print_summary(summary: &ReplaySummary, transport: &ConsoleTransport, start_time: Instant) {
    println!();
    println!("{}", "📊 Replay Summary".bright_white().bold());
    println!("{}", "-".repeat(30).white());
    println!("Events:        {}", summary.events);
    if summary.invalid > 0 {
        println!("Invalid lines: {}", summary.invalid.to_string().red());
    }
    println!("Skipped:       {}", summary.skipped);
    println!("Admin:         {}", summary.admin);
    println!("Ignored:       {}", summary.ignored);
    println!("Queued:        {}", summary.queued.to_string().green());
    println!("Passed on:     {}", summary.deferred.to_string().yellow());
    if summary.overflowed > 0 {
        println!("Overflowed:    {}", summary.overflowed.to_string().red());
    }
    println!("Other claims:  {} ({} reacted)", summary.other_claims, summary.reactions);
    println!(
        "Sent:          {} texts, {} stickers",
        transport.texts_sent(),
        transport.stickers_sent()
    );
    println!("Elapsed:       {:.2?}", start_time.elapsed());
}
