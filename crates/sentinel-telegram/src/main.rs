//! Sentinel Telegram daemon.
//!
//! Start the daemon with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx TELEGRAM_CHAT_IDS=123 cargo run -p sentinel-telegram
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use sentinel_core::{config, PatternConfig, StateClassifier, StatePaths};
use sentinel_persistence::{EventLog, FileCompletionStore, HealPolicy, SessionStartStore};
use sentinel_runtime::{MessageSink, NullSink, Runtime, RuntimeConfig};
use sentinel_telegram::TelegramSink;
use sentinel_tmux::TmuxOrchestrator;

/// Sentinel - watch tmux sessions and notify Telegram when agents finish
#[derive(Parser, Debug)]
#[command(name = "sentinel-telegram")]
#[command(about = "Notify Telegram when tmux agent sessions finish work or need input")]
struct Args {
    /// Poll interval in seconds (overrides SENTINEL_POLL_INTERVAL_SECS)
    #[arg(short, long)]
    interval: Option<u64>,

    /// Only monitor sessions whose names start with this prefix
    #[arg(short, long, env = "SENTINEL_SESSION_PREFIX")]
    prefix: Option<String>,

    /// Keep a pinned status message with every session's state
    #[arg(short, long)]
    dashboard: bool,

    /// Log notifications instead of sending them
    #[arg(long)]
    dry_run: bool,

    /// Verbose logging (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    // Load environment variables from config directory first
    let env_path = config::env_file();
    if env_path.exists() {
        let _ = dotenvy::from_path(&env_path);
    }
    // Also try local .env.local or .env
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    // Initialize logging based on verbosity; RUST_LOG wins when set
    let filter = match args.verbose {
        0 => "sentinel_telegram=info,sentinel_runtime=info,sentinel_persistence=warn,teloxide=warn",
        1 => "sentinel_telegram=debug,sentinel_runtime=debug,sentinel_persistence=info,teloxide=info",
        2 => "sentinel_telegram=trace,sentinel_runtime=trace,sentinel_persistence=debug,teloxide=debug",
        _ => "trace",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(filter))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create all directories");
    }

    let patterns = PatternConfig::load_or_default(&config::patterns_file()).compile()?;
    let classifier = StateClassifier::with_patterns(patterns);

    let tmux = TmuxOrchestrator::new()?;

    let now = Utc::now();
    let paths = StatePaths::default_paths();
    let store = Arc::new(FileCompletionStore::open(
        &paths.completions,
        HealPolicy::default(),
        now,
    ));
    let session_starts = Arc::new(SessionStartStore::open(&paths.session_starts, now));
    let event_log = Arc::new(EventLog::new(paths.transitions.clone()));

    let mut runtime_config = RuntimeConfig::from_env().with_dashboard(args.dashboard);
    if let Some(secs) = args.interval.filter(|s| *s > 0) {
        runtime_config = runtime_config.with_poll_interval(Duration::from_secs(secs));
    }
    if let Some(prefix) = args.prefix.filter(|p| !p.trim().is_empty()) {
        runtime_config = runtime_config.with_session_prefix(prefix.trim());
    }

    let sink: Arc<dyn MessageSink> = if args.dry_run {
        tracing::info!("Dry run: notifications will not be sent");
        Arc::new(NullSink)
    } else {
        let sink = TelegramSink::from_env()?;
        let username = sink.get_me().await.map_err(|e| {
            tracing::error!(error = %e, "Failed to get bot info");
            e
        })?;
        tracing::info!(username = %username, chats = sink.chat_count(), "Bot initialized successfully");
        Arc::new(sink)
    };

    println!("\n[sentinel] Watching tmux sessions");
    println!("   State: {}", config::state_dir().display());
    println!(
        "   Poll interval: {}s",
        runtime_config.poll_interval.as_secs()
    );
    if let Some(prefix) = &runtime_config.session_prefix {
        println!("   Prefix: {}", prefix);
    }
    println!("   Press Ctrl+C to stop\n");

    let mut runtime = Runtime::builder(Arc::new(tmux), sink)
        .with_config(runtime_config)
        .with_classifier(classifier)
        .with_store(store)
        .with_session_starts(session_starts)
        .with_event_log(event_log)
        .build();

    runtime.start().await?;
    tokio::signal::ctrl_c().await?;
    runtime.shutdown().await?;

    Ok(())
}
