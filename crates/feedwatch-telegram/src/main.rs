//! Feedwatch binary.
//!
//! Start with:
//! ```bash
//! TELEGRAM_BOT_TOKEN=xxx FEEDWATCH_FEED_URL=... FEEDWATCH_DETAIL_URL=... cargo run -p feedwatch-telegram
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use feedwatch_api::{ApiConfig, AppState};
use feedwatch_core::{
    config, CaptionRenderer, FeedIngester, FetchSettings, HttpFetcher, MagnetLinks,
    MagnetResolver, RowPatternExtractor, WatchConfig, DEFAULT_MAGNET_PREFIX,
};
use feedwatch_persistence::{BaselineStore, SubscriberStore};
use feedwatch_telegram::{run_scheduler, FeedwatchBot, RunOutcome, TelegramError, WatchService};
use tracing_subscriber::EnvFilter;

/// Feedwatch - release feed notifications on Telegram
#[derive(Parser, Debug)]
#[command(name = "feedwatch")]
#[command(about = "Watch a release feed and notify Telegram subscribers")]
struct Args {
    /// Seconds between feed checks (overrides FEEDWATCH_INTERVAL_SECS)
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    interval: Option<u64>,

    /// Host for the magnet endpoint server
    #[arg(long, env = "FEEDWATCH_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port for the magnet endpoint server
    #[arg(short, long, env = "FEEDWATCH_PORT", default_value = "8080")]
    port: u16,

    /// Run a single check and exit
    #[arg(long)]
    once: bool,

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
    let _ = dotenvy::from_filename(".env.local").or_else(|_| dotenvy::dotenv());

    let filter = match args.verbose {
        0 => "feedwatch=info,feedwatch_telegram=info,feedwatch_core=info,feedwatch_api=info,teloxide=warn",
        1 => "feedwatch=debug,feedwatch_telegram=debug,feedwatch_core=debug,feedwatch_api=debug,tower_http=debug,teloxide=info",
        2 => "feedwatch=trace,feedwatch_telegram=trace,feedwatch_core=trace,feedwatch_api=trace,tower_http=trace,teloxide=debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = config::ensure_all_dirs() {
        tracing::warn!(error = %e, "Failed to create all directories");
    }

    let mut watch = WatchConfig::from_env()?;
    if let Some(secs) = args.interval {
        watch.interval = Duration::from_secs(secs);
    }

    let fetcher = Arc::new(HttpFetcher::new(FetchSettings::default())?);
    let links = MagnetLinks::new(&watch.public_url, DEFAULT_MAGNET_PREFIX).map_err(|e| {
        TelegramError::InvalidPublicUrl {
            url: watch.public_url.clone(),
            reason: e.to_string(),
        }
    })?;

    let bot = FeedwatchBot::from_env()?;
    let service = Arc::new(WatchService::new(
        FeedIngester::new(fetcher.clone(), watch.feed_url.clone()),
        BaselineStore::new(config::baseline_file()),
        SubscriberStore::new(config::subscribers_file()),
        CaptionRenderer::new(links),
        Arc::new(bot.delivery()),
    ));

    if args.once {
        match service.run().await? {
            RunOutcome::Completed(report) => println!("{:?}", report),
            RunOutcome::Skipped => println!("Run skipped"),
        }
        return Ok(());
    }

    let username = bot.get_me().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to get bot info");
        e
    })?;
    tracing::info!(username = %username, "Bot initialized successfully");

    let resolver = MagnetResolver::new(
        fetcher,
        Arc::new(RowPatternExtractor),
        watch.detail_url_template.clone(),
    );
    let api_state = AppState::new(ApiConfig::new(args.host.clone(), args.port), resolver);
    tokio::spawn(async move {
        if let Err(e) = feedwatch_api::serve(api_state).await {
            tracing::error!(error = %e, "HTTP server stopped");
        }
    });

    tokio::spawn(run_scheduler(Arc::clone(&service), watch.interval));

    println!("\nFeedwatch");
    println!("   Bot: @{}", username);
    println!("   Feed: {}", watch.feed_url);
    println!("   Magnet links: {}{}", watch.public_url, DEFAULT_MAGNET_PREFIX);
    println!("   Interval: {}s", watch.interval.as_secs());
    println!("\nSend /start to the bot to subscribe");
    println!("   Press Ctrl+C to stop\n");

    bot.start_polling(service).await;

    Ok(())
}
