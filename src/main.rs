//! Main entry point for vidresolve CLI

use anyhow::{anyhow, Context};
use clap::Parser;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use vidresolve::cli::{Args, OutputFormatter};
use vidresolve::{dedup_videos, select_video, AsyncSession, Registry, Session, Video};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging()?;

    let args = Args::parse();
    debug!("Starting vidresolve with args: {:?}", args);

    let formatter = OutputFormatter::new(args.verbosity_level(), args.json);

    if args.list_decoders {
        formatter.print_decoders(&Registry::builtin().names());
        return Ok(());
    }

    let url = args
        .url
        .clone()
        .ok_or_else(|| anyhow!("an embed URL is required"))?;
    let selector = args.quality_selector().map_err(|e| anyhow!(e))?;

    match Registry::builtin().resolve(&url) {
        Some(decoder) => formatter.info(&format!("Decoder: {}", decoder.name())),
        None => formatter.info("No decoder matches, treating the URL as a direct link"),
    }

    let spinner = formatter.create_spinner(&url);
    let resolved = resolve(&args, &url).await;
    if let Some(spinner) = spinner {
        spinner.finish_and_clear();
    }

    let videos = match resolved {
        Ok(videos) => dedup_videos(videos),
        Err(err) => {
            formatter.error(&format!("{:#}", err));
            std::process::exit(1);
        }
    };
    info!("Resolved {} video(s) from {}", videos.len(), url);

    if videos.is_empty() {
        formatter.warning("The host reports the video as unavailable");
        return Ok(());
    }

    let chosen: Vec<&Video> = match &selector {
        Some(selector) => select_video(&videos, selector).into_iter().collect(),
        None => videos.iter().collect(),
    };
    if chosen.is_empty() {
        formatter.warning("No video matches the requested quality");
        return Ok(());
    }

    formatter.print_videos(&chosen)?;
    Ok(())
}

/// Run the URL through the async session, or the blocking one off the runtime
async fn resolve(args: &Args, url: &str) -> anyhow::Result<Vec<Video>> {
    let config = args.http_config();

    if args.blocking {
        let url = url.to_string();
        let videos = tokio::task::spawn_blocking(move || {
            Session::new(config)?.resolve_videos(&url)
        })
        .await
        .context("blocking resolver task failed")??;
        return Ok(videos);
    }

    let session = AsyncSession::new(config)?;
    Ok(session.resolve_videos(url).await?)
}

/// Initialize logging system
fn init_logging() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info"))?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .try_init()?;

    Ok(())
}
