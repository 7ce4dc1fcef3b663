use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use pagewalk_core::config::DEFAULT_MAX_BOOK_CHAPTERS;
use pagewalk_core::{Engine, EngineConfig};
use tokio::net::TcpListener;

/// Serve the pagewalk engine over HTTP
#[derive(Parser, Debug)]
#[command(name = "pagewalk-server")]
#[command(version)]
#[command(about = "Serve chapter extraction and navigation over HTTP", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "PAGEWALK_BIND", default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Upstream fetch timeout in seconds
    #[arg(long, env = "PAGEWALK_FETCH_TIMEOUT", default_value_t = 20, value_name = "SECS")]
    fetch_timeout: u64,

    /// Retries after a failed fetch attempt
    #[arg(long, env = "PAGEWALK_MAX_RETRIES", default_value_t = 2, value_name = "NUM")]
    max_retries: u32,

    /// User-Agent sent upstream
    #[arg(long, env = "PAGEWALK_USER_AGENT", value_name = "UA")]
    user_agent: Option<String>,

    /// Minimum characters for the primary extractor's text to be accepted
    #[arg(long, env = "PAGEWALK_MIN_CONTENT_CHARS", default_value_t = 250, value_name = "NUM")]
    min_content_chars: usize,

    /// Upper bound on chapters collected by /book
    #[arg(long, env = "PAGEWALK_MAX_BOOK_CHAPTERS", default_value_t = DEFAULT_MAX_BOOK_CHAPTERS, value_name = "NUM")]
    max_book_chapters: usize,

    /// Time limit for a whole request in seconds
    #[arg(long, env = "PAGEWALK_REQUEST_TIMEOUT", default_value_t = 600, value_name = "SECS")]
    request_timeout: u64,
}

fn init_logging() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new("info,tower_http=debug"))
        .context("build log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!("initialize tracing subscriber: {err}"))?;

    Ok(())
}

fn engine_config(args: &Args) -> EngineConfig {
    let mut builder = EngineConfig::builder()
        .timeout(args.fetch_timeout)
        .max_retries(args.max_retries)
        .min_content_chars(args.min_content_chars)
        .max_book_chapters(args.max_book_chapters);
    if let Some(user_agent) = &args.user_agent {
        builder = builder.user_agent(user_agent.clone());
    }
    builder.build()
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(%err, "failed to listen for shutdown signal");
    }
    tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging()?;

    let engine = Engine::new(engine_config(&args)).context("build engine")?;
    let app = pagewalk_server::app(engine, Duration::from_secs(args.request_timeout));

    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("bind {}", args.bind))?;
    tracing::info!(addr = %args.bind, "pagewalk-server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serve")?;

    Ok(())
}
