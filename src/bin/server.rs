use clap::Parser;
use reqwest::Url;
use std::{net::SocketAddr, path::PathBuf, time::Duration};

use parrot::config::{
    DEFAULT_BASE_URL, DEFAULT_CLI_MARKER, DEFAULT_FRAME_COUNT, DEFAULT_REDIRECT_URL,
};
use parrot::{
    router, AppConfig, AppState, Color, DirSource, HttpSource, LoopMode, Palette, StreamConfig,
};

/// Command-line options for the HTTP server.
#[derive(Parser)]
#[command(
    author,
    version,
    about = "Parrot HTTP server streaming colorized ASCII animations to terminals"
)]
struct Config {
    /// Address to bind the HTTP server to (e.g. 127.0.0.1:3000)
    #[arg(long, default_value = "127.0.0.1:3000")]
    addr: SocketAddr,

    /// Base URL holding 0.txt, 1.txt, ... frame files
    #[arg(long, value_name = "URL", default_value = DEFAULT_BASE_URL)]
    base_url: Url,

    /// Read frames from a local directory instead of the base URL
    #[arg(long, value_name = "DIR")]
    frames_dir: Option<PathBuf>,

    /// Number of frames to fetch per request
    #[arg(short = 'n', long, default_value_t = DEFAULT_FRAME_COUNT)]
    frame_count: usize,

    /// Delay between frames in milliseconds
    #[arg(long, value_name = "MS", default_value_t = 70)]
    interval_ms: u64,

    /// Play the animation once and close the stream instead of looping
    #[arg(long)]
    once: bool,

    /// Send frames without color escape codes
    #[arg(long)]
    no_color: bool,

    /// Comma-separated colors to cycle through (at least two)
    #[arg(long, value_name = "COLORS", value_delimiter = ',')]
    palette: Vec<Color>,

    /// Where browsers are redirected instead of receiving the stream
    #[arg(long, value_name = "URL", default_value = DEFAULT_REDIRECT_URL)]
    redirect_url: String,

    /// User-Agent substring identifying terminal clients
    #[arg(long, value_name = "MARKER", default_value = DEFAULT_CLI_MARKER)]
    cli_marker: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();
    let cfg = Config::parse();

    let palette = if cfg.palette.is_empty() {
        Palette::default()
    } else {
        Palette::new(cfg.palette)?
    };
    let app_config = AppConfig {
        stream: StreamConfig {
            interval: Duration::from_millis(cfg.interval_ms.max(1)),
            loop_mode: if cfg.once { LoopMode::Once } else { LoopMode::Loop },
            colorize: !cfg.no_color,
            palette,
        },
        frame_count: cfg.frame_count,
        redirect_url: cfg.redirect_url,
        cli_marker: cfg.cli_marker,
    };

    let state = match cfg.frames_dir {
        Some(dir) => {
            tracing::info!("serving frames from {}", dir.display());
            AppState::new(DirSource::new(dir), app_config)
        }
        None => {
            let source = HttpSource::new(cfg.base_url);
            tracing::info!("serving frames from {}", source.base());
            AppState::new(source, app_config)
        }
    };
    let app = router(state);

    tracing::info!("listening on {}", cfg.addr);
    let server = axum::Server::bind(&cfg.addr).serve(app.into_make_service());
    // open streams never finish on their own, so shutdown does not wait for them
    tokio::select! {
        res = server => res?,
        _ = tokio::signal::ctrl_c() => tracing::info!("shutting down"),
    }
    Ok(())
}
