use anyhow::{Context, Result};
use auxlee_audio::{create_router, AppState, BasicAuthResolver, Config, FsByteStore, Ingest};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "auxlee-audio")]
#[command(about = "Receive chunked audio recordings and assemble them into tracks")]
struct Args {
    /// Config file (extension optional)
    #[arg(short, long, default_value = "config/auxlee-audio")]
    config: String,

    /// Override the bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config))?;
    if let Some(bind) = args.bind {
        cfg.service.http.bind = bind;
    }
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    let session_config = cfg.session_config()?;
    let max_chunk_bytes = cfg.max_chunk_bytes()?;

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!("Audio storage: {}", cfg.storage.audio_storage_path);
    if cfg.auth.users.is_empty() {
        warn!("No users configured under [auth.users]; every API request will be rejected");
    }

    let store = FsByteStore::new(&cfg.storage.audio_storage_path)
        .await
        .context("Failed to initialize audio storage")?;
    let ingest = Ingest::start(Arc::new(store), session_config);

    let resolver = Arc::new(BasicAuthResolver::new(cfg.auth.users.clone()));
    let state = AppState::new(&ingest, resolver, cfg.service.name.clone(), max_chunk_bytes);
    let app = create_router(state);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("HTTP server listening on {}", addr);
    axum::serve(listener, app)
        .await
        .context("HTTP server failed")?;

    Ok(())
}
