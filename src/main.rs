use anyhow::{Context, Result};
use clap::Parser;
use marketchat::voice::{LogSubmitter, MessageSubmitter};
use marketchat::{
    create_router, AppState, ComposerFactory, Config, HttpApi, NatsClient, NatsSubmitter, Store,
};
use std::sync::Arc;
use tracing::{info, Level};

#[derive(Debug, Parser)]
#[command(name = "marketchat", about = "Headless host for marketplace chat composers")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/marketchat")]
    config: String,

    /// Log verbosity
    #[arg(long, default_value_t = Level::INFO)]
    log_level: Level,

    /// Override the HTTP bind address
    #[arg(long)]
    bind: Option<String>,

    /// Override the HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let cfg = Config::load(&args.config)?;

    info!("Marketchat v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);
    info!("Voice clips cached in {}", cfg.voice.recordings_dir().display());

    let submitter: Arc<dyn MessageSubmitter> = match &cfg.chat {
        Some(chat) => {
            let client = NatsClient::connect(
                &chat.nats_url,
                chat.conversation_id.clone(),
                chat.sender_id.clone(),
            )
            .await?;
            info!("Voice messages go to {}", client.subject());
            Arc::new(NatsSubmitter::new(client))
        }
        None => {
            info!("No chat backend configured, voice messages will be dropped");
            Arc::new(LogSubmitter)
        }
    };

    let mut state = AppState::new(ComposerFactory::new(cfg.voice.clone(), submitter));
    if let Some(api) = &cfg.api {
        info!("Marketplace backend: {}", api.base_url);
        let store = Store::new(Arc::new(HttpApi::new(api.base_url.clone())));
        state = state.with_store(Arc::new(store));
    }

    let bind = args.bind.unwrap_or(cfg.service.http.bind);
    let port = args.port.unwrap_or(cfg.service.http.port);
    let addr = format!("{}:{}", bind, port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, create_router(state))
        .await
        .context("HTTP server failed")?;

    Ok(())
}
