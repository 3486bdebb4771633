use alex_voice::config::TransportKind;
use alex_voice::{
    create_router, AppState, Config, EnvCredential, HeadlessAudio, JsonHistoryStore, LiveConnector,
    NatsConnector, RecordingNavigator, SessionConfig, SessionController, SessionDeps, SharedLocation,
    ToolDispatcher, WebSocketConnector,
};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "alex-voice")]
#[command(about = "Real-time voice assistant session manager")]
struct Args {
    /// Config file (without extension)
    #[arg(short, long, default_value = "config/alex-voice")]
    config: String,

    /// Signed-in user (overrides assistant.user_id)
    #[arg(short, long)]
    user: Option<String>,

    /// WAV file replayed as the microphone (overrides audio.input_wav)
    #[arg(long)]
    input_wav: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let cfg = Config::load(&args.config)?;

    info!("Alex Voice v{}", env!("CARGO_PKG_VERSION"));
    info!("Loaded config: {}", cfg.service.name);

    let connector: Arc<dyn LiveConnector> = match cfg.remote.transport {
        TransportKind::Websocket => Arc::new(WebSocketConnector::new(cfg.remote.url.clone())),
        TransportKind::Nats => Arc::new(NatsConnector::new(cfg.remote.nats_url.clone())),
    };
    info!("Remote transport: {}", connector.name());

    let input_wav = args
        .input_wav
        .or_else(|| cfg.audio.input_wav.as_ref().map(PathBuf::from));
    if input_wav.is_none() {
        warn!("No input WAV configured; the microphone will stream silence");
    }

    let location = SharedLocation::default();
    let navigator = Arc::new(RecordingNavigator::default());

    let mut session_config = SessionConfig::from(&cfg);
    if args.user.is_some() {
        session_config.user_id = args.user;
    }

    let controller = SessionController::new(
        session_config,
        SessionDeps {
            devices: Arc::new(HeadlessAudio::new(input_wav, &cfg.audio.recordings_path)),
            connector,
            tools: ToolDispatcher::with_builtins(Arc::new(location.clone()), navigator.clone()),
            history: Arc::new(JsonHistoryStore::new(&cfg.history.path)),
            credentials: Arc::new(EnvCredential::new(cfg.assistant.api_key.clone())),
        },
    );

    match controller.restore_history().await {
        Ok(0) => {}
        Ok(count) => info!("Restored {} turns of history", count),
        Err(e) => error!("Failed to restore history: {}", e),
    }

    let app = create_router(AppState::new(controller.clone(), location, navigator));

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("HTTP API listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown requested");
            }
        })
        .await
        .context("HTTP server failed")?;

    controller.stop(true).await;
    info!("Goodbye");
    Ok(())
}
