// Framework bootstrap for the game server runtime.

use crate::frameworks::config;
use crate::interface_adapters::communicator::{Communicator, OutboundFrame};
use crate::interface_adapters::net::{ClientRegistry, ws_handler};
use crate::interface_adapters::state::AppState;
use crate::use_cases::leaderboard::MatchLeaderboard;
use crate::use_cases::scene::{Scene, scene_task};
use crate::use_cases::stage::Stage;
use crate::use_cases::types::SceneCommand;

use axum::{Router, routing::get};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::net::SocketAddr;
use std::{io::Result, sync::Arc};
use tokio::sync::{broadcast, mpsc};

fn init_runtime() {
    let _ = dotenvy::dotenv();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let json = matches!(std::env::var("LOG_FORMAT").as_deref(), Ok("json"));
    if json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .json()
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .compact()
            .init();
    }

    std::panic::set_hook(Box::new(|info| {
        let backtrace = std::backtrace::Backtrace::capture();
        tracing::error!(%info, ?backtrace, "panic");
    }));
}

pub async fn run(listener: tokio::net::TcpListener) -> Result<()> {
    let address = listener.local_addr()?;
    let state = build_state().await?;

    // Start the Web Server
    let app = Router::new().route("/ws", get(ws_handler)).with_state(state);

    tracing::info!(%address, "listening");

    // Serve app and report errors rather than panicking
    axum::serve(listener, app).await.inspect_err(|e| {
        tracing::error!(error = %e, "server error");
    })
}

pub async fn run_with_config() -> Result<()> {
    init_runtime();

    let address = SocketAddr::from(([127, 0, 0, 1], config::game_port()));

    // Bind TCP listener with error handling
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .inspect_err(|e| {
            tracing::error!(%address, error = %e, "failed to bind");
        })?;

    run(listener).await
}

async fn build_state() -> Result<Arc<AppState>> {
    let stage_dir = config::stage_dir();
    let stage_name = config::stage_name();
    let stage = Stage::load(&stage_dir, &stage_name).map_err(|e| {
        std::io::Error::other(format!("failed to load stage '{stage_name}': {e}"))
    })?;
    tracing::info!(
        stage = %stage.meta.stage_name,
        author = %stage.meta.author,
        preload = stage.preload.len(),
        "stage loaded"
    );

    // Setup Channels
    // command_tx/rx: every client command goes to the single scene task.
    let (command_tx, command_rx) =
        mpsc::channel::<SceneCommand>(config::COMMAND_CHANNEL_CAPACITY);
    // outbound_tx: serialized frames shared across all client tasks.
    let (outbound_tx, _outbound_rx) =
        broadcast::channel::<OutboundFrame>(config::OUTBOUND_BROADCAST_CAPACITY);

    let stage_meta = stage.meta.clone();
    let scene = Scene::new(
        stage,
        config::DISASTER_INTERVAL_TICKS,
        Box::new(Communicator::new(outbound_tx.clone())),
        Box::new(MatchLeaderboard::default()),
        StdRng::from_entropy(),
    );

    // Spawn the Scene Loop
    // This runs independently in its own task; all mutation happens there.
    tokio::spawn(scene_task(scene, command_rx, config::TICK_INTERVAL));

    Ok(Arc::new(AppState {
        command_tx,
        outbound_tx,
        registry: ClientRegistry::new(config::max_players()),
        stage_meta,
    }))
}
