// Draft room server entry point.
//
// Startup sequence:
// 1. Initialize tracing
// 2. Load config
// 3. Open database
// 4. Load the player pool
// 5. Build (or restore) draft state and spawn the room task
// 6. Run the WebSocket server until Ctrl+C

use draft_room::config;
use draft_room::db;
use draft_room::draft::engine::{DraftEngine, KeeperAssignment, RoomRules};
use draft_room::players;
use draft_room::room;
use draft_room::ws_server;

use std::sync::Arc;

use anyhow::Context;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("Draft room server starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: league={}, {} teams, ${} budget",
        config.league.name,
        config.teams.len(),
        config.league.budget
    );

    // 3. Open database
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }
    let db_path = config.db_path.display().to_string();
    let db = Arc::new(db::Database::open(&db_path).context("failed to open database")?);
    info!("Database opened at {db_path}");

    // 4. Load the player pool
    let player_pool = players::load_player_pool(&config.players_csv)
        .context("failed to load player pool")?;
    info!("Loaded {} players", player_pool.len());

    // 5. Build (or restore) draft state and spawn the room task
    let teams: Vec<(String, String, u32, bool)> = config
        .teams
        .iter()
        .map(|t| {
            (
                t.id.clone(),
                t.name.clone(),
                t.draft_order,
                t.token.is_some(),
            )
        })
        .collect();
    let state = room::load_or_new_state(
        &db,
        &config.league.id,
        teams,
        config.league.budget,
        &config.league.roster,
    )
    .context("failed to build draft state")?;

    let keepers = config
        .keepers
        .iter()
        .map(|k| KeeperAssignment {
            team_id: k.team_id.clone(),
            player_id: k.player_id.clone(),
            price: k.price,
        })
        .collect();
    let rules = RoomRules {
        countdown_secs: config.league.countdown_secs,
        order_mode: config.league.order,
        skip_offline_nominators: config.league.skip_offline_nominators,
    };
    let engine = DraftEngine::new(state, player_pool, keepers, rules);
    let room_handle = room::Room::spawn(engine, db);

    // 6. Run the WebSocket server until Ctrl+C
    let auth = ws_server::Auth::from_config(&config);
    let ws_port = config.ws_port;
    let server = tokio::spawn(async move {
        if let Err(e) = ws_server::run(ws_port, auth, room_handle).await {
            error!("WebSocket server error: {e}");
        }
    });
    info!("Draft room ready on 127.0.0.1:{ws_port}");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;
    server.abort();

    info!("Draft room shut down cleanly");
    Ok(())
}

/// Initialize tracing with an env-filter override (`RUST_LOG`).
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("draft_room=info,warn")),
        )
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
