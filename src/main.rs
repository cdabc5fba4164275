//! Maze Race Server
//!
//! Authoritative room server for Maze Race.
//! Generates seeded mazes and arbitrates finishes and maze rotation.

use std::sync::Arc;

use tracing::{info, error};
use tracing_subscriber::EnvFilter;

use maze_race::{GameServer, ServerConfig, VERSION};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::from_env();

    info!("Maze Race Server v{}", VERSION);
    info!("Bind address: {}", config.bind_addr);
    info!("Room: {} ({} players)", config.default_room, config.room_capacity);
    info!(
        "Maze: {}x{}, max race {} ms, respawn penalty {} ms",
        config.maze_width, config.maze_height, config.race.max_race_ms, config.race.respawn_penalty_ms
    );
    match config.room_seed {
        Some(seed) => info!("Room seed: {}", seed),
        None => info!("Room seed: random"),
    }

    let server = Arc::new(GameServer::new(config));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Ctrl-C received, shutting down");
                signal_server.shutdown();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    server.run().await?;
    info!("Server stopped");
    Ok(())
}
