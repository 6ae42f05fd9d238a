//! holo-inventory-server binary
//!
//! Loads a world fixture and settings, connects to NATS and answers
//! container queries until interrupted.
//!
//! ## Configuration (env / TOML via `config` crate)
//!
//! | Key                         | Default                 | Description                       |
//! |-----------------------------|-------------------------|-----------------------------------|
//! | `HOLO_ENDPOINT`             | `nats://localhost:4222` | NATS endpoint                     |
//! | `HOLO_SETTINGS`             | *(none)*                | Settings TOML file                |
//! | `HOLO_WORLD`                | `world.json`            | World fixture (JSON)              |
//! | `HOLO_REQUIRES_WEARABLE`    | `true`                  | Viewer item required to query     |
//! | `HOLO_ROTATION_SPEED`       | `1.0`                   | Overlay rotation (0.0 – 5.0)      |

use anyhow::{Context, Result};
use clap::Parser;
use holo_inventory::{
    bus::{QueryBusAgent, QueryBusConfig},
    config::{Settings, SettingsStore},
    handler::RequestHandler,
    world::MemoryWorld,
};
use std::path::PathBuf;
use std::sync::Arc;

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(name = "holo-inventory-server", about = "HoloInventory query authority", version)]
struct Args {
    /// NATS endpoint
    #[arg(long, env = "HOLO_ENDPOINT", default_value = "nats://localhost:4222")]
    endpoint: String,

    /// Settings file (TOML); HOLO_* variables override it
    #[arg(long, env = "HOLO_SETTINGS")]
    settings: Option<PathBuf>,

    /// World fixture (JSON)
    #[arg(long, env = "HOLO_WORLD", default_value = "world.json")]
    world: PathBuf,

    /// Name reported in logs
    #[arg(long, env = "HOLO_AGENT_ID", default_value = "holo-authority")]
    agent_id: String,

    /// Extra banned target types, appended to the settings file's list
    #[arg(long = "ban")]
    banned: Vec<String>,
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("holo_inventory=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    let settings = Settings::load(args.settings.as_deref()).context("Failed to load settings")?;
    let store = Arc::new(SettingsStore::new(settings));
    for type_id in &args.banned {
        store.ban(type_id.clone());
    }

    let fixture = std::fs::read(&args.world)
        .with_context(|| format!("Failed to read world fixture {}", args.world.display()))?;
    let world = Arc::new(
        MemoryWorld::from_json(&fixture)
            .with_context(|| format!("Invalid world fixture {}", args.world.display()))?,
    );

    let snapshot = store.snapshot();
    tracing::info!(
        objects = world.object_count(),
        requires_wearable = snapshot.requires_wearable,
        banned = snapshot.banned_types.len(),
        settings_version = store.version(),
        "Starting holo-inventory-server"
    );

    let handler = RequestHandler::new(world, store);
    let config = QueryBusConfig {
        endpoint: args.endpoint,
        agent_id: args.agent_id,
    };

    // Run until shutdown
    QueryBusAgent::new(config, handler).run().await
}
