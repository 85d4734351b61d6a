//! Edgehop server entry point.
//!
//! Wires the pieces together and runs until interrupted:
//!
//! ```text
//! main()
//!  └─ load_config()          -- TOML file (path argument or platform default)
//!  └─ build_map()            -- declared screens + directional links
//!  └─ HeadlessPrimaryScreen  -- stand-in until a capture backend is wired up
//!  └─ ScreenServer::start    -- bind, accept loop, per-connection workers
//!  └─ ctrl-c → shutdown      -- CBYE to clients, ordered teardown, join all
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;

use edgehop_server::infrastructure::screen::HeadlessPrimaryScreen;
use edgehop_server::infrastructure::storage::config::load_config;
use edgehop_server::{ScreenServer, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // The only argument is an optional config path; flag parsing is out of
    // scope for the engine.
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = load_config(config_path.as_deref())?;

    // Initialise structured logging.  `RUST_LOG` overrides the file value.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.server.log_level.clone())),
        )
        .init();

    info!("Edgehop server starting");

    let map = config.build_map()?;
    let server_config = ServerConfig {
        name: config.server.name.clone(),
        bind_address: config.bind_address()?,
        port: config.server.port,
        bind_retry_timeout: std::time::Duration::from_secs(config.server.bind_retry_timeout_secs),
        handshake_timeout: std::time::Duration::from_secs(config.server.handshake_timeout_secs),
        motion_deadband: config.server.motion_deadband,
        map,
    };

    // Geometry for the headless stand-in; a real capture backend would
    // report the display's actual extents here.
    let primary = Arc::new(HeadlessPrimaryScreen::new(1920, 1080, 1));

    let server = ScreenServer::start(server_config, primary).await?;
    info!("Edgehop server ready on {}.  Press Ctrl-C to exit.", server.local_addr());

    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");
    server.shutdown().await;

    info!("Edgehop server stopped");
    Ok(())
}
