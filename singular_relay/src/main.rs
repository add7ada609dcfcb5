//! Relay server binary.

use std::net::SocketAddr;

use anyhow::Error;
use ctrlc::set_handler;
use pico_args::Arguments;
use singular_relay::{
    api::{self, AppState},
    config::RelayConfig,
    logging,
};
use tracing::info;

const HELP: &str = "\
Run a singular relay

USAGE:
  singular_relay [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env RELAY_BIND or 127.0.0.1:6969]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  RELAY_BIND               Server bind address (e.g., 0.0.0.0:8080)
  RELAY_MAX_ROOMS          Maximum number of open rooms  [default: 1024]
  RELAY_MAX_MEMBERS        Maximum members per room  [default: 10]
  RELAY_MAX_FRAME_BYTES    Largest accepted frame  [default: 1048576]
  RUST_LOG                 Log filter
";

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let bind: Option<SocketAddr> = pargs.opt_value_from_str("--bind")?;

    // Catching signals for exit.
    set_handler(|| std::process::exit(0))?;

    logging::init();

    let config = RelayConfig::from_env(bind)?;
    config.validate()?;
    info!(
        "Starting relay at {} (max {} rooms, {} members each)",
        config.bind, config.max_rooms, config.max_members
    );

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;
    let app = api::create_router(AppState::new(config.clone()));

    info!("Relay is running at ws://{}/ws/{{code}}", config.bind);
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
