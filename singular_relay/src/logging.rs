//! Structured logging configuration.

use singular::PlayerId;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "info,singular=warn,tower_http=warn";

/// Initialize structured logging.
///
/// Log levels are configurable via the `RUST_LOG` env var. Records emitted
/// through the `log` facade by the `singular` library are captured as well.
///
/// # Example
///
/// ```no_run
/// use singular_relay::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Relay starting");
/// }
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a websocket connection event with its room and, once joined, the
/// member id
pub fn log_connection(room: &str, player: Option<PlayerId>, event: &str) {
    tracing::info!(room = room, player = ?player, "WebSocket {event}");
}
