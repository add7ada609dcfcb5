//! Internal modules for the terminal client.
//!
//! This library provides command parsing, the websocket transport and the
//! terminal stage used by the singular_client binary.

pub mod commands;
pub mod terminal;
pub mod websocket_client;

use singular::{
    Game, Session, SessionConfig, Stage,
    session::{
        Command, Connection,
        driver::{self, DriverError},
    },
};
use tokio::sync::mpsc;
use websocket_client::WsTransport;

/// Connects to the room at `url` and plays as `name` until the connection
/// closes or `commands` is dropped.
///
/// # Errors
///
/// Returns error if the connection fails, the relay turns the join away, or
/// the connection breaks mid-game
pub async fn run_client(
    url: &str,
    name: &str,
    stage: Box<dyn Stage>,
    config: SessionConfig,
    commands: mpsc::UnboundedReceiver<Command>,
) -> Result<Session<Game>, DriverError> {
    let transport = WsTransport::connect(url).await?;
    let (conn, outbox) = Connection::channel();
    let session = Session::new(name, conn, stage, config);
    driver::run(session, outbox, transport, commands).await
}
