//! Async driver for a session.
//!
//! A single task owns the session and waits on three things at once: the
//! next inbound frame, the next local command and the session's next
//! deadline. Whatever wakes it up is applied to the session in full, then
//! everything the session queued is written to the transport in order.
//! Nothing else ever touches the session, so no locking is needed.

use std::future;
use thiserror::Error;
use tokio::{
    sync::mpsc,
    time::{Instant, sleep_until},
};

use super::{Command, Session, SessionError};
use crate::{
    game::facade::RulesEngine,
    net::{
        codec,
        errors::{CodecError, TransportError},
        messages::{ClientMessage, ServerMessage},
        transport::Transport,
    },
};

#[derive(Debug, Error)]
pub enum DriverError {
    /// The relay refused the join. The user has to retry.
    #[error("join rejected: {0}")]
    Rejected(SessionError),

    #[error("session error: {0}")]
    Session(#[from] SessionError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("codec error: {0}")]
    Codec(#[from] CodecError),
}

/// Runs `session` until the transport closes or the command channel is
/// dropped. Sends the join request first if the session has not joined.
///
/// Local command failures are reported to the session's stage and do not
/// stop the loop.
///
/// # Errors
///
/// Returns [`DriverError::Rejected`] if the relay refuses the join, and
/// transport or encoding failures as they happen.
pub async fn run<E, T>(
    mut session: Session<E>,
    mut outbox: mpsc::UnboundedReceiver<ClientMessage>,
    mut transport: T,
    mut commands: mpsc::UnboundedReceiver<Command>,
) -> Result<Session<E>, DriverError>
where
    E: RulesEngine,
    T: Transport,
{
    let origin = Instant::now() - session.now();
    if session.own_id().is_none() {
        session.join()?;
    }
    flush(&mut outbox, &mut transport).await?;

    loop {
        let deadline = session.next_deadline().map(|at| origin + at);
        tokio::select! {
            frame = transport.recv() => {
                let Some(frame) = frame else {
                    log::info!("{}: connection closed", session.name());
                    break;
                };
                session.advance(origin.elapsed())?;
                match codec::decode::<ServerMessage>(&frame?) {
                    Ok(msg) => match session.handle(msg) {
                        Ok(()) => {}
                        Err(SessionError::GameInProgress) => {
                            return Err(DriverError::Rejected(SessionError::GameInProgress));
                        }
                        Err(error) => return Err(error.into()),
                    },
                    Err(error) => log::warn!("{}: dropping frame: {error}", session.name()),
                }
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    log::debug!("{}: command channel closed", session.name());
                    break;
                };
                session.advance(origin.elapsed())?;
                match session.apply(command) {
                    Ok(()) => {}
                    Err(SessionError::Disconnected) => return Err(SessionError::Disconnected.into()),
                    Err(error) => {
                        log::debug!("{}: command failed: {error}", session.name());
                        session.report(&error);
                    }
                }
            }
            () = wait_until(deadline) => {
                session.advance(origin.elapsed())?;
            }
        }
        flush(&mut outbox, &mut transport).await?;
    }

    Ok(session)
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => future::pending().await,
    }
}

async fn flush<T: Transport>(
    outbox: &mut mpsc::UnboundedReceiver<ClientMessage>,
    transport: &mut T,
) -> Result<(), DriverError> {
    while let Ok(msg) = outbox.try_recv() {
        let frame = codec::encode(&msg)?;
        transport.send(frame).await?;
    }
    Ok(())
}
