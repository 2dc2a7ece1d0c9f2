//! Per-tick fan-out of the state line.
//!
//! Runs synchronously at the end of each tick on the simulation task.
//! Controllers are mandatory: the first failed send to one ends the session.
//! Observers are best effort: a failed send removes that observer only.
//! There are no retries and nothing is buffered for slow receivers.

use crate::error::SessionError;
use crate::registry::{ControllerSlot, ObserverRegistry};
use log::warn;
use std::io;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Writes one complete line and flushes it.
pub async fn send_line<W>(sink: &mut W, line: &[u8]) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    sink.write_all(line).await?;
    sink.flush().await
}

/// Sends `line` to both controllers, then to every observer.
///
/// Returns the number of observers pruned, or the controller failure that
/// ends the session. Observers are not written to once a controller fails.
pub async fn fan_out<W>(
    line: &[u8],
    controllers: &mut [ControllerSlot<W>],
    observers: &Mutex<ObserverRegistry<W>>,
) -> Result<usize, SessionError>
where
    W: AsyncWrite + Unpin,
{
    for controller in controllers.iter_mut() {
        send_line(&mut controller.sink, line)
            .await
            .map_err(|source| SessionError::ControllerSend {
                role: controller.role,
                source,
            })?;
    }

    let mut registry = observers.lock().await;
    let mut failed = Vec::new();
    for observer in registry.iter_mut() {
        if let Err(e) = send_line(&mut observer.sink, line).await {
            warn!(
                "Dropping observer {} ({}): {}",
                observer.id, observer.addr, e
            );
            failed.push(observer.id);
        }
    }

    Ok(registry.remove(&failed))
}
