//! Long-running acceptor that admits observers at any time.

use crate::broadcast::send_line;
use crate::registry::SharedObservers;
use log::{info, warn};
use shared::{frame_line, Handshake, LineCipher, Role};
use std::sync::Arc;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::TcpListener;

/// Accepts connections until the listener fails or this task is aborted.
///
/// Every accepted connection gets the spectator handshake and joins the
/// broadcast set; a connection whose handshake cannot be delivered is
/// dropped without being enrolled. Observers never send anything meaningful,
/// so only the write half is kept.
pub async fn run_acceptor(
    listener: TcpListener,
    observers: SharedObservers<OwnedWriteHalf>,
    cipher: Arc<dyn LineCipher>,
) {
    let handshake = frame_line(cipher.as_ref(), &Handshake::new(Role::Spectator).to_string());

    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                info!("Observer acceptor stopping: {}", e);
                break;
            }
        };

        let (_reader, mut writer) = stream.into_split();
        if let Err(e) = send_line(&mut writer, handshake.as_bytes()).await {
            warn!("Failed to send handshake to observer {}: {}", addr, e);
            continue;
        }

        observers.lock().await.enroll(addr, writer);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ObserverRegistry;
    use shared::Plaintext;
    use std::time::Duration;
    use tokio::io::{AsyncBufReadExt, BufReader};
    use tokio::net::TcpStream;

    #[tokio::test]
    async fn test_observers_enrolled_after_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let observers = ObserverRegistry::shared();

        let acceptor = tokio::spawn(run_acceptor(
            listener,
            Arc::clone(&observers),
            Arc::new(Plaintext),
        ));

        for _ in 0..3 {
            let stream = TcpStream::connect(addr).await.unwrap();
            let mut lines = BufReader::new(stream).lines();
            let handshake = lines.next_line().await.unwrap().unwrap();
            assert_eq!(handshake, "640 480 spec");
        }

        // Enrollment happens right after the handshake write; give it a moment
        let mut enrolled = 0;
        for _ in 0..50 {
            enrolled = observers.lock().await.len();
            if enrolled == 3 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(enrolled, 3);

        acceptor.abort();
        assert!(acceptor.await.unwrap_err().is_cancelled());
        assert!(TcpStream::connect(addr).await.is_err());
    }
}
