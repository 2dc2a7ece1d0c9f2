//! Per-controller command reader.
//!
//! One instance runs for each controller connection. It turns newline-framed
//! control lines into updates of that controller's `ControlCell` and touches
//! nothing else. It never signals the end of the session; a vanished
//! controller is noticed when the next broadcast to it fails.

use crate::registry::ControlCell;
use log::{debug, info, warn};
use shared::{ControlLine, LineCipher, Role};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Longest accepted control line in bytes, excluding the terminator.
pub const MAX_LINE_LEN: usize = 1024;

/// Why an ingest instance stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestExit {
    /// The peer closed its side of the stream
    Closed,
    /// A line could not be opened by the cipher
    DecodeFailed,
    /// Reading failed, including non-UTF-8 input
    ReadFailed,
    /// A line ran past `MAX_LINE_LEN` without a terminator
    LineTooLong,
}

/// Applies one decoded line to the controller's cell. Unrecognized lines are
/// dropped silently.
pub fn apply_line(control: &ControlCell, text: &str) {
    match ControlLine::parse(text) {
        Some(ControlLine::Move(intent)) => control.set_intent(intent),
        Some(ControlLine::Ready) => control.mark_ready(),
        None => debug!("Ignoring unrecognized control line {:?}", text),
    }
}

/// Reads control lines until the stream ends or fails.
///
/// A trailing fragment without a terminating newline is discarded. A line
/// longer than `MAX_LINE_LEN` ends the reader without buffering the rest.
pub async fn run_ingest<R>(
    reader: R,
    role: Role,
    control: Arc<ControlCell>,
    cipher: Arc<dyn LineCipher>,
) -> IngestExit
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        let limit = (MAX_LINE_LEN + 2) as u64;
        match (&mut reader).take(limit).read_line(&mut line).await {
            Ok(0) => {
                info!("{} controller closed its input stream", role);
                return IngestExit::Closed;
            }
            Ok(n) if n as u64 == limit && !line.ends_with('\n') => {
                warn!("{} controller sent a line over {} bytes", role, MAX_LINE_LEN);
                return IngestExit::LineTooLong;
            }
            Ok(_) if !line.ends_with('\n') => {
                info!("{} controller closed its input stream mid-line", role);
                return IngestExit::Closed;
            }
            Ok(_) => {
                let token = line.trim_end_matches(['\n', '\r']);
                match cipher.open(token) {
                    Some(text) => apply_line(&control, &text),
                    None => {
                        warn!("Failed to decode line from {} controller", role);
                        return IngestExit::DecodeFailed;
                    }
                }
            }
            Err(e) => {
                warn!("Error reading from {} controller: {}", role, e);
                return IngestExit::ReadFailed;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{Intent, Plaintext};
    use std::io;
    use tokio_test::io::Builder;

    struct RejectAll;

    impl LineCipher for RejectAll {
        fn seal(&self, text: &str) -> String {
            text.to_string()
        }

        fn open(&self, _token: &str) -> Option<String> {
            None
        }
    }

    fn plaintext() -> Arc<dyn LineCipher> {
        Arc::new(Plaintext)
    }

    #[test]
    fn test_apply_line() {
        let control = ControlCell::new();

        apply_line(&control, "down");
        assert_eq!(control.intent(), Intent::Down);

        apply_line(&control, "sideways");
        assert_eq!(control.intent(), Intent::Down);

        apply_line(&control, "");
        assert_eq!(control.intent(), Intent::None);

        apply_line(&control, "ready");
        assert!(control.is_ready());
        assert_eq!(control.intent(), Intent::None);
    }

    #[tokio::test]
    async fn test_lines_split_across_reads() {
        let reader = Builder::new()
            .read(b"up\nrea")
            .read(b"dy\nbogus\n")
            .read(b"do")
            .read(b"wn\n")
            .build();
        let control = Arc::new(ControlCell::new());

        let exit = run_ingest(reader, Role::Left, Arc::clone(&control), plaintext()).await;

        assert_eq!(exit, IngestExit::Closed);
        assert_eq!(control.intent(), Intent::Down);
        assert!(control.is_ready());
    }

    #[tokio::test]
    async fn test_crlf_lines_accepted() {
        let reader = Builder::new().read(b"up\r\n").build();
        let control = Arc::new(ControlCell::new());

        run_ingest(reader, Role::Right, Arc::clone(&control), plaintext()).await;

        assert_eq!(control.intent(), Intent::Up);
    }

    #[tokio::test]
    async fn test_unterminated_fragment_discarded() {
        let reader = Builder::new().read(b"up\ndown").build();
        let control = Arc::new(ControlCell::new());

        let exit = run_ingest(reader, Role::Left, Arc::clone(&control), plaintext()).await;

        assert_eq!(exit, IngestExit::Closed);
        assert_eq!(control.intent(), Intent::Up);
    }

    #[tokio::test]
    async fn test_read_error_terminates() {
        let reader = Builder::new()
            .read(b"down\n")
            .read_error(io::Error::new(io::ErrorKind::ConnectionReset, "reset"))
            .build();
        let control = Arc::new(ControlCell::new());

        let exit = run_ingest(reader, Role::Left, Arc::clone(&control), plaintext()).await;

        assert_eq!(exit, IngestExit::ReadFailed);
        assert_eq!(control.intent(), Intent::Down);
    }

    #[tokio::test]
    async fn test_invalid_utf8_terminates() {
        let reader = Builder::new().read(b"\xff\xfe\n").build();
        let control = Arc::new(ControlCell::new());

        let exit = run_ingest(reader, Role::Left, control, plaintext()).await;

        assert_eq!(exit, IngestExit::ReadFailed);
    }

    #[tokio::test]
    async fn test_decode_failure_terminates() {
        let reader = Builder::new().read(b"up\n").build();
        let control = Arc::new(ControlCell::new());

        let exit = run_ingest(reader, Role::Left, Arc::clone(&control), Arc::new(RejectAll)).await;

        assert_eq!(exit, IngestExit::DecodeFailed);
        assert_eq!(control.intent(), Intent::None);
    }

    #[tokio::test]
    async fn test_overlong_line_terminates() {
        let long = vec![b'u'; MAX_LINE_LEN * 4];
        let reader = Builder::new().read(b"down\n").read(&long).build();
        let control = Arc::new(ControlCell::new());

        let exit = run_ingest(reader, Role::Left, Arc::clone(&control), plaintext()).await;

        assert_eq!(exit, IngestExit::LineTooLong);
        assert_eq!(control.intent(), Intent::Down);
    }

    #[tokio::test]
    async fn test_line_at_limit_accepted() {
        let mut padded = vec![b' '; MAX_LINE_LEN - 2];
        padded.extend_from_slice(b"up\r\n");
        let reader = Builder::new().read(&padded).build();
        let control = Arc::new(ControlCell::new());

        let exit = run_ingest(reader, Role::Right, Arc::clone(&control), plaintext()).await;

        assert_eq!(exit, IngestExit::Closed);
        assert_eq!(control.intent(), Intent::Up);
    }
}
