// src/tui/feed.rs
//
// Reads the monitored byte stream and forwards it to the UI loop.
// The source is stdin or a path (file, FIFO, or a device node configured
// elsewhere); nothing here touches port settings.

use std::io::{ErrorKind, IsTerminal};
use std::path::PathBuf;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Bytes per read, matching the serial reader buffer size
const READ_BUFFER_SIZE: usize = 256;

const STDIN_IS_TERMINAL: &str = "stdin is a terminal; use --input or a pipe";

#[derive(Debug, PartialEq, Eq)]
pub enum FeedMessage {
    /// One read's worth of bytes
    Bytes(Vec<u8>),
    /// The stream ended (reason)
    Ended(String),
}

/// Spawn the reader task. It sends `Ended` exactly once when it stops.
pub fn spawn_feed(input: Option<PathBuf>, tx: mpsc::Sender<FeedMessage>) -> JoinHandle<()> {
    tokio::spawn(async move {
        let reason = match input {
            None => match check_stdin(std::io::stdin().is_terminal()) {
                Ok(()) => {
                    tlog!("[Feed] Reading from stdin");
                    pump(tokio::io::stdin(), &tx).await
                }
                Err(reason) => reason,
            },
            Some(path) => match tokio::fs::File::open(&path).await {
                Ok(file) => {
                    tlog!("[Feed] Reading from {}", path.display());
                    pump(file, &tx).await
                }
                Err(e) => format!("failed to open {}: {}", path.display(), e),
            },
        };

        tlog!("[Feed] Stream ended: {}", reason);
        let _ = tx.send(FeedMessage::Ended(reason)).await;
    })
}

/// Key events are read from the terminal on stdin, so stdin can only be a
/// byte source when it is redirected.
fn check_stdin(is_terminal: bool) -> Result<(), String> {
    if is_terminal {
        Err(STDIN_IS_TERMINAL.to_string())
    } else {
        Ok(())
    }
}

/// Forward reads until EOF, a read error, or the receiver going away.
/// Returns the reason the stream ended.
async fn pump<R>(mut reader: R, tx: &mpsc::Sender<FeedMessage>) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buf = [0u8; READ_BUFFER_SIZE];
    let mut total_bytes_read: u64 = 0;

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => return format!("disconnected after {} bytes", total_bytes_read),
            Ok(n) => {
                total_bytes_read += n as u64;
                if tx.send(FeedMessage::Bytes(buf[..n].to_vec())).await.is_err() {
                    return "stopped".to_string();
                }
            }
            Err(ref e) if e.kind() == ErrorKind::Interrupted => {}
            Err(e) => return format!("read error: {}", e),
        }
    }
}
