//! Line-delimited JSON transport
//!
//! One request object per input line, one acknowledgment object per output
//! line. The daemon runs it over stdin/stdout so any message bus can be
//! attached with a pipe.

use acme_dns_core::traits::{AckSink, RequestSource};
use acme_dns_core::{Acknowledgment, Result};
use async_trait::async_trait;
use std::pin::Pin;
use std::sync::Mutex;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_stream::Stream;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, error, warn};

/// Lines buffered between the reader task and the dispatcher
///
/// The reader holds at most one more line than the dispatcher has taken.
/// That line is already consumed from the input, so on shutdown it is
/// dropped without an acknowledgment. Sources that must not lose messages
/// need to redeliver unacknowledged requests.
const READ_AHEAD: usize = 1;

/// Requests from a line reader, acknowledgments to a line writer
pub struct LineTransport<R, W> {
    reader: Mutex<Option<R>>,
    writer: tokio::sync::Mutex<W>,
}

/// Transport bound to the process stdin and stdout
pub type StdioTransport = LineTransport<tokio::io::Stdin, tokio::io::Stdout>;

impl StdioTransport {
    pub fn stdio() -> Self {
        Self::new(tokio::io::stdin(), tokio::io::stdout())
    }
}

impl<R, W> LineTransport<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(Some(reader)),
            writer: tokio::sync::Mutex::new(writer),
        }
    }
}

impl<R, W> RequestSource for LineTransport<R, W>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: Send,
{
    /// Spawn the line reader and stream its non-blank lines
    ///
    /// The reader is consumed on the first call; later calls yield an
    /// empty stream.
    fn requests(&self) -> Pin<Box<dyn Stream<Item = Vec<u8>> + Send + 'static>> {
        let reader = self.reader.lock().unwrap_or_else(|e| e.into_inner()).take();
        let Some(reader) = reader else {
            warn!("Request stream already taken");
            return Box::pin(tokio_stream::empty());
        };

        let (tx, rx) = mpsc::channel(READ_AHEAD);
        tokio::spawn(async move {
            let mut reader = BufReader::new(reader);
            let mut line = Vec::new();
            loop {
                line.clear();
                match reader.read_until(b'\n', &mut line).await {
                    Ok(0) => {
                        debug!("Request input closed");
                        break;
                    }
                    Ok(_) => {
                        let payload = trim_line(&line);
                        if payload.iter().all(u8::is_ascii_whitespace) {
                            continue;
                        }
                        // Undecodable bytes go through; the dispatcher rejects them
                        if tx.send(payload.to_vec()).await.is_err() {
                            // Dispatcher stopped
                            break;
                        }
                    }
                    Err(e) => {
                        error!("Failed to read request line: {}", e);
                        break;
                    }
                }
            }
        });

        Box::pin(ReceiverStream::new(rx))
    }
}

/// Strip the line terminator (`\n` or `\r\n`)
fn trim_line(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[async_trait]
impl<R, W> AckSink for LineTransport<R, W>
where
    R: Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn publish(&self, ack: &Acknowledgment) -> Result<()> {
        let mut line = serde_json::to_vec(ack)?;
        line.push(b'\n');

        let mut writer = self.writer.lock().await;
        writer.write_all(&line).await?;
        writer.flush().await?;
        Ok(())
    }
}
