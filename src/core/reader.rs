//! Output reader task.
//!
//! Drains the output pipe of an engine process line by line into the mailbox
//! until the stream closes. Invalid UTF-8 is replaced rather than aborting the read,
//! and lines keep flowing out of the pipe even if the coordinator has stopped
//! listening, so the engine never blocks on a full pipe.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::task::JoinHandle;

use crate::core::mailbox::{Mail, MailSender};

/// Reads `stream` to the end, posting every line for `segment`.
///
/// Returns the number of lines read.
pub async fn read_lines<R>(segment: usize, stream: R, tx: MailSender) -> u64
where
    R: AsyncRead + Unpin,
{
    let mut lines = BufReader::new(stream).split(b'\n');
    let mut count = 0u64;

    loop {
        match lines.next_segment().await {
            Ok(Some(mut bytes)) => {
                if bytes.last() == Some(&b'\r') {
                    bytes.pop();
                }
                let line = String::from_utf8_lossy(&bytes).into_owned();
                count += 1;
                // receiver gone: keep draining the pipe anyway
                let _ = tx.send(Mail::Line { segment, line });
            }
            Ok(None) => break,
            Err(err) => {
                tracing::debug!(segment, %err, "worker stream read failed");
                break;
            }
        }
    }
    count
}

/// Spawns [`read_lines`] as a task.
pub fn spawn_reader<R>(segment: usize, stream: R, tx: MailSender) -> JoinHandle<u64>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(read_lines(segment, stream, tx))
}
