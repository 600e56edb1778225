//! Background draining of the ssh child's stderr

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::debug;

/// Bytes of stderr kept for error reports
pub(crate) const TAIL_CAPACITY: usize = 4096;

/// Reads stderr as ssh writes it so a long banner never fills the pipe
///
/// Only the last [`TAIL_CAPACITY`] bytes are kept.
pub(crate) struct StderrLog {
    tail: Arc<Mutex<Vec<u8>>>,
    task: JoinHandle<()>,
}

impl StderrLog {
    pub(crate) fn spawn<R>(host: &str, mut stderr: R) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let tail = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&tail);
        let host = host.to_string();

        let task = tokio::spawn(async move {
            let mut chunk = [0u8; 1024];
            loop {
                let n = match stderr.read(&mut chunk).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => n,
                };
                debug!(
                    host = %host,
                    "ssh: {}",
                    String::from_utf8_lossy(&chunk[..n]).trim_end()
                );
                let mut tail = sink.lock().unwrap_or_else(PoisonError::into_inner);
                tail.extend_from_slice(&chunk[..n]);
                let excess = tail.len().saturating_sub(TAIL_CAPACITY);
                tail.drain(..excess);
            }
        });

        Self { tail, task }
    }

    /// Text written so far, after waiting up to `wait` for stderr to close
    ///
    /// Output read before the wait expires is kept.
    pub(crate) async fn collect(&mut self, wait: Duration) -> String {
        if timeout(wait, &mut self.task).await.is_err() {
            debug!("ssh stderr still open, reporting partial output");
        }
        let tail = self.tail.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&tail).trim().to_string()
    }
}

impl Drop for StderrLog {
    fn drop(&mut self) {
        self.task.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn test_drains_more_than_pipe_capacity() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut log = StderrLog::spawn("10.0.0.1", reader);

        let banner = vec![b'#'; 10 * TAIL_CAPACITY];
        timeout(Duration::from_secs(5), writer.write_all(&banner))
            .await
            .expect("stderr was not drained")
            .unwrap();
        writer.write_all(b"\nPermission denied").await.unwrap();
        drop(writer);

        let text = log.collect(Duration::from_secs(1)).await;
        assert!(text.ends_with("Permission denied"));
        assert!(text.len() <= TAIL_CAPACITY);
    }

    #[tokio::test]
    async fn test_keeps_partial_output_while_open() {
        let (mut writer, reader) = tokio::io::duplex(64);
        let mut log = StderrLog::spawn("10.0.0.1", reader);

        writer.write_all(b"Connection closed by peer\n").await.unwrap();

        let text = log.collect(Duration::from_millis(200)).await;
        assert_eq!(text, "Connection closed by peer");
        drop(writer);
    }
}
