//! NETCONF 1.0 end-of-message framing

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use nexus_cfgmgr_common::{TransportError, TransportResult};

/// End-of-message delimiter
pub const EOM: &[u8] = b"]]>]]>";

const READ_CHUNK: usize = 8192;

/// Splits a byte stream into `]]>]]>`-delimited messages
///
/// Bytes after a delimiter are kept for the next read.
pub struct FrameReader<R> {
    inner: R,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            buf: Vec::new(),
        }
    }

    /// Reads the next complete message, without its delimiter
    pub async fn read_frame(&mut self) -> TransportResult<String> {
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            if let Some(pos) = self.buf.windows(EOM.len()).position(|w| w == EOM) {
                let mut frame: Vec<u8> = self.buf.drain(..pos + EOM.len()).collect();
                frame.truncate(pos);
                return String::from_utf8(frame)
                    .map_err(|e| TransportError::Protocol(format!("reply is not UTF-8: {}", e)));
            }

            let n = self.inner.read(&mut chunk).await?;
            if n == 0 {
                return Err(TransportError::Protocol(if self.buf.is_empty() {
                    "connection closed by peer".to_string()
                } else {
                    format!(
                        "connection closed inside a message ({} bytes pending)",
                        self.buf.len()
                    )
                }));
            }
            self.buf.extend_from_slice(&chunk[..n]);
        }
    }
}

/// Writes one message followed by the delimiter
pub async fn write_frame<W: AsyncWrite + Unpin>(writer: &mut W, message: &str) -> TransportResult<()> {
    writer.write_all(message.as_bytes()).await?;
    writer.write_all(EOM).await?;
    writer.flush().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_consecutive_frames() {
        let data: &[u8] = b"<hello/>]]>]]>\n<rpc-reply><ok/></rpc-reply>]]>]]>";
        let mut reader = FrameReader::new(data);

        assert_eq!(reader.read_frame().await.unwrap(), "<hello/>");
        assert_eq!(
            reader.read_frame().await.unwrap(),
            "\n<rpc-reply><ok/></rpc-reply>"
        );
        assert!(matches!(
            reader.read_frame().await,
            Err(TransportError::Protocol(_))
        ));
    }

    #[tokio::test]
    async fn test_delimiter_split_across_reads() {
        let (mut client, server) = tokio::io::duplex(64);
        let mut reader = FrameReader::new(server);

        let writer = tokio::spawn(async move {
            client.write_all(b"<data>abc</data>]]>").await.unwrap();
            client.flush().await.unwrap();
            tokio::task::yield_now().await;
            client.write_all(b"]]>").await.unwrap();
        });

        assert_eq!(reader.read_frame().await.unwrap(), "<data>abc</data>");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_eof_inside_message() {
        let data: &[u8] = b"<rpc-reply>";
        let err = FrameReader::new(data).read_frame().await.unwrap_err();
        assert!(err.to_string().contains("inside a message"));
    }

    #[tokio::test]
    async fn test_write_frame_appends_delimiter() {
        let mut out: Vec<u8> = Vec::new();
        write_frame(&mut out, "<close-session/>").await.unwrap();
        assert_eq!(out, b"<close-session/>]]>]]>");
    }
}
