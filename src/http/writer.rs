use tokio::io::{AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::http::response::{Body, Response};

/// Serializes the status line and headers, including the blank line that
/// separates them from the body.
pub fn serialize_head(resp: &Response, version: &str) -> Vec<u8> {
    let mut buf = Vec::new();

    // Status line
    let status_line = format!(
        "{} {} {}\r\n",
        version,
        resp.status.as_u16(),
        resp.status.reason_phrase()
    );
    buf.extend_from_slice(status_line.as_bytes());

    // Headers
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    // Header/body separator
    buf.extend_from_slice(b"\r\n");

    buf
}

/// Writes one response to a stream: head first, then the body.
pub struct ResponseWriter {
    head: Vec<u8>,
    written: usize,
    body: Body,
}

impl ResponseWriter {
    pub fn new(response: Response, version: &str) -> Self {
        Self {
            head: serialize_head(&response, version),
            written: 0,
            body: response.body,
        }
    }

    /// Writes the whole response and flushes the stream.
    ///
    /// Fails if the peer goes away before everything is written, or when a
    /// streamed file turns out shorter than its advertised length. A file
    /// that grew is cut off at the advertised length.
    pub async fn write_to_stream<W>(&mut self, stream: &mut W) -> anyhow::Result<()>
    where
        W: AsyncWrite + Unpin,
    {
        while self.written < self.head.len() {
            let n = stream.write(&self.head[self.written..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            self.written += n;
        }

        match &mut self.body {
            Body::Empty => {}
            Body::Bytes(bytes) => stream.write_all(bytes).await?,
            Body::File(file, len) => {
                let mut limited = (&mut *file).take(*len);
                let copied = tokio::io::copy(&mut limited, stream).await?;
                if copied != *len {
                    anyhow::bail!("file changed while streaming: sent {copied} of {len} bytes");
                }
            }
        }

        stream.flush().await?;
        Ok(())
    }
}
