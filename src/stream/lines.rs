// src/stream/lines.rs

//! Bounded line framing over an async byte stream.

use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// Longest line accepted before it is dropped.
pub const MAX_LINE_BYTES: usize = 64 * 1024;

#[derive(Error, Debug)]
pub enum LineError {
    /// The line was discarded; the reader is positioned after it.
    #[error("line exceeds {limit} bytes")]
    TooLong { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LineError {
    /// Whether reading may continue after this error.
    pub fn is_transient(&self) -> bool {
        matches!(self, LineError::TooLong { .. })
    }
}

/// Splits a byte stream into `\n`-terminated lines of bounded length.
///
/// Terminators (`\n` and a preceding `\r`) are stripped. A trailing partial
/// line before end-of-stream is returned as a line.
pub struct LineReader<R> {
    inner: BufReader<R>,
    limit: usize,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    pub fn new(inner: R) -> Self {
        Self::with_limit(inner, MAX_LINE_BYTES)
    }

    pub fn with_limit(inner: R, limit: usize) -> Self {
        Self {
            inner: BufReader::new(inner),
            limit,
        }
    }

    /// Next line, `Ok(None)` on clean end-of-stream.
    ///
    /// The limit applies to the line content, terminators excluded.
    pub async fn next_line(&mut self) -> Result<Option<Vec<u8>>, LineError> {
        let mut line = Vec::new();
        // Room for the content plus `\r\n`.
        let read = (&mut self.inner)
            .take(self.limit as u64 + 2)
            .read_until(b'\n', &mut line)
            .await?;

        if read == 0 {
            return Ok(None);
        }

        if line.last() == Some(&b'\n') {
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if line.len() > self.limit {
                return Err(LineError::TooLong { limit: self.limit });
            }
            return Ok(Some(line));
        }

        if line.len() > self.limit {
            self.skip_rest_of_line().await?;
            return Err(LineError::TooLong { limit: self.limit });
        }

        Ok(Some(line))
    }

    async fn skip_rest_of_line(&mut self) -> std::io::Result<()> {
        let mut scratch = Vec::new();
        loop {
            scratch.clear();
            let read = (&mut self.inner)
                .take(self.limit as u64)
                .read_until(b'\n', &mut scratch)
                .await?;
            if read == 0 || scratch.last() == Some(&b'\n') {
                return Ok(());
            }
        }
    }
}
