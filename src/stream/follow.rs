// src/stream/follow.rs

//! `tail -f` style reading of a growing file.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use std::time::Duration;

use tokio::fs::File;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::time::Sleep;

/// How often a file at end-of-data is checked for growth.
pub const FOLLOW_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Reads a file and, instead of reporting end-of-file, waits for more data.
///
/// It never ends on its own; the owner stops reading by dropping it.
pub struct FollowFile {
    file: File,
    poll_interval: Duration,
    delay: Option<Pin<Box<Sleep>>>,
}

impl FollowFile {
    pub fn new(file: File) -> Self {
        Self::with_interval(file, FOLLOW_POLL_INTERVAL)
    }

    pub fn with_interval(file: File, poll_interval: Duration) -> Self {
        Self {
            file,
            poll_interval,
            delay: None,
        }
    }
}

impl AsyncRead for FollowFile {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            if let Some(delay) = self.delay.as_mut() {
                ready!(delay.as_mut().poll(cx));
                self.delay = None;
            }

            let before = buf.filled().len();
            ready!(Pin::new(&mut self.file).poll_read(cx, buf))?;
            if buf.filled().len() > before || buf.remaining() == 0 {
                return Poll::Ready(Ok(()));
            }

            let interval = self.poll_interval;
            self.delay = Some(Box::pin(tokio::time::sleep(interval)));
        }
    }
}
