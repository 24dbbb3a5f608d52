// src/message.rs

//! Outbound log records and their construction from raw lines.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::task::{StreamKind, Task};

/// One structured record handed to the [`Emitter`](crate::emit::Emitter).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub message: Vec<u8>,
    pub app_id: String,
    pub drain_urls: Vec<String>,
    pub message_type: StreamKind,
    pub source_name: String,
    /// Instance index rendered as decimal text.
    pub source_id: String,
    /// Nanoseconds since the unix epoch.
    pub timestamp: i64,
}

impl LogMessage {
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.message).into_owned()
    }
}

/// Builds [`LogMessage`]s for one stream of one task.
#[derive(Debug, Clone)]
pub struct LogMessageFactory {
    task: Arc<Task>,
    kind: StreamKind,
}

impl LogMessageFactory {
    pub fn new(task: Arc<Task>, kind: StreamKind) -> Self {
        Self { task, kind }
    }

    pub fn build(&self, line: &[u8]) -> LogMessage {
        let mut message = vec![0u8; line.len()];
        let copied = copy_bytes(&mut message, line);
        // A short copy means memory corruption, not bad input.
        assert_eq!(
            copied,
            line.len(),
            "copied {} of {} message bytes",
            copied,
            line.len()
        );

        LogMessage {
            message,
            app_id: self.task.application_id.clone(),
            drain_urls: self.task.drain_urls.clone(),
            message_type: self.kind,
            source_name: self.task.source.as_str().to_string(),
            source_id: self.task.index.to_string(),
            timestamp: now_nanos(),
        }
    }
}

/// Copy as many bytes as both buffers allow and return that count.
pub fn copy_bytes(dst: &mut [u8], src: &[u8]) -> usize {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}

fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
