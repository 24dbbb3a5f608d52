// src/emit/mod.rs

//! Downstream delivery of finished records.
//!
//! The transports talk to an [`Emitter`] instead of a concrete sink. Production
//! uses [`JsonLinesEmitter`], which forwards records over a channel to a writer
//! task that prints one JSON object per line; tests plug in a recording
//! emitter.

use std::fmt;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::message::LogMessage;
use crate::task::StreamKind;

/// Receives one record per forwarded line. Must not block.
pub trait Emitter: Send + Sync + fmt::Debug {
    fn emit(&self, message: LogMessage);
}

/// Channel-backed emitter feeding a JSON-lines writer task.
#[derive(Debug, Clone)]
pub struct JsonLinesEmitter {
    tx: mpsc::UnboundedSender<LogMessage>,
}

impl Emitter for JsonLinesEmitter {
    fn emit(&self, message: LogMessage) {
        if self.tx.send(message).is_err() {
            debug!("json-lines writer has stopped; dropping record");
        }
    }
}

#[derive(Serialize)]
struct WireRecord<'a> {
    message: std::borrow::Cow<'a, str>,
    app_id: &'a str,
    drain_urls: &'a [String],
    message_type: StreamKind,
    source_name: &'a str,
    source_id: &'a str,
    timestamp: i64,
}

impl<'a> From<&'a LogMessage> for WireRecord<'a> {
    fn from(m: &'a LogMessage) -> Self {
        Self {
            message: String::from_utf8_lossy(&m.message),
            app_id: &m.app_id,
            drain_urls: &m.drain_urls,
            message_type: m.message_type,
            source_name: &m.source_name,
            source_id: &m.source_id,
            timestamp: m.timestamp,
        }
    }
}

/// Spawn the writer task and return the emitter feeding it.
///
/// The writer exits once every clone of the emitter has been dropped.
pub fn spawn_json_lines_emitter<W>(mut writer: W) -> (JsonLinesEmitter, JoinHandle<()>)
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<LogMessage>();

    let handle = tokio::spawn(async move {
        while let Some(message) = rx.recv().await {
            let mut line = match serde_json::to_vec(&WireRecord::from(&message)) {
                Ok(line) => line,
                Err(err) => {
                    warn!(error = %err, app_id = %message.app_id, "failed to encode record");
                    continue;
                }
            };
            line.push(b'\n');

            if let Err(err) = writer.write_all(&line).await {
                warn!(error = %err, "failed to write record; stopping json-lines writer");
                return;
            }
            if rx.is_empty() {
                if let Err(err) = writer.flush().await {
                    warn!(error = %err, "failed to flush records");
                }
            }
        }
        if let Err(err) = writer.flush().await {
            warn!(error = %err, "failed to flush records on close");
        }
        debug!("json-lines writer finished (channel closed)");
    });

    (JsonLinesEmitter { tx }, handle)
}
