// src/stream/transport.rs

//! Following one stream kind of one task.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::emit::Emitter;
use crate::errors::{LogtapError, Result};
use crate::message::LogMessageFactory;
use crate::metrics::{
    Metric, MetricsContext, RECEIVED_BYTE_COUNT, RECEIVED_MESSAGE_COUNT, TransportCounters,
};
use crate::stream::lines::LineReader;
use crate::stream::source::{BoxedStream, StreamSource};
use crate::task::{StreamKind, Task};

/// Open attempts before a transport gives up.
pub const CONNECT_ATTEMPTS: u32 = 10;

/// Pause between two open attempts.
pub const CONNECT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Why a read loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamEnd {
    /// Source closed cleanly.
    Eof,
    /// Stop signal observed; unread data discarded.
    Stopped,
    /// Unrecoverable read error; a diagnostic line was emitted.
    Failed,
}

/// Follows one stream of one task.
///
/// Counters belong to this instance only; a new connection always goes
/// through a new transport.
#[derive(Debug)]
pub struct StreamTransport {
    task: Arc<Task>,
    kind: StreamKind,
    path: PathBuf,
    source: Arc<dyn StreamSource>,
    stop: CancellationToken,
    factory: LogMessageFactory,
    counters: Arc<TransportCounters>,
}

impl StreamTransport {
    pub fn new(
        task: Arc<Task>,
        kind: StreamKind,
        source: Arc<dyn StreamSource>,
        stop: CancellationToken,
    ) -> Self {
        let path = source.stream_path(&task, kind);
        let factory = LogMessageFactory::new(Arc::clone(&task), kind);
        Self {
            task,
            kind,
            path,
            source,
            stop,
            factory,
            counters: Arc::new(TransportCounters::default()),
        }
    }

    pub fn kind(&self) -> StreamKind {
        self.kind
    }

    pub fn counters(&self) -> Arc<TransportCounters> {
        Arc::clone(&self.counters)
    }

    pub fn metrics(&self) -> MetricsContext {
        MetricsContext {
            name: format!(
                "stream:{} type {}",
                self.task.container_path.display(),
                self.kind
            ),
            metrics: vec![
                Metric {
                    name: RECEIVED_MESSAGE_COUNT,
                    value: self.counters.messages(),
                },
                Metric {
                    name: RECEIVED_BYTE_COUNT,
                    value: self.counters.bytes(),
                },
            ],
        }
    }

    /// Open the underlying source, retrying while it does not exist yet.
    ///
    /// A stop signal aborts the retry loop early with the last error seen.
    pub async fn connect(&self) -> Result<BoxedStream> {
        let task = self.task.identifier();
        let mut last_err = None;

        for attempt in 1..=CONNECT_ATTEMPTS {
            match self.source.open(&self.path).await {
                Ok(stream) => {
                    debug!(%task, stream = %self.kind, path = ?self.path, attempt, "opened stream");
                    return Ok(stream);
                }
                Err(err) => {
                    debug!(
                        %task,
                        stream = %self.kind,
                        attempt,
                        error = %err,
                        "could not open stream, retrying"
                    );
                    last_err = Some(err);
                }
            }

            if attempt == CONNECT_ATTEMPTS {
                break;
            }
            tokio::select! {
                _ = self.stop.cancelled() => break,
                _ = tokio::time::sleep(CONNECT_RETRY_DELAY) => {}
            }
        }

        Err(LogtapError::ConnectFailed {
            path: self.path.clone(),
            attempts: CONNECT_ATTEMPTS,
            source: last_err
                .unwrap_or_else(|| std::io::Error::other("stopped before connecting")),
        })
    }

    /// Read lines until end-of-stream, a fatal read error or the stop signal.
    ///
    /// Every non-empty line is counted and forwarded to `emitter`. The stream
    /// handle is closed when this returns.
    pub async fn read_loop(&self, stream: BoxedStream, emitter: Arc<dyn Emitter>) -> StreamEnd {
        let task = self.task.identifier();
        let mut lines = LineReader::new(stream);

        loop {
            let next = tokio::select! {
                biased;
                _ = self.stop.cancelled() => {
                    debug!(%task, stream = %self.kind, "stop requested; closing stream");
                    return StreamEnd::Stopped;
                }
                next = lines.next_line() => next,
            };

            match next {
                Ok(Some(line)) => {
                    if line.is_empty() {
                        continue;
                    }
                    self.counters.record(line.len());
                    emitter.emit(self.factory.build(&line));
                }
                Ok(None) => {
                    debug!(%task, stream = %self.kind, "end of stream");
                    return StreamEnd::Eof;
                }
                Err(err) => {
                    info!(%task, stream = %self.kind, error = %err, "error while reading stream");
                    let notice = format!("Dropped a message because of read error: {err}");
                    emitter.emit(self.factory.build(notice.as_bytes()));
                    if !err.is_transient() {
                        return StreamEnd::Failed;
                    }
                }
            }
        }
    }
}
