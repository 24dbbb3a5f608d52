use std::sync::Mutex;

use logtap::emit::Emitter;
use logtap::message::LogMessage;
use tokio::sync::Notify;

/// An emitter that keeps every record it receives, in order.
#[derive(Debug, Default)]
pub struct RecordingEmitter {
    records: Mutex<Vec<LogMessage>>,
    notify: Notify,
}

impl RecordingEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<LogMessage> {
        self.records.lock().unwrap().clone()
    }

    pub fn texts(&self) -> Vec<String> {
        self.records().iter().map(LogMessage::text).collect()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Wait until at least `n` records have been emitted.
    pub async fn wait_for(&self, n: usize) {
        loop {
            let notified = self.notify.notified();
            if self.len() >= n {
                return;
            }
            notified.await;
        }
    }
}

impl Emitter for RecordingEmitter {
    fn emit(&self, message: LogMessage) {
        self.records.lock().unwrap().push(message);
        self.notify.notify_waiters();
    }
}
