// src/metrics.rs

//! Pull-based counters and a periodic log reporter.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::registry::RegistryHandle;

/// A named counter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Metric {
    pub name: &'static str,
    pub value: u64,
}

/// Counters of one reporting unit (one transport).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsContext {
    pub name: String,
    pub metrics: Vec<Metric>,
}

impl MetricsContext {
    pub fn value(&self, name: &str) -> Option<u64> {
        self.metrics.iter().find(|m| m.name == name).map(|m| m.value)
    }
}

pub const RECEIVED_MESSAGE_COUNT: &str = "received_message_count";
pub const RECEIVED_BYTE_COUNT: &str = "received_byte_count";

/// Per-transport counters. Written by the read loop, read by reporters.
#[derive(Debug, Default)]
pub struct TransportCounters {
    messages: AtomicU64,
    bytes: AtomicU64,
}

impl TransportCounters {
    pub fn record(&self, bytes: usize) {
        self.messages.fetch_add(1, Ordering::Relaxed);
        self.bytes.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn messages(&self) -> u64 {
        self.messages.load(Ordering::Relaxed)
    }

    pub fn bytes(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }
}

/// Periodically log every active transport's counters.
pub fn spawn_metrics_reporter(registry: RegistryHandle, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let contexts = match registry.metrics().await {
                Ok(contexts) => contexts,
                Err(_) => {
                    debug!("registry closed; metrics reporter exiting");
                    return;
                }
            };

            for ctx in contexts {
                info!(
                    context = %ctx.name,
                    messages = ctx.value(RECEIVED_MESSAGE_COUNT).unwrap_or(0),
                    bytes = ctx.value(RECEIVED_BYTE_COUNT).unwrap_or(0),
                    "stream metrics"
                );
            }
        }
    })
}
