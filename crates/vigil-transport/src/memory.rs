// In-process broker used by tests and local development.
// Messages land in per-routing-key queues regardless of exchange kind; the
// full publish log is retained so callers can assert on routing decisions.
use super::{Exchange, QueueStats, Transport, TransportError, TransportResult};
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

/// One publish as the broker observed it.
#[derive(Debug, Clone)]
pub struct PublishRecord {
    pub exchange: Exchange,
    pub routing_key: String,
    pub payload: Bytes,
}

#[derive(Debug, Default)]
struct BrokerState {
    // Queue depth per routing key; drained by `take_queue`.
    queues: HashMap<String, VecDeque<Bytes>>,
    // Consumer counts are seeded by the harness; nothing consumes in-process.
    consumers: HashMap<String, u64>,
    log: Vec<PublishRecord>,
}

/// In-process transport backend.
#[derive(Debug)]
pub struct MemoryTransport {
    state: Mutex<BrokerState>,
    connected: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(BrokerState::default()),
            connected: AtomicBool::new(true),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BrokerState> {
        self.state.lock().expect("broker lock")
    }

    /// Simulate losing or regaining the bus connection.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    /// Seed the consumer count reported by `stats` for a queue.
    pub fn set_consumers(&self, queue: &str, consumers: u64) {
        self.lock().consumers.insert(queue.to_string(), consumers);
    }

    /// Drain and return everything queued under a routing key.
    pub fn take_queue(&self, queue: &str) -> Vec<Bytes> {
        self.lock()
            .queues
            .remove(queue)
            .map(|queue| queue.into_iter().collect())
            .unwrap_or_default()
    }

    /// Snapshot of every publish seen so far, oldest first.
    pub fn published(&self) -> Vec<PublishRecord> {
        self.lock().log.clone()
    }
}

#[async_trait]
impl Transport for MemoryTransport {
    async fn publish(
        &self,
        exchange: Exchange,
        routing_key: &str,
        payload: Bytes,
    ) -> TransportResult<()> {
        if !self.connected() {
            return Err(TransportError::Disconnected);
        }
        let mut state = self.lock();
        state
            .queues
            .entry(routing_key.to_string())
            .or_default()
            .push_back(payload.clone());
        state.log.push(PublishRecord {
            exchange,
            routing_key: routing_key.to_string(),
            payload,
        });
        Ok(())
    }

    async fn stats(&self, queue: &str) -> TransportResult<QueueStats> {
        if !self.connected() {
            return Err(TransportError::Disconnected);
        }
        let state = self.lock();
        Ok(QueueStats {
            messages: state.queues.get(queue).map(VecDeque::len).unwrap_or(0) as u64,
            consumers: state.consumers.get(queue).copied().unwrap_or(0),
        })
    }

    fn connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn publish_queues_and_logs() {
        let transport = MemoryTransport::new();
        transport
            .publish(Exchange::Direct, "results", Bytes::from_static(b"{}"))
            .await
            .expect("publish");
        transport
            .publish(Exchange::Fanout, "roles:web", Bytes::from_static(b"{}"))
            .await
            .expect("publish");

        let stats = transport.stats("results").await.expect("stats");
        assert_eq!(stats.messages, 1);

        let log = transport.published();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].exchange, Exchange::Direct);
        assert_eq!(log[0].routing_key, "results");
        assert_eq!(log[1].exchange, Exchange::Fanout);

        let drained = transport.take_queue("results");
        assert_eq!(drained.len(), 1);
        assert_eq!(transport.stats("results").await.expect("stats").messages, 0);
    }

    #[tokio::test]
    async fn stats_reports_seeded_consumers() {
        let transport = MemoryTransport::new();
        transport.set_consumers("keepalives", 3);
        let stats = transport.stats("keepalives").await.expect("stats");
        assert_eq!(stats.consumers, 3);
        assert_eq!(stats.messages, 0);
    }

    #[tokio::test]
    async fn disconnected_publish_fails() {
        let transport = MemoryTransport::new();
        transport.close().await;
        assert!(!transport.connected());
        assert!(matches!(
            transport
                .publish(Exchange::Direct, "results", Bytes::new())
                .await,
            Err(TransportError::Disconnected)
        ));
    }
}
