//! Message transport contract for the Vigil control plane.
//!
//! # Purpose
//! The transport carries check requests and check results between the control
//! plane and the rest of the monitoring pipeline. This crate defines the
//! asynchronous publish/stats contract plus an in-process broker used by
//! tests and local development.
//!
//! # Exchanges
//! Publishes name an exchange kind and a routing key. `direct` delivers to
//! the single queue named by the routing key; `fanout` delivers to every
//! queue bound to it. The control plane never consumes, it only publishes
//! and inspects queue statistics.
use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

pub mod memory;

pub use memory::{MemoryTransport, PublishRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Exchange {
    Direct,
    Fanout,
}

impl Exchange {
    pub fn as_str(&self) -> &'static str {
        match self {
            Exchange::Direct => "direct",
            Exchange::Fanout => "fanout",
        }
    }
}

/// Depth and consumer count for a logical queue.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub messages: u64,
    pub consumers: u64,
}

#[derive(Debug, Error)]
pub enum TransportError {
    #[error("not connected to the transport")]
    Disconnected,
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

pub type TransportResult<T> = Result<T, TransportError>;

/// Asynchronous publish-side facade over the message bus.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn publish(
        &self,
        exchange: Exchange,
        routing_key: &str,
        payload: Bytes,
    ) -> TransportResult<()>;

    async fn stats(&self, queue: &str) -> TransportResult<QueueStats>;

    fn connected(&self) -> bool;
    async fn close(&self);
}
