//! Connection handles and reference unwrapping.
//!
//! A handler never owns its connection. It holds a [`ConnectionHandle`], a
//! cheaply cloneable handle whose queued messages are drained by the
//! connection's writer; this crate never touches the wire itself.
//!
//! # Architecture
//!
//! ```text
//! Handler 1 ─┐
//! Handler 2 ─┼─► ConnectionHandle ─► mpsc::UnboundedSender<Outbound> ─► writer
//! Handler N ─┘
//! ```
//!
//! At construction time a registry may be handed a wrapper around the
//! connection (a proxy or a guard object) instead of the connection itself.
//! [`ConnectionRef`] lets it follow such wrappers inward and store the
//! canonical handle.

use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{Result, WirecallError};

/// Next connection id. Ids are process-unique and never reused.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A message a handler queues for the remote peer.
///
/// Carries the decoded form only; the connection's writer encodes it for
/// the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    /// Remote method the notification targets.
    pub method: String,
    /// Decoded parameter value.
    pub params: Value,
}

/// Cheaply cloneable handle to the connection that owns a handler.
///
/// Clones share the same id and the same outbound queue. Queueing never
/// blocks; backpressure belongs to the transport writer, not to handler
/// code.
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    /// Process-unique connection id (used in logs).
    id: u64,
    /// Outbound queue drained by the connection's writer.
    tx: mpsc::UnboundedSender<Outbound>,
}

impl ConnectionHandle {
    /// Create a handle plus the receiving end the connection's writer
    /// drains.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<Outbound>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed);
        (Self { id, tx }, rx)
    }

    /// Process-unique id of this connection.
    #[inline]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Queue a notification for the remote peer.
    ///
    /// # Errors
    ///
    /// Returns [`WirecallError::ConnectionClosed`] if the writer side is
    /// gone.
    pub fn notify(&self, method: impl Into<String>, params: Value) -> Result<()> {
        let msg = Outbound {
            method: method.into(),
            params,
        };
        self.tx.send(msg).map_err(|_| WirecallError::ConnectionClosed)
    }

    /// Whether the writer side has hung up.
    #[inline]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A value that can stand in for a connection when a handler is built.
///
/// Implemented by [`ConnectionHandle`] itself and by wrapper objects that
/// carry one. A wrapper reports the next layer from [`inner`], and the
/// registry follows that chain inward, bounded by the publish policy's
/// [`unwrap_hops`](crate::PublishPolicy::unwrap_hops), before storing the
/// handle it reaches.
///
/// [`inner`]: ConnectionRef::inner
pub trait ConnectionRef {
    /// The handle at this layer of the chain.
    fn handle(&self) -> ConnectionHandle;

    /// The next inner connection-like reference, if this is a wrapper.
    fn inner(&self) -> Option<&dyn ConnectionRef> {
        None
    }
}

impl ConnectionRef for ConnectionHandle {
    fn handle(&self) -> ConnectionHandle {
        self.clone()
    }
}

/// Follow [`ConnectionRef::inner`] at most `max_hops` times and return the
/// handle of the layer reached.
pub(crate) fn resolve_handle(reference: &dyn ConnectionRef, max_hops: usize) -> ConnectionHandle {
    let mut current = reference;
    for _ in 0..max_hops {
        match current.inner() {
            Some(next) => current = next,
            None => break,
        }
    }
    current.handle()
}
