//! Per-connection state shared between the read loop, the write loop and
//! external terminators.

use crate::domain::error::SendError;
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use uuid::Uuid;

/// Default capacity of a connection's outbound queue.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 256;

/// Bounded FIFO of encoded frames waiting to be written to the socket.
///
/// Many producers, one consumer (the write loop). Closing drops the shared
/// sender; the consumer sees the end of the stream once every queued frame
/// has been taken and no send is in flight.
#[derive(Debug)]
pub struct OutboundQueue {
    sender: Mutex<Option<mpsc::Sender<Vec<u8>>>>,
}

impl OutboundQueue {
    /// Create a queue and the receiving end for the write loop.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Vec<u8>>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Mutex::new(Some(tx)),
            },
            rx,
        )
    }

    /// Enqueue a frame, waiting while the queue is full.
    pub async fn enqueue(&self, frame: Vec<u8>) -> Result<(), SendError> {
        // Clone under the lock, await outside it.
        let sender = self
            .sender
            .lock()
            .as_ref()
            .cloned()
            .ok_or(SendError::QueueClosed)?;

        sender.send(frame).await.map_err(|_| SendError::QueueClosed)
    }

    /// Close the queue. Returns `false` if it was already closed.
    pub fn close(&self) -> bool {
        self.sender.lock().take().is_some()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.sender.lock().is_none()
    }
}

/// A live client connection.
#[derive(Debug)]
pub struct ConnectionRecord {
    id: Uuid,
    endpoint: SocketAddr,
    outbound: OutboundQueue,
    /// Written only by the read loop.
    authenticated: AtomicBool,
    /// Double-close guard for the socket.
    stopped: AtomicBool,
    closer: CancellationToken,
}

impl ConnectionRecord {
    /// Create a record for a freshly accepted connection.
    #[must_use]
    pub fn new(endpoint: SocketAddr, capacity: usize) -> (Arc<Self>, mpsc::Receiver<Vec<u8>>) {
        let (outbound, rx) = OutboundQueue::new(capacity);
        let record = Arc::new(Self {
            id: Uuid::new_v4(),
            endpoint,
            outbound,
            authenticated: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
            closer: CancellationToken::new(),
        });
        (record, rx)
    }

    #[must_use]
    pub fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub fn endpoint(&self) -> SocketAddr {
        self.endpoint
    }

    #[must_use]
    pub fn outbound(&self) -> &OutboundQueue {
        &self.outbound
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    pub(crate) fn mark_authenticated(&self) {
        self.authenticated.store(true, Ordering::Release);
    }

    /// Close the socket. Only the first call has an effect.
    ///
    /// The pending receive of the read loop fails with
    /// [`TransportError::ClosedLocally`](crate::domain::error::TransportError::ClosedLocally).
    pub fn close_socket(&self) -> bool {
        if self.stopped.swap(true, Ordering::AcqRel) {
            return false;
        }
        self.closer.cancel();
        true
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    /// Resolves once the socket has been closed locally.
    pub fn closed(&self) -> WaitForCancellationFuture<'_> {
        self.closer.cancelled()
    }
}
