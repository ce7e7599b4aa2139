//! In-memory sockets and test doubles.
//!
//! Available to unit tests and, behind the `test-utils` feature, to the
//! integration suite.

use crate::adapters::accounts::InMemoryAccountStore;
use crate::adapters::codec::BincodeCodec;
use crate::adapters::forwarding::ForwardingHandler;
use crate::domain::config::GatewayConfig;
use crate::domain::envelope::{Request, Response};
use crate::domain::error::{HandlerError, RegistryError, TransportError};
use crate::domain::identity::{ContainerId, UserId};
use crate::domain::registry::ConnectionRegistry;
use crate::ports::outbound::{
    DirectivePublisher, DistributedRegistry, FrameSink, FrameSource, HandlerSignal,
    MessageHandler,
};
use crate::service::gateway::{Gateway, GatewayDependencies};
use async_trait::async_trait;
use parking_lot::Mutex;
use shared_bus::PublishError;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

type Inbound = Result<Vec<u8>, TransportError>;

/// Create a connected server/client socket pair.
pub fn socket_pair() -> (MemorySource, MemorySink, ClientSocket) {
    let (to_server, inbound) = mpsc::unbounded_channel();
    let (outbound, from_server) = mpsc::unbounded_channel();

    (
        MemorySource { inbound },
        MemorySink {
            outbound: Some(outbound),
        },
        ClientSocket {
            to_server: Some(to_server),
            from_server,
            codec: BincodeCodec::new(),
        },
    )
}

/// Server-side receiving half.
pub struct MemorySource {
    inbound: mpsc::UnboundedReceiver<Inbound>,
}

#[async_trait]
impl FrameSource for MemorySource {
    async fn recv_frame(&mut self) -> Result<Vec<u8>, TransportError> {
        self.inbound.recv().await.unwrap_or(Err(TransportError::Closed))
    }
}

/// Server-side sending half.
pub struct MemorySink {
    outbound: Option<mpsc::UnboundedSender<Vec<u8>>>,
}

#[async_trait]
impl FrameSink for MemorySink {
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError> {
        let Some(outbound) = &self.outbound else {
            return Err(TransportError::Closed);
        };
        outbound
            .send(frame)
            .map_err(|_| TransportError::Io("client went away".into()))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.outbound = None;
        Ok(())
    }
}

/// The client end of an in-memory socket.
pub struct ClientSocket {
    to_server: Option<mpsc::UnboundedSender<Inbound>>,
    from_server: mpsc::UnboundedReceiver<Vec<u8>>,
    codec: BincodeCodec,
}

impl ClientSocket {
    /// Send a raw frame.
    pub fn send_frame(&self, frame: Vec<u8>) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(Ok(frame));
        }
    }

    /// Encode and send a request.
    pub fn send_request(&self, request: &Request) {
        if let Ok(frame) = self.codec.encode_request(request) {
            self.send_frame(frame);
        }
    }

    /// Make the server's next receive fail with `error`.
    pub fn fail(&self, error: TransportError) {
        if let Some(tx) = &self.to_server {
            let _ = tx.send(Err(error));
        }
    }

    /// Close the client side normally.
    pub fn close(&mut self) {
        self.to_server = None;
    }

    /// Next frame written by the server, `None` once the server closed.
    pub async fn next_frame(&mut self) -> Option<Vec<u8>> {
        self.from_server.recv().await
    }

    /// Next decoded response within `wait`.
    pub async fn next_response(&mut self, wait: Duration) -> Option<Response> {
        let frame = tokio::time::timeout(wait, self.next_frame()).await.ok()??;
        self.codec.decode_response(&frame).ok()
    }

    /// Whether the server closes its side within `wait`, discarding frames.
    pub async fn closed_within(&mut self, wait: Duration) -> bool {
        tokio::time::timeout(wait, async {
            while self.next_frame().await.is_some() {}
        })
        .await
        .is_ok()
    }
}

/// Publisher that records every publish.
#[derive(Default)]
pub struct RecordingPublisher {
    messages: Mutex<Vec<(String, Vec<u8>)>>,
    fail: bool,
    count: AtomicU64,
}

impl RecordingPublisher {
    /// A publisher whose every publish fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// `(topic, payload)` pairs published so far.
    #[must_use]
    pub fn published_messages(&self) -> Vec<(String, Vec<u8>)> {
        self.messages.lock().clone()
    }
}

#[async_trait]
impl DirectivePublisher for RecordingPublisher {
    async fn publish(&self, payload: &[u8], topic: &str) -> Result<usize, PublishError> {
        if self.fail {
            return Err(PublishError::Backend("injected".into()));
        }
        self.messages
            .lock()
            .push((topic.to_string(), payload.to_vec()));
        self.count.fetch_add(1, Ordering::Relaxed);
        Ok(1)
    }

    fn published(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }
}

/// Which registry operation [`FailingRegistry`] fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryFault {
    Register,
    Unregister,
    Owner,
}

/// Registry that fails one kind of operation and serves the rest from memory.
pub struct FailingRegistry {
    owners: Mutex<HashMap<UserId, ContainerId>>,
    fault: RegistryFault,
}

impl FailingRegistry {
    #[must_use]
    pub fn new(fault: RegistryFault) -> Self {
        Self {
            owners: Mutex::new(HashMap::new()),
            fault,
        }
    }

    pub fn seed(&self, user: UserId, container: &str) {
        self.owners.lock().insert(user, ContainerId::from(container));
    }

    #[must_use]
    pub fn current(&self, user: UserId) -> Option<String> {
        self.owners.lock().get(&user).map(|c| c.as_str().to_string())
    }

    fn check(&self, op: RegistryFault) -> Result<(), RegistryError> {
        if self.fault == op {
            return Err(RegistryError::Unavailable("injected".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl DistributedRegistry for FailingRegistry {
    async fn register(&self, user: UserId, container: &ContainerId) -> Result<(), RegistryError> {
        self.check(RegistryFault::Register)?;
        self.owners.lock().insert(user, container.clone());
        Ok(())
    }

    async fn unregister(&self, user: UserId, container: &ContainerId) -> Result<(), RegistryError> {
        self.check(RegistryFault::Unregister)?;
        let mut owners = self.owners.lock();
        if owners.get(&user) == Some(container) {
            owners.remove(&user);
        }
        Ok(())
    }

    async fn owner(&self, user: UserId) -> Result<Option<ContainerId>, RegistryError> {
        self.check(RegistryFault::Owner)?;
        Ok(self.owners.lock().get(&user).cloned())
    }
}

/// Message handler returning a fixed result and recording its calls.
pub struct RecordingMessageHandler {
    result: Result<HandlerSignal, HandlerError>,
    calls: Mutex<Vec<(UserId, Request)>>,
}

impl RecordingMessageHandler {
    #[must_use]
    pub fn new(result: Result<HandlerSignal, HandlerError>) -> Self {
        Self {
            result,
            calls: Mutex::new(Vec::new()),
        }
    }

    #[must_use]
    pub fn calls(&self) -> Vec<(UserId, Request)> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl MessageHandler for RecordingMessageHandler {
    async fn handle(&self, user: UserId, request: Request) -> Result<HandlerSignal, HandlerError> {
        self.calls.lock().push((user, request));
        self.result.clone()
    }
}

/// Build a gateway with the given backends, an empty account store and the
/// forwarding handler.
pub fn gateway_with(
    container: &str,
    registry: Arc<dyn DistributedRegistry>,
    publisher: Arc<dyn DirectivePublisher>,
) -> Arc<Gateway> {
    gateway_with_handlers(
        container,
        registry,
        publisher,
        Arc::new(InMemoryAccountStore::new()),
        None,
    )
}

/// Build a gateway with explicit handlers. `messages` defaults to the
/// forwarding handler.
pub fn gateway_with_handlers(
    container: &str,
    registry: Arc<dyn DistributedRegistry>,
    publisher: Arc<dyn DirectivePublisher>,
    accounts: Arc<InMemoryAccountStore>,
    messages: Option<Arc<dyn MessageHandler>>,
) -> Arc<Gateway> {
    let config = GatewayConfig {
        container_id: ContainerId::from(container),
        tls: None,
        ..GatewayConfig::default()
    };
    let connections = Arc::new(ConnectionRegistry::new());
    let codec = Arc::new(BincodeCodec::new());
    let messages: Arc<dyn MessageHandler> = match messages {
        Some(messages) => messages,
        None => Arc::new(ForwardingHandler::new(connections.clone(), codec.clone())),
    };

    Gateway::new(
        &config,
        GatewayDependencies {
            connections,
            registry,
            publisher,
            codec,
            login: accounts.clone(),
            signup: accounts,
            messages,
        },
    )
}
