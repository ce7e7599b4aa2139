//! Outbound ports for the forwarding gateway.
//!
//! Everything the session loops depend on but do not implement: the socket,
//! the envelope codec, business handlers and the shared ownership registry.

use crate::domain::envelope::{Request, Response};
use crate::domain::error::{CodecError, HandlerError, RegistryError, TransportError};
use crate::domain::identity::{ContainerId, UserId};
use async_trait::async_trait;

pub use shared_bus::DirectivePublisher;

/// Receiving half of a client socket.
#[async_trait]
pub trait FrameSource: Send {
    /// Wait for the next binary frame.
    ///
    /// Normal closure by the peer is reported as [`TransportError::Closed`].
    async fn recv_frame(&mut self) -> Result<Vec<u8>, TransportError>;
}

/// Sending half of a client socket.
#[async_trait]
pub trait FrameSink: Send {
    /// Write one binary frame.
    async fn send_frame(&mut self, frame: Vec<u8>) -> Result<(), TransportError>;

    /// Close the write side.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Serialization of envelopes to and from frames.
pub trait EnvelopeCodec: Send + Sync {
    fn decode(&self, frame: &[u8]) -> Result<Request, CodecError>;

    fn encode(&self, response: &Response) -> Result<Vec<u8>, CodecError>;
}

/// A handler response paired with the outcome it reports.
///
/// The response is always sent to the client; the outcome decides what the
/// gateway does next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerReply<T> {
    pub response: Response,
    pub outcome: Result<T, HandlerError>,
}

impl<T> HandlerReply<T> {
    pub fn ok(response: Response, value: T) -> Self {
        Self {
            response,
            outcome: Ok(value),
        }
    }

    pub fn err(response: Response, error: HandlerError) -> Self {
        Self {
            response,
            outcome: Err(error),
        }
    }
}

/// Verifies credentials and resolves the user identity.
#[async_trait]
pub trait LoginHandler: Send + Sync {
    async fn login(&self, request: &Request) -> HandlerReply<UserId>;
}

/// Creates accounts.
#[async_trait]
pub trait SignupHandler: Send + Sync {
    async fn signup(&self, request: &Request) -> HandlerReply<()>;
}

/// What the session should do after a handled message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandlerSignal {
    Continue,
    /// Terminate the connection (wire value `1`).
    Close,
}

/// Handles every frame of an authenticated connection.
#[async_trait]
pub trait MessageHandler: Send + Sync {
    async fn handle(&self, user: UserId, request: Request) -> Result<HandlerSignal, HandlerError>;
}

/// Shared mapping of user identity to owning container.
#[async_trait]
pub trait DistributedRegistry: Send + Sync {
    /// Record `container` as the owner of `user`.
    async fn register(&self, user: UserId, container: &ContainerId) -> Result<(), RegistryError>;

    /// Drop the claim of `container` on `user`.
    ///
    /// A claim held by a different container is left untouched.
    async fn unregister(&self, user: UserId, container: &ContainerId)
        -> Result<(), RegistryError>;

    /// Current owner of `user`, if any.
    async fn owner(&self, user: UserId) -> Result<Option<ContainerId>, RegistryError>;
}
