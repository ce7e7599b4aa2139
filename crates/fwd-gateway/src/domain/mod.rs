//! Domain types for the forwarding gateway.
//!
//! Identities, envelopes, per-connection state, the local registry,
//! configuration and errors. Nothing here performs network I/O.

pub mod config;
pub mod connection;
pub mod envelope;
pub mod error;
pub mod identity;
pub mod registry;

// Re-exports for convenience
pub use config::{ConfigError, GatewayConfig, ListenConfig, TlsConfig};
pub use connection::{ConnectionRecord, OutboundQueue, DEFAULT_OUTBOUND_CAPACITY};
pub use envelope::{
    LoginRequest, LoginResponse, PayloadKind, Request, RequestPayload, Response,
    ResponsePayload, SignupRequest, SignupResponse,
};
pub use error::{
    CodecError, CoordinationError, GatewayError, HandlerError, RegistryError, SendError,
    TransportError,
};
pub use identity::{ConnectionKey, ContainerId, UserId, DEFAULT_CONTAINER_ID};
pub use registry::ConnectionRegistry;
