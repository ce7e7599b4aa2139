//! Gateway error types.
//!
//! One enum per failure class: transport errors end a connection, codec
//! errors drop a frame, handler errors are answered or logged, and
//! coordination errors abort a single login attempt.

use crate::domain::config::ConfigError;
use crate::domain::identity::{ContainerId, UserId};
use shared_bus::PublishError;
use thiserror::Error;

/// Errors from the socket layer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer closed the connection normally.
    #[error("connection closed by peer")]
    Closed,

    /// The gateway closed the connection (stop or eviction).
    #[error("connection closed locally")]
    ClosedLocally,

    /// Any other socket failure.
    #[error("transport error: {0}")]
    Io(String),
}

impl TransportError {
    /// Whether this error represents an orderly shutdown.
    #[must_use]
    pub fn is_normal_closure(&self) -> bool {
        matches!(self, Self::Closed | Self::ClosedLocally)
    }
}

/// Errors from encoding or decoding envelopes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("malformed frame: {0}")]
    Decode(String),

    #[error("failed to encode response: {0}")]
    Encode(String),
}

/// Errors reported by business handlers.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HandlerError {
    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("unknown user {0}")]
    UnknownUser(i64),

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("handler failure: {0}")]
    Internal(String),
}

/// Errors from the distributed connection registry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("registry unavailable: {0}")]
    Unavailable(String),

    #[error("registry backend error: {0}")]
    Backend(String),
}

/// Failure of the ownership protocol for one login attempt.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoordinationError {
    #[error("failed to look up owner of user {user}: {source}")]
    OwnerLookup { user: UserId, source: RegistryError },

    #[error("failed to revoke claim of {owner} on user {user}: {source}")]
    RevokeRemote {
        user: UserId,
        owner: ContainerId,
        source: RegistryError,
    },

    #[error("failed to notify {owner} about user {user}: {source}")]
    Notify {
        user: UserId,
        owner: ContainerId,
        source: PublishError,
    },

    #[error("failed to claim user {user}: {source}")]
    Claim { user: UserId, source: RegistryError },
}

/// Errors from the external send entry point.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("client {0} not found")]
    ClientNotFound(String),

    #[error("outbound queue closed")]
    QueueClosed,
}

/// Startup and listener errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Server socket bind error
    #[error("server bind error: {0}")]
    Bind(String),

    /// Certificate or key could not be loaded
    #[error("TLS setup error: {0}")]
    Tls(String),

    /// Backend connection could not be established
    #[error("registry setup error: {0}")]
    Registry(#[from] RegistryError),

    /// Directive channel could not be established
    #[error("directive channel error: {0}")]
    Directive(String),
}
