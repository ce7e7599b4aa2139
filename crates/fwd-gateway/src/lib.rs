//! Forwarding Gateway - persistent WebSocket sessions with distributed
//! connection ownership.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        GATEWAY INSTANCE                              │
//! ├─────────────────────────────────────────────────────────────────────┤
//! │  ┌────────────────────┐                                             │
//! │  │ WebSocket Listener │  TLS → upgrade on /ws → split socket        │
//! │  └─────────┬──────────┘                                             │
//! │            │ accept                                                  │
//! │  ┌─────────┴──────────┐       ┌─────────────────────┐               │
//! │  │    Read Loop       │──────▶│  Outbound Queue     │──▶ Write Loop │
//! │  │ (state machine)    │       │  (bounded, 256)     │               │
//! │  └─────────┬──────────┘       └─────────────────────┘               │
//! │            │ login ok                                                │
//! │  ┌─────────┴──────────┐       ┌─────────────────────┐               │
//! │  │ Conflict Resolution│──────▶│ Local Connection    │               │
//! │  │                    │       │ Registry            │               │
//! │  └──┬──────────────┬──┘       └─────────────────────┘               │
//! └─────┼──────────────┼────────────────────────────────────────────────┘
//!       │              │
//!       ▼              ▼
//!  Distributed     Directive Bus ──▶ other instances ("DELETE USER <id>")
//!  Registry
//! ```
//!
//! # Ownership
//!
//! When a user logs in, the instance evicts any local connection for that
//! user, revokes another instance's claim (telling it to drop the socket),
//! claims the user, and only then commits the connection under the user's
//! identity. Stale connections are torn down on whichever instance held them.
//!
//! # Usage
//!
//! ```ignore
//! use fwd_gateway::{Gateway, GatewayConfig, GatewayDependencies, WebSocketListener};
//!
//! let config = GatewayConfig::from_env()?;
//! let gateway = Gateway::new(&config, deps);
//! let listener = WebSocketListener::bind(&config, gateway.clone()).await?;
//! listener.run(shutdown).await;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod service;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

// Re-exports for public API
pub use adapters::{
    BincodeCodec, ForwardingHandler, InMemoryAccountStore, InMemoryConnectionRegistry,
    RedisConnectionRegistry, RedisDirectiveBus, WebSocketListener,
};
pub use domain::config::GatewayConfig;
pub use domain::error::{CoordinationError, GatewayError, SendError, TransportError};
pub use domain::identity::{ConnectionKey, ContainerId, UserId};
pub use domain::registry::ConnectionRegistry;
pub use ports::{DistributedRegistry, GatewayApi};
pub use service::{spawn_directive_listener, ConnectionTasks, Gateway, GatewayDependencies};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
