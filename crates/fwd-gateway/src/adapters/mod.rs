//! Adapters for the forwarding gateway.
//!
//! Infrastructure implementations of the outbound ports: registries,
//! directive channels, the WebSocket transport and reference handlers.

pub mod accounts;
pub mod codec;
mod error_conversions;
pub mod forwarding;
pub mod memory_registry;
pub mod redis_bus;
pub mod redis_registry;
pub mod tls;
pub mod websocket;

pub use accounts::InMemoryAccountStore;
pub use codec::BincodeCodec;
pub use forwarding::ForwardingHandler;
pub use memory_registry::InMemoryConnectionRegistry;
pub use redis_bus::{RedisDirectiveBus, RedisSubscription};
pub use redis_registry::RedisConnectionRegistry;
pub use websocket::{WebSocketListener, WsSink, WsSource};
