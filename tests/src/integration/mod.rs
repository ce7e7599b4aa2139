//! Cross-crate integration scenarios.

pub mod ownership;
pub mod session_flow;
pub mod websocket;
