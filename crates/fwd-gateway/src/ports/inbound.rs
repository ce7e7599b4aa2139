//! Inbound port: the programmatic entry points other components call.

use crate::domain::error::SendError;
use crate::domain::identity::UserId;
use async_trait::async_trait;

/// Addressing live connections by user identity.
#[async_trait]
pub trait GatewayApi: Send + Sync {
    /// Queue an already encoded frame for the user's connection.
    ///
    /// Waits while that connection's outbound queue is full. Fails with
    /// [`SendError::ClientNotFound`] when the user has no local connection.
    async fn send_message(&self, user: UserId, frame: Vec<u8>) -> Result<(), SendError>;

    /// Close the user's connection. Returns whether one was found.
    fn stop_client(&self, user: UserId) -> bool;
}
