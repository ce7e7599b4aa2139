//! Message handler that forwards posts between locally connected users.

use crate::domain::envelope::{Request, RequestPayload, Response};
use crate::domain::error::HandlerError;
use crate::domain::identity::UserId;
use crate::domain::registry::ConnectionRegistry;
use crate::ports::outbound::{EnvelopeCodec, HandlerSignal, MessageHandler};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

pub struct ForwardingHandler {
    connections: Arc<ConnectionRegistry>,
    codec: Arc<dyn EnvelopeCodec>,
}

impl ForwardingHandler {
    pub fn new(connections: Arc<ConnectionRegistry>, codec: Arc<dyn EnvelopeCodec>) -> Self {
        Self { connections, codec }
    }
}

#[async_trait]
impl MessageHandler for ForwardingHandler {
    async fn handle(&self, user: UserId, request: Request) -> Result<HandlerSignal, HandlerError> {
        match request.payload {
            RequestPayload::Logout => Ok(HandlerSignal::Close),
            RequestPayload::Post { to, body } => {
                let recipient = self
                    .connections
                    .get(&to.to_string())
                    .filter(|record| record.is_authenticated())
                    .ok_or_else(|| HandlerError::Rejected(format!("user {to} is not connected")))?;

                let frame = self
                    .codec
                    .encode(&Response::delivery(user.get(), body))
                    .map_err(|e| HandlerError::Internal(e.to_string()))?;

                recipient
                    .outbound()
                    .enqueue(frame)
                    .await
                    .map_err(|e| HandlerError::Rejected(e.to_string()))?;

                debug!(user_id = %user, to, "Post forwarded");
                Ok(HandlerSignal::Continue)
            }
            RequestPayload::Login(_) | RequestPayload::Signup(_) => {
                Err(HandlerError::Rejected("already authenticated".into()))
            }
        }
    }
}
