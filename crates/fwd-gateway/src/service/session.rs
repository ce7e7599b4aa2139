//! Per-connection read and write loops.
//!
//! The read loop owns every protocol state transition:
//!
//! ```text
//!                   Login ok + ownership resolved
//! Unauthenticated ────────────────────────────────▶ Authenticated
//!   │  Login err / Signup / Refused (stay)               │ handler signals Close
//!   │  Logout                                            │ receive failure
//!   ▼                                                    ▼
//! Closed ◀───────────────────────────────────────────────┘
//! ```
//!
//! The write loop drains the outbound queue until it is closed.

use crate::domain::connection::ConnectionRecord;
use crate::domain::envelope::{PayloadKind, Request, Response};
use crate::domain::error::TransportError;
use crate::domain::identity::{ConnectionKey, UserId};
use crate::ports::outbound::{FrameSink, FrameSource, HandlerSignal};
use crate::service::conflict::resolve_ownership;
use crate::service::gateway::Gateway;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

/// Reason sent to the client when ownership could not be established.
pub const LOGIN_UNAVAILABLE: &str = "login temporarily unavailable";

/// Protocol state of a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(UserId),
    Closed,
}

enum Flow {
    Continue,
    Exit,
}

pub(crate) struct Session {
    gateway: Arc<Gateway>,
    record: Arc<ConnectionRecord>,
    /// Key the record is currently stored under.
    key: ConnectionKey,
    state: SessionState,
}

impl Session {
    pub(crate) fn new(gateway: Arc<Gateway>, record: Arc<ConnectionRecord>, key: ConnectionKey) -> Self {
        Self {
            gateway,
            record,
            key,
            state: SessionState::Unauthenticated,
        }
    }

    /// Run the read loop to completion, then tear the connection down.
    pub(crate) async fn run<S: FrameSource>(mut self, mut source: S) {
        loop {
            let received = tokio::select! {
                biased;
                () = self.record.closed() => Err(TransportError::ClosedLocally),
                frame = source.recv_frame() => frame,
            };

            let frame = match received {
                Ok(frame) => frame,
                Err(e) if e.is_normal_closure() => {
                    info!(key = %self.key, reason = %e, "Connection closed, read loop exiting");
                    break;
                }
                Err(e) => {
                    error!(key = %self.key, error = %e, "Receive failed, read loop exiting");
                    break;
                }
            };

            if frame.is_empty() {
                continue;
            }

            let request = match self.gateway.codec.decode(&frame) {
                Ok(request) => request,
                Err(e) => {
                    warn!(key = %self.key, error = %e, "Dropping malformed frame");
                    continue;
                }
            };

            let flow = match self.state {
                SessionState::Unauthenticated => self.dispatch_unauthenticated(request).await,
                SessionState::Authenticated(user) => self.dispatch_authenticated(user, request).await,
                SessionState::Closed => Flow::Exit,
            };

            if matches!(flow, Flow::Exit) {
                break;
            }
        }

        self.teardown().await;
    }

    async fn dispatch_unauthenticated(&mut self, request: Request) -> Flow {
        match request.kind() {
            PayloadKind::Login => self.login(request).await,
            PayloadKind::Signup => {
                let reply = self.gateway.signup.signup(&request).await;
                if let Err(e) = &reply.outcome {
                    warn!(key = %self.key, error = %e, "Signup failed");
                }
                self.respond(&reply.response).await;
                Flow::Continue
            }
            PayloadKind::Logout => {
                info!(key = %self.key, "Logout before login");
                Flow::Exit
            }
            PayloadKind::Other => {
                warn!(key = %self.key, "Refusing request on unauthenticated connection");
                self.respond(&Response::refused()).await;
                Flow::Continue
            }
        }
    }

    async fn login(&mut self, request: Request) -> Flow {
        let reply = self.gateway.login.login(&request).await;

        let user = match reply.outcome {
            Ok(user) => user,
            Err(e) => {
                warn!(key = %self.key, error = %e, "Login rejected");
                self.respond(&reply.response).await;
                return Flow::Continue;
            }
        };

        match resolve_ownership(&self.gateway, user, &self.key, &self.record).await {
            Ok(()) => {
                self.key = ConnectionKey::from_user(user);
                self.record.mark_authenticated();
                self.state = SessionState::Authenticated(user);
                info!(user_id = %user, "Login succeeded");
                self.respond(&reply.response).await;
            }
            Err(e) => {
                error!(user_id = %user, error = %e, "Login aborted, ownership unresolved");
                self.respond(&Response::login(false, user.get(), LOGIN_UNAVAILABLE))
                    .await;
            }
        }

        Flow::Continue
    }

    async fn dispatch_authenticated(&mut self, user: UserId, request: Request) -> Flow {
        match self.gateway.messages.handle(user, request).await {
            Ok(HandlerSignal::Continue) => Flow::Continue,
            Ok(HandlerSignal::Close) => {
                info!(user_id = %user, "Handler requested close");
                Flow::Exit
            }
            Err(e) => {
                error!(user_id = %user, error = %e, "Message handling failed");
                Flow::Continue
            }
        }
    }

    async fn respond(&self, response: &Response) {
        let frame = match self.gateway.codec.encode(response) {
            Ok(frame) => frame,
            Err(e) => {
                error!(key = %self.key, error = %e, "Failed to encode response");
                return;
            }
        };

        if let Err(e) = self.record.outbound().enqueue(frame).await {
            debug!(key = %self.key, error = %e, "Response dropped");
        }
    }

    async fn teardown(mut self) {
        let owned = self
            .gateway
            .connections
            .remove_if_same(self.key.as_str(), &self.record);
        // The write loop drains what is already queued, then closes the sink.
        self.record.outbound().close();

        if let SessionState::Authenticated(user) = self.state {
            if owned {
                if let Err(e) = self
                    .gateway
                    .registry
                    .unregister(user, &self.gateway.container_id)
                    .await
                {
                    warn!(user_id = %user, error = %e, "Failed to unregister connection");
                }
            } else {
                debug!(user_id = %user, "Connection was superseded, leaving claim in place");
            }
        }

        self.state = SessionState::Closed;
        info!(key = %self.key, endpoint = %self.record.endpoint(), "Connection torn down");
    }
}

/// Drain the outbound queue to the socket until the queue is closed.
///
/// Frames still queued when the socket was stopped from outside (a stop
/// request, an eviction) are discarded.
pub(crate) async fn write_loop<K: FrameSink>(
    record: Arc<ConnectionRecord>,
    mut outbound: mpsc::Receiver<Vec<u8>>,
    mut sink: K,
) {
    while let Some(frame) = outbound.recv().await {
        if record.is_stopped() {
            debug!("Socket stopped, discarding queued frame");
            continue;
        }
        if let Err(e) = sink.send_frame(frame).await {
            error!(error = %e, "Failed to write frame");
        }
    }

    if let Err(e) = sink.close().await {
        debug!(error = %e, "Socket close failed");
    }
    debug!("Write loop exited");
}
