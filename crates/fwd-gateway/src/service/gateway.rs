//! The gateway service: accepts connections and exposes the entry points
//! for addressing them by user identity.

use crate::domain::config::GatewayConfig;
use crate::domain::connection::ConnectionRecord;
use crate::domain::error::SendError;
use crate::domain::identity::{ConnectionKey, ContainerId, UserId};
use crate::domain::registry::ConnectionRegistry;
use crate::ports::inbound::GatewayApi;
use crate::ports::outbound::{
    DirectivePublisher, DistributedRegistry, EnvelopeCodec, FrameSink, FrameSource,
    LoginHandler, MessageHandler, SignupHandler,
};
use crate::service::session::{write_loop, Session};
use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, info_span, warn, Instrument};
use uuid::Uuid;

/// Collaborators the gateway is wired with.
pub struct GatewayDependencies {
    /// Local connection map (shared with handlers that deliver to peers)
    pub connections: Arc<ConnectionRegistry>,
    /// Shared user-to-container ownership map
    pub registry: Arc<dyn DistributedRegistry>,
    /// Channel for directives to other instances
    pub publisher: Arc<dyn DirectivePublisher>,
    pub codec: Arc<dyn EnvelopeCodec>,
    pub login: Arc<dyn LoginHandler>,
    pub signup: Arc<dyn SignupHandler>,
    pub messages: Arc<dyn MessageHandler>,
}

/// Gateway service state
pub struct Gateway {
    pub(crate) container_id: ContainerId,
    outbound_capacity: usize,
    pub(crate) connections: Arc<ConnectionRegistry>,
    pub(crate) registry: Arc<dyn DistributedRegistry>,
    pub(crate) publisher: Arc<dyn DirectivePublisher>,
    pub(crate) codec: Arc<dyn EnvelopeCodec>,
    pub(crate) login: Arc<dyn LoginHandler>,
    pub(crate) signup: Arc<dyn SignupHandler>,
    pub(crate) messages: Arc<dyn MessageHandler>,
    /// Read and write loops of every accepted connection
    tasks: TaskTracker,
}

/// Join handles of the two tasks serving one connection.
pub struct ConnectionTasks {
    pub id: Uuid,
    pub reader: JoinHandle<()>,
    pub writer: JoinHandle<()>,
}

impl ConnectionTasks {
    /// Wait for both loops to finish.
    pub async fn join(self) {
        if let Err(e) = self.reader.await {
            warn!(conn_id = %self.id, error = %e, "Read loop task failed");
        }
        if let Err(e) = self.writer.await {
            warn!(conn_id = %self.id, error = %e, "Write loop task failed");
        }
    }
}

impl Gateway {
    /// Create a gateway for this instance.
    pub fn new(config: &GatewayConfig, deps: GatewayDependencies) -> Arc<Self> {
        Arc::new(Self {
            container_id: config.container_id.clone(),
            outbound_capacity: config.outbound_capacity,
            connections: deps.connections,
            registry: deps.registry,
            publisher: deps.publisher,
            codec: deps.codec,
            login: deps.login,
            signup: deps.signup,
            messages: deps.messages,
            tasks: TaskTracker::new(),
        })
    }

    #[must_use]
    pub fn container_id(&self) -> &ContainerId {
        &self.container_id
    }

    #[must_use]
    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    /// Register a freshly accepted socket and start its read and write loops.
    ///
    /// The connection is keyed by `endpoint` until it logs in. Nothing is
    /// sent to the client.
    pub fn accept<S, K>(self: &Arc<Self>, endpoint: SocketAddr, source: S, sink: K) -> ConnectionTasks
    where
        S: FrameSource + 'static,
        K: FrameSink + 'static,
    {
        let (record, outbound) = ConnectionRecord::new(endpoint, self.outbound_capacity);
        let key = ConnectionKey::from_endpoint(endpoint);
        let id = record.id();

        if self.connections.insert(key.clone(), record.clone()).is_some() {
            warn!(conn_id = %id, key = %key, "Replaced an existing entry for this endpoint");
        }
        info!(conn_id = %id, %endpoint, "Connection established");

        let span = info_span!("connection", conn_id = %id);
        let writer = self
            .tasks
            .spawn(write_loop(record.clone(), outbound, sink).instrument(span.clone()));
        let reader = self
            .tasks
            .spawn(Session::new(self.clone(), record, key).run(source).instrument(span));

        ConnectionTasks { id, reader, writer }
    }

    /// Stop every live connection and wait until each has torn down,
    /// including its registry release.
    pub async fn close_connections(&self) {
        self.tasks.close();

        let keys = self.connections.keys();
        info!(count = keys.len(), "Closing live connections");
        for key in keys {
            if let Some(record) = self.connections.get(&key) {
                record.close_socket();
            }
        }

        self.tasks.wait().await;
        debug!("All connection tasks finished");
    }
}

#[async_trait]
impl GatewayApi for Gateway {
    async fn send_message(&self, user: UserId, frame: Vec<u8>) -> Result<(), SendError> {
        let key = user.to_string();
        let record = self
            .connections
            .get(&key)
            .ok_or(SendError::ClientNotFound(key))?;

        record.outbound().enqueue(frame).await
    }

    fn stop_client(&self, user: UserId) -> bool {
        let Some(record) = self.connections.get(&user.to_string()) else {
            debug!(user_id = %user, "Stop requested for unknown client");
            return false;
        };

        if record.close_socket() {
            info!(user_id = %user, conn_id = %record.id(), "Client stopped");
        }
        true
    }
}
