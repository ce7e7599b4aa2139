//! # Gateway Runtime
//!
//! Wires one gateway instance together and runs it.
//!
//! ## Backends
//!
//! - `REDIS_URL` set: [`RedisConnectionRegistry`] and [`RedisDirectiveBus`],
//!   shared by every instance pointed at the same server.
//! - `REDIS_URL` unset: [`InMemoryConnectionRegistry`] and
//!   [`InMemoryDirectiveBus`], for a single instance.
//!
//! ## Startup Sequence
//!
//! 1. Validate configuration
//! 2. Connect the registry and directive backends
//! 3. Subscribe to this instance's directive topic
//! 4. Bind the WebSocket listener
//! 5. Spawn the listener and directive tasks

#![warn(clippy::all)]
#![deny(unsafe_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use fwd_gateway::{
    spawn_directive_listener, BincodeCodec, ConnectionRegistry, DistributedRegistry,
    ForwardingHandler, Gateway, GatewayConfig, GatewayDependencies, GatewayError,
    InMemoryAccountStore, InMemoryConnectionRegistry, RedisConnectionRegistry, RedisDirectiveBus,
    WebSocketListener,
};
use shared_bus::{DirectivePublisher, InMemoryDirectiveBus};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long shutdown waits for background tasks.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Which registry/directive backend pair is in use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    InMemory,
    Redis(String),
}

impl Backend {
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        match &config.redis_url {
            Some(url) => Self::Redis(url.clone()),
            None => Self::InMemory,
        }
    }
}

/// A running gateway instance.
pub struct GatewayRuntime {
    gateway: Arc<Gateway>,
    backend: Backend,
    local_addr: SocketAddr,
    shutdown: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl GatewayRuntime {
    /// Start serving with `config`.
    pub async fn start(config: GatewayConfig) -> Result<Self, GatewayError> {
        config.validate()?;

        let backend = Backend::from_config(&config);
        let topic = config.container_id.as_str().to_string();
        let shutdown = CancellationToken::new();
        let mut tasks = Vec::with_capacity(2);

        info!(
            container = %config.container_id,
            backend = ?backend,
            "Starting gateway runtime"
        );

        let gateway = match &backend {
            Backend::Redis(url) => {
                let registry = Arc::new(RedisConnectionRegistry::connect(url).await?);
                let bus = RedisDirectiveBus::connect(url).await.map_err(directive_error)?;
                let subscription = bus.subscribe(&topic).await.map_err(directive_error)?;

                let gateway = build_gateway(&config, registry, Arc::new(bus));
                tasks.push(spawn_directive_listener(
                    gateway.clone(),
                    subscription,
                    shutdown.clone(),
                ));
                gateway
            }
            Backend::InMemory => {
                let bus = InMemoryDirectiveBus::new();
                let subscription = bus.subscribe(&topic);

                let gateway = build_gateway(
                    &config,
                    Arc::new(InMemoryConnectionRegistry::new()),
                    Arc::new(bus),
                );
                tasks.push(spawn_directive_listener(
                    gateway.clone(),
                    subscription,
                    shutdown.clone(),
                ));
                gateway
            }
        };

        let listener = WebSocketListener::bind(&config, gateway.clone()).await?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Bind(e.to_string()))?;
        tasks.push(tokio::spawn(listener.run(shutdown.clone())));

        info!(addr = %local_addr, "Gateway runtime ready");

        Ok(Self {
            gateway,
            backend,
            local_addr,
            shutdown,
            tasks,
        })
    }

    pub fn gateway(&self) -> &Arc<Gateway> {
        &self.gateway
    }

    pub fn backend(&self) -> &Backend {
        &self.backend
    }

    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, close every live connection and wait until each has
    /// released its registry claim.
    pub async fn shutdown(self) {
        info!("Initiating graceful shutdown...");
        self.shutdown.cancel();

        for task in self.tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, task).await.is_err() {
                warn!("Background task did not stop within the grace period");
            }
        }

        if tokio::time::timeout(SHUTDOWN_GRACE, self.gateway.close_connections())
            .await
            .is_err()
        {
            warn!("Connections did not tear down within the grace period");
        }

        info!("Gateway runtime stopped");
    }
}

fn build_gateway(
    config: &GatewayConfig,
    registry: Arc<dyn DistributedRegistry>,
    publisher: Arc<dyn DirectivePublisher>,
) -> Arc<Gateway> {
    let connections = Arc::new(ConnectionRegistry::new());
    let codec = Arc::new(BincodeCodec::new());
    let accounts = Arc::new(InMemoryAccountStore::new());
    let messages = Arc::new(ForwardingHandler::new(connections.clone(), codec.clone()));

    Gateway::new(
        config,
        GatewayDependencies {
            connections,
            registry,
            publisher,
            codec,
            login: accounts.clone(),
            signup: accounts,
            messages,
        },
    )
}

fn directive_error(e: impl std::fmt::Display) -> GatewayError {
    GatewayError::Directive(e.to_string())
}
