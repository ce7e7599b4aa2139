//! Listener for directives addressed to this instance.

use crate::domain::identity::UserId;
use crate::ports::inbound::GatewayApi;
use crate::service::gateway::Gateway;
use shared_bus::{Directive, DirectiveSource};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Apply directives from `source` until it ends or `shutdown` fires.
pub async fn run_directive_listener<S>(gateway: Arc<Gateway>, mut source: S, shutdown: CancellationToken)
where
    S: DirectiveSource,
{
    info!(topic = source.topic(), "Directive listener started");

    loop {
        let payload = tokio::select! {
            () = shutdown.cancelled() => {
                debug!("Directive listener shutting down");
                break;
            }
            payload = source.next_payload() => payload,
        };

        let Some(payload) = payload else {
            warn!(topic = source.topic(), "Directive source closed");
            break;
        };

        match Directive::parse(&payload) {
            Ok(Directive::DeleteUser(id)) => {
                let user = UserId::new(id);
                let found = gateway.stop_client(user);
                info!(user_id = %user, found, "Applied DELETE USER directive");
            }
            Err(e) => warn!(error = %e, "Ignoring malformed directive"),
        }
    }
}

/// Spawn [`run_directive_listener`] on the runtime.
pub fn spawn_directive_listener<S>(
    gateway: Arc<Gateway>,
    source: S,
    shutdown: CancellationToken,
) -> JoinHandle<()>
where
    S: DirectiveSource + 'static,
{
    tokio::spawn(run_directive_listener(gateway, source, shutdown))
}
