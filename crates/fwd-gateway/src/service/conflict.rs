//! Ownership conflict resolution, run when a login succeeds.
//!
//! 1. Evict any local connection already registered for the user.
//! 2. Look up the current owner in the distributed registry.
//! 3. If another container owns the user, revoke its claim and send it a
//!    `DELETE USER` directive.
//! 4. Claim the user for this container.
//! 5. Move the new connection under the user's key.
//!
//! Failures in steps 2 to 4 abort the attempt before anything is committed.
//! Step 1 is best-effort.

use crate::domain::connection::ConnectionRecord;
use crate::domain::error::CoordinationError;
use crate::domain::identity::{ConnectionKey, UserId};
use crate::service::gateway::Gateway;
use shared_bus::Directive;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub(crate) async fn resolve_ownership(
    gateway: &Gateway,
    user: UserId,
    provisional: &ConnectionKey,
    record: &Arc<ConnectionRecord>,
) -> Result<(), CoordinationError> {
    let identity = ConnectionKey::from_user(user);
    let container = &gateway.container_id;

    if let Some(stale) = gateway.connections.evict(identity.as_str()) {
        info!(user_id = %user, stale_conn = %stale.id(), "Closed existing local connection");
        if let Err(e) = gateway.registry.unregister(user, container).await {
            warn!(user_id = %user, error = %e, "Local unregister failed, continuing");
        }
    }

    let owner = gateway
        .registry
        .owner(user)
        .await
        .map_err(|source| CoordinationError::OwnerLookup { user, source })?;
    debug!(user_id = %user, owner = ?owner, "Current owner");

    if let Some(owner) = owner.filter(|owner| owner != container) {
        info!(user_id = %user, container = %owner, "User is connected to another container");

        gateway
            .registry
            .unregister(user, &owner)
            .await
            .map_err(|source| CoordinationError::RevokeRemote {
                user,
                owner: owner.clone(),
                source,
            })?;

        let directive = Directive::DeleteUser(user.get());
        gateway
            .publisher
            .publish(&directive.to_bytes(), owner.as_str())
            .await
            .map_err(|source| CoordinationError::Notify {
                user,
                owner: owner.clone(),
                source,
            })?;
    }

    gateway
        .registry
        .register(user, container)
        .await
        .map_err(|source| CoordinationError::Claim { user, source })?;

    if let Some(displaced) = gateway
        .connections
        .commit(provisional.as_str(), identity, record.clone())
    {
        warn!(user_id = %user, displaced_conn = %displaced.id(), "Displaced a concurrent login");
    }

    info!(user_id = %user, container = %container, "Connection registered");
    Ok(())
}
