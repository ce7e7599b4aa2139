//! In-process distributed registry.
//!
//! Shared between gateway instances living in the same process, which is
//! how single-node deployments and the integration suite run.

use crate::domain::error::RegistryError;
use crate::domain::identity::{ContainerId, UserId};
use crate::ports::outbound::DistributedRegistry;
use async_trait::async_trait;
use dashmap::DashMap;

#[derive(Debug, Default)]
pub struct InMemoryConnectionRegistry {
    owners: DashMap<UserId, ContainerId>,
}

impl InMemoryConnectionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.owners.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[async_trait]
impl DistributedRegistry for InMemoryConnectionRegistry {
    async fn register(&self, user: UserId, container: &ContainerId) -> Result<(), RegistryError> {
        self.owners.insert(user, container.clone());
        Ok(())
    }

    async fn unregister(&self, user: UserId, container: &ContainerId) -> Result<(), RegistryError> {
        self.owners.remove_if(&user, |_, owner| owner == container);
        Ok(())
    }

    async fn owner(&self, user: UserId) -> Result<Option<ContainerId>, RegistryError> {
        Ok(self.owners.get(&user).map(|owner| owner.value().clone()))
    }
}
