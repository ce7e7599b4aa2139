//! Redis-backed distributed registry.
//!
//! One string key per user, `gateway:conn:<user>`, holding the owning
//! container identity. Unregister is a compare-and-delete script so an
//! instance can never remove a claim that another instance has taken over.

use crate::domain::error::RegistryError;
use crate::domain::identity::{ContainerId, UserId};
use crate::ports::outbound::DistributedRegistry;
use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tracing::{debug, info};

/// Key prefix for ownership entries.
pub const KEY_PREFIX: &str = "gateway:conn:";

const COMPARE_AND_DELETE: &str = r"
if redis.call('GET', KEYS[1]) == ARGV[1] then
    return redis.call('DEL', KEYS[1])
else
    return 0
end
";

pub struct RedisConnectionRegistry {
    conn: MultiplexedConnection,
    unregister_script: redis::Script,
}

impl RedisConnectionRegistry {
    /// Connect to the Redis server at `url`.
    pub async fn connect(url: &str) -> Result<Self, RegistryError> {
        let client = redis::Client::open(url)?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(url, "Connected to Redis registry");
        Ok(Self::with_connection(conn))
    }

    /// Wrap an existing multiplexed connection.
    #[must_use]
    pub fn with_connection(conn: MultiplexedConnection) -> Self {
        Self {
            conn,
            unregister_script: redis::Script::new(COMPARE_AND_DELETE),
        }
    }
}

/// Redis key holding the owner of `user`.
#[must_use]
pub fn owner_key(user: UserId) -> String {
    format!("{KEY_PREFIX}{user}")
}

#[async_trait]
impl DistributedRegistry for RedisConnectionRegistry {
    async fn register(&self, user: UserId, container: &ContainerId) -> Result<(), RegistryError> {
        let mut conn = self.conn.clone();
        let _: () = conn.set(owner_key(user), container.as_str()).await?;
        debug!(user_id = %user, container = %container, "Registered owner");
        Ok(())
    }

    async fn unregister(&self, user: UserId, container: &ContainerId) -> Result<(), RegistryError> {
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .unregister_script
            .key(owner_key(user))
            .arg(container.as_str())
            .invoke_async(&mut conn)
            .await?;
        debug!(user_id = %user, container = %container, removed, "Unregistered owner");
        Ok(())
    }

    async fn owner(&self, user: UserId) -> Result<Option<ContainerId>, RegistryError> {
        let mut conn = self.conn.clone();
        let owner: Option<String> = conn.get(owner_key(user)).await?;
        Ok(owner.filter(|o| !o.is_empty()).map(ContainerId::new))
    }
}
