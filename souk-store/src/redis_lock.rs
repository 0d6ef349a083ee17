use async_trait::async_trait;
use souk_core::lock::{LeaseToken, LockError, SlotLock};
use std::time::Duration;
use tracing::debug;

/// Redis-backed slot lease. Acquisition is a single `SET NX EX` with a
/// random fencing token as the value; release runs a compare-and-delete
/// Lua script, so only the holder that set the key can remove it. Expiry
/// is left entirely to Redis.
#[derive(Clone)]
pub struct RedisSlotLock {
    client: redis::Client,
}

impl RedisSlotLock {
    pub fn new(connection_string: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(connection_string)?;
        Ok(Self { client })
    }
}

const RELEASE_SCRIPT: &str = r#"
    if redis.call("GET", KEYS[1]) == ARGV[1] then
        return redis.call("DEL", KEYS[1])
    else
        return 0
    end
"#;

#[async_trait]
impl SlotLock for RedisSlotLock {
    async fn acquire(&self, key: &str, ttl: Duration) -> Result<Option<LeaseToken>, LockError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;
        let token = LeaseToken::generate();

        // SET NX: only set if the key does not exist. EX keeps the lease
        // self-expiring if the holder dies before releasing.
        let result: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(token.as_str())
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;

        if result.is_some() {
            debug!(key = %key, "slot lease acquired");
            Ok(Some(token))
        } else {
            Ok(None)
        }
    }

    async fn release(&self, key: &str, token: &LeaseToken) -> Result<bool, LockError> {
        let mut conn = self.client.get_multiplexed_async_connection().await?;

        // Compare-and-delete: a lease that expired and was re-acquired by
        // someone else must not be freed by the original holder.
        let script = redis::Script::new(RELEASE_SCRIPT);
        let deleted: i64 = script
            .key(key)
            .arg(token.as_str())
            .invoke_async(&mut conn)
            .await?;

        Ok(deleted == 1)
    }
}
