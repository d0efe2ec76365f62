//! Redis-backed counter store.
//!
//! The check-and-decrement runs as a server-side Lua script, so the
//! GET/compare/DECR triple executes as one indivisible step no matter how many
//! clients race on the same key.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client, Script};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::counter::{CounterStore, Decrement};

/// GET/compare/DECR as a single server-side step. Absent keys count as zero.
const TRY_DECREMENT: &str = r"
local v = tonumber(redis.call('GET', KEYS[1]))
if v and v > 0 then
  redis.call('DECR', KEYS[1])
  return 1
end
return 0
";

/// Redis-backed [`CounterStore`].
///
/// Uses a managed connection that reconnects on failure; individual command
/// errors surface as [`StoreError::Unavailable`] and are retried by the
/// worker's bounded budget, never inside the store.
pub struct RedisStore {
    conn: ConnectionManager,
    decrement: Script,
}

impl RedisStore {
    /// Connects to the given Redis URL (e.g. `redis://127.0.0.1/`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;
        Ok(Self {
            conn,
            decrement: Script::new(TRY_DECREMENT),
        })
    }
}

fn unavailable(err: redis::RedisError) -> StoreError {
    StoreError::Unavailable {
        detail: err.to_string(),
    }
}

#[async_trait]
impl CounterStore for RedisStore {
    async fn initialize(&self, key: &str, quantity: u32) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.set::<_, _, ()>(key, quantity).await.map_err(unavailable)
    }

    async fn read(&self, key: &str) -> Result<Option<u32>, StoreError> {
        let mut conn = self.conn.clone();
        conn.get(key).await.map_err(unavailable)
    }

    async fn try_decrement(&self, key: &str) -> Result<Decrement, StoreError> {
        let mut conn = self.conn.clone();
        let applied: i64 = self
            .decrement
            .key(key)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;
        Ok(if applied == 1 {
            Decrement::Applied
        } else {
            Decrement::Exhausted
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "redis://127.0.0.1/";

    // Requires a local Redis server; run with `cargo test --features redis -- --ignored`.
    #[tokio::test]
    #[ignore]
    async fn atomic_decrement_against_live_server() {
        let store = RedisStore::connect(URL).await.unwrap();
        store.initialize("reservq:test:seat", 2).await.unwrap();

        assert_eq!(
            store.try_decrement("reservq:test:seat").await.unwrap(),
            Decrement::Applied
        );
        assert_eq!(
            store.try_decrement("reservq:test:seat").await.unwrap(),
            Decrement::Applied
        );
        assert_eq!(
            store.try_decrement("reservq:test:seat").await.unwrap(),
            Decrement::Exhausted
        );
        assert_eq!(store.read("reservq:test:seat").await.unwrap(), Some(0));
    }
}
