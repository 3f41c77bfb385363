//! Redis-backed registry store and publisher.

use std::collections::HashMap;
use std::time::Duration;

use redis::aio::MultiplexedConnection;
use redis::AsyncCommands;
use tokio::time::timeout;

use aiverify_core::StoreError;

use crate::pubsub::{Notification, Publisher};
use crate::store::{BoxFuture, Fields, RegistryStore, StoreBatch, StoreOp, StoreResult};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Registry store over a single multiplexed Redis connection.
///
/// The connection is opened by [`RedisStore::connect`] and released by
/// [`RedisStore::disconnect`]; there is no implicit connect on first use.
#[derive(Clone)]
pub struct RedisStore {
    conn: MultiplexedConnection,
    op_timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("op_timeout", &self.op_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Open a connection to `url`.
    pub async fn connect(url: &str) -> StoreResult<Self> {
        let client = redis::Client::open(url).map_err(StoreError::backend)?;
        let conn = timeout(DEFAULT_TIMEOUT, client.get_multiplexed_async_connection())
            .await
            .map_err(|_| StoreError::backend(format!("timed out connecting to {url}")))?
            .map_err(StoreError::backend)?;
        tracing::debug!(target: "aiverify::store", url, "connected to redis");
        Ok(Self {
            conn,
            op_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Set the per-command timeout.
    pub fn with_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    /// Close the connection.
    pub fn disconnect(self) {
        drop(self.conn);
        tracing::debug!(target: "aiverify::store", "disconnected from redis");
    }

    async fn bounded<T, F>(&self, fut: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = redis::RedisResult<T>>,
    {
        match timeout(self.op_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::backend),
            Err(_) => Err(StoreError::backend("redis timeout")),
        }
    }
}

impl RegistryStore for RedisStore {
    fn name(&self) -> &'static str {
        "redis"
    }

    fn hash_set<'a>(&'a self, key: &'a str, field: &'a str, value: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let _: () = self.bounded(conn.hset(key, field, value)).await?;
            Ok(())
        })
    }

    fn hash_get<'a>(&'a self, key: &'a str, field: &'a str) -> BoxFuture<'a, StoreResult<Option<String>>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            self.bounded(conn.hget(key, field)).await
        })
    }

    fn hash_get_all<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<Fields>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let map: HashMap<String, String> = self.bounded(conn.hgetall(key)).await?;
            Ok(map.into_iter().collect())
        })
    }

    fn keys_matching<'a>(&'a self, pattern: &'a str) -> BoxFuture<'a, StoreResult<Vec<String>>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let mut keys: Vec<String> = self.bounded(conn.keys(pattern)).await?;
            keys.sort();
            Ok(keys)
        })
    }

    fn delete<'a>(&'a self, key: &'a str) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let _: () = self.bounded(conn.del(key)).await?;
            Ok(())
        })
    }

    fn execute(&self, batch: StoreBatch) -> BoxFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            if batch.is_empty() {
                return Ok(());
            }

            // MULTI/EXEC: Redis applies the whole pipeline or nothing.
            let mut pipe = redis::pipe();
            pipe.atomic();
            for op in batch.ops() {
                match op {
                    StoreOp::HashSet { key, fields } => {
                        if fields.is_empty() {
                            continue;
                        }
                        let pairs: Vec<(&str, &str)> = fields
                            .iter()
                            .map(|(f, v)| (f.as_str(), v.as_str()))
                            .collect();
                        pipe.hset_multiple(key, &pairs).ignore();
                    }
                    StoreOp::Delete { key } => {
                        pipe.del(key).ignore();
                    }
                }
            }

            let mut conn = self.conn.clone();
            let _: () = self.bounded(pipe.query_async(&mut conn)).await?;
            Ok(())
        })
    }
}

impl Publisher for RedisStore {
    fn publish<'a>(&'a self, notification: &'a Notification) -> BoxFuture<'a, StoreResult<()>> {
        Box::pin(async move {
            let mut conn = self.conn.clone();
            let _: () = self
                .bounded(conn.publish(notification.event.to_string(), notification.key.as_str()))
                .await?;
            Ok(())
        })
    }
}
