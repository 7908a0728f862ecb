//! Two-tier key-value cache (C1), backed by Redis.
//!
//! Three namespaces share identical get/set/del semantics:
//! `search:result:id:<search_id>`, `search:result:key:<fingerprint>`,
//! `search:map:<fingerprint>`. Grounded on the pack's `proerror77-Nova`
//! search service, which wraps a `redis::aio::ConnectionManager` and issues
//! raw `redis::cmd` calls rather than a higher-level typed client.

use std::time::Duration;

use redis::aio::ConnectionManager;
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

fn result_id_key(search_id: &str) -> String {
    format!("search:result:id:{search_id}")
}

fn result_fp_key(fingerprint: &str) -> String {
    format!("search:result:key:{fingerprint}")
}

fn map_key(fingerprint: &str) -> String {
    format!("search:map:{fingerprint}")
}

#[derive(Clone)]
pub struct RedisCache {
    conn: ConnectionManager,
    default_ttl: Duration,
}

impl RedisCache {
    pub fn new(conn: ConnectionManager, default_ttl: Duration) -> Self {
        Self { conn, default_ttl }
    }

    async fn get_raw(&self, key: &str) -> Result<Option<String>, CacheError> {
        let mut conn = self.conn.clone();
        let value: Option<String> =
            redis::cmd("GET").arg(key).query_async(&mut conn).await?;
        Ok(value)
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("SETEX")
            .arg(key)
            .arg(ttl.as_secs().max(1))
            .arg(value)
            .query_async(&mut conn)
            .await?;
        Ok(())
    }

    async fn del_raw(&self, key: &str) -> Result<(), CacheError> {
        let mut conn = self.conn.clone();
        let _: () = redis::cmd("DEL").arg(key).query_async(&mut conn).await?;
        Ok(())
    }

    /// Decodes a JSON-serialized value at `key`. On decode failure, deletes
    /// the corrupted entry and returns a miss rather than surfacing an
    /// error — spec §7 "Corrupt cache".
    async fn get_decoded<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        let Some(raw) = self.get_raw(key).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(err) => {
                tracing::warn!(key, error = %err, "discarding corrupt cache entry");
                self.del_raw(key).await?;
                Ok(None)
            },
        }
    }

    pub async fn get_result_by_id<T: DeserializeOwned>(
        &self,
        search_id: &str,
    ) -> Result<Option<T>, CacheError> {
        self.get_decoded(&result_id_key(search_id)).await
    }

    pub async fn get_result_by_fingerprint<T: DeserializeOwned>(
        &self,
        fingerprint: &str,
    ) -> Result<Option<T>, CacheError> {
        self.get_decoded(&result_fp_key(fingerprint)).await
    }

    pub async fn get_search_id_for_fingerprint(
        &self,
        fingerprint: &str,
    ) -> Result<Option<String>, CacheError> {
        self.get_raw(&map_key(fingerprint)).await
    }

    pub async fn set_search_id_for_fingerprint(
        &self,
        fingerprint: &str,
        search_id: &str,
        ttl: Duration,
    ) -> Result<(), CacheError> {
        self.set_raw(&map_key(fingerprint), search_id, ttl).await
    }

    /// Atomically claims the fingerprint → search_id mapping with
    /// `SET key value NX EX ttl`, returning `true` if this call won the
    /// race. A losing caller must re-read `get_search_id_for_fingerprint`
    /// to find the winner's id rather than inserting its own row (spec §8
    /// "Dedup exclusivity").
    pub async fn claim_search_id_for_fingerprint(
        &self,
        fingerprint: &str,
        search_id: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        let mut conn = self.conn.clone();
        let reply: Option<String> = redis::cmd("SET")
            .arg(map_key(fingerprint))
            .arg(search_id)
            .arg("NX")
            .arg("EX")
            .arg(ttl.as_secs().max(1))
            .query_async(&mut conn)
            .await?;
        Ok(reply.is_some())
    }

    /// Best-effort atomic write of both result keys plus the fingerprint
    /// map entry via a Redis pipeline. Failure is logged, never propagated
    /// — readers fall back to the Store on a partial write (spec §4.2).
    pub async fn set_result_and_map<T: Serialize>(
        &self,
        search_id: &str,
        fingerprint: &str,
        value: &T,
    ) {
        let ttl = self.default_ttl.as_secs().max(1);
        let serialized = match serde_json::to_string(value) {
            Ok(s) => s,
            Err(err) => {
                tracing::warn!(error = %err, "failed to serialize result for cache write");
                return;
            },
        };

        let mut conn = self.conn.clone();
        let result: Result<(), redis::RedisError> = redis::pipe()
            .cmd("SETEX")
            .arg(result_id_key(search_id))
            .arg(ttl)
            .arg(&serialized)
            .ignore()
            .cmd("SETEX")
            .arg(result_fp_key(fingerprint))
            .arg(ttl)
            .arg(&serialized)
            .ignore()
            .cmd("SETEX")
            .arg(map_key(fingerprint))
            .arg(ttl)
            .arg(search_id)
            .ignore()
            .query_async(&mut conn)
            .await;

        if let Err(err) = result {
            tracing::warn!(error = %err, "cache write failed, Store remains source of truth");
        }
    }

    pub async fn del(&self, key: &str) -> Result<(), CacheError> {
        self.del_raw(key).await
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }
}

pub async fn init_redis_connection(
    redis_url: &str,
) -> Result<ConnectionManager, redis::RedisError> {
    let client = redis::Client::open(redis_url)?;
    ConnectionManager::new(client).await
}
