//! Redis connection management (see `spec.md` §10.5, grounded on the base
//! crate's `database/mod.rs` wrapper around a connection pool).

use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::error::Result;

/// Thin wrapper around a multiplexed, auto-reconnecting Redis connection.
///
/// Inside one request, commands are issued as a single pipelined batch and
/// executed sequentially server-side; the batch is never wrapped in
/// `MULTI`/`EXEC` (`spec.md` §9) because none of this engine's operations
/// need cross-key atomicity, and `MULTI` would block the mid-batch
/// `ZINTERSTORE`/`ZUNIONSTORE` reads the query engine relies on.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Lazily establish a connection manager against `url`.
    pub async fn connect(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let manager = client.get_connection_manager().await?;
        Ok(Self { manager })
    }

    /// Wrap an already-constructed connection manager, e.g. one shared with
    /// other subsystems or built for a test fixture's ephemeral container.
    pub fn from_manager(manager: ConnectionManager) -> Self {
        Self { manager }
    }

    /// `PING` the server; surfaces a `Redis` error on failure.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: String = redis::cmd("PING").query_async(&mut conn).await?;
        Ok(())
    }

    /// A fresh, empty pipeline for the caller to build up and execute via
    /// `execute_pipeline`.
    pub fn pipeline(&self) -> redis::Pipeline {
        redis::pipe()
    }

    /// Execute a batch, discarding replies the caller doesn't need.
    pub async fn execute_pipeline(&self, pipeline: &redis::Pipeline) -> Result<()> {
        let mut conn = self.manager.clone();
        pipeline.query_async::<()>(&mut conn).await?;
        Ok(())
    }

    /// Execute a batch and collect replies as a heterogeneous Redis value.
    pub async fn execute_pipeline_values(&self, pipeline: &redis::Pipeline) -> Result<Vec<redis::Value>> {
        let mut conn = self.manager.clone();
        let values: Vec<redis::Value> = pipeline.query_async(&mut conn).await?;
        Ok(values)
    }

    pub async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.smembers(key).await?)
    }

    pub async fn hget(&self, key: &str, field: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.hget(key, field).await?)
    }

    pub async fn hmget(&self, key: &str, fields: &[String]) -> Result<Vec<Option<String>>> {
        if fields.is_empty() {
            return Ok(Vec::new());
        }
        let mut conn = self.manager.clone();
        Ok(conn.hget(key, fields).await?)
    }

    pub async fn zrange(&self, key: &str, start: isize, stop: isize) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.zrange(key, start, stop).await?)
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.manager.clone();
        Ok(conn.get(key).await?)
    }

    pub async fn setex(&self, key: &str, ttl_secs: u64, value: &str) -> Result<()> {
        let mut conn = self.manager.clone();
        // Argument order is (key, ttl, value) -- a historical revision of the
        // system this crate is modeled on swapped ttl and value by mistake.
        let _: () = conn.set_ex(key, value, ttl_secs).await?;
        Ok(())
    }

    /// `ZINTERSTORE dest NUMKEYS keys... AGGREGATE MIN` -- used for word-prefix
    /// intersection and facet "and" combination, where a lower stored score
    /// (the better logical score) should win over a higher one on either side.
    pub async fn zinterstore_min(&self, dest: &str, keys: &[String]) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.zinterstore_min(dest, keys).await?;
        Ok(())
    }

    /// `ZUNIONSTORE dest NUMKEYS keys... AGGREGATE MIN`.
    pub async fn zunionstore_min(&self, dest: &str, keys: &[String]) -> Result<()> {
        let mut conn = self.manager.clone();
        let _: () = conn.zunionstore_min(dest, keys).await?;
        Ok(())
    }

    pub async fn del(&self, keys: &[String]) -> Result<()> {
        if keys.is_empty() {
            return Ok(());
        }
        let mut conn = self.manager.clone();
        let _: () = conn.del(keys).await?;
        Ok(())
    }

    pub async fn scan_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut conn = self.manager.clone();
        let mut cursor: u64 = 0;
        let mut out = Vec::new();
        loop {
            let (next_cursor, batch): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(pattern)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await?;
            out.extend(batch);
            if next_cursor == 0 {
                break;
            }
            cursor = next_cursor;
        }
        Ok(out)
    }
}
