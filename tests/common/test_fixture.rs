//! Test fixture that manages a disposable Redis container and a built
//! [`Engine`] for integration tests.

use autocompleter::error::Result;
use autocompleter::{Engine, Settings};
use testcontainers_modules::redis::Redis;
use testcontainers_modules::testcontainers::{runners::AsyncRunner, ContainerAsync};

/// Owns a running Redis container and an [`Engine`] pointed at it under a
/// `djac.test` root namespace, so bulk teardown can scan that root safely.
pub struct TestFixture {
    pub engine: Engine,
    _container: ContainerAsync<Redis>,
}

impl TestFixture {
    pub async fn new() -> Result<Self> {
        let container = Redis::default().start().await.expect("Redis container failed to start");
        let port = container.get_host_port_ipv4(6379).await.expect("failed to get Redis port");
        let redis_url = format!("redis://127.0.0.1:{port}/");

        let engine = Engine::builder()
            .redis_url(redis_url)
            .root_namespace("djac.test")
            .global_settings(Settings { cache_timeout: 0, ..Settings::default() })
            .build()
            .await?;

        Ok(Self { engine, _container: container })
    }

    /// Same as [`new`], but with a non-zero cache TTL for cache-behavior tests.
    pub async fn with_cache(ttl_secs: u64) -> Result<Self> {
        let container = Redis::default().start().await.expect("Redis container failed to start");
        let port = container.get_host_port_ipv4(6379).await.expect("failed to get Redis port");
        let redis_url = format!("redis://127.0.0.1:{port}/");

        let engine = Engine::builder()
            .redis_url(redis_url)
            .root_namespace("djac.test")
            .global_settings(Settings { cache_timeout: ttl_secs, ..Settings::default() })
            .build()
            .await?;

        Ok(Self { engine, _container: container })
    }
}
