// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Redis source and keyspace feed using Docker containers.

mod common;

#[cfg(feature = "redis")]
mod redis_tests {
    use cfgweave::adapters::watchers::{RedisWatchFeed, StreamWatchCoordinator};
    use cfgweave::adapters::RedisSource;
    use cfgweave::ports::{channel_callback, spawn_coordinator, ConfigSource};
    use cfgweave::prelude::*;
    use redis::AsyncCommands;
    use std::sync::Arc;
    use std::time::Duration;
    use testcontainers::{core::WaitFor, runners::AsyncRunner, GenericImage, ImageExt};
    use tokio_util::sync::CancellationToken;

    use crate::common as docker_helpers;

    const KEY: &str = "config:app.json";

    /// Starts a Redis container seeded with a JSON document at [`KEY`].
    async fn setup_redis_test() -> Option<(testcontainers::ContainerAsync<GenericImage>, String)> {
        if !docker_helpers::is_docker_available() {
            docker_helpers::print_docker_unavailable_warning("Redis integration test");
            return None;
        }

        let redis_image = GenericImage::new("redis", "7-alpine")
            .with_exposed_port(6379.into())
            .with_wait_for(WaitFor::message_on_stdout("Ready to accept connections"));

        let container = redis_image.start().await.ok()?;
        let port = container.get_host_port_ipv4(6379).await.ok()?;
        let url = format!("redis://127.0.0.1:{}", port);

        // Give Redis a moment to start up
        tokio::time::sleep(Duration::from_millis(500)).await;

        let client = redis::Client::open(url.as_str()).ok()?;
        let mut conn = client.get_multiplexed_async_connection().await.ok()?;
        conn.set::<_, _, ()>(KEY, r#"{"cache": {"ttl": "30s", "size": 128}}"#)
            .await
            .ok()?;

        Some((container, url))
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_redis_load_document() {
        let Some((_container, url)) = setup_redis_test().await else {
            return;
        };

        let source = RedisSource::open(&url, KEY).unwrap();
        let aggregator = Aggregator::new();
        aggregator.load(&[&source]).unwrap();

        assert_eq!(aggregator.get_int("cache.size"), Some(128));
        assert_eq!(
            aggregator.get_duration("cache.ttl"),
            Some(Duration::from_secs(30))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_redis_missing_key() {
        let Some((_container, url)) = setup_redis_test().await else {
            return;
        };

        let source = RedisSource::open(&url, "config:missing.json").unwrap();
        let err = source.load().unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_redis_keyspace_notification() {
        let Some((_container, url)) = setup_redis_test().await else {
            return;
        };

        let feed = RedisWatchFeed::open(&url, KEY).unwrap().enable_notifications(true);
        assert_eq!(feed.channel_pattern(), format!("__keyspace@0__:{}", KEY));

        let coordinator = Arc::new(StreamWatchCoordinator::new(feed));
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        let task = spawn_coordinator(coordinator, cancel.clone(), channel_callback(tx));

        tokio::time::sleep(Duration::from_millis(500)).await;
        let client = redis::Client::open(url.as_str()).unwrap();
        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        conn.set::<_, _, ()>(KEY, r#"{"cache": {"size": 256}}"#)
            .await
            .unwrap();

        let notice = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(notice.origin, format!("redis[{}]", KEY));
        assert_eq!(notice.keys, vec![ConfigKey::from(KEY)]);

        cancel.cancel();
        assert!(task.await.unwrap().is_ok());
    }
}
