// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for source precedence: later sources win.

mod common;

use cfgweave::prelude::*;
use common::MockSource;
use std::env;

/// Helper to set and clean up environment variables
struct EnvGuard {
    keys: Vec<String>,
}

impl EnvGuard {
    fn new() -> Self {
        EnvGuard { keys: Vec::new() }
    }

    fn set(&mut self, key: &str, value: &str) {
        env::set_var(key, value);
        self.keys.push(key.to_string());
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for key in &self.keys {
            env::remove_var(key);
        }
    }
}

#[test]
fn test_later_source_overrides_scalar() {
    let aggregator = Aggregator::new();
    aggregator
        .load(&[
            &MockSource::json("defaults", r#"{"server": {"port": 80, "host": "0.0.0.0"}}"#),
            &MockSource::json("site", r#"{"server": {"port": 8080}}"#),
        ])
        .unwrap();

    assert_eq!(aggregator.get_int("server.port"), Some(8080));
    assert_eq!(aggregator.get_string("server.host").as_deref(), Some("0.0.0.0"));
}

#[test]
fn test_order_is_the_only_precedence() {
    let a = MockSource::json("a", r#"{"key": "from-a"}"#);
    let b = MockSource::json("b", r#"{"key": "from-b"}"#);

    let aggregator = Aggregator::new();
    aggregator.load(&[&a, &b]).unwrap();
    assert_eq!(aggregator.get_string("key").as_deref(), Some("from-b"));

    aggregator.load(&[&b, &a]).unwrap();
    assert_eq!(aggregator.get_string("key").as_deref(), Some("from-a"));
}

#[test]
fn test_scalar_replaces_map_and_back() {
    let aggregator = Aggregator::new();
    aggregator
        .load(&[
            &MockSource::json("one", r#"{"db": {"host": "a", "port": 1}}"#),
            &MockSource::json("two", r#"{"db": "sqlite://memory"}"#),
        ])
        .unwrap();
    assert_eq!(aggregator.get_string("db").as_deref(), Some("sqlite://memory"));
    assert!(aggregator.get("db.host").is_none());

    aggregator
        .load(&[
            &MockSource::json("two", r#"{"db": "sqlite://memory"}"#),
            &MockSource::json("one", r#"{"db": {"host": "a"}}"#),
        ])
        .unwrap();
    assert_eq!(aggregator.get_string("db.host").as_deref(), Some("a"));
}

#[test]
fn test_lists_are_replaced_not_appended() {
    let aggregator = Aggregator::new();
    aggregator
        .load(&[
            &MockSource::json("base", r#"{"peers": ["a", "b", "c"]}"#),
            &MockSource::json("site", r#"{"peers": ["z"]}"#),
        ])
        .unwrap();

    let peers = aggregator.get("peers").unwrap();
    assert_eq!(peers.as_list().unwrap(), &[Value::from("z")]);
}

#[test]
#[cfg(all(feature = "env", feature = "yaml"))]
fn test_env_over_yaml() {
    use cfgweave::adapters::EnvSource;

    let yaml = MockSource::new(
        "base.yaml",
        "yaml",
        "database:\n  host: yaml-host\n  port: 5432\n",
    );
    let env = EnvSource::new()
        .with_prefix("APP_")
        .strip_prefix(true)
        .with_environ(|| vec!["APP_DATABASE__HOST=env-host".to_string()]);

    let aggregator = Aggregator::new();
    aggregator.load(&[&yaml, &env]).unwrap();

    assert_eq!(aggregator.get_string("database.host").as_deref(), Some("env-host"));
    assert_eq!(aggregator.get_int("database.port"), Some(5432));
}

#[test]
#[cfg(feature = "env")]
fn test_process_environment_is_read() {
    use cfgweave::adapters::EnvSource;

    let mut guard = EnvGuard::new();
    guard.set("CFGWEAVE_PRECEDENCE_TEST__LEVEL", "warn");
    guard.set("CFGWEAVE_PRECEDENCE_TEST__RETRIES", "3");

    let aggregator = Aggregator::new();
    aggregator
        .load(&[
            &MockSource::json("defaults", r#"{"level": "info", "retries": 1, "color": true}"#),
            &EnvSource::new()
                .with_prefix("CFGWEAVE_PRECEDENCE_TEST__")
                .strip_prefix(true),
        ])
        .unwrap();

    assert_eq!(aggregator.get_string("level").as_deref(), Some("warn"));
    assert_eq!(aggregator.get_int("retries"), Some(3));
    assert_eq!(aggregator.get_bool("color"), Some(true));
}

#[test]
fn test_placeholders_resolve_after_merge() {
    let aggregator = Aggregator::builder()
        .with_lookup(|name| (name == "PORT").then(|| "9090".to_string()))
        .build()
        .unwrap();

    aggregator
        .load(&[
            &MockSource::json("base", r#"{"listen": "0.0.0.0:${env.PORT|80}", "admin": "${oops"}"#),
            &MockSource::json("site", r#"{"admin": "127.0.0.1:${env.ADMIN_PORT|81}"}"#),
        ])
        .unwrap();

    assert_eq!(aggregator.get_string("listen").as_deref(), Some("0.0.0.0:9090"));
    assert_eq!(aggregator.get_string("admin").as_deref(), Some("127.0.0.1:81"));
}

#[test]
fn test_overridden_required_placeholder_does_not_fail() {
    let aggregator = Aggregator::builder()
        .with_lookup(|_| None)
        .with_strict_placeholders()
        .build()
        .unwrap();

    aggregator
        .load(&[
            &MockSource::json("defaults", r#"{"db": {"password": "${env.DB_PASSWORD}"}}"#),
            &MockSource::json("override", r#"{"db": {"password": "hunter2"}}"#),
        ])
        .unwrap();

    assert_eq!(aggregator.get_string("db.password").as_deref(), Some("hunter2"));
}
