//! Federation constants
//!
//! This module centralizes configuration keys, defaults and bounds used by the
//! federated consumer. Keys that are passed through to per-cluster consumers
//! use the standard Kafka consumer property names.

use std::time::Duration;

// ===== Configuration Keys =====

/// Name of the cluster group to consume from
pub const CLUSTER_GROUP_CONFIG: &str = "cluster.group";

/// Environment the cluster group lives in (e.g., "prod", "staging")
pub const CLUSTER_ENVIRONMENT_CONFIG: &str = "cluster.environment";

/// Timeout for every metadata service request, in milliseconds
pub const METADATA_SERVICE_REQUEST_TIMEOUT_MS_CONFIG: &str = "metadata.service.request.timeout.ms";

/// Maximum records returned by a single federated poll
///
/// Also the key overridden in every per-cluster configuration with that
/// cluster's share of the budget.
pub const MAX_POLL_RECORDS_CONFIG: &str = "max.poll.records";

/// Selector naming the metadata service client implementation
pub const METADATA_SERVICE_CLIENT_CONFIG: &str = "metadata.service.client";

/// Selector naming the per-cluster consumer builder implementation
pub const CLUSTER_CONSUMER_BUILDER_CONFIG: &str = "cluster.consumer.builder";

/// Connection endpoint key injected into every per-cluster configuration
pub const BOOTSTRAP_SERVERS_CONFIG: &str = "bootstrap.servers";

/// Prefix for static topology cluster entries: `<prefix><name> = <bootstrap servers>`
pub const STATIC_CLUSTER_PREFIX: &str = "metadata.service.static.cluster.";

/// Prefix for static topology topic entries: `<prefix><topic> = <cluster name>`
pub const STATIC_TOPIC_PREFIX: &str = "metadata.service.static.topic.";

/// Keys only meaningful to the federation layer
///
/// These are stripped before a per-cluster librdkafka client is configured,
/// since librdkafka rejects unknown properties.
pub const FEDERATION_ONLY_CONFIGS: &[&str] = &[
    CLUSTER_GROUP_CONFIG,
    CLUSTER_ENVIRONMENT_CONFIG,
    METADATA_SERVICE_REQUEST_TIMEOUT_MS_CONFIG,
    METADATA_SERVICE_CLIENT_CONFIG,
    CLUSTER_CONSUMER_BUILDER_CONFIG,
    MAX_POLL_RECORDS_CONFIG,
];

/// Property names whose values must never be logged
pub const SENSITIVE_CONFIGS: &[&str] = &[
    "sasl.password",
    "sasl.username",
    "sasl.jaas.config",
    "ssl.key.password",
    "ssl.keystore.password",
    "ssl.truststore.password",
];

// ===== Defaults and Bounds =====

/// Default metadata service request timeout (15 seconds)
pub const DEFAULT_METADATA_SERVICE_REQUEST_TIMEOUT_MS: u64 = 15_000;

/// Minimum metadata service request timeout
pub const MIN_METADATA_SERVICE_REQUEST_TIMEOUT_MS: u64 = 1;

/// Maximum metadata service request timeout (10 minutes)
pub const MAX_METADATA_SERVICE_REQUEST_TIMEOUT_MS: u64 = 600_000;

/// Default records per federated poll (matches the Kafka consumer default)
pub const DEFAULT_MAX_POLL_RECORDS: usize = 500;

/// Minimum records per poll, for both the federated and per-cluster budgets
pub const MIN_MAX_POLL_RECORDS: usize = 1;

/// Built-in configuration-driven metadata service client
pub const STATIC_METADATA_SERVICE_CLIENT: &str = "static";

/// Built-in librdkafka per-cluster consumer builder
pub const RDKAFKA_CLUSTER_CONSUMER_BUILDER: &str = "rdkafka";

/// Default metadata service client selector
pub const DEFAULT_METADATA_SERVICE_CLIENT: &str = STATIC_METADATA_SERVICE_CLIENT;

/// Default per-cluster consumer builder selector
pub const DEFAULT_CLUSTER_CONSUMER_BUILDER: &str = RDKAFKA_CLUSTER_CONSUMER_BUILDER;

// ===== Shutdown =====

/// Upper bound for closing all per-cluster consumers (10 minutes)
///
/// Used by `close_default()` and when an assignment change tears down the
/// previous set of per-cluster consumers.
pub const CONSUMER_CLOSE_MAX_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// Thread name prefix for per-cluster shutdown tasks
pub const CLOSE_THREAD_NAME_PREFIX: &str = "federated-consumer-close-";
