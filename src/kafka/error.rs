//! Federation error types
//!
//! `FederationError` is what callers of the federated consumer see. The two
//! collaborator boundaries get their own error types so that a metadata
//! service failure can always be told apart from an invalid assignment:
//! - `MetadataServiceError` for the metadata service client
//! - `ConsumerError` for per-cluster consumers

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use super::federation::Operation;
use super::types::{ClientId, ClusterGroupDescriptor, TopicPartition};

/// Errors raised by a metadata service client
#[derive(Error, Debug)]
pub enum MetadataServiceError {
    /// The service could not be reached
    #[error("Metadata service unavailable: {0}")]
    Unavailable(String),

    /// The request did not complete within its timeout
    #[error("Metadata service request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// The service answered with an error
    #[error("Metadata service rejected request: {0}")]
    Rejected(String),

    /// The client id was never registered (or has expired)
    #[error("Unknown federated client {0}")]
    UnknownClient(ClientId),

    /// The client was used after `close()`
    #[error("Metadata service client is closed")]
    Closed,
}

/// Errors raised by a per-cluster consumer
#[derive(Error, Debug)]
pub enum ConsumerError {
    /// Error from librdkafka
    #[error("Kafka client error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Invalid per-cluster configuration
    #[error("Invalid consumer configuration: {0}")]
    Config(String),

    /// The consumer was used after `close()`
    #[error("Consumer is closed")]
    Closed,

    /// The consumer panicked while running a call
    #[error("Consumer panicked: {0}")]
    Panicked(String),

    /// Any other failure reported by a custom consumer implementation
    #[error("{0}")]
    Other(String),
}

/// A shutdown task that had not finished when the close deadline passed
#[derive(Debug, Clone)]
pub struct StuckShutdown {
    pub cluster: String,
    pub thread_name: String,
    pub thread_id: String,
    pub elapsed: Duration,
}

impl fmt::Display for StuckShutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (thread {} {}, running {}ms)",
            self.cluster,
            self.thread_name,
            self.thread_id,
            self.elapsed.as_millis()
        )
    }
}

/// A per-cluster consumer whose close call returned an error
#[derive(Debug)]
pub struct ShutdownFailure {
    pub cluster: String,
    pub error: ConsumerError,
}

impl fmt::Display for ShutdownFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.cluster, self.error)
    }
}

/// Errors surfaced by the federated consumer
#[derive(Error, Debug)]
pub enum FederationError {
    /// Malformed argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Partitions not owned by any cluster in the group
    #[error("Cannot assign nonexistent partitions: [{}]", join(.0))]
    UnresolvedPartitions(Vec<TopicPartition>),

    /// The metadata service failed; never retried internally
    #[error("Metadata service error while {context}: {source}")]
    MetadataService {
        context: String,
        #[source]
        source: MetadataServiceError,
    },

    /// Two clusters returned records for the same partition
    #[error(
        "Duplicate topic partition {} exists in clusters {} and {} in group {}",
        .partition,
        .first_cluster,
        .second_cluster,
        .group
    )]
    ConsistencyViolation {
        partition: TopicPartition,
        first_cluster: String,
        second_cluster: String,
        group: ClusterGroupDescriptor,
    },

    /// A per-cluster consumer failed outside of shutdown
    #[error("Consumer for cluster {cluster} failed: {source}")]
    ClusterConsumer {
        cluster: String,
        #[source]
        source: ConsumerError,
    },

    /// Some per-cluster consumers did not close before the deadline
    #[error(
        "Failed to close all consumers for cluster group {group} in {}ms; still closing: [{}]",
        .timeout.as_millis(),
        join(.stuck)
    )]
    ShutdownTimeout {
        group: ClusterGroupDescriptor,
        timeout: Duration,
        stuck: Vec<StuckShutdown>,
        failures: Vec<ShutdownFailure>,
    },

    /// Some per-cluster consumers returned errors from close
    #[error("Failed to close consumers for cluster group {group}: [{}]", join(.failures))]
    ShutdownFailed {
        group: ClusterGroupDescriptor,
        failures: Vec<ShutdownFailure>,
    },

    /// Operation not available on a federated consumer
    #[error("Operation {0} is not supported by the federated consumer")]
    Unsupported(Operation),

    /// The federated consumer was used after `close()`
    #[error("Federated consumer is closed")]
    Closed,
}

fn join<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Result type alias for federation operations
pub type Result<T> = std::result::Result<T, FederationError>;
