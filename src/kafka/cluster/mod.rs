//! Per-cluster consumers
//!
//! A per-cluster consumer is a full Kafka consumer bound to one physical
//! cluster. The federated consumer never talks to brokers itself; it builds
//! one of these per owning cluster through a pluggable builder and drives it
//! through the `ClusterConsumer` trait.

pub mod rdkafka_consumer;

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use super::error::ConsumerError;
use super::types::{ConsumerRecords, TopicPartition};

pub use rdkafka_consumer::{RdKafkaClusterConsumer, RdKafkaConsumerBuilder};

/// Result type for per-cluster consumer calls
pub type ConsumerResult<T> = std::result::Result<T, ConsumerError>;

/// A consumer bound to a single physical cluster
///
/// Implementations follow the usual single-threaded consumer contract; the
/// federated consumer never calls one from two threads at once.
pub trait ClusterConsumer: Send {
    /// Replace the consumer's assignment with `partitions`
    fn assign(&mut self, partitions: &BTreeSet<TopicPartition>) -> ConsumerResult<()>;

    /// Fetch buffered records, waiting up to `timeout` if none are ready
    ///
    /// A zero timeout must not block on the network.
    fn poll(&mut self, timeout: Duration) -> ConsumerResult<ConsumerRecords>;

    /// Partitions currently assigned
    fn assignment(&self) -> BTreeSet<TopicPartition>;

    /// Close the consumer, taking at most `timeout`
    fn close(&mut self, timeout: Duration) -> ConsumerResult<()>;
}

/// Builds per-cluster consumers from a merged configuration map
///
/// The map holds the federated consumer's original properties with
/// `bootstrap.servers` set to the cluster's endpoint and `max.poll.records`
/// set to the cluster's share of the federated poll budget.
pub trait ClusterConsumerBuilder: Send + Sync {
    fn build(&self, config: &HashMap<String, String>) -> ConsumerResult<Box<dyn ClusterConsumer>>;
}

impl<F> ClusterConsumerBuilder for F
where
    F: Fn(&HashMap<String, String>) -> ConsumerResult<Box<dyn ClusterConsumer>> + Send + Sync,
{
    fn build(&self, config: &HashMap<String, String>) -> ConsumerResult<Box<dyn ClusterConsumer>> {
        self(config)
    }
}
