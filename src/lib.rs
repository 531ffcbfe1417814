//! Federated Kafka consumer
//!
//! Reads from a group of independent Kafka clusters as if they were a single
//! broker. A remote metadata service says which physical cluster owns each
//! partition; the [`FederatedConsumer`] keeps one per-cluster consumer per
//! owning cluster, multiplexes polls across them under one time and record
//! budget, and shuts them all down in parallel within a shared deadline.
//!
//! ```rust,ignore
//! let config = FederatedConsumerConfig::from_properties([
//!     ("cluster.group", "payments"),
//!     ("cluster.environment", "prod"),
//!     ("metadata.service.static.cluster.east", "east-kafka:9092"),
//!     ("metadata.service.static.topic.orders", "east"),
//! ])?;
//! let mut consumer = FederatedConsumer::new(config)?;
//! consumer.assign([TopicPartition::new("orders", 0)])?;
//! let records = consumer.poll(Duration::from_millis(500))?;
//! consumer.close(Duration::from_secs(30))?;
//! ```

// Module declarations
pub mod config; // Configuration (property map parsing and validation)
pub mod kafka; // Federation core, metadata service and per-cluster consumers

// Test utilities (only compiled in test builds)
#[cfg(test)]
pub mod testing;

pub use config::FederatedConsumerConfig;
pub use kafka::{
    ClientId, ClusterConsumer, ClusterConsumerBuilder, ClusterDescriptor,
    ClusterGroupDescriptor, ConsumerRecord, ConsumerRecords, FederatedConsumer, FederationError,
    MetadataServiceClient, Result, TopicPartition,
};
