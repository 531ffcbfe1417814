//! Metadata service client abstraction
//!
//! The metadata service knows which physical cluster of a group owns each
//! topic partition. It is usually remote; this module only defines the
//! client contract the federated consumer depends on, plus a
//! configuration-driven implementation for fixed topologies.

pub mod static_client;

use std::collections::{BTreeSet, HashMap};
use std::time::Duration;

use super::error::MetadataServiceError;
use super::types::{ClientId, ClusterDescriptor, ClusterGroupDescriptor, TopicPartition};

pub use static_client::StaticMetadataServiceClient;

/// Result type for metadata service calls
pub type MetadataResult<T> = std::result::Result<T, MetadataServiceError>;

/// Client for the federation metadata service
pub trait MetadataServiceClient: Send {
    /// Register a federated client and obtain its id
    ///
    /// `configs` are the client's original properties; the service may use
    /// them for validation or bookkeeping.
    fn register_federated_client(
        &mut self,
        group: &ClusterGroupDescriptor,
        configs: &HashMap<String, String>,
        timeout: Duration,
    ) -> MetadataResult<ClientId>;

    /// Find the owning cluster of each partition
    ///
    /// Partitions that exist in no cluster of the group map to `None`. A
    /// partition missing from the reply is treated the same way by callers.
    fn get_clusters_for_topic_partitions(
        &mut self,
        client_id: ClientId,
        partitions: &BTreeSet<TopicPartition>,
        group: &ClusterGroupDescriptor,
        timeout: Duration,
    ) -> MetadataResult<HashMap<TopicPartition, Option<ClusterDescriptor>>>;

    /// Release the client's resources
    fn close(&mut self, timeout: Duration) -> MetadataResult<()>;
}
