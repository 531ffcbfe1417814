// Federated consumer module
//
// Layout:
//
//   types       descriptors, topic partitions, records
//   error       error taxonomy (FederationError and its sources)
//   constants   configuration keys, defaults and limits
//   metadata    metadata service client contract + static implementation
//   cluster     per-cluster consumer contract + rdkafka implementation
//   plugins     named factories for the two pluggable components
//   federation  FederatedConsumer: assign, poll, close
//
// The federation layer is synchronous. Per-cluster consumers are driven from
// the caller's thread; only close fans out to one thread per cluster.

pub mod cluster;
pub mod constants;
pub mod error;
pub mod federation;
pub mod metadata;
pub mod plugins;
pub mod types;

// Re-export commonly used types for convenience
pub use cluster::{ClusterConsumer, ClusterConsumerBuilder, ConsumerResult};
pub use error::{
    ConsumerError, FederationError, MetadataServiceError, Result, ShutdownFailure, StuckShutdown,
};
pub use federation::{AssignmentView, FederatedConsumer, GroupManagement, Operation};
pub use metadata::{MetadataResult, MetadataServiceClient, StaticMetadataServiceClient};
pub use plugins::ComponentRegistry;
pub use types::{
    ClientId, ClusterDescriptor, ClusterGroupDescriptor, ConsumerRecord, ConsumerRecords,
    TopicPartition,
};
