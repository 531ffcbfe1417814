//! Federation core
//!
//! `FederatedConsumer` owns the metadata service client and a registry of
//! per-cluster consumers. The registry lives in `snapshot`, parallel
//! shutdown in `shutdown`, and the consumer operations that are not
//! federation-ready in `unsupported`.

mod consumer;
mod shutdown;
mod snapshot;
mod unsupported;

pub use consumer::FederatedConsumer;
pub use snapshot::{AssignmentView, ClusterConsumerEntry, ConsumerSnapshot, SharedClusterConsumer};
pub use unsupported::{GroupManagement, Operation};
