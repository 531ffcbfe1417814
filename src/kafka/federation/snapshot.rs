//! Registry of per-cluster consumers
//!
//! The registry is an immutable snapshot published through a single
//! `ArcSwap`. Assignment changes build a complete new snapshot and swap it in,
//! so readers on any thread see either the old or the new set of consumers,
//! never a partially built one.

use std::collections::BTreeSet;
use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;

use crate::kafka::cluster::ClusterConsumer;
use crate::kafka::types::{ClusterDescriptor, TopicPartition};

/// A per-cluster consumer shared between its registry entry and shutdown tasks
pub type SharedClusterConsumer = Arc<Mutex<Box<dyn ClusterConsumer>>>;

/// The consumer for one cluster and the partitions it was assigned
///
/// `partitions` is fixed when the entry is created, so reading it never
/// touches the consumer's mutex.
#[derive(Clone)]
pub struct ClusterConsumerEntry {
    cluster: ClusterDescriptor,
    consumer: SharedClusterConsumer,
    partitions: BTreeSet<TopicPartition>,
}

impl ClusterConsumerEntry {
    pub fn new(
        cluster: ClusterDescriptor,
        consumer: Box<dyn ClusterConsumer>,
        partitions: BTreeSet<TopicPartition>,
    ) -> Self {
        Self {
            cluster,
            consumer: Arc::new(Mutex::new(consumer)),
            partitions,
        }
    }

    pub fn cluster(&self) -> &ClusterDescriptor {
        &self.cluster
    }

    pub fn consumer(&self) -> &SharedClusterConsumer {
        &self.consumer
    }

    pub fn partitions(&self) -> &BTreeSet<TopicPartition> {
        &self.partitions
    }
}

impl std::fmt::Debug for ClusterConsumerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConsumerEntry")
            .field("cluster", &self.cluster)
            .field("partitions", &self.partitions)
            .finish_non_exhaustive()
    }
}

/// Ordered, immutable set of per-cluster consumers
///
/// At most one entry per cluster.
#[derive(Debug, Default)]
pub struct ConsumerSnapshot {
    entries: Vec<ClusterConsumerEntry>,
}

impl ConsumerSnapshot {
    pub fn new(entries: Vec<ClusterConsumerEntry>) -> Self {
        debug_assert!(
            entries
                .iter()
                .map(ClusterConsumerEntry::cluster)
                .collect::<BTreeSet<_>>()
                .len()
                == entries.len(),
            "duplicate cluster in consumer snapshot"
        );
        Self { entries }
    }

    pub fn entries(&self) -> &[ClusterConsumerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, cluster: &ClusterDescriptor) -> Option<&SharedClusterConsumer> {
        self.entries
            .iter()
            .find(|entry| entry.cluster() == cluster)
            .map(ClusterConsumerEntry::consumer)
    }

    pub fn clusters(&self) -> Vec<ClusterDescriptor> {
        self.entries
            .iter()
            .map(|entry| entry.cluster().clone())
            .collect()
    }

    /// Union of the partitions assigned to every entry
    ///
    /// Lock-free: never waits on a consumer busy polling or closing.
    pub fn assignment(&self) -> BTreeSet<TopicPartition> {
        self.entries
            .iter()
            .flat_map(|entry| entry.partitions().iter().cloned())
            .collect()
    }
}

/// Read-only handle on a federated consumer's registry
///
/// Cheap to clone and safe to use from other threads while the owning
/// consumer keeps polling. Reads may be stale by one assignment change.
#[derive(Clone)]
pub struct AssignmentView {
    registry: Arc<ArcSwap<ConsumerSnapshot>>,
}

impl AssignmentView {
    pub(crate) fn new(registry: Arc<ArcSwap<ConsumerSnapshot>>) -> Self {
        Self { registry }
    }

    pub fn assignment(&self) -> BTreeSet<TopicPartition> {
        self.registry.load().assignment()
    }

    pub fn clusters(&self) -> Vec<ClusterDescriptor> {
        self.registry.load().clusters()
    }
}

impl std::fmt::Debug for AssignmentView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssignmentView")
            .field("clusters", &self.clusters())
            .finish()
    }
}
