//! The federated consumer
//!
//! Presents a group of Kafka clusters as one consumer:
//!
//! ```text
//! assign(partitions)
//!     │
//!     ├──> MetadataServiceClient (partition -> owning cluster)
//!     │
//!     └──> one ClusterConsumer per owning cluster (built via ClusterConsumerBuilder)
//!
//! poll(timeout)    visits every ClusterConsumer round-robin, merges results
//! close(timeout)   closes every ClusterConsumer in parallel, shared deadline
//! ```
//!
//! Not thread-safe for mutation: `assign`, `poll` and `close` take `&mut self`.
//! Other threads can follow the assignment through an [`AssignmentView`].

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use tracing::{debug, info, warn};

use super::shutdown::{self, deadline_after};
use super::snapshot::{AssignmentView, ClusterConsumerEntry, ConsumerSnapshot};
use super::unsupported::GroupManagement;
use crate::config::FederatedConsumerConfig;
use crate::kafka::cluster::ClusterConsumerBuilder;
use crate::kafka::constants::CONSUMER_CLOSE_MAX_TIMEOUT;
use crate::kafka::error::{ConsumerError, FederationError, MetadataServiceError, Result};
use crate::kafka::metadata::MetadataServiceClient;
use crate::kafka::plugins::ComponentRegistry;
use crate::kafka::types::{
    ClientId, ClusterDescriptor, ClusterGroupDescriptor, ConsumerRecords, TopicPartition,
};

/// A consumer that reads from every cluster of a cluster group
pub struct FederatedConsumer {
    cluster_group: ClusterGroupDescriptor,
    config: FederatedConsumerConfig,
    metadata_client: Box<dyn MetadataServiceClient>,
    consumer_builder: Arc<dyn ClusterConsumerBuilder>,
    /// Issued once at registration
    client_id: ClientId,
    /// Current per-cluster consumers; replaced wholesale on assignment changes
    registry: Arc<ArcSwap<ConsumerSnapshot>>,
    /// Index of the consumer polled first by the next `poll()`
    next_cluster_index: usize,
    closed: bool,
}

impl FederatedConsumer {
    /// Create a consumer using the built-in components named in `config`
    pub fn new(config: FederatedConsumerConfig) -> Result<Self> {
        Self::from_registry(config, &ComponentRegistry::default())
    }

    /// Create a consumer, resolving component selectors through `registry`
    pub fn from_registry(
        config: FederatedConsumerConfig,
        registry: &ComponentRegistry,
    ) -> Result<Self> {
        // The builder holds no resources, so create it first
        let consumer_builder = registry.consumer_builder(&config)?;
        let metadata_client = registry.metadata_client(&config)?;
        Self::with_components(config, metadata_client, consumer_builder)
    }

    /// Create a consumer from explicit components and register it
    ///
    /// # Errors
    ///
    /// Returns `MetadataService` if registration fails. The metadata client is
    /// closed before the error is returned.
    pub fn with_components(
        config: FederatedConsumerConfig,
        mut metadata_client: Box<dyn MetadataServiceClient>,
        consumer_builder: Arc<dyn ClusterConsumerBuilder>,
    ) -> Result<Self> {
        let cluster_group = config.cluster_group_descriptor();
        let timeout = config.metadata_service_request_timeout();

        let client_id = match metadata_client.register_federated_client(
            &cluster_group,
            config.originals(),
            timeout,
        ) {
            Ok(client_id) => client_id,
            Err(source) => {
                if let Err(close_err) = metadata_client.close(timeout) {
                    warn!(
                        %cluster_group,
                        error = %close_err,
                        "failed to close metadata service client after registration failure"
                    );
                }
                return Err(FederationError::MetadataService {
                    context: format!("registering with cluster group {}", cluster_group),
                    source,
                });
            }
        };

        info!(%cluster_group, %client_id, "federated consumer registered");

        Ok(Self {
            cluster_group,
            config,
            metadata_client,
            consumer_builder,
            client_id,
            registry: Arc::new(ArcSwap::from_pointee(ConsumerSnapshot::default())),
            next_cluster_index: 0,
            closed: false,
        })
    }

    pub fn client_id(&self) -> ClientId {
        self.client_id
    }

    pub fn cluster_group(&self) -> &ClusterGroupDescriptor {
        &self.cluster_group
    }

    pub fn config(&self) -> &FederatedConsumerConfig {
        &self.config
    }

    /// Partitions currently assigned across all clusters
    pub fn assignment(&self) -> BTreeSet<TopicPartition> {
        self.registry.load().assignment()
    }

    /// Clusters with an active per-cluster consumer, in polling order
    pub fn clusters(&self) -> Vec<ClusterDescriptor> {
        self.registry.load().clusters()
    }

    /// A read-only view of the registry for other threads
    pub fn assignment_view(&self) -> AssignmentView {
        AssignmentView::new(Arc::clone(&self.registry))
    }

    /// Assign `partitions`, replacing any previous assignment
    ///
    /// An empty set behaves like [`unsubscribe`](Self::unsubscribe).
    ///
    /// # Errors
    ///
    /// - `InvalidArgument` for a partition with an empty topic or negative number
    /// - `MetadataService` if the owning clusters cannot be looked up
    /// - `UnresolvedPartitions` if any partition exists in no cluster of the
    ///   group; the previous assignment is left untouched
    /// - `ShutdownTimeout` / `ShutdownFailed` if the previous consumers fail to close
    /// - `ClusterConsumer` if a per-cluster consumer cannot be built or assigned
    pub fn assign<I>(&mut self, partitions: I) -> Result<()>
    where
        I: IntoIterator<Item = TopicPartition>,
    {
        self.ensure_open()?;

        let partitions: BTreeSet<TopicPartition> = partitions.into_iter().collect();
        if partitions.is_empty() {
            return self.unsubscribe();
        }
        if let Some(bad) = partitions
            .iter()
            .find(|tp| tp.topic().is_empty() || tp.partition() < 0)
        {
            return Err(FederationError::InvalidArgument(format!(
                "invalid topic partition '{}'",
                bad
            )));
        }

        let assignments = self.resolve_clusters(&partitions)?;

        // Per-cluster poll budgets depend on the cluster count, so every
        // existing consumer is rebuilt rather than adjusted
        let previous = self.registry.load_full();
        if !previous.is_empty() {
            debug!(
                group = %self.cluster_group,
                count = previous.len(),
                "closing all existing per-cluster consumers due to assignment change"
            );
            if let Err(e) = shutdown::close_all(
                &self.cluster_group,
                previous.entries(),
                CONSUMER_CLOSE_MAX_TIMEOUT,
            ) {
                self.replace_registry(ConsumerSnapshot::default());
                return Err(e);
            }
        }

        match self.build_snapshot(assignments) {
            Ok(snapshot) => {
                debug!(
                    group = %self.cluster_group,
                    clusters = snapshot.len(),
                    partitions = partitions.len(),
                    "assignment applied"
                );
                self.replace_registry(snapshot);
                Ok(())
            }
            Err(e) => {
                self.replace_registry(ConsumerSnapshot::default());
                Err(e)
            }
        }
    }

    /// Drop the current assignment and close every per-cluster consumer
    pub fn unsubscribe(&mut self) -> Result<()> {
        self.ensure_open()?;
        let previous = self.replace_registry(ConsumerSnapshot::default());
        shutdown::close_all(&self.cluster_group, previous.entries(), CONSUMER_CLOSE_MAX_TIMEOUT)
    }

    /// Fetch records from all clusters, blocking at most `timeout`
    ///
    /// Consumers are visited round-robin starting where the previous poll
    /// stopped. All but the last visited consumer are polled without waiting;
    /// the last one gets whatever time is left. Polling stops early once
    /// `max.poll.records` records have been received or the deadline passed.
    ///
    /// With a zero `timeout` the deadline has passed as soon as the first
    /// consumer returns, so each call drains a single cluster and the next
    /// call moves on to the following one.
    ///
    /// # Errors
    ///
    /// - `ConsistencyViolation` if two clusters return the same partition
    /// - `ClusterConsumer` if a per-cluster poll fails
    pub fn poll(&mut self, timeout: Duration) -> Result<ConsumerRecords> {
        self.ensure_open()?;

        let snapshot = self.registry.load_full();
        if snapshot.is_empty() {
            return Ok(ConsumerRecords::empty());
        }

        let deadline = deadline_after(Instant::now(), timeout);
        let count = snapshot.len();
        let mut aggregated = ConsumerRecords::empty();
        let mut owners: HashMap<TopicPartition, &ClusterDescriptor> = HashMap::new();
        let mut received = 0;

        for visit in 0..count {
            let entry = &snapshot.entries()[self.next_cluster_index % count];
            let cluster = entry.cluster();

            let wait = if visit == count - 1 {
                deadline.saturating_duration_since(Instant::now())
            } else {
                Duration::ZERO
            };
            let batch = entry
                .consumer()
                .lock()
                .poll(wait)
                .map_err(|source| cluster_error(cluster, source))?;

            received += batch.count();
            for (partition, records) in batch {
                // Partitions are owned by exactly one cluster
                if let Some(previous_owner) = owners.get(&partition) {
                    return Err(FederationError::ConsistencyViolation {
                        partition,
                        first_cluster: previous_owner.name().to_string(),
                        second_cluster: cluster.name().to_string(),
                        group: self.cluster_group.clone(),
                    });
                }
                owners.insert(partition.clone(), cluster);
                aggregated.insert_batch(partition, records);
            }

            self.next_cluster_index = (self.next_cluster_index + 1) % count;

            if received >= self.config.max_poll_records || Instant::now() > deadline {
                break;
            }
        }

        Ok(aggregated)
    }

    /// Close all per-cluster consumers and the metadata service client
    ///
    /// Per-cluster consumers are closed in parallel; `timeout` bounds the
    /// whole call. Closing an already closed consumer is a no-op.
    ///
    /// # Errors
    ///
    /// - `ShutdownTimeout` if some consumers are still closing at the deadline
    /// - `ShutdownFailed` if some consumers returned errors from close
    /// - `MetadataService` if only the metadata client failed to close
    pub fn close(&mut self, timeout: Duration) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;

        let deadline = deadline_after(Instant::now(), timeout);
        let previous = self.replace_registry(ConsumerSnapshot::default());
        let result = shutdown::close_all(&self.cluster_group, previous.entries(), timeout);

        let remaining = deadline.saturating_duration_since(Instant::now());
        if let Err(source) = self.metadata_client.close(remaining) {
            if result.is_ok() {
                return Err(metadata_error("closing metadata service client", source));
            }
            warn!(
                group = %self.cluster_group,
                error = %source,
                "failed to close metadata service client"
            );
        }

        result
    }

    /// `close` with the maximum close timeout
    pub fn close_default(&mut self) -> Result<()> {
        self.close(CONSUMER_CLOSE_MAX_TIMEOUT)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(FederationError::Closed);
        }
        Ok(())
    }

    /// Publish `snapshot` and reset the polling cursor
    fn replace_registry(&mut self, snapshot: ConsumerSnapshot) -> Arc<ConsumerSnapshot> {
        self.next_cluster_index = 0;
        self.registry.swap(Arc::new(snapshot))
    }

    /// Group `partitions` by owning cluster
    fn resolve_clusters(
        &mut self,
        partitions: &BTreeSet<TopicPartition>,
    ) -> Result<BTreeMap<ClusterDescriptor, BTreeSet<TopicPartition>>> {
        let mut owners = self
            .metadata_client
            .get_clusters_for_topic_partitions(
                self.client_id,
                partitions,
                &self.cluster_group,
                self.config.metadata_service_request_timeout(),
            )
            .map_err(|source| {
                metadata_error(
                    &format!("getting clusters for topic partitions [{}]", join(partitions)),
                    source,
                )
            })?;

        let mut assignments: BTreeMap<ClusterDescriptor, BTreeSet<TopicPartition>> =
            BTreeMap::new();
        let mut nonexistent = Vec::new();
        for partition in partitions {
            match owners.remove(partition).flatten() {
                Some(cluster) => {
                    assignments.entry(cluster).or_default().insert(partition.clone());
                }
                None => nonexistent.push(partition.clone()),
            }
        }

        if !nonexistent.is_empty() {
            return Err(FederationError::UnresolvedPartitions(nonexistent));
        }
        Ok(assignments)
    }

    /// Build and assign one consumer per cluster
    ///
    /// On failure, every consumer built so far is closed before returning.
    fn build_snapshot(
        &self,
        assignments: BTreeMap<ClusterDescriptor, BTreeSet<TopicPartition>>,
    ) -> Result<ConsumerSnapshot> {
        let cluster_count = assignments.len();
        let mut entries: Vec<ClusterConsumerEntry> = Vec::with_capacity(cluster_count);

        for (cluster, partitions) in assignments {
            let added = self.add_cluster_consumer(&mut entries, cluster, partitions, cluster_count);
            if let Err(e) = added {
                if let Err(close_err) = shutdown::close_all(
                    &self.cluster_group,
                    &entries,
                    CONSUMER_CLOSE_MAX_TIMEOUT,
                ) {
                    warn!(
                        group = %self.cluster_group,
                        error = %close_err,
                        "failed to release per-cluster consumers after assignment failure"
                    );
                }
                return Err(e);
            }
        }

        Ok(ConsumerSnapshot::new(entries))
    }

    /// Build the consumer for `cluster`, assign it `partitions` and add it to `entries`
    ///
    /// A consumer that was built but rejected its assignment is still added,
    /// with no partitions, so the caller can close it.
    fn add_cluster_consumer(
        &self,
        entries: &mut Vec<ClusterConsumerEntry>,
        cluster: ClusterDescriptor,
        partitions: BTreeSet<TopicPartition>,
        cluster_count: usize,
    ) -> Result<()> {
        let config = self.config.per_cluster_config(&cluster, cluster_count);
        let mut consumer = self
            .consumer_builder
            .build(&config)
            .map_err(|source| cluster_error(&cluster, source))?;

        match consumer.assign(&partitions) {
            Ok(()) => {
                entries.push(ClusterConsumerEntry::new(cluster, consumer, partitions));
                Ok(())
            }
            Err(source) => {
                let err = cluster_error(&cluster, source);
                entries.push(ClusterConsumerEntry::new(cluster, consumer, BTreeSet::new()));
                Err(err)
            }
        }
    }

    /// The consumer for `cluster`, if one is active
    #[cfg(test)]
    pub(crate) fn cluster_consumer(
        &self,
        cluster: &ClusterDescriptor,
    ) -> Option<super::snapshot::SharedClusterConsumer> {
        self.registry.load().get(cluster).cloned()
    }

    #[cfg(test)]
    pub(crate) fn next_cluster_index(&self) -> usize {
        self.next_cluster_index
    }
}

impl GroupManagement for FederatedConsumer {}

impl std::fmt::Debug for FederatedConsumer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FederatedConsumer")
            .field("cluster_group", &self.cluster_group)
            .field("client_id", &self.client_id)
            .field("clusters", &self.clusters())
            .field("closed", &self.closed)
            .finish()
    }
}

fn cluster_error(cluster: &ClusterDescriptor, source: ConsumerError) -> FederationError {
    FederationError::ClusterConsumer {
        cluster: cluster.name().to_string(),
        source,
    }
}

fn metadata_error(context: &str, source: MetadataServiceError) -> FederationError {
    FederationError::MetadataService {
        context: context.to_string(),
        source,
    }
}

fn join(partitions: &BTreeSet<TopicPartition>) -> String {
    partitions
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
