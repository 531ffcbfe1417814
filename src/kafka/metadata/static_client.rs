//! Configuration-driven metadata service client
//!
//! Serves a fixed topology: each topic lives on one cluster, optionally with a
//! known partition count and per-partition overrides. Useful for deployments
//! whose cluster layout rarely changes and for local testing.
//!
//! Properties:
//! - `metadata.service.static.cluster.<name> = <bootstrap servers>`
//! - `metadata.service.static.topic.<topic> = <cluster name>[:<partition count>]`

use std::collections::{BTreeSet, HashMap, HashSet};
use std::time::Duration;

use tracing::debug;

use super::{MetadataResult, MetadataServiceClient};
use crate::kafka::constants::{STATIC_CLUSTER_PREFIX, STATIC_TOPIC_PREFIX};
use crate::kafka::error::{FederationError, MetadataServiceError, Result};
use crate::kafka::types::{ClientId, ClusterDescriptor, ClusterGroupDescriptor, TopicPartition};

#[derive(Debug, Clone)]
struct TopicPlacement {
    cluster: ClusterDescriptor,
    /// None = any partition number is accepted
    partition_count: Option<i32>,
}

/// Metadata service client backed by an in-memory topology
#[derive(Debug, Default)]
pub struct StaticMetadataServiceClient {
    topics: HashMap<String, TopicPlacement>,
    overrides: HashMap<TopicPartition, ClusterDescriptor>,
    registered: HashSet<ClientId>,
    closed: bool,
}

impl StaticMetadataServiceClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place every partition of `topic` on `cluster`
    pub fn with_topic(mut self, topic: impl Into<String>, cluster: ClusterDescriptor) -> Self {
        self.topics.insert(
            topic.into(),
            TopicPlacement {
                cluster,
                partition_count: None,
            },
        );
        self
    }

    /// Place partitions `0..partition_count` of `topic` on `cluster`
    pub fn with_topic_partitions(
        mut self,
        topic: impl Into<String>,
        cluster: ClusterDescriptor,
        partition_count: i32,
    ) -> Self {
        self.topics.insert(
            topic.into(),
            TopicPlacement {
                cluster,
                partition_count: Some(partition_count),
            },
        );
        self
    }

    /// Place one partition on a specific cluster, overriding its topic's placement
    pub fn with_partition(mut self, partition: TopicPartition, cluster: ClusterDescriptor) -> Self {
        self.overrides.insert(partition, cluster);
        self
    }

    /// Build from the `metadata.service.static.*` properties
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        let clusters: HashMap<&str, ClusterDescriptor> = properties
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(STATIC_CLUSTER_PREFIX)
                    .map(|name| (name, ClusterDescriptor::new(name, value.as_str())))
            })
            .collect();

        let mut client = Self::new();
        for (key, value) in properties {
            let Some(topic) = key.strip_prefix(STATIC_TOPIC_PREFIX) else {
                continue;
            };

            let (cluster_name, partition_count) = match value.split_once(':') {
                Some((name, count)) => {
                    let count = count.trim().parse::<i32>().ok().filter(|c| *c > 0).ok_or_else(
                        || {
                            FederationError::InvalidConfig(format!(
                                "{}: partition count must be a positive integer, got '{}'",
                                key, count
                            ))
                        },
                    )?;
                    (name.trim(), Some(count))
                }
                None => (value.trim(), None),
            };

            let cluster = clusters.get(cluster_name).cloned().ok_or_else(|| {
                FederationError::InvalidConfig(format!(
                    "{}: unknown cluster '{}' (declare it with {}{})",
                    key, cluster_name, STATIC_CLUSTER_PREFIX, cluster_name
                ))
            })?;

            client.topics.insert(
                topic.to_string(),
                TopicPlacement {
                    cluster,
                    partition_count,
                },
            );
        }

        debug!(
            clusters = clusters.len(),
            topics = client.topics.len(),
            "static metadata topology loaded"
        );
        Ok(client)
    }

    fn lookup(&self, partition: &TopicPartition) -> Option<ClusterDescriptor> {
        if let Some(cluster) = self.overrides.get(partition) {
            return Some(cluster.clone());
        }

        let placement = self.topics.get(partition.topic())?;
        let in_range = partition.partition() >= 0
            && placement
                .partition_count
                .map_or(true, |count| partition.partition() < count);
        in_range.then(|| placement.cluster.clone())
    }

    fn ensure_open(&self) -> MetadataResult<()> {
        if self.closed {
            return Err(MetadataServiceError::Closed);
        }
        Ok(())
    }
}

impl MetadataServiceClient for StaticMetadataServiceClient {
    fn register_federated_client(
        &mut self,
        group: &ClusterGroupDescriptor,
        _configs: &HashMap<String, String>,
        _timeout: Duration,
    ) -> MetadataResult<ClientId> {
        self.ensure_open()?;
        let client_id = ClientId::random();
        self.registered.insert(client_id);
        debug!(%group, %client_id, "registered federated client");
        Ok(client_id)
    }

    fn get_clusters_for_topic_partitions(
        &mut self,
        client_id: ClientId,
        partitions: &BTreeSet<TopicPartition>,
        _group: &ClusterGroupDescriptor,
        _timeout: Duration,
    ) -> MetadataResult<HashMap<TopicPartition, Option<ClusterDescriptor>>> {
        self.ensure_open()?;
        if !self.registered.contains(&client_id) {
            return Err(MetadataServiceError::UnknownClient(client_id));
        }

        Ok(partitions
            .iter()
            .map(|tp| (tp.clone(), self.lookup(tp)))
            .collect())
    }

    fn close(&mut self, _timeout: Duration) -> MetadataResult<()> {
        self.closed = true;
        self.registered.clear();
        Ok(())
    }
}
