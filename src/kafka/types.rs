//! Core value types shared by the federation layer
//!
//! Cluster and group descriptors, topic partitions, client ids and the
//! record batches returned by polls.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::fmt;

use uuid::Uuid;

/// One physical Kafka cluster
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClusterDescriptor {
    name: String,
    bootstrap_servers: String,
}

impl ClusterDescriptor {
    pub fn new(name: impl Into<String>, bootstrap_servers: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bootstrap_servers: bootstrap_servers.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Connection endpoint handed to the per-cluster consumer
    pub fn bootstrap_servers(&self) -> &str {
        &self.bootstrap_servers
    }
}

impl fmt::Display for ClusterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.bootstrap_servers)
    }
}

/// A named set of clusters presented to clients as one namespace
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClusterGroupDescriptor {
    name: String,
    environment: String,
}

impl ClusterGroupDescriptor {
    pub fn new(name: impl Into<String>, environment: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            environment: environment.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }
}

impl fmt::Display for ClusterGroupDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.environment)
    }
}

/// Identity issued by the metadata service at registration time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClientId(Uuid);

impl ClientId {
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random id
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A single partition of a topic
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TopicPartition {
    topic: String,
    partition: i32,
}

impl TopicPartition {
    pub fn new(topic: impl Into<String>, partition: i32) -> Self {
        Self {
            topic: topic.into(),
            partition,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn partition(&self) -> i32 {
        self.partition
    }
}

impl fmt::Display for TopicPartition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.topic, self.partition)
    }
}

/// A record returned by a poll
///
/// Payloads stay as raw bytes; deserialization is the caller's concern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerRecord {
    pub topic: String,
    pub partition: i32,
    pub offset: i64,
    /// Milliseconds since epoch, if the broker reported one
    pub timestamp: Option<i64>,
    pub key: Option<Vec<u8>>,
    pub value: Option<Vec<u8>>,
    pub headers: Vec<(String, Option<Vec<u8>>)>,
}

impl ConsumerRecord {
    pub fn topic_partition(&self) -> TopicPartition {
        TopicPartition::new(self.topic.clone(), self.partition)
    }
}

/// Per-partition record batches returned by a poll
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConsumerRecords {
    records: BTreeMap<TopicPartition, Vec<ConsumerRecord>>,
}

impl ConsumerRecords {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Append a record to its partition's batch
    pub fn push(&mut self, record: ConsumerRecord) {
        self.records
            .entry(record.topic_partition())
            .or_default()
            .push(record);
    }

    /// Total number of records across all partitions
    pub fn count(&self) -> usize {
        self.records.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.records.values().all(Vec::is_empty)
    }

    pub fn partitions(&self) -> impl Iterator<Item = &TopicPartition> {
        self.records.keys()
    }

    pub fn contains_partition(&self, partition: &TopicPartition) -> bool {
        self.records.contains_key(partition)
    }

    /// Records for one partition (empty if none were returned)
    pub fn records(&self, partition: &TopicPartition) -> &[ConsumerRecord] {
        self.records
            .get(partition)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Iterate over all records, partition by partition
    pub fn iter(&self) -> impl Iterator<Item = &ConsumerRecord> {
        self.records.values().flatten()
    }

    pub(crate) fn insert_batch(&mut self, partition: TopicPartition, batch: Vec<ConsumerRecord>) {
        self.records.insert(partition, batch);
    }
}

impl From<BTreeMap<TopicPartition, Vec<ConsumerRecord>>> for ConsumerRecords {
    fn from(records: BTreeMap<TopicPartition, Vec<ConsumerRecord>>) -> Self {
        Self { records }
    }
}

impl IntoIterator for ConsumerRecords {
    type Item = (TopicPartition, Vec<ConsumerRecord>);
    type IntoIter = btree_map::IntoIter<TopicPartition, Vec<ConsumerRecord>>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.into_iter()
    }
}
