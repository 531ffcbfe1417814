// Test helpers for kafka_federation integration tests
//
// A scripted per-cluster consumer built through the public
// ClusterConsumerBuilder trait. Each cluster gets a queue of records; polls
// drain it up to the consumer's max.poll.records share.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use kafka_federation::kafka::{ConsumerError, ConsumerResult};
use kafka_federation::{
    ClusterConsumer, ClusterConsumerBuilder, ClusterDescriptor, ConsumerRecord, ConsumerRecords,
    FederatedConsumer, FederatedConsumerConfig, TopicPartition,
};
use kafka_federation::kafka::StaticMetadataServiceClient;
use parking_lot::Mutex;

/// Records waiting to be polled, per bootstrap address
#[derive(Clone, Default)]
pub struct ScriptedClusters {
    queues: Arc<Mutex<HashMap<String, VecDeque<ConsumerRecord>>>>,
    closed: Arc<Mutex<Vec<String>>>,
    close_delay: Arc<Mutex<Option<Duration>>>,
    poll_latency: Arc<Mutex<Duration>>,
}

impl ScriptedClusters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `count` records for `topic`/`partition` on the cluster at `bootstrap`
    pub fn enqueue(&self, bootstrap: &str, topic: &str, partition: i32, count: usize) {
        let mut queues = self.queues.lock();
        let queue = queues.entry(bootstrap.to_string()).or_default();
        let start = queue.len() as i64;
        for i in 0..count as i64 {
            queue.push_back(ConsumerRecord {
                topic: topic.to_string(),
                partition,
                offset: start + i,
                timestamp: None,
                key: None,
                value: Some(format!("{}-{}", topic, start + i).into_bytes()),
                headers: Vec::new(),
            });
        }
    }

    pub fn remaining(&self, bootstrap: &str) -> usize {
        self.queues.lock().get(bootstrap).map_or(0, VecDeque::len)
    }

    /// Bootstrap addresses of every consumer closed so far
    pub fn closed(&self) -> Vec<String> {
        self.closed.lock().clone()
    }

    pub fn set_close_delay(&self, delay: Duration) {
        *self.close_delay.lock() = Some(delay);
    }

    /// Make every poll take at least `latency`, even a zero-wait one
    pub fn set_poll_latency(&self, latency: Duration) {
        *self.poll_latency.lock() = latency;
    }
}

impl ClusterConsumerBuilder for ScriptedClusters {
    fn build(&self, config: &HashMap<String, String>) -> ConsumerResult<Box<dyn ClusterConsumer>> {
        let bootstrap = config
            .get("bootstrap.servers")
            .cloned()
            .ok_or_else(|| ConsumerError::Config("bootstrap.servers is required".to_string()))?;
        let max_poll_records = config
            .get("max.poll.records")
            .and_then(|value| value.parse().ok())
            .ok_or_else(|| ConsumerError::Config("max.poll.records is required".to_string()))?;
        Ok(Box::new(ScriptedConsumer {
            bootstrap,
            max_poll_records,
            assigned: BTreeSet::new(),
            clusters: self.clone(),
        }))
    }
}

struct ScriptedConsumer {
    bootstrap: String,
    max_poll_records: usize,
    assigned: BTreeSet<TopicPartition>,
    clusters: ScriptedClusters,
}

impl ClusterConsumer for ScriptedConsumer {
    fn assign(&mut self, partitions: &BTreeSet<TopicPartition>) -> ConsumerResult<()> {
        self.assigned = partitions.clone();
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> ConsumerResult<ConsumerRecords> {
        let latency = *self.clusters.poll_latency.lock();
        std::thread::sleep(latency);

        let mut batch = ConsumerRecords::empty();
        {
            let mut queues = self.clusters.queues.lock();
            if let Some(queue) = queues.get_mut(&self.bootstrap) {
                let take = self.max_poll_records.min(queue.len());
                for record in queue.drain(..take) {
                    batch.push(record);
                }
            }
        }
        if batch.is_empty() {
            std::thread::sleep(timeout.saturating_sub(latency));
        }
        Ok(batch)
    }

    fn assignment(&self) -> BTreeSet<TopicPartition> {
        self.assigned.clone()
    }

    fn close(&mut self, _timeout: Duration) -> ConsumerResult<()> {
        let delay = *self.clusters.close_delay.lock();
        if let Some(delay) = delay {
            std::thread::sleep(delay);
        }
        self.clusters.closed.lock().push(self.bootstrap.clone());
        Ok(())
    }
}

pub fn cluster(name: &str) -> ClusterDescriptor {
    ClusterDescriptor::new(name, format!("{}:9092", name))
}

pub fn tp(topic: &str, partition: i32) -> TopicPartition {
    TopicPartition::new(topic, partition)
}

pub fn config(max_poll_records: usize) -> FederatedConsumerConfig {
    FederatedConsumerConfig::from_properties([
        ("cluster.group", "payments".to_string()),
        ("cluster.environment", "test".to_string()),
        ("max.poll.records", max_poll_records.to_string()),
    ])
    .expect("valid test config")
}

/// A federated consumer over `topics`, each placed on its own named cluster
pub fn federated(
    max_poll_records: usize,
    topics: &[(&str, &str)],
    clusters: &ScriptedClusters,
) -> FederatedConsumer {
    let metadata = topics
        .iter()
        .fold(StaticMetadataServiceClient::new(), |client, (topic, name)| {
            client.with_topic(*topic, cluster(name))
        });
    FederatedConsumer::with_components(
        config(max_poll_records),
        Box::new(metadata),
        Arc::new(clusters.clone()),
    )
    .expect("registration succeeds")
}
