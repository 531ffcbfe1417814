//! Mock implementations of the federation collaborators
//!
//! Both mocks are cheap to clone and share their state between clones, so a
//! test can hand one copy to the federated consumer and inspect the other.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::kafka::cluster::{ClusterConsumer, ClusterConsumerBuilder, ConsumerResult};
use crate::kafka::constants::{
    BOOTSTRAP_SERVERS_CONFIG, DEFAULT_MAX_POLL_RECORDS, MAX_POLL_RECORDS_CONFIG,
};
use crate::kafka::error::{ConsumerError, MetadataServiceError};
use crate::kafka::metadata::{MetadataResult, MetadataServiceClient};
use crate::kafka::types::{
    ClientId, ClusterDescriptor, ClusterGroupDescriptor, ConsumerRecord, ConsumerRecords,
    TopicPartition,
};

pub use super::helpers::{cluster, partitions, records};

// ===== Metadata service =====

#[derive(Debug, Default)]
pub struct MockMetadataState {
    /// Owning cluster per topic
    pub topics: HashMap<String, ClusterDescriptor>,
    /// Partitions left out of every resolution reply
    pub omitted: BTreeSet<TopicPartition>,
    pub registrations: Vec<(ClientId, ClusterGroupDescriptor)>,
    pub register_failure: Option<String>,
    pub resolve_failure: Option<String>,
    pub resolve_calls: usize,
    pub close_calls: usize,
}

#[derive(Debug, Clone, Default)]
pub struct MockMetadataServiceClient {
    state: Arc<Mutex<MockMetadataState>>,
}

impl MockMetadataServiceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_topic(self, topic: &str, cluster: ClusterDescriptor) -> Self {
        self.state.lock().topics.insert(topic.to_string(), cluster);
        self
    }

    pub fn state(&self) -> Arc<Mutex<MockMetadataState>> {
        Arc::clone(&self.state)
    }

    pub fn fail_registration(&self, message: &str) {
        self.state.lock().register_failure = Some(message.to_string());
    }

    pub fn fail_resolution(&self, message: &str) {
        self.state.lock().resolve_failure = Some(message.to_string());
    }

    pub fn omit_from_replies(&self, partition: TopicPartition) {
        self.state.lock().omitted.insert(partition);
    }
}

impl MetadataServiceClient for MockMetadataServiceClient {
    fn register_federated_client(
        &mut self,
        group: &ClusterGroupDescriptor,
        _configs: &HashMap<String, String>,
        _timeout: Duration,
    ) -> MetadataResult<ClientId> {
        let mut state = self.state.lock();
        if let Some(message) = &state.register_failure {
            return Err(MetadataServiceError::Unavailable(message.clone()));
        }
        let client_id = ClientId::random();
        state.registrations.push((client_id, group.clone()));
        Ok(client_id)
    }

    fn get_clusters_for_topic_partitions(
        &mut self,
        client_id: ClientId,
        partitions: &BTreeSet<TopicPartition>,
        _group: &ClusterGroupDescriptor,
        _timeout: Duration,
    ) -> MetadataResult<HashMap<TopicPartition, Option<ClusterDescriptor>>> {
        let mut state = self.state.lock();
        state.resolve_calls += 1;
        if let Some(message) = &state.resolve_failure {
            return Err(MetadataServiceError::Unavailable(message.clone()));
        }
        if !state.registrations.iter().any(|(id, _)| *id == client_id) {
            return Err(MetadataServiceError::UnknownClient(client_id));
        }
        Ok(partitions
            .iter()
            .filter(|tp| !state.omitted.contains(*tp))
            .map(|tp| (tp.clone(), state.topics.get(tp.topic()).cloned()))
            .collect())
    }

    fn close(&mut self, _timeout: Duration) -> MetadataResult<()> {
        self.state.lock().close_calls += 1;
        Ok(())
    }
}

// ===== Per-cluster consumers =====

/// How a mock consumer's `close` behaves
#[derive(Debug, Clone, Default)]
pub enum CloseBehavior {
    #[default]
    Immediate,
    /// Sleep before returning Ok
    Delay(Duration),
    /// Block until `release_hung_closes` is called
    Hang,
    Fail(String),
    Panic,
}

/// Everything a mock consumer was asked to do
#[derive(Debug, Default)]
pub struct MockConsumerState {
    /// Configuration the consumer was built with
    pub config: HashMap<String, String>,
    pub assigned: BTreeSet<TopicPartition>,
    pub pending: VecDeque<ConsumerRecord>,
    pub max_poll_records: usize,
    /// When set, every poll fails with this message
    pub poll_error: Option<String>,
    pub poll_timeouts: Vec<Duration>,
    pub close_calls: usize,
    pub close_timeouts: Vec<Duration>,
}

impl MockConsumerState {
    /// Queue records to be returned by later polls
    pub fn enqueue(&mut self, records: Vec<ConsumerRecord>) {
        self.pending.extend(records);
    }
}

#[derive(Default)]
struct BuilderInner {
    /// Every consumer state in build order
    built: Mutex<Vec<(String, Arc<Mutex<MockConsumerState>>)>>,
    close_behaviors: Mutex<HashMap<String, CloseBehavior>>,
    failing_builds: Mutex<BTreeSet<String>>,
    failing_assigns: Mutex<BTreeSet<String>>,
    released: Mutex<bool>,
    release: Condvar,
}

/// Builds in-memory consumers keyed by their `bootstrap.servers`
#[derive(Clone, Default)]
pub struct MockClusterConsumerBuilder {
    inner: Arc<BuilderInner>,
}

impl MockClusterConsumerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// State of the most recently built consumer for `bootstrap`
    ///
    /// Panics if no consumer was built for it.
    pub fn state(&self, bootstrap: &str) -> Arc<Mutex<MockConsumerState>> {
        self.inner
            .built
            .lock()
            .iter()
            .rev()
            .find(|(servers, _)| servers == bootstrap)
            .map(|(_, state)| Arc::clone(state))
            .unwrap_or_else(|| panic!("no consumer built for {}", bootstrap))
    }

    /// States of every consumer built so far, oldest first
    pub fn built(&self) -> Vec<Arc<Mutex<MockConsumerState>>> {
        self.inner
            .built
            .lock()
            .iter()
            .map(|(_, state)| Arc::clone(state))
            .collect()
    }

    pub fn set_close_behavior(&self, bootstrap: &str, behavior: CloseBehavior) {
        self.inner
            .close_behaviors
            .lock()
            .insert(bootstrap.to_string(), behavior);
    }

    pub fn fail_build(&self, bootstrap: &str) {
        self.inner.failing_builds.lock().insert(bootstrap.to_string());
    }

    pub fn fail_assign(&self, bootstrap: &str) {
        self.inner.failing_assigns.lock().insert(bootstrap.to_string());
    }

    /// Let every `CloseBehavior::Hang` close return
    pub fn release_hung_closes(&self) {
        *self.inner.released.lock() = true;
        self.inner.release.notify_all();
    }
}

impl ClusterConsumerBuilder for MockClusterConsumerBuilder {
    fn build(&self, config: &HashMap<String, String>) -> ConsumerResult<Box<dyn ClusterConsumer>> {
        let bootstrap = config
            .get(BOOTSTRAP_SERVERS_CONFIG)
            .cloned()
            .ok_or_else(|| ConsumerError::Config("bootstrap.servers is required".to_string()))?;
        if self.inner.failing_builds.lock().contains(&bootstrap) {
            return Err(ConsumerError::Config(format!("cannot reach {}", bootstrap)));
        }

        let max_poll_records = config
            .get(MAX_POLL_RECORDS_CONFIG)
            .and_then(|value| value.parse().ok())
            .unwrap_or(DEFAULT_MAX_POLL_RECORDS);
        let state = Arc::new(Mutex::new(MockConsumerState {
            config: config.clone(),
            max_poll_records,
            ..MockConsumerState::default()
        }));
        self.inner
            .built
            .lock()
            .push((bootstrap.clone(), Arc::clone(&state)));

        Ok(Box::new(MockClusterConsumer {
            bootstrap,
            state,
            builder: Arc::clone(&self.inner),
        }))
    }
}

struct MockClusterConsumer {
    bootstrap: String,
    state: Arc<Mutex<MockConsumerState>>,
    builder: Arc<BuilderInner>,
}

impl ClusterConsumer for MockClusterConsumer {
    fn assign(&mut self, partitions: &BTreeSet<TopicPartition>) -> ConsumerResult<()> {
        if self.builder.failing_assigns.lock().contains(&self.bootstrap) {
            return Err(ConsumerError::Other(format!(
                "assignment rejected by {}",
                self.bootstrap
            )));
        }
        self.state.lock().assigned = partitions.clone();
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> ConsumerResult<ConsumerRecords> {
        let mut batch = ConsumerRecords::empty();
        {
            let mut state = self.state.lock();
            state.poll_timeouts.push(timeout);
            if let Some(message) = &state.poll_error {
                return Err(ConsumerError::Other(message.clone()));
            }
            let take = state.max_poll_records.min(state.pending.len());
            for record in state.pending.drain(..take) {
                batch.push(record);
            }
        }
        if batch.is_empty() {
            std::thread::sleep(timeout);
        }
        Ok(batch)
    }

    fn assignment(&self) -> BTreeSet<TopicPartition> {
        self.state.lock().assigned.clone()
    }

    fn close(&mut self, timeout: Duration) -> ConsumerResult<()> {
        {
            let mut state = self.state.lock();
            state.close_calls += 1;
            state.close_timeouts.push(timeout);
        }

        let behavior = self
            .builder
            .close_behaviors
            .lock()
            .get(&self.bootstrap)
            .cloned()
            .unwrap_or_default();
        match behavior {
            CloseBehavior::Immediate => Ok(()),
            CloseBehavior::Delay(delay) => {
                std::thread::sleep(delay);
                Ok(())
            }
            CloseBehavior::Hang => {
                let mut released = self.builder.released.lock();
                while !*released {
                    self.builder.release.wait(&mut released);
                }
                Ok(())
            }
            CloseBehavior::Fail(message) => Err(ConsumerError::Other(message)),
            CloseBehavior::Panic => panic!("close panicked on {}", self.bootstrap),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bootstrap: &str, max_poll_records: &str) -> HashMap<String, String> {
        [
            (BOOTSTRAP_SERVERS_CONFIG.to_string(), bootstrap.to_string()),
            (MAX_POLL_RECORDS_CONFIG.to_string(), max_poll_records.to_string()),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn test_mock_consumer_respects_poll_budget() {
        let builder = MockClusterConsumerBuilder::new();
        let mut consumer = builder.build(&config("east:9092", "2")).unwrap();
        builder.state("east:9092").lock().enqueue(records("orders", 0, 5));

        assert_eq!(consumer.poll(Duration::ZERO).unwrap().count(), 2);
        assert_eq!(consumer.poll(Duration::ZERO).unwrap().count(), 2);
        assert_eq!(consumer.poll(Duration::ZERO).unwrap().count(), 1);
        assert!(consumer.poll(Duration::ZERO).unwrap().is_empty());
    }

    #[test]
    fn test_mock_metadata_resolves_by_topic() {
        let mut client = MockMetadataServiceClient::new().with_topic("orders", cluster("east"));
        let group = ClusterGroupDescriptor::new("payments", "test");
        let id = client
            .register_federated_client(&group, &HashMap::new(), Duration::ZERO)
            .unwrap();

        let reply = client
            .get_clusters_for_topic_partitions(
                id,
                &partitions(&[("orders", 0), ("ghost", 0)]),
                &group,
                Duration::ZERO,
            )
            .unwrap();
        assert_eq!(reply[&TopicPartition::new("orders", 0)], Some(cluster("east")));
        assert_eq!(reply[&TopicPartition::new("ghost", 0)], None);
    }
}
