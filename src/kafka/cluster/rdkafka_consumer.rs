//! librdkafka-backed per-cluster consumer
//!
//! Wraps rdkafka's `BaseConsumer` with manual partition assignment.
//!
//! librdkafka has no `max.poll.records` property and returns one message per
//! poll call, so this consumer enforces the record budget itself: the first
//! poll waits up to the caller's timeout, the following ones drain what is
//! already buffered without blocking.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer};
use rdkafka::error::KafkaError;
use rdkafka::message::{BorrowedMessage, Headers, Message};
use rdkafka::TopicPartitionList;
use tracing::{debug, warn};

use super::{ClusterConsumer, ClusterConsumerBuilder, ConsumerResult};
use crate::kafka::constants::{
    BOOTSTRAP_SERVERS_CONFIG, DEFAULT_MAX_POLL_RECORDS, FEDERATION_ONLY_CONFIGS,
    MAX_POLL_RECORDS_CONFIG, MIN_MAX_POLL_RECORDS, STATIC_CLUSTER_PREFIX, STATIC_TOPIC_PREFIX,
};
use crate::kafka::error::ConsumerError;
use crate::kafka::types::{ConsumerRecord, ConsumerRecords, TopicPartition};

/// Per-cluster consumer backed by librdkafka
pub struct RdKafkaClusterConsumer {
    /// None once closed
    consumer: Option<BaseConsumer>,
    bootstrap_servers: String,
    max_poll_records: usize,
    assignment: BTreeSet<TopicPartition>,
    /// Error hit after records were already consumed; returned by the next poll
    pending_error: Option<KafkaError>,
}

impl RdKafkaClusterConsumer {
    /// Create a consumer from a merged per-cluster configuration map
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - `bootstrap.servers` is missing or empty
    /// - `max.poll.records` is not a positive integer
    /// - librdkafka rejects the configuration
    pub fn new(config: &HashMap<String, String>) -> ConsumerResult<Self> {
        let bootstrap_servers = config
            .get(BOOTSTRAP_SERVERS_CONFIG)
            .filter(|servers| !servers.is_empty())
            .cloned()
            .ok_or_else(|| {
                ConsumerError::Config(format!("{} is required", BOOTSTRAP_SERVERS_CONFIG))
            })?;

        let max_poll_records = match config.get(MAX_POLL_RECORDS_CONFIG) {
            Some(value) => value
                .parse::<usize>()
                .ok()
                .filter(|n| *n >= MIN_MAX_POLL_RECORDS)
                .ok_or_else(|| {
                    ConsumerError::Config(format!(
                        "{} must be a positive integer, got '{}'",
                        MAX_POLL_RECORDS_CONFIG, value
                    ))
                })?,
            None => DEFAULT_MAX_POLL_RECORDS,
        };

        let consumer: BaseConsumer = Self::client_config(config).create()?;
        debug!(%bootstrap_servers, max_poll_records, "created per-cluster consumer");

        Ok(Self {
            consumer: Some(consumer),
            bootstrap_servers,
            max_poll_records,
            assignment: BTreeSet::new(),
            pending_error: None,
        })
    }

    /// Translate the merged map into a librdkafka configuration
    ///
    /// Federation-only keys are dropped since librdkafka rejects unknown
    /// properties.
    fn client_config(config: &HashMap<String, String>) -> ClientConfig {
        let mut client_config = ClientConfig::new();
        for (key, value) in config {
            if FEDERATION_ONLY_CONFIGS.contains(&key.as_str())
                || key.starts_with(STATIC_CLUSTER_PREFIX)
                || key.starts_with(STATIC_TOPIC_PREFIX)
            {
                continue;
            }
            client_config.set(key, value);
        }

        // Offsets cannot be committed without a group
        if !config.contains_key("group.id") {
            client_config.set("enable.auto.commit", "false");
        }

        client_config
    }

    fn consumer(&self) -> ConsumerResult<&BaseConsumer> {
        self.consumer.as_ref().ok_or(ConsumerError::Closed)
    }

    fn to_record(message: &BorrowedMessage<'_>) -> ConsumerRecord {
        let headers = message
            .headers()
            .map(|headers| {
                headers
                    .iter()
                    .map(|header| (header.key.to_string(), header.value.map(<[u8]>::to_vec)))
                    .collect()
            })
            .unwrap_or_default();

        ConsumerRecord {
            topic: message.topic().to_string(),
            partition: message.partition(),
            offset: message.offset(),
            timestamp: message.timestamp().to_millis(),
            key: message.key().map(<[u8]>::to_vec),
            value: message.payload().map(<[u8]>::to_vec),
            headers,
        }
    }
}

impl ClusterConsumer for RdKafkaClusterConsumer {
    fn assign(&mut self, partitions: &BTreeSet<TopicPartition>) -> ConsumerResult<()> {
        let mut list = TopicPartitionList::with_capacity(partitions.len());
        for tp in partitions {
            list.add_partition(tp.topic(), tp.partition());
        }
        self.consumer()?.assign(&list)?;
        self.assignment = partitions.clone();
        Ok(())
    }

    fn poll(&mut self, timeout: Duration) -> ConsumerResult<ConsumerRecords> {
        let consumer = self.consumer.as_ref().ok_or(ConsumerError::Closed)?;
        // librdkafka reports an error event once, so a deferred one must not be lost
        if let Some(e) = self.pending_error.take() {
            return Err(e.into());
        }

        let mut records = ConsumerRecords::empty();
        let mut received = 0;
        let mut wait = timeout;

        while received < self.max_poll_records {
            match consumer.poll(wait) {
                Some(Ok(message)) => {
                    records.push(Self::to_record(&message));
                    received += 1;
                }
                Some(Err(KafkaError::PartitionEOF(partition))) => {
                    debug!(partition, "reached end of partition");
                }
                Some(Err(e)) if received > 0 => {
                    // Hand back what was already consumed; the error goes out with the next poll
                    warn!(
                        bootstrap_servers = %self.bootstrap_servers,
                        error = %e,
                        "poll error after {} records, deferring", received
                    );
                    self.pending_error = Some(e);
                    break;
                }
                Some(Err(e)) => return Err(e.into()),
                None => break,
            }
            wait = Duration::ZERO;
        }

        Ok(records)
    }

    fn assignment(&self) -> BTreeSet<TopicPartition> {
        let Some(consumer) = self.consumer.as_ref() else {
            return BTreeSet::new();
        };

        match consumer.assignment() {
            Ok(list) => list
                .elements()
                .iter()
                .map(|elem| TopicPartition::new(elem.topic(), elem.partition()))
                .collect(),
            Err(e) => {
                warn!(error = %e, "failed to read assignment, using last requested");
                self.assignment.clone()
            }
        }
    }

    /// Unassign and drop the librdkafka client
    ///
    /// `timeout` is only logged. librdkafka takes no deadline for tearing a
    /// client down, and the drop blocks until its broker threads exit, which
    /// can outlast `timeout`. The federated shutdown deadline still holds for
    /// the caller, since a close still running at the deadline is reported
    /// stuck and left on its own thread.
    fn close(&mut self, timeout: Duration) -> ConsumerResult<()> {
        self.pending_error = None;
        let Some(consumer) = self.consumer.take() else {
            return Ok(());
        };

        debug!(
            bootstrap_servers = %self.bootstrap_servers,
            timeout_ms = timeout.as_millis() as u64,
            "closing per-cluster consumer"
        );
        let result = consumer.unassign();
        self.assignment.clear();
        // Dropping the client tears down its broker connections
        drop(consumer);
        result.map_err(ConsumerError::from)
    }
}

impl fmt::Debug for RdKafkaClusterConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RdKafkaClusterConsumer")
            .field("bootstrap_servers", &self.bootstrap_servers)
            .field("max_poll_records", &self.max_poll_records)
            .field("closed", &self.consumer.is_none())
            .field("pending_error", &self.pending_error)
            .finish()
    }
}

/// Builder for librdkafka per-cluster consumers
#[derive(Debug, Default, Clone, Copy)]
pub struct RdKafkaConsumerBuilder;

impl ClusterConsumerBuilder for RdKafkaConsumerBuilder {
    fn build(&self, config: &HashMap<String, String>) -> ConsumerResult<Box<dyn ClusterConsumer>> {
        Ok(Box::new(RdKafkaClusterConsumer::new(config)?))
    }
}
