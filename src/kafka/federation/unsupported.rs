//! Consumer operations a federated consumer does not provide
//!
//! Group management, offset management and topic discovery need cross-cluster
//! coordination that the federation layer does not implement yet. Rather than
//! hiding them, they live on the `GroupManagement` trait, whose every method
//! answers `FederationError::Unsupported` naming the operation. The inherent
//! methods of `FederatedConsumer` are exactly the federation-ready ones.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Duration;

use crate::kafka::error::{FederationError, Result};
use crate::kafka::types::TopicPartition;

/// Consumer operations that are not federation-ready
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Subscription,
    Subscribe,
    SubscribePattern,
    CommitSync,
    CommitAsync,
    Seek,
    SeekToBeginning,
    SeekToEnd,
    SeekToCommitted,
    Position,
    Committed,
    CommittedSafeOffset,
    PartitionsFor,
    ListTopics,
    Paused,
    Pause,
    Resume,
    OffsetsForTimes,
    BeginningOffsets,
    EndOffsets,
    SafeOffset,
    SafeOffsets,
    Metrics,
    Wakeup,
}

impl Operation {
    pub const ALL: &'static [Operation] = &[
        Operation::Subscription,
        Operation::Subscribe,
        Operation::SubscribePattern,
        Operation::CommitSync,
        Operation::CommitAsync,
        Operation::Seek,
        Operation::SeekToBeginning,
        Operation::SeekToEnd,
        Operation::SeekToCommitted,
        Operation::Position,
        Operation::Committed,
        Operation::CommittedSafeOffset,
        Operation::PartitionsFor,
        Operation::ListTopics,
        Operation::Paused,
        Operation::Pause,
        Operation::Resume,
        Operation::OffsetsForTimes,
        Operation::BeginningOffsets,
        Operation::EndOffsets,
        Operation::SafeOffset,
        Operation::SafeOffsets,
        Operation::Metrics,
        Operation::Wakeup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Subscription => "subscription",
            Operation::Subscribe => "subscribe",
            Operation::SubscribePattern => "subscribe_pattern",
            Operation::CommitSync => "commit_sync",
            Operation::CommitAsync => "commit_async",
            Operation::Seek => "seek",
            Operation::SeekToBeginning => "seek_to_beginning",
            Operation::SeekToEnd => "seek_to_end",
            Operation::SeekToCommitted => "seek_to_committed",
            Operation::Position => "position",
            Operation::Committed => "committed",
            Operation::CommittedSafeOffset => "committed_safe_offset",
            Operation::PartitionsFor => "partitions_for",
            Operation::ListTopics => "list_topics",
            Operation::Paused => "paused",
            Operation::Pause => "pause",
            Operation::Resume => "resume",
            Operation::OffsetsForTimes => "offsets_for_times",
            Operation::BeginningOffsets => "beginning_offsets",
            Operation::EndOffsets => "end_offsets",
            Operation::SafeOffset => "safe_offset",
            Operation::SafeOffsets => "safe_offsets",
            Operation::Metrics => "metrics",
            Operation::Wakeup => "wakeup",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn unsupported<T>(operation: Operation) -> Result<T> {
    Err(FederationError::Unsupported(operation))
}

/// Group and offset management operations
///
/// Every method defaults to `Unsupported`.
pub trait GroupManagement {
    fn subscription(&self) -> Result<BTreeSet<String>> {
        unsupported(Operation::Subscription)
    }

    fn subscribe(&mut self, _topics: &[String]) -> Result<()> {
        unsupported(Operation::Subscribe)
    }

    fn subscribe_pattern(&mut self, _pattern: &str) -> Result<()> {
        unsupported(Operation::SubscribePattern)
    }

    fn commit_sync(
        &mut self,
        _offsets: Option<&HashMap<TopicPartition, i64>>,
        _timeout: Duration,
    ) -> Result<()> {
        unsupported(Operation::CommitSync)
    }

    fn commit_async(&mut self, _offsets: Option<&HashMap<TopicPartition, i64>>) -> Result<()> {
        unsupported(Operation::CommitAsync)
    }

    fn seek(&mut self, _partition: &TopicPartition, _offset: i64) -> Result<()> {
        unsupported(Operation::Seek)
    }

    fn seek_to_beginning(&mut self, _partitions: &[TopicPartition]) -> Result<()> {
        unsupported(Operation::SeekToBeginning)
    }

    fn seek_to_end(&mut self, _partitions: &[TopicPartition]) -> Result<()> {
        unsupported(Operation::SeekToEnd)
    }

    fn seek_to_committed(&mut self, _partitions: &[TopicPartition]) -> Result<()> {
        unsupported(Operation::SeekToCommitted)
    }

    fn position(&mut self, _partition: &TopicPartition, _timeout: Duration) -> Result<i64> {
        unsupported(Operation::Position)
    }

    fn committed(
        &mut self,
        _partition: &TopicPartition,
        _timeout: Duration,
    ) -> Result<Option<i64>> {
        unsupported(Operation::Committed)
    }

    fn committed_safe_offset(&mut self, _partition: &TopicPartition) -> Result<Option<i64>> {
        unsupported(Operation::CommittedSafeOffset)
    }

    fn partitions_for(&mut self, _topic: &str, _timeout: Duration) -> Result<Vec<TopicPartition>> {
        unsupported(Operation::PartitionsFor)
    }

    fn list_topics(&mut self, _timeout: Duration) -> Result<HashMap<String, Vec<TopicPartition>>> {
        unsupported(Operation::ListTopics)
    }

    fn paused(&self) -> Result<BTreeSet<TopicPartition>> {
        unsupported(Operation::Paused)
    }

    fn pause(&mut self, _partitions: &[TopicPartition]) -> Result<()> {
        unsupported(Operation::Pause)
    }

    fn resume(&mut self, _partitions: &[TopicPartition]) -> Result<()> {
        unsupported(Operation::Resume)
    }

    fn offsets_for_times(
        &mut self,
        _timestamps: &HashMap<TopicPartition, i64>,
        _timeout: Duration,
    ) -> Result<HashMap<TopicPartition, Option<i64>>> {
        unsupported(Operation::OffsetsForTimes)
    }

    fn beginning_offsets(
        &mut self,
        _partitions: &[TopicPartition],
        _timeout: Duration,
    ) -> Result<HashMap<TopicPartition, i64>> {
        unsupported(Operation::BeginningOffsets)
    }

    fn end_offsets(
        &mut self,
        _partitions: &[TopicPartition],
        _timeout: Duration,
    ) -> Result<HashMap<TopicPartition, i64>> {
        unsupported(Operation::EndOffsets)
    }

    fn safe_offset(
        &mut self,
        _partition: &TopicPartition,
        _message_offset: Option<i64>,
    ) -> Result<Option<i64>> {
        unsupported(Operation::SafeOffset)
    }

    fn safe_offsets(&mut self) -> Result<HashMap<TopicPartition, i64>> {
        unsupported(Operation::SafeOffsets)
    }

    fn metrics(&self) -> Result<HashMap<String, f64>> {
        unsupported(Operation::Metrics)
    }

    fn wakeup(&self) -> Result<()> {
        unsupported(Operation::Wakeup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    struct Bare;
    impl GroupManagement for Bare {}

    #[test]
    fn test_operation_names_unique() {
        let names: HashSet<&str> = Operation::ALL.iter().map(Operation::as_str).collect();
        assert_eq!(names.len(), Operation::ALL.len());
    }

    #[test]
    fn test_defaults_name_the_operation() {
        let mut bare = Bare;
        let tp = TopicPartition::new("orders", 0);

        assert!(matches!(
            bare.subscribe(&["orders".to_string()]),
            Err(FederationError::Unsupported(Operation::Subscribe))
        ));
        assert!(matches!(
            bare.subscribe_pattern("orders.*"),
            Err(FederationError::Unsupported(Operation::SubscribePattern))
        ));
        assert!(matches!(
            bare.pause(&[tp.clone()]),
            Err(FederationError::Unsupported(Operation::Pause))
        ));
        assert!(matches!(
            bare.offsets_for_times(&HashMap::new(), Duration::ZERO),
            Err(FederationError::Unsupported(Operation::OffsetsForTimes))
        ));
        assert!(matches!(
            bare.seek(&tp, 42),
            Err(FederationError::Unsupported(Operation::Seek))
        ));
        assert!(matches!(
            bare.wakeup(),
            Err(FederationError::Unsupported(Operation::Wakeup))
        ));
    }
}
