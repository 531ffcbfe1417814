//! Test helper functions for building partitions, clusters and records

use std::collections::BTreeSet;

use crate::kafka::types::{ClusterDescriptor, ConsumerRecord, TopicPartition};

/// Build a partition set from `(topic, partition)` pairs
pub fn partitions(pairs: &[(&str, i32)]) -> BTreeSet<TopicPartition> {
    pairs
        .iter()
        .map(|(topic, partition)| TopicPartition::new(*topic, *partition))
        .collect()
}

/// A cluster named `name` reachable at `name:9092`
pub fn cluster(name: &str) -> ClusterDescriptor {
    ClusterDescriptor::new(name, format!("{}:9092", name))
}

/// `count` consecutive records for one partition, starting at offset 0
pub fn records(topic: &str, partition: i32, count: usize) -> Vec<ConsumerRecord> {
    (0..count)
        .map(|offset| ConsumerRecord {
            topic: topic.to_string(),
            partition,
            offset: offset as i64,
            timestamp: Some(1_700_000_000_000 + offset as i64),
            key: Some(format!("key-{}", offset).into_bytes()),
            value: Some(format!("value-{}", offset).into_bytes()),
            headers: Vec::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partitions_dedup() {
        let set = partitions(&[("orders", 0), ("orders", 0), ("orders", 1)]);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_records_offsets() {
        let batch = records("orders", 2, 3);
        assert_eq!(batch.len(), 3);
        assert_eq!(batch[2].offset, 2);
        assert_eq!(batch[0].topic_partition(), TopicPartition::new("orders", 2));
    }
}
