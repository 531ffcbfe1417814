// Configuration module for kafka_federation
//
// The federated consumer is configured from a flat property map, the same way
// Kafka clients are. Federation keys are parsed and validated here; every
// original property is kept so it can be handed to the metadata service at
// registration and to each per-cluster consumer builder.

use std::collections::HashMap;
use std::time::Duration;

use crate::kafka::constants::{
    BOOTSTRAP_SERVERS_CONFIG, CLUSTER_CONSUMER_BUILDER_CONFIG, CLUSTER_ENVIRONMENT_CONFIG,
    CLUSTER_GROUP_CONFIG, DEFAULT_CLUSTER_CONSUMER_BUILDER, DEFAULT_MAX_POLL_RECORDS,
    DEFAULT_METADATA_SERVICE_CLIENT, DEFAULT_METADATA_SERVICE_REQUEST_TIMEOUT_MS,
    MAX_METADATA_SERVICE_REQUEST_TIMEOUT_MS, MAX_POLL_RECORDS_CONFIG,
    METADATA_SERVICE_CLIENT_CONFIG, METADATA_SERVICE_REQUEST_TIMEOUT_MS_CONFIG,
    MIN_MAX_POLL_RECORDS, MIN_METADATA_SERVICE_REQUEST_TIMEOUT_MS, SENSITIVE_CONFIGS,
};
use crate::kafka::error::{FederationError, Result};
use crate::kafka::types::{ClusterDescriptor, ClusterGroupDescriptor};

/// Configuration for a federated consumer
#[derive(Clone)]
pub struct FederatedConsumerConfig {
    /// Cluster group to consume from
    pub cluster_group: String,
    /// Environment of the cluster group
    pub cluster_environment: String,
    /// Timeout for each metadata service request (milliseconds)
    pub metadata_service_request_timeout_ms: u64,
    /// Records returned by one federated poll, at most
    pub max_poll_records: usize,
    /// Name of the metadata service client implementation
    pub metadata_service_client: String,
    /// Name of the per-cluster consumer builder implementation
    pub cluster_consumer_builder: String,
    /// Every property as originally supplied
    originals: HashMap<String, String>,
}

/// Custom Debug implementation that redacts sensitive credentials
impl std::fmt::Debug for FederatedConsumerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut originals: Vec<(&str, &str)> = self
            .originals
            .iter()
            .map(|(key, value)| {
                if SENSITIVE_CONFIGS.contains(&key.as_str()) {
                    // REDACT sensitive credentials to prevent log exposure
                    (key.as_str(), "[REDACTED]")
                } else {
                    (key.as_str(), value.as_str())
                }
            })
            .collect();
        originals.sort_unstable();

        f.debug_struct("FederatedConsumerConfig")
            .field("cluster_group", &self.cluster_group)
            .field("cluster_environment", &self.cluster_environment)
            .field(
                "metadata_service_request_timeout_ms",
                &self.metadata_service_request_timeout_ms,
            )
            .field("max_poll_records", &self.max_poll_records)
            .field("metadata_service_client", &self.metadata_service_client)
            .field("cluster_consumer_builder", &self.cluster_consumer_builder)
            .field("originals", &originals)
            .finish()
    }
}

impl FederatedConsumerConfig {
    /// Parse and validate a property map
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfig` if:
    /// - `cluster.group` or `cluster.environment` is missing or empty
    /// - a numeric property does not parse or is out of range
    pub fn from_properties<I, K, V>(properties: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let originals: HashMap<String, String> = properties
            .into_iter()
            .map(|(key, value)| (key.into(), value.into()))
            .collect();

        let cluster_group = required(&originals, CLUSTER_GROUP_CONFIG)?;
        let cluster_environment = required(&originals, CLUSTER_ENVIRONMENT_CONFIG)?;

        let metadata_service_request_timeout_ms = parse_bounded(
            &originals,
            METADATA_SERVICE_REQUEST_TIMEOUT_MS_CONFIG,
            DEFAULT_METADATA_SERVICE_REQUEST_TIMEOUT_MS,
            MIN_METADATA_SERVICE_REQUEST_TIMEOUT_MS,
            MAX_METADATA_SERVICE_REQUEST_TIMEOUT_MS,
        )?;
        let max_poll_records = parse_bounded(
            &originals,
            MAX_POLL_RECORDS_CONFIG,
            DEFAULT_MAX_POLL_RECORDS,
            MIN_MAX_POLL_RECORDS,
            usize::MAX,
        )?;

        let metadata_service_client = originals
            .get(METADATA_SERVICE_CLIENT_CONFIG)
            .cloned()
            .unwrap_or_else(|| DEFAULT_METADATA_SERVICE_CLIENT.to_string());
        let cluster_consumer_builder = originals
            .get(CLUSTER_CONSUMER_BUILDER_CONFIG)
            .cloned()
            .unwrap_or_else(|| DEFAULT_CLUSTER_CONSUMER_BUILDER.to_string());

        Ok(Self {
            cluster_group,
            cluster_environment,
            metadata_service_request_timeout_ms,
            max_poll_records,
            metadata_service_client,
            cluster_consumer_builder,
            originals,
        })
    }

    /// Properties exactly as supplied
    pub fn originals(&self) -> &HashMap<String, String> {
        &self.originals
    }

    pub fn cluster_group_descriptor(&self) -> ClusterGroupDescriptor {
        ClusterGroupDescriptor::new(&self.cluster_group, &self.cluster_environment)
    }

    pub fn metadata_service_request_timeout(&self) -> Duration {
        Duration::from_millis(self.metadata_service_request_timeout_ms)
    }

    /// Configuration for the consumer of one cluster
    ///
    /// Starts from the original properties and overrides the connection
    /// endpoint and the cluster's share of the poll budget.
    pub fn per_cluster_config(
        &self,
        cluster: &ClusterDescriptor,
        cluster_count: usize,
    ) -> HashMap<String, String> {
        let mut config = self.originals.clone();
        config.insert(
            BOOTSTRAP_SERVERS_CONFIG.to_string(),
            cluster.bootstrap_servers().to_string(),
        );
        config.insert(
            MAX_POLL_RECORDS_CONFIG.to_string(),
            per_cluster_max_poll_records(self.max_poll_records, cluster_count).to_string(),
        );
        config
    }
}

/// Each cluster's share of the federated poll budget
///
/// `floor(total / cluster_count)`, never below 1. When there are more clusters
/// than records the shares add up to more than the total; the federated poll
/// loop stops once the total is reached.
pub fn per_cluster_max_poll_records(total: usize, cluster_count: usize) -> usize {
    (total / cluster_count.max(1)).max(MIN_MAX_POLL_RECORDS)
}

fn required(originals: &HashMap<String, String>, key: &str) -> Result<String> {
    match originals.get(key).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value.to_string()),
        _ => Err(FederationError::InvalidConfig(format!("{} is required", key))),
    }
}

fn parse_bounded<T>(
    originals: &HashMap<String, String>,
    key: &str,
    default: T,
    min: T,
    max: T,
) -> Result<T>
where
    T: std::str::FromStr + PartialOrd + std::fmt::Display + Copy,
{
    let Some(raw) = originals.get(key) else {
        return Ok(default);
    };

    let value = raw.trim().parse::<T>().map_err(|_| {
        FederationError::InvalidConfig(format!("{}: '{}' is not a valid number", key, raw))
    })?;

    if value < min || value > max {
        return Err(FederationError::InvalidConfig(format!(
            "{} must be between {} and {}, got {}",
            key, min, max, value
        )));
    }

    Ok(value)
}
