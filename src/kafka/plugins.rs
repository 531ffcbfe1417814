//! Named component factories
//!
//! The `metadata.service.client` and `cluster.consumer.builder` properties
//! name implementations rather than carry them. A `ComponentRegistry` maps
//! those names to factories; the default registry knows the built-in
//! `static` metadata client and `rdkafka` consumer builder, and callers can
//! register their own.

use std::collections::HashMap;
use std::sync::Arc;

use super::cluster::{ClusterConsumerBuilder, RdKafkaConsumerBuilder};
use super::constants::{RDKAFKA_CLUSTER_CONSUMER_BUILDER, STATIC_METADATA_SERVICE_CLIENT};
use super::error::{FederationError, Result};
use super::metadata::{MetadataServiceClient, StaticMetadataServiceClient};
use crate::config::FederatedConsumerConfig;

/// Creates a metadata service client from the consumer configuration
pub type MetadataClientFactory =
    Arc<dyn Fn(&FederatedConsumerConfig) -> Result<Box<dyn MetadataServiceClient>> + Send + Sync>;

/// Creates a per-cluster consumer builder from the consumer configuration
pub type ConsumerBuilderFactory =
    Arc<dyn Fn(&FederatedConsumerConfig) -> Result<Arc<dyn ClusterConsumerBuilder>> + Send + Sync>;

/// Registry of named metadata clients and consumer builders
#[derive(Clone)]
pub struct ComponentRegistry {
    metadata_clients: HashMap<String, MetadataClientFactory>,
    consumer_builders: HashMap<String, ConsumerBuilderFactory>,
}

impl ComponentRegistry {
    /// Registry with no components at all
    pub fn empty() -> Self {
        Self {
            metadata_clients: HashMap::new(),
            consumer_builders: HashMap::new(),
        }
    }

    pub fn register_metadata_client<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&FederatedConsumerConfig) -> Result<Box<dyn MetadataServiceClient>>
            + Send
            + Sync
            + 'static,
    {
        self.metadata_clients.insert(name.into(), Arc::new(factory));
        self
    }

    pub fn register_consumer_builder<F>(&mut self, name: impl Into<String>, factory: F) -> &mut Self
    where
        F: Fn(&FederatedConsumerConfig) -> Result<Arc<dyn ClusterConsumerBuilder>>
            + Send
            + Sync
            + 'static,
    {
        self.consumer_builders.insert(name.into(), Arc::new(factory));
        self
    }

    /// Instantiate the metadata client named by `metadata.service.client`
    pub fn metadata_client(
        &self,
        config: &FederatedConsumerConfig,
    ) -> Result<Box<dyn MetadataServiceClient>> {
        let factory = self
            .metadata_clients
            .get(&config.metadata_service_client)
            .ok_or_else(|| {
                FederationError::InvalidConfig(format!(
                    "unknown metadata service client '{}' (known: {})",
                    config.metadata_service_client,
                    known(&self.metadata_clients)
                ))
            })?;
        factory(config)
    }

    /// Instantiate the builder named by `cluster.consumer.builder`
    pub fn consumer_builder(
        &self,
        config: &FederatedConsumerConfig,
    ) -> Result<Arc<dyn ClusterConsumerBuilder>> {
        let factory = self
            .consumer_builders
            .get(&config.cluster_consumer_builder)
            .ok_or_else(|| {
                FederationError::InvalidConfig(format!(
                    "unknown cluster consumer builder '{}' (known: {})",
                    config.cluster_consumer_builder,
                    known(&self.consumer_builders)
                ))
            })?;
        factory(config)
    }
}

impl Default for ComponentRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry
            .register_metadata_client(STATIC_METADATA_SERVICE_CLIENT, |config| {
                let client = StaticMetadataServiceClient::from_properties(config.originals())?;
                Ok(Box::new(client) as Box<dyn MetadataServiceClient>)
            })
            .register_consumer_builder(RDKAFKA_CLUSTER_CONSUMER_BUILDER, |_| {
                Ok(Arc::new(RdKafkaConsumerBuilder) as Arc<dyn ClusterConsumerBuilder>)
            });
        registry
    }
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ComponentRegistry")
            .field("metadata_clients", &known(&self.metadata_clients))
            .field("consumer_builders", &known(&self.consumer_builders))
            .finish()
    }
}

fn known<V>(factories: &HashMap<String, V>) -> String {
    let mut names: Vec<&str> = factories.keys().map(String::as_str).collect();
    names.sort_unstable();
    names.join(", ")
}
