//! rdkafka-backed cluster access
//!
//! Control connections are short-lived `BaseConsumer`s bootstrapped from a
//! single candidate address. librdkafka connects lazily, so opening one
//! performs a metadata round trip to prove the broker answers.
//!
//! Partition readers are `StreamConsumer`s with a manual assignment of one
//! partition at the configured offset. They never join a consumer group and
//! never commit offsets.

use std::sync::Arc;
use std::time::Duration;

use rdkafka::config::ClientConfig;
use rdkafka::consumer::{BaseConsumer, Consumer, StreamConsumer};
use rdkafka::error::{KafkaResult, RDKafkaErrorCode};
use rdkafka::message::Message;
use rdkafka::metadata::Metadata;
use rdkafka::{Offset, TopicPartitionList};
use tracing::debug;

use super::{
    Backend, ControlConnection, LogClient, PartitionReader, RawRecord, ReaderEvent, StartOffset,
    TopicMetadata, TopologyResponse,
};
use crate::config::KafkaSettings;
use crate::error::{TailError, TailResult};

impl From<StartOffset> for Offset {
    fn from(offset: StartOffset) -> Self {
        match offset {
            StartOffset::Newest => Offset::End,
            StartOffset::Oldest => Offset::Beginning,
            StartOffset::At(n) => Offset::Offset(n),
        }
    }
}

/// [`Backend`] talking to a real Kafka cluster
#[derive(Debug, Clone)]
pub struct KafkaBackend {
    client_id: String,
    metadata_timeout: Duration,
}

impl KafkaBackend {
    /// Create a backend from client settings
    ///
    /// # Examples
    ///
    /// ```
    /// use logstash_kafka_tail::broker::KafkaBackend;
    /// use logstash_kafka_tail::config::KafkaSettings;
    ///
    /// let backend = KafkaBackend::new(&KafkaSettings::default());
    /// let config = backend.client_config(&["kafka-1:9092".to_string()]);
    /// assert_eq!(config.get("bootstrap.servers"), Some("kafka-1:9092"));
    /// ```
    pub fn new(settings: &KafkaSettings) -> Self {
        Self {
            client_id: settings.client_id.clone(),
            metadata_timeout: settings.metadata_timeout,
        }
    }

    /// Client configuration for the given bootstrap addresses
    pub fn client_config(&self, brokers: &[String]) -> ClientConfig {
        let mut config = ClientConfig::new();
        config
            .set("bootstrap.servers", brokers.join(","))
            .set("client.id", &self.client_id)
            .set("group.id", &self.client_id)
            .set("enable.auto.commit", "false")
            .set("enable.auto.offset.store", "false")
            .set("enable.partition.eof", "false");
        config
    }
}

#[async_trait::async_trait]
impl Backend for KafkaBackend {
    type Connection = KafkaConnection;
    type Client = KafkaClient;

    async fn open_control_connection(&self, address: &str) -> TailResult<KafkaConnection> {
        let connection_error = |message: String| TailError::Connection {
            address: address.to_string(),
            message,
        };

        let consumer: BaseConsumer = self
            .client_config(&[address.to_string()])
            .create()
            .map_err(|e| connection_error(e.to_string()))?;
        let consumer = Arc::new(consumer);

        let probe = consumer.clone();
        let timeout = self.metadata_timeout;
        blocking(move || probe.fetch_metadata(None, timeout).map(|_| ()))
            .await
            .map_err(connection_error)?;

        debug!(broker = %address, "Control connection open");
        Ok(KafkaConnection {
            consumer,
            timeout: self.metadata_timeout,
        })
    }

    fn new_client(&self, brokers: &[String]) -> TailResult<KafkaClient> {
        if brokers.is_empty() {
            return Err(TailError::Config(
                "cannot build a client without brokers".to_string(),
            ));
        }
        Ok(KafkaClient {
            config: self.client_config(brokers),
        })
    }
}

/// Metadata connection to one broker
pub struct KafkaConnection {
    consumer: Arc<BaseConsumer>,
    timeout: Duration,
}

#[async_trait::async_trait]
impl ControlConnection for KafkaConnection {
    async fn query_topology(&mut self, topic: &str) -> TailResult<TopologyResponse> {
        let consumer = self.consumer.clone();
        let timeout = self.timeout;
        let topic = topic.to_string();

        blocking(move || {
            consumer
                .fetch_metadata(Some(&topic), timeout)
                .map(|metadata| topology_from(&metadata))
        })
        .await
        .map_err(TailError::Metadata)
    }

    async fn close(self) -> TailResult<()> {
        drop(self.consumer);
        Ok(())
    }
}

fn topology_from(metadata: &Metadata) -> TopologyResponse {
    TopologyResponse {
        brokers: metadata
            .brokers()
            .iter()
            .map(|broker| format!("{}:{}", broker.host(), broker.port()))
            .collect(),
        topics: metadata
            .topics()
            .iter()
            .map(|topic| TopicMetadata {
                name: topic.name().to_string(),
                partitions: topic.partitions().iter().map(|p| p.id()).collect(),
                error: topic
                    .error()
                    .map(|code| RDKafkaErrorCode::from(code).to_string()),
            })
            .collect(),
    }
}

async fn blocking<T, F>(f: F) -> Result<T, String>
where
    T: Send + 'static,
    F: FnOnce() -> KafkaResult<T> + Send + 'static,
{
    match tokio::task::spawn_blocking(f).await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(e) => Err(format!("metadata task failed: {}", e)),
    }
}

/// Consuming client for the discovered brokers
pub struct KafkaClient {
    config: ClientConfig,
}

#[async_trait::async_trait]
impl LogClient for KafkaClient {
    type Reader = KafkaReader;

    async fn open_partition_reader(
        &self,
        topic: &str,
        partition: i32,
        offset: StartOffset,
    ) -> TailResult<KafkaReader> {
        let handle_error = |e: rdkafka::error::KafkaError| TailError::HandleOpen {
            partition,
            message: e.to_string(),
        };

        let consumer: StreamConsumer = self.config.create().map_err(handle_error)?;
        let mut assignment = TopicPartitionList::new();
        assignment
            .add_partition_offset(topic, partition, offset.into())
            .map_err(handle_error)?;
        consumer.assign(&assignment).map_err(handle_error)?;

        debug!(topic = %topic, partition, offset = %offset, "Partition reader assigned");
        Ok(KafkaReader {
            partition,
            consumer,
        })
    }
}

/// Reader bound to a single partition
pub struct KafkaReader {
    partition: i32,
    consumer: StreamConsumer,
}

#[async_trait::async_trait]
impl PartitionReader for KafkaReader {
    async fn next_event(&mut self) -> Option<ReaderEvent> {
        let event = match self.consumer.recv().await {
            Ok(message) => ReaderEvent::Record(RawRecord::new(
                message.partition(),
                message.offset(),
                message.payload().unwrap_or_default(),
            )),
            Err(e) => ReaderEvent::Error(e.to_string()),
        };
        Some(event)
    }

    async fn close(self) -> TailResult<()> {
        self.consumer
            .unassign()
            .map_err(|e| TailError::HandleClose {
                partition: self.partition,
                message: e.to_string(),
            })
    }
}
