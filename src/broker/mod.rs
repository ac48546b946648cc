//! Messaging-client collaborator interfaces
//!
//! The tail pipeline talks to the cluster only through the traits in this
//! module:
//!
//! - [`Backend`] opens control connections and builds consuming clients
//! - [`ControlConnection`] answers one topology query and is then closed
//! - [`LogClient`] opens one [`PartitionReader`] per partition
//! - [`PartitionReader`] yields raw records and client-reported errors
//!
//! [`kafka::KafkaBackend`] implements them on top of `rdkafka`. A scripted
//! in-memory backend lives in `fake` for tests.
//!
//! [`locator::BrokerLocator`] drives the failover discovery that turns a
//! list of candidate addresses into a [`Topology`].

use std::fmt;
use std::str::FromStr;

use crate::error::{TailError, TailResult};

pub mod kafka;
pub mod locator;

#[cfg(test)]
pub mod fake;

pub use kafka::KafkaBackend;
pub use locator::BrokerLocator;

/// Raw offset value meaning "start at the newest record"
pub const OFFSET_NEWEST: i64 = -1;

/// Raw offset value meaning "start at the oldest retained record"
pub const OFFSET_OLDEST: i64 = -2;

/// Position each partition reader starts from
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum StartOffset {
    /// Only records produced after the reader opens
    #[default]
    Newest,
    /// The oldest record still retained
    Oldest,
    /// An explicit partition-local offset
    At(i64),
}

impl StartOffset {
    /// Convert a raw offset, accepting the `-1` / `-2` sentinels.
    ///
    /// # Errors
    ///
    /// Returns `TailError::Config` for any other negative value.
    ///
    /// # Examples
    ///
    /// ```
    /// use logstash_kafka_tail::broker::StartOffset;
    ///
    /// assert_eq!(StartOffset::from_raw(-2).unwrap(), StartOffset::Oldest);
    /// assert_eq!(StartOffset::from_raw(42).unwrap(), StartOffset::At(42));
    /// assert!(StartOffset::from_raw(-3).is_err());
    /// ```
    pub fn from_raw(raw: i64) -> TailResult<Self> {
        match raw {
            OFFSET_NEWEST => Ok(StartOffset::Newest),
            OFFSET_OLDEST => Ok(StartOffset::Oldest),
            n if n >= 0 => Ok(StartOffset::At(n)),
            n => Err(TailError::Config(format!(
                "Invalid offset {}: use a non-negative offset, -1 (newest) or -2 (oldest)",
                n
            ))),
        }
    }

    /// Raw numeric form, using the sentinels for newest and oldest
    pub fn as_raw(&self) -> i64 {
        match self {
            StartOffset::Newest => OFFSET_NEWEST,
            StartOffset::Oldest => OFFSET_OLDEST,
            StartOffset::At(n) => *n,
        }
    }
}

impl FromStr for StartOffset {
    type Err = TailError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "newest" | "latest" | "end" => Ok(StartOffset::Newest),
            "oldest" | "earliest" | "beginning" => Ok(StartOffset::Oldest),
            other => {
                let raw: i64 = other
                    .parse()
                    .map_err(|_| TailError::Config(format!("Invalid offset: {}", s)))?;
                StartOffset::from_raw(raw)
            }
        }
    }
}

impl fmt::Display for StartOffset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StartOffset::Newest => f.write_str("newest"),
            StartOffset::Oldest => f.write_str("oldest"),
            StartOffset::At(n) => write!(f, "{}", n),
        }
    }
}

/// Metadata for one topic in a topology response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicMetadata {
    /// Topic name
    pub name: String,
    /// Partition IDs in the order the cluster reported them
    pub partitions: Vec<i32>,
    /// Broker-side error for this topic, if any
    pub error: Option<String>,
}

/// Raw answer to a topology query
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TopologyResponse {
    /// Addresses advertised by the cluster
    pub brokers: Vec<String>,
    /// Topic entries returned for the query
    pub topics: Vec<TopicMetadata>,
}

/// Validated cluster layout for one topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    /// Authoritative broker addresses used to build the consuming client
    pub brokers: Vec<String>,
    /// Partition IDs for the topic, cluster order
    pub partitions: Vec<i32>,
}

/// One fetched, not yet deserialized record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRecord {
    /// Partition the record was read from
    pub partition: i32,
    /// Partition-local offset of the record
    pub offset: i64,
    /// Serialized payload
    pub payload: Vec<u8>,
}

impl RawRecord {
    /// Build a raw record from any byte-like payload
    pub fn new(partition: i32, offset: i64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            partition,
            offset,
            payload: payload.into(),
        }
    }
}

/// Something a partition reader produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReaderEvent {
    /// A fetched record
    Record(RawRecord),
    /// A non-fatal error reported by the client
    Error(String),
}

/// Entry point to a messaging cluster.
#[async_trait::async_trait]
pub trait Backend: Send + Sync + 'static {
    /// Control connection used for topology discovery
    type Connection: ControlConnection;
    /// Consuming client built from the discovered brokers
    type Client: LogClient;

    /// Open a control connection to a single broker address.
    ///
    /// # Errors
    ///
    /// Returns `TailError::Connection` if the broker cannot be reached.
    async fn open_control_connection(&self, address: &str) -> TailResult<Self::Connection>;

    /// Build a consuming client for the given broker addresses
    fn new_client(&self, brokers: &[String]) -> TailResult<Self::Client>;
}

/// Control connection to one broker
#[async_trait::async_trait]
pub trait ControlConnection: Send {
    /// Query brokers and partition layout for exactly one topic
    async fn query_topology(&mut self, topic: &str) -> TailResult<TopologyResponse>;

    /// Close the connection
    async fn close(self) -> TailResult<()>;
}

/// Client able to open per-partition readers
#[async_trait::async_trait]
pub trait LogClient: Send + Sync + 'static {
    /// Reader type produced by this client
    type Reader: PartitionReader;

    /// Open a reader for one partition starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns `TailError::HandleOpen` if the reader cannot be opened.
    async fn open_partition_reader(
        &self,
        topic: &str,
        partition: i32,
        offset: StartOffset,
    ) -> TailResult<Self::Reader>;
}

/// Read handle for one partition
#[async_trait::async_trait]
pub trait PartitionReader: Send + 'static {
    /// Wait for the next record or client error.
    ///
    /// Returns `None` once the reader will never produce anything again.
    /// Implementations must be cancel safe: dropping the returned future
    /// must not lose a record.
    async fn next_event(&mut self) -> Option<ReaderEvent>;

    /// Release the handle.
    ///
    /// # Errors
    ///
    /// Returns `TailError::HandleClose` if the client fails to release it.
    async fn close(self) -> TailResult<()>;
}
