//! Failover topology discovery
//!
//! [`BrokerLocator`] walks the configured candidate addresses top to bottom,
//! one at a time, and uses the first broker that accepts a control
//! connection to look up the topic layout. The broker list returned by the
//! cluster supersedes the candidates for everything that follows.

use tracing::{debug, info, warn};

use super::{Backend, ControlConnection, Topology, TopologyResponse};
use crate::error::{TailError, TailResult};

/// Resolves cluster topology from an ordered list of candidate brokers
#[derive(Debug, Clone)]
pub struct BrokerLocator {
    candidates: Vec<String>,
}

impl BrokerLocator {
    /// Create a locator over candidate addresses, tried in order
    pub fn new(candidates: Vec<String>) -> Self {
        Self { candidates }
    }

    /// Candidate addresses in the order they are tried
    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    /// Open a control connection to the first reachable candidate.
    ///
    /// # Errors
    ///
    /// Returns `TailError::Connection` carrying the last candidate's failure
    /// when no candidate can be reached.
    pub async fn connect<B: Backend>(&self, backend: &B) -> TailResult<(String, B::Connection)> {
        let mut last_error = None;

        for address in &self.candidates {
            match backend.open_control_connection(address).await {
                Ok(connection) => {
                    debug!(broker = %address, "Connected to broker");
                    return Ok((address.clone(), connection));
                }
                Err(e) => {
                    warn!(broker = %address, error = %e, "Error connecting to broker");
                    last_error = Some(as_connection_error(address, e));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| TailError::Connection {
            address: "<none>".to_string(),
            message: "no broker candidates configured".to_string(),
        }))
    }

    /// Discover the advertised brokers and the partition IDs of `topic`.
    ///
    /// The control connection is closed whether or not the query succeeds.
    ///
    /// # Errors
    ///
    /// Returns `TailError::Connection` if no candidate is reachable and
    /// `TailError::Metadata` if the query fails, advertises no brokers, or
    /// does not describe exactly one topic.
    pub async fn locate<B: Backend>(&self, backend: &B, topic: &str) -> TailResult<Topology> {
        let (address, mut connection) = self.connect(backend).await?;

        let response = connection.query_topology(topic).await;
        if let Err(e) = connection.close().await {
            warn!(broker = %address, error = %e, "Error closing control connection");
        }

        let response = response.map_err(|e| match e {
            TailError::Metadata(_) => e,
            other => TailError::Metadata(other.to_string()),
        })?;

        let topology = validate(topic, response)?;
        info!(
            broker = %address,
            topic = %topic,
            brokers = ?topology.brokers,
            partitions = ?topology.partitions,
            "Fetched topic metadata"
        );
        Ok(topology)
    }
}

fn validate(topic: &str, response: TopologyResponse) -> TailResult<Topology> {
    if response.brokers.is_empty() {
        return Err(TailError::Metadata(format!(
            "Unable to find any broker for topic: {}",
            topic
        )));
    }

    let [entry] = <[_; 1]>::try_from(response.topics).map_err(|topics| {
        TailError::Metadata(format!("Invalid number of topics: {}", topics.len()))
    })?;

    if let Some(error) = entry.error {
        return Err(TailError::Metadata(format!(
            "Topic {} unavailable: {}",
            entry.name, error
        )));
    }

    Ok(Topology {
        brokers: response.brokers,
        partitions: entry.partitions,
    })
}

fn as_connection_error(address: &str, error: TailError) -> TailError {
    match error {
        TailError::Connection { .. } => error,
        other => TailError::Connection {
            address: address.to_string(),
            message: other.to_string(),
        },
    }
}
