//! Scripted in-memory backend for tests
//!
//! [`FakeBackend`] stands in for a real cluster. Tests configure which
//! addresses refuse connections, what the topology query returns, and the
//! sequence of events each partition reader yields. Once a partition's
//! script is exhausted its reader waits forever, like a live topic with no
//! new traffic, unless the backend was built with `with_end_of_stream`.
//!
//! # Example
//!
//! ```ignore
//! let backend = FakeBackend::new()
//!     .with_unreachable("addr1")
//!     .with_topology(response)
//!     .with_events(0, vec![ReaderEvent::Record(RawRecord::new(0, 0, "{}"))]);
//! ```

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use super::{
    Backend, ControlConnection, LogClient, PartitionReader, RawRecord, ReaderEvent, StartOffset,
    TopicMetadata, TopologyResponse,
};
use crate::error::{TailError, TailResult};

#[derive(Default)]
struct FakeState {
    unreachable: HashSet<String>,
    topology: Option<Result<TopologyResponse, String>>,
    attempts: Mutex<Vec<String>>,
    closed_connections: AtomicUsize,
    client_brokers: Mutex<Vec<Vec<String>>>,
    events: Mutex<HashMap<i32, Vec<ReaderEvent>>>,
    open_failures: HashSet<i32>,
    close_failures: HashSet<i32>,
    opened_readers: Mutex<Vec<(i32, StartOffset)>>,
    closed_readers: Mutex<Vec<i32>>,
    end_of_stream: bool,
    silent_brokers: bool,
}

/// In-memory [`Backend`]
#[derive(Clone, Default)]
pub struct FakeBackend {
    state: Arc<FakeState>,
}

impl FakeBackend {
    /// Backend where every address connects and the topology is empty
    pub fn new() -> Self {
        Self::default()
    }

    fn state_mut(&mut self) -> &mut FakeState {
        Arc::get_mut(&mut self.state).expect("configure FakeBackend before sharing it")
    }

    /// Refuse control connections to `address`
    pub fn with_unreachable(mut self, address: &str) -> Self {
        self.state_mut().unreachable.insert(address.to_string());
        self
    }

    /// Answer topology queries with `response`
    pub fn with_topology(mut self, response: TopologyResponse) -> Self {
        self.state_mut().topology = Some(Ok(response));
        self
    }

    /// Fail topology queries with `message`
    pub fn with_topology_error(mut self, message: &str) -> Self {
        self.state_mut().topology = Some(Err(message.to_string()));
        self
    }

    /// Convenience: one topic with the given partitions behind one broker
    pub fn with_partitions(self, topic: &str, partitions: &[i32]) -> Self {
        self.with_topology(TopologyResponse {
            brokers: vec!["fake-broker:9092".to_string()],
            topics: vec![TopicMetadata {
                name: topic.to_string(),
                partitions: partitions.to_vec(),
                error: None,
            }],
        })
    }

    /// Script the events yielded by a partition's reader
    pub fn with_events(mut self, partition: i32, events: Vec<ReaderEvent>) -> Self {
        self.state_mut()
            .events
            .get_mut()
            .expect("fake events lock")
            .insert(partition, events);
        self
    }

    /// Script JSON payloads for a partition, offsets counting from zero
    pub fn with_payloads(self, partition: i32, payloads: &[&str]) -> Self {
        let events = payloads
            .iter()
            .enumerate()
            .map(|(offset, payload)| {
                ReaderEvent::Record(RawRecord::new(partition, offset as i64, payload.as_bytes()))
            })
            .collect();
        self.with_events(partition, events)
    }

    /// Fail to open the reader for `partition`
    pub fn with_open_failure(mut self, partition: i32) -> Self {
        self.state_mut().open_failures.insert(partition);
        self
    }

    /// Fail to close the reader for `partition`
    pub fn with_close_failure(mut self, partition: i32) -> Self {
        self.state_mut().close_failures.insert(partition);
        self
    }

    /// Control connection attempts never complete, like a broker that
    /// accepts the TCP connection and then goes quiet
    pub fn with_silent_brokers(mut self) -> Self {
        self.state_mut().silent_brokers = true;
        self
    }

    /// Readers report end of stream once their script is exhausted
    pub fn with_end_of_stream(mut self) -> Self {
        self.state_mut().end_of_stream = true;
        self
    }

    /// Addresses tried so far, in order
    pub fn connection_attempts(&self) -> Vec<String> {
        self.state.attempts.lock().unwrap().clone()
    }

    /// Number of control connections closed
    pub fn closed_connections(&self) -> usize {
        self.state.closed_connections.load(Ordering::SeqCst)
    }

    /// Broker lists passed to `new_client`
    pub fn client_brokers(&self) -> Vec<Vec<String>> {
        self.state.client_brokers.lock().unwrap().clone()
    }

    /// Readers opened so far with their start offsets
    pub fn opened_readers(&self) -> Vec<(i32, StartOffset)> {
        self.state.opened_readers.lock().unwrap().clone()
    }

    /// Partitions whose readers were closed, successfully or not
    pub fn closed_readers(&self) -> Vec<i32> {
        self.state.closed_readers.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Backend for FakeBackend {
    type Connection = FakeConnection;
    type Client = FakeClient;

    async fn open_control_connection(&self, address: &str) -> TailResult<FakeConnection> {
        self.state.attempts.lock().unwrap().push(address.to_string());
        if self.state.silent_brokers {
            std::future::pending::<()>().await;
        }
        if self.state.unreachable.contains(address) {
            return Err(TailError::Connection {
                address: address.to_string(),
                message: "connection refused".to_string(),
            });
        }
        Ok(FakeConnection {
            state: self.state.clone(),
        })
    }

    fn new_client(&self, brokers: &[String]) -> TailResult<FakeClient> {
        self.state.client_brokers.lock().unwrap().push(brokers.to_vec());
        Ok(FakeClient {
            state: self.state.clone(),
        })
    }
}

/// Control connection handed out by [`FakeBackend`]
pub struct FakeConnection {
    state: Arc<FakeState>,
}

#[async_trait::async_trait]
impl ControlConnection for FakeConnection {
    async fn query_topology(&mut self, _topic: &str) -> TailResult<TopologyResponse> {
        match &self.state.topology {
            Some(Ok(response)) => Ok(response.clone()),
            Some(Err(message)) => Err(TailError::Metadata(message.clone())),
            None => Ok(TopologyResponse::default()),
        }
    }

    async fn close(self) -> TailResult<()> {
        self.state.closed_connections.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Consuming client handed out by [`FakeBackend`]
pub struct FakeClient {
    state: Arc<FakeState>,
}

#[async_trait::async_trait]
impl LogClient for FakeClient {
    type Reader = FakeReader;

    async fn open_partition_reader(
        &self,
        _topic: &str,
        partition: i32,
        offset: StartOffset,
    ) -> TailResult<FakeReader> {
        if self.state.open_failures.contains(&partition) {
            return Err(TailError::HandleOpen {
                partition,
                message: "offset out of range".to_string(),
            });
        }
        self.state
            .opened_readers
            .lock()
            .unwrap()
            .push((partition, offset));

        let events = self
            .state
            .events
            .lock()
            .unwrap()
            .remove(&partition)
            .unwrap_or_default();

        Ok(FakeReader {
            partition,
            events: events.into(),
            state: self.state.clone(),
        })
    }
}

/// Partition reader replaying a scripted event list
pub struct FakeReader {
    partition: i32,
    events: VecDeque<ReaderEvent>,
    state: Arc<FakeState>,
}

#[async_trait::async_trait]
impl PartitionReader for FakeReader {
    async fn next_event(&mut self) -> Option<ReaderEvent> {
        tokio::task::yield_now().await;
        if let Some(event) = self.events.pop_front() {
            return Some(event);
        }
        if self.state.end_of_stream {
            return None;
        }
        std::future::pending().await
    }

    async fn close(self) -> TailResult<()> {
        self.state.closed_readers.lock().unwrap().push(self.partition);
        if self.state.close_failures.contains(&self.partition) {
            return Err(TailError::HandleClose {
                partition: self.partition,
                message: "broker went away".to_string(),
            });
        }
        Ok(())
    }
}
