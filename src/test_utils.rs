//! Test utilities for logstash-kafka-tail
//!
//! This module provides record builders, recording sinks, and assertion
//! helpers shared by the unit tests.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::Semaphore;

use crate::error::{TailError, TailResult};
use crate::record::Record;
use crate::sink::Sink;

/// Build a record from a `json!` object literal
///
/// # Panics
///
/// Panics if the value is not a JSON object
pub fn record(value: Value) -> Record {
    match value {
        Value::Object(map) => map.into(),
        other => panic!("expected a JSON object, got {}", other),
    }
}

/// Sink that keeps every record it receives
#[derive(Default)]
pub struct MemorySink {
    records: Mutex<Vec<Record>>,
}

impl MemorySink {
    /// Snapshot of the records received so far
    pub fn records(&self) -> Vec<Record> {
        self.records.lock().unwrap().clone()
    }

    /// Values of one field across received records, in arrival order
    pub fn field_values(&self, key: &str) -> Vec<Value> {
        self.records()
            .iter()
            .filter_map(|r| r.get(key).cloned())
            .collect()
    }
}

#[async_trait::async_trait]
impl Sink for MemorySink {
    async fn print(&self, record: Record) {
        self.records.lock().unwrap().push(record);
    }
}

/// Sink that blocks inside `print` until a permit is released
pub struct GatedSink {
    gate: Semaphore,
    inner: MemorySink,
}

impl GatedSink {
    /// Create a sink with a closed gate
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            inner: MemorySink::default(),
        }
    }

    /// Allow `n` more records through
    pub fn release(&self, n: usize) {
        self.gate.add_permits(n);
    }

    /// Records that made it past the gate
    pub fn records(&self) -> Vec<Record> {
        self.inner.records()
    }
}

#[async_trait::async_trait]
impl Sink for GatedSink {
    async fn print(&self, record: Record) {
        if let Ok(permit) = self.gate.acquire().await {
            permit.forget();
        }
        self.inner.print(record).await;
    }
}

/// Cloneable in-memory writer for formatter output
#[derive(Clone, Default)]
pub struct SharedBuffer {
    bytes: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
    /// Output written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.bytes.lock().unwrap()).into_owned()
    }

    /// Output split into lines
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.bytes.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Poll `condition` until it holds or two seconds pass
///
/// # Panics
///
/// Panics on timeout
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("condition not met within 2s");
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Assert that an error contains the expected message
///
/// # Panics
///
/// Panics if the result is Ok or if the error doesn't contain the expected message
pub fn assert_error_contains<T>(result: TailResult<T>, expected: &str) {
    match result {
        Ok(_) => panic!("Expected error containing '{}' but got Ok", expected),
        Err(e) => {
            let error_msg = e.to_string();
            assert!(
                error_msg.contains(expected),
                "Error message '{}' does not contain '{}'",
                error_msg,
                expected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_builder() {
        let r = record(json!({"a": 1}));
        assert_eq!(r.get("a"), Some(&json!(1)));
    }

    #[test]
    #[should_panic(expected = "expected a JSON object")]
    fn test_record_builder_rejects_non_object() {
        record(json!([1, 2]));
    }

    #[test]
    fn test_shared_buffer_lines() {
        let buffer = SharedBuffer::default();
        let mut writer = buffer.clone();
        writeln!(writer, "one").unwrap();
        writeln!(writer, "two").unwrap();
        assert_eq!(buffer.lines(), vec!["one", "two"]);
    }

    #[test]
    fn test_assert_error_contains() {
        let result: TailResult<()> = Err(TailError::Metadata("no brokers".to_string()));
        assert_error_contains(result, "no brokers");
    }
}
