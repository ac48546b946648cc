//! Per-partition consumer task
//!
//! Each [`PartitionConsumer`] owns one partition reader. It deserializes the
//! records it reads and hands them to the shared sink until shutdown is
//! signalled or the reader reports end of stream, then closes the reader.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn, Instrument};

use crate::broker::{LogClient, PartitionReader, RawRecord, ReaderEvent, StartOffset};
use crate::error::{TailError, TailResult};
use crate::record::Record;
use crate::sink::Sink;

/// Outcome of one partition consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionReport {
    /// Partition the consumer read
    pub partition: i32,
    /// Records decoded and offered to the sink.
    ///
    /// A queueing sink may still drop an offered record once shutdown has
    /// begun, so this can exceed what the output printed.
    pub processed: u64,
}

/// Reads one partition and forwards decoded records to a sink
pub struct PartitionConsumer {
    topic: String,
    partition: i32,
    offset: StartOffset,
    sink: Arc<dyn Sink>,
    shutdown: CancellationToken,
}

impl PartitionConsumer {
    /// Create a consumer for `partition` of `topic`
    pub fn new(
        topic: impl Into<String>,
        partition: i32,
        offset: StartOffset,
        sink: Arc<dyn Sink>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            topic: topic.into(),
            partition,
            offset,
            sink,
            shutdown,
        }
    }

    /// Partition this consumer reads
    pub fn partition(&self) -> i32 {
        self.partition
    }

    /// Open the reader and consume until shutdown or end of stream.
    ///
    /// Records that fail to deserialize are logged with their payload and
    /// skipped. Errors reported by the reader are logged and consumption
    /// continues. A failure to close the reader is logged and otherwise
    /// ignored.
    ///
    /// # Errors
    ///
    /// Returns `TailError::HandleOpen` if the reader cannot be opened.
    pub async fn run<C: LogClient>(self, client: Arc<C>) -> TailResult<PartitionReport> {
        let span = crate::partition_span!(self.topic, self.partition);
        self.consume(client).instrument(span).await
    }

    async fn consume<C: LogClient>(self, client: Arc<C>) -> TailResult<PartitionReport> {
        let partition = self.partition;

        let mut reader = client
            .open_partition_reader(&self.topic, partition, self.offset)
            .await
            .map_err(|e| match e {
                TailError::HandleOpen { .. } => e,
                other => TailError::HandleOpen {
                    partition,
                    message: other.to_string(),
                },
            })?;

        info!(offset = %self.offset, "Starting consumer for partition");

        let mut processed = 0u64;
        loop {
            let event = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => break,
                event = reader.next_event() => event,
            };

            match event {
                Some(ReaderEvent::Record(raw)) => {
                    if self.deliver(raw).await {
                        processed += 1;
                    }
                }
                Some(ReaderEvent::Error(message)) => {
                    error!(error = %message, "Kafka client error");
                }
                None => {
                    debug!("Partition reader reached end of stream");
                    break;
                }
            }
        }

        if let Err(e) = reader.close().await {
            error!(error = %e, "Error closing partition reader");
        }

        info!(processed, "Stopping consumer for partition");
        Ok(PartitionReport {
            partition,
            processed,
        })
    }

    async fn deliver(&self, raw: RawRecord) -> bool {
        match Record::from_json(&raw.payload) {
            Ok(record) => {
                self.sink.print(record).await;
                true
            }
            Err(e) => {
                warn!(
                    offset = raw.offset,
                    error = %e,
                    payload = %String::from_utf8_lossy(&raw.payload),
                    "Error deserializing record"
                );
                false
            }
        }
    }
}
