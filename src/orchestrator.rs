//! Tail pipeline wiring
//!
//! [`Orchestrator`] discovers the topic layout, builds the consuming client
//! from the discovered brokers and runs one [`PartitionConsumer`] per
//! partition. All consumers feed a single [`AsyncSink`] that serializes
//! delivery to the output chain (an optional [`Filter`] in front of a
//! [`Formatter`]).
//!
//! The run ends when the shutdown token is cancelled (broker discovery
//! included), when every reader reports end of stream, or when a consumer
//! fails to open its reader. In the last case the orchestrator cancels the
//! token itself so the remaining consumers stop, and returns the error once
//! everything has been joined.

use std::io::{self, Write};
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::async_sink::AsyncSink;
use crate::broker::{Backend, BrokerLocator};
use crate::config::TailConfig;
use crate::consumer::{PartitionConsumer, PartitionReport};
use crate::error::{TailError, TailResult};
use crate::filter::Filter;
use crate::formatter::Formatter;
use crate::sink::Sink;

/// What a finished run did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TailSummary {
    /// Per-partition reports, ordered by partition
    pub partitions: Vec<PartitionReport>,
    /// Records that reached the output chain
    pub delivered: u64,
}

impl TailSummary {
    /// Records decoded and offered to the output across all partitions.
    ///
    /// Records offered after shutdown began are counted here even though the
    /// output dropped them; [`TailSummary::delivered`] counts what was printed.
    pub fn total_processed(&self) -> u64 {
        self.partitions.iter().map(|p| p.processed).sum()
    }
}

/// Build the output chain for `config` writing to `out`.
///
/// Records pass through a [`Filter`] only when filter rules are configured.
///
/// # Examples
///
/// ```
/// use logstash_kafka_tail::config::TailConfig;
/// use logstash_kafka_tail::orchestrator::output_sink;
///
/// let sink = output_sink(&TailConfig::default(), Vec::<u8>::new());
/// # drop(sink);
/// ```
pub fn output_sink<W: Write + Send + 'static>(config: &TailConfig, out: W) -> Box<dyn Sink> {
    let formatter = Formatter::new(config.template(), out);
    if config.filters.is_empty() {
        Box::new(formatter)
    } else {
        Box::new(Filter::new(config.filters.clone(), formatter))
    }
}

/// Runs a tail session against a [`Backend`]
pub struct Orchestrator<B: Backend> {
    backend: B,
    config: TailConfig,
    shutdown: CancellationToken,
}

impl<B: Backend> Orchestrator<B> {
    /// Create an orchestrator.
    ///
    /// `shutdown` is the process-wide shutdown notification.
    pub fn new(backend: B, config: TailConfig, shutdown: CancellationToken) -> Self {
        Self {
            backend,
            config,
            shutdown,
        }
    }

    /// Configuration the orchestrator runs with
    pub fn config(&self) -> &TailConfig {
        &self.config
    }

    /// Tail the configured topic to stdout
    ///
    /// # Errors
    ///
    /// See [`Orchestrator::run_with_sink`]
    pub async fn run(&self) -> TailResult<TailSummary> {
        self.run_with_sink(output_sink(&self.config, io::stdout()))
            .await
    }

    /// Tail the configured topic into `sink`.
    ///
    /// # Errors
    ///
    /// Returns `TailError::Connection` or `TailError::Metadata` if the topic
    /// layout cannot be discovered, and `TailError::HandleOpen` if any
    /// partition reader cannot be opened.
    pub async fn run_with_sink<S: Sink + 'static>(&self, sink: S) -> TailResult<TailSummary> {
        let config = &self.config;
        info!(
            topic = %config.topic,
            hosts = ?config.hosts,
            offset = %config.offset,
            filters = %config.filters.summary(),
            "Starting tail"
        );

        let locator = BrokerLocator::new(config.hosts.clone());
        let topology = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => {
                info!("Shutdown requested during broker discovery");
                return Ok(TailSummary::default());
            }
            located = locator.locate(&self.backend, &config.topic) => located?,
        };

        if topology.partitions.is_empty() {
            warn!(topic = %config.topic, "Topic has no partitions, nothing to tail");
            return Ok(TailSummary::default());
        }

        if self.shutdown.is_cancelled() {
            info!("Shutdown requested before partition consumers started");
            return Ok(TailSummary::default());
        }

        let client = Arc::new(self.backend.new_client(&topology.brokers)?);
        let output = Arc::new(AsyncSink::new(
            sink,
            config.queue_capacity,
            self.shutdown.clone(),
        ));
        output.start();

        let mut consumers = JoinSet::new();
        for &partition in &topology.partitions {
            let consumer = PartitionConsumer::new(
                config.topic.clone(),
                partition,
                config.offset,
                output.clone(),
                self.shutdown.clone(),
            );
            consumers.spawn(consumer.run(client.clone()));
        }

        let mut reports = Vec::with_capacity(topology.partitions.len());
        let mut failure = None;
        while let Some(joined) = consumers.join_next().await {
            let error = match joined {
                Ok(Ok(report)) => {
                    reports.push(report);
                    continue;
                }
                Ok(Err(e)) => e,
                Err(e) => TailError::Client(format!("partition consumer task failed: {}", e)),
            };

            error!(
                error = %error,
                fatal = error.is_fatal(),
                "Partition consumer failed, shutting down"
            );
            self.shutdown.cancel();
            failure.get_or_insert(error);
        }

        output.finish();
        let delivered = output.join().await;

        if let Some(error) = failure {
            return Err(error);
        }

        reports.sort_by_key(|report| report.partition);
        let summary = TailSummary {
            partitions: reports,
            delivered,
        };
        info!(
            partitions = summary.partitions.len(),
            processed = summary.total_processed(),
            delivered = summary.delivered,
            "Tail finished"
        );
        Ok(summary)
    }
}
