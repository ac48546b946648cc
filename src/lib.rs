//! logstash-kafka-tail - follow a Kafka topic of JSON log events
//!
//! This library provides the tail pipeline: broker discovery with failover,
//! one consumer task per partition, a bounded asynchronous output queue,
//! record filtering and template-based formatting.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `broker`: Messaging-client traits, failover topology discovery and the rdkafka backend
//! - `consumer`: Per-partition consumer task
//! - `orchestrator`: Wires discovery, consumers and the output chain together
//! - `async_sink`: Bounded queue decoupling consumers from the output
//! - `filter`: Field/value record filters
//! - `formatter`: `%{field}` display templates
//! - `record`: Decoded log records and value stringification
//! - `sink`: The record destination trait shared by the output chain
//! - `shutdown`: SIGINT/SIGTERM handling via a shared cancellation token
//! - `logging`: Diagnostic logging to stderr
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`: Command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use logstash_kafka_tail::broker::KafkaBackend;
//! use logstash_kafka_tail::{Orchestrator, TailConfig};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = TailConfig::default();
//!     config.validate()?;
//!
//!     let backend = KafkaBackend::new(&config.kafka);
//!     let summary = Orchestrator::new(backend, config, CancellationToken::new())
//!         .run()
//!         .await?;
//!     println!("{} records", summary.total_processed());
//!     Ok(())
//! }
//! ```

pub mod async_sink;
pub mod broker;
pub mod cli;
pub mod config;
pub mod consumer;
pub mod error;
pub mod filter;
pub mod formatter;
pub mod logging;
pub mod orchestrator;
pub mod record;
pub mod shutdown;
pub mod sink;

// Re-export commonly used types
pub use config::TailConfig;
pub use error::{Result, TailError, TailResult};
pub use filter::{Filter, FilterRules};
pub use formatter::{Formatter, Template};
pub use orchestrator::{Orchestrator, TailSummary};
pub use record::Record;
pub use sink::Sink;

#[cfg(test)]
pub mod test_utils;
