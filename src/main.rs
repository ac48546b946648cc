//! logstash-kafka-tail - follow a Kafka topic of JSON log events
//!
#![doc = "logstash-kafka-tail - follow a Kafka topic of JSON log events"]
#![doc = "Main entry point for the logstash-kafka-tail application."]

use std::time::Duration;

use anyhow::Result;
use clap::CommandFactory;
use tokio_util::sync::CancellationToken;

use logstash_kafka_tail::broker::KafkaBackend;
use logstash_kafka_tail::cli::Cli;
use logstash_kafka_tail::config::{LoggingConfig, TailConfig};
use logstash_kafka_tail::logging::init_logging;
use logstash_kafka_tail::{shutdown, Orchestrator};

/// Time left to metadata requests still running on blocking threads at exit
const BLOCKING_SHUTDOWN_GRACE: Duration = Duration::from_millis(250);

fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    init_logging(&LoggingConfig::from_cli(&cli))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let result = runtime.block_on(tail(cli));

    // An interrupted metadata request may still wait on a silent broker
    runtime.shutdown_timeout(BLOCKING_SHUTDOWN_GRACE);
    result
}

async fn tail(cli: Cli) -> Result<()> {
    // Load configuration
    let config = TailConfig::load(&cli)?;

    if !config.has_topic() {
        eprintln!("{}", Cli::command().render_help());
        std::process::exit(1);
    }

    // Validate configuration
    config.validate()?;

    let token = CancellationToken::new();
    let signals = shutdown::install(token.clone());

    let backend = KafkaBackend::new(&config.kafka);
    let result = Orchestrator::new(backend, config, token.clone()).run().await;

    token.cancel();
    if let Err(e) = signals.await {
        tracing::debug!(error = %e, "Signal task ended abnormally");
    }

    let summary = result?;
    tracing::info!(
        partitions = summary.partitions.len(),
        processed = summary.total_processed(),
        "Shutdown complete"
    );

    Ok(())
}
