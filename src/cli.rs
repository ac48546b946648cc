//! Command-line interface definition for logstash-kafka-tail
//!
//! This module defines the CLI structure using clap's derive API. Every
//! tailing option can also come from a `KAFKA_LOGGING_*` environment
//! variable; values left unset here fall back to the config file and then to
//! built-in defaults (see [`crate::config::TailConfig::load`]).
//!
//! `-h` selects brokers, so help is only available as `--help`.

use clap::{ArgAction, Parser};
use std::path::PathBuf;

use crate::broker::StartOffset;

/// Tail a Kafka topic of JSON log events as formatted lines
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "logstash-kafka-tail")]
#[command(version, about, long_about = None, disable_help_flag = true)]
pub struct Cli {
    /// Kafka broker addresses, comma separated
    #[arg(short = 'h', long, env = "KAFKA_LOGGING_HOSTS", value_delimiter = ',')]
    pub hosts: Vec<String>,

    /// Kafka topic to tail
    #[arg(short, long, env = "KAFKA_LOGGING_TOPIC")]
    pub topic: Option<String>,

    /// Offset to start reading from: a number, -1/newest or -2/oldest
    #[arg(short, long, env = "KAFKA_LOGGING_OFFSET", allow_negative_numbers = true)]
    pub offset: Option<StartOffset>,

    /// Output format with %{field} or %{field1,field2} placeholders;
    /// an empty format prints each record as JSON
    #[arg(short, long, env = "KAFKA_LOGGING_FORMAT")]
    pub format: Option<String>,

    /// Only show records matching key:value (repeatable, all must match)
    #[arg(short = 'F', long = "filter", value_name = "KEY:VALUE")]
    pub filters: Vec<String>,

    /// Path to an optional YAML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Records buffered between partition consumers and the output
    #[arg(long, env = "KAFKA_LOGGING_QUEUE_CAPACITY")]
    pub queue_capacity: Option<usize>,

    /// Client identifier reported to the brokers
    #[arg(long, env = "KAFKA_LOGGING_CLIENT_ID")]
    pub client_id: Option<String>,

    /// Timeout for each broker metadata request, in milliseconds
    #[arg(long, env = "KAFKA_LOGGING_METADATA_TIMEOUT_MS")]
    pub metadata_timeout_ms: Option<u64>,

    /// Enable verbose (debug) logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Log level used when RUST_LOG is unset
    #[arg(long)]
    pub log_level: Option<String>,

    /// Emit diagnostic logs as JSON
    #[arg(long)]
    pub json_logs: bool,

    /// Also append diagnostic logs to this file
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    pub help: Option<bool>,
}

impl Cli {
    /// Parse command line arguments
    ///
    /// # Returns
    ///
    /// Returns the parsed CLI structure
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    #[test]
    fn test_cli_default() {
        let cli = Cli::default();
        assert!(cli.hosts.is_empty());
        assert!(cli.filters.is_empty());
        assert!(!cli.verbose);
        assert!(!cli.json_logs);
    }

    #[test]
    fn test_cli_parse_short_flags() {
        let cli = Cli::try_parse_from([
            "logstash-kafka-tail",
            "-h",
            "kafka-1:9092,kafka-2:9092",
            "-t",
            "app-logs",
            "-o",
            "-2",
            "-f",
            "%{level} %{message}",
        ])
        .unwrap();

        assert_eq!(cli.hosts, vec!["kafka-1:9092", "kafka-2:9092"]);
        assert_eq!(cli.topic.as_deref(), Some("app-logs"));
        assert_eq!(cli.offset, Some(StartOffset::Oldest));
        assert_eq!(cli.format.as_deref(), Some("%{level} %{message}"));
    }

    #[test]
    fn test_cli_parse_long_flags() {
        let cli = Cli::try_parse_from([
            "logstash-kafka-tail",
            "--hosts",
            "a:9092",
            "--hosts",
            "b:9092",
            "--topic",
            "t",
            "--offset",
            "newest",
        ])
        .unwrap();

        assert_eq!(cli.hosts, vec!["a:9092", "b:9092"]);
        assert_eq!(cli.offset, Some(StartOffset::Newest));
    }

    #[test]
    fn test_cli_repeated_filters() {
        let cli = Cli::try_parse_from([
            "logstash-kafka-tail",
            "-F",
            "type:chaos-monkey",
            "--filter",
            "level,severity:ERROR,WARN",
        ])
        .unwrap();

        assert_eq!(
            cli.filters,
            vec!["type:chaos-monkey", "level,severity:ERROR,WARN"]
        );
    }

    #[test]
    fn test_cli_explicit_offset() {
        let cli = Cli::try_parse_from(["logstash-kafka-tail", "-o", "1500"]).unwrap();
        assert_eq!(cli.offset, Some(StartOffset::At(1500)));
    }

    #[test]
    fn test_cli_rejects_invalid_offset() {
        let err = Cli::try_parse_from(["logstash-kafka-tail", "-o", "-7"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_cli_empty_format_is_kept() {
        let cli = Cli::try_parse_from(["logstash-kafka-tail", "-f", ""]).unwrap();
        assert_eq!(cli.format.as_deref(), Some(""));
    }

    #[test]
    fn test_cli_help_is_long_only() {
        let err = Cli::try_parse_from(["logstash-kafka-tail", "--help"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_version_flag() {
        let err = Cli::try_parse_from(["logstash-kafka-tail", "--version"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DisplayVersion);
    }

    #[test]
    fn test_cli_logging_flags() {
        let cli = Cli::try_parse_from([
            "logstash-kafka-tail",
            "-v",
            "--json-logs",
            "--log-file",
            "/tmp/tail.log",
        ])
        .unwrap();
        assert!(cli.verbose);
        assert!(cli.json_logs);
        assert_eq!(cli.log_file, Some(PathBuf::from("/tmp/tail.log")));
    }
}
