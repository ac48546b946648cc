//! Configuration management for logstash-kafka-tail
//!
//! Settings are resolved with the precedence CLI flag > environment variable
//! > YAML config file > built-in default. Flags and environment variables
//! arrive together through [`Cli`]; the YAML file is only read when
//! `--config` names one.

use crate::broker::StartOffset;
use crate::cli::Cli;
use crate::error::{Result, TailError, TailResult};
use crate::filter::FilterRules;
use crate::formatter::{Template, DEFAULT_FORMAT};

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Broker address used when none is configured
pub const DEFAULT_HOSTS: &str = "localhost:9092";

/// Topic tailed when none is configured
pub const DEFAULT_TOPIC: &str = "logstash";

/// Client identifier reported to the brokers by default
pub const DEFAULT_CLIENT_ID: &str = "logstash-kafka-tail";

/// Default metadata request timeout in milliseconds
pub const DEFAULT_METADATA_TIMEOUT_MS: u64 = 10_000;

/// Settings handed to the messaging client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KafkaSettings {
    /// Client identifier reported to the brokers
    pub client_id: String,
    /// Timeout applied to each metadata request
    pub metadata_timeout: Duration,
}

impl Default for KafkaSettings {
    fn default() -> Self {
        Self {
            client_id: DEFAULT_CLIENT_ID.to_string(),
            metadata_timeout: Duration::from_millis(DEFAULT_METADATA_TIMEOUT_MS),
        }
    }
}

/// Diagnostic logging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset
    pub level: String,
    /// Emit JSON instead of human-readable lines
    pub json_format: bool,
    /// Optional file that receives a copy of the logs
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            file_path: None,
        }
    }
}

impl LoggingConfig {
    /// Build logging settings from CLI flags.
    ///
    /// `--verbose` forces the debug level.
    pub fn from_cli(cli: &Cli) -> Self {
        let level = if cli.verbose {
            "debug".to_string()
        } else {
            cli.log_level.clone().unwrap_or_else(|| "info".to_string())
        };
        Self {
            level,
            json_format: cli.json_logs,
            file_path: cli.log_file.clone(),
        }
    }
}

/// Offset as written in a config file: a number or a name
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum OffsetSetting {
    /// Raw offset, with -1 / -2 meaning newest / oldest
    Raw(i64),
    /// `newest`, `oldest` or a quoted number
    Named(String),
}

impl OffsetSetting {
    fn resolve(&self) -> TailResult<StartOffset> {
        match self {
            OffsetSetting::Raw(raw) => StartOffset::from_raw(*raw),
            OffsetSetting::Named(name) => name.parse(),
        }
    }
}

/// Shape of the optional YAML config file
///
/// ```yaml
/// hosts: [kafka-1:9092, kafka-2:9092]
/// topic: app-logs
/// offset: oldest
/// format: "%{level} %{message}"
/// filters: ["type:app"]
/// queue_capacity: 100
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub hosts: Option<Vec<String>>,
    pub topic: Option<String>,
    pub offset: Option<OffsetSetting>,
    pub format: Option<String>,
    pub filters: Vec<String>,
    pub queue_capacity: Option<usize>,
    pub client_id: Option<String>,
    pub metadata_timeout_ms: Option<u64>,
}

impl FileConfig {
    /// Read and parse a YAML config file
    ///
    /// # Errors
    ///
    /// Returns `TailError::Config` if the file cannot be read or parsed
    pub fn from_file(path: &Path) -> TailResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            TailError::Config(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        serde_yaml::from_str(&contents)
            .map_err(|e| TailError::Config(format!("Failed to parse config: {}", e)))
    }
}

/// Fully resolved tail configuration
#[derive(Debug, Clone)]
pub struct TailConfig {
    /// Candidate broker addresses, tried in order
    pub hosts: Vec<String>,
    /// Topic to tail
    pub topic: String,
    /// Where each partition reader starts
    pub offset: StartOffset,
    /// Output format template source
    pub format: String,
    /// Record filters, all of which must match
    pub filters: FilterRules,
    /// Capacity of the queue feeding the output
    pub queue_capacity: usize,
    /// Messaging client settings
    pub kafka: KafkaSettings,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            hosts: vec![DEFAULT_HOSTS.to_string()],
            topic: DEFAULT_TOPIC.to_string(),
            offset: StartOffset::default(),
            format: DEFAULT_FORMAT.to_string(),
            filters: FilterRules::new(),
            queue_capacity: crate::async_sink::DEFAULT_QUEUE_CAPACITY,
            kafka: KafkaSettings::default(),
        }
    }
}

impl TailConfig {
    /// Resolve configuration from CLI flags, environment and config file.
    ///
    /// # Arguments
    ///
    /// * `cli` - Parsed CLI arguments, environment variables included
    ///
    /// # Errors
    ///
    /// Returns error if `--config` names a file that cannot be read or
    /// parsed, or if the file carries an invalid offset
    pub fn load(cli: &Cli) -> Result<Self> {
        let file = match &cli.config {
            Some(path) => FileConfig::from_file(path)?,
            None => FileConfig::default(),
        };

        let mut config = Self::default();
        let file_filters = config.apply_file(file)?;
        config.apply_cli_overrides(cli, &file_filters);

        Ok(config)
    }

    fn apply_file(&mut self, file: FileConfig) -> Result<Vec<String>> {
        if let Some(hosts) = file.hosts {
            self.hosts = normalize_hosts(hosts);
        }
        if let Some(topic) = file.topic {
            self.topic = topic;
        }
        if let Some(offset) = file.offset {
            self.offset = offset.resolve()?;
        }
        if let Some(format) = file.format {
            self.format = format;
        }
        if let Some(capacity) = file.queue_capacity {
            self.queue_capacity = capacity;
        }
        if let Some(client_id) = file.client_id {
            self.kafka.client_id = client_id;
        }
        if let Some(timeout_ms) = file.metadata_timeout_ms {
            self.kafka.metadata_timeout = Duration::from_millis(timeout_ms);
        }
        Ok(file.filters)
    }

    fn apply_cli_overrides(&mut self, cli: &Cli, file_filters: &[String]) {
        if !cli.hosts.is_empty() {
            self.hosts = normalize_hosts(cli.hosts.clone());
        }
        if let Some(topic) = &cli.topic {
            self.topic = topic.clone();
        }
        if let Some(offset) = cli.offset {
            self.offset = offset;
        }
        if let Some(format) = &cli.format {
            self.format = format.clone();
        }
        if let Some(capacity) = cli.queue_capacity {
            self.queue_capacity = capacity;
        }
        if let Some(client_id) = &cli.client_id {
            self.kafka.client_id = client_id.clone();
        }
        if let Some(timeout_ms) = cli.metadata_timeout_ms {
            self.kafka.metadata_timeout = Duration::from_millis(timeout_ms);
        }

        // File filters first so a CLI rule for the same field replaces it
        self.filters = FilterRules::parse(file_filters.iter().chain(cli.filters.iter()));
    }

    /// Whether a non-empty topic is configured
    pub fn has_topic(&self) -> bool {
        !self.topic.trim().is_empty()
    }

    /// Compile the output format
    pub fn template(&self) -> Template {
        Template::compile(&self.format)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any validation check fails
    pub fn validate(&self) -> Result<()> {
        if !self.has_topic() {
            return Err(TailError::Config("topic cannot be empty".to_string()).into());
        }

        if self.hosts.is_empty() {
            return Err(
                TailError::Config("at least one broker host is required".to_string()).into(),
            );
        }

        if self.queue_capacity == 0 {
            return Err(
                TailError::Config("queue_capacity must be greater than 0".to_string()).into(),
            );
        }

        if self.kafka.client_id.trim().is_empty() {
            return Err(TailError::Config("client_id cannot be empty".to_string()).into());
        }

        if self.kafka.metadata_timeout.is_zero() {
            return Err(TailError::Config(
                "metadata_timeout_ms must be greater than 0".to_string(),
            )
            .into());
        }

        Ok(())
    }
}

fn normalize_hosts(hosts: Vec<String>) -> Vec<String> {
    hosts
        .into_iter()
        .flat_map(|entry| {
            entry
                .split(',')
                .map(|host| host.trim().to_string())
                .collect::<Vec<_>>()
        })
        .filter(|host| !host.is_empty())
        .collect()
}
