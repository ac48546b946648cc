use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}

/// Environment variables the binary reads for its settings
#[allow(dead_code)]
pub const TAIL_ENV_VARS: &[&str] = &[
    "KAFKA_LOGGING_HOSTS",
    "KAFKA_LOGGING_TOPIC",
    "KAFKA_LOGGING_OFFSET",
    "KAFKA_LOGGING_FORMAT",
    "KAFKA_LOGGING_QUEUE_CAPACITY",
    "KAFKA_LOGGING_CLIENT_ID",
    "KAFKA_LOGGING_METADATA_TIMEOUT_MS",
];
