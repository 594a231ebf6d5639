//! Runtime settings read from the environment.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use movies_indexer_repository::opensearch::{IndexConfig, INDEX_NAME};
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::retry::RetryPolicy;
use crate::IndexingError;

/// Default OpenSearch URL.
const DEFAULT_OPENSEARCH_URL: &str = "http://localhost:9200";

/// Default schema holding the movie tables.
const DEFAULT_DB_SCHEMA: &str = "content";

/// Default location of the watermark file.
const DEFAULT_STATE_FILE_PATH: &str = "state/state.json";

/// Default sleep between cycles in seconds.
const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Default number of rows per change scan.
const DEFAULT_PAGE_SIZE: usize = 100;

const DEFAULT_RETRY_INITIAL_DELAY_MS: u64 = 100;
const DEFAULT_RETRY_MAX_DELAY_SECS: u64 = 30;

/// Connection mode for OpenSearch at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionMode {
    /// Fail immediately if the index cannot be reached.
    FailFast,
    /// Keep retrying until the index is reachable.
    Retry,
}

impl ConnectionMode {
    /// Parse the connection mode.
    ///
    /// Valid values: "fail-fast" or "retry" (case-insensitive).
    /// Defaults to "retry" if not set or invalid.
    fn parse(value: Option<String>) -> Self {
        match value
            .unwrap_or_else(|| "retry".to_string())
            .to_lowercase()
            .as_str()
        {
            "fail-fast" | "failfast" | "fail_fast" => Self::FailFast,
            "retry" => Self::Retry,
            _ => {
                warn!("Invalid OPENSEARCH_CONNECTION_MODE, defaulting to 'retry'");
                Self::Retry
            }
        }
    }
}

/// Output format of the log subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// Read `LOG_FORMAT`; anything but "json" means pretty console output.
    pub fn from_env() -> Self {
        match env::var("LOG_FORMAT") {
            Ok(value) if value.eq_ignore_ascii_case("json") => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Everything the sync needs to start.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub database_url: String,
    pub db_schema: String,
    pub opensearch_url: String,
    pub index_config: IndexConfig,
    pub state_file_path: PathBuf,
    pub poll_interval: Duration,
    pub page_size: usize,
    pub retry: RetryPolicy,
    pub connection_mode: ConnectionMode,
}

impl SyncSettings {
    /// Load settings from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DATABASE_URL`: PostgreSQL URL; if unset it is built from `DB_NAME`,
    ///   `DB_USER`, `DB_PASSWORD`, `DB_HOST` (default: localhost) and `DB_PORT` (default: 5432)
    /// - `DB_SCHEMA`: Schema holding the movie tables (default: content)
    /// - `OPENSEARCH_URL`: OpenSearch server URL (default: http://localhost:9200)
    /// - `INDEX_NAME`: Index name (default: movies)
    /// - `INDEX_SCHEMA_PATH`: Optional JSON file with index `settings` and `mappings`
    /// - `STATE_FILE_PATH`: Watermark file (default: state/state.json)
    /// - `POLL_INTERVAL_SECS`: Sleep between cycles (default: 60)
    /// - `PAGE_SIZE`: Rows per change scan (default: 100)
    /// - `RETRY_INITIAL_DELAY_MS`: First backoff delay (default: 100)
    /// - `RETRY_MAX_DELAY_SECS`: Backoff ceiling (default: 30)
    /// - `RETRY_MAX_ATTEMPTS`: Attempt cap (default: unbounded)
    /// - `OPENSEARCH_CONNECTION_MODE`: "fail-fast" or "retry" (default: retry)
    pub fn from_env() -> Result<Self, IndexingError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load settings through `lookup`, which returns the raw value of a variable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexingError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let database_url = match get("DATABASE_URL") {
            Some(url) => url,
            None => database_url_from_parts(&get)?,
        };

        let page_size = parse_or(&get, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(IndexingError::config("PAGE_SIZE must be greater than zero"));
        }

        let max_attempts = match get("RETRY_MAX_ATTEMPTS") {
            Some(raw) => {
                let attempts = parse_value::<usize>("RETRY_MAX_ATTEMPTS", &raw)?;
                if attempts == 0 {
                    return Err(IndexingError::config(
                        "RETRY_MAX_ATTEMPTS must be greater than zero",
                    ));
                }
                Some(attempts)
            }
            None => None,
        };

        let retry = RetryPolicy {
            initial_delay: Duration::from_millis(parse_or(
                &get,
                "RETRY_INITIAL_DELAY_MS",
                DEFAULT_RETRY_INITIAL_DELAY_MS,
            )?),
            max_delay: Duration::from_secs(parse_or(
                &get,
                "RETRY_MAX_DELAY_SECS",
                DEFAULT_RETRY_MAX_DELAY_SECS,
            )?),
            max_attempts,
            ..RetryPolicy::default()
        };

        let index_name = get("INDEX_NAME").unwrap_or_else(|| INDEX_NAME.to_string());
        let index_config = match get("INDEX_SCHEMA_PATH") {
            Some(path) => load_index_schema(index_name, &path)?,
            None => IndexConfig::new(index_name),
        };

        Ok(Self {
            database_url,
            db_schema: get("DB_SCHEMA").unwrap_or_else(|| DEFAULT_DB_SCHEMA.to_string()),
            opensearch_url: get("OPENSEARCH_URL")
                .unwrap_or_else(|| DEFAULT_OPENSEARCH_URL.to_string()),
            index_config,
            state_file_path: PathBuf::from(
                get("STATE_FILE_PATH").unwrap_or_else(|| DEFAULT_STATE_FILE_PATH.to_string()),
            ),
            poll_interval: Duration::from_secs(parse_or(
                &get,
                "POLL_INTERVAL_SECS",
                DEFAULT_POLL_INTERVAL_SECS,
            )?),
            page_size,
            retry,
            connection_mode: ConnectionMode::parse(get("OPENSEARCH_CONNECTION_MODE")),
        })
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, IndexingError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| IndexingError::config(format!("Invalid {}: '{}' ({})", key, raw, e)))
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, IndexingError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

/// Build a connection URL from the individual `DB_*` variables.
fn database_url_from_parts<G>(get: &G) -> Result<String, IndexingError>
where
    G: Fn(&str) -> Option<String>,
{
    let require = |key: &str| {
        get(key).ok_or_else(|| {
            IndexingError::config(format!("DATABASE_URL or {} must be set", key))
        })
    };

    let name = require("DB_NAME")?;
    let user = require("DB_USER")?;
    let password = require("DB_PASSWORD")?;
    let host = get("DB_HOST").unwrap_or_else(|| "localhost".to_string());
    let port = parse_or(get, "DB_PORT", 5432u16)?;

    let mut url = Url::parse(&format!("postgres://{}:{}/{}", host, port, name))
        .map_err(|e| IndexingError::config(format!("Invalid database host or name: {}", e)))?;
    url.set_username(&user)
        .and_then(|_| url.set_password(Some(&password)))
        .map_err(|_| IndexingError::config("Invalid database credentials"))?;

    Ok(url.to_string())
}

/// Read an index definition file with `settings` and `mappings`.
fn load_index_schema(index_name: String, path: &str) -> Result<IndexConfig, IndexingError> {
    let contents = std::fs::read_to_string(path).map_err(|e| {
        IndexingError::config(format!("Failed to read INDEX_SCHEMA_PATH '{}': {}", path, e))
    })?;
    let schema: Value = serde_json::from_str(&contents).map_err(|e| {
        IndexingError::config(format!("Invalid JSON in INDEX_SCHEMA_PATH '{}': {}", path, e))
    })?;

    IndexConfig::with_schema(index_name, schema)
        .map_err(|e| IndexingError::config(format!("Invalid index schema '{}': {}", path, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::NamedTempFile;

    fn settings(vars: &[(&str, &str)]) -> Result<SyncSettings, IndexingError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        SyncSettings::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let settings = settings(&[("DATABASE_URL", "postgres://app:secret@db:5432/movies")]).unwrap();

        assert_eq!(settings.database_url, "postgres://app:secret@db:5432/movies");
        assert_eq!(settings.db_schema, "content");
        assert_eq!(settings.opensearch_url, "http://localhost:9200");
        assert_eq!(settings.index_config.name, "movies");
        assert_eq!(settings.state_file_path, PathBuf::from("state/state.json"));
        assert_eq!(settings.poll_interval, Duration::from_secs(60));
        assert_eq!(settings.page_size, 100);
        assert_eq!(settings.retry.initial_delay, Duration::from_millis(100));
        assert_eq!(settings.retry.max_delay, Duration::from_secs(30));
        assert!(settings.retry.max_attempts.is_none());
        assert_eq!(settings.connection_mode, ConnectionMode::Retry);
    }

    #[test]
    fn test_database_url_from_parts() {
        let settings = settings(&[
            ("DB_NAME", "movies_database"),
            ("DB_USER", "app"),
            ("DB_PASSWORD", "p@ss word"),
            ("DB_HOST", "db"),
        ])
        .unwrap();

        assert_eq!(
            settings.database_url,
            "postgres://app:p%40ss%20word@db:5432/movies_database"
        );
    }

    #[test]
    fn test_missing_credentials() {
        let err = settings(&[("DB_NAME", "movies_database"), ("DB_USER", "app")]).unwrap_err();
        assert!(err.to_string().contains("DB_PASSWORD"));
    }

    #[test]
    fn test_invalid_numbers() {
        let base = ("DATABASE_URL", "postgres://localhost/movies");

        assert!(settings(&[base, ("PAGE_SIZE", "many")]).is_err());
        assert!(settings(&[base, ("PAGE_SIZE", "0")]).is_err());
        assert!(settings(&[base, ("POLL_INTERVAL_SECS", "-1")]).is_err());
        assert!(settings(&[base, ("RETRY_MAX_ATTEMPTS", "0")]).is_err());
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("DATABASE_URL", "postgres://localhost/movies"),
            ("PAGE_SIZE", "25"),
            ("POLL_INTERVAL_SECS", "5"),
            ("RETRY_MAX_ATTEMPTS", "4"),
            ("OPENSEARCH_CONNECTION_MODE", "fail-fast"),
            ("INDEX_NAME", "films"),
        ])
        .unwrap();

        assert_eq!(settings.page_size, 25);
        assert_eq!(settings.poll_interval, Duration::from_secs(5));
        assert_eq!(settings.retry.max_attempts, Some(4));
        assert_eq!(settings.connection_mode, ConnectionMode::FailFast);
        assert_eq!(settings.index_config.name, "films");
    }

    #[test]
    fn test_index_schema_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(
            file.path(),
            r#"{"settings": {"number_of_shards": 1}, "mappings": {"properties": {"title": {"type": "text"}}}}"#,
        )
        .unwrap();
        let path = file.path().to_string_lossy().to_string();

        let settings = settings(&[
            ("DATABASE_URL", "postgres://localhost/movies"),
            ("INDEX_SCHEMA_PATH", path.as_str()),
        ])
        .unwrap();

        assert_eq!(
            settings.index_config.body["mappings"]["properties"]["title"]["type"],
            "text"
        );
    }

    #[test]
    fn test_malformed_index_schema_file() {
        let file = NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "{not json").unwrap();
        let path = file.path().to_string_lossy().to_string();

        let result = settings(&[
            ("DATABASE_URL", "postgres://localhost/movies"),
            ("INDEX_SCHEMA_PATH", path.as_str()),
        ]);
        assert!(matches!(result, Err(IndexingError::ConfigError(_))));
    }
}
