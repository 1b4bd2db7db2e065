// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Encoded characters per chunk row; also the inline-vs-chunked threshold.
pub const DEFAULT_CHUNK_SIZE: usize = 300_000;

/// Largest raw upload accepted (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Top-level Parley configuration.
///
/// Loaded once at process start from TOML files and environment variables,
/// then treated as immutable.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParleyConfig {
    /// HTTP listener and logging settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Relay behavior (mock mode, thread tagging).
    #[serde(default)]
    pub relay: RelayConfig,

    /// Upstream agent API settings.
    #[serde(default)]
    pub agent: AgentConfig,

    /// Blob storage settings.
    #[serde(default)]
    pub storage: StorageConfig,
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            log_level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Relay configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RelayConfig {
    /// Synthesize replies locally instead of calling the upstream agent.
    #[serde(default)]
    pub mock_mode: bool,

    /// Tag sent with every thread-creation call.
    #[serde(default = "default_origin_application")]
    pub origin_application: String,

    /// Agent to bind new threads and turns to. `None` uses the service default.
    #[serde(default)]
    pub agent_id: Option<String>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            mock_mode: false,
            origin_application: default_origin_application(),
            agent_id: None,
        }
    }
}

fn default_origin_application() -> String {
    "parley".to_string()
}

/// Upstream agent API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AgentConfig {
    /// Base URL of the agent API (no trailing slash).
    #[serde(default)]
    pub base_url: String,

    /// Bearer token. `None` sends unauthenticated requests.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Whole-request timeout applied by the HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Retries for transient statuses before streaming starts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    300
}

fn default_max_retries() -> u32 {
    1
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,

    /// Maximum encoded characters per chunk row.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Largest raw upload accepted, in bytes.
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    /// Attempts for the chunked-write transaction before giving up.
    #[serde(default = "default_insert_retries")]
    pub insert_retries: u32,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
            chunk_size: default_chunk_size(),
            max_upload_bytes: default_max_upload_bytes(),
            insert_retries: default_insert_retries(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("parley").join("parley.db"))
        .and_then(|p| p.to_str().map(String::from))
        .unwrap_or_else(|| "parley.db".to_string())
}

fn default_wal_mode() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

fn default_insert_retries() -> u32 {
    3
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_defaults_match_limits() {
        let storage = StorageConfig::default();
        assert_eq!(storage.chunk_size, 300_000);
        assert_eq!(storage.max_upload_bytes, 10_485_760);
        assert_eq!(storage.insert_retries, 3);
        assert!(storage.wal_mode);
    }

    #[test]
    fn relay_defaults_to_live_mode() {
        let relay = RelayConfig::default();
        assert!(!relay.mock_mode);
        assert_eq!(relay.origin_application, "parley");
        assert!(relay.agent_id.is_none());
    }

    #[test]
    fn relay_section_rejects_unknown_fields() {
        let result = toml::from_str::<ParleyConfig>("[relay]\nmock_mdoe = true\n");
        assert!(result.is_err());
    }
}
