// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for Parley.

use thiserror::Error;

/// The primary error type used across all Parley adapter traits and core operations.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Client-caused input errors (malformed message shape, stream flag, oversize upload).
    #[error("validation error: {0}")]
    Validation(String),

    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// The upstream agent service failed (thread creation or streaming call).
    #[error("upstream unavailable: {message}")]
    UpstreamUnavailable {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Storage backend errors (database connection, query failure, migrations).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// No file record exists for the requested id.
    #[error("file not found: {file_id}")]
    NotFound { file_id: String },

    /// The number of stored chunk rows disagrees with the recorded chunk count.
    #[error("chunk count mismatch for {file_id}: expected {expected}, found {actual}")]
    ChunkCountMismatch {
        file_id: String,
        expected: i64,
        actual: i64,
    },

    /// A chunk index in `0..chunk_count` has no row.
    #[error("chunk {index} missing for {file_id}")]
    ChunkMissing { file_id: String, index: i64 },

    /// An inline record has no stored content.
    #[error("stored content missing for {file_id}")]
    MissingContent { file_id: String },

    /// Chunks were supplied to the codec out of index order.
    #[error("chunk out of order: expected index {expected}, found {found}")]
    ChunkOutOfOrder { expected: i64, found: i64 },

    /// The encoded payload could not be decoded.
    #[error("codec error: {0}")]
    Codec(String),

    /// A chunked write failed part-way; rows for the file were removed.
    #[error("upload of {filename} ({file_id}) failed: {message}")]
    PartialUpload {
        file_id: String,
        filename: String,
        message: String,
    },

    /// The client side of a stream has gone away.
    #[error("client disconnected")]
    Disconnected,

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Shorthand for an upstream failure without an underlying source.
    pub fn upstream(message: impl Into<String>) -> Self {
        RelayError::UpstreamUnavailable {
            message: message.into(),
            source: None,
        }
    }

    /// Returns true for errors caused by the client's input.
    pub fn is_client_error(&self) -> bool {
        matches!(self, RelayError::Validation(_) | RelayError::NotFound { .. })
    }

    /// Returns true for storage integrity violations detected on read.
    pub fn is_integrity_error(&self) -> bool {
        matches!(
            self,
            RelayError::ChunkCountMismatch { .. }
                | RelayError::ChunkMissing { .. }
                | RelayError::ChunkOutOfOrder { .. }
                | RelayError::MissingContent { .. }
        )
    }
}
