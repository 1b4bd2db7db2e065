// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Blob store trait for uploaded file content.

use async_trait::async_trait;

use crate::error::RelayError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{FileMetadata, NewFile};

/// Persists logical files either inline or as an ordered chunk set.
///
/// Every read goes to the backing store; implementations keep no content cache.
#[async_trait]
pub trait BlobStore: PluginAdapter {
    /// Initializes the backend (connection, migrations).
    async fn initialize(&self) -> Result<(), RelayError>;

    /// Flushes pending writes and releases the backend.
    async fn close(&self) -> Result<(), RelayError>;

    /// Stores a payload under a freshly generated file id.
    async fn put(&self, file: NewFile, data: Vec<u8>) -> Result<FileMetadata, RelayError>;

    /// Reconstructs the exact bytes of a stored file.
    async fn get(&self, file_id: &str) -> Result<Vec<u8>, RelayError>;

    async fn get_metadata(&self, file_id: &str) -> Result<Option<FileMetadata>, RelayError>;

    /// Removes chunk rows, then the metadata row. Returns whether the file existed.
    async fn delete(&self, file_id: &str) -> Result<bool, RelayError>;

    /// Metadata for every file in a conversation. Never reads content.
    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<FileMetadata>, RelayError>;

    /// Links previously unattached uploads to a conversation.
    async fn attach_to_conversation(
        &self,
        file_ids: &[String],
        conversation_id: &str,
    ) -> Result<usize, RelayError>;

    async fn count_by_conversation(&self, conversation_id: &str) -> Result<u64, RelayError>;
}
