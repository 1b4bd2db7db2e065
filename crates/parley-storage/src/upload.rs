// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch upload ingestion.
//!
//! Each file in a batch is stored independently; one failure never aborts
//! the rest of the batch.

use parley_core::BlobStore;
use parley_core::types::{FileMetadata, NewFile};
use serde::Serialize;
use tracing::warn;

/// A file that could not be stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadFailure {
    pub filename: String,
    pub error: String,
}

/// Result of ingesting a batch of files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub uploaded: Vec<FileMetadata>,
    pub errors: Vec<UploadFailure>,
}

impl UploadOutcome {
    /// A batch succeeds unless every file in it failed.
    pub fn success(&self) -> bool {
        !self.uploaded.is_empty() || self.errors.is_empty()
    }
}

/// Store every file of a batch, collecting per-file failures.
pub async fn ingest_batch(
    store: &dyn BlobStore,
    files: Vec<(NewFile, Vec<u8>)>,
) -> UploadOutcome {
    let mut outcome = UploadOutcome::default();
    for (file, data) in files {
        let filename = file.filename.clone();
        match store.put(file, data).await {
            Ok(meta) => outcome.uploaded.push(meta),
            Err(e) => {
                warn!(filename = %filename, error = %e, "upload rejected");
                outcome.errors.push(UploadFailure {
                    filename,
                    error: e.to_string(),
                });
            }
        }
    }
    outcome
}
