// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the [`BlobStore`] trait.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use tokio::sync::OnceCell;
use tracing::{debug, error, info, warn};

use parley_config::model::StorageConfig;
use parley_core::types::{FileMetadata, NewFile};
use parley_core::{AdapterType, BlobStore, HealthStatus, PluginAdapter, RelayError};

use crate::codec;
use crate::database::{self, Database};
use crate::queries;

/// Base delay between attempts of a contended chunked write.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// SQLite-backed blob store.
///
/// Files whose encoded form fits in `chunk_size` characters are stored
/// inline in their metadata row; larger files are split into chunk rows.
/// The database is opened by [`BlobStore::initialize`].
pub struct SqliteBlobStore {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteBlobStore {
    /// Create a store. No connection is opened until `initialize`.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    pub(crate) fn db(&self) -> Result<&Database, RelayError> {
        self.db.get().ok_or_else(|| RelayError::Storage {
            source: "storage not initialized -- call initialize() first".into(),
        })
    }

    /// Write a chunked file, retrying lock contention, and remove any trace
    /// of it if every attempt fails.
    async fn put_chunked(
        &self,
        meta: &FileMetadata,
        chunks: Vec<String>,
    ) -> Result<(), RelayError> {
        let db = self.db()?;
        let chunks: Arc<[String]> = chunks.into();
        let attempts = self.config.insert_retries.max(1);

        let mut failure = String::new();
        for attempt in 1..=attempts {
            match queries::chunks::try_insert_chunked(db, meta, Arc::clone(&chunks)).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) if queries::chunks::is_transient(&e) && attempt < attempts => {
                    warn!(file_id = %meta.file_id, attempt, error = %e, "chunked write contended, retrying");
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Ok(Err(e)) => {
                    failure = e.to_string();
                    break;
                }
                Err(e) => {
                    failure = e.to_string();
                    break;
                }
            }
        }

        if let Err(e) = queries::files::delete_file(db, &meta.file_id).await {
            error!(file_id = %meta.file_id, error = %e, "compensating delete failed");
        }
        error!(
            file_id = %meta.file_id,
            filename = %meta.filename,
            chunk_count = meta.chunk_count,
            error = %failure,
            "chunked write failed"
        );
        Err(RelayError::PartialUpload {
            file_id: meta.file_id.clone(),
            filename: meta.filename.clone(),
            message: failure,
        })
    }
}

#[async_trait]
impl PluginAdapter for SqliteBlobStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Storage
    }

    async fn health_check(&self) -> Result<HealthStatus, RelayError> {
        let Ok(db) = self.db() else {
            return Ok(HealthStatus::Unhealthy("not initialized".into()));
        };
        db.connection()
            .call(|conn| {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(database::map_tr_err)?;
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), RelayError> {
        if let Some(db) = self.db.get() {
            database::checkpoint(db.connection()).await?;
            debug!("shutdown: WAL checkpoint complete");
        }
        Ok(())
    }
}

#[async_trait]
impl BlobStore for SqliteBlobStore {
    async fn initialize(&self) -> Result<(), RelayError> {
        let db = Database::open(&self.config.database_path, self.config.wal_mode).await?;
        self.db.set(db).map_err(|_| RelayError::Storage {
            source: "storage already initialized".into(),
        })?;
        info!(path = %self.config.database_path, "blob store initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), RelayError> {
        database::checkpoint(self.db()?.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    async fn put(&self, file: NewFile, data: Vec<u8>) -> Result<FileMetadata, RelayError> {
        if data.len() > self.config.max_upload_bytes {
            return Err(RelayError::Validation(format!(
                "{} is {} bytes, larger than the {} byte limit",
                file.filename,
                data.len(),
                self.config.max_upload_bytes
            )));
        }
        let db = self.db()?;

        let encoded = codec::encode_text(&data);
        let chunked = codec::needs_chunking(encoded.len(), self.config.chunk_size);
        // Every chunk is built before the first row is written.
        let chunks = if chunked {
            codec::split(&encoded, self.config.chunk_size)?
        } else {
            Vec::new()
        };

        let meta = FileMetadata {
            file_id: uuid::Uuid::new_v4().to_string(),
            conversation_id: file.conversation_id,
            session_id: file.session_id,
            filename: file.filename,
            mime_type: file.mime_type,
            size_bytes: i64::try_from(data.len())
                .map_err(|_| RelayError::Internal("file size overflows i64".into()))?,
            uploaded_at: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            is_chunked: chunked,
            chunk_count: i64::try_from(chunks.len())
                .map_err(|_| RelayError::Internal("chunk count overflows i64".into()))?,
        };

        if chunked {
            self.put_chunked(&meta, chunks).await?;
        } else {
            queries::files::insert_inline(db, &meta, encoded).await?;
        }

        info!(
            file_id = %meta.file_id,
            size_bytes = meta.size_bytes,
            chunk_count = meta.chunk_count,
            "file stored"
        );
        Ok(meta)
    }

    async fn get(&self, file_id: &str) -> Result<Vec<u8>, RelayError> {
        let db = self.db()?;
        let meta = queries::files::get_metadata(db, file_id)
            .await?
            .ok_or_else(|| RelayError::NotFound {
                file_id: file_id.to_string(),
            })?;

        if !meta.is_chunked {
            let Some(content) = queries::files::get_inline_content(db, file_id).await? else {
                warn!(file_id, "inline record has no content");
                return Err(RelayError::MissingContent {
                    file_id: file_id.to_string(),
                });
            };
            return codec::decode_text(&content);
        }

        let rows = queries::chunks::get_chunks(db, file_id).await?;
        let actual = i64::try_from(rows.len()).unwrap_or(i64::MAX);
        if actual != meta.chunk_count {
            warn!(file_id, expected = meta.chunk_count, actual, "chunk count mismatch");
            return Err(RelayError::ChunkCountMismatch {
                file_id: file_id.to_string(),
                expected: meta.chunk_count,
                actual,
            });
        }
        codec::decode_indexed(file_id, &rows)
    }

    async fn get_metadata(&self, file_id: &str) -> Result<Option<FileMetadata>, RelayError> {
        queries::files::get_metadata(self.db()?, file_id).await
    }

    async fn delete(&self, file_id: &str) -> Result<bool, RelayError> {
        let existed = queries::files::delete_file(self.db()?, file_id).await?;
        debug!(file_id, existed, "file deleted");
        Ok(existed)
    }

    async fn list_by_conversation(
        &self,
        conversation_id: &str,
    ) -> Result<Vec<FileMetadata>, RelayError> {
        queries::files::list_by_conversation(self.db()?, conversation_id).await
    }

    async fn attach_to_conversation(
        &self,
        file_ids: &[String],
        conversation_id: &str,
    ) -> Result<usize, RelayError> {
        let attached =
            queries::files::attach_to_conversation(self.db()?, file_ids, conversation_id).await?;
        debug!(conversation_id, attached, "files attached to conversation");
        Ok(attached)
    }

    async fn count_by_conversation(&self, conversation_id: &str) -> Result<u64, RelayError> {
        queries::files::count_by_conversation(self.db()?, conversation_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::map_tr_err;
    use tempfile::tempdir;

    async fn make_store(chunk_size: usize) -> (SqliteBlobStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("blobs.db").to_str().unwrap().to_string(),
            chunk_size,
            ..StorageConfig::default()
        };
        let store = SqliteBlobStore::new(config);
        store.initialize().await.unwrap();
        (store, dir)
    }

    fn new_file(name: &str, conversation: Option<&str>) -> NewFile {
        NewFile {
            conversation_id: conversation.map(str::to_string),
            session_id: "sess-1".to_string(),
            filename: name.to_string(),
            mime_type: "application/octet-stream".to_string(),
        }
    }

    fn payload(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i * 31 % 251) as u8).collect()
    }

    async fn exec(store: &SqliteBlobStore, sql: &'static str) {
        store
            .db()
            .unwrap()
            .connection()
            .call(move |conn| conn.execute_batch(sql))
            .await
            .map_err(map_tr_err)
            .unwrap();
    }

    #[tokio::test]
    async fn small_file_is_stored_inline() {
        let (store, _dir) = make_store(codec::DEFAULT_CHUNK_SIZE).await;
        let data = payload(1024);
        let meta = store.put(new_file("small.bin", None), data.clone()).await.unwrap();

        assert!(!meta.is_chunked);
        assert_eq!(meta.chunk_count, 0);
        assert_eq!(meta.size_bytes, 1024);
        assert_eq!(store.get(&meta.file_id).await.unwrap(), data);
    }

    #[tokio::test]
    async fn large_file_is_chunked_and_round_trips() {
        let (store, _dir) = make_store(codec::DEFAULT_CHUNK_SIZE).await;
        let data = payload(2 * 1024 * 1024);
        let meta = store.put(new_file("big.bin", None), data.clone()).await.unwrap();

        // 2 MiB encodes to 2_796_204 characters.
        assert!(meta.is_chunked);
        assert_eq!(meta.chunk_count, 10);
        assert_eq!(store.get(&meta.file_id).await.unwrap(), data);
    }

    #[tokio::test]
    async fn empty_file_round_trips() {
        let (store, _dir) = make_store(8).await;
        let meta = store.put(new_file("empty", None), Vec::new()).await.unwrap();
        assert!(!meta.is_chunked);
        assert_eq!(store.get(&meta.file_id).await.unwrap(), Vec::<u8>::new());
    }

    #[tokio::test]
    async fn oversize_upload_is_rejected_before_storage() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("blobs.db").to_str().unwrap().to_string(),
            max_upload_bytes: 16,
            ..StorageConfig::default()
        };
        // Not initialized: a storage attempt would fail with a Storage error.
        let store = SqliteBlobStore::new(config);
        let err = store.put(new_file("big", None), payload(17)).await.unwrap_err();
        assert!(matches!(err, RelayError::Validation(_)));
    }

    #[tokio::test]
    async fn missing_chunk_row_fails_loudly() {
        let (store, _dir) = make_store(8).await;
        let meta = store.put(new_file("f", None), payload(30)).await.unwrap();
        assert_eq!(meta.chunk_count, 5);

        exec(
            &store,
            "DELETE FROM uploaded_file_chunks WHERE chunk_index = 2",
        )
        .await;

        let err = store.get(&meta.file_id).await.unwrap_err();
        assert!(matches!(
            err,
            RelayError::ChunkCountMismatch {
                expected: 5,
                actual: 4,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn inline_record_without_content_fails_loudly() {
        let (store, _dir) = make_store(codec::DEFAULT_CHUNK_SIZE).await;
        let meta = store
            .put(new_file("hello.txt", None), b"hello world".to_vec())
            .await
            .unwrap();
        assert!(!meta.is_chunked);

        exec(&store, "UPDATE uploaded_files SET file_content = NULL").await;

        let err = store.get(&meta.file_id).await.unwrap_err();
        assert!(matches!(err, RelayError::MissingContent { ref file_id } if *file_id == meta.file_id));
        assert!(err.is_integrity_error());
    }

    #[tokio::test]
    async fn renumbered_chunk_is_reported_missing() {
        let (store, _dir) = make_store(8).await;
        let meta = store.put(new_file("f", None), payload(30)).await.unwrap();

        exec(
            &store,
            "UPDATE uploaded_file_chunks SET chunk_index = 9 WHERE chunk_index = 2",
        )
        .await;

        let err = store.get(&meta.file_id).await.unwrap_err();
        assert!(matches!(err, RelayError::ChunkMissing { index: 2, .. }));
    }

    #[tokio::test]
    async fn get_unknown_file_is_not_found() {
        let (store, _dir) = make_store(8).await;
        let err = store.get("does-not-exist").await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn failed_chunk_insert_leaves_no_rows() {
        let (store, _dir) = make_store(8).await;
        exec(
            &store,
            "CREATE TRIGGER reject_third_chunk BEFORE INSERT ON uploaded_file_chunks
             WHEN NEW.chunk_index = 3
             BEGIN SELECT RAISE(ABORT, 'disk full'); END;",
        )
        .await;

        let err = store.put(new_file("doomed.bin", Some("c1")), payload(30)).await.unwrap_err();
        let RelayError::PartialUpload {
            file_id,
            filename,
            message,
        } = err
        else {
            panic!("expected PartialUpload, got {err:?}");
        };
        assert_eq!(filename, "doomed.bin");
        assert!(message.contains("disk full"), "message: {message}");

        let db = store.db().unwrap();
        assert_eq!(queries::chunks::count_chunks(db, &file_id).await.unwrap(), 0);
        assert!(store.get_metadata(&file_id).await.unwrap().is_none());
        assert_eq!(store.count_by_conversation("c1").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn contended_chunked_write_backs_off_and_retries() {
        let (store, dir) = make_store(8).await;
        let path = dir.path().join("blobs.db");

        // Hold the write lock past one busy timeout so the first attempt
        // fails with SQLITE_BUSY and a later one succeeds.
        let (locked_tx, locked_rx) = std::sync::mpsc::channel();
        let holder = std::thread::spawn(move || {
            let conn = rusqlite::Connection::open(path).unwrap();
            conn.execute_batch("BEGIN IMMEDIATE").unwrap();
            locked_tx.send(()).unwrap();
            std::thread::sleep(Duration::from_millis(
                u64::from(database::BUSY_TIMEOUT_MS) + 500,
            ));
            conn.execute_batch("COMMIT").unwrap();
        });
        locked_rx.recv().unwrap();

        let data = payload(30);
        let meta = store.put(new_file("busy.bin", None), data.clone()).await.unwrap();
        holder.join().unwrap();

        assert!(meta.is_chunked);
        assert_eq!(store.get(&meta.file_id).await.unwrap(), data);
    }

    #[tokio::test]
    async fn delete_removes_chunks_before_metadata() {
        let (store, _dir) = make_store(8).await;
        let meta = store.put(new_file("f", None), payload(30)).await.unwrap();

        // Deleting metadata while chunk rows remain would abort.
        exec(
            &store,
            "CREATE TRIGGER chunks_first BEFORE DELETE ON uploaded_files
             WHEN EXISTS (SELECT 1 FROM uploaded_file_chunks WHERE file_id = OLD.file_id)
             BEGIN SELECT RAISE(ABORT, 'chunk rows still present'); END;",
        )
        .await;

        assert!(store.delete(&meta.file_id).await.unwrap());
        assert!(!store.delete(&meta.file_id).await.unwrap());
        let db = store.db().unwrap();
        assert_eq!(queries::chunks::count_chunks(db, &meta.file_id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn listing_never_reads_chunk_rows() {
        let (store, _dir) = make_store(8).await;
        let first = store.put(new_file("a", Some("conv")), payload(30)).await.unwrap();
        let second = store.put(new_file("b", Some("conv")), payload(3)).await.unwrap();

        exec(&store, "DROP TABLE uploaded_file_chunks").await;

        let listed = store.list_by_conversation("conv").await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|m| m.file_id.as_str()).collect();
        assert_eq!(ids, vec![first.file_id.as_str(), second.file_id.as_str()]);
        assert_eq!(store.count_by_conversation("conv").await.unwrap(), 2);
        assert!(store.get_metadata(&first.file_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn attach_links_pre_conversation_uploads() {
        let (store, _dir) = make_store(8).await;
        let meta = store.put(new_file("draft", None), payload(10)).await.unwrap();
        assert_eq!(store.count_by_conversation("conv").await.unwrap(), 0);

        let attached = store
            .attach_to_conversation(&[meta.file_id.clone()], "conv")
            .await
            .unwrap();
        assert_eq!(attached, 1);
        let listed = store.list_by_conversation("conv").await.unwrap();
        assert_eq!(listed[0].conversation_id.as_deref(), Some("conv"));
    }

    #[tokio::test]
    async fn uninitialized_store_reports_unhealthy() {
        let store = SqliteBlobStore::new(StorageConfig::default());
        assert!(matches!(
            store.health_check().await.unwrap(),
            HealthStatus::Unhealthy(_)
        ));
        let (store, _dir) = make_store(8).await;
        assert_eq!(store.health_check().await.unwrap(), HealthStatus::Healthy);
    }

    #[test]
    fn busy_and_locked_are_transient() {
        let busy = rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(5), None);
        let locked = rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(6), None);
        let constraint = rusqlite::Error::SqliteFailure(rusqlite::ffi::Error::new(19), None);
        assert!(queries::chunks::is_transient(&busy));
        assert!(queries::chunks::is_transient(&locked));
        assert!(!queries::chunks::is_transient(&constraint));
    }
}
