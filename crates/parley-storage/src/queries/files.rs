// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! File metadata operations.

use parley_core::RelayError;
use parley_core::types::FileMetadata;
use rusqlite::{params, OptionalExtension};

use super::{metadata_from_row, METADATA_COLUMNS};
use crate::database::{map_tr_err, Database};

/// Insert an inline file: one row holding the whole encoded payload.
pub async fn insert_inline(
    db: &Database,
    meta: &FileMetadata,
    encoded: String,
) -> Result<(), RelayError> {
    let meta = meta.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO uploaded_files (file_id, conversation_id, session_id, filename,
                     file_content, file_size, mime_type, uploaded_at, is_chunked, chunk_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0)",
                params![
                    meta.file_id,
                    meta.conversation_id,
                    meta.session_id,
                    meta.filename,
                    encoded,
                    meta.size_bytes,
                    meta.mime_type,
                    meta.uploaded_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch metadata for one file.
pub async fn get_metadata(db: &Database, file_id: &str) -> Result<Option<FileMetadata>, RelayError> {
    let file_id = file_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!("SELECT {METADATA_COLUMNS} FROM uploaded_files WHERE file_id = ?1");
            conn.query_row(&sql, params![file_id], metadata_from_row)
                .optional()
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch the inline encoded content of a file, `None` when the column is NULL.
pub async fn get_inline_content(db: &Database, file_id: &str) -> Result<Option<String>, RelayError> {
    let file_id = file_id.to_string();
    db.connection()
        .call(move |conn| {
            let content = conn
                .query_row(
                    "SELECT file_content FROM uploaded_files WHERE file_id = ?1",
                    params![file_id],
                    |row| row.get::<_, Option<String>>(0),
                )
                .optional()?;
            Ok(content.flatten())
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a file: chunk rows first, then the metadata row, in one transaction.
///
/// Returns whether a metadata row existed.
pub async fn delete_file(db: &Database, file_id: &str) -> Result<bool, RelayError> {
    let file_id = file_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "DELETE FROM uploaded_file_chunks WHERE file_id = ?1",
                params![file_id],
            )?;
            let removed = tx.execute(
                "DELETE FROM uploaded_files WHERE file_id = ?1",
                params![file_id],
            )?;
            tx.commit()?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// List file metadata for a conversation, oldest upload first.
pub async fn list_by_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<FileMetadata>, RelayError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let sql = format!(
                "SELECT {METADATA_COLUMNS} FROM uploaded_files
                 WHERE conversation_id = ?1
                 ORDER BY uploaded_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![conversation_id], metadata_from_row)?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Link unattached files to a conversation. Returns the number of rows updated.
///
/// Files already attached to a conversation are left untouched.
pub async fn attach_to_conversation(
    db: &Database,
    file_ids: &[String],
    conversation_id: &str,
) -> Result<usize, RelayError> {
    let file_ids = file_ids.to_vec();
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let mut updated = 0;
            {
                let mut stmt = tx.prepare(
                    "UPDATE uploaded_files SET conversation_id = ?1
                     WHERE file_id = ?2 AND conversation_id IS NULL",
                )?;
                for file_id in &file_ids {
                    updated += stmt.execute(params![conversation_id, file_id])?;
                }
            }
            tx.commit()?;
            Ok(updated)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of files attached to a conversation.
pub async fn count_by_conversation(db: &Database, conversation_id: &str) -> Result<u64, RelayError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM uploaded_files WHERE conversation_id = ?1",
                params![conversation_id],
                |row| row.get::<_, i64>(0),
            )
        })
        .await
        .map_err(map_tr_err)
        .map(|count| u64::try_from(count).unwrap_or_default())
}
