// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunk row operations and the transactional chunked write.

use std::sync::Arc;

use parley_core::RelayError;
use parley_core::types::{FileChunk, FileMetadata};
use rusqlite::{params, ErrorCode};

use crate::database::{map_tr_err, Database};

/// One attempt at writing a chunked file: the metadata row plus every chunk
/// row, committed together or not at all.
///
/// The outer error is a connection failure; the inner one is the SQLite error
/// that rolled the transaction back, kept intact so callers can decide
/// whether to retry.
pub async fn try_insert_chunked(
    db: &Database,
    meta: &FileMetadata,
    chunks: Arc<[String]>,
) -> Result<Result<(), rusqlite::Error>, RelayError> {
    let meta = meta.clone();
    db.connection()
        .call(move |conn| Ok(write_chunked(conn, &meta, &chunks)))
        .await
        .map_err(map_tr_err)
}

fn write_chunked(
    conn: &mut rusqlite::Connection,
    meta: &FileMetadata,
    chunks: &[String],
) -> Result<(), rusqlite::Error> {
    let tx = conn.transaction()?;
    tx.execute(
        "INSERT INTO uploaded_files (file_id, conversation_id, session_id, filename,
             file_content, file_size, mime_type, uploaded_at, is_chunked, chunk_count)
         VALUES (?1, ?2, ?3, ?4, NULL, ?5, ?6, ?7, 1, ?8)",
        params![
            meta.file_id,
            meta.conversation_id,
            meta.session_id,
            meta.filename,
            meta.size_bytes,
            meta.mime_type,
            meta.uploaded_at,
            meta.chunk_count,
        ],
    )?;
    {
        let mut stmt = tx.prepare(
            "INSERT INTO uploaded_file_chunks (file_id, chunk_index, chunk_content)
             VALUES (?1, ?2, ?3)",
        )?;
        for (index, chunk) in (0_i64..).zip(chunks) {
            stmt.execute(params![meta.file_id, index, chunk])?;
        }
    }
    tx.commit()
}

/// True for lock contention errors worth retrying.
pub fn is_transient(err: &rusqlite::Error) -> bool {
    matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked)
    )
}

/// All chunk rows of a file, ordered by index.
pub async fn get_chunks(db: &Database, file_id: &str) -> Result<Vec<FileChunk>, RelayError> {
    let file_id = file_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT file_id, chunk_index, chunk_content FROM uploaded_file_chunks
                 WHERE file_id = ?1 ORDER BY chunk_index ASC",
            )?;
            let rows = stmt.query_map(params![file_id], |row| {
                Ok(FileChunk {
                    file_id: row.get(0)?,
                    chunk_index: row.get(1)?,
                    chunk_content: row.get(2)?,
                })
            })?;
            rows.collect::<Result<Vec<_>, _>>()
        })
        .await
        .map_err(map_tr_err)
}

/// Number of chunk rows stored for a file.
pub async fn count_chunks(db: &Database, file_id: &str) -> Result<i64, RelayError> {
    let file_id = file_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.query_row(
                "SELECT COUNT(*) FROM uploaded_file_chunks WHERE file_id = ?1",
                params![file_id],
                |row| row.get(0),
            )
        })
        .await
        .map_err(map_tr_err)
}
