// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for the file metadata and chunk tables.

pub mod chunks;
pub mod files;

/// Column list shared by every metadata query. Never includes `file_content`.
pub(crate) const METADATA_COLUMNS: &str = "file_id, conversation_id, session_id, filename, \
     mime_type, file_size, uploaded_at, is_chunked, chunk_count";

/// Map a row selected with [`METADATA_COLUMNS`].
pub(crate) fn metadata_from_row(
    row: &rusqlite::Row<'_>,
) -> rusqlite::Result<parley_core::types::FileMetadata> {
    Ok(parley_core::types::FileMetadata {
        file_id: row.get(0)?,
        conversation_id: row.get(1)?,
        session_id: row.get(2)?,
        filename: row.get(3)?,
        mime_type: row.get(4)?,
        size_bytes: row.get(5)?,
        uploaded_at: row.get(6)?,
        is_chunked: row.get(7)?,
        chunk_count: row.get(8)?,
    })
}
