// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite persistence for uploaded files.
//!
//! Provides WAL-mode SQLite storage with embedded migrations, a single-writer
//! model via `tokio-rusqlite`, a base64 chunk codec, and a [`BlobStore`]
//! implementation that stores small files inline and large files as ordered
//! chunk rows.
//!
//! [`BlobStore`]: parley_core::BlobStore

pub mod adapter;
pub mod codec;
pub mod database;
pub mod migrations;
pub mod queries;
pub mod upload;

pub use adapter::SqliteBlobStore;
pub use database::Database;
pub use upload::{ingest_batch, UploadFailure, UploadOutcome};
