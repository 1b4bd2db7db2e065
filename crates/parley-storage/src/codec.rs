// SPDX-FileCopyrightText: 2026 Parley Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Chunk codec: base64 text split into bounded-size pieces.
//!
//! Splitting happens on the encoded text, never on raw bytes, so every chunk
//! is plain ASCII and the concatenation of all chunks is a valid base64 string.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parley_core::RelayError;
use parley_core::types::FileChunk;

pub use parley_config::model::DEFAULT_CHUNK_SIZE;

/// Base64-encode `bytes`.
pub fn encode_text(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

/// Encode `bytes` and split the encoded text every `max_chunk_size` characters.
///
/// Produces `ceil(L / max_chunk_size)` chunks for encoded length `L`; empty
/// input produces no chunks.
pub fn encode(bytes: &[u8], max_chunk_size: usize) -> Result<Vec<String>, RelayError> {
    split(&encode_text(bytes), max_chunk_size)
}

/// Split already-encoded text into chunks of at most `max_chunk_size`.
pub fn split(encoded: &str, max_chunk_size: usize) -> Result<Vec<String>, RelayError> {
    if max_chunk_size == 0 {
        return Err(RelayError::Internal(
            "chunk size must be greater than zero".into(),
        ));
    }
    // base64 output is ASCII, so byte offsets are char boundaries.
    Ok((0..encoded.len())
        .step_by(max_chunk_size)
        .map(|start| encoded[start..encoded.len().min(start + max_chunk_size)].to_string())
        .collect())
}

/// Concatenate chunks in the given order and decode.
pub fn decode<S: AsRef<str>>(chunks: &[S]) -> Result<Vec<u8>, RelayError> {
    let joined: String = chunks.iter().map(AsRef::as_ref).collect();
    decode_text(&joined)
}

/// Decode a single base64 string.
pub fn decode_text(encoded: &str) -> Result<Vec<u8>, RelayError> {
    STANDARD
        .decode(encoded)
        .map_err(|e| RelayError::Codec(e.to_string()))
}

/// Decode `(chunk_index, text)` pairs after checking the indices run `0, 1, 2, ...`.
///
/// A skipped index is reported as [`RelayError::ChunkMissing`]; an index
/// lower than expected (duplicate or reversed) as [`RelayError::ChunkOutOfOrder`].
pub fn decode_indexed(file_id: &str, chunks: &[FileChunk]) -> Result<Vec<u8>, RelayError> {
    for (expected, chunk) in (0_i64..).zip(chunks) {
        let index = chunk.chunk_index;
        if index > expected {
            return Err(RelayError::ChunkMissing {
                file_id: file_id.to_string(),
                index: expected,
            });
        }
        if index < expected {
            return Err(RelayError::ChunkOutOfOrder {
                expected,
                found: index,
            });
        }
    }
    let joined: String = chunks.iter().map(|c| c.chunk_content.as_str()).collect();
    decode_text(&joined)
}

/// True when an encoded payload of `encoded_len` characters must be chunked.
pub fn needs_chunking(encoded_len: usize, threshold: usize) -> bool {
    encoded_len > threshold
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn rows(chunks: &[(i64, &str)]) -> Vec<FileChunk> {
        chunks
            .iter()
            .map(|(index, text)| FileChunk {
                file_id: "f1".to_string(),
                chunk_index: *index,
                chunk_content: text.to_string(),
            })
            .collect()
    }

    #[test]
    fn empty_input_has_no_chunks() {
        let chunks = encode(&[], 8).unwrap();
        assert!(chunks.is_empty());
        assert_eq!(decode(&chunks).unwrap(), Vec::<u8>::new());
    }

    #[test]
    fn zero_chunk_size_is_internal_error() {
        let err = encode(b"abc", 0).unwrap_err();
        assert!(matches!(err, RelayError::Internal(_)));
    }

    #[test]
    fn splits_on_encoded_text() {
        // "hello world" encodes to 16 characters.
        let chunks = encode(b"hello world", 5).unwrap();
        assert_eq!(chunks, vec!["aGVsb", "G8gd2", "9ybGQ", "="]);
        assert_eq!(decode(&chunks).unwrap(), b"hello world");
    }

    #[test]
    fn indexed_gap_is_chunk_missing() {
        let chunks = rows(&[(0, "aGVs"), (2, "bG8=")]);
        let err = decode_indexed("f1", &chunks).unwrap_err();
        assert!(matches!(err, RelayError::ChunkMissing { index: 1, .. }));
    }

    #[test]
    fn indexed_leading_gap_is_chunk_missing() {
        let chunks = rows(&[(1, "aGVs")]);
        let err = decode_indexed("f1", &chunks).unwrap_err();
        assert!(matches!(err, RelayError::ChunkMissing { index: 0, .. }));
    }

    #[test]
    fn indexed_duplicate_is_out_of_order() {
        let chunks = rows(&[(0, "aGVs"), (0, "bG8=")]);
        let err = decode_indexed("f1", &chunks).unwrap_err();
        assert!(matches!(
            err,
            RelayError::ChunkOutOfOrder {
                expected: 1,
                found: 0
            }
        ));
    }

    #[test]
    fn indexed_in_order_decodes() {
        let chunks = rows(&[(0, "aGVs"), (1, "bG8=")]);
        assert_eq!(decode_indexed("f1", &chunks).unwrap(), b"hello");
    }

    #[test]
    fn corrupt_text_is_codec_error() {
        let err = decode(&["not base64!!"]).unwrap_err();
        assert!(matches!(err, RelayError::Codec(_)));
    }

    #[test]
    fn chunking_threshold_is_exclusive() {
        assert!(!needs_chunking(300_000, DEFAULT_CHUNK_SIZE));
        assert!(needs_chunking(300_001, DEFAULT_CHUNK_SIZE));
        assert!(!needs_chunking(0, DEFAULT_CHUNK_SIZE));
    }

    proptest! {
        #[test]
        fn decode_inverts_encode(bytes in proptest::collection::vec(any::<u8>(), 0..4096), size in 1usize..512) {
            let chunks = encode(&bytes, size).unwrap();
            prop_assert_eq!(decode(&chunks).unwrap(), bytes);
        }

        #[test]
        fn chunk_count_and_lengths(bytes in proptest::collection::vec(any::<u8>(), 0..4096), size in 1usize..512) {
            let encoded_len = encode_text(&bytes).len();
            let chunks = encode(&bytes, size).unwrap();
            prop_assert_eq!(chunks.len(), encoded_len.div_ceil(size));
            if let Some((last, rest)) = chunks.split_last() {
                prop_assert!(rest.iter().all(|c| c.len() == size));
                prop_assert!(!last.is_empty() && last.len() <= size);
            }
        }

        #[test]
        fn indexed_decode_matches_plain_decode(bytes in proptest::collection::vec(any::<u8>(), 1..2048), size in 1usize..256) {
            let chunks = encode(&bytes, size).unwrap();
            let indexed: Vec<FileChunk> = (0_i64..)
                .zip(chunks)
                .map(|(chunk_index, chunk_content)| FileChunk {
                    file_id: "f".to_string(),
                    chunk_index,
                    chunk_content,
                })
                .collect();
            prop_assert_eq!(decode_indexed("f", &indexed).unwrap(), bytes);
        }
    }
}
