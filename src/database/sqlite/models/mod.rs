
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::database::metadata::Chunk;
use crate::{RagError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct IndexHeader {
    pub dimension: i64,
    pub vector_count: i64,
    pub chunk_count: i64,
    pub embedding_model: String,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct VectorRow {
    pub ordinal: i64,
    pub embedding: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct ChunkRow {
    pub ordinal: i64,
    pub source: String,
    pub chunk_id: i64,
    pub text: String,
}

impl ChunkRow {
    #[inline]
    pub fn into_chunk(self) -> Result<Chunk> {
        let chunk_id = usize::try_from(self.chunk_id).map_err(|_| {
            RagError::Consistency(format!(
                "chunk at ordinal {} has invalid chunk_id {}",
                self.ordinal, self.chunk_id
            ))
        })?;

        Ok(Chunk {
            text: self.text,
            source: self.source,
            chunk_id,
        })
    }
}

/// Serialize a vector as packed little-endian `f32`s
#[inline]
pub fn encode_embedding(vector: &[f32]) -> Vec<u8> {
    vector.iter().flat_map(|value| value.to_le_bytes()).collect()
}

/// Inverse of [`encode_embedding`], checking the blob holds exactly `dimension` values
#[inline]
pub fn decode_embedding(blob: &[u8], dimension: usize) -> Result<Vec<f32>> {
    if blob.len() != dimension * size_of::<f32>() {
        return Err(RagError::Consistency(format!(
            "embedding blob has {} bytes, expected {} for dimension {}",
            blob.len(),
            dimension * size_of::<f32>(),
            dimension
        )));
    }

    Ok(blob
        .chunks_exact(size_of::<f32>())
        .map(|bytes| {
            let mut raw = [0u8; 4];
            raw.copy_from_slice(bytes);
            f32::from_le_bytes(raw)
        })
        .collect())
}

/// Convert a stored count to `usize`, treating negatives as corruption
#[inline]
pub fn count_from_db(value: i64, what: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| RagError::Consistency(format!("stored {} is negative: {}", what, value)))
}

#[inline]
pub fn count_to_db(value: usize) -> Result<i64> {
    i64::try_from(value)
        .map_err(|_| RagError::Database(format!("count {} does not fit in the database", value)))
}
