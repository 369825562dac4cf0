
use std::cmp::Ordering;

use crate::embeddings::dot;
use crate::{RagError, Result};

/// One ranked result of a similarity search.
///
/// `ordinal` is `None` for padding when the index holds fewer than `k` vectors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchHit {
    pub ordinal: Option<usize>,
    pub score: f32,
}

impl SearchHit {
    #[inline]
    pub fn absent() -> Self {
        Self {
            ordinal: None,
            score: f32::NEG_INFINITY,
        }
    }

    #[inline]
    pub fn is_absent(&self) -> bool {
        self.ordinal.is_none()
    }
}

/// Append-only flat index scored by inner product.
///
/// Vectors are stored contiguously; ordinal `i` occupies
/// `data[i * dimension..(i + 1) * dimension]`.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorIndex {
    dimension: usize,
    data: Vec<f32>,
}

impl VectorIndex {
    #[inline]
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(RagError::InvalidRequest(
                "vector dimension must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            dimension,
            data: Vec::new(),
        })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len() / self.dimension
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn vector(&self, ordinal: usize) -> Option<&[f32]> {
        let start = ordinal.checked_mul(self.dimension)?;
        self.data.get(start..start.checked_add(self.dimension)?)
    }

    /// Append vectors in order. Nothing is added if any vector has the wrong length.
    #[inline]
    pub fn add(&mut self, vectors: &[Vec<f32>]) -> Result<()> {
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.dimension) {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                found: bad.len(),
            });
        }

        self.data.reserve(vectors.len() * self.dimension);
        for vector in vectors {
            self.data.extend_from_slice(vector);
        }
        Ok(())
    }

    /// Return exactly `k` hits, best first, padded with absent hits
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<SearchHit>> {
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                found: query.len(),
            });
        }
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut hits: Vec<SearchHit> = self
            .data
            .chunks_exact(self.dimension)
            .enumerate()
            .map(|(ordinal, vector)| SearchHit {
                ordinal: Some(ordinal),
                score: dot(query, vector),
            })
            .collect();

        hits.sort_by(compare_hits);
        hits.truncate(k);
        hits.resize(k, SearchHit::absent());
        Ok(hits)
    }
}

/// Descending score, then ascending ordinal
fn compare_hits(a: &SearchHit, b: &SearchHit) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.ordinal.cmp(&b.ordinal))
}
