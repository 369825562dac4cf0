// Index store consistency checks
// Compares the header counts against the vector and chunk rows actually stored

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{info, warn};

/// Upper bound on the missing ordinals listed per table
pub const MAX_LISTED_ORDINALS: usize = 32;

/// Result of comparing the index header with the stored rows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConsistencyReport {
    /// Vector count recorded in the header
    pub header_vectors: usize,
    /// Chunk count recorded in the header
    pub header_chunks: usize,
    /// Number of rows in the vectors table
    pub vector_rows: usize,
    /// Number of rows in the chunks table
    pub chunk_rows: usize,
    /// Number of ordinals below the header count with no vector row
    pub missing_vector_count: usize,
    /// Number of ordinals below the header count with no chunk row
    pub missing_chunk_count: usize,
    /// The first missing vector ordinals, at most `MAX_LISTED_ORDINALS`
    pub missing_vectors: Vec<i64>,
    /// The first missing chunk ordinals, at most `MAX_LISTED_ORDINALS`
    pub missing_chunks: Vec<i64>,
    /// Vector rows outside `0..header_vectors`
    pub unexpected_vectors: Vec<i64>,
    /// Chunk rows outside `0..header_chunks`
    pub unexpected_chunks: Vec<i64>,
    /// Overall consistency status
    pub is_consistent: bool,
}

impl ConsistencyReport {
    /// Build a report from the header counts and the ordinals present in each table
    #[inline]
    pub fn check(
        header_vectors: usize,
        header_chunks: usize,
        vector_ordinals: &[i64],
        chunk_ordinals: &[i64],
    ) -> Self {
        let vectors = diff_ordinals(header_vectors, vector_ordinals);
        let chunks = diff_ordinals(header_chunks, chunk_ordinals);

        let is_consistent = header_vectors == header_chunks
            && vectors.missing_count == 0
            && chunks.missing_count == 0
            && vectors.unexpected.is_empty()
            && chunks.unexpected.is_empty();

        let report = Self {
            header_vectors,
            header_chunks,
            vector_rows: vector_ordinals.len(),
            chunk_rows: chunk_ordinals.len(),
            missing_vector_count: vectors.missing_count,
            missing_chunk_count: chunks.missing_count,
            missing_vectors: vectors.missing,
            missing_chunks: chunks.missing,
            unexpected_vectors: vectors.unexpected,
            unexpected_chunks: chunks.unexpected,
            is_consistent,
        };
        report.log();
        report
    }

    /// Get a human-readable summary of the consistency report
    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "Index is consistent: {} vectors aligned with {} chunks",
                self.vector_rows, self.chunk_rows
            )
        } else {
            format!("Index inconsistencies found: {}", self.issues().join("; "))
        }
    }

    /// Describe each problem found, empty when consistent
    #[inline]
    pub fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.header_vectors != self.header_chunks {
            issues.push(format!(
                "header records {} vectors but {} chunks",
                self.header_vectors, self.header_chunks
            ));
        }
        if self.missing_vector_count > 0 {
            issues.push(format!("{} vector rows missing", self.missing_vector_count));
        }
        if self.missing_chunk_count > 0 {
            issues.push(format!("{} chunk rows missing", self.missing_chunk_count));
        }
        if !self.unexpected_vectors.is_empty() {
            issues.push(format!(
                "{} vector rows beyond the recorded count",
                self.unexpected_vectors.len()
            ));
        }
        if !self.unexpected_chunks.is_empty() {
            issues.push(format!(
                "{} chunk rows beyond the recorded count",
                self.unexpected_chunks.len()
            ));
        }

        issues
    }

    /// Get the total number of consistency issues
    #[inline]
    pub fn total_issues(&self) -> usize {
        self.missing_vector_count
            .saturating_add(self.missing_chunk_count)
            .saturating_add(self.unexpected_vectors.len())
            .saturating_add(self.unexpected_chunks.len())
            .saturating_add(usize::from(self.header_vectors != self.header_chunks))
    }

    fn log(&self) {
        if self.is_consistent {
            info!("Index consistency validation passed");
            return;
        }

        warn!("Index consistency validation found issues");
        for issue in self.issues() {
            warn!("Index store: {}", issue);
        }
    }
}

struct OrdinalDiff {
    missing_count: usize,
    missing: Vec<i64>,
    unexpected: Vec<i64>,
}

/// Split stored ordinals against the expected `0..expected` range.
///
/// Work is bounded by the number of stored rows, not by `expected`, so an
/// inflated header count cannot exhaust memory.
fn diff_ordinals(expected: usize, present: &[i64]) -> OrdinalDiff {
    let present: BTreeSet<i64> = present.iter().copied().collect();
    let (in_range, unexpected): (Vec<i64>, Vec<i64>) = present
        .into_iter()
        .partition(|&ordinal| usize::try_from(ordinal).is_ok_and(|o| o < expected));

    let missing = gaps(expected, &in_range)
        .take(MAX_LISTED_ORDINALS)
        .collect();

    OrdinalDiff {
        missing_count: expected - in_range.len(),
        missing,
        unexpected,
    }
}

/// Lazily yield the ordinals of `0..expected` absent from the sorted `in_range`
fn gaps(expected: usize, in_range: &[i64]) -> impl Iterator<Item = i64> + '_ {
    let end = i64::try_from(expected).unwrap_or(i64::MAX);
    in_range
        .iter()
        .copied()
        .chain(std::iter::once(end))
        .scan(0_i64, |next, bound| {
            let gap = *next..bound;
            *next = bound.saturating_add(1);
            Some(gap)
        })
        .flatten()
}
