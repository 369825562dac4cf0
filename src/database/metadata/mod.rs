
use serde::{Deserialize, Serialize};

/// One indexed span of a source document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub source: String,
    /// Position of the chunk within its source document
    pub chunk_id: usize,
}

impl Chunk {
    #[inline]
    pub fn new(text: impl Into<String>, source: impl Into<String>, chunk_id: usize) -> Self {
        Self {
            text: text.into(),
            source: source.into(),
            chunk_id,
        }
    }
}

/// Append-only chunk records; entry `i` describes vector `i` of the index
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataStore {
    records: Vec<Chunk>,
}

impl MetadataStore {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn from_records(records: Vec<Chunk>) -> Self {
        Self { records }
    }

    #[inline]
    pub fn append(&mut self, records: impl IntoIterator<Item = Chunk>) {
        self.records.extend(records);
    }

    #[inline]
    pub fn get(&self, ordinal: usize) -> Option<&Chunk> {
        self.records.get(ordinal)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[inline]
    pub fn records(&self) -> &[Chunk] {
        &self.records
    }
}
