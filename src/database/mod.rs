// Database module
// Flat vector index and chunk metadata, persisted together in a single SQLite file

pub mod consistency;
pub mod metadata;
pub mod sqlite;
pub mod vector_index;

pub use consistency::{ConsistencyReport, MAX_LISTED_ORDINALS};
pub use metadata::{Chunk, MetadataStore};
pub use sqlite::{DbPool, IndexSnapshot, IndexStore};
pub use vector_index::{SearchHit, VectorIndex};
