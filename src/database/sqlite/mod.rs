use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::{Path, PathBuf};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::database::consistency::ConsistencyReport;
use crate::database::metadata::{Chunk, MetadataStore};
use crate::database::vector_index::{SearchHit, VectorIndex};
use crate::{RagError, Result};

use self::models::{
    ChunkRow, IndexHeader, count_from_db, count_to_db, decode_embedding, encode_embedding,
};
use self::queries::{ChunkQueries, HeaderQueries, VectorQueries};


pub mod models;
pub mod queries;

pub type DbPool = Pool<Sqlite>;

/// In-memory view of the persisted index plus anything appended since loading.
///
/// Rows `0..persisted` are known to be on disk; the tail is written by the
/// next [`IndexStore::save`].
#[derive(Debug, Clone)]
pub struct IndexSnapshot {
    index: VectorIndex,
    metadata: MetadataStore,
    persisted: usize,
    embedding_model: String,
}

impl IndexSnapshot {
    #[inline]
    pub fn new(dimension: usize, embedding_model: impl Into<String>) -> Result<Self> {
        Ok(Self {
            index: VectorIndex::new(dimension)?,
            metadata: MetadataStore::new(),
            persisted: 0,
            embedding_model: embedding_model.into(),
        })
    }

    #[inline]
    pub fn index(&self) -> &VectorIndex {
        &self.index
    }

    #[inline]
    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.index.dimension()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[inline]
    pub fn persisted(&self) -> usize {
        self.persisted
    }

    /// Rows appended but not yet saved
    #[inline]
    pub fn pending(&self) -> usize {
        self.len().saturating_sub(self.persisted)
    }

    #[inline]
    pub fn embedding_model(&self) -> &str {
        &self.embedding_model
    }

    /// Append vectors and their chunk records together, keeping ordinals aligned
    #[inline]
    pub fn append(&mut self, embeddings: &[Vec<f32>], chunks: Vec<Chunk>) -> Result<()> {
        if embeddings.len() != chunks.len() {
            return Err(RagError::Consistency(format!(
                "cannot append {} vectors with {} chunk records",
                embeddings.len(),
                chunks.len()
            )));
        }

        self.index.add(embeddings)?;
        self.metadata.append(chunks);
        Ok(())
    }

    /// Resolve a search hit to its chunk record; absent hits resolve to `None`
    #[inline]
    pub fn chunk_for(&self, hit: &SearchHit) -> Option<&Chunk> {
        hit.ordinal.and_then(|ordinal| self.metadata.get(ordinal))
    }

    fn aligned_len(&self) -> Result<usize> {
        if self.index.len() != self.metadata.len() {
            return Err(RagError::Consistency(format!(
                "snapshot holds {} vectors but {} chunk records",
                self.index.len(),
                self.metadata.len()
            )));
        }
        Ok(self.index.len())
    }
}

/// Durable home of the vector index and its chunk metadata: one SQLite file.
///
/// The file is only created by the first [`save`](Self::save); reads against a
/// missing file fail with [`RagError::IndexNotFound`] without touching disk.
#[derive(Debug)]
pub struct IndexStore {
    path: PathBuf,
    pool: OnceCell<DbPool>,
}

impl IndexStore {
    #[inline]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            pool: OnceCell::new(),
        }
    }

    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[inline]
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Connection pool for the store, creating the file and schema if needed
    #[inline]
    pub async fn pool(&self) -> Result<&DbPool> {
        self.pool
            .get_or_try_init(|| async {
                if let Some(parent) = self.path.parent() {
                    std::fs::create_dir_all(parent)?;
                }

                let options = SqliteConnectOptions::new()
                    .filename(&self.path)
                    .create_if_missing(true);

                let pool = SqlitePoolOptions::new()
                    .max_connections(4)
                    .connect_with(options)
                    .await
                    .map_err(|e| {
                        RagError::Database(format!("Failed to open {}: {}", self.path.display(), e))
                    })?;

                info!("Running index store migrations");
                sqlx::migrate!("src/database/sqlite/migrations")
                    .run(&pool)
                    .await
                    .map_err(|e| RagError::Database(format!("Failed to run migrations: {}", e)))?;

                debug!("Opened index store at {}", self.path.display());
                Ok::<_, RagError>(pool)
            })
            .await
    }

    async fn existing_pool(&self) -> Result<&DbPool> {
        if !self.exists() {
            return Err(RagError::IndexNotFound(self.path.clone()));
        }
        self.pool().await
    }

    /// Load the whole index into memory
    #[inline]
    pub async fn load(&self) -> Result<IndexSnapshot> {
        let pool = self.existing_pool().await?;

        // A read transaction keeps the header and rows from one commit
        let mut tx = pool.begin().await.map_err(sql_error)?;

        let Some(header) = HeaderQueries::get(&mut tx).await.map_err(db_error)? else {
            return Err(RagError::IndexNotFound(self.path.clone()));
        };
        let vectors = VectorQueries::list_all(&mut tx).await.map_err(db_error)?;
        let chunks = ChunkQueries::list_all(&mut tx).await.map_err(db_error)?;
        tx.rollback().await.map_err(sql_error)?;

        let vector_ordinals: Vec<i64> = vectors.iter().map(|row| row.ordinal).collect();
        let chunk_ordinals: Vec<i64> = chunks.iter().map(|row| row.ordinal).collect();
        let report = ConsistencyReport::check(
            count_from_db(header.vector_count, "vector_count")?,
            count_from_db(header.chunk_count, "chunk_count")?,
            &vector_ordinals,
            &chunk_ordinals,
        );
        if !report.is_consistent {
            return Err(RagError::Consistency(report.issues().join("; ")));
        }

        let dimension = count_from_db(header.dimension, "dimension")?;
        let embeddings = vectors
            .iter()
            .map(|row| decode_embedding(&row.embedding, dimension))
            .collect::<Result<Vec<_>>>()?;
        let records = chunks
            .into_iter()
            .map(ChunkRow::into_chunk)
            .collect::<Result<Vec<_>>>()?;

        let mut snapshot = IndexSnapshot::new(dimension, header.embedding_model)
            .map_err(|_| RagError::Consistency("stored dimension is zero".to_string()))?;
        snapshot.append(&embeddings, records)?;
        snapshot.persisted = snapshot.len();

        debug!(
            "Loaded {} vectors of dimension {} from {}",
            snapshot.len(),
            dimension,
            self.path.display()
        );
        Ok(snapshot)
    }

    /// Load the index, or start an empty one when nothing is stored yet
    #[inline]
    pub async fn create_or_load(
        &self,
        dimension: usize,
        embedding_model: &str,
    ) -> Result<IndexSnapshot> {
        match self.load().await {
            Ok(mut snapshot) => {
                if snapshot.dimension() != dimension {
                    return Err(RagError::DimensionMismatch {
                        expected: snapshot.dimension(),
                        found: dimension,
                    });
                }
                if snapshot.embedding_model != embedding_model {
                    warn!(
                        "Index was built with embedding model {} but {} is configured; \
                         both produce {}-dimensional vectors so indexing continues",
                        snapshot.embedding_model, embedding_model, dimension
                    );
                    snapshot.embedding_model = embedding_model.to_string();
                }
                Ok(snapshot)
            }
            Err(RagError::IndexNotFound(_)) => {
                info!(
                    "Creating new {}-dimensional index at {}",
                    dimension,
                    self.path.display()
                );
                IndexSnapshot::new(dimension, embedding_model)
            }
            Err(error) => Err(error),
        }
    }

    /// Persist the snapshot's unsaved tail and header in one transaction.
    ///
    /// Fails without writing if another writer saved since this snapshot was
    /// loaded.
    #[inline]
    pub async fn save(&self, snapshot: &mut IndexSnapshot) -> Result<()> {
        let total = snapshot.aligned_len()?;
        if total == snapshot.persisted && self.exists() {
            debug!("Nothing to save to {}", self.path.display());
            return Ok(());
        }

        let pool = self.pool().await?;
        let mut tx = pool.begin().await.map_err(sql_error)?;

        let stored = HeaderQueries::get(&mut tx).await.map_err(db_error)?;
        if let Some(header) = &stored {
            let stored_dimension = count_from_db(header.dimension, "dimension")?;
            if stored_dimension != snapshot.dimension() {
                return Err(RagError::DimensionMismatch {
                    expected: stored_dimension,
                    found: snapshot.dimension(),
                });
            }
        }

        let stored_vectors = match &stored {
            Some(header) => count_from_db(header.vector_count, "vector_count")?,
            None => 0,
        };
        if stored_vectors != snapshot.persisted {
            return Err(RagError::Database(format!(
                "index at {} changed concurrently: expected {} stored vectors, found {}",
                self.path.display(),
                snapshot.persisted,
                stored_vectors
            )));
        }

        for ordinal in snapshot.persisted..total {
            let db_ordinal = count_to_db(ordinal)?;
            let vector = snapshot.index.vector(ordinal).ok_or_else(|| {
                RagError::Consistency(format!("vector {} missing from snapshot", ordinal))
            })?;
            let chunk = snapshot.metadata.get(ordinal).ok_or_else(|| {
                RagError::Consistency(format!("chunk {} missing from snapshot", ordinal))
            })?;

            VectorQueries::insert(&mut tx, db_ordinal, &encode_embedding(vector))
                .await
                .map_err(db_error)?;
            ChunkQueries::insert(
                &mut tx,
                db_ordinal,
                &chunk.source,
                count_to_db(chunk.chunk_id)?,
                &chunk.text,
            )
            .await
            .map_err(db_error)?;
        }

        let header = IndexHeader {
            dimension: count_to_db(snapshot.dimension())?,
            vector_count: count_to_db(total)?,
            chunk_count: count_to_db(total)?,
            embedding_model: snapshot.embedding_model.clone(),
            updated_at: Utc::now(),
        };
        HeaderQueries::upsert(&mut tx, &header)
            .await
            .map_err(db_error)?;

        tx.commit().await.map_err(sql_error)?;

        info!(
            "Saved {} new vectors to {} ({} total)",
            total - snapshot.persisted,
            self.path.display(),
            total
        );
        snapshot.persisted = total;
        Ok(())
    }

    /// Stored header, failing with `IndexNotFound` when nothing has been saved
    #[inline]
    pub async fn header(&self) -> Result<IndexHeader> {
        let pool = self.existing_pool().await?;
        let mut conn = pool.acquire().await.map_err(sql_error)?;

        HeaderQueries::get(&mut conn)
            .await
            .map_err(db_error)?
            .ok_or_else(|| RagError::IndexNotFound(self.path.clone()))
    }

    /// Indexed document names with their chunk counts, in indexing order
    #[inline]
    pub async fn sources(&self) -> Result<Vec<(String, usize)>> {
        let pool = self.existing_pool().await?;
        let mut conn = pool.acquire().await.map_err(sql_error)?;

        ChunkQueries::sources(&mut conn)
            .await
            .map_err(db_error)?
            .into_iter()
            .map(|(source, count)| Ok((source, count_from_db(count, "chunk count")?)))
            .collect()
    }

    /// Compare the header counts against the rows actually stored
    #[inline]
    pub async fn consistency_report(&self) -> Result<ConsistencyReport> {
        let pool = self.existing_pool().await?;
        let mut tx = pool.begin().await.map_err(sql_error)?;

        let header = HeaderQueries::get(&mut tx)
            .await
            .map_err(db_error)?
            .ok_or_else(|| RagError::IndexNotFound(self.path.clone()))?;
        let vector_ordinals = VectorQueries::ordinals(&mut tx).await.map_err(db_error)?;
        let chunk_ordinals = ChunkQueries::ordinals(&mut tx).await.map_err(db_error)?;
        tx.rollback().await.map_err(sql_error)?;

        Ok(ConsistencyReport::check(
            count_from_db(header.vector_count, "vector_count")?,
            count_from_db(header.chunk_count, "chunk_count")?,
            &vector_ordinals,
            &chunk_ordinals,
        ))
    }
}

fn db_error(error: anyhow::Error) -> RagError {
    RagError::Database(format!("{:#}", error))
}

fn sql_error(error: sqlx::Error) -> RagError {
    RagError::Database(error.to_string())
}
