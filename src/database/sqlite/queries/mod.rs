#[cfg(test)]
mod tests;

use super::models::{ChunkRow, IndexHeader, VectorRow};
use anyhow::{Context, Result};
use sqlx::SqliteConnection;
use tracing::debug;

pub struct HeaderQueries;

impl HeaderQueries {
    #[inline]
    pub async fn get(conn: &mut SqliteConnection) -> Result<Option<IndexHeader>> {
        let header = sqlx::query_as::<_, IndexHeader>(
            r#"
            SELECT dimension,
                   vector_count,
                   chunk_count,
                   embedding_model,
                   updated_at
            FROM index_header WHERE id = 1
            "#,
        )
        .fetch_optional(conn)
        .await
        .context("Failed to read index header")?;

        Ok(header)
    }

    #[inline]
    pub async fn upsert(conn: &mut SqliteConnection, header: &IndexHeader) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO index_header (id, dimension, vector_count, chunk_count, embedding_model, updated_at)
            VALUES (1, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                dimension = excluded.dimension,
                vector_count = excluded.vector_count,
                chunk_count = excluded.chunk_count,
                embedding_model = excluded.embedding_model,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(header.dimension)
        .bind(header.vector_count)
        .bind(header.chunk_count)
        .bind(&header.embedding_model)
        .bind(header.updated_at)
        .execute(conn)
        .await
        .context("Failed to write index header")?;

        debug!(
            "Index header now records {} vectors and {} chunks",
            header.vector_count, header.chunk_count
        );
        Ok(())
    }
}

pub struct VectorQueries;

impl VectorQueries {
    #[inline]
    pub async fn insert(conn: &mut SqliteConnection, ordinal: i64, embedding: &[u8]) -> Result<()> {
        sqlx::query("INSERT INTO vectors (ordinal, embedding) VALUES (?, ?)")
            .bind(ordinal)
            .bind(embedding)
            .execute(conn)
            .await
            .with_context(|| format!("Failed to insert vector {}", ordinal))?;

        Ok(())
    }

    #[inline]
    pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<VectorRow>> {
        let rows = sqlx::query_as::<_, VectorRow>(
            "SELECT ordinal, embedding FROM vectors ORDER BY ordinal",
        )
        .fetch_all(conn)
        .await
        .context("Failed to list vectors")?;

        Ok(rows)
    }

    #[inline]
    pub async fn ordinals(conn: &mut SqliteConnection) -> Result<Vec<i64>> {
        let ordinals = sqlx::query_scalar::<_, i64>("SELECT ordinal FROM vectors ORDER BY ordinal")
            .fetch_all(conn)
            .await
            .context("Failed to list vector ordinals")?;

        Ok(ordinals)
    }
}

pub struct ChunkQueries;

impl ChunkQueries {
    #[inline]
    pub async fn insert(
        conn: &mut SqliteConnection,
        ordinal: i64,
        source: &str,
        chunk_id: i64,
        text: &str,
    ) -> Result<()> {
        sqlx::query("INSERT INTO chunks (ordinal, source, chunk_id, text) VALUES (?, ?, ?, ?)")
            .bind(ordinal)
            .bind(source)
            .bind(chunk_id)
            .bind(text)
            .execute(conn)
            .await
            .with_context(|| format!("Failed to insert chunk {}", ordinal))?;

        Ok(())
    }

    #[inline]
    pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<ChunkRow>> {
        let rows = sqlx::query_as::<_, ChunkRow>(
            "SELECT ordinal, source, chunk_id, text FROM chunks ORDER BY ordinal",
        )
        .fetch_all(conn)
        .await
        .context("Failed to list chunks")?;

        Ok(rows)
    }

    #[inline]
    pub async fn ordinals(conn: &mut SqliteConnection) -> Result<Vec<i64>> {
        let ordinals = sqlx::query_scalar::<_, i64>("SELECT ordinal FROM chunks ORDER BY ordinal")
            .fetch_all(conn)
            .await
            .context("Failed to list chunk ordinals")?;

        Ok(ordinals)
    }

    /// Distinct document names with their chunk counts
    #[inline]
    pub async fn sources(conn: &mut SqliteConnection) -> Result<Vec<(String, i64)>> {
        let sources = sqlx::query_as::<_, (String, i64)>(
            "SELECT source, COUNT(*) FROM chunks GROUP BY source ORDER BY MIN(ordinal)",
        )
        .fetch_all(conn)
        .await
        .context("Failed to list indexed sources")?;

        Ok(sources)
    }
}
