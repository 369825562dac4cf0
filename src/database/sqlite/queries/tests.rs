use super::*;
use chrono::Utc;
use sqlx::Connection;
use sqlx::sqlite::SqliteConnectOptions;
use tempfile::TempDir;

async fn migrated_connection(temp_dir: &TempDir) -> Result<SqliteConnection> {
    let options = SqliteConnectOptions::new()
        .filename(temp_dir.path().join("index.db"))
        .create_if_missing(true);
    let mut conn = SqliteConnection::connect_with(&options).await?;
    sqlx::migrate!("src/database/sqlite/migrations")
        .run(&mut conn)
        .await?;
    Ok(conn)
}

#[tokio::test]
async fn header_upsert_replaces_single_row() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut conn = migrated_connection(&temp_dir).await?;

    assert!(HeaderQueries::get(&mut conn).await?.is_none());

    let mut header = IndexHeader {
        dimension: 3,
        vector_count: 2,
        chunk_count: 2,
        embedding_model: "all-minilm".to_string(),
        updated_at: Utc::now(),
    };
    HeaderQueries::upsert(&mut conn, &header).await?;

    header.vector_count = 5;
    header.chunk_count = 5;
    HeaderQueries::upsert(&mut conn, &header).await?;

    let stored = HeaderQueries::get(&mut conn).await?.expect("header exists");
    assert_eq!(stored.vector_count, 5);
    assert_eq!(stored.dimension, 3);

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM index_header")
        .fetch_one(&mut conn)
        .await?;
    assert_eq!(rows, 1);
    Ok(())
}

#[tokio::test]
async fn rows_are_listed_by_ordinal() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut conn = migrated_connection(&temp_dir).await?;

    VectorQueries::insert(&mut conn, 1, &[1, 2, 3, 4]).await?;
    VectorQueries::insert(&mut conn, 0, &[5, 6, 7, 8]).await?;
    ChunkQueries::insert(&mut conn, 1, "b.md", 0, "second").await?;
    ChunkQueries::insert(&mut conn, 0, "a.md", 0, "first").await?;

    let vectors = VectorQueries::list_all(&mut conn).await?;
    assert_eq!(vectors[0].ordinal, 0);
    assert_eq!(vectors[0].embedding, vec![5, 6, 7, 8]);
    assert_eq!(VectorQueries::ordinals(&mut conn).await?, vec![0, 1]);

    let chunks = ChunkQueries::list_all(&mut conn).await?;
    let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "second"]);
    Ok(())
}

#[tokio::test]
async fn duplicate_ordinal_is_rejected() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut conn = migrated_connection(&temp_dir).await?;

    VectorQueries::insert(&mut conn, 0, &[0; 4]).await?;
    assert!(VectorQueries::insert(&mut conn, 0, &[0; 4]).await.is_err());
    Ok(())
}

#[tokio::test]
async fn sources_are_grouped_in_index_order() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let mut conn = migrated_connection(&temp_dir).await?;

    ChunkQueries::insert(&mut conn, 0, "guide.md", 0, "a").await?;
    ChunkQueries::insert(&mut conn, 1, "guide.md", 1, "b").await?;
    ChunkQueries::insert(&mut conn, 2, "faq.txt", 0, "c").await?;

    assert_eq!(
        ChunkQueries::sources(&mut conn).await?,
        vec![("guide.md".to_string(), 2), ("faq.txt".to_string(), 1)]
    );
    Ok(())
}
