//! SQLite persistence for indexed articles.

use std::path::Path;
use std::str::FromStr;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use scriba_types::IndexedRecord;

/// A stored article, as read back from the database.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArticleRecord {
    pub id: i64,
    pub article_text: String,
    pub rubric: String,
    pub keywords: String,
    pub summary: String,
    pub normalized: String,
    pub created_at: String,
}

/// Listing row: the heavy text columns are left out.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ArticleSummary {
    pub id: i64,
    pub rubric: String,
    pub keywords: String,
    pub created_at: String,
}

/// Open (or create) the database at `path` and run schema creation.
pub async fn init_db(path: &Path) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&format!("sqlite:{}", path.display()))?
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    init_schema(&pool).await?;
    tracing::info!(db = %path.display(), "Article database ready");
    Ok(pool)
}

/// Create tables (idempotent). Split out so tests can run against
/// `sqlite::memory:` pools.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS articles (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            article_text TEXT    NOT NULL,
            rubric       TEXT    NOT NULL DEFAULT '',
            keywords     TEXT    NOT NULL DEFAULT '',
            summary      TEXT    NOT NULL DEFAULT '',
            normalized   TEXT    NOT NULL DEFAULT '',
            created_at   TEXT    NOT NULL DEFAULT (datetime('now'))
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// Insert one indexed record. Returns the row id.
pub async fn save_article(pool: &SqlitePool, record: &IndexedRecord) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO articles (article_text, rubric, keywords, summary, normalized, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&record.article_text)
    .bind(&record.rubric)
    .bind(&record.keywords)
    .bind(&record.summary)
    .bind(&record.normalized)
    .bind(record.timestamp.to_rfc3339())
    .execute(pool)
    .await?;

    let id = result.last_insert_rowid();
    tracing::info!(article_id = id, "Article saved");
    Ok(id)
}

/// Fetch one article by id.
pub async fn get_article(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<ArticleRecord>, sqlx::Error> {
    let row = sqlx::query_as::<_, (i64, String, String, String, String, String, String)>(
        r#"
        SELECT id, article_text, rubric, keywords, summary, normalized, created_at
        FROM articles
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(
        |(id, article_text, rubric, keywords, summary, normalized, created_at)| ArticleRecord {
            id,
            article_text,
            rubric,
            keywords,
            summary,
            normalized,
            created_at,
        },
    ))
}

/// List the most recent articles, newest first.
pub async fn list_articles(
    pool: &SqlitePool,
    limit: i64,
) -> Result<Vec<ArticleSummary>, sqlx::Error> {
    let rows = sqlx::query_as::<_, (i64, String, String, String)>(
        r#"
        SELECT id, rubric, keywords, created_at
        FROM articles
        ORDER BY created_at DESC, id DESC
        LIMIT ?
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|(id, rubric, keywords, created_at)| ArticleSummary {
            id,
            rubric,
            keywords,
            created_at,
        })
        .collect())
}

/// Number of stored articles.
pub async fn count_articles(pool: &SqlitePool) -> Result<i64, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM articles")
        .fetch_one(pool)
        .await?;
    Ok(count)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
