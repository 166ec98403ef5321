//! Route handlers for the article-processing API.

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{Multipart, Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use scriba_extract::{allowed_file, sanitize_text, MAX_TEXT_LENGTH};
use scriba_pipeline::{Orchestrator, PipelineRun};
use scriba_types::Stage;

use crate::error::ApiError;

/// Shared application state accessible from Axum routes.
#[derive(Clone)]
pub struct AppState {
    pub db: sqlx::SqlitePool,
    pub orchestrator: Arc<Orchestrator>,
    pub uploads_dir: PathBuf,
}

// ---------------------------------------------------------------------------
// GET /health
// ---------------------------------------------------------------------------

pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "Scriba Article Processing API",
        "version": env!("CARGO_PKG_VERSION"),
        "providers": state.orchestrator.provider_names(),
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// ---------------------------------------------------------------------------
// GET /status
// ---------------------------------------------------------------------------

pub async fn status(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    let upload_count = std::fs::read_dir(&state.uploads_dir)
        .map(|entries| entries.count())
        .unwrap_or(0);
    let article_count = scriba_store::count_articles(&state.db).await?;

    Ok(Json(json!({
        "server_status": "running",
        "uploads_folder": state.uploads_dir.display().to_string(),
        "upload_count": upload_count,
        "article_count": article_count,
        "max_revisions": state.orchestrator.config().max_revisions,
        "timestamp": Utc::now().to_rfc3339(),
    })))
}

// ---------------------------------------------------------------------------
// POST /process_article
// ---------------------------------------------------------------------------

pub async fn process_article(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Value>, ApiError> {
    // Pull the uploaded file out of the form. The field is called 'pdf' for
    // historical reasons; it accepts .txt uploads as well.
    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Malformed multipart body: {e}")))?
    {
        if field.name() == Some("pdf") {
            let filename = field
                .file_name()
                .map(sanitize_filename)
                .unwrap_or_default();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::bad_request(format!("Failed to read upload: {e}")))?;
            upload = Some((filename, bytes.to_vec()));
            break;
        }
    }

    let (filename, bytes) = upload
        .ok_or_else(|| ApiError::bad_request("File not found; use the multipart field 'pdf'"))?;

    if filename.is_empty() {
        return Err(ApiError::bad_request("Uploaded file has no name"));
    }
    if !allowed_file(&filename) {
        return Err(ApiError::bad_request(
            "Only PDF and TXT files are supported",
        ));
    }

    let file_size = bytes.len();
    let file_type = if filename.to_ascii_lowercase().ends_with(".pdf") {
        "PDF"
    } else {
        "TXT"
    };

    // Persist the upload under a unique name so concurrent clients with the
    // same filename never clobber each other.
    let stored_name = format!("{}_{}", uuid::Uuid::new_v4(), filename);
    let stored_path = state.uploads_dir.join(&stored_name);
    tokio::fs::write(&stored_path, &bytes)
        .await
        .map_err(|e| ApiError::new(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;
    tracing::info!(file = %filename, bytes = file_size, "Upload saved");

    let raw_text = scriba_extract::extract_text(&stored_path)
        .map_err(|e| ApiError::bad_request(format!("Text extraction failed: {e}")))?;
    let article_text = sanitize_text(&raw_text, MAX_TEXT_LENGTH);

    if article_text.is_empty() {
        return Err(scriba_types::ScribaError::EmptyInput.into());
    }

    let run = state.orchestrator.run(&article_text).await?;
    let record = match &run.record {
        Some(record) => record,
        None => return Err(ApiError::bad_request("Article produced no result")),
    };

    let article_id = scriba_store::save_article(&state.db, record).await?;

    Ok(Json(success_response(
        &filename,
        file_type,
        file_size,
        article_id,
        &run,
    )))
}

/// Drop any path components a client smuggles into the filename.
fn sanitize_filename(name: &str) -> String {
    std::path::Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default()
        .to_string()
}

/// Shape the success payload for one processed article.
fn success_response(
    filename: &str,
    file_type: &str,
    file_size: usize,
    article_id: i64,
    run: &PipelineRun,
) -> Value {
    let state = &run.state;
    json!({
        "status": "success",
        "filename": filename,
        "file_type": file_type,
        "timestamp": Utc::now().to_rfc3339(),
        "results": {
            "rubrics": state.slot(Stage::Rubric).artifact.trim(),
            "keywords": state.slot(Stage::Keyword).artifact.trim(),
            "normalization": state.slot(Stage::Normal).artifact.trim(),
            "summary": state.slot(Stage::Summary).artifact.trim(),
        },
        "metadata": {
            "article_id": article_id,
            "text_length": state.article_text.chars().count(),
            "revision_counts": {
                "rubric": state.slot(Stage::Rubric).revision_count,
                "keyword": state.slot(Stage::Keyword).revision_count,
                "normal": state.slot(Stage::Normal).revision_count,
                "summary": state.slot(Stage::Summary).revision_count,
            },
            "status": state.status,
            "file_size_kb": file_size as f64 / 1024.0,
        },
    })
}

// ---------------------------------------------------------------------------
// GET /articles/{id} and GET /articles
// ---------------------------------------------------------------------------

pub async fn get_article(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<scriba_store::ArticleRecord>, ApiError> {
    match scriba_store::get_article(&state.db, id).await? {
        Some(article) => Ok(Json(article)),
        None => Err(ApiError::not_found(format!("Article {id} not found"))),
    }
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<scriba_store::ArticleSummary>>, ApiError> {
    let limit = params.limit.unwrap_or(10).clamp(1, 100);
    let articles = scriba_store::list_articles(&state.db, limit).await?;
    Ok(Json(articles))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
