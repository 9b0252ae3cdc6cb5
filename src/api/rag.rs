//! Corrective RAG endpoints

use std::path::Path;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::IntoResponse,
    Form,
};
use tracing::{debug, info};

use super::state::AppState;
use super::types::{
    ApiError, DirectoryForm, Json, MessageResponse, QueryRequest, QueryResponse, SearchDocument,
    SearchRequest, SearchResponse, ServiceInfo, UploadResponse,
};
use crate::domain::ingestion::SourceDocument;
use crate::infrastructure::services::SYSTEM_TYPE;

/// GET / - service information
pub async fn service_info() -> Json<ServiceInfo> {
    Json(ServiceInfo {
        name: env!("CARGO_PKG_NAME").to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        system_type: SYSTEM_TYPE.to_string(),
        endpoints: [
            "GET /status",
            "POST /upload/files",
            "POST /upload/directory",
            "POST /query",
            "POST /search",
            "DELETE /reset",
        ]
        .iter()
        .map(|e| e.to_string())
        .collect(),
    })
}

/// GET /status - collection information
pub async fn status(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let info = state.rag()?.status().await?;
    Ok(Json(info))
}

/// POST /upload/files - ingest uploaded text files
pub async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let rag = state.rag()?;
    let mut documents = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("Invalid multipart body: {}", e)))?
    {
        let name = field
            .file_name()
            .or_else(|| field.name())
            .unwrap_or("upload")
            .to_string();

        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("Failed to read {}: {}", name, e)))?;

        let content = String::from_utf8(bytes.to_vec()).map_err(|_| {
            ApiError::bad_request(format!("{} is not valid UTF-8 text", name)).with_param("files")
        })?;

        debug!("Received upload {} ({} bytes)", name, content.len());
        documents.push(SourceDocument::new(name, content));
    }

    if documents.is_empty() {
        return Err(ApiError::bad_request("No files uploaded").with_param("files"));
    }

    let summary = rag.add_texts(documents).await?;

    info!(
        "Uploaded {} files, {} chunks added",
        summary.files_processed, summary.chunks_added
    );

    Ok(Json(UploadResponse {
        message: format!("Successfully processed {} files", summary.files_processed),
        files_processed: summary.files_processed,
        chunks_added: summary.chunks_added,
    }))
}

/// POST /upload/directory - ingest a server-side directory
pub async fn upload_directory(
    State(state): State<AppState>,
    Form(form): Form<DirectoryForm>,
) -> Result<impl IntoResponse, ApiError> {
    let summary = state
        .rag()?
        .add_directory(Path::new(&form.directory_path), Some(&form.glob_pattern))
        .await?;

    Ok(Json(UploadResponse {
        message: format!(
            "Successfully processed directory {}",
            form.directory_path
        ),
        files_processed: summary.files_processed,
        chunks_added: summary.chunks_added,
    }))
}

/// POST /query - answer a question with self-correction
pub async fn query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.question.trim().is_empty() {
        return Err(ApiError::bad_request("Question must not be empty").with_param("question"));
    }

    let result = state
        .rag()?
        .query(&request.question, request.k, request.return_diagnostics)
        .await?;

    Ok(Json(QueryResponse::from(result)))
}

/// POST /search - similarity search without grading
pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let passages = state
        .rag()?
        .similarity_search(&request.query, request.k)
        .await?;

    Ok(Json(SearchResponse {
        documents: passages.into_iter().map(SearchDocument::from).collect(),
    }))
}

/// DELETE /reset - drop the collection
pub async fn reset(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    state.rag()?.reset().await?;

    Ok((
        StatusCode::OK,
        Json(MessageResponse {
            message: "Collection reset successfully".to_string(),
        }),
    ))
}
