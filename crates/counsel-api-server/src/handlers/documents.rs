use crate::handlers::extract::{AppJson, AppPath};
use crate::models::document::{
    DocumentListResponse, IngestTextRequest, QueryRequest, QueryResponse, UploadResponse,
};
use crate::services::{DocumentService, RagService};
use crate::utils::error::ApiError;
use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

fn upload_status(created: bool) -> StatusCode {
    if created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    }
}

pub async fn upload_handler(
    State(documents): State<Arc<DocumentService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    info!("File upload request received");

    let mut file_data: Option<Vec<u8>> = None;
    let mut filename: Option<String> = None;
    let mut title: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Failed to read field: {}", e)))?
    {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "title" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::BadRequest(format!("Invalid title: {}", e)))?;
                title = Some(text.trim().to_string()).filter(|t| !t.is_empty());
            }
            "file" => {
                filename = field.file_name().map(|s| s.to_string());
                file_data = Some(
                    field
                        .bytes()
                        .await
                        .map_err(|e| ApiError::BadRequest(format!("Failed to read file: {}", e)))?
                        .to_vec(),
                );
            }
            _ => {}
        }
    }

    let file_data = file_data.ok_or_else(|| ApiError::BadRequest("file required".to_string()))?;
    let filename = filename.ok_or_else(|| ApiError::BadRequest("filename required".to_string()))?;

    let (document, created) = documents
        .process_upload(&filename, title.as_deref(), &file_data)
        .await?;

    Ok((upload_status(created), Json(UploadResponse { document, created })))
}

pub async fn ingest_text_handler(
    State(documents): State<Arc<DocumentService>>,
    AppJson(request): AppJson<IngestTextRequest>,
) -> Result<(StatusCode, Json<UploadResponse>), ApiError> {
    request.validate()?;
    let (document, created) = documents.ingest_text(&request.title, &request.text).await?;
    Ok((upload_status(created), Json(UploadResponse { document, created })))
}

pub async fn list_documents_handler(
    State(documents): State<Arc<DocumentService>>,
) -> Json<DocumentListResponse> {
    let documents = documents.list();
    let total = documents.len();
    Json(DocumentListResponse { documents, total })
}

pub async fn delete_document_handler(
    State(documents): State<Arc<DocumentService>>,
    AppPath(id): AppPath<Uuid>,
) -> Result<StatusCode, ApiError> {
    documents.delete(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn query_handler(
    State(rag_service): State<Arc<RagService>>,
    AppJson(request): AppJson<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    request.validate()?;
    Ok(Json(rag_service.query(&request).await?))
}
