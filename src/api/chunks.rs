//! Request/response types and handlers for the chunk endpoints.

use super::state::ApiState;

use crate::service::AddDocumentChunks;
use crate::store::{ChunkMatch, DocumentSummary, DocumentType};

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ---------------------------------------------------------------------------
// Query / request / response types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub(super) struct AddDocumentChunksRequest {
    document_id: String,
    document_name: String,
    chunks: Vec<String>,
    #[serde(default = "default_document_type")]
    document_type: String,
    #[serde(default)]
    clause_type: Option<String>,
    #[serde(default)]
    risk_level: Option<String>,
    #[serde(default)]
    policy_id: Option<String>,
}

fn default_document_type() -> String {
    "contract".to_string()
}

#[derive(Deserialize)]
pub(super) struct SearchRequest {
    query: String,
    #[serde(default)]
    document_id: Option<String>,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

fn default_top_k() -> usize {
    5
}

#[derive(Deserialize)]
pub(super) struct PolicyAwareSearchRequest {
    query: String,
    #[serde(default)]
    document_id: Option<String>,
    #[serde(default = "default_policy_aware_top_k")]
    contract_top_k: usize,
    #[serde(default = "default_policy_aware_top_k")]
    policy_top_k: usize,
}

fn default_policy_aware_top_k() -> usize {
    3
}

#[derive(Deserialize)]
pub(super) struct ListDocumentsQuery {
    #[serde(default)]
    document_type: Option<String>,
}

#[derive(Deserialize)]
pub(super) struct DeleteDocumentQuery {
    #[serde(default)]
    document_type: Option<String>,
}

#[derive(Serialize)]
pub(super) struct AddChunksResponse {
    success: bool,
    message: String,
    chunk_count: usize,
}

#[derive(Serialize)]
pub(super) struct SearchResponse {
    chunks: Vec<ChunkMatch>,
    total_found: usize,
    query: String,
}

#[derive(Serialize)]
pub(super) struct PolicyAwareSearchResponse {
    contract_chunks: Vec<ChunkMatch>,
    policy_chunks: Vec<ChunkMatch>,
    query: String,
}

#[derive(Serialize)]
pub(super) struct DocumentInfoResponse {
    document_id: String,
    document_name: Option<String>,
    chunk_count: usize,
}

#[derive(Serialize)]
pub(super) struct DocumentsResponse {
    documents: Vec<DocumentSummary>,
}

#[derive(Serialize)]
pub(super) struct StatusResponse {
    success: bool,
    message: String,
}

/// Generic server error carrying a plain-text detail message, rendered as
/// `500 {"detail": "..."}`.
pub(super) struct ApiError(String);

impl ApiError {
    fn new(detail: impl Into<String>) -> Self {
        Self(detail.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(serde_json::json!({ "detail": self.0 })),
        )
            .into_response()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Health check endpoint.
pub(super) async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "clausebase",
        "vector_store_ready": true,
    }))
}

/// Add (or replace) a document's chunks in the vector store.
pub(super) async fn add_document_chunks(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<AddDocumentChunksRequest>,
) -> Result<Json<AddChunksResponse>, ApiError> {
    let document_id = request.document_id.clone();
    let document_name = request.document_name.clone();
    let chunk_count = request.chunks.len();

    let success = state
        .service
        .add_document_chunks(AddDocumentChunks {
            document_id: request.document_id,
            document_name: request.document_name,
            chunks: request.chunks,
            document_type: DocumentType::from_str(&request.document_type),
            clause_type: request.clause_type,
            risk_level: request.risk_level,
            policy_id: request.policy_id,
        })
        .await;

    if !success {
        return Err(ApiError::new("Failed to add document chunks"));
    }

    // Report the stored chunk count rather than the submitted one.
    let info = state.service.get_document_info(&document_id).await;
    Ok(Json(AddChunksResponse {
        success: true,
        message: format!("Added {chunk_count} chunks for document: {document_name}"),
        chunk_count: info.chunk_count,
    }))
}

/// Search the contract collection for relevant chunks.
pub(super) async fn search_chunks(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<SearchRequest>,
) -> Json<SearchResponse> {
    let chunks = state
        .service
        .search_chunks(
            &request.query,
            request.document_id.as_deref(),
            request.top_k,
            DocumentType::Contract,
        )
        .await;

    Json(SearchResponse {
        total_found: chunks.len(),
        chunks,
        query: request.query,
    })
}

/// Search both collections for policy-aware analysis.
pub(super) async fn search_policy_aware(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<PolicyAwareSearchRequest>,
) -> Json<PolicyAwareSearchResponse> {
    let results = state
        .service
        .search_policy_aware(
            &request.query,
            request.document_id.as_deref(),
            request.contract_top_k,
            request.policy_top_k,
        )
        .await;

    Json(PolicyAwareSearchResponse {
        contract_chunks: results.contract_chunks,
        policy_chunks: results.policy_chunks,
        query: request.query,
    })
}

/// Chunk count and name for one document.
pub(super) async fn document_info(
    State(state): State<Arc<ApiState>>,
    Path(document_id): Path<String>,
) -> Json<DocumentInfoResponse> {
    let info = state.service.get_document_info(&document_id).await;
    Json(DocumentInfoResponse {
        document_id: info.document_id,
        document_name: info.document_name,
        chunk_count: info.chunk_count,
    })
}

/// List per-document summaries across one or both collections.
pub(super) async fn list_documents(
    State(state): State<Arc<ApiState>>,
    Query(query): Query<ListDocumentsQuery>,
) -> Json<DocumentsResponse> {
    let document_type = query.document_type.as_deref().map(DocumentType::from_str);
    let documents = state.service.list_documents(document_type).await;
    Json(DocumentsResponse { documents })
}

/// Delete all chunks for one document.
///
/// The collection is chosen by the optional `document_type` query parameter,
/// defaulting to the contract collection.
pub(super) async fn delete_document(
    State(state): State<Arc<ApiState>>,
    Path(document_id): Path<String>,
    Query(query): Query<DeleteDocumentQuery>,
) -> Result<Json<StatusResponse>, ApiError> {
    let document_type = query
        .document_type
        .as_deref()
        .map(DocumentType::from_str)
        .unwrap_or(DocumentType::Contract);

    if !state.service.delete_document(&document_id, document_type).await {
        return Err(ApiError::new("Failed to delete document chunks"));
    }

    Ok(Json(StatusResponse {
        success: true,
        message: format!("Deleted chunks for document: {document_id}"),
    }))
}

/// Clear all data from both collections.
pub(super) async fn clear_all(
    State(state): State<Arc<ApiState>>,
) -> Result<Json<StatusResponse>, ApiError> {
    if !state.service.clear_all().await {
        return Err(ApiError::new("Failed to clear vector store"));
    }

    Ok(Json(StatusResponse {
        success: true,
        message: "Cleared all data from vector store".to_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::{AddDocumentChunksRequest, PolicyAwareSearchRequest, SearchRequest};

    #[test]
    fn search_request_defaults_top_k() {
        let request: SearchRequest =
            serde_json::from_str(r#"{"query": "termination"}"#).expect("deserialize");
        assert_eq!(request.top_k, 5);
        assert!(request.document_id.is_none());
    }

    #[test]
    fn policy_aware_request_defaults_both_limits() {
        let request: PolicyAwareSearchRequest =
            serde_json::from_str(r#"{"query": "liability", "document_id": "doc_a"}"#)
                .expect("deserialize");
        assert_eq!(request.contract_top_k, 3);
        assert_eq!(request.policy_top_k, 3);
        assert_eq!(request.document_id.as_deref(), Some("doc_a"));
    }

    #[test]
    fn add_request_defaults_to_contract_type() {
        let request: AddDocumentChunksRequest = serde_json::from_str(
            r#"{"document_id": "doc_a", "document_name": "a.pdf", "chunks": ["x"]}"#,
        )
        .expect("deserialize");
        assert_eq!(request.document_type, "contract");
        assert!(request.clause_type.is_none());
    }
}
