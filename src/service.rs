//! Service facade orchestrating the embedder and the dual-collection store.
//!
//! Every operation maps 1:1 to an HTTP endpoint. Store failures are degraded
//! at this boundary: they are logged and converted to a `false` flag or an
//! empty result rather than propagated, so callers only ever see a generic
//! failure signal.

use crate::embedding::Embedder;
use crate::error::Result;
use crate::store::{
    ChunkMatch, ChunkMetadata, ChunkRecord, DocumentSummary, DocumentType, VectorStore,
    group_by_document,
};
use serde::Serialize;
use std::sync::Arc;

/// Parameters for adding (or replacing) a document's chunks.
#[derive(Debug, Clone)]
pub struct AddDocumentChunks {
    pub document_id: String,
    pub document_name: String,
    pub chunks: Vec<String>,
    pub document_type: DocumentType,
    pub clause_type: Option<String>,
    pub risk_level: Option<String>,
    pub policy_id: Option<String>,
}

/// Combined result of a policy-aware search.
#[derive(Debug, Clone, Serialize)]
pub struct PolicyAwareResults {
    pub contract_chunks: Vec<ChunkMatch>,
    pub policy_chunks: Vec<ChunkMatch>,
}

/// Summary information about one document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentInfo {
    pub document_id: String,
    pub document_name: Option<String>,
    pub chunk_count: usize,
}

/// Facade over embedder + store implementing the service operations.
pub struct ChunkService {
    store: Arc<VectorStore>,
    embedder: Arc<dyn Embedder>,
}

impl ChunkService {
    pub fn new(store: Arc<VectorStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    /// Replace a document's chunks in its collection.
    ///
    /// Prior chunks for the document id are always deleted first, so an empty
    /// chunk list leaves the document with zero chunks and still succeeds.
    /// Returns `false` on any embedding or store failure.
    pub async fn add_document_chunks(&self, request: AddDocumentChunks) -> bool {
        match self.try_add_document_chunks(&request).await {
            Ok(()) => true,
            Err(error) => {
                tracing::error!(
                    %error,
                    document_id = %request.document_id,
                    "failed to add document chunks"
                );
                false
            }
        }
    }

    async fn try_add_document_chunks(&self, request: &AddDocumentChunks) -> Result<()> {
        let table = self.store.table(request.document_type);

        // Clear existing chunks for this document before inserting the new
        // batch. Two overlapping adds for the same id race here; last insert
        // wins.
        table.delete_by_document(&request.document_id).await?;

        if request.chunks.is_empty() {
            tracing::warn!(document_id = %request.document_id, "no chunks provided for document");
            return Ok(());
        }

        tracing::info!(
            document_id = %request.document_id,
            chunk_count = request.chunks.len(),
            "generating embeddings for document chunks"
        );
        let embeddings = self.embedder.embed_batch(request.chunks.clone()).await?;

        let records: Vec<ChunkRecord> = request
            .chunks
            .iter()
            .zip(embeddings)
            .enumerate()
            .map(|(index, (text, embedding))| ChunkRecord {
                id: format!("{}_chunk_{}", request.document_id, index),
                text: text.clone(),
                embedding,
                metadata: self.chunk_metadata(request, index, text),
            })
            .collect();

        table.add_chunks(&records).await?;

        tracing::info!(
            document_type = %request.document_type,
            document_name = %request.document_name,
            chunk_count = records.len(),
            "added document chunks"
        );
        Ok(())
    }

    fn chunk_metadata(&self, request: &AddDocumentChunks, index: usize, text: &str) -> ChunkMetadata {
        let mut metadata = ChunkMetadata {
            document_id: request.document_id.clone(),
            document_name: request.document_name.clone(),
            document_type: request.document_type.as_str().to_string(),
            chunk_index: index as i32,
            chunk_length: text.len() as i32,
            section_label: format!("chunk_{}", index + 1),
            clause_type: None,
            risk_level: None,
            policy_id: None,
        };

        if request.document_type == DocumentType::Policy {
            metadata.clause_type = Some(
                request
                    .clause_type
                    .clone()
                    .unwrap_or_else(|| "general".to_string()),
            );
            metadata.risk_level = Some(
                request
                    .risk_level
                    .clone()
                    .unwrap_or_else(|| "medium".to_string()),
            );
            metadata.policy_id = Some(
                request
                    .policy_id
                    .clone()
                    .unwrap_or_else(|| request.document_id.clone()),
            );
        }

        metadata
    }

    /// Semantic search over one collection.
    ///
    /// Embeds the query, runs a nearest-neighbor search, and reports
    /// similarity as `1 - distance` (cosine metric). Any failure yields an
    /// empty list indistinguishable from a query with no matches.
    pub async fn search_chunks(
        &self,
        query: &str,
        document_id: Option<&str>,
        top_k: usize,
        collection_type: DocumentType,
    ) -> Vec<ChunkMatch> {
        match self
            .try_search_chunks(query, document_id, top_k, collection_type)
            .await
        {
            Ok(matches) => {
                tracing::info!(
                    found = matches.len(),
                    collection = %collection_type,
                    query,
                    "search complete"
                );
                matches
            }
            Err(error) => {
                tracing::error!(%error, query, "failed to search chunks");
                Vec::new()
            }
        }
    }

    async fn try_search_chunks(
        &self,
        query: &str,
        document_id: Option<&str>,
        top_k: usize,
        collection_type: DocumentType,
    ) -> Result<Vec<ChunkMatch>> {
        let embedding = self.embedder.embed_one(query).await?;
        let hits = self
            .store
            .table(collection_type)
            .nearest(&embedding, top_k, document_id)
            .await?;

        Ok(hits
            .into_iter()
            .map(|hit| ChunkMatch {
                chunk_id: hit.id,
                text: hit.text,
                metadata: hit.metadata,
                similarity_score: 1.0 - hit.distance,
                distance: hit.distance,
                collection_type: collection_type.as_str().to_string(),
            })
            .collect())
    }

    /// Search both collections for policy-aware analysis.
    ///
    /// The contract side honors the document filter; the policy side never
    /// does. The two searches embed the query independently.
    pub async fn search_policy_aware(
        &self,
        query: &str,
        document_id: Option<&str>,
        contract_top_k: usize,
        policy_top_k: usize,
    ) -> PolicyAwareResults {
        let contract_chunks = self
            .search_chunks(query, document_id, contract_top_k, DocumentType::Contract)
            .await;
        let policy_chunks = self
            .search_chunks(query, None, policy_top_k, DocumentType::Policy)
            .await;

        PolicyAwareResults {
            contract_chunks,
            policy_chunks,
        }
    }

    /// Chunk count and name for one document.
    ///
    /// Checks the contract collection first and falls back to the policy
    /// collection when no chunks are found there.
    pub async fn get_document_info(&self, document_id: &str) -> DocumentInfo {
        match self.try_get_document_info(document_id).await {
            Ok(info) => info,
            Err(error) => {
                tracing::error!(%error, document_id, "failed to get document info");
                DocumentInfo {
                    document_id: document_id.to_string(),
                    document_name: None,
                    chunk_count: 0,
                }
            }
        }
    }

    async fn try_get_document_info(&self, document_id: &str) -> Result<DocumentInfo> {
        let mut rows = self
            .store
            .table(DocumentType::Contract)
            .metadata_for_document(document_id)
            .await?;

        if rows.is_empty() {
            rows = self
                .store
                .table(DocumentType::Policy)
                .metadata_for_document(document_id)
                .await?;
        }

        Ok(DocumentInfo {
            document_id: document_id.to_string(),
            document_name: rows.first().map(|row| row.document_name.clone()),
            chunk_count: rows.len(),
        })
    }

    /// Grouped summaries from one or both collections, contract first.
    pub async fn list_documents(
        &self,
        document_type: Option<DocumentType>,
    ) -> Vec<DocumentSummary> {
        match self.try_list_documents(document_type).await {
            Ok(documents) => documents,
            Err(error) => {
                tracing::error!(%error, "failed to list documents");
                Vec::new()
            }
        }
    }

    async fn try_list_documents(
        &self,
        document_type: Option<DocumentType>,
    ) -> Result<Vec<DocumentSummary>> {
        let mut documents = Vec::new();

        for collection in [DocumentType::Contract, DocumentType::Policy] {
            if document_type.is_some() && document_type != Some(collection) {
                continue;
            }
            let rows = self.store.table(collection).scan_metadata().await?;
            documents.extend(group_by_document(&rows, collection));
        }

        Ok(documents)
    }

    /// Delete all chunks for a document from the given collection.
    pub async fn delete_document(&self, document_id: &str, document_type: DocumentType) -> bool {
        match self
            .store
            .table(document_type)
            .delete_by_document(document_id)
            .await
        {
            Ok(()) => {
                tracing::info!(document_id, collection = %document_type, "deleted document chunks");
                true
            }
            Err(error) => {
                tracing::error!(%error, document_id, "failed to delete document chunks");
                false
            }
        }
    }

    /// Drop all data across both collections. Irreversible.
    pub async fn clear_all(&self) -> bool {
        match self.store.reset().await {
            Ok(()) => {
                tracing::info!("cleared all data from vector store");
                true
            }
            Err(error) => {
                tracing::error!(%error, "failed to clear vector store");
                false
            }
        }
    }
}
