//! Chunk records, metadata, and derived document summaries.

use serde::{Deserialize, Serialize};

/// Which of the two collections a document's chunks live in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    /// Uploaded contract documents.
    Contract,
    /// Company policy documents used for compliance checks.
    Policy,
}

impl DocumentType {
    /// String representation used in chunk metadata and API payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentType::Contract => "contract",
            DocumentType::Policy => "policy",
        }
    }

    /// Parse from string, defaulting to contract for unknown values.
    pub fn from_str(s: &str) -> Self {
        match s {
            "policy" => DocumentType::Policy,
            _ => DocumentType::Contract,
        }
    }
}

impl std::fmt::Display for DocumentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-chunk metadata stored alongside the text and embedding.
///
/// The policy fields are only populated for chunks in the policy collection;
/// contract chunks carry `None` for all three.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMetadata {
    pub document_id: String,
    pub document_name: String,
    pub document_type: String,
    pub chunk_index: i32,
    pub chunk_length: i32,
    pub section_label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clause_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}

/// A chunk row to be written to a collection.
#[derive(Debug, Clone)]
pub struct ChunkRecord {
    /// Deterministic id: `{document_id}_chunk_{index}`.
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: ChunkMetadata,
}

/// A chunk returned from a nearest-neighbor query.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// Cosine distance to the query vector, as reported by the store.
    pub distance: f32,
}

/// One search result as exposed through the API.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkMatch {
    pub chunk_id: String,
    pub text: String,
    pub metadata: ChunkMetadata,
    /// `1 - distance`; valid because queries run under the cosine metric.
    pub similarity_score: f32,
    pub distance: f32,
    pub collection_type: String,
}

/// Per-document summary derived by grouping a collection scan.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentSummary {
    pub document_id: String,
    pub document_name: String,
    pub document_type: String,
    pub chunk_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clause_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub risk_level: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub policy_id: Option<String>,
}
