//! Dual-collection vector store backed by LanceDB.
//!
//! Contract chunks and policy chunks live in two independent tables searched
//! separately. Persistence, filtering, and nearest-neighbor retrieval are all
//! delegated to lancedb; this layer only owns the schema and the two handles.

pub mod grouping;
pub mod models;
pub mod table;

use crate::error::Result;
use arc_swap::ArcSwap;
use std::path::Path;
use std::sync::Arc;

pub use grouping::group_by_document;
pub use models::{
    ChunkHit, ChunkMatch, ChunkMetadata, ChunkRecord, DocumentSummary, DocumentType,
};
pub use table::ChunkTable;

/// Table name for uploaded contract chunks.
const CONTRACT_TABLE: &str = "uploaded_contracts";
/// Table name for company policy chunks.
const POLICY_TABLE: &str = "contract_policy";

/// Persistent store holding both chunk collections.
///
/// Table handles sit behind `ArcSwap` so `reset` can drop and recreate the
/// tables without exclusive access to the store.
pub struct VectorStore {
    connection: lancedb::Connection,
    contract: ArcSwap<ChunkTable>,
    policy: ArcSwap<ChunkTable>,
}

impl VectorStore {
    /// Open the store at `data_dir`, creating both collections if absent.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| anyhow::anyhow!("failed to create data dir: {}", e))?;

        let connection = lancedb::connect(&data_dir.to_string_lossy())
            .execute()
            .await
            .map_err(|e| crate::error::DbError::LanceDb(e.to_string()))?;

        let contract = ChunkTable::open_or_create(&connection, CONTRACT_TABLE).await?;
        let policy = ChunkTable::open_or_create(&connection, POLICY_TABLE).await?;

        tracing::info!(
            data_dir = %data_dir.display(),
            contract_table = CONTRACT_TABLE,
            policy_table = POLICY_TABLE,
            "vector store opened with dual collections"
        );

        Ok(Self {
            connection,
            contract: ArcSwap::from_pointee(contract),
            policy: ArcSwap::from_pointee(policy),
        })
    }

    /// Table handle for the given collection.
    pub fn table(&self, document_type: DocumentType) -> Arc<ChunkTable> {
        match document_type {
            DocumentType::Contract => self.contract.load_full(),
            DocumentType::Policy => self.policy.load_full(),
        }
    }

    /// Drop all data across both collections and recreate them empty.
    /// Destructive and irreversible.
    pub async fn reset(&self) -> Result<()> {
        for name in [CONTRACT_TABLE, POLICY_TABLE] {
            if let Err(error) = self.connection.drop_table(name, &[]).await {
                tracing::warn!(%error, table = name, "drop_table failed during reset, proceeding");
            }
        }

        let contract = ChunkTable::open_or_create(&self.connection, CONTRACT_TABLE).await?;
        let policy = ChunkTable::open_or_create(&self.connection, POLICY_TABLE).await?;
        self.contract.store(Arc::new(contract));
        self.policy.store(Arc::new(policy));

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{DocumentType, VectorStore};
    use crate::store::models::{ChunkMetadata, ChunkRecord};

    fn record(document_id: &str, document_type: &str, index: i32) -> ChunkRecord {
        ChunkRecord {
            id: format!("{document_id}_chunk_{index}"),
            text: "some text".to_string(),
            embedding: vec![1.0; 384],
            metadata: ChunkMetadata {
                document_id: document_id.to_string(),
                document_name: format!("{document_id}.pdf"),
                document_type: document_type.to_string(),
                chunk_index: index,
                chunk_length: 9,
                section_label: format!("chunk_{}", index + 1),
                clause_type: None,
                risk_level: None,
                policy_id: None,
            },
        }
    }

    #[tokio::test]
    async fn collections_are_independent() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = VectorStore::open(temp.path()).await.expect("open store");

        store
            .table(DocumentType::Contract)
            .add_chunks(&[record("doc_a", "contract", 0)])
            .await
            .expect("add contract chunk");

        assert_eq!(
            store.table(DocumentType::Contract).count().await.expect("count"),
            1
        );
        assert_eq!(
            store.table(DocumentType::Policy).count().await.expect("count"),
            0
        );
    }

    #[tokio::test]
    async fn reset_clears_both_collections() {
        let temp = tempfile::tempdir().expect("tempdir");
        let store = VectorStore::open(temp.path()).await.expect("open store");

        store
            .table(DocumentType::Contract)
            .add_chunks(&[record("doc_a", "contract", 0)])
            .await
            .expect("add contract chunk");
        store
            .table(DocumentType::Policy)
            .add_chunks(&[record("pol_a", "policy", 0)])
            .await
            .expect("add policy chunk");

        store.reset().await.expect("reset");

        assert_eq!(
            store.table(DocumentType::Contract).count().await.expect("count"),
            0
        );
        assert_eq!(
            store.table(DocumentType::Policy).count().await.expect("count"),
            0
        );
    }
}
