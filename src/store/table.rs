//! LanceDB table management for one chunk collection.

use crate::error::{DbError, Result};
use crate::store::models::{ChunkHit, ChunkMetadata, ChunkRecord};
use arrow_array::cast::AsArray;
use arrow_array::types::{Float32Type, Int32Type};
use arrow_array::{Array, RecordBatch, RecordBatchIterator, StringArray};
use futures::TryStreamExt;
use std::sync::Arc;

/// Embedding dimension enforced at the store boundary.
const EMBEDDING_DIM: i32 = 384;

/// LanceDB table holding the chunks of one collection.
pub struct ChunkTable {
    table: lancedb::Table,
}

impl Clone for ChunkTable {
    fn clone(&self) -> Self {
        Self {
            table: self.table.clone(),
        }
    }
}

impl ChunkTable {
    /// Open existing table or create a new one.
    ///
    /// If the table exists but is corrupted (e.g. process killed mid-write),
    /// it is dropped and recreated.
    pub async fn open_or_create(
        connection: &lancedb::Connection,
        name: &'static str,
    ) -> Result<Self> {
        match connection.open_table(name).execute().await {
            Ok(table) => return Ok(Self { table }),
            Err(error) => {
                tracing::debug!(%error, table = name, "failed to open chunk table, will create");
            }
        }

        match Self::create_empty_table(connection, name).await {
            Ok(table) => return Ok(Self { table }),
            Err(error) => {
                tracing::warn!(
                    %error,
                    table = name,
                    "failed to create chunk table, attempting recovery from corrupted state"
                );
            }
        }

        // Both open and create failed — table data exists but is corrupted.
        // Drop it and recreate from scratch.
        if let Err(error) = connection.drop_table(name, &[]).await {
            tracing::warn!(%error, table = name, "drop_table failed during recovery, proceeding anyway");
        }

        let table = Self::create_empty_table(connection, name).await?;
        tracing::info!(table = name, "chunk table recovered — documents will need re-adding");

        Ok(Self { table })
    }

    /// Create an empty chunk table.
    async fn create_empty_table(
        connection: &lancedb::Connection,
        name: &str,
    ) -> Result<lancedb::Table> {
        let schema = Self::schema();
        let batches = RecordBatchIterator::new(vec![].into_iter().map(Ok), Arc::new(schema));

        connection
            .create_table(name, Box::new(batches))
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()).into())
    }

    /// Append a batch of chunk records.
    ///
    /// Ids are deterministic (`{document_id}_chunk_{index}`), so idempotent
    /// re-adds rely on the caller clearing the document's prior chunks first.
    pub async fn add_chunks(&self, records: &[ChunkRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        for record in records {
            if record.embedding.len() != EMBEDDING_DIM as usize {
                return Err(DbError::LanceDb(format!(
                    "Embedding dimension mismatch: expected {}, got {}",
                    EMBEDDING_DIM,
                    record.embedding.len()
                ))
                .into());
            }
        }

        use arrow_array::{FixedSizeListArray, Int32Array};

        let id_array = StringArray::from_iter_values(records.iter().map(|r| r.id.as_str()));
        let document_id_array =
            StringArray::from_iter_values(records.iter().map(|r| r.metadata.document_id.as_str()));
        let document_name_array = StringArray::from_iter_values(
            records.iter().map(|r| r.metadata.document_name.as_str()),
        );
        let document_type_array = StringArray::from_iter_values(
            records.iter().map(|r| r.metadata.document_type.as_str()),
        );
        let chunk_index_array =
            Int32Array::from_iter_values(records.iter().map(|r| r.metadata.chunk_index));
        let chunk_length_array =
            Int32Array::from_iter_values(records.iter().map(|r| r.metadata.chunk_length));
        let section_label_array = StringArray::from_iter_values(
            records.iter().map(|r| r.metadata.section_label.as_str()),
        );
        let clause_type_array = StringArray::from(
            records
                .iter()
                .map(|r| r.metadata.clause_type.clone())
                .collect::<Vec<_>>(),
        );
        let risk_level_array = StringArray::from(
            records
                .iter()
                .map(|r| r.metadata.risk_level.clone())
                .collect::<Vec<_>>(),
        );
        let policy_id_array = StringArray::from(
            records
                .iter()
                .map(|r| r.metadata.policy_id.clone())
                .collect::<Vec<_>>(),
        );
        let text_array = StringArray::from_iter_values(records.iter().map(|r| r.text.as_str()));

        let embedding_array = FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(
            records
                .iter()
                .map(|r| Some(r.embedding.iter().map(|v| Some(*v)).collect::<Vec<_>>())),
            EMBEDDING_DIM,
        );

        let batch = RecordBatch::try_new(
            Arc::new(Self::schema()),
            vec![
                Arc::new(id_array) as arrow_array::ArrayRef,
                Arc::new(document_id_array) as arrow_array::ArrayRef,
                Arc::new(document_name_array) as arrow_array::ArrayRef,
                Arc::new(document_type_array) as arrow_array::ArrayRef,
                Arc::new(chunk_index_array) as arrow_array::ArrayRef,
                Arc::new(chunk_length_array) as arrow_array::ArrayRef,
                Arc::new(section_label_array) as arrow_array::ArrayRef,
                Arc::new(clause_type_array) as arrow_array::ArrayRef,
                Arc::new(risk_level_array) as arrow_array::ArrayRef,
                Arc::new(policy_id_array) as arrow_array::ArrayRef,
                Arc::new(text_array) as arrow_array::ArrayRef,
                Arc::new(embedding_array) as arrow_array::ArrayRef,
            ],
        )
        .map_err(|e| DbError::LanceDb(e.to_string()))?;

        let batches = RecordBatchIterator::new(vec![Ok(batch)], Arc::new(Self::schema()));

        self.table
            .add(Box::new(batches))
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        Ok(())
    }

    /// Nearest-neighbor search under the cosine metric.
    ///
    /// Returns hits sorted by distance ascending. The metric is set
    /// explicitly: lancedb defaults to L2, under which the service's
    /// `1 - distance` similarity conversion would be meaningless.
    pub async fn nearest(
        &self,
        query_embedding: &[f32],
        top_k: usize,
        document_id: Option<&str>,
    ) -> Result<Vec<ChunkHit>> {
        if query_embedding.len() != EMBEDDING_DIM as usize {
            return Err(DbError::LanceDb(format!(
                "Query embedding dimension mismatch: expected {}, got {}",
                EMBEDDING_DIM,
                query_embedding.len()
            ))
            .into());
        }

        use lancedb::query::{ExecutableQuery, QueryBase};

        let mut query = self
            .table
            .query()
            .nearest_to(query_embedding)
            .map_err(|e| DbError::LanceDb(e.to_string()))?
            .distance_type(lancedb::DistanceType::Cosine)
            .limit(top_k);

        if let Some(document_id) = document_id {
            query = query.only_if(document_predicate(document_id));
        }

        let results: Vec<RecordBatch> = query
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        let mut hits = Vec::new();
        for batch in results {
            let (Some(id_col), Some(text_col), Some(dist_col)) = (
                batch.column_by_name("id"),
                batch.column_by_name("text"),
                batch.column_by_name("_distance"),
            ) else {
                continue;
            };

            let ids: &StringArray = id_col.as_string::<i32>();
            let texts: &StringArray = text_col.as_string::<i32>();
            let dists: &arrow_array::PrimitiveArray<Float32Type> = dist_col.as_primitive();

            for row in 0..batch.num_rows() {
                if !ids.is_valid(row) || !dists.is_valid(row) {
                    continue;
                }
                let Some(metadata) = metadata_at(&batch, row) else {
                    continue;
                };
                hits.push(ChunkHit {
                    id: ids.value(row).to_string(),
                    text: texts.value(row).to_string(),
                    metadata,
                    distance: dists.value(row),
                });
            }
        }

        Ok(hits)
    }

    /// Full metadata scan of the collection.
    pub async fn scan_metadata(&self) -> Result<Vec<ChunkMetadata>> {
        self.metadata_scan(None).await
    }

    /// Metadata rows for a single document.
    pub async fn metadata_for_document(&self, document_id: &str) -> Result<Vec<ChunkMetadata>> {
        self.metadata_scan(Some(document_id)).await
    }

    async fn metadata_scan(&self, document_id: Option<&str>) -> Result<Vec<ChunkMetadata>> {
        use lancedb::query::{ExecutableQuery, QueryBase};

        let mut query = self.table.query().select(lancedb::query::Select::columns(&[
            "document_id",
            "document_name",
            "document_type",
            "chunk_index",
            "chunk_length",
            "section_label",
            "clause_type",
            "risk_level",
            "policy_id",
        ]));

        if let Some(document_id) = document_id {
            query = query.only_if(document_predicate(document_id));
        }

        let results: Vec<RecordBatch> = query
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        let mut rows = Vec::new();
        for batch in results {
            for row in 0..batch.num_rows() {
                if let Some(metadata) = metadata_at(&batch, row) {
                    rows.push(metadata);
                }
            }
        }

        Ok(rows)
    }

    /// Delete every chunk belonging to `document_id`.
    pub async fn delete_by_document(&self, document_id: &str) -> Result<()> {
        self.table
            .delete(&document_predicate(document_id))
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        Ok(())
    }

    /// Count all rows in the table.
    pub async fn count(&self) -> Result<usize> {
        use lancedb::query::{ExecutableQuery, QueryBase};

        let results: Vec<RecordBatch> = self
            .table
            .query()
            .select(lancedb::query::Select::columns(&["id"]))
            .execute()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?
            .try_collect()
            .await
            .map_err(|e| DbError::LanceDb(e.to_string()))?;

        Ok(results.iter().map(|b| b.num_rows()).sum())
    }

    /// Get the Arrow schema for a chunk table.
    ///
    /// The clause_type/risk_level/policy_id columns are nullable; contract
    /// chunks leave them null, policy chunks always populate them.
    fn schema() -> arrow_schema::Schema {
        use arrow_schema::{DataType, Field};

        arrow_schema::Schema::new(vec![
            Field::new("id", DataType::Utf8, false),
            Field::new("document_id", DataType::Utf8, false),
            Field::new("document_name", DataType::Utf8, false),
            Field::new("document_type", DataType::Utf8, false),
            Field::new("chunk_index", DataType::Int32, false),
            Field::new("chunk_length", DataType::Int32, false),
            Field::new("section_label", DataType::Utf8, false),
            Field::new("clause_type", DataType::Utf8, true),
            Field::new("risk_level", DataType::Utf8, true),
            Field::new("policy_id", DataType::Utf8, true),
            Field::new("text", DataType::Utf8, false),
            Field::new(
                "embedding",
                DataType::FixedSizeList(
                    Arc::new(Field::new("item", DataType::Float32, true)),
                    EMBEDDING_DIM,
                ),
                false,
            ),
        ])
    }
}

/// SQL predicate matching one document, with single quotes escaped.
fn document_predicate(document_id: &str) -> String {
    format!("document_id = '{}'", document_id.replace('\'', "''"))
}

/// Read the metadata columns of one row, skipping rows with missing columns.
fn metadata_at(batch: &RecordBatch, row: usize) -> Option<ChunkMetadata> {
    let document_ids = batch.column_by_name("document_id")?.as_string::<i32>();
    let document_names = batch.column_by_name("document_name")?.as_string::<i32>();
    let document_types = batch.column_by_name("document_type")?.as_string::<i32>();
    let chunk_indexes: &arrow_array::PrimitiveArray<Int32Type> =
        batch.column_by_name("chunk_index")?.as_primitive();
    let chunk_lengths: &arrow_array::PrimitiveArray<Int32Type> =
        batch.column_by_name("chunk_length")?.as_primitive();
    let section_labels = batch.column_by_name("section_label")?.as_string::<i32>();
    let clause_types = batch.column_by_name("clause_type")?.as_string::<i32>();
    let risk_levels = batch.column_by_name("risk_level")?.as_string::<i32>();
    let policy_ids = batch.column_by_name("policy_id")?.as_string::<i32>();

    if !document_ids.is_valid(row) {
        return None;
    }

    Some(ChunkMetadata {
        document_id: document_ids.value(row).to_string(),
        document_name: document_names.value(row).to_string(),
        document_type: document_types.value(row).to_string(),
        chunk_index: chunk_indexes.value(row),
        chunk_length: chunk_lengths.value(row),
        section_label: section_labels.value(row).to_string(),
        clause_type: optional_value(clause_types, row),
        risk_level: optional_value(risk_levels, row),
        policy_id: optional_value(policy_ids, row),
    })
}

fn optional_value(array: &StringArray, row: usize) -> Option<String> {
    if array.is_valid(row) {
        Some(array.value(row).to_string())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::ChunkTable;
    use crate::store::models::{ChunkMetadata, ChunkRecord};

    fn basis_vector(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0_f32; 384];
        v[axis] = 1.0;
        v
    }

    fn record(document_id: &str, index: i32, text: &str, axis: usize) -> ChunkRecord {
        ChunkRecord {
            id: format!("{document_id}_chunk_{index}"),
            text: text.to_string(),
            embedding: basis_vector(axis),
            metadata: ChunkMetadata {
                document_id: document_id.to_string(),
                document_name: format!("{document_id}.pdf"),
                document_type: "contract".to_string(),
                chunk_index: index,
                chunk_length: text.len() as i32,
                section_label: format!("chunk_{}", index + 1),
                clause_type: None,
                risk_level: None,
                policy_id: None,
            },
        }
    }

    async fn open_table(dir: &std::path::Path) -> ChunkTable {
        let connection = lancedb::connect(dir.to_str().expect("path utf8"))
            .execute()
            .await
            .expect("connect lancedb");
        ChunkTable::open_or_create(&connection, "uploaded_contracts")
            .await
            .expect("open_or_create table")
    }

    #[tokio::test]
    async fn nearest_ranks_by_cosine_distance() {
        let temp = tempfile::tempdir().expect("tempdir");
        let table = open_table(temp.path()).await;

        table
            .add_chunks(&[
                record("doc_a", 0, "termination clause", 0),
                record("doc_a", 1, "payment schedule", 1),
                record("doc_b", 0, "liability cap", 2),
            ])
            .await
            .expect("add chunks");

        // Query along axis 0 is closest to doc_a chunk 0.
        let hits = table
            .nearest(&basis_vector(0), 2, None)
            .await
            .expect("nearest");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].id, "doc_a_chunk_0");
        assert!(hits[0].distance < hits[1].distance);
        assert!(hits[0].distance.abs() < 1e-5);
    }

    #[tokio::test]
    async fn nearest_respects_document_filter() {
        let temp = tempfile::tempdir().expect("tempdir");
        let table = open_table(temp.path()).await;

        table
            .add_chunks(&[
                record("doc_a", 0, "termination clause", 0),
                record("doc_b", 0, "liability cap", 1),
            ])
            .await
            .expect("add chunks");

        let hits = table
            .nearest(&basis_vector(0), 5, Some("doc_b"))
            .await
            .expect("nearest");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].metadata.document_id, "doc_b");
    }

    #[tokio::test]
    async fn delete_by_document_removes_all_chunks() {
        let temp = tempfile::tempdir().expect("tempdir");
        let table = open_table(temp.path()).await;

        table
            .add_chunks(&[
                record("doc_a", 0, "one", 0),
                record("doc_a", 1, "two", 1),
                record("doc_b", 0, "three", 2),
            ])
            .await
            .expect("add chunks");
        assert_eq!(table.count().await.expect("count"), 3);

        table
            .delete_by_document("doc_a")
            .await
            .expect("delete doc_a");
        assert_eq!(table.count().await.expect("count after delete"), 1);
        assert!(
            table
                .metadata_for_document("doc_a")
                .await
                .expect("metadata scan")
                .is_empty()
        );
    }

    #[tokio::test]
    async fn scan_metadata_returns_all_rows() {
        let temp = tempfile::tempdir().expect("tempdir");
        let table = open_table(temp.path()).await;

        table
            .add_chunks(&[record("doc_a", 0, "one", 0), record("doc_b", 0, "two", 1)])
            .await
            .expect("add chunks");

        let rows = table.scan_metadata().await.expect("scan");
        assert_eq!(rows.len(), 2);
        let mut ids: Vec<&str> = rows.iter().map(|m| m.document_id.as_str()).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec!["doc_a", "doc_b"]);
    }

    #[tokio::test]
    async fn rejects_wrong_embedding_dimension() {
        let temp = tempfile::tempdir().expect("tempdir");
        let table = open_table(temp.path()).await;

        let mut bad = record("doc_a", 0, "one", 0);
        bad.embedding = vec![0.0; 16];
        assert!(table.add_chunks(&[bad]).await.is_err());
        assert!(table.nearest(&[0.0; 16], 5, None).await.is_err());
    }
}
