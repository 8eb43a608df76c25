//! Grouping of flat chunk metadata into per-document summaries.

use crate::store::models::{ChunkMetadata, DocumentSummary, DocumentType};
use std::collections::HashMap;

/// Group chunk metadata rows by document id.
///
/// The first chunk seen for a document seeds the summary (name and, for
/// policy documents, the clause/risk/policy fields); every chunk with that id
/// increments the count. Later chunks never overwrite the seeded fields, so
/// documents whose chunks disagree report the first chunk's values.
pub fn group_by_document(
    rows: &[ChunkMetadata],
    document_type: DocumentType,
) -> Vec<DocumentSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut summaries: HashMap<String, DocumentSummary> = HashMap::new();

    for row in rows {
        let summary = summaries
            .entry(row.document_id.clone())
            .or_insert_with(|| {
                order.push(row.document_id.clone());
                seed_summary(row, document_type)
            });
        summary.chunk_count += 1;
    }

    order
        .into_iter()
        .filter_map(|id| summaries.remove(&id))
        .collect()
}

fn seed_summary(row: &ChunkMetadata, document_type: DocumentType) -> DocumentSummary {
    let mut summary = DocumentSummary {
        document_id: row.document_id.clone(),
        document_name: row.document_name.clone(),
        document_type: document_type.as_str().to_string(),
        chunk_count: 0,
        clause_type: None,
        risk_level: None,
        policy_id: None,
    };

    if document_type == DocumentType::Policy {
        summary.clause_type = Some(
            row.clause_type
                .clone()
                .unwrap_or_else(|| "general".to_string()),
        );
        summary.risk_level = Some(
            row.risk_level
                .clone()
                .unwrap_or_else(|| "medium".to_string()),
        );
        summary.policy_id = Some(
            row.policy_id
                .clone()
                .unwrap_or_else(|| row.document_id.clone()),
        );
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::group_by_document;
    use crate::store::models::{ChunkMetadata, DocumentType};

    fn row(document_id: &str, index: i32, clause_type: Option<&str>) -> ChunkMetadata {
        ChunkMetadata {
            document_id: document_id.to_string(),
            document_name: format!("{document_id}.pdf"),
            document_type: "policy".to_string(),
            chunk_index: index,
            chunk_length: 10,
            section_label: format!("chunk_{}", index + 1),
            clause_type: clause_type.map(str::to_string),
            risk_level: None,
            policy_id: None,
        }
    }

    #[test]
    fn counts_chunks_per_document() {
        let rows = vec![
            row("doc_a", 0, None),
            row("doc_b", 0, None),
            row("doc_a", 1, None),
            row("doc_a", 2, None),
        ];

        let summaries = group_by_document(&rows, DocumentType::Contract);
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].document_id, "doc_a");
        assert_eq!(summaries[0].chunk_count, 3);
        assert_eq!(summaries[1].document_id, "doc_b");
        assert_eq!(summaries[1].chunk_count, 1);
        // Contract summaries carry no policy fields.
        assert!(summaries[0].clause_type.is_none());
    }

    #[test]
    fn policy_fields_come_from_first_seen_chunk() {
        let rows = vec![
            row("pol_a", 0, Some("confidentiality")),
            row("pol_a", 1, Some("termination")),
        ];

        let summaries = group_by_document(&rows, DocumentType::Policy);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].clause_type.as_deref(), Some("confidentiality"));
        // Absent fields default rather than serialize as null.
        assert_eq!(summaries[0].risk_level.as_deref(), Some("medium"));
        assert_eq!(summaries[0].policy_id.as_deref(), Some("pol_a"));
    }

    #[test]
    fn empty_input_yields_no_summaries() {
        let summaries = group_by_document(&[], DocumentType::Contract);
        assert!(summaries.is_empty());
    }
}
