//! Component K — Knowledge Extractor.
//!
//! The real system hands a finished transcript to a retrieval-augmented
//! campaign assistant (vector store ingestion + LLM-driven entity merge,
//! see `original_source/src/langchain/*`). That subsystem is out of scope
//! here (spec.md §1) — this module only models the narrow seam the
//! pipeline orchestrator calls through, treating the extractor as an
//! external collaborator.

use serde::{Deserialize, Serialize};

use crate::model::LabeledSegment;

/// Accumulated campaign knowledge derived from one or more sessions.
/// Deliberately minimal: the real shape of this (characters, locations,
/// plot threads, ...) lives entirely in the external collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub entries: Vec<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum KnowledgeError {
    #[error("knowledge extraction failed: {0}")]
    ExtractionFailed(String),
}

/// Narrow seam for handing a finished, labeled transcript to whatever
/// external system maintains persistent campaign knowledge.
pub trait KnowledgeExtractor: Send + Sync {
    fn extract(
        &self,
        session_id: &str,
        segments: &[LabeledSegment],
    ) -> Result<KnowledgeBase, KnowledgeError>;
}

/// No-op extractor used when no external knowledge system is configured.
/// Always succeeds with an empty [`KnowledgeBase`], matching spec.md's
/// "external collaborator" framing for this component.
pub struct NullKnowledgeExtractor;

impl KnowledgeExtractor for NullKnowledgeExtractor {
    fn extract(&self, _session_id: &str, _segments: &[LabeledSegment]) -> Result<KnowledgeBase, KnowledgeError> {
        Ok(KnowledgeBase::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_extractor_always_returns_an_empty_knowledge_base() {
        let extractor = NullKnowledgeExtractor;
        let result = extractor.extract("session-1", &[]).unwrap();
        assert_eq!(result, KnowledgeBase::default());
    }
}
