//! Validation findings, keyed by the feature that triggered them.

use serde::Serialize;
use std::collections::btree_map::{BTreeMap, Entry};

use crate::error::Result;
use crate::gff::FeatureType;

/// Disagreement between a feature's recorded field and its parent's.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructuralMismatch {
    /// `scaffold`, `strand` or `position`.
    pub field: &'static str,
    pub feature_type: FeatureType,
    pub feature_id: String,
    pub value: String,
    pub parent_id: String,
    pub parent_value: String,
}

impl StructuralMismatch {
    pub fn text(&self) -> String {
        format!(
            "The {} of this feature {} : {} with value {} is not in accordance with its parent {} with value {}",
            self.field, self.feature_type, self.feature_id, self.value, self.parent_id, self.parent_value
        )
    }
}

/// A failed codon check on a transcript's coding sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceFailure {
    pub transcript_id: String,
    pub check: &'static str,
    pub message: String,
}

impl SequenceFailure {
    pub fn text(&self) -> String {
        format!(
            "The coding sequence for mRNA: {} has {}",
            self.transcript_id, self.message
        )
    }
}

/// All findings on one feature, with the ancestry snapshot taken when the
/// first finding was recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub owner: String,
    pub organism: String,
    pub gene_id: String,
    /// `None` for findings on genes or on features outside a transcript.
    pub transcript_id: Option<String>,
    pub gene_name: Option<String>,
    pub locus: Option<String>,
    pub mismatches: Vec<StructuralMismatch>,
    pub sequence_failures: Vec<SequenceFailure>,
}

impl ValidationError {
    pub fn new(ancestry: Ancestry) -> Self {
        Self {
            owner: ancestry.owner,
            organism: ancestry.organism,
            gene_id: ancestry.gene_id,
            transcript_id: ancestry.transcript_id,
            gene_name: ancestry.gene_name,
            locus: ancestry.locus,
            mismatches: Vec::new(),
            sequence_failures: Vec::new(),
        }
    }

    pub fn add_mismatch(&mut self, mismatch: StructuralMismatch) {
        self.mismatches.push(mismatch);
    }

    pub fn add_sequence_failure(&mut self, failure: SequenceFailure) {
        self.sequence_failures.push(failure);
    }

    pub fn mismatch_text(&self) -> Vec<String> {
        self.mismatches.iter().map(StructuralMismatch::text).collect()
    }

    pub fn sequence_text(&self) -> Vec<String> {
        self.sequence_failures
            .iter()
            .map(SequenceFailure::text)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mismatches.is_empty() && self.sequence_failures.is_empty()
    }
}

/// Resolved ancestry of a feature at the time a finding is made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ancestry {
    pub owner: String,
    pub organism: String,
    pub gene_id: String,
    pub transcript_id: Option<String>,
    pub gene_name: Option<String>,
    pub locus: Option<String>,
}

/// Findings of a run, one record per offending feature id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ErrorCollection {
    errors: BTreeMap<String, ValidationError>,
}

impl ErrorCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the record of `feature_id`, creating it from `ancestry` on first
    /// use. Ancestry is only resolved when the record does not exist yet.
    pub fn entry_with<F>(&mut self, feature_id: &str, ancestry: F) -> Result<&mut ValidationError>
    where
        F: FnOnce() -> Result<Ancestry>,
    {
        match self.errors.entry(feature_id.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => Ok(entry.insert(ValidationError::new(ancestry()?))),
        }
    }

    /// Merge another collection; findings on the same feature are appended
    /// to the existing record.
    pub fn merge(&mut self, other: ErrorCollection) {
        for (feature_id, incoming) in other.errors {
            match self.errors.get_mut(&feature_id) {
                Some(existing) => {
                    existing.mismatches.extend(incoming.mismatches);
                    existing.sequence_failures.extend(incoming.sequence_failures);
                }
                None => {
                    self.errors.insert(feature_id, incoming);
                }
            }
        }
    }

    pub fn insert(&mut self, feature_id: impl Into<String>, error: ValidationError) {
        self.errors.insert(feature_id.into(), error);
    }

    pub fn get(&self, feature_id: &str) -> Option<&ValidationError> {
        self.errors.get(feature_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ValidationError)> {
        self.errors.iter().map(|(id, e)| (id.as_str(), e))
    }

    pub fn values(&self) -> impl Iterator<Item = &ValidationError> {
        self.errors.values()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ancestry(transcript: Option<&str>) -> Ancestry {
        Ancestry {
            owner: "simple@ebi.ac.uk".to_string(),
            organism: "sand_box".to_string(),
            gene_id: "g1".to_string(),
            transcript_id: transcript.map(str::to_string),
            gene_name: Some("AGAP010269".to_string()),
            locus: Some("3R:51887721..51894443".to_string()),
        }
    }

    #[test]
    fn test_mismatch_text() {
        let mismatch = StructuralMismatch {
            field: "scaffold",
            feature_type: FeatureType::Exon,
            feature_id: "e1".to_string(),
            value: "2R".to_string(),
            parent_id: "t1".to_string(),
            parent_value: "3R".to_string(),
        };
        assert_eq!(
            mismatch.text(),
            "The scaffold of this feature exon : e1 with value 2R is not in accordance with its parent t1 with value 3R"
        );
    }

    #[test]
    fn test_sequence_text() {
        let failure = SequenceFailure {
            transcript_id: "t1".to_string(),
            check: "start_codon",
            message: "no start codon".to_string(),
        };
        assert_eq!(failure.text(), "The coding sequence for mRNA: t1 has no start codon");
    }

    #[test]
    fn test_entry_resolves_ancestry_once() {
        let mut errors = ErrorCollection::new();
        let mut calls = 0;

        for _ in 0..2 {
            let record = errors
                .entry_with("t1", || {
                    calls += 1;
                    Ok(ancestry(Some("t1")))
                })
                .unwrap();
            record.add_sequence_failure(SequenceFailure {
                transcript_id: "t1".to_string(),
                check: "stop_codon",
                message: "no stop codon".to_string(),
            });
        }

        assert_eq!(calls, 1);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.get("t1").unwrap().sequence_failures.len(), 2);
    }

    #[test]
    fn test_merge_appends() {
        let mut left = ErrorCollection::new();
        let mut right = ErrorCollection::new();
        let mut a = ValidationError::new(ancestry(None));
        a.add_sequence_failure(SequenceFailure {
            transcript_id: "t1".to_string(),
            check: "start_codon",
            message: "no start codon".to_string(),
        });
        left.insert("t1", a.clone());
        right.insert("t1", a);
        right.insert("t2", ValidationError::new(ancestry(Some("t2"))));

        left.merge(right);
        assert_eq!(left.len(), 2);
        assert_eq!(left.get("t1").unwrap().sequence_failures.len(), 2);
    }
}
