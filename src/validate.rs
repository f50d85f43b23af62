//! Structural consistency between a feature and its parent.
//!
//! Only features recorded in a finished gene context are compared. A child
//! must share its parent's scaffold and strand and lie within the parent's
//! coordinates.

use log::{debug, info};

use crate::error::Result;
use crate::graph::{FeatureGraph, Field, RecordedFields};
use crate::parallel::try_map;
use crate::validation_error::{ErrorCollection, StructuralMismatch, ValidationError};

/// Compare one field of a child with its parent, `None` when consistent.
pub fn compare_field(
    field: Field,
    child: &RecordedFields,
    parent: &RecordedFields,
) -> Option<(String, String)> {
    let consistent = match field {
        Field::Scaffold => child.scaffold == parent.scaffold,
        Field::Strand => child.strand == parent.strand,
        Field::Position => parent.span.contains(&child.span),
    };
    if consistent {
        None
    } else {
        Some((child.render(field), parent.render(field)))
    }
}

/// Parent/child consistency checks over a whole graph.
#[derive(Debug, Clone, Default)]
pub struct ConsistencyValidator {
    fields: Vec<Field>,
}

impl ConsistencyValidator {
    pub fn new() -> Self {
        Self {
            fields: Field::ALL.to_vec(),
        }
    }

    /// Restrict the checks to the given fields.
    pub fn with_fields(mut self, fields: &[Field]) -> Self {
        self.fields = fields.to_vec();
        self
    }

    /// Check one recorded feature, returning its findings if any.
    ///
    /// Ancestry is resolved for every checked feature, so a cyclic chain
    /// aborts the scan even if the feature itself is consistent.
    pub fn check_feature(
        &self,
        graph: &FeatureGraph,
        feature_id: &str,
        fields: &RecordedFields,
    ) -> Result<Option<ValidationError>> {
        let Some(parent_id) = graph.parent_of(feature_id) else {
            return Ok(None);
        };
        if parent_id == feature_id {
            return Ok(None);
        }
        graph.resolve_gene_ancestor(feature_id)?;

        let Some(parent_fields) = graph.recorded(parent_id) else {
            debug!(
                "Parent {} of {} has no recorded fields, not compared",
                parent_id, feature_id
            );
            return Ok(None);
        };
        let feature_type = match graph.type_of(feature_id) {
            Some(t) => t,
            None => return Ok(None),
        };

        let mut record: Option<ValidationError> = None;
        for &field in &self.fields {
            let Some((value, parent_value)) = compare_field(field, fields, parent_fields) else {
                continue;
            };
            if record.is_none() {
                record = Some(ValidationError::new(graph.ancestry(feature_id)?));
            }
            if let Some(r) = record.as_mut() {
                r.add_mismatch(StructuralMismatch {
                    field: field.as_str(),
                    feature_type,
                    feature_id: feature_id.to_string(),
                    value,
                    parent_id: parent_id.to_string(),
                    parent_value,
                });
            }
        }

        Ok(record)
    }

    /// Check every recorded feature of the graph.
    pub fn scan(&self, graph: &FeatureGraph) -> Result<ErrorCollection> {
        let features: Vec<(&str, &RecordedFields)> = graph.recorded_features().collect();

        let findings = try_map(&features, |(feature_id, fields)| {
            Ok(self
                .check_feature(graph, feature_id, fields)?
                .map(|error| (feature_id.to_string(), error)))
        })?;

        let mut errors = ErrorCollection::new();
        for (feature_id, error) in findings.into_iter().flatten() {
            errors.insert(feature_id, error);
        }

        info!(
            "Structural scan: {} features checked, {} with mismatches",
            features.len(),
            errors.len()
        );
        Ok(errors)
    }
}

/// Check every recorded feature of the graph with all fields.
pub fn scan_structure(graph: &FeatureGraph) -> Result<ErrorCollection> {
    ConsistencyValidator::new().scan(graph)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::error::AuditError;
    use crate::organism::OrganismLookup;

    fn gff(scaffold: &str, kind: &str, begin: u64, end: u64, strand: &str, attrs: &str) -> String {
        format!(
            "{}\t.\t{}\t{}\t{}\t.\t{}\t.\t{}\n",
            scaffold, kind, begin, end, strand, attrs
        )
    }

    fn finished_gene() -> String {
        let mut s = gff("3R", "gene", 100, 1000, "+", "ID=g1;Name=G1;owner=a@x.org;status=Finished");
        s += &gff("3R", "mRNA", 100, 1000, "+", "ID=t1;Parent=g1;owner=a@x.org");
        s
    }

    fn scan(content: &str) -> ErrorCollection {
        let graph = FeatureGraph::parse_str(content, OrganismLookup::new(), &AuditConfig::new()).unwrap();
        scan_structure(&graph).unwrap()
    }

    #[test]
    fn test_contained_child_is_clean() {
        let mut s = finished_gene();
        s += &gff("3R", "exon", 100, 1000, "+", "ID=e1;Parent=t1");
        s += &gff("3R", "CDS", 200, 300, "+", "ID=c1;Parent=t1");

        assert!(scan(&s).is_empty());
    }

    #[test]
    fn test_position_overflow_either_bound() {
        for (begin, end) in [(99, 500), (200, 1001)] {
            let mut s = finished_gene();
            s += &gff("3R", "exon", begin, end, "+", "ID=e1;Parent=t1");
            let errors = scan(&s);

            assert_eq!(errors.len(), 1);
            let record = errors.get("e1").unwrap();
            assert_eq!(record.mismatches.len(), 1);
            let mismatch = &record.mismatches[0];
            assert_eq!(mismatch.field, "position");
            assert_eq!(mismatch.value, format!("Begin:{}..End:{}", begin, end));
            assert_eq!(mismatch.parent_value, "Begin:100..End:1000");
            assert_eq!(mismatch.parent_id, "t1");
        }
    }

    #[test]
    fn test_scaffold_and_strand_on_one_record() {
        let mut s = finished_gene();
        s += &gff("2R", "exon", 100, 200, "-", "ID=e1;Parent=t1");
        let errors = scan(&s);

        let record = errors.get("e1").unwrap();
        let fields: Vec<&str> = record.mismatches.iter().map(|m| m.field).collect();
        assert_eq!(fields, vec!["scaffold", "strand"]);
        assert_eq!(record.mismatches[0].value, "2R");
        assert_eq!(record.mismatches[0].parent_value, "3R");
        assert_eq!(record.mismatches[1].value, "-");
        assert_eq!(record.transcript_id.as_deref(), Some("t1"));
        assert_eq!(record.gene_id, "g1");
        assert_eq!(record.owner, "a@x.org");
    }

    #[test]
    fn test_unfinished_gene_never_checked() {
        let mut s = gff("3R", "gene", 100, 1000, "+", "ID=g1;Name=G1;owner=a@x.org;status=Started");
        s += &gff("2R", "mRNA", 1, 5000, "-", "ID=t1;Parent=g1;owner=a@x.org");
        assert!(scan(&s).is_empty());
    }

    #[test]
    fn test_gene_level_mismatch_has_no_transcript() {
        let mut s = gff("3R", "gene", 100, 1000, "+", "ID=g1;Name=G1;owner=a@x.org;status=Finished");
        s += &gff("3R", "mRNA", 50, 1000, "+", "ID=t1;Parent=g1;owner=a@x.org");
        let errors = scan(&s);

        // The mismatch is on the transcript itself.
        assert_eq!(errors.get("t1").unwrap().transcript_id.as_deref(), Some("t1"));

        let mut s = gff("3R", "pseudogene", 100, 1000, "+", "ID=p1;Name=P1;owner=a@x.org;status=Finished");
        s += &gff("3R", "exon", 50, 1000, "+", "ID=pe1;Parent=p1");
        let errors = scan(&s);
        assert_eq!(errors.get("pe1").unwrap().transcript_id, None);
    }

    #[test]
    fn test_restricted_fields() {
        let mut s = finished_gene();
        s += &gff("2R", "exon", 1, 2, "-", "ID=e1;Parent=t1");
        let graph = FeatureGraph::parse_str(&s, OrganismLookup::new(), &AuditConfig::new()).unwrap();

        let errors = ConsistencyValidator::new()
            .with_fields(&[Field::Strand])
            .scan(&graph)
            .unwrap();
        assert_eq!(errors.get("e1").unwrap().mismatches.len(), 1);
    }

    #[test]
    fn test_cycle_aborts_scan() {
        let mut s = gff("3R", "gene", 1, 100, "+", "ID=g1;Name=G1;owner=a@x.org;status=Finished");
        s += &gff("3R", "exon", 1, 10, "+", "ID=x1;Parent=x2");
        s += &gff("3R", "exon", 1, 10, "+", "ID=x2;Parent=x1");
        let graph = FeatureGraph::parse_str(&s, OrganismLookup::new(), &AuditConfig::new()).unwrap();

        assert!(matches!(
            scan_structure(&graph),
            Err(AuditError::AncestryOverflow { .. })
        ));
    }
}
