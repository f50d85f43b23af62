//! Feature graph construction and ancestry resolution.
//!
//! The listing is flat: every feature names its parent by id. The builder
//! reads it once, in file order, and records
//!
//! - the parent link of each feature (genes and pseudogenes point at
//!   themselves, which marks the root of a walk),
//! - owner and type of each feature,
//! - scaffold, strand and position, but only for features read while the
//!   current gene is finished,
//! - per-curator summaries and the transcripts queued for codon checks.
//!
//! Whether the current gene is finished is carried from line to line in a
//! [`ParseState`], so parsing cannot be split across threads. Everything
//! after parsing is a read-only walk over the finished graph.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::annotator::AnnotatorSummary;
use crate::config::{AuditConfig, MAX_ANCESTRY_HOPS};
use crate::error::{AuditError, Result};
use crate::gff::{FeatureListing, FeatureType, GffLine, GffReader, GffRecord};
use crate::interval::{Span, Strand};
use crate::organism::OrganismLookup;
use crate::validation_error::Ancestry;

/// Fields compared between a feature and its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Scaffold,
    Strand,
    Position,
}

impl Field {
    pub const ALL: [Field; 3] = [Field::Scaffold, Field::Strand, Field::Position];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Scaffold => "scaffold",
            Field::Strand => "strand",
            Field::Position => "position",
        }
    }
}

/// Field values of a feature read in a finished gene context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedFields {
    pub scaffold: String,
    pub strand: Strand,
    pub span: Span,
}

impl RecordedFields {
    /// Render one field the way reports show it.
    pub fn render(&self, field: Field) -> String {
        match field {
            Field::Scaffold => self.scaffold.clone(),
            Field::Strand => self.strand.to_string(),
            Field::Position => self.span.to_string(),
        }
    }
}

/// Display name and locus of a gene or pseudogene.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneMeta {
    pub name: Option<String>,
    /// `scaffold:begin..end`, genes only.
    pub locus: Option<String>,
}

/// A finished, complete coding transcript awaiting codon checks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedTranscript {
    /// Graph id, suffixed with its line when the listing repeats an id.
    pub id: String,
    /// Id as written in the listing, used to fetch the sequence.
    pub listing_id: String,
    pub organism: String,
    pub scaffold: String,
}

/// Parser state carried across lines.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseState {
    /// Most recently read gene or pseudogene.
    pub current_gene: Option<String>,
    /// Whether that gene is finished.
    pub finished: bool,
}

impl ParseState {
    fn reset() -> Self {
        Self::default()
    }
}

/// The resolved feature hierarchy of one listing.
#[derive(Debug, Clone, Default)]
pub struct FeatureGraph {
    parents: FxHashMap<String, String>,
    owners: FxHashMap<String, Option<String>>,
    types: FxHashMap<String, FeatureType>,
    recorded: BTreeMap<String, RecordedFields>,
    genes: FxHashMap<String, GeneMeta>,
    gene_finished: FxHashMap<String, bool>,
    transcripts: Vec<QueuedTranscript>,
    annotators: BTreeMap<String, AnnotatorSummary>,
    disqualified: FxHashSet<String>,
    organisms: OrganismLookup,
    moderator: String,
}

impl FeatureGraph {
    /// Build the graph from a listing reader.
    pub fn from_reader<R: Read>(
        reader: GffReader<R>,
        organisms: OrganismLookup,
        config: &AuditConfig,
    ) -> Result<Self> {
        let mut builder = GraphBuilder::new(organisms, config);
        let mut state = ParseState::default();
        for line in reader.lines() {
            state = builder.ingest(line?, state)?;
        }
        Ok(builder.finish())
    }

    /// Build the graph from a listing file.
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        organisms: OrganismLookup,
        config: &AuditConfig,
    ) -> Result<Self> {
        Self::from_reader(GffReader::from_path(path)?, organisms, config)
    }

    /// Build the graph from everything a listing service reports as
    /// changed within `since`.
    pub fn from_listing<L: FeatureListing>(
        listing: &L,
        since: Duration,
        organisms: OrganismLookup,
        config: &AuditConfig,
    ) -> Result<Self> {
        let ids = listing.fetch_recent_feature_ids(since)?;
        info!("{} features changed in the last {:?}", ids.len(), since);
        let content = listing.fetch_feature_listing(&ids)?;
        Self::parse_str(&content, organisms, config)
    }

    /// Build the graph from listing text (useful for testing).
    pub fn parse_str(content: &str, organisms: OrganismLookup, config: &AuditConfig) -> Result<Self> {
        Self::from_reader(GffReader::new(content.as_bytes()), organisms, config)
    }

    /// Parent id of a feature; roots return their own id.
    pub fn parent_of(&self, feature_id: &str) -> Option<&str> {
        self.parents.get(feature_id).map(String::as_str)
    }

    /// Owner recorded on the feature's own line (or the moderator fallback).
    pub fn owner_of(&self, feature_id: &str) -> Option<&str> {
        self.owners.get(feature_id).and_then(|o| o.as_deref())
    }

    pub fn type_of(&self, feature_id: &str) -> Option<FeatureType> {
        self.types.get(feature_id).copied()
    }

    pub fn contains(&self, feature_id: &str) -> bool {
        self.types.contains_key(feature_id)
    }

    pub fn is_disqualified(&self, feature_id: &str) -> bool {
        self.disqualified.contains(feature_id)
    }

    pub fn gene_meta(&self, gene_id: &str) -> Option<&GeneMeta> {
        self.genes.get(gene_id)
    }

    /// Recorded fields of a feature, `None` for unfinished-context features.
    pub fn recorded(&self, feature_id: &str) -> Option<&RecordedFields> {
        self.recorded.get(feature_id)
    }

    /// One recorded value, keyed by (field, feature id).
    pub fn recorded_field(&self, field: Field, feature_id: &str) -> Option<String> {
        self.recorded(feature_id).map(|r| r.render(field))
    }

    /// All recorded features in id order.
    pub fn recorded_features(&self) -> impl Iterator<Item = (&str, &RecordedFields)> {
        self.recorded.iter().map(|(id, r)| (id.as_str(), r))
    }

    pub fn recorded_len(&self) -> usize {
        self.recorded.len()
    }

    pub fn transcripts(&self) -> &[QueuedTranscript] {
        &self.transcripts
    }

    pub fn annotators(&self) -> &BTreeMap<String, AnnotatorSummary> {
        &self.annotators
    }

    pub fn organisms(&self) -> &OrganismLookup {
        &self.organisms
    }

    pub fn moderator(&self) -> &str {
        &self.moderator
    }

    /// Number of features in the graph.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn parent_link(&self, feature_id: &str) -> Result<&str> {
        self.parent_of(feature_id)
            .ok_or_else(|| AuditError::UnknownFeature(feature_id.to_string()))
    }

    /// Follow one parent link, checking that the parent is itself linked.
    fn step_up<'a>(&'a self, feature_id: &'a str) -> Result<&'a str> {
        let parent = self.parent_link(feature_id)?;
        if parent != feature_id && !self.parents.contains_key(parent) {
            return Err(AuditError::DanglingParent {
                feature_id: feature_id.to_string(),
                parent_id: parent.to_string(),
            });
        }
        Ok(parent)
    }

    fn overflow(feature_id: &str) -> AuditError {
        AuditError::AncestryOverflow {
            feature_id: feature_id.to_string(),
            hops: MAX_ANCESTRY_HOPS,
        }
    }

    /// The gene or pseudogene at the root of the feature's chain.
    pub fn resolve_gene_ancestor<'a>(&'a self, feature_id: &'a str) -> Result<&'a str> {
        let mut current = feature_id;
        for _ in 0..=MAX_ANCESTRY_HOPS {
            let parent = self.step_up(current)?;
            if parent == current {
                return Ok(current);
            }
            current = parent;
        }
        Err(Self::overflow(feature_id))
    }

    /// The nearest owner walking up from the feature itself.
    pub fn resolve_owner<'a>(&'a self, feature_id: &'a str) -> Result<&'a str> {
        let mut current = feature_id;
        for _ in 0..=MAX_ANCESTRY_HOPS {
            let owner = self
                .owners
                .get(current)
                .ok_or_else(|| AuditError::UnknownFeature(current.to_string()))?;
            if let Some(owner) = owner {
                return Ok(owner.as_str());
            }
            let parent = self.step_up(current)?;
            if parent == current {
                return Ok(self.moderator.as_str());
            }
            current = parent;
        }
        Err(Self::overflow(feature_id))
    }

    /// The transcript (mRNA or non-coding RNA) containing the feature, if
    /// any. Genes and pseudogenes have none.
    pub fn resolve_transcript_ancestor<'a>(&'a self, feature_id: &'a str) -> Result<Option<&'a str>> {
        let mut current = feature_id;
        for _ in 0..=MAX_ANCESTRY_HOPS {
            let feature_type = self
                .type_of(current)
                .ok_or_else(|| AuditError::UnknownFeature(current.to_string()))?;
            if feature_type == FeatureType::MRna || feature_type.is_non_coding() {
                return Ok(Some(current));
            }
            if feature_type.is_top_level() {
                return Ok(None);
            }
            let parent = self.step_up(current)?;
            if parent == current {
                return Ok(None);
            }
            current = parent;
        }
        Err(Self::overflow(feature_id))
    }

    /// Snapshot of everything a finding on `feature_id` is filed under.
    pub fn ancestry(&self, feature_id: &str) -> Result<Ancestry> {
        let gene_id = self.resolve_gene_ancestor(feature_id)?;
        let owner = self.resolve_owner(feature_id)?;
        let transcript_id = self.resolve_transcript_ancestor(feature_id)?;
        let meta = self.gene_meta(gene_id).cloned().unwrap_or_default();

        Ok(Ancestry {
            owner: owner.to_string(),
            organism: self.organisms.organism_of(gene_id).to_string(),
            gene_id: gene_id.to_string(),
            transcript_id: transcript_id.map(str::to_string),
            gene_name: meta.name,
            locus: meta.locus,
        })
    }
}

/// Line-by-line graph construction.
pub struct GraphBuilder {
    graph: FeatureGraph,
    records_read: usize,
}

impl GraphBuilder {
    pub fn new(organisms: OrganismLookup, config: &AuditConfig) -> Self {
        Self {
            graph: FeatureGraph {
                organisms,
                moderator: config.moderator.clone(),
                ..FeatureGraph::default()
            },
            records_read: 0,
        }
    }

    /// Fold one listing line into the graph, returning the state for the
    /// next line.
    pub fn ingest(&mut self, line: GffLine, state: ParseState) -> Result<ParseState> {
        match line {
            GffLine::Separator { line } => {
                debug!("Line {}: not a feature record, gene context closed", line);
                Ok(ParseState::reset())
            }
            GffLine::Record(record) => {
                self.records_read += 1;
                self.ingest_record(record, state)
            }
        }
    }

    fn ingest_record(&mut self, record: GffRecord, state: ParseState) -> Result<ParseState> {
        let graph = &mut self.graph;

        let Some(mut feature_id) = record.attributes.id.clone() else {
            warn!("Line {}: {} record without ID skipped", record.line, record.kind);
            return Ok(state);
        };

        let Some(feature_type) = record.feature_type else {
            warn!(
                "Line {}: feature {} has unsupported type {}, excluded with its descendants",
                record.line, feature_id, record.kind
            );
            graph.disqualified.insert(feature_id);
            return Ok(state);
        };

        if graph.disqualified.contains(&feature_id) {
            return Ok(state);
        }
        let parent_id = record.attributes.parent.as_deref();
        if let Some(parent) = parent_id.filter(|p| graph.disqualified.contains(*p)) {
            debug!(
                "Line {}: {} excluded, parent {} is disqualified",
                record.line, feature_id, parent
            );
            graph.disqualified.insert(feature_id);
            return Ok(state);
        }

        let listing_id = feature_id.clone();
        if graph.types.contains_key(&feature_id) {
            feature_id = format!("{}_{}", feature_id, record.line);
        }

        let mut owner = record.attributes.owner.clone();
        let mut state = state;

        match feature_type {
            FeatureType::Gene | FeatureType::Pseudogene => {
                let finished = record.attributes.is_finished();
                let name = record
                    .attributes
                    .name
                    .clone()
                    .unwrap_or_else(|| listing_id.clone());
                graph.genes.insert(
                    feature_id.clone(),
                    GeneMeta {
                        name: Some(name.clone()),
                        locus: record.locus(),
                    },
                );
                graph.gene_finished.insert(feature_id.clone(), finished);

                match owner.as_deref() {
                    Some(o) => {
                        let summary = summary_for(&mut graph.annotators, o);
                        if feature_type == FeatureType::Gene {
                            summary.add_gene(&name, finished);
                        } else {
                            summary.add_pseudogene(&name, finished);
                        }
                    }
                    None => {
                        warn!("No owner for {}: {}", feature_type, feature_id);
                        owner = Some(graph.moderator.clone());
                    }
                }

                state = ParseState {
                    current_gene: Some(feature_id.clone()),
                    finished,
                };
            }
            FeatureType::MRna => {
                let gene_id = parent_id.unwrap_or_default();
                let finished = graph
                    .gene_finished
                    .get(gene_id)
                    .copied()
                    .unwrap_or(state.finished);
                let gene_name = gene_name_of(graph, gene_id, &feature_id);

                match owner.as_deref() {
                    Some(o) => summary_for(&mut graph.annotators, o).add_mrna(&gene_name, finished),
                    None => {
                        warn!("No owner for mRNA: {}", feature_id);
                        owner = Some(graph.moderator.clone());
                    }
                }

                if finished && !record.attributes.partial {
                    graph.transcripts.push(QueuedTranscript {
                        id: feature_id.clone(),
                        listing_id: listing_id.clone(),
                        organism: graph.organisms.organism_of(gene_id).to_string(),
                        scaffold: record.scaffold.clone(),
                    });
                }
            }
            FeatureType::NonCodingRna(_) => {
                let gene_id = parent_id.unwrap_or_default();
                let gene_name = gene_name_of(graph, gene_id, &feature_id);

                match owner.as_deref() {
                    Some(o) => {
                        summary_for(&mut graph.annotators, o).add_ncrna(&gene_name, state.finished)
                    }
                    None => {
                        warn!("No owner for {}: {}", feature_type, feature_id);
                        owner = Some(graph.moderator.clone());
                    }
                }
            }
            _ => {}
        }

        if feature_type.is_splice_site() {
            let attributed = match parent_id {
                Some(parent) => graph.resolve_owner(parent)?.to_string(),
                None => owner.clone().unwrap_or_else(|| graph.moderator.clone()),
            };
            summary_for(&mut graph.annotators, &attributed).add_non_canonical();
            owner = Some(attributed);
        }

        graph.owners.insert(feature_id.clone(), owner);
        graph.types.insert(feature_id.clone(), feature_type);

        if state.finished {
            graph.recorded.insert(
                feature_id.clone(),
                RecordedFields {
                    scaffold: record.scaffold,
                    strand: record.strand,
                    span: record.span,
                },
            );
        }

        match parent_id {
            Some(parent) => {
                graph.parents.insert(feature_id, parent.to_string());
            }
            None if feature_type.is_top_level() => {
                graph.parents.insert(feature_id.clone(), feature_id);
            }
            None => warn!(
                "Line {}: {} {} has no parent and is not a gene",
                record.line, feature_type, feature_id
            ),
        }

        Ok(state)
    }

    /// Consume the builder.
    pub fn finish(self) -> FeatureGraph {
        let graph = self.graph;
        info!(
            "Read {} records: {} features in graph, {} disqualified, {} finished features recorded, {} transcripts queued",
            self.records_read,
            graph.len(),
            graph.disqualified.len(),
            graph.recorded.len(),
            graph.transcripts.len()
        );
        graph
    }
}

fn summary_for<'a>(
    annotators: &'a mut BTreeMap<String, AnnotatorSummary>,
    owner: &str,
) -> &'a mut AnnotatorSummary {
    annotators
        .entry(owner.to_string())
        .or_insert_with(|| AnnotatorSummary::new(owner))
}

fn gene_name_of(graph: &FeatureGraph, gene_id: &str, transcript_id: &str) -> String {
    match graph.genes.get(gene_id).and_then(|m| m.name.clone()) {
        Some(name) => name,
        None => {
            warn!(
                "Transcript {} refers to unknown gene '{}', summarised under the parent id",
                transcript_id, gene_id
            );
            gene_id.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gff(scaffold: &str, kind: &str, begin: u64, end: u64, strand: &str, attrs: &str) -> String {
        format!(
            "{}\tapollo\t{}\t{}\t{}\t.\t{}\t.\t{}\n",
            scaffold, kind, begin, end, strand, attrs
        )
    }

    fn mini_listing() -> String {
        let mut s = String::from("##gff-version 3\n");
        s += &gff("3R", "gene", 100, 1000, "+", "ID=g1;Name=GENE1;owner=a@x.org,c@x.org;status=Finished");
        s += &gff("3R", "mRNA", 100, 1000, "+", "ID=t1;Parent=g1;owner=a@x.org");
        s += &gff("3R", "exon", 100, 400, "+", "ID=e1;Parent=t1");
        s += &gff("3R", "CDS", 150, 400, "+", "ID=c1;Parent=t1");
        s += &gff("3R", "CDS", 600, 900, "+", "ID=c1;Parent=t1");
        s += "###\n";
        s += &gff("2L", "gene", 10, 200, "-", "ID=g2;Name=GENE2;owner=b@x.org;status=In progress");
        s += &gff("2L", "mRNA", 10, 200, "-", "ID=t2;Parent=g2;owner=b@x.org");
        s += &gff("2L", "exon", 10, 200, "-", "ID=e2;Parent=t2");
        s
    }

    fn build(content: &str) -> FeatureGraph {
        let organisms: OrganismLookup = [("g1", "sand_box")].into_iter().collect();
        FeatureGraph::parse_str(content, organisms, &AuditConfig::new().with_moderator("mod@x.org")).unwrap()
    }

    #[test]
    fn test_parent_links() {
        let graph = build(&mini_listing());

        assert_eq!(graph.parent_of("g1"), Some("g1"));
        assert_eq!(graph.parent_of("t1"), Some("g1"));
        assert_eq!(graph.parent_of("e1"), Some("t1"));
        assert_eq!(graph.parent_of("c1_6"), Some("t1"));
        assert_eq!(graph.len(), 8);
    }

    #[test]
    fn test_fields_only_recorded_when_finished() {
        let graph = build(&mini_listing());

        assert_eq!(graph.recorded_field(Field::Scaffold, "g1").as_deref(), Some("3R"));
        assert_eq!(graph.recorded_field(Field::Strand, "t1").as_deref(), Some("+"));
        assert_eq!(
            graph.recorded("c1_6").map(|r| r.span),
            Some(Span::new(600, 900))
        );
        assert!(graph.recorded("g2").is_none());
        assert!(graph.recorded("e2").is_none());
        assert_eq!(graph.recorded_len(), 5);
    }

    #[test]
    fn test_resolvers() {
        let graph = build(&mini_listing());

        assert_eq!(graph.resolve_gene_ancestor("c1_6").unwrap(), "g1");
        assert_eq!(graph.resolve_gene_ancestor("g2").unwrap(), "g2");
        assert_eq!(graph.resolve_owner("e1").unwrap(), "a@x.org");
        assert_eq!(graph.resolve_transcript_ancestor("e1").unwrap(), Some("t1"));
        assert_eq!(graph.resolve_transcript_ancestor("t2").unwrap(), Some("t2"));
        assert_eq!(graph.resolve_transcript_ancestor("g1").unwrap(), None);
    }

    #[test]
    fn test_summaries_and_queue() {
        let graph = build(&mini_listing());
        let a = &graph.annotators()["a@x.org"];
        let b = &graph.annotators()["b@x.org"];

        assert_eq!(a.finished_gene_count(), 1);
        assert_eq!(a.finished_mrna_count(), 1);
        assert_eq!(b.total_gene_count(), 1);
        assert_eq!(b.finished_gene_count(), 0);
        assert_eq!(b.mrnas().unfinished_names().collect::<Vec<_>>(), vec!["GENE2"]);
        assert!(!graph.annotators().contains_key("c@x.org"));

        assert_eq!(
            graph.transcripts(),
            &[QueuedTranscript {
                id: "t1".to_string(),
                listing_id: "t1".to_string(),
                organism: "sand_box".to_string(),
                scaffold: "3R".to_string(),
            }]
        );
    }

    #[test]
    fn test_duplicate_transcript_ids_queued_under_graph_ids() {
        let mut s = gff("3R", "gene", 1, 90, "+", "ID=g1;Name=G1;owner=a@x.org;status=Finished");
        s += &gff("3R", "mRNA", 1, 90, "+", "ID=t1;Parent=g1;owner=a@x.org");
        s += &gff("2L", "gene", 1, 90, "-", "ID=g2;Name=G2;owner=b@x.org;status=Finished");
        s += &gff("2L", "mRNA", 1, 90, "-", "ID=t1;Parent=g2;owner=b@x.org");
        let graph = build(&s);

        let queued: Vec<(&str, &str, &str)> = graph
            .transcripts()
            .iter()
            .map(|t| (t.id.as_str(), t.listing_id.as_str(), t.scaffold.as_str()))
            .collect();
        assert_eq!(queued, vec![("t1", "t1", "3R"), ("t1_4", "t1", "2L")]);
        assert_eq!(graph.parent_of("t1_4"), Some("g2"));
        assert_eq!(graph.resolve_owner("t1_4").unwrap(), "b@x.org");
        assert_eq!(graph.resolve_gene_ancestor("t1_4").unwrap(), "g2");
    }

    #[test]
    fn test_malformed_attribute_aborts_build() {
        let mut s = String::from("##gff-version 3\n");
        s += &gff("3R", "gene", 1, 90, "+", "ID=g1;Name=G1;owner=a@x.org;status=Finished");
        s += &gff("3R", "mRNA", 1, 90, "+", "ID=t1;Parent=g1;owner");
        s += &gff("3R", "exon", 1, 90, "+", "ID=e1;Parent=t1");

        let err = FeatureGraph::parse_str(&s, OrganismLookup::new(), &AuditConfig::new()).unwrap_err();
        assert!(matches!(
            err,
            AuditError::MalformedAttribute { line: 3, ref pair } if pair == "owner"
        ));
    }

    #[test]
    fn test_partial_transcript_not_queued() {
        let mut s = gff("3R", "gene", 1, 90, "+", "ID=g1;Name=G;owner=a@x.org;status=Finished");
        s += &gff("3R", "mRNA", 1, 90, "+", "ID=t1;Parent=g1;owner=a@x.org;is_fmin_partial=true");
        let graph = build(&s);

        assert!(graph.transcripts().is_empty());
        assert_eq!(graph.annotators()["a@x.org"].finished_mrna_count(), 1);
    }

    #[test]
    fn test_disqualification_is_transitive() {
        let mut s = gff("3R", "gene", 1, 90, "+", "ID=g1;Name=G;owner=a@x.org;status=Finished");
        s += &gff("3R", "transposable_element", 1, 90, "+", "ID=te1;Parent=g1");
        s += &gff("3R", "exon", 1, 50, "+", "ID=te_exon;Parent=te1");
        s += &gff("3R", "exon", 1, 50, "+", "ID=te_exon2;Parent=te_exon");
        let graph = build(&s);

        for id in ["te1", "te_exon", "te_exon2"] {
            assert!(graph.is_disqualified(id), "{} should be disqualified", id);
            assert!(!graph.contains(id));
            assert!(graph.recorded(id).is_none());
        }
        assert_eq!(graph.len(), 1);
    }

    #[test]
    fn test_missing_owner_falls_back_to_moderator() {
        let mut s = gff("3R", "gene", 1, 90, "+", "ID=g1;Name=G;status=Finished");
        s += &gff("3R", "mRNA", 1, 90, "+", "ID=t1;Parent=g1");
        s += &gff("3R", "exon", 1, 90, "+", "ID=e1;Parent=t1");
        let graph = build(&s);

        assert_eq!(graph.owner_of("g1"), Some("mod@x.org"));
        assert_eq!(graph.resolve_owner("e1").unwrap(), "mod@x.org");
        assert!(graph.annotators().is_empty());
        // Finished status does not depend on ownership.
        assert!(graph.recorded("e1").is_some());
    }

    #[test]
    fn test_splice_site_counted_for_ancestor_owner() {
        let mut s = gff("3R", "gene", 1, 90, "+", "ID=g1;Name=G;owner=a@x.org;status=Finished");
        s += &gff("3R", "mRNA", 1, 90, "+", "ID=t1;Parent=g1;owner=a@x.org");
        s += &gff(
            "3R",
            "non_canonical_five_prime_splice_site",
            40,
            41,
            "+",
            "ID=s1;Parent=t1;owner=other@x.org",
        );
        let graph = build(&s);

        assert_eq!(graph.annotators()["a@x.org"].non_canonical_count(), 1);
        assert!(!graph.annotators().contains_key("other@x.org"));
        assert_eq!(graph.owner_of("s1"), Some("a@x.org"));
    }

    #[test]
    fn test_separator_closes_finished_context() {
        let mut s = gff("3R", "gene", 1, 90, "+", "ID=g1;Name=G;owner=a@x.org;status=Finished");
        s += "###\n";
        s += &gff("3R", "exon", 1, 90, "+", "ID=e1;Parent=g1");
        let graph = build(&s);

        assert!(graph.recorded("g1").is_some());
        assert!(graph.recorded("e1").is_none());
    }

    #[test]
    fn test_state_threading() {
        let organisms = OrganismLookup::new();
        let mut builder = GraphBuilder::new(organisms, &AuditConfig::new());
        let line = crate::gff::parse_line(
            "3R\t.\tpseudogene\t1\t9\t.\t+\t.\tID=p1;Name=P;owner=a@x.org;status=Finished annotating",
            1,
        )
        .unwrap();

        let state = builder.ingest(line, ParseState::default()).unwrap();
        assert_eq!(state.current_gene.as_deref(), Some("p1"));
        assert!(state.finished);

        let state = builder
            .ingest(GffLine::Separator { line: 2 }, state)
            .unwrap();
        assert_eq!(state, ParseState::default());
    }

    #[test]
    fn test_cycle_overflows() {
        let mut s = gff("3R", "exon", 1, 9, "+", "ID=x1;Parent=x2");
        s += &gff("3R", "exon", 1, 9, "+", "ID=x2;Parent=x1");
        let graph = build(&s);

        assert!(matches!(
            graph.resolve_gene_ancestor("x1"),
            Err(AuditError::AncestryOverflow { ref feature_id, hops: MAX_ANCESTRY_HOPS }) if feature_id == "x1"
        ));
        assert!(matches!(
            graph.resolve_transcript_ancestor("x1"),
            Err(AuditError::AncestryOverflow { .. })
        ));
        assert!(matches!(
            graph.resolve_owner("x2"),
            Err(AuditError::AncestryOverflow { .. })
        ));
    }

    #[test]
    fn test_deep_chain_within_bound() {
        // gene + 6 nested levels: exactly MAX_ANCESTRY_HOPS links.
        let mut s = gff("3R", "gene", 1, 90, "+", "ID=n0;Name=G;owner=a@x.org;status=Finished");
        for i in 1..=MAX_ANCESTRY_HOPS {
            s += &gff("3R", "exon", 1, 90, "+", &format!("ID=n{};Parent=n{}", i, i - 1));
        }
        let graph = build(&s);
        let deepest = format!("n{}", MAX_ANCESTRY_HOPS);
        assert_eq!(graph.resolve_gene_ancestor(&deepest).unwrap(), "n0");

        // One more level exceeds the bound.
        s += &gff(
            "3R",
            "exon",
            1,
            90,
            "+",
            &format!("ID=deeper;Parent={}", deepest),
        );
        let graph = build(&s);
        assert!(matches!(
            graph.resolve_gene_ancestor("deeper"),
            Err(AuditError::AncestryOverflow { .. })
        ));
    }

    #[test]
    fn test_dangling_parent() {
        let s = gff("3R", "exon", 1, 9, "+", "ID=e1;Parent=missing");
        let graph = build(&s);

        assert!(matches!(
            graph.resolve_gene_ancestor("e1"),
            Err(AuditError::DanglingParent { ref parent_id, .. }) if parent_id == "missing"
        ));
        assert!(matches!(
            graph.resolve_gene_ancestor("nope"),
            Err(AuditError::UnknownFeature(_))
        ));
    }

    #[test]
    fn test_ancestry_snapshot() {
        let graph = build(&mini_listing());
        let ancestry = graph.ancestry("e1").unwrap();

        assert_eq!(ancestry.owner, "a@x.org");
        assert_eq!(ancestry.organism, "sand_box");
        assert_eq!(ancestry.gene_id, "g1");
        assert_eq!(ancestry.transcript_id.as_deref(), Some("t1"));
        assert_eq!(ancestry.gene_name.as_deref(), Some("GENE1"));
        assert_eq!(ancestry.locus.as_deref(), Some("3R:100..1000"));

        let other = graph.ancestry("e2").unwrap();
        assert_eq!(other.organism, crate::config::ANY_ORGANISM);
    }

    struct FixedListing(String);

    impl FeatureListing for FixedListing {
        fn fetch_recent_feature_ids(&self, _since: Duration) -> Result<Vec<String>> {
            Ok(vec!["g1".to_string()])
        }

        fn fetch_feature_listing(&self, ids: &[String]) -> Result<String> {
            assert_eq!(ids, ["g1".to_string()]);
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_from_listing() {
        let listing = FixedListing(mini_listing());
        let graph = FeatureGraph::from_listing(
            &listing,
            Duration::from_secs(86_400),
            OrganismLookup::new(),
            &AuditConfig::new(),
        )
        .unwrap();
        assert_eq!(graph.parent_of("t1"), Some("g1"));
    }
}
