//! Error report command.
//!
//! Builds the feature graph, runs the structural checks and, when a
//! sequence source is given, the codon checks, then writes one error file
//! per curator.

use std::fmt;
use std::path::{Path, PathBuf};

use log::info;

use crate::config::{AuditConfig, ReportConfig};
use crate::error::Result;
use crate::graph::FeatureGraph;
use crate::organism::OrganismLookup;
use crate::report::{group_errors, JsonReport, ReportWriter};
use crate::sequence::{scan_sequences, FastaSequences, SequenceSource};
use crate::validate::scan_structure;
use crate::validation_error::ErrorCollection;

/// Outcome of an error report run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorsStats {
    pub features: usize,
    pub transcripts_queued: usize,
    pub flagged_features: usize,
    pub owners: usize,
    pub files: Vec<PathBuf>,
}

impl ErrorsStats {
    pub fn is_clean(&self) -> bool {
        self.flagged_features == 0
    }
}

impl fmt::Display for ErrorsStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Features: {}, Transcripts queued: {}, Flagged: {}, Curators: {}",
            self.features, self.transcripts_queued, self.flagged_features, self.owners
        )
    }
}

/// Audit a listing and write per-curator error reports.
#[derive(Debug, Clone, Default)]
pub struct ErrorsCommand {
    config: AuditConfig,
    organisms: OrganismLookup,
    fasta: Option<PathBuf>,
    json: Option<PathBuf>,
}

impl ErrorsCommand {
    pub fn new(config: AuditConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn with_organisms(mut self, organisms: OrganismLookup) -> Self {
        self.organisms = organisms;
        self
    }

    /// Coding sequences to check, as FASTA keyed by transcript id.
    pub fn with_fasta(mut self, fasta: Option<PathBuf>) -> Self {
        self.fasta = fasta;
        self
    }

    pub fn with_json(mut self, json: Option<PathBuf>) -> Self {
        self.json = json;
        self
    }

    /// Every finding on the graph: structural mismatches, plus codon
    /// failures when `source` is given.
    pub fn audit<S: SequenceSource>(
        &self,
        graph: &FeatureGraph,
        source: Option<&S>,
    ) -> Result<ErrorCollection> {
        let mut errors = scan_structure(graph)?;
        if let Some(source) = source {
            errors.merge(scan_sequences(graph, source, &self.config)?);
        }
        Ok(errors)
    }

    /// Read the listing at `gff` and write the reports.
    pub fn run<P: AsRef<Path>>(&self, gff: P, report: ReportConfig) -> Result<ErrorsStats> {
        let graph = FeatureGraph::from_path(gff, self.organisms.clone(), &self.config)?;

        let errors = match &self.fasta {
            Some(path) => {
                let source = FastaSequences::from_path(path)?;
                self.audit(&graph, Some(&source))?
            }
            None => {
                info!("No sequence file given, codon checks skipped");
                self.audit::<FastaSequences>(&graph, None)?
            }
        };

        let writer = ReportWriter::new(report)?;
        let files = writer.write_errors(&errors)?;

        if let Some(path) = &self.json {
            JsonReport::new(&errors, graph.annotators()).write_to_path(path)?;
        }

        Ok(ErrorsStats {
            features: graph.len(),
            transcripts_queued: graph.transcripts().len(),
            flagged_features: errors.len(),
            owners: group_errors(&errors).len(),
            files,
        })
    }
}
