//! Curator summary command.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::config::{AuditConfig, ReportConfig};
use crate::error::Result;
use crate::graph::FeatureGraph;
use crate::organism::OrganismLookup;
use crate::report::{JsonReport, ReportWriter};
use crate::validation_error::ErrorCollection;

/// Outcome of a summary run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SummaryStats {
    pub curators: usize,
    pub reported: usize,
    pub files: Vec<PathBuf>,
}

impl fmt::Display for SummaryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Curators: {}, Reported: {}",
            self.curators, self.reported
        )
    }
}

/// Write per-curator production summaries of a listing.
#[derive(Debug, Clone, Default)]
pub struct SummaryCommand {
    config: AuditConfig,
    organisms: OrganismLookup,
    json: Option<PathBuf>,
}

impl SummaryCommand {
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

    pub fn with_json(mut self, json: Option<PathBuf>) -> Self {
        self.json = json;
        self
    }

    pub fn run<P: AsRef<Path>>(&self, gff: P, report: ReportConfig) -> Result<SummaryStats> {
        let graph = FeatureGraph::from_path(gff, self.organisms.clone(), &self.config)?;
        let annotators = graph.annotators();

        let writer = ReportWriter::new(report)?;
        let files = writer.write_summaries(annotators.values())?;

        if let Some(path) = &self.json {
            JsonReport::new(&ErrorCollection::new(), annotators).write_to_path(path)?;
        }

        Ok(SummaryStats {
            curators: annotators.len(),
            reported: files.len(),
            files,
        })
    }
}
