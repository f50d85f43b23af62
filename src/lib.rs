//! curation-audit: feature graph resolution and validation for curated
//! genome annotations.
//!
//! This library reads flat feature listings (GFF3 as exported by a
//! collaborative curation service), rebuilds the gene → transcript →
//! sub-feature hierarchy, checks every finished feature against its parent,
//! checks the coding sequence of finished transcripts, and aggregates the
//! findings and per-curator production counts into reports.
//!
//! # Features
//!
//! - **Bounded ancestry walks**: cyclic or broken parent chains are reported,
//!   never looped on
//! - **Parallel validation**: per-feature checks run on Rayon, sequence
//!   checks on a bounded worker pool
//! - **Per-curator reports**: error and summary files plus a JSON export
//!
//! # Example
//!
//! ```rust,no_run
//! use curation_audit::prelude::*;
//!
//! let config = AuditConfig::new();
//! let graph = FeatureGraph::from_path("recent.gff", OrganismLookup::new(), &config).unwrap();
//! let errors = scan_structure(&graph).unwrap();
//!
//! for group in group_errors(&errors) {
//!     println!("{}: {} errors", group.owner, group.error_count());
//! }
//! ```

pub mod annotator;
pub mod commands;
pub mod config;
pub mod error;
pub mod genetic_code;
pub mod gff;
pub mod graph;
pub mod interval;
pub mod organism;
pub mod parallel;
pub mod report;
pub mod sequence;
pub mod validate;
pub mod validation_error;

// Re-export commonly used types
pub use annotator::AnnotatorSummary;
pub use error::{AuditError, Result};
pub use graph::FeatureGraph;
pub use validation_error::{ErrorCollection, ValidationError};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::annotator::AnnotatorSummary;
    pub use crate::commands::{ErrorsCommand, SummaryCommand};
    pub use crate::config::{AuditConfig, ReportConfig};
    pub use crate::error::{AuditError, Result};
    pub use crate::genetic_code::GeneticCode;
    pub use crate::gff::{FeatureListing, FeatureType, GffReader};
    pub use crate::graph::FeatureGraph;
    pub use crate::organism::OrganismLookup;
    pub use crate::report::{group_errors, ReportWriter};
    pub use crate::sequence::{scan_sequences, CodingSequence, FastaSequences, SequenceSource};
    pub use crate::validate::scan_structure;
    pub use crate::validation_error::{ErrorCollection, ValidationError};
}
