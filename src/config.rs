//! Run configuration.
//!
//! The audit core takes no global state: every knob the engine or the report
//! writer needs travels in one of the structures below and is passed in
//! explicitly.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Maximum number of parent links an ancestry walk may follow.
///
/// Curated hierarchies are at most gene -> transcript -> exon/CDS/splice
/// site, so anything deeper is a cycle or a corrupt listing.
pub const MAX_ANCESTRY_HOPS: usize = 6;

/// Organism name used when a gene is missing from the organism lookup.
pub const ANY_ORGANISM: &str = "ANY_ORGANISM";

/// NCBI translation table used when none is requested.
pub const DEFAULT_GENETIC_CODE: u32 = 1;

/// Curator identity used when a feature carries no owner.
pub const DEFAULT_MODERATOR: &str = "moderator";

/// Settings consumed by the graph builder and the sequence scanner.
#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Fallback owner for features without an `owner` attribute.
    pub moderator: String,
    /// Translation table for start/stop codon sets.
    pub genetic_code: u32,
    /// Worker threads for coding-sequence fetch and validation.
    pub workers: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditConfig {
    pub fn new() -> Self {
        Self {
            moderator: DEFAULT_MODERATOR.to_string(),
            genetic_code: DEFAULT_GENETIC_CODE,
            workers: 4,
        }
    }

    /// Set the fallback owner.
    pub fn with_moderator(mut self, moderator: impl Into<String>) -> Self {
        self.moderator = moderator.into();
        self
    }

    /// Set the translation table.
    pub fn with_genetic_code(mut self, code: u32) -> Self {
        self.genetic_code = code;
        self
    }

    /// Set the sequence worker count (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }
}

/// Settings consumed by the report writer.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    /// Directory receiving the per-curator files.
    pub out_dir: PathBuf,
    /// Text appended to every summary message.
    pub summary_footer: Option<PathBuf>,
    /// Text appended to every error message.
    pub error_footer: Option<PathBuf>,
    /// Suffix distinguishing error files of different runs, usually a date.
    pub stamp: String,
}

impl ReportConfig {
    pub fn new(out_dir: impl Into<PathBuf>, stamp: impl Into<String>) -> Self {
        Self {
            out_dir: out_dir.into(),
            summary_footer: None,
            error_footer: None,
            stamp: stamp.into(),
        }
    }

    pub fn with_summary_footer(mut self, path: Option<PathBuf>) -> Self {
        self.summary_footer = path;
        self
    }

    pub fn with_error_footer(mut self, path: Option<PathBuf>) -> Self {
        self.error_footer = path;
        self
    }

    /// Load the summary footer text, empty when none is configured.
    pub fn load_summary_footer(&self) -> Result<String> {
        load_footer(self.summary_footer.as_deref())
    }

    /// Load the error footer text, empty when none is configured.
    pub fn load_error_footer(&self) -> Result<String> {
        load_footer(self.error_footer.as_deref())
    }
}

fn load_footer(path: Option<&Path>) -> Result<String> {
    match path {
        Some(p) => Ok(fs::read_to_string(p)?),
        None => Ok(String::new()),
    }
}
