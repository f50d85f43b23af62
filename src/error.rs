//! Error taxonomy for the audit engine.
//!
//! Only conditions that make the report untrustworthy are errors here.
//! Structural mismatches and failed codon checks are findings, collected as
//! [`ValidationError`](crate::validation_error::ValidationError) records.

use std::io;
use thiserror::Error;

/// Errors that abort an audit run.
#[derive(Error, Debug)]
pub enum AuditError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Malformed attribute at line {line}: '{pair}' is not a key=value pair")]
    MalformedAttribute { line: usize, pair: String },

    #[error("Ancestry of '{feature_id}' could not be resolved within {hops} hops (cyclic or malformed parent chain)")]
    AncestryOverflow { feature_id: String, hops: usize },

    #[error("Feature '{0}' is not in the feature graph")]
    UnknownFeature(String),

    #[error("Feature '{feature_id}' points at parent '{parent_id}', which is not in the feature graph")]
    DanglingParent {
        feature_id: String,
        parent_id: String,
    },

    #[error("Unknown genetic code: {0}")]
    UnknownGeneticCode(u32),

    #[error("Sequence file error: {0}")]
    Fasta(String),

    #[error("JSON export error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, AuditError>;
