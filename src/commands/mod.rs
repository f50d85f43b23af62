//! Command implementations for curation-audit.

pub mod errors;
pub mod summary;

pub use errors::{ErrorsCommand, ErrorsStats};
pub use summary::{SummaryCommand, SummaryStats};
