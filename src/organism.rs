//! Gene to organism lookup.
//!
//! Listings pooled from several organisms do not say which organism a gene
//! belongs to, so the caller supplies the mapping (tab-delimited:
//! gene_id\torganism).

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use rustc_hash::FxHashMap;

use crate::config::ANY_ORGANISM;
use crate::error::{AuditError, Result};

/// Map of gene id to organism name.
#[derive(Debug, Clone, Default)]
pub struct OrganismLookup {
    organisms: FxHashMap<String, String>,
}

impl OrganismLookup {
    /// Create an empty lookup; every gene resolves to [`ANY_ORGANISM`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the lookup from a two-column file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);
        let mut lookup = Self::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let line = line.trim();

            // Skip empty lines and comments
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let (gene_id, organism) = line.split_once('\t').ok_or_else(|| AuditError::Parse {
                line: line_num + 1,
                message: "Organism file requires two columns: gene_id and organism".to_string(),
            })?;

            lookup.insert(gene_id.trim(), organism.trim());
        }

        Ok(lookup)
    }

    pub fn insert(&mut self, gene_id: impl Into<String>, organism: impl Into<String>) {
        self.organisms.insert(gene_id.into(), organism.into());
    }

    /// Organism of a gene, [`ANY_ORGANISM`] when unknown.
    pub fn organism_of(&self, gene_id: &str) -> &str {
        self.organisms
            .get(gene_id)
            .map(String::as_str)
            .filter(|o| !o.is_empty())
            .unwrap_or(ANY_ORGANISM)
    }

    pub fn len(&self) -> usize {
        self.organisms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for OrganismLookup {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut lookup = Self::new();
        for (gene_id, organism) in iter {
            lookup.insert(gene_id, organism);
        }
        lookup
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_unknown_gene_defaults() {
        let lookup: OrganismLookup = [("g1", "sand_box")].into_iter().collect();
        assert_eq!(lookup.organism_of("g1"), "sand_box");
        assert_eq!(lookup.organism_of("g2"), ANY_ORGANISM);
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "# gene\torganism\ng1\tsand_box\n\ng2\tanopheles_gambiae\n").unwrap();
        file.flush().unwrap();

        let lookup = OrganismLookup::from_file(file.path()).unwrap();
        assert_eq!(lookup.len(), 2);
        assert_eq!(lookup.organism_of("g2"), "anopheles_gambiae");
    }

    #[test]
    fn test_single_column_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "g1").unwrap();
        file.flush().unwrap();

        assert!(matches!(
            OrganismLookup::from_file(file.path()),
            Err(AuditError::Parse { line: 1, .. })
        ));
    }
}
