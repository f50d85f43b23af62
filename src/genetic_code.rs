//! Start and stop codon sets per NCBI translation table.

use crate::error::{AuditError, Result};

/// Codon sets of one translation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GeneticCode {
    pub id: u32,
    pub name: &'static str,
    pub starts: &'static [&'static str],
    pub stops: &'static [&'static str],
}

const TABLES: &[GeneticCode] = &[
    GeneticCode {
        id: 1,
        name: "Standard",
        starts: &["ATG"],
        stops: &["TAA", "TAG", "TGA"],
    },
    GeneticCode {
        id: 2,
        name: "Vertebrate Mitochondrial",
        starts: &["ATT", "ATC", "ATA", "ATG", "GTG"],
        stops: &["TAA", "TAG", "AGA", "AGG"],
    },
    GeneticCode {
        id: 3,
        name: "Yeast Mitochondrial",
        starts: &["ATA", "ATG", "GTG"],
        stops: &["TAA", "TAG"],
    },
    GeneticCode {
        id: 4,
        name: "Mold, Protozoan, and Coelenterate Mitochondrial",
        starts: &["TTA", "TTG", "CTG", "ATT", "ATC", "ATA", "ATG", "GTG"],
        stops: &["TAA", "TAG"],
    },
    GeneticCode {
        id: 5,
        name: "Invertebrate Mitochondrial",
        starts: &["TTG", "ATT", "ATC", "ATA", "ATG", "GTG"],
        stops: &["TAA", "TAG"],
    },
    GeneticCode {
        id: 6,
        name: "Ciliate, Dasycladacean and Hexamita Nuclear",
        starts: &["ATG"],
        stops: &["TGA"],
    },
    GeneticCode {
        id: 11,
        name: "Bacterial, Archaeal and Plant Plastid",
        starts: &["TTG", "CTG", "ATT", "ATC", "ATA", "ATG", "GTG"],
        stops: &["TAA", "TAG", "TGA"],
    },
];

impl GeneticCode {
    /// Look up a table by its NCBI id.
    pub fn lookup(id: u32) -> Result<&'static GeneticCode> {
        TABLES
            .iter()
            .find(|code| code.id == id)
            .ok_or(AuditError::UnknownGeneticCode(id))
    }

    /// The standard code.
    pub fn standard() -> &'static GeneticCode {
        &TABLES[0]
    }

    #[inline]
    pub fn is_start(&self, codon: &str) -> bool {
        self.starts.contains(&codon)
    }

    #[inline]
    pub fn is_stop(&self, codon: &str) -> bool {
        self.stops.contains(&codon)
    }
}
