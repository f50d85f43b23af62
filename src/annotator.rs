//! Per-curator production statistics.
//!
//! Every category keeps two name sets, all names and unfinished names.
//! Counts are set sizes computed on read, so a name seen twice (several
//! transcripts of one gene, a gene repeated in a pooled listing) is only
//! counted once.

use serde::Serialize;
use std::collections::BTreeSet;

/// Names of one category, split by completion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameSets {
    all: BTreeSet<String>,
    unfinished: BTreeSet<String>,
}

impl NameSets {
    pub fn add(&mut self, name: &str, finished: bool) {
        if !finished && !self.unfinished.contains(name) {
            self.unfinished.insert(name.to_string());
        }
        if !self.all.contains(name) {
            self.all.insert(name.to_string());
        }
    }

    #[inline]
    pub fn total(&self) -> usize {
        self.all.len()
    }

    /// Names never seen unfinished.
    #[inline]
    pub fn finished(&self) -> usize {
        self.all.difference(&self.unfinished).count()
    }

    #[inline]
    pub fn unfinished(&self) -> usize {
        self.unfinished.len()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.all.iter().map(String::as_str)
    }

    pub fn unfinished_names(&self) -> impl Iterator<Item = &str> {
        self.unfinished.iter().map(String::as_str)
    }
}

/// Counters derived from a summary, as exported and rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SummaryCounts {
    pub total_gene_count: usize,
    pub finished_gene_count: usize,
    pub total_pseudogene_count: usize,
    pub finished_pseudogene_count: usize,
    pub total_ncrna_count: usize,
    pub finished_ncrna_count: usize,
    pub total_mrna_count: usize,
    pub finished_mrna_count: usize,
    pub non_canonical_count: usize,
}

/// Production summary of one curator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotatorSummary {
    pub owner: String,
    genes: NameSets,
    pseudogenes: NameSets,
    ncrnas: NameSets,
    mrnas: NameSets,
    non_canonical_count: usize,
}

impl AnnotatorSummary {
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            genes: NameSets::default(),
            pseudogenes: NameSets::default(),
            ncrnas: NameSets::default(),
            mrnas: NameSets::default(),
            non_canonical_count: 0,
        }
    }

    pub fn add_gene(&mut self, name: &str, finished: bool) {
        self.genes.add(name, finished);
    }

    pub fn add_pseudogene(&mut self, name: &str, finished: bool) {
        self.pseudogenes.add(name, finished);
    }

    /// Record a non-coding transcript under its gene's name.
    pub fn add_ncrna(&mut self, gene_name: &str, finished: bool) {
        self.ncrnas.add(gene_name, finished);
    }

    /// Record a coding transcript under its gene's name.
    pub fn add_mrna(&mut self, gene_name: &str, finished: bool) {
        self.mrnas.add(gene_name, finished);
    }

    pub fn add_non_canonical(&mut self) {
        self.non_canonical_count += 1;
    }

    pub fn genes(&self) -> &NameSets {
        &self.genes
    }

    pub fn pseudogenes(&self) -> &NameSets {
        &self.pseudogenes
    }

    pub fn ncrnas(&self) -> &NameSets {
        &self.ncrnas
    }

    pub fn mrnas(&self) -> &NameSets {
        &self.mrnas
    }

    pub fn total_gene_count(&self) -> usize {
        self.genes.total()
    }

    pub fn finished_gene_count(&self) -> usize {
        self.genes.finished()
    }

    pub fn total_pseudogene_count(&self) -> usize {
        self.pseudogenes.total()
    }

    pub fn finished_pseudogene_count(&self) -> usize {
        self.pseudogenes.finished()
    }

    pub fn total_ncrna_count(&self) -> usize {
        self.ncrnas.total()
    }

    pub fn finished_ncrna_count(&self) -> usize {
        self.ncrnas.finished()
    }

    pub fn total_mrna_count(&self) -> usize {
        self.mrnas.total()
    }

    pub fn finished_mrna_count(&self) -> usize {
        self.mrnas.finished()
    }

    pub fn non_canonical_count(&self) -> usize {
        self.non_canonical_count
    }

    /// Whether the curator touched any gene or pseudogene. Used to suppress
    /// empty reports.
    pub fn has_changes(&self) -> bool {
        self.total_gene_count() + self.total_pseudogene_count() > 0
    }

    /// Whether some gene or pseudogene is not finished yet.
    pub fn has_unfinished_work(&self) -> bool {
        let total = self.total_gene_count() + self.total_pseudogene_count();
        let finished = self.finished_gene_count() + self.finished_pseudogene_count();
        total > finished
    }

    /// Unfinished names as `<category>\t<name>`, transcripts first, then
    /// ncRNAs, then pseudogenes, each category sorted.
    pub fn list_unfinished(&self) -> Vec<String> {
        let categories = [
            ("protein_coding", &self.mrnas),
            ("ncRNA", &self.ncrnas),
            ("pseudogene", &self.pseudogenes),
        ];

        categories
            .iter()
            .flat_map(|(category, sets)| {
                sets.unfinished_names()
                    .map(move |name| format!("{}\t{}", category, name))
            })
            .collect()
    }

    pub fn counts(&self) -> SummaryCounts {
        SummaryCounts {
            total_gene_count: self.total_gene_count(),
            finished_gene_count: self.finished_gene_count(),
            total_pseudogene_count: self.total_pseudogene_count(),
            finished_pseudogene_count: self.finished_pseudogene_count(),
            total_ncrna_count: self.total_ncrna_count(),
            finished_ncrna_count: self.finished_ncrna_count(),
            total_mrna_count: self.total_mrna_count(),
            finished_mrna_count: self.finished_mrna_count(),
            non_canonical_count: self.non_canonical_count,
        }
    }
}
