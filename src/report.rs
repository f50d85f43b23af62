//! Per-curator report rendering.
//!
//! Errors are grouped owner → organism → gene → transcript and rendered as
//! one text file per owner. Summaries become one `.summary` file and one
//! `.gene_list` file per curator with changes. Both can also be exported as
//! a single JSON document.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::hash::Hash;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use log::{info, warn};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::annotator::{AnnotatorSummary, SummaryCounts};
use crate::config::ReportConfig;
use crate::error::Result;
use crate::validation_error::{ErrorCollection, ValidationError};

pub const NO_ERRORS: &str = "No errors found";

const ERROR_PREAMBLE: &[&str] = &[
    "***  If you've done functional annotation and not structural annotation, please ignore this message. ***",
    "If you have already amended this gene annotation and think that it is correct, please ignore this message or contact the curation team to discuss any concerns.",
    "There is a gene annotation attributed to your account that has been edited by yourself or another annotator that currently has errors. If you made any edit to this gene in the last 24 hours could you please check that the gene is correct.",
];

const SUMMARY_INTRO: &str = "Here is a summary of your annotation in the curation service.";

/// Group items by key, keeping keys and items in first-seen order.
fn group_by<'a, K, F>(items: Vec<&'a ValidationError>, key: F) -> Vec<(K, Vec<&'a ValidationError>)>
where
    K: Eq + Hash + Clone,
    F: Fn(&'a ValidationError) -> K,
{
    let mut index: FxHashMap<K, usize> = FxHashMap::default();
    let mut groups: Vec<(K, Vec<&'a ValidationError>)> = Vec::new();
    for item in items {
        let k = key(item);
        match index.get(&k) {
            Some(&i) => groups[i].1.push(item),
            None => {
                index.insert(k.clone(), groups.len());
                groups.push((k, vec![item]));
            }
        }
    }
    groups
}

/// Errors on features of one transcript.
#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptGroup<'a> {
    pub transcript_id: &'a str,
    pub errors: Vec<&'a ValidationError>,
}

/// Errors under one gene. Findings outside any transcript are kept apart
/// and rendered before the transcripts.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneGroup<'a> {
    pub gene_id: &'a str,
    pub gene_name: Option<&'a str>,
    pub locus: Option<&'a str>,
    pub gene_level: Vec<&'a ValidationError>,
    pub transcripts: Vec<TranscriptGroup<'a>>,
}

impl GeneGroup<'_> {
    pub fn error_count(&self) -> usize {
        self.gene_level.len() + self.transcripts.iter().map(|t| t.errors.len()).sum::<usize>()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrganismGroup<'a> {
    pub organism: &'a str,
    pub genes: Vec<GeneGroup<'a>>,
}

impl OrganismGroup<'_> {
    pub fn error_count(&self) -> usize {
        self.genes.iter().map(GeneGroup::error_count).sum()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OwnerGroup<'a> {
    pub owner: &'a str,
    pub organisms: Vec<OrganismGroup<'a>>,
}

impl OwnerGroup<'_> {
    pub fn error_count(&self) -> usize {
        self.organisms.iter().map(OrganismGroup::error_count).sum()
    }

    /// Every error of the group, leaf order.
    pub fn errors(&self) -> Vec<&ValidationError> {
        let mut out = Vec::with_capacity(self.error_count());
        for organism in &self.organisms {
            for gene in &organism.genes {
                out.extend(gene.gene_level.iter().copied());
                for transcript in &gene.transcripts {
                    out.extend(transcript.errors.iter().copied());
                }
            }
        }
        out
    }
}

/// Group every error of the collection. Groups and their members follow
/// the collection's feature-id order.
pub fn group_errors(errors: &ErrorCollection) -> Vec<OwnerGroup<'_>> {
    let all: Vec<&ValidationError> = errors.values().collect();

    group_by(all, |e| e.owner.as_str())
        .into_iter()
        .map(|(owner, owner_errors)| OwnerGroup {
            owner,
            organisms: group_by(owner_errors, |e| e.organism.as_str())
                .into_iter()
                .map(|(organism, organism_errors)| OrganismGroup {
                    organism,
                    genes: group_by(organism_errors, |e| e.gene_id.as_str())
                        .into_iter()
                        .map(|(gene_id, gene_errors)| gene_group(gene_id, gene_errors))
                        .collect(),
                })
                .collect(),
        })
        .collect()
}

fn gene_group<'a>(gene_id: &'a str, errors: Vec<&'a ValidationError>) -> GeneGroup<'a> {
    let first: Option<&'a ValidationError> = errors.first().copied();
    let gene_name = first.and_then(|e| e.gene_name.as_deref());
    let locus = first.and_then(|e| e.locus.as_deref());
    let (gene_level, in_transcripts): (Vec<_>, Vec<_>) =
        errors.into_iter().partition(|e| e.transcript_id.is_none());

    let transcripts = group_by(in_transcripts, |e| e.transcript_id.as_deref().unwrap_or_default())
        .into_iter()
        .map(|(transcript_id, errors)| TranscriptGroup {
            transcript_id,
            errors,
        })
        .collect();

    GeneGroup {
        gene_id,
        gene_name,
        locus,
        gene_level,
        transcripts,
    }
}

/// Text of one owner's error message, without footer.
pub fn owner_error_text(group: &OwnerGroup) -> String {
    let mut lines: Vec<String> = vec![
        group.owner.to_string(),
        format!("Dear Annotator ({}),", group.owner),
    ];
    lines.extend(ERROR_PREAMBLE.iter().map(|l| l.to_string()));
    lines.push(String::new());

    for organism in &group.organisms {
        lines.push(format!("Species: {}", organism.organism));
        for gene in &organism.genes {
            lines.push(format!(
                "Gene: {} (ID:{})",
                gene.gene_name.unwrap_or(gene.gene_id),
                gene.gene_id
            ));
            lines.push(format!("Location: {}", gene.locus.unwrap_or("unknown")));
            for error in &gene.gene_level {
                lines.extend(error.mismatch_text());
                lines.extend(error.sequence_text());
            }
            for transcript in &gene.transcripts {
                for error in &transcript.errors {
                    lines.extend(error.mismatch_text().into_iter().map(|t| t + "."));
                    lines.extend(error.sequence_text().into_iter().map(|t| t + "."));
                }
            }
        }
    }

    lines.join("\n")
}

/// Text of one curator's summary message, without footer.
pub fn summary_text(summary: &AnnotatorSummary) -> String {
    let counts = summary.counts();
    let stats = [
        ("Finished protein-coding genes", counts.finished_mrna_count),
        (
            "Unfinished protein-coding genes",
            counts.total_mrna_count - counts.finished_mrna_count,
        ),
        ("Finished ncRNAs genes", counts.finished_ncrna_count),
        (
            "Unfinished ncRNAs genes",
            counts.total_ncrna_count - counts.finished_ncrna_count,
        ),
        ("Finished pseudogenes", counts.finished_pseudogene_count),
        (
            "Unfinished pseudogenes",
            counts.total_pseudogene_count - counts.finished_pseudogene_count,
        ),
        ("Non Canonical splice site", counts.non_canonical_count),
    ];

    let mut text = format!(
        "{}\nDear Annotator ({}),\n{}\n",
        summary.owner, summary.owner, SUMMARY_INTRO
    );
    for (label, count) in stats {
        if count > 0 {
            text.push_str(&format!("{}: {}\n", label, count));
        }
    }
    text
}

/// Turn an owner into a single file-name component: path separators and
/// leading dots are replaced so the file stays inside the output directory.
pub fn owner_file_stem(owner: &str) -> String {
    let mut stem: String = owner
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    let dots = stem.len() - stem.trim_start_matches('.').len();
    if dots > 0 {
        stem.replace_range(..dots, &"_".repeat(dots));
    }
    if stem.is_empty() {
        stem.push('_');
    }
    stem
}

/// Writes per-curator report files.
#[derive(Debug, Clone)]
pub struct ReportWriter {
    config: ReportConfig,
}

impl ReportWriter {
    /// Create a writer; the output directory is created if missing.
    pub fn new(config: ReportConfig) -> Result<Self> {
        fs::create_dir_all(&config.out_dir)?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &ReportConfig {
        &self.config
    }

    /// Write one `<owner>_<stamp>.error` file per owner. Nothing is written
    /// for an empty collection.
    pub fn write_errors(&self, errors: &ErrorCollection) -> Result<Vec<PathBuf>> {
        if errors.is_empty() {
            info!("{}", NO_ERRORS);
            return Ok(Vec::new());
        }

        let footer = self.config.load_error_footer()?;
        let mut written = Vec::new();
        for group in group_errors(errors) {
            let path = self
                .config
                .out_dir
                .join(format!("{}_{}.error", owner_file_stem(group.owner), self.config.stamp));
            let mut out = BufWriter::new(File::create(&path)?);
            writeln!(out, "{}", owner_error_text(&group))?;
            out.write_all(footer.as_bytes())?;
            out.flush()?;

            info!(
                "{} errors for {} written to {}",
                group.error_count(),
                group.owner,
                path.display()
            );
            written.push(path);
        }
        Ok(written)
    }

    /// Write `<owner>.summary` and `<owner>.gene_list`. Curators without
    /// changes get no files.
    pub fn write_summary(&self, summary: &AnnotatorSummary) -> Result<Option<PathBuf>> {
        if !summary.has_changes() {
            info!("No changes for {}", summary.owner);
            return Ok(None);
        }

        let footer = self.config.load_summary_footer()?;
        let stem = owner_file_stem(&summary.owner);
        let path = self.config.out_dir.join(format!("{}.summary", stem));
        let mut out = BufWriter::new(File::create(&path)?);
        out.write_all(summary_text(summary).as_bytes())?;
        out.write_all(footer.as_bytes())?;
        out.flush()?;

        let list_path = self
            .config
            .out_dir
            .join(format!("{}.gene_list", stem));
        let mut list = BufWriter::new(File::create(&list_path)?);
        if summary.has_unfinished_work() {
            for line in summary.list_unfinished() {
                writeln!(list, "{}", line)?;
            }
        }
        list.flush()?;

        Ok(Some(path))
    }

    /// Write the summaries of every curator.
    pub fn write_summaries<'a, I>(&self, summaries: I) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = &'a AnnotatorSummary>,
    {
        let mut written = Vec::new();
        for summary in summaries {
            if let Some(path) = self.write_summary(summary)? {
                written.push(path);
            }
        }
        if written.is_empty() {
            warn!("No curator has changes, no summary written");
        }
        Ok(written)
    }
}

/// Machine-readable export of a run.
#[derive(Debug, Serialize)]
pub struct JsonReport<'a> {
    pub errors: &'a ErrorCollection,
    pub summaries: BTreeMap<&'a str, SummaryCounts>,
}

impl<'a> JsonReport<'a> {
    pub fn new(
        errors: &'a ErrorCollection,
        annotators: &'a BTreeMap<String, AnnotatorSummary>,
    ) -> Self {
        Self {
            errors,
            summaries: annotators
                .iter()
                .map(|(owner, summary)| (owner.as_str(), summary.counts()))
                .collect(),
        }
    }

    pub fn write<W: Write>(&self, output: W) -> Result<()> {
        serde_json::to_writer_pretty(output, self)?;
        Ok(())
    }

    pub fn write_to_path(&self, path: impl Into<PathBuf>) -> Result<()> {
        let path = path.into();
        let mut out = BufWriter::new(File::create(&path)?);
        self.write(&mut out)?;
        writeln!(out)?;
        out.flush()?;
        info!("JSON report written to {}", path.display());
        Ok(())
    }
}
