//! Codon checks on the coding sequences of queued transcripts.
//!
//! Sequences come from a [`SequenceSource`]. The bundled [`FastaSequences`]
//! reads a FASTA file (optionally gzip-compressed) of translated-region
//! nucleotide sequences keyed by transcript id.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use bio::io::fasta;
use flate2::read::MultiGzDecoder;
use log::{debug, info};
use rustc_hash::FxHashMap;

use crate::config::AuditConfig;
use crate::error::{AuditError, Result};
use crate::genetic_code::GeneticCode;
use crate::graph::{FeatureGraph, QueuedTranscript};
use crate::parallel::run_bounded_pool;
use crate::validation_error::{ErrorCollection, SequenceFailure};

pub const START_CODON_CHECK: &str = "start_codon";
pub const STOP_CODON_CHECK: &str = "stop_codon";
pub const INTERNAL_STOP_CHECK: &str = "no_internal_stop_codon";

const CODON_LEN: usize = 3;

/// The coding sequence of one transcript and the checks it failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodingSequence {
    pub transcript_id: String,
    pub organism: String,
    pub scaffold: String,
    sequence: String,
    genetic_code: &'static GeneticCode,
    errors: BTreeMap<&'static str, String>,
}

impl CodingSequence {
    /// A sequence checked against the standard code.
    pub fn new(transcript: &QueuedTranscript, sequence: &str) -> Self {
        Self {
            transcript_id: transcript.id.clone(),
            organism: transcript.organism.clone(),
            scaffold: transcript.scaffold.clone(),
            sequence: normalize(sequence),
            genetic_code: GeneticCode::standard(),
            errors: BTreeMap::new(),
        }
    }

    pub fn with_genetic_code(mut self, code: &'static GeneticCode) -> Self {
        self.genetic_code = code;
        self
    }

    pub fn sequence(&self) -> &str {
        &self.sequence
    }

    pub fn genetic_code(&self) -> &'static GeneticCode {
        self.genetic_code
    }

    pub fn valid_starts(&self) -> &'static [&'static str] {
        self.genetic_code.starts
    }

    pub fn valid_stops(&self) -> &'static [&'static str] {
        self.genetic_code.stops
    }

    fn codon_at(&self, offset: usize) -> Option<&str> {
        self.sequence.get(offset..offset + CODON_LEN)
    }

    /// Fails when the first codon is not a start codon. Sequences shorter
    /// than one codon are not evaluated.
    pub fn check_start_codon(&mut self) -> bool {
        if self.sequence.len() < CODON_LEN {
            return true;
        }
        let ok = self
            .codon_at(0)
            .is_some_and(|codon| self.genetic_code.is_start(codon));
        if !ok {
            self.errors
                .insert(START_CODON_CHECK, "no start codon".to_string());
        }
        ok
    }

    /// Fails when the last codon is not a stop codon. Sequences shorter
    /// than one codon are not evaluated.
    pub fn check_stop_codon(&mut self) -> bool {
        let len = self.sequence.len();
        if len < CODON_LEN {
            return true;
        }
        let ok = self
            .codon_at(len - CODON_LEN)
            .is_some_and(|codon| self.genetic_code.is_stop(codon));
        if !ok {
            self.errors
                .insert(STOP_CODON_CHECK, "no stop codon".to_string());
        }
        ok
    }

    /// Counts stop codons in frame before the final codon.
    pub fn check_internal_stops(&mut self) -> bool {
        let internal = self.internal_stop_count();
        if internal > 0 {
            self.errors.insert(
                INTERNAL_STOP_CHECK,
                format!("{} internal stop codon", internal),
            );
        }
        internal == 0
    }

    pub fn internal_stop_count(&self) -> usize {
        let len = self.sequence.len();
        if len <= CODON_LEN {
            return 0;
        }
        (0..len - CODON_LEN)
            .step_by(CODON_LEN)
            .filter_map(|offset| self.codon_at(offset))
            .filter(|codon| self.genetic_code.is_stop(codon))
            .count()
    }

    /// Run every check, true when all pass.
    pub fn validate(&mut self) -> bool {
        let start = self.check_start_codon();
        let stop = self.check_stop_codon();
        let internal = self.check_internal_stops();
        start && stop && internal
    }

    pub fn errors(&self) -> &BTreeMap<&'static str, String> {
        &self.errors
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn failures(&self) -> Vec<SequenceFailure> {
        self.errors
            .iter()
            .map(|(&check, message)| SequenceFailure {
                transcript_id: self.transcript_id.clone(),
                check,
                message: message.clone(),
            })
            .collect()
    }
}

fn normalize(sequence: &str) -> String {
    sequence
        .chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Where coding sequences come from.
pub trait SequenceSource: Sync {
    /// The coding sequence of a transcript, `None` when unavailable.
    fn fetch(&self, transcript: &QueuedTranscript) -> Option<String>;
}

impl<F> SequenceSource for F
where
    F: Fn(&QueuedTranscript) -> Option<String> + Sync,
{
    fn fetch(&self, transcript: &QueuedTranscript) -> Option<String> {
        self(transcript)
    }
}

/// Coding sequences loaded from a FASTA file.
#[derive(Debug, Clone, Default)]
pub struct FastaSequences {
    sequences: FxHashMap<String, String>,
}

impl FastaSequences {
    /// Load a FASTA file; `.gz` files are decompressed.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let is_gz = path.extension().is_some_and(|ext| ext == "gz");
        if is_gz {
            Self::from_reader(MultiGzDecoder::new(BufReader::new(file)))
        } else {
            Self::from_reader(file)
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut sequences = FxHashMap::default();
        for record in fasta::Reader::new(reader).records() {
            let record = record.map_err(|e| AuditError::Fasta(e.to_string()))?;
            record.check().map_err(|e| AuditError::Fasta(e.to_string()))?;
            let seq = String::from_utf8_lossy(record.seq());
            sequences.insert(record.id().to_string(), normalize(&seq));
        }
        info!("Loaded {} coding sequences", sequences.len());
        Ok(Self { sequences })
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}

impl SequenceSource for FastaSequences {
    /// Looks the transcript up by id. A file holding a single record is
    /// taken to be that transcript's sequence.
    fn fetch(&self, transcript: &QueuedTranscript) -> Option<String> {
        if let Some(seq) = self.sequences.get(&transcript.listing_id) {
            return Some(seq.clone());
        }
        if self.sequences.len() == 1 {
            return self.sequences.values().next().cloned();
        }
        None
    }
}

/// Check every queued transcript of the graph.
pub fn scan_sequences<S: SequenceSource>(
    graph: &FeatureGraph,
    source: &S,
    config: &AuditConfig,
) -> Result<ErrorCollection> {
    let code = GeneticCode::lookup(config.genetic_code)?;

    let checked = run_bounded_pool(graph.transcripts().to_vec(), config.workers, |transcript| {
        match source.fetch(&transcript) {
            Some(seq) if !seq.trim().is_empty() => {
                let mut cds = CodingSequence::new(&transcript, &seq).with_genetic_code(code);
                cds.validate();
                Some(cds)
            }
            _ => {
                debug!("No coding sequence for {}, not checked", transcript.id);
                None
            }
        }
    });

    let mut errors = ErrorCollection::new();
    let mut checked_count = 0;
    for cds in checked.into_iter().flatten() {
        checked_count += 1;
        if !cds.has_errors() {
            continue;
        }
        let record = errors.entry_with(&cds.transcript_id, || graph.ancestry(&cds.transcript_id))?;
        for failure in cds.failures() {
            record.add_sequence_failure(failure);
        }
    }

    info!(
        "Sequence scan: {} of {} transcripts checked, {} with failures",
        checked_count,
        graph.transcripts().len(),
        errors.len()
    );
    Ok(errors)
}
