//! Streaming reader for curated feature listings (GFF3 as exported by the
//! curation service).
//!
//! Only 9-column lines are records. Everything else (headers, `###` block
//! separators, embedded FASTA) is reported as [`GffLine::Separator`] so the
//! caller can close the current gene context.

use crate::error::{AuditError, Result};
use crate::interval::{Span, Strand};
use memchr::memchr_iter;
use serde::{Serialize, Serializer};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;
use std::time::Duration;

/// Non-coding transcript types accepted in a listing.
pub const NON_CODING_TYPES: &[&str] = &[
    "rRNA",
    "tRNA",
    "sRNA",
    "snoRNA",
    "ncRNA",
    "miRNA",
    "guide_RNA",
    "RNAse_MRP_RNA",
    "telomerase_RNA",
    "SRP_RNA",
    "lnc_RNA",
    "RNAse_P_RNA",
    "scRNA",
    "piRNA",
    "tmRNA",
    "enzymatic_RNA",
];

/// Status values that mark a gene as complete.
pub const FINISHED_STATUSES: &[&str] = &["Finished", "Finished annotating"];

/// Feature types on the allow-list. Anything else disqualifies the feature
/// and its descendants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureType {
    Gene,
    Pseudogene,
    MRna,
    Exon,
    Cds,
    NonCanonicalFivePrimeSpliceSite,
    NonCanonicalThreePrimeSpliceSite,
    /// One of [`NON_CODING_TYPES`].
    NonCodingRna(&'static str),
}

impl FeatureType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "gene" => Some(FeatureType::Gene),
            "pseudogene" => Some(FeatureType::Pseudogene),
            "mRNA" => Some(FeatureType::MRna),
            "exon" => Some(FeatureType::Exon),
            "CDS" => Some(FeatureType::Cds),
            "non_canonical_five_prime_splice_site" => {
                Some(FeatureType::NonCanonicalFivePrimeSpliceSite)
            }
            "non_canonical_three_prime_splice_site" => {
                Some(FeatureType::NonCanonicalThreePrimeSpliceSite)
            }
            other => NON_CODING_TYPES
                .iter()
                .copied()
                .find(|t| *t == other)
                .map(FeatureType::NonCodingRna),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::Gene => "gene",
            FeatureType::Pseudogene => "pseudogene",
            FeatureType::MRna => "mRNA",
            FeatureType::Exon => "exon",
            FeatureType::Cds => "CDS",
            FeatureType::NonCanonicalFivePrimeSpliceSite => "non_canonical_five_prime_splice_site",
            FeatureType::NonCanonicalThreePrimeSpliceSite => {
                "non_canonical_three_prime_splice_site"
            }
            FeatureType::NonCodingRna(name) => *name,
        }
    }

    /// Genes and pseudogenes: the roots of the hierarchy.
    #[inline]
    pub fn is_top_level(&self) -> bool {
        matches!(self, FeatureType::Gene | FeatureType::Pseudogene)
    }

    #[inline]
    pub fn is_splice_site(&self) -> bool {
        matches!(
            self,
            FeatureType::NonCanonicalFivePrimeSpliceSite
                | FeatureType::NonCanonicalThreePrimeSpliceSite
        )
    }

    #[inline]
    pub fn is_non_coding(&self) -> bool {
        matches!(self, FeatureType::NonCodingRna(_))
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for FeatureType {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// The recognised keys of the attributes column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    pub id: Option<String>,
    pub parent: Option<String>,
    /// First entry of the comma-separated `owner` list.
    pub owner: Option<String>,
    pub name: Option<String>,
    pub status: Option<String>,
    /// Either boundary flagged partial by the curation tool.
    pub partial: bool,
}

impl Attributes {
    /// Parse a `key=value;key=value` column.
    ///
    /// A pair without `=` is fatal for the line. Empty pairs, as left by a
    /// trailing `;`, are ignored. Values may themselves contain `=`.
    pub fn parse(column: &str, line: usize) -> Result<Self> {
        let mut attrs = Attributes::default();

        for pair in column.split(';') {
            if pair.trim().is_empty() {
                continue;
            }
            let (key, value) = pair
                .split_once('=')
                .ok_or_else(|| AuditError::MalformedAttribute {
                    line,
                    pair: pair.to_string(),
                })?;

            match key {
                "ID" => attrs.id = Some(value.to_string()),
                "Parent" => attrs.parent = Some(value.to_string()),
                "owner" => attrs.owner = first_owner(value),
                "Name" => attrs.name = Some(value.to_string()),
                "status" => attrs.status = Some(value.to_string()),
                "is_fmin_partial" | "is_fmax_partial" => {
                    attrs.partial |= value == "true";
                }
                _ => {}
            }
        }

        Ok(attrs)
    }

    /// Check the status against [`FINISHED_STATUSES`].
    pub fn is_finished(&self) -> bool {
        self.status
            .as_deref()
            .is_some_and(|s| FINISHED_STATUSES.contains(&s))
    }
}

fn first_owner(value: &str) -> Option<String> {
    value
        .trim_end()
        .split(',')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// One 9-column feature line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GffRecord {
    /// 1-based line number in the listing.
    pub line: usize,
    pub scaffold: String,
    /// Raw type column, kept for diagnostics on disqualified features.
    pub kind: String,
    /// `None` when the type is off the allow-list.
    pub feature_type: Option<FeatureType>,
    pub span: Span,
    pub strand: Strand,
    pub attributes: Attributes,
}

impl GffRecord {
    /// `scaffold:begin..end`, only derived for genes.
    pub fn locus(&self) -> Option<String> {
        match self.feature_type {
            Some(FeatureType::Gene) => Some(format!(
                "{}:{}..{}",
                self.scaffold, self.span.begin, self.span.end
            )),
            _ => None,
        }
    }
}

/// What the reader found on a line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GffLine {
    Record(GffRecord),
    /// Any line that is not a 9-column record.
    Separator { line: usize },
}

/// Split a line into exactly nine tab-separated columns.
#[inline]
pub fn split_columns(line: &str) -> Option<[&str; 9]> {
    let bytes = line.as_bytes();
    let mut cols = [""; 9];
    let mut start = 0;
    let mut idx = 0;

    for tab in memchr_iter(b'\t', bytes) {
        if idx == 8 {
            return None;
        }
        cols[idx] = &line[start..tab];
        idx += 1;
        start = tab + 1;
    }
    if idx != 8 {
        return None;
    }
    cols[8] = &line[start..];
    Some(cols)
}

/// Parse one listing line.
pub fn parse_line(line: &str, line_number: usize) -> Result<GffLine> {
    let Some(cols) = split_columns(line) else {
        return Ok(GffLine::Separator { line: line_number });
    };

    let begin = parse_coordinate(cols[3], "begin", line_number)?;
    let end = parse_coordinate(cols[4], "end", line_number)?;
    let attributes = Attributes::parse(cols[8], line_number)?;

    Ok(GffLine::Record(GffRecord {
        line: line_number,
        scaffold: cols[0].to_string(),
        kind: cols[2].to_string(),
        feature_type: FeatureType::parse(cols[2]),
        span: Span::new(begin, end),
        strand: Strand::parse(cols[6]),
        attributes,
    }))
}

fn parse_coordinate(s: &str, field_name: &str, line: usize) -> Result<u64> {
    s.parse().map_err(|_| AuditError::Parse {
        line,
        message: format!("Invalid {} coordinate: '{}'", field_name, s),
    })
}

/// A streaming listing reader.
pub struct GffReader<R: Read> {
    reader: BufReader<R>,
    line_number: usize,
    buffer: String,
}

impl GffReader<File> {
    /// Open a listing from a path.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::new(file))
    }
}

impl<R: Read> GffReader<R> {
    /// Create a new reader from any readable source.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
            line_number: 0,
            buffer: String::with_capacity(1024),
        }
    }

    /// Read the next line, `None` at end of input.
    pub fn read_line(&mut self) -> Result<Option<GffLine>> {
        self.buffer.clear();
        let bytes_read = self.reader.read_line(&mut self.buffer)?;
        if bytes_read == 0 {
            return Ok(None);
        }
        self.line_number += 1;
        parse_line(self.buffer.trim_end(), self.line_number).map(Some)
    }

    /// Get an iterator over all lines.
    pub fn lines(self) -> GffLineIter<R> {
        GffLineIter { reader: self }
    }
}

/// Iterator over listing lines.
pub struct GffLineIter<R: Read> {
    reader: GffReader<R>,
}

impl<R: Read> Iterator for GffLineIter<R> {
    type Item = Result<GffLine>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_line().transpose()
    }
}

/// A remote source of feature listings, such as the curation service the
/// listing is exported from.
pub trait FeatureListing {
    /// Ids of features changed within `since`.
    fn fetch_recent_feature_ids(&self, since: Duration) -> Result<Vec<String>>;

    /// The listing text covering `ids` and their descendants.
    fn fetch_feature_listing(&self, ids: &[String]) -> Result<String>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const GENE: &str = "3R\t.\tgene\t100\t900\t.\t+\t.\tID=g1;Name=AGAP1;owner=a@x.org,b@x.org;status=Finished";

    #[test]
    fn test_parse_gene_record() {
        let GffLine::Record(rec) = parse_line(GENE, 3).unwrap() else {
            panic!("expected a record");
        };
        assert_eq!(rec.line, 3);
        assert_eq!(rec.scaffold, "3R");
        assert_eq!(rec.feature_type, Some(FeatureType::Gene));
        assert_eq!(rec.span, Span::new(100, 900));
        assert_eq!(rec.strand, Strand::Plus);
        assert_eq!(rec.attributes.id.as_deref(), Some("g1"));
        assert_eq!(rec.attributes.owner.as_deref(), Some("a@x.org"));
        assert!(rec.attributes.is_finished());
        assert!(!rec.attributes.partial);
        assert_eq!(rec.locus().as_deref(), Some("3R:100..900"));
    }

    #[test]
    fn test_wrong_column_count_is_separator() {
        assert_eq!(
            parse_line("##gff-version 3", 1).unwrap(),
            GffLine::Separator { line: 1 }
        );
        assert_eq!(
            parse_line("3R\t.\tgene\t1\t2", 2).unwrap(),
            GffLine::Separator { line: 2 }
        );
        assert_eq!(
            parse_line(&format!("{}\textra", GENE), 4).unwrap(),
            GffLine::Separator { line: 4 }
        );
    }

    #[test]
    fn test_malformed_attribute_is_fatal() {
        let line = "3R\t.\tgene\t1\t2\t.\t+\t.\tID=g1;broken";
        let err = parse_line(line, 7).unwrap_err();
        assert!(matches!(
            err,
            AuditError::MalformedAttribute { line: 7, ref pair } if pair == "broken"
        ));
    }

    #[test]
    fn test_bad_coordinate_is_fatal() {
        let line = "3R\t.\tgene\tabc\t2\t.\t+\t.\tID=g1";
        assert!(matches!(
            parse_line(line, 1),
            Err(AuditError::Parse { line: 1, .. })
        ));
    }

    #[test]
    fn test_partial_flags() {
        let fmin = Attributes::parse("ID=t1;is_fmin_partial=true", 1).unwrap();
        let fmax = Attributes::parse("ID=t1;is_fmax_partial=true", 1).unwrap();
        let neither = Attributes::parse("ID=t1;is_fmax_partial=false", 1).unwrap();
        assert!(fmin.partial);
        assert!(fmax.partial);
        assert!(!neither.partial);
    }

    #[test]
    fn test_trailing_semicolon_and_equals_in_value() {
        let attrs = Attributes::parse("ID=t1;Name=a=b;", 1).unwrap();
        assert_eq!(attrs.name.as_deref(), Some("a=b"));
    }

    #[test]
    fn test_status_variants() {
        for (status, finished) in [
            ("Finished", true),
            ("Finished annotating", true),
            ("Needs review", false),
        ] {
            let attrs = Attributes::parse(&format!("ID=g;status={}", status), 1).unwrap();
            assert_eq!(attrs.is_finished(), finished, "status {}", status);
        }
        assert!(!Attributes::parse("ID=g", 1).unwrap().is_finished());
    }

    #[test]
    fn test_feature_type_allow_list() {
        assert_eq!(FeatureType::parse("lnc_RNA"), Some(FeatureType::NonCodingRna("lnc_RNA")));
        assert!(FeatureType::parse("lnc_RNA").unwrap().is_non_coding());
        assert!(FeatureType::parse("non_canonical_three_prime_splice_site")
            .unwrap()
            .is_splice_site());
        assert_eq!(FeatureType::parse("transposable_element"), None);
        assert_eq!(FeatureType::parse("CDS").unwrap().to_string(), "CDS");
    }

    #[test]
    fn test_reader_numbers_lines() {
        let content = format!("##gff-version 3\n{}\n###\n", GENE);
        let lines: Vec<GffLine> = GffReader::new(content.as_bytes())
            .lines()
            .collect::<Result<_>>()
            .unwrap();

        assert_eq!(lines.len(), 3);
        assert!(matches!(lines[1], GffLine::Record(ref r) if r.line == 2));
        assert_eq!(lines[2], GffLine::Separator { line: 3 });
    }
}
