//! Streaming FASTQ read filter using noodles.
//!
//! Reads are never collected: each record is checked and either written to
//! the output or counted as dropped.

use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use noodles::fastq;
use serde::Serialize;

use crate::parsing::{open_text, ParseError};

/// Offset of Phred+33 quality encoding
const PHRED_OFFSET: u8 = 33;

/// Per-read acceptance rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadCriteria {
    /// Reads shorter than this are dropped
    pub min_length: usize,

    /// Reads whose mean Phred quality is below this are dropped
    pub min_mean_quality: Option<u8>,
}

impl ReadCriteria {
    /// Why a read would be dropped, or `None` if it passes
    #[must_use]
    pub fn rejection(&self, sequence: &[u8], qualities: &[u8]) -> Option<Rejection> {
        if sequence.iter().any(|b| b.eq_ignore_ascii_case(&b'N')) {
            return Some(Rejection::AmbiguousBase);
        }
        if sequence.len() < self.min_length {
            return Some(Rejection::TooShort);
        }
        if let Some(min) = self.min_mean_quality {
            if mean_quality(qualities) < f64::from(min) {
                return Some(Rejection::LowQuality);
            }
        }
        None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AmbiguousBase,
    TooShort,
    LowQuality,
}

/// Counts from one filtering pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FilterSummary {
    pub kept: u64,
    pub ambiguous: u64,
    pub too_short: u64,
    pub low_quality: u64,
}

impl FilterSummary {
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.ambiguous + self.too_short + self.low_quality
    }

    #[must_use]
    pub fn total(&self) -> u64 {
        self.kept + self.dropped()
    }

    fn record(&mut self, rejection: Option<Rejection>) {
        match rejection {
            None => self.kept += 1,
            Some(Rejection::AmbiguousBase) => self.ambiguous += 1,
            Some(Rejection::TooShort) => self.too_short += 1,
            Some(Rejection::LowQuality) => self.low_quality += 1,
        }
    }
}

#[allow(clippy::cast_precision_loss)] // read lengths are far below f64 mantissa limits
fn mean_quality(qualities: &[u8]) -> f64 {
    if qualities.is_empty() {
        return 0.0;
    }
    let total: u64 = qualities
        .iter()
        .map(|q| u64::from(q.saturating_sub(PHRED_OFFSET)))
        .sum();
    total as f64 / qualities.len() as f64
}

/// Filter a FASTQ file (plain or gzip) into `output`
///
/// # Errors
///
/// Returns `ParseError::Io` if either file cannot be opened or written, or
/// `ParseError::Noodles` if a record is malformed.
pub fn filter_fastq_file(
    input: &Path,
    output: &Path,
    criteria: &ReadCriteria,
) -> Result<FilterSummary, ParseError> {
    let reader = open_text(input)?;
    let writer = BufWriter::new(std::fs::File::create(output)?);
    filter_fastq(reader, writer, criteria)
}

/// Filter FASTQ records from `reader` into `writer`
///
/// # Errors
///
/// Returns `ParseError::Io` on read/write failure, or `ParseError::Noodles`
/// if a record is malformed.
pub fn filter_fastq<R: BufRead, W: Write>(
    reader: R,
    mut writer: W,
    criteria: &ReadCriteria,
) -> Result<FilterSummary, ParseError> {
    let mut fastq_reader = fastq::io::Reader::new(reader);
    let mut summary = FilterSummary::default();

    {
        let mut fastq_writer = fastq::io::Writer::new(&mut writer);
        for result in fastq_reader.records() {
            let record = result
                .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTQ record: {e}")))?;

            let rejection = criteria.rejection(record.sequence(), record.quality_scores());
            if rejection.is_none() {
                fastq_writer.write_record(&record)?;
            }
            summary.record(rejection);
        }
    }

    writer.flush()?;
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CRITERIA: ReadCriteria = ReadCriteria {
        min_length: 5,
        min_mean_quality: None,
    };

    #[test]
    fn test_drops_ambiguous_and_short_reads() {
        let input = b"@r1\nACGTACGT\n+\nIIIIIIII\n@r2\nACGNACGT\n+\nIIIIIIII\n@r3\nACG\n+\nIII\n@r4\nTTTTTT\n+\nIIIIII\n";
        let mut out = Vec::new();

        let summary = filter_fastq(&input[..], &mut out, &CRITERIA).unwrap();
        assert_eq!(summary.kept, 2);
        assert_eq!(summary.ambiguous, 1);
        assert_eq!(summary.too_short, 1);
        assert_eq!(summary.total(), 4);

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("@r1\nACGTACGT\n+\nIIIIIIII\n"));
        assert!(text.contains("@r4\n"));
        assert!(!text.contains("@r2"));
        assert!(!text.contains("@r3"));
    }

    #[test]
    fn test_mean_quality_filter() {
        let criteria = ReadCriteria {
            min_length: 1,
            min_mean_quality: Some(20),
        };
        // '5' = Q20, '#' = Q2
        assert_eq!(criteria.rejection(b"ACGT", b"5555"), None);
        assert_eq!(
            criteria.rejection(b"ACGT", b"####"),
            Some(Rejection::LowQuality)
        );
    }

    #[test]
    fn test_lowercase_n_is_ambiguous() {
        assert_eq!(
            CRITERIA.rejection(b"acgtnacgt", b"IIIIIIIII"),
            Some(Rejection::AmbiguousBase)
        );
    }

    #[test]
    fn test_mean_quality() {
        assert!((mean_quality(b"5555") - 20.0).abs() < 1e-9);
        assert!(mean_quality(b"").abs() < f64::EPSILON);
    }
}
