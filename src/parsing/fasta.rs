//! FASTA input and output using noodles.
//!
//! References are single-sequence: when a file carries more than one record,
//! the first one is used and the rest are ignored with a warning.
//!
//! Supported extensions for reading:
//! - `.fa`, `.fasta`, `.fna` (uncompressed)
//! - `.fa.gz`, `.fasta.gz`, `.fna.gz` (gzip compressed)
//! - `.fa.bgz`, `.fasta.bgz`, `.fna.bgz` (bgzip compressed)

use std::io::{BufRead, BufWriter, Write};
use std::path::Path;

use noodles::fasta;
use noodles::fasta::record::{Definition, Sequence};
use tracing::warn;

use crate::core::sequence::{ConsensusSequence, ReferenceSequence};
use crate::parsing::{open_text, ParseError};

/// Read the first sequence of a FASTA file as a reference
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, `ParseError::Noodles`
/// if parsing fails, or `ParseError::InvalidFormat` if the file holds no
/// sequence.
pub fn read_reference(path: &Path) -> Result<ReferenceSequence, ParseError> {
    let reader = open_text(path)?;
    let mut fasta_reader = fasta::io::Reader::new(reader);
    let reference = read_first_record(&mut fasta_reader)?;

    if reference.is_empty() {
        return Err(ParseError::InvalidFormat(format!(
            "Reference '{}' in {} has no bases",
            reference.name,
            path.display()
        )));
    }

    Ok(reference)
}

fn read_first_record<R: BufRead>(
    reader: &mut fasta::io::Reader<R>,
) -> Result<ReferenceSequence, ParseError> {
    let mut records = reader.records();

    let record = records
        .next()
        .ok_or_else(|| ParseError::InvalidFormat("No sequences found in FASTA file".to_string()))?
        .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))?;

    let name = String::from_utf8_lossy(record.name()).to_string();
    let sequence = record.sequence().as_ref().to_vec();

    let extra = records.count();
    if extra > 0 {
        warn!(
            reference = %name,
            ignored = extra,
            "FASTA holds more than one sequence, using the first"
        );
    }

    Ok(ReferenceSequence::new(name, sequence))
}

/// Write a consensus as a single-record FASTA file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be created or written.
pub fn write_consensus(path: &Path, consensus: &ConsensusSequence) -> Result<(), ParseError> {
    let file = std::fs::File::create(path)?;
    write_consensus_to(BufWriter::new(file), consensus)
}

/// Write a consensus as FASTA to any writer
///
/// # Errors
///
/// Returns `ParseError::Io` if writing fails.
pub fn write_consensus_to<W: Write>(
    mut writer: W,
    consensus: &ConsensusSequence,
) -> Result<(), ParseError> {
    let definition = Definition::new(
        consensus.name.as_str(),
        consensus.description.clone().map(Into::into),
    );
    let record = fasta::Record::new(definition, Sequence::from(consensus.sequence.clone()));

    fasta::io::Writer::new(&mut writer).write_record(&record)?;
    writer.flush()?;
    Ok(())
}

/// Write a reference unchanged, used to seed a working copy
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be created or written.
pub fn write_reference(path: &Path, reference: &ReferenceSequence) -> Result<(), ParseError> {
    write_consensus(path, &ConsensusSequence::unchanged(reference))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_reference() {
        let mut temp = NamedTempFile::with_suffix(".fasta").unwrap();
        temp.write_all(b">CONSENSUS_B pol region\nACGTACGT\nACGT\n").unwrap();
        temp.flush().unwrap();

        let reference = read_reference(temp.path()).unwrap();
        assert_eq!(reference.name, "CONSENSUS_B");
        assert_eq!(reference.sequence, b"ACGTACGTACGT");
    }

    #[test]
    fn test_read_reference_uses_first_record() {
        let mut temp = NamedTempFile::with_suffix(".fa").unwrap();
        temp.write_all(b">first\nAAAA\n>second\nCCCC\n").unwrap();
        temp.flush().unwrap();

        let reference = read_reference(temp.path()).unwrap();
        assert_eq!(reference.name, "first");
        assert_eq!(reference.sequence, b"AAAA");
    }

    #[test]
    fn test_read_empty_fasta() {
        let mut temp = NamedTempFile::with_suffix(".fa").unwrap();
        temp.write_all(b"").unwrap();
        temp.flush().unwrap();

        assert!(read_reference(temp.path()).is_err());
    }

    #[test]
    fn test_write_then_read_consensus() {
        let temp = NamedTempFile::with_suffix(".fasta").unwrap();
        let consensus =
            ConsensusSequence::new("sample_cons_Pol", Some("lofreq".to_string()), "ACCTACGT");

        write_consensus(temp.path(), &consensus).unwrap();

        let text = std::fs::read_to_string(temp.path()).unwrap();
        assert!(text.starts_with(">sample_cons_Pol lofreq\n"));

        let reference = read_reference(temp.path()).unwrap();
        assert_eq!(reference.name, "sample_cons_Pol");
        assert_eq!(reference.sequence, b"ACCTACGT");
    }
}
