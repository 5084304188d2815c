//! Parser for variant records in VCF files.
//!
//! Only the columns the phaser needs are read: `POS`, `REF`, `ALT` and the
//! `AF` key of `INFO`. Header and meta lines (anything starting with `#`) are
//! skipped, as are blank lines.
//!
//! The `ALT` column is kept verbatim so multiallelic records reach the phaser,
//! which rejects them. INFO flags without a value (LoFreq writes `INDEL`) are
//! ignored.

use std::io::BufRead;
use std::path::Path;

use crate::core::variant::VariantCall;
use crate::parsing::{open_text, ParseError};

/// Minimum number of tab-separated columns in a VCF record (through INFO)
const MIN_COLUMNS: usize = 8;

/// Parse all variant records from a VCF file (plain, gzip, or bgzip)
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or a field error
/// naming the offending line if a record is malformed.
pub fn parse_variant_file(path: &Path) -> Result<Vec<VariantCall>, ParseError> {
    let reader = open_text(path)?;
    parse_variant_reader(reader)
}

/// Parse variant records from VCF text
///
/// # Errors
///
/// Returns a field error naming the offending line if a record is malformed.
pub fn parse_variant_text(text: &str) -> Result<Vec<VariantCall>, ParseError> {
    parse_variant_reader(text.as_bytes())
}

/// Parse variant records from any buffered reader
///
/// # Errors
///
/// Returns `ParseError::Io` on read failure, or a field error naming the
/// offending line if a record is malformed.
pub fn parse_variant_reader<R: BufRead>(reader: R) -> Result<Vec<VariantCall>, ParseError> {
    let mut calls = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        // Line numbers in errors are 1-based for user friendliness
        let line_num = i + 1;

        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        calls.push(parse_record_line(trimmed, line_num)?);
    }

    Ok(calls)
}

/// Parse a single data line into a `VariantCall`
fn parse_record_line(line: &str, line_num: usize) -> Result<VariantCall, ParseError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < MIN_COLUMNS {
        return Err(ParseError::InvalidFormat(format!(
            "Line {line_num} has {} columns, expected at least {MIN_COLUMNS}",
            fields.len()
        )));
    }

    let position: usize = fields[1].parse().map_err(|_| ParseError::InvalidField {
        line: line_num,
        field: "POS",
        value: fields[1].to_string(),
    })?;

    let reference_allele = fields[3];
    if reference_allele.is_empty() || reference_allele == "." {
        return Err(ParseError::MissingField {
            line: line_num,
            field: "REF",
        });
    }

    let alternate_allele = fields[4];
    if alternate_allele.is_empty() || alternate_allele == "." {
        return Err(ParseError::MissingField {
            line: line_num,
            field: "ALT",
        });
    }

    let af = info_value(fields[7], "AF").ok_or(ParseError::MissingField {
        line: line_num,
        field: "AF in INFO",
    })?;
    let allele_frequency: f64 = af.parse().map_err(|_| ParseError::InvalidField {
        line: line_num,
        field: "AF",
        value: af.to_string(),
    })?;
    if !(0.0..=1.0).contains(&allele_frequency) {
        return Err(ParseError::InvalidField {
            line: line_num,
            field: "AF",
            value: af.to_string(),
        });
    }

    Ok(VariantCall::new(
        position,
        reference_allele,
        alternate_allele,
        allele_frequency,
    ))
}

/// Look up `key` in a semicolon-separated INFO column, skipping value-less flags
fn info_value<'a>(info: &'a str, key: &str) -> Option<&'a str> {
    info.split(';')
        .filter_map(|entry| entry.split_once('='))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const LOFREQ_VCF: &str = "##fileformat=VCFv4.0
##source=lofreq call --call-indels -f ref.fasta refcon_sorted.bam
##INFO=<ID=AF,Number=1,Type=Float,Description=\"Allele Frequency\">
#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO
CONSENSUS_B\t3\t.\tG\tC\t3143\tPASS\tDP=500;AF=0.900000;SB=0;DP4=0,1,200,250
CONSENSUS_B\t7\t.\tGA\tG\t80\tPASS\tDP=480;AF=0.120000;SB=3;DP4=200,220,30,28;INDEL;HRUN=2
";

    #[test]
    fn test_parse_lofreq_records() {
        let calls = parse_variant_text(LOFREQ_VCF).unwrap();
        assert_eq!(calls.len(), 2);

        assert_eq!(calls[0].position, 3);
        assert_eq!(calls[0].reference_allele, "G");
        assert_eq!(calls[0].alternate_allele, "C");
        assert!((calls[0].allele_frequency - 0.9).abs() < 1e-9);

        assert_eq!(calls[1].position, 7);
        assert_eq!(calls[1].reference_allele, "GA");
        assert_eq!(calls[1].alternate_allele, "G");
        assert!((calls[1].allele_frequency - 0.12).abs() < 1e-9);
    }

    #[test]
    fn test_header_only_yields_no_calls() {
        let vcf = "##fileformat=VCFv4.0\n#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n";
        assert!(parse_variant_text(vcf).unwrap().is_empty());
        assert!(parse_variant_text("").unwrap().is_empty());
    }

    #[test]
    fn test_multiallelic_alt_is_kept_verbatim() {
        let vcf = "ref\t10\t.\tA\tC,G\t50\tPASS\tAF=0.4\n";
        let calls = parse_variant_text(vcf).unwrap();
        assert_eq!(calls[0].alternate_allele, "C,G");
        assert!(calls[0].is_multiallelic());
    }

    #[test]
    fn test_missing_af_names_line() {
        let vcf = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\nref\t10\t.\tA\tC\t50\tPASS\tDP=10\n";
        let err = parse_variant_text(vcf).unwrap_err();
        assert!(matches!(err, ParseError::MissingField { line: 2, .. }));
        assert!(err.to_string().contains("Line 2"));
    }

    #[test]
    fn test_invalid_position() {
        let vcf = "ref\tten\t.\tA\tC\t50\tPASS\tAF=0.5\n";
        let err = parse_variant_text(vcf).unwrap_err();
        assert!(matches!(err, ParseError::InvalidField { field: "POS", .. }));
    }

    #[test]
    fn test_out_of_range_af() {
        let vcf = "ref\t1\t.\tA\tC\t50\tPASS\tAF=1.5\n";
        assert!(parse_variant_text(vcf).is_err());
    }

    #[test]
    fn test_too_few_columns() {
        let vcf = "ref\t1\t.\tA\tC\n";
        assert!(matches!(
            parse_variant_text(vcf),
            Err(ParseError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_info_value_skips_flags() {
        assert_eq!(info_value("INDEL;AF=0.3;DP=5", "AF"), Some("0.3"));
        assert_eq!(info_value("INDEL;DP=5", "AF"), None);
        assert_eq!(info_value("AFX=1;AF=0.2", "AF"), Some("0.2"));
    }

    #[test]
    fn test_parse_gzipped_file() {
        use flate2::write::GzEncoder;
        use flate2::Compression;

        let mut temp = NamedTempFile::with_suffix(".vcf.gz").unwrap();
        {
            let mut encoder = GzEncoder::new(temp.as_file_mut(), Compression::default());
            encoder.write_all(LOFREQ_VCF.as_bytes()).unwrap();
            encoder.finish().unwrap();
        }

        let calls = parse_variant_file(temp.path()).unwrap();
        assert_eq!(calls.len(), 2);
    }
}
