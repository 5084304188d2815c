use std::io::BufRead;
use std::path::Path;

use crate::core::hit::{AlignmentHit, TABULAR_COLUMNS};
use crate::parsing::{open_text, ParseError};

/// Parse a BLAST tabular (`-outfmt 6`) hit file
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be read, or other parse errors
/// if a row is malformed.
pub fn parse_hits_file(path: &Path) -> Result<Vec<AlignmentHit>, ParseError> {
    let reader = open_text(path)?;
    parse_hits_reader(reader)
}

/// Parse BLAST tabular text
///
/// # Errors
///
/// Returns `ParseError::InvalidFormat` if a row has the wrong number of
/// columns, or `ParseError::InvalidField` if a numeric column does not parse.
pub fn parse_hits_text(text: &str) -> Result<Vec<AlignmentHit>, ParseError> {
    parse_hits_reader(text.as_bytes())
}

/// Parse BLAST tabular rows from a buffered reader.
///
/// Blank lines and `#` comment lines (as written by `-outfmt 7`) are skipped.
///
/// # Errors
///
/// Returns `ParseError::Io` on read failure, or a row error naming the line.
pub fn parse_hits_reader<R: BufRead>(reader: R) -> Result<Vec<AlignmentHit>, ParseError> {
    let mut hits = Vec::new();

    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim_end();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        hits.push(parse_hit_line(line, i + 1)?);
    }

    Ok(hits)
}

fn parse_hit_line(line: &str, line_num: usize) -> Result<AlignmentHit, ParseError> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() != TABULAR_COLUMNS {
        return Err(ParseError::InvalidFormat(format!(
            "Line {line_num} has {} columns, expected {TABULAR_COLUMNS}",
            fields.len()
        )));
    }

    Ok(AlignmentHit {
        query_id: fields[0].to_string(),
        subject_id: fields[1].to_string(),
        percent_identity: identity(fields[2], line_num)?,
        alignment_length: number(fields[3], "length", line_num)?,
        mismatches: number(fields[4], "mismatch", line_num)?,
        gap_opens: number(fields[5], "gapopen", line_num)?,
        query_start: number(fields[6], "qstart", line_num)?,
        query_end: number(fields[7], "qend", line_num)?,
        subject_start: number(fields[8], "sstart", line_num)?,
        subject_end: number(fields[9], "send", line_num)?,
        evalue: number(fields[10], "evalue", line_num)?,
        bit_score: number(fields[11], "bitscore", line_num)?,
    })
}

fn number<T: std::str::FromStr>(
    value: &str,
    field: &'static str,
    line: usize,
) -> Result<T, ParseError> {
    value.trim().parse().map_err(|_| ParseError::InvalidField {
        line,
        field,
        value: value.to_string(),
    })
}

/// Percent identity must be a finite value in 0..=100
fn identity(value: &str, line: usize) -> Result<f64, ParseError> {
    let pident: f64 = number(value, "pident", line)?;
    if pident.is_finite() && (0.0..=100.0).contains(&pident) {
        Ok(pident)
    } else {
        Err(ParseError::InvalidField {
            line,
            field: "pident",
            value: value.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_outfmt6() {
        let tsv = "read1\tB.FR.83.HXB2\t99.34\t151\t1\t0\t1\t151\t2253\t2403\t2e-73\t274\n\
                   read1\tC.ZA.04.SK164B1\t97.35\t151\t4\t0\t1\t151\t2250\t2400\t1e-67\t257\n";

        let hits = parse_hits_text(tsv).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].query_id, "read1");
        assert_eq!(hits[0].subject_id, "B.FR.83.HXB2");
        assert!((hits[0].percent_identity - 99.34).abs() < 1e-9);
        assert_eq!(hits[0].alignment_length, 151);
        assert_eq!(hits[0].subject_start, 2253);
        assert!((hits[0].evalue - 2e-73).abs() < 1e-80);
        assert!((hits[1].bit_score - 257.0).abs() < 1e-9);
    }

    #[test]
    fn test_skips_comments_and_blank_lines() {
        let tsv = "# BLASTN 2.9.0+\n# Query: read1\n\nread1\tB\t100.00\t50\t0\t0\t1\t50\t1\t50\t1e-20\t93.5\n";
        let hits = parse_hits_text(tsv).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_wrong_column_count() {
        let err = parse_hits_text("read1\tB\t100.0\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidFormat(_)));
    }

    #[test]
    fn test_invalid_identity() {
        let tsv = "read1\tB\thigh\t50\t0\t0\t1\t50\t1\t50\t1e-20\t93.5\n";
        let err = parse_hits_text(tsv).unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidField { field: "pident", line: 1, .. }
        ));
    }

    #[test]
    fn test_non_finite_identity_rejected() {
        for pident in ["nan", "NaN", "inf", "-inf", "101.5", "-1"] {
            let tsv = format!("read1\tB\t{pident}\t50\t0\t0\t1\t50\t1\t50\t1e-20\t93.5\n");
            let err = parse_hits_text(&tsv).unwrap_err();
            assert!(
                matches!(err, ParseError::InvalidField { field: "pident", line: 1, .. }),
                "{pident} was accepted"
            );
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_hits_text("").unwrap().is_empty());
    }
}
