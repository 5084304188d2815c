//! Parsers for the files exchanged with external tools.
//!
//! This module provides parsers for:
//!
//! - **FASTA**: Single-sequence references in, consensus sequences out (noodles)
//! - **FASTQ**: Streaming read filter between the sampler and the aligners (noodles)
//! - **VCF**: Variant records with an `AF` INFO key, as written by LoFreq
//! - **BLAST tabular**: `-outfmt 6` hit rows used for subtype voting
//!
//! ## Example
//!
//! ```rust,no_run
//! use minvar::parsing::vcf::parse_variant_text;
//!
//! let vcf = "##fileformat=VCFv4.0\n\
//!            #CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO\n\
//!            CONSENSUS_B\t3\t.\tG\tC\t100\tPASS\tDP=500;AF=0.9\n";
//! let calls = parse_variant_text(vcf).unwrap();
//! assert_eq!(calls[0].position, 3);
//! ```

use thiserror::Error;

pub mod blast;
pub mod fasta;
pub mod fastq;
pub mod vcf;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Line {line}: missing {field}")]
    MissingField { line: usize, field: &'static str },

    #[error("Line {line}: invalid {field} '{value}'")]
    InvalidField {
        line: usize,
        field: &'static str,
        value: String,
    },
}

/// True for `.gz`/`.bgz` paths, matched case-insensitively
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub(crate) fn is_gzipped(path: &std::path::Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Open a file for buffered reading, transparently decompressing gzip/bgzip
pub(crate) fn open_text(path: &std::path::Path) -> Result<Box<dyn std::io::BufRead>, ParseError> {
    use std::io::BufReader;

    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        // bgzip output is a series of gzip members
        Ok(Box::new(BufReader::new(flate2::read::MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
