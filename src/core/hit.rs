use serde::Serialize;

/// Number of columns in BLAST tabular output (`-outfmt 6`)
pub const TABULAR_COLUMNS: usize = 12;

/// One row of tabular local-alignment output.
///
/// Column order follows BLAST `-outfmt 6`:
/// `qseqid sseqid pident length mismatch gapopen qstart qend sstart send evalue bitscore`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlignmentHit {
    pub query_id: String,
    pub subject_id: String,
    pub percent_identity: f64,
    pub alignment_length: u64,
    pub mismatches: u64,
    pub gap_opens: u64,
    pub query_start: u64,
    pub query_end: u64,
    pub subject_start: u64,
    pub subject_end: u64,
    pub evalue: f64,
    pub bit_score: f64,
}

impl AlignmentHit {
    /// Minimal hit carrying only the fields subtype voting looks at
    #[cfg(test)]
    pub fn scored(
        query_id: impl Into<String>,
        subject_id: impl Into<String>,
        percent_identity: f64,
    ) -> Self {
        Self {
            query_id: query_id.into(),
            subject_id: subject_id.into(),
            percent_identity,
            alignment_length: 100,
            mismatches: 0,
            gap_opens: 0,
            query_start: 1,
            query_end: 100,
            subject_start: 1,
            subject_end: 100,
            evalue: 1e-50,
            bit_score: 185.0,
        }
    }
}
