//! Subtype classification by weighted best-hit voting.
//!
//! A sample of reads is searched against a panel of subtype reference
//! sequences. Every read (query) with at least one hit casts one vote, split
//! evenly across the hits tied at its best percent identity. Each subject's
//! votes are divided by the number of voting queries, so the weights of all
//! subjects sum to 1 whenever any read produced a hit.
//!
//! The result is advisory: it is reported next to the consensus but never
//! influences it.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

use crate::core::frequency::FrequencyTable;
use crate::core::hit::AlignmentHit;
use crate::parsing::blast::parse_hits_file;
use crate::parsing::ParseError;
use crate::tools::{commands, run_checked, ToolError, ToolRunner};
use crate::utils::validation::{blast_db_exists, blast_db_stem, worker_count};

#[derive(Error, Debug)]
pub enum ClassifyError {
    #[error("Subtype panel database not found: {0}")]
    MissingPanel(PathBuf),

    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error("Failed to read panel hits: {0}")]
    Parse(#[from] ParseError),
}

/// Count weighted best-hit votes per subject.
///
/// Hits are grouped by query id. Within a query, every hit whose percent
/// identity equals the query's maximum receives `1 / ties`. Accumulated
/// weights are normalized by the number of distinct queries. Subjects that
/// never appear in a best-hit set get no entry; ties in the final ranking
/// keep the order in which subjects first received a vote.
#[must_use]
pub fn vote(hits: &[AlignmentHit]) -> FrequencyTable {
    // Group hits per query, keeping first-seen order
    let mut query_index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<Vec<&AlignmentHit>> = Vec::new();
    for hit in hits {
        let idx = *query_index.entry(hit.query_id.as_str()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(hit);
    }

    let mut subject_index: HashMap<&str, usize> = HashMap::new();
    let mut votes: Vec<(String, f64)> = Vec::new();

    for group in &groups {
        let best = group
            .iter()
            .map(|h| h.percent_identity)
            .fold(f64::NEG_INFINITY, f64::max);

        #[allow(clippy::float_cmp)] // ties are exact copies of the same parsed column
        let tied: Vec<&&AlignmentHit> =
            group.iter().filter(|h| h.percent_identity == best).collect();
        let share = 1.0 / count_to_f64(tied.len());

        for hit in tied {
            let idx = *subject_index
                .entry(hit.subject_id.as_str())
                .or_insert_with(|| {
                    votes.push((hit.subject_id.clone(), 0.0));
                    votes.len() - 1
                });
            votes[idx].1 += share;
        }
    }

    let queries = groups.len();
    if queries > 0 {
        let denominator = count_to_f64(queries);
        for (_, weight) in &mut votes {
            *weight /= denominator;
        }
    }

    FrequencyTable::from_weights(votes, queries, hits.len())
}

#[inline]
fn count_to_f64(count: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    {
        count as f64
    }
}

/// Samples reads, searches them against the subtype panel, and votes
pub struct SubtypeClassifier<'a, R: ToolRunner + ?Sized> {
    runner: &'a R,
    panel: &'a Path,
    seed: u64,
    thread_cap: usize,
}

impl<'a, R: ToolRunner + ?Sized> SubtypeClassifier<'a, R> {
    pub fn new(runner: &'a R, panel: &'a Path, seed: u64, thread_cap: usize) -> Self {
        Self {
            runner,
            panel,
            seed,
            thread_cap,
        }
    }

    /// Fail fast when the panel database is absent
    ///
    /// # Errors
    ///
    /// Returns `ClassifyError::MissingPanel` if no BLAST database is found.
    pub fn check_panel(&self) -> Result<(), ClassifyError> {
        if blast_db_exists(self.panel) {
            Ok(())
        } else {
            Err(ClassifyError::MissingPanel(self.panel.to_path_buf()))
        }
    }

    /// Classify up to `sample_size` reads from `reads`, writing scratch files to `work_dir`
    ///
    /// # Errors
    ///
    /// Returns `ClassifyError::MissingPanel` if the panel does not exist,
    /// `ClassifyError::Tool` if sampling or the search fails, and
    /// `ClassifyError::Parse` if the hit table cannot be read.
    pub fn classify(
        &self,
        reads: &Path,
        sample_size: u64,
        work_dir: &Path,
    ) -> Result<FrequencyTable, ClassifyError> {
        self.check_panel()?;

        let sample_fastq = work_dir.join("sample_hq.fastq");
        let sample_fasta = work_dir.join("sample_hq.fasta");
        let hits_file = work_dir.join("loc_res.tsv");

        run_checked(
            self.runner,
            &commands::seqtk_sample(self.seed, reads, sample_size, &sample_fastq),
        )?;
        run_checked(
            self.runner,
            &commands::seqtk_to_fasta(&sample_fastq, &sample_fasta),
        )?;
        run_checked(
            self.runner,
            &commands::blastn_panel(
                &sample_fasta,
                &blast_db_stem(self.panel),
                worker_count(self.thread_cap),
                &hits_file,
            ),
        )?;

        let hits = parse_hits_file(&hits_file)?;
        let table = vote(&hits);
        info!(
            queries = table.queries,
            hits = table.hits,
            subtypes = table.len(),
            "Subtype voting finished"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(query: &str, subject: &str, identity: f64) -> AlignmentHit {
        AlignmentHit::scored(query, subject, identity)
    }

    #[test]
    fn test_tied_best_hits_share_the_vote() {
        let hits = vec![
            hit("q1", "B", 99.0),
            hit("q1", "C", 99.0),
            hit("q1", "A1", 95.0),
            hit("q2", "B", 98.0),
        ];
        let table = vote(&hits);

        assert_eq!(table.queries, 2);
        assert_eq!(table.hits, 4);
        // B: (0.5 + 1) / 2, C: 0.5 / 2
        assert!((table.get("B").unwrap() - 0.75).abs() < 1e-12);
        assert!((table.get("C").unwrap() - 0.25).abs() < 1e-12);
        assert!((table.total_weight() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_subject_never_best_has_no_entry() {
        let hits = vec![hit("q1", "B", 99.0), hit("q1", "A1", 90.0)];
        let table = vote(&hits);
        assert!(table.get("A1").is_none());
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_empty_hits_give_empty_table() {
        let table = vote(&[]);
        assert!(table.is_empty());
        assert_eq!(table.queries, 0);
    }

    #[test]
    fn test_ranking_is_descending_and_stable() {
        let hits = vec![
            hit("q1", "D", 97.0),
            hit("q2", "B", 99.0),
            hit("q3", "B", 99.0),
            hit("q4", "A1", 99.5),
        ];
        let table = vote(&hits);
        let subjects: Vec<&str> = table.entries().iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["B", "D", "A1"]);
        assert!((table.get("B").unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_interleaved_queries_group_together() {
        let hits = vec![
            hit("q1", "B", 90.0),
            hit("q2", "C", 99.0),
            hit("q1", "C", 95.0),
        ];
        let table = vote(&hits);
        // q1 best is C at 95, q2 best is C
        assert!((table.get("C").unwrap() - 1.0).abs() < 1e-12);
        assert!(table.get("B").is_none());
    }

    #[test]
    fn test_missing_panel() {
        struct NeverRun;
        impl ToolRunner for NeverRun {
            fn execute(
                &self,
                _: &crate::tools::ToolInvocation,
            ) -> std::io::Result<crate::tools::ToolStatus> {
                panic!("no tool should run without a panel");
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let panel = dir.path().join("absent.nsq");
        let classifier = SubtypeClassifier::new(&NeverRun, &panel, 11, 6);
        let err = classifier
            .classify(Path::new("reads.fastq"), 10, dir.path())
            .unwrap_err();
        assert!(matches!(err, ClassifyError::MissingPanel(_)));
    }
}
