//! The two-round consensus refinement loop.
//!
//! ```text
//! raw reads ─ filter ─▶ high_quality.fastq
//!                         │
//!   seed reference ─▶ round 1 (shallow sample, permissive aligner) ─▶ cns_1.fasta
//!                         │
//!       cns_1.fasta ─▶ round 2 (deep sample, strict aligner) ─▶ cns_2.fasta
//!                         │
//!                      finalize: relabel ─▶ cns_final.fasta (+ .fai)
//!                                subtype voting ─▶ subtype_evidence.csv
//!                                align all reads ─▶ hq_2_cns_final.bam (+ .bai)
//! ```
//!
//! Each round runs sample → align → call variants → phase exactly once.
//! Exactly two rounds are run regardless of how many variants are found;
//! there is no convergence check. Every failure is fatal: the run stops at
//! the stage that failed and no partial consensus is reported.

use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::{PipelineConfig, RoundConfig};
use crate::consensus::align::{align_reads, AlignmentJob};
use crate::consensus::classifier::{ClassifyError, SubtypeClassifier};
use crate::consensus::phaser::{PhaseError, VariantPhaser};
use crate::consensus::reads::filter_reads;
use crate::core::frequency::FrequencyTable;
use crate::core::sequence::{ConsensusSequence, ReferenceSequence, SequenceSummary};
use crate::core::types::Mapper;
use crate::parsing::fastq::FilterSummary;
use crate::parsing::vcf::parse_variant_file;
use crate::parsing::{fasta, ParseError};
use crate::tools::{commands, run_checked, ToolError, ToolRunner};
use crate::utils::validation::worker_count;

/// File names inside the working directory
pub const SEED_COPY: &str = "seed_reference.fasta";
pub const FINAL_CONSENSUS: &str = "cns_final.fasta";
pub const FINAL_ALIGNMENT: &str = "hq_2_cns_final.bam";
pub const SUBTYPE_REPORT: &str = "subtype_evidence.csv";
pub const RUN_SUMMARY: &str = "run_summary.json";
const ROUND_SAMPLE: &str = "hq_smp.fastq";
const ROUND_ALIGNMENT: &str = "refcon_sorted.bam";
const ROUND_CALLS: &str = "calls.vcf";

/// Step of the pipeline a failure is attributed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Filter,
    Round(usize),
    Finalize,
    Subtype,
    FinalAlignment,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Filter => write!(f, "Read filtering"),
            Self::Round(n) => write!(f, "Refinement round {n}"),
            Self::Finalize => write!(f, "Consensus finalization"),
            Self::Subtype => write!(f, "Subtype classification"),
            Self::FinalAlignment => write!(f, "Final alignment"),
        }
    }
}

/// Failure inside a single stage
#[derive(Error, Debug)]
pub enum StageError {
    #[error(transparent)]
    Tool(#[from] ToolError),

    #[error(transparent)]
    Phase(#[from] PhaseError),

    #[error(transparent)]
    Classify(#[from] ClassifyError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Precondition failed: {what} not found: {}", path.display())]
    MissingInput { what: &'static str, path: PathBuf },

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: StageError,
    },
}

trait InStage<T> {
    fn in_stage(self, stage: Stage) -> Result<T, PipelineError>;
}

impl<T, E: Into<StageError>> InStage<T> for Result<T, E> {
    fn in_stage(self, stage: Stage) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::Stage {
            stage,
            source: e.into(),
        })
    }
}

/// What one refinement round produced
#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round: usize,
    pub reference: String,
    pub sample_size: u64,
    pub mapper: Mapper,

    /// Records in the round's variant-call file
    pub variant_calls: usize,

    /// Calls whose alternate allele became the consensus base
    pub applied: usize,

    pub consensus_path: PathBuf,
    pub consensus: SequenceSummary,

    /// Compressed variant calls, when bgzip produced them
    #[serde(skip_serializing_if = "Option::is_none")]
    pub archived_calls: Option<PathBuf>,
}

/// Everything a refinement run produced
#[derive(Debug, Clone, Serialize)]
pub struct RefinementOutcome {
    pub created_at: String,
    pub input: PathBuf,
    pub seed: u64,
    pub filtered_reads: PathBuf,
    pub filter: FilterSummary,
    pub rounds: Vec<RoundSummary>,
    pub consensus_path: PathBuf,
    pub consensus: SequenceSummary,
    pub alignment: PathBuf,
    pub subtype_report: PathBuf,
    pub subtypes: FrequencyTable,
}

/// Runs the full pipeline inside one working directory.
///
/// Not re-entrant: two runs must not share a working directory.
pub struct ConsensusRefinement<'a, R: ToolRunner + ?Sized> {
    runner: &'a R,
    config: &'a PipelineConfig,
    work_dir: PathBuf,
}

impl<'a, R: ToolRunner + ?Sized> ConsensusRefinement<'a, R> {
    pub fn new(runner: &'a R, config: &'a PipelineConfig, work_dir: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            config,
            work_dir: work_dir.into(),
        }
    }

    /// Build the final consensus and alignment for `reads`
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::MissingInput` if the reads, seed reference, or
    /// subtype panel do not exist, and `PipelineError::Stage` naming the stage
    /// that failed for any tool, parse, phasing, or I/O failure.
    pub fn run(&self, reads: &Path) -> Result<RefinementOutcome, PipelineError> {
        self.check_preconditions(reads)?;

        // Tools run with the working directory as cwd; every path passed to them is absolute
        std::fs::create_dir_all(&self.work_dir).in_stage(Stage::Filter)?;
        let work_dir = std::fs::canonicalize(&self.work_dir).in_stage(Stage::Filter)?;
        let reads = std::fs::canonicalize(reads).in_stage(Stage::Filter)?;
        let panel = absolute(&self.config.subtype_panel).in_stage(Stage::Subtype)?;

        info!(
            input = %reads.display(),
            work_dir = %work_dir.display(),
            seed = self.config.seed,
            "Starting consensus refinement"
        );

        let filtered =
            filter_reads(self.runner, &reads, &work_dir, self.config).in_stage(Stage::Filter)?;
        if filtered.summary.kept == 0 {
            warn!("No reads passed filtering; alignments will be empty");
        }

        // Round 1 aligns against a private copy of the seed; index files land next to it
        let seed = fasta::read_reference(&self.config.seed_reference).in_stage(Stage::Round(1))?;
        let mut reference_path = work_dir.join(SEED_COPY);
        fasta::write_reference(&reference_path, &seed).in_stage(Stage::Round(1))?;
        let mut reference = seed;

        let mut rounds = Vec::with_capacity(self.config.rounds.len());
        let mut consensus = ConsensusSequence::unchanged(&reference);
        for (i, round_config) in self.config.rounds.iter().enumerate() {
            let round = i + 1;
            let (round_consensus, summary) = self
                .run_round(
                    round,
                    round_config,
                    &reference,
                    &reference_path,
                    &filtered.path,
                    &work_dir,
                )
                .in_stage(Stage::Round(round))?;

            reference_path.clone_from(&summary.consensus_path);
            reference = round_consensus.clone().into_reference();
            consensus = round_consensus;
            rounds.push(summary);
        }

        let final_consensus = consensus.relabeled(self.config.sample_label.as_str());
        let consensus_path = work_dir.join(FINAL_CONSENSUS);
        self.finalize(&final_consensus, &consensus_path)
            .in_stage(Stage::Finalize)?;

        let subtypes = SubtypeClassifier::new(
            self.runner,
            &panel,
            self.config.seed,
            self.config.threads.blast,
        )
        .classify(&filtered.path, self.config.subtype_sample_size, &work_dir)
        .in_stage(Stage::Subtype)?;
        let subtype_report = work_dir.join(SUBTYPE_REPORT);
        write_subtype_report(&subtype_report, &subtypes).in_stage(Stage::Subtype)?;
        if let Some(best) = subtypes.best() {
            info!(subtype = %best.subject, weight = best.weight, "Closest panel subtype");
        }

        let alignment_path = work_dir.join(FINAL_ALIGNMENT);
        let job = AlignmentJob {
            mapper: self.config.final_mapper,
            reference: &consensus_path,
            reads: &filtered.path,
            output: &alignment_path,
            scratch: "hq_2_cons",
            aligner_threads: self.config.threads.aligner,
            sort_threads: self.config.threads.final_sort,
        };
        align_reads(self.runner, &job, &work_dir).in_stage(Stage::FinalAlignment)?;

        let outcome = RefinementOutcome {
            created_at: chrono::Utc::now().to_rfc3339(),
            input: reads,
            seed: self.config.seed,
            filtered_reads: filtered.path,
            filter: filtered.summary,
            rounds,
            consensus_path,
            consensus: final_consensus.summary(),
            alignment: alignment_path,
            subtype_report,
            subtypes,
        };

        write_run_summary(&work_dir.join(RUN_SUMMARY), &outcome).in_stage(Stage::Finalize)?;
        info!(
            consensus = %outcome.consensus_path.display(),
            alignment = %outcome.alignment.display(),
            "Consensus refinement finished"
        );

        Ok(outcome)
    }

    fn check_preconditions(&self, reads: &Path) -> Result<(), PipelineError> {
        if !reads.is_file() {
            return Err(PipelineError::MissingInput {
                what: "input reads",
                path: reads.to_path_buf(),
            });
        }
        if !self.config.seed_reference.is_file() {
            return Err(PipelineError::MissingInput {
                what: "seed reference",
                path: self.config.seed_reference.clone(),
            });
        }
        let classifier = SubtypeClassifier::new(
            self.runner,
            &self.config.subtype_panel,
            self.config.seed,
            self.config.threads.blast,
        );
        if classifier.check_panel().is_err() {
            return Err(PipelineError::MissingInput {
                what: "subtype panel",
                path: self.config.subtype_panel.clone(),
            });
        }
        Ok(())
    }

    /// sample → align → call → phase against `reference`
    fn run_round(
        &self,
        round: usize,
        round_config: &RoundConfig,
        reference: &ReferenceSequence,
        reference_path: &Path,
        reads: &Path,
        work_dir: &Path,
    ) -> Result<(ConsensusSequence, RoundSummary), StageError> {
        info!(
            round,
            reference = %reference.name,
            sample_size = round_config.sample_size,
            mapper = %round_config.mapper,
            "Starting refinement round"
        );

        let sample = work_dir.join(ROUND_SAMPLE);
        run_checked(
            self.runner,
            &commands::seqtk_sample(self.config.seed, reads, round_config.sample_size, &sample),
        )?;

        let bam = work_dir.join(ROUND_ALIGNMENT);
        let job = AlignmentJob {
            mapper: round_config.mapper,
            reference: reference_path,
            reads: &sample,
            output: &bam,
            scratch: "refcon",
            aligner_threads: self.config.threads.aligner,
            sort_threads: self.config.threads.sort,
        };
        align_reads(self.runner, &job, work_dir)?;

        run_checked(self.runner, &commands::samtools_faidx(reference_path))?;

        // lofreq refuses to overwrite an existing output
        let calls_path = work_dir.join(ROUND_CALLS);
        remove_quietly(&calls_path);
        run_checked(
            self.runner,
            &commands::lofreq_call(
                worker_count(self.config.threads.caller),
                reference_path,
                &bam,
                &calls_path,
            ),
        )?;

        let calls = parse_variant_file(&calls_path)?;
        let (consensus, applied) = if calls.is_empty() {
            info!(round, "No variants found, consensus equals the reference");
            (ConsensusSequence::unchanged(reference), 0)
        } else {
            let (consensus, stats) = VariantPhaser::new(reference).phase_with_stats(&calls)?;
            info!(
                round,
                calls = stats.calls,
                applied = stats.applied,
                "Variants phased into consensus"
            );
            (consensus, stats.applied)
        };

        let consensus_path = work_dir.join(format!("cns_{round}.fasta"));
        fasta::write_consensus(&consensus_path, &consensus)?;

        let archived_calls = self.archive_calls(round, &calls_path, work_dir)?;

        let summary = RoundSummary {
            round,
            reference: reference.name.clone(),
            sample_size: round_config.sample_size,
            mapper: round_config.mapper,
            variant_calls: calls.len(),
            applied,
            consensus_path,
            consensus: consensus.summary(),
            archived_calls,
        };
        Ok((consensus, summary))
    }

    /// Compress the round's calls and keep them as `calls_<round>.vcf.gz`
    fn archive_calls(
        &self,
        round: usize,
        calls_path: &Path,
        work_dir: &Path,
    ) -> Result<Option<PathBuf>, StageError> {
        run_checked(self.runner, &commands::bgzip(calls_path))?;

        let compressed = work_dir.join(format!("{ROUND_CALLS}.gz"));
        if !compressed.is_file() {
            info!(round, "No compressed variant calls to archive");
            return Ok(None);
        }
        let archived = work_dir.join(format!("calls_{round}.vcf.gz"));
        std::fs::rename(&compressed, &archived)?;
        Ok(Some(archived))
    }

    fn finalize(&self, consensus: &ConsensusSequence, path: &Path) -> Result<(), StageError> {
        info!(label = %consensus.name, path = %path.display(), "Writing final consensus");
        fasta::write_consensus(path, consensus)?;
        run_checked(self.runner, &commands::samtools_faidx(path))?;
        Ok(())
    }
}

fn write_subtype_report(path: &Path, table: &FrequencyTable) -> std::io::Result<()> {
    let file = std::fs::File::create(path)?;
    table.write_csv(std::io::BufWriter::new(file))
}

fn write_run_summary(path: &Path, outcome: &RefinementOutcome) -> std::io::Result<()> {
    let mut writer = std::io::BufWriter::new(std::fs::File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, outcome)?;
    writer.flush()
}

fn absolute(path: &Path) -> std::io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

/// Delete a scratch file, ignoring a file that is already gone
pub(crate) fn remove_quietly(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Could not remove scratch file");
        }
    }
}
