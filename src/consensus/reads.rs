//! Read trimming, subsampling and filtering.
//!
//! Raw reads are end-trimmed and subsampled by seqtk, then streamed through
//! the in-process filter that drops reads containing `N`, reads shorter than
//! the configured minimum, and (when enabled) reads of low mean quality.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::PipelineConfig;
use crate::consensus::refinement::{remove_quietly, StageError};
use crate::parsing::fastq::{filter_fastq_file, FilterSummary, ReadCriteria};
use crate::tools::{commands, run_checked, ToolRunner};

/// File name of the filtered read set inside the working directory
pub const FILTERED_READS: &str = "high_quality.fastq";

/// The filtered read set and how it was obtained
#[derive(Debug, Clone)]
pub struct FilteredReads {
    pub path: PathBuf,
    pub summary: FilterSummary,
}

/// Trim, subsample and filter `raw` into the working directory
///
/// # Errors
///
/// Returns `StageError::Tool` if seqtk fails and `StageError::Parse` if the
/// trimmed reads cannot be filtered.
pub fn filter_reads<R: ToolRunner + ?Sized>(
    runner: &R,
    raw: &Path,
    work_dir: &Path,
    config: &PipelineConfig,
) -> Result<FilteredReads, StageError> {
    let trimmed = work_dir.join("trimmed.fastq");
    let sampled = work_dir.join("trimmed_sampled.fastq");
    let output = work_dir.join(FILTERED_READS);

    info!(input = %raw.display(), "Trimming reads with seqtk");
    run_checked(runner, &commands::seqtk_trimfq(raw, &trimmed))?;
    run_checked(
        runner,
        &commands::seqtk_sample(config.seed, &trimmed, config.max_reads, &sampled),
    )?;

    let criteria = ReadCriteria {
        min_length: config.min_read_length,
        min_mean_quality: config.min_mean_quality,
    };
    let summary = filter_fastq_file(&sampled, &output, &criteria)?;

    remove_quietly(&trimmed);
    remove_quietly(&sampled);

    info!(
        kept = summary.kept,
        with_n = summary.ambiguous,
        too_short = summary.too_short,
        low_quality = summary.low_quality,
        "Read filtering finished"
    );

    Ok(FilteredReads {
        path: output,
        summary,
    })
}
