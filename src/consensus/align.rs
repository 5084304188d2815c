//! Read alignment to a single reference, producing a sorted, indexed BAM.
//!
//! Each [`Mapper`] has its own index and alignment commands, but all of them
//! end in a SAM file that is converted, coordinate-sorted and indexed with
//! samtools. Index files and intermediate SAM/BAM files are removed once the
//! final BAM is indexed.

use std::path::{Path, PathBuf};

use tracing::info;

use crate::consensus::refinement::{remove_quietly, StageError};
use crate::core::types::Mapper;
use crate::tools::{commands, run_checked, ToolRunner};
use crate::utils::validation::worker_count;

/// SAM flag of reads aligned to the reverse strand
const REVERSE_STRAND_FLAG: u16 = 16;

/// Index files written by `bwa index -p PREFIX`
const BWA_INDEX_SUFFIXES: [&str; 5] = ["amb", "ann", "bwt", "pac", "sa"];

/// Index files written by `smalt index PREFIX`
const SMALT_INDEX_SUFFIXES: [&str; 2] = ["sma", "smi"];

/// One alignment of a read file against a reference
#[derive(Debug, Clone)]
pub struct AlignmentJob<'a> {
    pub mapper: Mapper,
    pub reference: &'a Path,
    pub reads: &'a Path,
    pub output: &'a Path,

    /// Prefix for every scratch file of this job
    pub scratch: &'a str,

    pub aligner_threads: usize,
    pub sort_threads: usize,
}

/// Align reads and write a sorted, indexed BAM to `job.output`
///
/// # Errors
///
/// Returns `StageError::Tool` if any external step fails and
/// `StageError::Io` if scratch space cannot be created.
pub fn align_reads<R: ToolRunner + ?Sized>(
    runner: &R,
    job: &AlignmentJob<'_>,
    work_dir: &Path,
) -> Result<PathBuf, StageError> {
    info!(
        mapper = %job.mapper,
        reference = %job.reference.display(),
        reads = %job.reads.display(),
        "Aligning reads"
    );

    let sam = work_dir.join(format!("{}.sam", job.scratch));
    let threads = worker_count(job.aligner_threads);

    let scratch_files = match job.mapper {
        Mapper::Blast => {
            let fasta = work_dir.join(format!("{}.fasta", job.scratch));
            let xml = work_dir.join(format!("{}.xml", job.scratch));
            run_checked(runner, &commands::seqtk_to_fasta(job.reads, &fasta))?;
            run_checked(runner, &commands::blastn_subject(&fasta, job.reference, &xml))?;
            run_checked(runner, &commands::blast2sam(&xml, &sam))?;
            vec![fasta, xml]
        }
        Mapper::Bwa => {
            let prefix = work_dir.join(format!("{}_idx", job.scratch));
            run_checked(runner, &commands::bwa_index(&prefix, job.reference))?;
            run_checked(runner, &commands::bwa_mem(threads, &prefix, job.reads, &sam))?;
            suffixed(&prefix, &BWA_INDEX_SUFFIXES)
        }
        Mapper::Novoalign => {
            let index = work_dir.join(format!("{}.ndx", job.scratch));
            run_checked(runner, &commands::novoindex(&index, job.reference))?;
            run_checked(runner, &commands::novoalign(threads, &index, job.reads, &sam))?;
            vec![index]
        }
        Mapper::Smalt => {
            let prefix = work_dir.join(format!("{}_idx", job.scratch));
            run_checked(runner, &commands::smalt_index(&prefix, job.reference))?;
            run_checked(runner, &commands::smalt_map(threads, &prefix, job.reads, &sam))?;
            suffixed(&prefix, &SMALT_INDEX_SUFFIXES)
        }
    };

    // Reverse-strand BLAST hits are not converted reliably, so they are dropped
    let exclude = (job.mapper == Mapper::Blast).then_some(REVERSE_STRAND_FLAG);
    let unsorted = work_dir.join(format!("{}.unsorted.bam", job.scratch));
    run_checked(runner, &commands::samtools_view(&sam, exclude, &unsorted))?;

    let sort_dir = tempfile::Builder::new()
        .prefix("sort")
        .tempdir_in(work_dir)?;
    run_checked(
        runner,
        &commands::samtools_sort(
            worker_count(job.sort_threads),
            &sort_dir.path().join(job.scratch),
            &unsorted,
            job.output,
        ),
    )?;
    run_checked(runner, &commands::samtools_index(job.output))?;

    remove_quietly(&sam);
    remove_quietly(&unsorted);
    for file in &scratch_files {
        remove_quietly(file);
    }

    Ok(job.output.to_path_buf())
}

/// `prefix.suffix` for each suffix, keeping any dots already in the prefix
fn suffixed(prefix: &Path, suffixes: &[&str]) -> Vec<PathBuf> {
    suffixes
        .iter()
        .map(|s| {
            let mut name = prefix.as_os_str().to_os_string();
            name.push(".");
            name.push(s);
            PathBuf::from(name)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{ToolInvocation, ToolStatus};
    use std::cell::RefCell;

    #[derive(Default)]
    struct Recorder {
        calls: RefCell<Vec<ToolInvocation>>,
    }

    impl ToolRunner for Recorder {
        fn execute(&self, invocation: &ToolInvocation) -> std::io::Result<ToolStatus> {
            self.calls.borrow_mut().push(invocation.clone());
            Ok(ToolStatus::success())
        }
    }

    fn programs(recorder: &Recorder) -> Vec<String> {
        recorder
            .calls
            .borrow()
            .iter()
            .map(|c| {
                let sub = c.args.first().map(|a| a.to_string_lossy().to_string());
                match sub {
                    Some(s) if !s.starts_with('-') && c.program != "blast2sam.py" => {
                        format!("{} {s}", c.program)
                    }
                    _ => c.program.clone(),
                }
            })
            .collect()
    }

    fn job<'a>(mapper: Mapper, output: &'a Path) -> AlignmentJob<'a> {
        AlignmentJob {
            mapper,
            reference: Path::new("ref.fasta"),
            reads: Path::new("reads.fastq"),
            output,
            scratch: "refcon",
            aligner_threads: 2,
            sort_threads: 2,
        }
    }

    #[test]
    fn test_bwa_steps() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.bam");
        let recorder = Recorder::default();

        align_reads(&recorder, &job(Mapper::Bwa, &output), dir.path()).unwrap();
        assert_eq!(
            programs(&recorder),
            vec![
                "bwa index",
                "bwa mem",
                "samtools view",
                "samtools sort",
                "samtools index"
            ]
        );
        let view = &recorder.calls.borrow()[2];
        assert!(!view.args.iter().any(|a| a == "-F"));
    }

    #[test]
    fn test_blast_steps_drop_reverse_strand() {
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.bam");
        let recorder = Recorder::default();

        align_reads(&recorder, &job(Mapper::Blast, &output), dir.path()).unwrap();
        assert_eq!(
            programs(&recorder),
            vec![
                "seqtk seq",
                "blastn",
                "blast2sam.py",
                "samtools view",
                "samtools sort",
                "samtools index"
            ]
        );
        let view = &recorder.calls.borrow()[3];
        assert_eq!(view.value_of("-F"), Some(Path::new("16")));
    }

    #[test]
    fn test_failure_stops_before_sorting() {
        struct FailOn(&'static str);
        impl ToolRunner for FailOn {
            fn execute(&self, invocation: &ToolInvocation) -> std::io::Result<ToolStatus> {
                if invocation.program == self.0 {
                    Ok(ToolStatus::failure(2, "boom"))
                } else {
                    Ok(ToolStatus::success())
                }
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.bam");
        let err = align_reads(&FailOn("novoalign"), &job(Mapper::Novoalign, &output), dir.path())
            .unwrap_err();
        assert!(matches!(err, StageError::Tool(_)));
    }

    #[test]
    fn test_suffixed() {
        let files = suffixed(Path::new("/w/hq_2_cons_idx"), &BWA_INDEX_SUFFIXES);
        assert_eq!(files[0], PathBuf::from("/w/hq_2_cons_idx.amb"));
        assert_eq!(files[4], PathBuf::from("/w/hq_2_cons_idx.sa"));
    }
}
