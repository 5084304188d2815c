use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::OutputFormat;
use crate::config::PipelineConfig;
use crate::consensus::refinement::{ConsensusRefinement, RefinementOutcome};
use crate::core::types::Mapper;
use crate::tools::ProcessRunner;

#[derive(Args)]
pub struct PrepareArgs {
    /// Reads to build the consensus from (FASTQ, optionally gzipped)
    #[arg(required = true)]
    pub reads: PathBuf,

    /// JSON configuration file; command-line options override its values
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Directory for all intermediate and output files
    #[arg(short, long, default_value = ".")]
    pub work_dir: PathBuf,

    /// Seed for every read subsampling step
    #[arg(long)]
    pub seed: Option<u64>,

    /// FASTA reference the first round starts from
    #[arg(long)]
    pub seed_reference: Option<PathBuf>,

    /// BLAST nucleotide database of subtype references (.nsq or stem)
    #[arg(long)]
    pub panel: Option<PathBuf>,

    /// Maximum number of reads kept after trimming
    #[arg(long)]
    pub max_reads: Option<u64>,

    /// Aligner for the final alignment of all reads to the consensus
    #[arg(long, value_enum)]
    pub final_mapper: Option<Mapper>,

    /// Cap every external tool at this many threads
    #[arg(short, long)]
    pub threads: Option<usize>,
}

/// Execute prepare subcommand
///
/// # Errors
///
/// Returns an error if the configuration is invalid, a precondition fails,
/// or any pipeline stage fails.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: PrepareArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = build_config(&args)?;

    if verbose {
        eprintln!(
            "Rounds: {} reads with {}, then {} reads with {}",
            config.rounds[0].sample_size,
            config.rounds[0].mapper,
            config.rounds[1].sample_size,
            config.rounds[1].mapper,
        );
    }

    let runner = ProcessRunner::new(&args.work_dir);
    let outcome = ConsensusRefinement::new(&runner, &config, &args.work_dir)
        .run(&args.reads)
        .with_context(|| format!("Consensus refinement of {} failed", args.reads.display()))?;

    match format {
        OutputFormat::Text => print_text_summary(&outcome, verbose),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Tsv => print_tsv_summary(&outcome),
    }

    Ok(())
}

fn build_config(args: &PrepareArgs) -> anyhow::Result<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load_from_file(path)
            .with_context(|| format!("Failed to load configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };

    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    if let Some(path) = &args.seed_reference {
        config.seed_reference.clone_from(path);
    }
    if let Some(path) = &args.panel {
        config.subtype_panel.clone_from(path);
    }
    if let Some(max_reads) = args.max_reads {
        config.max_reads = max_reads;
    }
    if let Some(mapper) = args.final_mapper {
        config.final_mapper = mapper;
    }
    if let Some(cap) = args.threads {
        let caps = &mut config.threads;
        caps.aligner = cap;
        caps.sort = cap;
        caps.final_sort = cap;
        caps.caller = cap;
        caps.blast = cap;
    }

    config.validate()?;
    Ok(config)
}

fn print_text_summary(outcome: &RefinementOutcome, verbose: bool) {
    println!(
        "Reads kept: {} of {} ({} with N, {} too short, {} low quality)",
        outcome.filter.kept,
        outcome.filter.total(),
        outcome.filter.ambiguous,
        outcome.filter.too_short,
        outcome.filter.low_quality,
    );
    println!();

    for round in &outcome.rounds {
        println!(
            "Round {}: {} reads with {} against {}",
            round.round, round.sample_size, round.mapper, round.reference
        );
        println!(
            "   {} variant calls, {} majority alternate alleles applied",
            round.variant_calls, round.applied
        );
        if verbose {
            println!("   Consensus: {} (md5 {})", round.consensus_path.display(), round.consensus.md5);
            if let Some(archived) = &round.archived_calls {
                println!("   Calls:     {}", archived.display());
            }
        }
    }
    println!();

    println!(
        "Consensus: {} ({} bp, md5 {})",
        outcome.consensus_path.display(),
        outcome.consensus.length,
        outcome.consensus.md5
    );
    println!("Alignment: {}", outcome.alignment.display());
    println!();

    match outcome.subtypes.best() {
        Some(best) => {
            println!(
                "Closest subtype: {} ({:.1}% of {} reads with hits)",
                best.subject,
                best.weight * 100.0,
                outcome.subtypes.queries
            );
            if verbose {
                for entry in outcome.subtypes.entries().iter().skip(1) {
                    println!("   {}: {:.1}%", entry.subject, entry.weight * 100.0);
                }
            }
        }
        None => println!("Closest subtype: none (no panel hits)"),
    }
}

fn print_tsv_summary(outcome: &RefinementOutcome) {
    println!("round\treference\tmapper\tsample_size\tvariant_calls\tapplied\tlength\tmd5\tconsensus");
    for round in &outcome.rounds {
        println!(
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            round.round,
            round.reference,
            round.mapper,
            round.sample_size,
            round.variant_calls,
            round.applied,
            round.consensus.length,
            round.consensus.md5,
            round.consensus_path.display()
        );
    }
    println!(
        "final\t{}\t-\t{}\t-\t-\t{}\t{}\t{}",
        outcome.consensus.name,
        outcome.filter.kept,
        outcome.consensus.length,
        outcome.consensus.md5,
        outcome.consensus_path.display()
    );
}
