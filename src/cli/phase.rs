use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::cli::OutputFormat;
use crate::consensus::phaser::{PhaseStats, VariantPhaser};
use crate::core::sequence::ConsensusSequence;
use crate::parsing::fasta;

#[derive(Args)]
pub struct PhaseArgs {
    /// Reference FASTA the variants were called against (first record is used)
    #[arg(short, long)]
    pub reference: PathBuf,

    /// Variant calls with an AF INFO key (VCF, optionally gzipped)
    #[arg(short = 'c', long)]
    pub variants: PathBuf,

    /// Write the consensus FASTA here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute phase subcommand
///
/// # Errors
///
/// Returns an error if the reference or variants cannot be read, or if any
/// variant cannot be applied to the reference.
#[allow(clippy::needless_pass_by_value)] // CLI entry point, values from clap
pub fn run(args: PhaseArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let reference = fasta::read_reference(&args.reference)
        .with_context(|| format!("Failed to read reference {}", args.reference.display()))?;

    if verbose {
        eprintln!("Loaded reference {} ({} bp)", reference.name, reference.len());
    }

    let (consensus, stats) = VariantPhaser::new(&reference).phase_file(&args.variants)?;

    if let Some(path) = &args.output {
        fasta::write_consensus(path, &consensus)
            .with_context(|| format!("Failed to write consensus to {}", path.display()))?;
        print_summary(&consensus, stats, format)?;
    } else {
        // The sequence itself is the output; counts go to stderr
        fasta::write_consensus_to(std::io::stdout().lock(), &consensus)?;
        if verbose {
            eprintln!(
                "{} of {} calls applied as majority alternate alleles",
                stats.applied, stats.calls
            );
        }
    }

    Ok(())
}

fn print_summary(
    consensus: &ConsensusSequence,
    stats: PhaseStats,
    format: OutputFormat,
) -> anyhow::Result<()> {
    let summary = consensus.summary();
    match format {
        OutputFormat::Text => {
            println!("Consensus: {} ({} bp)", summary.name, summary.length);
            println!("MD5:       {}", summary.md5);
            println!("Calls:     {} read, {} applied", stats.calls, stats.applied);
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "consensus": summary,
                "calls": stats.calls,
                "applied": stats.applied,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        OutputFormat::Tsv => {
            println!("name\tlength\tmd5\tcalls\tapplied");
            println!(
                "{}\t{}\t{}\t{}\t{}",
                summary.name, summary.length, summary.md5, stats.calls, stats.applied
            );
        }
    }
    Ok(())
}
