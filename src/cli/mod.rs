//! Command-line interface for minvar.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **prepare**: Filter reads, refine the seed reference over two rounds,
//!   classify the subtype, and align all reads to the final consensus
//! - **phase**: Fold the majority alleles of a VCF into a reference
//! - **subtype**: Vote over an existing BLAST tabular hit file
//!
//! ## Usage
//!
//! ```text
//! # Full pipeline in a working directory
//! minvar prepare reads.fastq.gz --work-dir sample1
//!
//! # Custom seed and databases
//! minvar prepare reads.fastq --seed 7 --seed-reference db/consensus_C.fna --panel db/HIV_cons_db.nsq
//!
//! # Standalone phasing
//! minvar phase --reference cns_1.fasta --variants calls_2.vcf.gz --output cns_2.fasta
//!
//! # JSON output for scripting
//! minvar subtype loc_res.tsv --format json
//! ```

use clap::{Parser, Subcommand};

pub mod phase;
pub mod prepare;
pub mod subtype;

#[derive(Parser)]
#[command(name = "minvar")]
#[command(version)]
#[command(about = "Build sample-specific HIV consensus sequences from deep-sequencing reads")]
#[command(
    long_about = "minvar refines a seed reference into a sample-specific consensus.\n\nReads are filtered and aligned to the seed, variants are called, and every majority allele is written into the reference. Two rounds of this produce the final consensus, to which all filtered reads are then aligned. A subtype panel search reports which known subtype the sample is closest to."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full consensus refinement pipeline on a read file
    Prepare(prepare::PrepareArgs),

    /// Build a consensus from a reference and a variant-call file
    Phase(phase::PhaseArgs),

    /// Classify the subtype from a BLAST tabular hit file
    Subtype(subtype::SubtypeArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}
