//! # minvar
//!
//! A library for building sample-specific HIV consensus sequences from
//! deep-sequencing reads.
//!
//! Reads are filtered, aligned to a seed reference, and variant-called; every
//! variant carried by the majority of reads is folded back into the
//! reference. Two rounds of this refine the seed into a consensus close to
//! the sample, to which all filtered reads are finally aligned. A subtype
//! panel search reports which known subtype the sample resembles.
//!
//! Alignment, variant calling and indexing are delegated to external tools
//! (seqtk, BLAST, bwa, samtools, LoFreq, bgzip) behind the
//! [`tools::ToolRunner`] trait.
//!
//! ## Example
//!
//! ```rust
//! use minvar::{ReferenceSequence, VariantCall, VariantPhaser};
//!
//! let reference = ReferenceSequence::new("CONSENSUS_B", "ACGTACGT");
//! let calls = [VariantCall::new(3, "G", "C", 0.9)];
//!
//! let consensus = VariantPhaser::new(&reference).phase(&calls).unwrap();
//! assert_eq!(consensus.sequence, b"ACCTACGT");
//! ```
//!
//! ## Modules
//!
//! - [`core`]: Sequences, variant calls, hits and subtype frequencies
//! - [`parsing`]: FASTA, FASTQ, VCF and BLAST tabular readers and writers
//! - [`tools`]: External tool invocations and the runner abstraction
//! - [`consensus`]: Phasing, subtype voting and the refinement pipeline
//! - [`config`]: Pipeline configuration
//! - [`cli`]: Command-line interface implementation

pub mod cli;
pub mod config;
pub mod consensus;
pub mod core;
pub mod parsing;
pub mod tools;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::PipelineConfig;
pub use consensus::classifier::{vote, SubtypeClassifier};
pub use consensus::phaser::VariantPhaser;
pub use consensus::refinement::{ConsensusRefinement, PipelineError, RefinementOutcome};
pub use core::frequency::FrequencyTable;
pub use core::hit::AlignmentHit;
pub use core::sequence::{ConsensusSequence, ReferenceSequence};
pub use core::types::*;
pub use core::variant::VariantCall;
