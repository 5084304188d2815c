//! Consensus refinement pipeline.
//!
//! This module turns raw reads and a seed reference into a sample-specific
//! consensus:
//!
//! - [`reads`]: seqtk trimming and sampling, then the in-process read filter
//! - [`align`]: mapper-specific alignment to a sorted, indexed BAM
//! - [`phaser`]: majority-allele folding of variant calls into a reference
//! - [`classifier`]: weighted best-hit subtype voting against a BLAST panel
//! - [`refinement`]: the two-round orchestration tying the steps together
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use minvar::config::PipelineConfig;
//! use minvar::consensus::refinement::ConsensusRefinement;
//! use minvar::tools::ProcessRunner;
//!
//! let config = PipelineConfig::default();
//! let runner = ProcessRunner::new("work");
//! let outcome = ConsensusRefinement::new(&runner, &config, "work")
//!     .run(Path::new("reads.fastq"))
//!     .unwrap();
//! println!("{}", outcome.consensus_path.display());
//! ```

pub mod align;
pub mod classifier;
pub mod phaser;
pub mod reads;
pub mod refinement;

pub use classifier::{vote, SubtypeClassifier};
pub use phaser::VariantPhaser;
pub use refinement::{ConsensusRefinement, PipelineError, RefinementOutcome, Stage};
