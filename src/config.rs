//! Pipeline configuration.
//!
//! Every tunable lives in [`PipelineConfig`], which is passed explicitly to
//! each component. Values can come from a JSON file (missing keys take their
//! defaults) and are then overridden from the command line.
//!
//! ```json
//! {
//!   "seed": 42,
//!   "seed_reference": "db/consensus_B.fna",
//!   "subtype_panel": "db/HIV_cons_db.nsq",
//!   "rounds": [
//!     { "sample_size": 1000, "mapper": "blast" },
//!     { "sample_size": 20000, "mapper": "bwa" }
//!   ]
//! }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::types::Mapper;
use crate::utils::validation::is_valid_label;

/// Default identifier of the final consensus record
pub const DEFAULT_SAMPLE_LABEL: &str = "sample_cons_Pol";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid config value for '{field}': {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Sampling depth and aligner for one refinement round
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundConfig {
    pub sample_size: u64,
    pub mapper: Mapper,
}

/// Upper bounds on worker threads given to each external tool.
///
/// The effective count is `min(cap, available cores)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThreadCaps {
    /// Read aligners (bwa, novoalign, smalt)
    pub aligner: usize,
    /// `samtools sort` inside refinement rounds
    pub sort: usize,
    /// `samtools sort` for the final alignment
    pub final_sort: usize,
    /// Variant caller
    pub caller: usize,
    /// Subtype panel search
    pub blast: usize,
}

impl Default for ThreadCaps {
    fn default() -> Self {
        Self {
            aligner: 12,
            sort: 6,
            final_sort: 4,
            caller: 6,
            blast: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Reads kept from the raw input after trimming
    pub max_reads: u64,

    /// Reads shorter than this after trimming are dropped
    pub min_read_length: usize,

    /// Mean Phred quality a read must reach; `None` disables the check
    pub min_mean_quality: Option<u8>,

    /// Seed for every read subsample, logged at the start of each run
    pub seed: u64,

    /// Generic species-level reference that round 1 starts from
    pub seed_reference: PathBuf,

    /// BLAST nucleotide database of subtype reference sequences
    pub subtype_panel: PathBuf,

    /// Reads sampled for subtype classification
    pub subtype_sample_size: u64,

    /// The two refinement rounds, in order
    pub rounds: [RoundConfig; 2],

    /// Aligner used to place all filtered reads on the final consensus
    pub final_mapper: Mapper,

    /// Identifier given to the final consensus record
    pub sample_label: String,

    pub threads: ThreadCaps,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_reads: 200_000,
            min_read_length: 49,
            min_mean_quality: None,
            seed: 11,
            seed_reference: PathBuf::from("db/consensus_B.fna"),
            subtype_panel: PathBuf::from("db/HIV_cons_db.nsq"),
            subtype_sample_size: 1000,
            rounds: [
                RoundConfig {
                    sample_size: 1000,
                    mapper: Mapper::Blast,
                },
                RoundConfig {
                    sample_size: 20_000,
                    mapper: Mapper::Bwa,
                },
            ],
            final_mapper: Mapper::Bwa,
            sample_label: DEFAULT_SAMPLE_LABEL.to_string(),
            threads: ThreadCaps::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file; absent keys keep their defaults
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read,
    /// `ConfigError::ParseError` for malformed JSON or unknown keys, and
    /// `ConfigError::Invalid` if a value fails validation.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Parse and validate a configuration from JSON text
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ParseError` for malformed JSON or unknown keys,
    /// and `ConfigError::Invalid` if a value fails validation.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_reads == 0 {
            return Err(invalid("max_reads", "must be at least 1"));
        }
        if self.subtype_sample_size == 0 {
            return Err(invalid("subtype_sample_size", "must be at least 1"));
        }
        if self.rounds.iter().any(|r| r.sample_size == 0) {
            return Err(invalid("rounds", "every round needs a sample_size of at least 1"));
        }
        let caps = &self.threads;
        if [caps.aligner, caps.sort, caps.final_sort, caps.caller, caps.blast].contains(&0) {
            return Err(invalid("threads", "thread caps must be at least 1"));
        }
        if !is_valid_label(&self.sample_label) {
            return Err(invalid(
                "sample_label",
                format!("'{}' is not a valid FASTA identifier", self.sample_label),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.into(),
    }
}
