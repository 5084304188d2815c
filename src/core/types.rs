use serde::{Deserialize, Serialize};

/// Read aligner used to place sampled reads on a reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Mapper {
    /// BLAST local alignment converted to SAM; permissive, for distant seeds
    Blast,
    /// `bwa mem`; strict short-read alignment
    Bwa,
    /// Novoalign
    Novoalign,
    /// SMALT
    Smalt,
}

impl std::fmt::Display for Mapper {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blast => write!(f, "blast"),
            Self::Bwa => write!(f, "bwa"),
            Self::Novoalign => write!(f, "novoalign"),
            Self::Smalt => write!(f, "smalt"),
        }
    }
}
