//! Majority-allele consensus construction.
//!
//! The phaser folds variant calls into a reference: for every call whose
//! alternate allele is carried by at least half of the fragments, the
//! alternate bases are written over the reference, one base per position
//! starting at the call's position.
//!
//! Calls are applied independently in file order. Overlapping calls are not
//! reconciled, so a later call overwrites the bases of an earlier one. Allele
//! length changes are not propagated either: a majority deletion only writes
//! its first base, and a majority insertion overwrites the bases that follow.
//! The output therefore always has the reference's length and coordinates.

use std::path::Path;

use thiserror::Error;
use tracing::{debug, info};

use crate::core::sequence::{ConsensusSequence, ReferenceSequence};
use crate::core::variant::{Allele, VariantCall};
use crate::parsing::vcf::parse_variant_file;
use crate::parsing::ParseError;

/// Identifier given to every phased consensus record
pub const PHASED_ID: &str = "sample_cons_Pol";

/// Description written after the identifier, naming the variant source
pub const PHASED_DESCRIPTION: &str = "lofreq";

#[derive(Error, Debug)]
pub enum PhaseError {
    #[error("Variant {record} at position {position}: multiallelic ALT '{alt}' is not supported")]
    Multiallelic {
        record: usize,
        position: usize,
        alt: String,
    },

    #[error(
        "Variant {record} at position {position}: REF '{expected}' does not match reference '{found}'"
    )]
    ReferenceMismatch {
        record: usize,
        position: usize,
        expected: String,
        found: String,
    },

    #[error(
        "Variant {record} at position {position}: allele '{allele}' runs past the reference end ({length} bp)"
    )]
    OutOfBounds {
        record: usize,
        position: usize,
        allele: String,
        length: usize,
    },

    #[error("Failed to read variants from {path}: {source}")]
    Variants {
        path: String,
        #[source]
        source: ParseError,
    },
}

/// Counts from one phasing pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PhaseStats {
    /// Calls read from the variant file
    pub calls: usize,
    /// Calls whose alternate allele was written into the consensus
    pub applied: usize,
}

/// Builds a consensus from a reference and a set of variant calls
#[derive(Debug, Clone)]
pub struct VariantPhaser<'a> {
    reference: &'a ReferenceSequence,
}

impl<'a> VariantPhaser<'a> {
    pub fn new(reference: &'a ReferenceSequence) -> Self {
        Self { reference }
    }

    /// Apply `calls` in order and return the resulting consensus
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::Multiallelic` for a call with more than one ALT,
    /// `PhaseError::ReferenceMismatch` when a REF disagrees with the
    /// reference, and `PhaseError::OutOfBounds` when the majority allele would
    /// be written past the last base. The first failing call aborts phasing.
    pub fn phase(&self, calls: &[VariantCall]) -> Result<ConsensusSequence, PhaseError> {
        self.phase_with_stats(calls).map(|(consensus, _)| consensus)
    }

    /// As [`phase`](Self::phase), also reporting how many calls were applied
    ///
    /// # Errors
    ///
    /// See [`phase`](Self::phase).
    pub fn phase_with_stats(
        &self,
        calls: &[VariantCall],
    ) -> Result<(ConsensusSequence, PhaseStats), PhaseError> {
        let length = self.reference.len();

        // 1-based working copy; index 0 is never written or emitted
        let mut bases = Vec::with_capacity(length + 1);
        bases.push(0u8);
        bases.extend_from_slice(&self.reference.sequence);

        let mut stats = PhaseStats {
            calls: calls.len(),
            applied: 0,
        };

        for (i, call) in calls.iter().enumerate() {
            let record = i + 1;
            self.check(call, record)?;

            let allele = call.majority_bases();
            let end = call.position + allele.len();
            if end > length + 1 {
                return Err(PhaseError::OutOfBounds {
                    record,
                    position: call.position,
                    allele: String::from_utf8_lossy(allele).to_string(),
                    length,
                });
            }
            bases[call.position..end].copy_from_slice(allele);

            if call.majority() == Allele::Alternate {
                stats.applied += 1;
                debug!(
                    position = call.position,
                    reference = %call.reference_allele,
                    alternate = %call.alternate_allele,
                    af = call.allele_frequency,
                    "Majority alternate allele applied"
                );
            }
        }

        let consensus = ConsensusSequence::new(
            PHASED_ID,
            Some(PHASED_DESCRIPTION.to_string()),
            bases.split_off(1),
        );
        Ok((consensus, stats))
    }

    /// Phase the records of a VCF file against the reference
    ///
    /// # Errors
    ///
    /// Returns `PhaseError::Variants` if the file cannot be parsed, otherwise
    /// see [`phase`](Self::phase).
    pub fn phase_file(&self, variants: &Path) -> Result<(ConsensusSequence, PhaseStats), PhaseError> {
        info!(
            reference = %self.reference.name,
            variants = %variants.display(),
            "Phasing variants into reference"
        );
        let calls = parse_variant_file(variants).map_err(|source| PhaseError::Variants {
            path: variants.display().to_string(),
            source,
        })?;
        self.phase_with_stats(&calls)
    }

    /// Reject calls that cannot be applied to this reference
    fn check(&self, call: &VariantCall, record: usize) -> Result<(), PhaseError> {
        if call.is_multiallelic() {
            return Err(PhaseError::Multiallelic {
                record,
                position: call.position,
                alt: call.alternate_allele.clone(),
            });
        }

        let expected = call.reference_allele.as_bytes();
        let found = self
            .reference
            .slice_1based(call.position, expected.len())
            .unwrap_or_default();
        if found != expected {
            return Err(PhaseError::ReferenceMismatch {
                record,
                position: call.position,
                expected: call.reference_allele.clone(),
                found: String::from_utf8_lossy(found).to_string(),
            });
        }

        Ok(())
    }
}
