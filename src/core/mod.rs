//! Core data types for consensus refinement.
//!
//! This module provides the fundamental types used throughout the library:
//!
//! - [`ReferenceSequence`]: A named, single-sequence nucleotide reference
//! - [`ConsensusSequence`]: A reference after majority variants were folded in
//! - [`VariantCall`]: One biallelic record from a variant-call file
//! - [`AlignmentHit`]: One row of tabular local-alignment output
//! - [`FrequencyTable`]: Normalized subtype votes, ranked descending
//! - [`Mapper`]: Read aligner used to build a BAM against a reference
//!
//! ## Coordinates
//!
//! All positions are 1-based, as in VCF. A [`VariantCall`] at position `p`
//! with reference allele `r` covers the half-open range `[p, p + len(r))`.
//!
//! [`ReferenceSequence`]: sequence::ReferenceSequence
//! [`ConsensusSequence`]: sequence::ConsensusSequence
//! [`VariantCall`]: variant::VariantCall
//! [`AlignmentHit`]: hit::AlignmentHit
//! [`FrequencyTable`]: frequency::FrequencyTable
//! [`Mapper`]: types::Mapper

pub mod frequency;
pub mod hit;
pub mod sequence;
pub mod types;
pub mod variant;
