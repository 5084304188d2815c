use serde::Serialize;

/// Alternate-allele frequency at or above which the alternate allele wins
pub const MAJORITY_THRESHOLD: f64 = 0.5;

/// Which allele a call contributes to the consensus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Allele {
    Reference,
    Alternate,
}

/// A single record from a variant-call file.
///
/// The alternate field is kept verbatim, so a multiallelic record (`A,G`)
/// survives parsing and is rejected when it is applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VariantCall {
    /// 1-based position of the first reference base
    pub position: usize,

    /// REF column
    pub reference_allele: String,

    /// ALT column, possibly comma-separated
    pub alternate_allele: String,

    /// `AF` from the INFO column
    pub allele_frequency: f64,
}

impl VariantCall {
    pub fn new(
        position: usize,
        reference_allele: impl Into<String>,
        alternate_allele: impl Into<String>,
        allele_frequency: f64,
    ) -> Self {
        Self {
            position,
            reference_allele: reference_allele.into(),
            alternate_allele: alternate_allele.into(),
            allele_frequency,
        }
    }

    /// Number of alleles listed in the ALT column
    #[must_use]
    pub fn alternate_count(&self) -> usize {
        self.alternate_allele.split(',').count()
    }

    #[must_use]
    pub fn is_multiallelic(&self) -> bool {
        self.alternate_count() > 1
    }

    /// Majority rule: the alternate wins when it holds at least half of the fragments.
    ///
    /// An exact 50/50 split goes to the alternate.
    #[must_use]
    pub fn majority(&self) -> Allele {
        if self.allele_frequency >= MAJORITY_THRESHOLD {
            Allele::Alternate
        } else {
            Allele::Reference
        }
    }

    /// Bases written into the consensus for this call
    #[must_use]
    pub fn majority_bases(&self) -> &[u8] {
        match self.majority() {
            Allele::Alternate => self.alternate_allele.as_bytes(),
            Allele::Reference => self.reference_allele.as_bytes(),
        }
    }
}
