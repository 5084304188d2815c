use serde::Serialize;

/// A named nucleotide reference holding exactly one sequence
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSequence {
    /// Sequence identifier (FASTA definition name)
    pub name: String,

    /// Bases as read from the FASTA file, case preserved
    pub sequence: Vec<u8>,
}

impl ReferenceSequence {
    pub fn new(name: impl Into<String>, sequence: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            sequence: sequence.into(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Bases covering the 1-based, half-open range `[position, position + len)`.
    ///
    /// Returns `None` when the range starts at 0 or runs past the end.
    #[must_use]
    pub fn slice_1based(&self, position: usize, len: usize) -> Option<&[u8]> {
        let start = position.checked_sub(1)?;
        let end = start.checked_add(len)?;
        self.sequence.get(start..end)
    }
}

/// A reference after majority-allele substitutions were applied.
///
/// Consensus values are never edited in place: relabeling or promoting one to
/// the next round's reference produces a new value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsensusSequence {
    pub name: String,

    /// Free-text description written after the name in FASTA output
    pub description: Option<String>,

    pub sequence: Vec<u8>,
}

impl ConsensusSequence {
    pub fn new(
        name: impl Into<String>,
        description: Option<String>,
        sequence: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            name: name.into(),
            description,
            sequence: sequence.into(),
        }
    }

    /// A consensus identical to `reference`, used when a round called no variants
    #[must_use]
    pub fn unchanged(reference: &ReferenceSequence) -> Self {
        Self::new(reference.name.clone(), None, reference.sequence.clone())
    }

    /// Copy of this consensus under a new identifier
    #[must_use]
    pub fn relabeled(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: self.description.clone(),
            sequence: self.sequence.clone(),
        }
    }

    /// Hand this consensus to the next round as its reference
    #[must_use]
    pub fn into_reference(self) -> ReferenceSequence {
        ReferenceSequence::new(self.name, self.sequence)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// MD5 of the uppercase sequence, the usual convention for sequence checksums
    #[must_use]
    pub fn md5(&self) -> String {
        let uppercase: Vec<u8> = self.sequence.iter().map(u8::to_ascii_uppercase).collect();
        format!("{:x}", md5::compute(&uppercase))
    }

    #[must_use]
    pub fn summary(&self) -> SequenceSummary {
        SequenceSummary {
            name: self.name.clone(),
            length: self.len(),
            md5: self.md5(),
        }
    }
}

/// Name, length and checksum of a consensus, as reported in run summaries
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SequenceSummary {
    pub name: String,
    pub length: usize,
    pub md5: String,
}
