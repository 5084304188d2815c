use std::io::Write;

use serde::Serialize;

/// Normalized vote weight of one panel subject
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubtypeFrequency {
    pub subject: String,
    pub weight: f64,
}

/// Panel subjects ranked by how strongly the sampled reads resemble them.
///
/// Weights are non-negative, sum to at most 1, and subjects with zero weight
/// are never listed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrequencyTable {
    entries: Vec<SubtypeFrequency>,

    /// Distinct queries with at least one hit (the normalization denominator)
    pub queries: usize,

    /// Total hit rows the table was built from
    pub hits: usize,
}

impl FrequencyTable {
    /// Build a table from already-normalized weights in encounter order.
    ///
    /// Zero weights are dropped; the rest are sorted descending with a stable
    /// sort, so ties keep the order they were given in.
    #[must_use]
    pub fn from_weights(weights: Vec<(String, f64)>, queries: usize, hits: usize) -> Self {
        let mut entries: Vec<SubtypeFrequency> = weights
            .into_iter()
            .filter(|(_, weight)| *weight > 0.0)
            .map(|(subject, weight)| SubtypeFrequency { subject, weight })
            .collect();

        entries.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        Self {
            entries,
            queries,
            hits,
        }
    }

    #[must_use]
    pub fn entries(&self) -> &[SubtypeFrequency] {
        &self.entries
    }

    #[must_use]
    pub fn get(&self, subject: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.subject == subject)
            .map(|e| e.weight)
    }

    /// Highest ranked subject, if any read produced a hit
    #[must_use]
    pub fn best(&self) -> Option<&SubtypeFrequency> {
        self.entries.first()
    }

    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.entries.iter().map(|e| e.weight).sum()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write `subject,weight` rows with four decimals
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn write_csv<W: Write>(&self, mut writer: W) -> std::io::Result<()> {
        for entry in &self.entries {
            writeln!(writer, "{},{:.4}", entry.subject, entry.weight)?;
        }
        writer.flush()
    }
}
