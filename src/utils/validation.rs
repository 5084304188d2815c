//! Centralized validation and helper functions.

use std::path::{Path, PathBuf};

/// Number of cores the process may use, falling back to 1 when unknown
#[must_use]
pub fn available_cores() -> usize {
    std::thread::available_parallelism().map_or(1, std::num::NonZeroUsize::get)
}

/// Worker count handed to an external tool: `min(cap, available cores)`, at least 1.
///
/// # Examples
///
/// ```
/// use minvar::utils::validation::worker_count;
///
/// assert_eq!(worker_count(1), 1);
/// assert!(worker_count(4) <= 4);
/// assert_eq!(worker_count(0), 1);
/// ```
#[must_use]
pub fn worker_count(cap: usize) -> usize {
    cap.min(available_cores()).max(1)
}

/// Whether `label` can be used as a FASTA sequence identifier.
///
/// # Examples
///
/// ```
/// use minvar::utils::validation::is_valid_label;
///
/// assert!(is_valid_label("sample_cons_Pol"));
/// assert!(!is_valid_label("sample cons"));
/// assert!(!is_valid_label(""));
/// ```
#[must_use]
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && !label.starts_with('>') && !label.chars().any(char::is_whitespace)
}

/// BLAST database name for a panel given as one of its files (`db/panel.nsq` -> `db/panel`)
#[must_use]
pub fn blast_db_stem(panel: &Path) -> PathBuf {
    match panel.extension().and_then(|e| e.to_str()) {
        Some("nsq" | "nin" | "nhr" | "nal") => panel.with_extension(""),
        _ => panel.to_path_buf(),
    }
}

/// Whether a BLAST nucleotide database exists at `panel`.
///
/// Accepts either a database file (`.nsq`, `.nal`, ...) or the bare database
/// name, in which case one of its volume or alias files must be present.
#[must_use]
pub fn blast_db_exists(panel: &Path) -> bool {
    if panel.is_file() {
        return true;
    }
    let stem = blast_db_stem(panel);
    ["nsq", "nal"]
        .iter()
        .any(|ext| stem.with_extension(ext).is_file())
}
