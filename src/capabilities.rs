//! Capability discovery: which optional backends are wired up at
//! startup, and at what tier they leave the rest of the system.
//!
//! Nothing here blocks construction. A session with no OCR backend and
//! no VLM client still runs — it just recognizes less and never calls
//! `HybridDecisionEngine`'s llm path.

use std::fmt;

/// How fully a capability is wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CapabilityStatus {
    Available,
    Partial,
    NotConfigured,
    Unavailable,
}

impl fmt::Display for CapabilityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Available => "available",
            Self::Partial => "partial",
            Self::NotConfigured => "not_configured",
            Self::Unavailable => "unavailable",
        };
        write!(f, "{}", s)
    }
}

/// Overall recognition tier a session runs at, driven by which
/// capabilities came up `Available`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    /// Template matching and OCR both available, plus a VLM client.
    Full,
    /// Enough to run the perception-decision loop, but degraded: e.g.
    /// no OCR backend, or no VLM fallback configured.
    Lite,
}

impl fmt::Display for Flavor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", if matches!(self, Self::Full) { "full" } else { "lite" })
    }
}

/// One row of the capability matrix.
#[derive(Debug, Clone)]
pub struct CapabilityEntry {
    pub name: &'static str,
    pub status: CapabilityStatus,
    pub detail: String,
}

/// Snapshot of every optional backend's status, taken once at startup
/// and frozen for the session.
#[derive(Debug, Clone)]
pub struct CapabilityMatrix {
    entries: Vec<CapabilityEntry>,
}

impl CapabilityMatrix {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn record(&mut self, name: &'static str, status: CapabilityStatus, detail: impl Into<String>) {
        self.entries.push(CapabilityEntry { name, status, detail: detail.into() });
    }

    pub fn entries(&self) -> &[CapabilityEntry] {
        &self.entries
    }

    pub fn status_of(&self, name: &str) -> Option<CapabilityStatus> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.status)
    }

    /// `Full` only when every recorded capability is `Available`;
    /// absence of a capability entirely (never recorded) does not count
    /// against the tier, since some capabilities are genuinely optional.
    pub fn flavor(&self) -> Flavor {
        if self.entries.iter().all(|e| e.status == CapabilityStatus::Available) {
            Flavor::Full
        } else {
            Flavor::Lite
        }
    }

    /// Human-readable one-line-per-entry report for a startup log line.
    pub fn report(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{}: {} ({})", e.name, e.status, e.detail))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl Default for CapabilityMatrix {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_available_entries_yield_full_flavor() {
        let mut matrix = CapabilityMatrix::new();
        matrix.record("ocr", CapabilityStatus::Available, "tesseract");
        matrix.record("vlm", CapabilityStatus::Available, "anthropic");
        assert_eq!(matrix.flavor(), Flavor::Full);
    }

    #[test]
    fn any_non_available_entry_downgrades_to_lite() {
        let mut matrix = CapabilityMatrix::new();
        matrix.record("ocr", CapabilityStatus::Unavailable, "no backend compiled in");
        matrix.record("vlm", CapabilityStatus::Available, "anthropic");
        assert_eq!(matrix.flavor(), Flavor::Lite);
    }

    #[test]
    fn empty_matrix_is_full_by_vacuous_truth() {
        assert_eq!(CapabilityMatrix::new().flavor(), Flavor::Full);
    }

    #[test]
    fn status_of_looks_up_by_name() {
        let mut matrix = CapabilityMatrix::new();
        matrix.record("ocr", CapabilityStatus::Partial, "one of two engines loaded");
        assert_eq!(matrix.status_of("ocr"), Some(CapabilityStatus::Partial));
        assert_eq!(matrix.status_of("vlm"), None);
    }
}
