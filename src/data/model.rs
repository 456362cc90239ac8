use std::fmt;

use thiserror::Error;

// ---------------------------------------------------------------------------
// MeasurementTable – one parsed measurement file
// ---------------------------------------------------------------------------

/// The raw channel columns of one measurement file, as read from disk.
/// Blank or non-numeric cells are preserved as `None` until the evaluation
/// trims them. The two channels need not be equal length.
#[derive(Debug, Clone)]
pub struct MeasurementTable {
    /// Required "Infusion" column.
    pub infusion: Vec<Option<f64>>,
    /// Optional "Injection" column; absent in one-port files.
    pub injection: Option<Vec<Option<f64>>>,
}

impl MeasurementTable {
    /// Whether the file carries only the infusion port.
    pub fn is_one_port(&self) -> bool {
        self.injection.is_none()
    }
}

// ---------------------------------------------------------------------------
// Thresholds – user-supplied cutoffs
// ---------------------------------------------------------------------------

/// The three independent cutoffs of an evaluation run, locale-normalized
/// from the entry fields before any task is dispatched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Readings strictly below this value start a new cycle.
    pub cycle_boundary: f64,
    /// Minimum acceptable infusion peak.
    pub infusion_min: f64,
    /// Minimum acceptable injection peak.
    pub injection_min: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cycle_boundary: 0.01,
            infusion_min: 0.2,
            injection_min: 0.1,
        }
    }
}

// ---------------------------------------------------------------------------
// Evaluation results
// ---------------------------------------------------------------------------

/// One kept measurement cycle: the per-channel peaks and the inverse
/// ("below threshold") pass flags. In kept rows the flags are mutually
/// exclusive unless both channels passed (then both are false).
#[derive(Debug, Clone, PartialEq)]
pub struct CycleRow {
    pub infusion_peak: f64,
    /// 0.0 for one-port files.
    pub injection_peak: f64,
    pub infusion_below: bool,
    pub injection_below: bool,
}

/// The first two raw readings of each channel, captured from the un-trimmed
/// table. Annotates the report summary only; cycle logic never reads it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileLimits {
    pub infusion: (f64, f64),
    /// (0.0, 0.0) for one-port files.
    pub injection: (f64, f64),
}

/// Everything the renderer needs for one successfully evaluated file.
#[derive(Debug, Clone)]
pub struct FileEvaluation {
    pub file_name: String,
    /// Kept cycles, in measurement order.
    pub rows: Vec<CycleRow>,
    pub limits: FileLimits,
    pub one_port: bool,
    /// Informational messages for the info stream (auto-reclassification,
    /// handover warning).
    pub notes: Vec<String>,
}

// ---------------------------------------------------------------------------
// Failure taxonomy
// ---------------------------------------------------------------------------

/// Which filter emptied the result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverFilteredKind {
    /// Boundary detection degenerated (every trimmed row, or none, is a
    /// cycle start).
    Cycles,
    /// Every infusion peak fell below its minimum.
    Infusion,
    /// Every injection peak fell below its minimum.
    Injection,
}

impl fmt::Display for OverFilteredKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverFilteredKind::Cycles => write!(f, "Cycle"),
            OverFilteredKind::Infusion => write!(f, "Infusion"),
            OverFilteredKind::Injection => write!(f, "Injection"),
        }
    }
}

/// How a per-file failure is counted in the run summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// File skipped, run continues with partial results.
    Soft,
    /// File unreadable; skipped too, but flagged distinctly.
    Hard,
}

/// Per-file failure taxonomy. Every variant is local to one file's task and
/// never aborts sibling tasks or the run as a whole.
#[derive(Debug, Error)]
pub enum EvalError {
    /// File cannot be opened or parsed as a spreadsheet document.
    #[error("file \"{file}\" is not a spreadsheet file or can't be read: {reason}")]
    UnreadableFile { file: String, reason: String },

    /// Required "Infusion" column missing.
    #[error("file \"{file}\" has no Infusion column and can't be evaluated")]
    UnsupportedFile { file: String },

    /// Thresholds removed every row, or boundary detection degenerated.
    #[error("the filters removed every {kind} value in \"{file}\"")]
    OverFiltered { file: String, kind: OverFilteredKind },

    /// Destination workbook could not be written.
    #[error("can't write \"{path}\": {reason}. Close the file and try again")]
    RenderWrite { path: String, reason: String },

    /// Any other per-file failure, reported verbatim.
    #[error("file \"{file}\" aborted: {reason}")]
    Task { file: String, reason: String },
}

impl EvalError {
    pub fn severity(&self) -> Severity {
        match self {
            EvalError::UnreadableFile { .. } => Severity::Hard,
            _ => Severity::Soft,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_thresholds_match_entry_defaults() {
        let t = Thresholds::default();
        assert_eq!(t.cycle_boundary, 0.01);
        assert_eq!(t.infusion_min, 0.2);
        assert_eq!(t.injection_min, 0.1);
    }

    #[test]
    fn unreadable_is_the_only_hard_failure() {
        let hard = EvalError::UnreadableFile {
            file: "a.xlsx".into(),
            reason: "bad zip".into(),
        };
        assert_eq!(hard.severity(), Severity::Hard);

        let soft = EvalError::UnsupportedFile { file: "a.xlsx".into() };
        assert_eq!(soft.severity(), Severity::Soft);

        let soft = EvalError::OverFiltered {
            file: "a.xlsx".into(),
            kind: OverFilteredKind::Infusion,
        };
        assert_eq!(soft.severity(), Severity::Soft);
    }

    #[test]
    fn over_filtered_names_the_channel() {
        let err = EvalError::OverFiltered {
            file: "m1.xlsx".into(),
            kind: OverFilteredKind::Injection,
        };
        assert!(err.to_string().contains("Injection"));
        assert!(err.to_string().contains("m1.xlsx"));
    }
}
