//! Task orchestration: one worker thread per selected file, outcomes
//! aggregated over a channel, progress tracked until every task settles.
//!
//! Workers are fully independent; they share nothing but the outcome
//! channel. A failed file settles like any other and never aborts its
//! siblings, so a run always produces the partial results that survived.

use std::path::{Path, PathBuf};
use std::thread;

use crossbeam_channel::{unbounded, Receiver, Sender};

use crate::data::cycles;
use crate::data::loader;
use crate::data::model::{EvalError, FileEvaluation, Severity, Thresholds};
use crate::report::Destination;

// ---------------------------------------------------------------------------
// Requests and events
// ---------------------------------------------------------------------------

/// One run of the evaluation pipeline, as handed over by the shell.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub folder: PathBuf,
    /// Selected file names inside `folder`.
    pub files: Vec<String>,
    pub thresholds: Thresholds,
    pub destination: Destination,
}

/// Events emitted by worker tasks, drained by the UI every frame.
#[derive(Debug)]
pub enum RunEvent {
    /// Informational message for the info stream.
    Info(String),
    /// A task settled; exactly one per dispatched file.
    Settled {
        file: String,
        outcome: Result<FileEvaluation, EvalError>,
    },
}

/// Handle to a dispatched run.
pub struct RunHandle {
    pub events: Receiver<RunEvent>,
    pub dispatched: usize,
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// Dispatch one worker thread per selected file, eagerly. Concurrency is
/// bounded only by the file count; workers do blocking I/O plus CPU-bound
/// numeric work and settle in arrival order.
pub fn start(request: &RunRequest) -> RunHandle {
    let (tx, rx) = unbounded();

    for file in &request.files {
        let tx = tx.clone();
        let path = request.folder.join(file);
        let file = file.clone();
        let thresholds = request.thresholds;

        thread::spawn(move || {
            log::debug!("evaluating {}", path.display());
            // A worker must settle exactly once, even if the evaluation
            // panics; anything unexpected becomes a Task failure.
            let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                evaluate_file(&file, &path, &thresholds, &tx)
            }));
            let outcome = result.unwrap_or_else(|payload| {
                Err(EvalError::Task {
                    file: file.clone(),
                    reason: panic_reason(payload.as_ref()),
                })
            });
            // Send only fails when the app is shutting down mid-run.
            let _ = tx.send(RunEvent::Settled { file, outcome });
        });
    }

    RunHandle {
        events: rx,
        dispatched: request.files.len(),
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unexpected panic".to_string()
    }
}

/// Load and evaluate a single file. One-port detection is reported as soon
/// as the table is parsed, before the evaluation runs.
fn evaluate_file(
    file: &str,
    path: &Path,
    thresholds: &Thresholds,
    tx: &Sender<RunEvent>,
) -> Result<FileEvaluation, EvalError> {
    let table = loader::load_table(path)?;
    if table.is_one_port() {
        let _ = tx.send(RunEvent::Info(format!("One port file ({file}) detected.")));
    }
    cycles::evaluate(file, &table, thresholds)
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

/// Aggregated run state: counts, collected successes and the progress
/// percentage. Owned by the shell and fed from the event channel.
pub struct RunTracker {
    pub dispatched: usize,
    /// Failed tasks of any severity.
    pub terminated: usize,
    /// Unreadable files, counted separately inside `terminated`.
    pub hard_failures: usize,
    /// Successful evaluations in settlement order.
    pub successes: Vec<FileEvaluation>,
}

impl RunTracker {
    pub fn new(dispatched: usize) -> Self {
        Self {
            dispatched,
            terminated: 0,
            hard_failures: 0,
            successes: Vec::new(),
        }
    }

    pub fn record_success(&mut self, eval: FileEvaluation) {
        self.successes.push(eval);
    }

    pub fn record_failure(&mut self, severity: Severity) {
        self.terminated += 1;
        if severity == Severity::Hard {
            self.hard_failures += 1;
        }
    }

    fn settled(&self) -> usize {
        self.successes.len() + self.terminated
    }

    /// The run is done when every dispatched task either produced a result
    /// or was terminated.
    pub fn complete(&self) -> bool {
        self.dispatched - self.terminated == self.successes.len()
    }

    /// Progress percentage: a third of the bar on dispatch, the remaining
    /// two thirds spread over settlements. Monotonic, exactly 100 when all
    /// tasks have settled.
    pub fn percent(&self) -> u32 {
        if self.dispatched == 0 {
            return 100;
        }
        let total = self.dispatched as f64;
        let settled = self.settled() as f64;
        (100.0 * (total + 2.0 * settled) / (3.0 * total)).round() as u32
    }
}
