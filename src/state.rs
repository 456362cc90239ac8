use std::path::PathBuf;

use crossbeam_channel::{Receiver, TryRecvError};

use crate::data::loader;
use crate::data::model::{FileEvaluation, Thresholds};
use crate::locale::{self, NumberLocale};
use crate::report::{self, preview::PreviewTable, Destination};
use crate::run::{self, RunEvent, RunHandle, RunRequest, RunTracker};

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// A dispatched evaluation run being drained frame by frame.
pub struct ActiveRun {
    pub handle: RunHandle,
    pub tracker: RunTracker,
    pub destination: Destination,
}

/// The full UI state, independent of rendering.
pub struct AppState {
    /// Folder holding the measurement files (None until selected).
    pub folder: Option<PathBuf>,
    /// Text of the folder entry field.
    pub folder_entry: String,
    /// Discovered candidate files with their checked state.
    pub files: Vec<(String, bool)>,

    /// Threshold entry fields, locale-decimal strings.
    pub cycle_entry: String,
    pub infusion_entry: String,
    pub injection_entry: String,

    /// Destination entry; empty means preview.
    pub output_entry: String,

    /// Number convention for workbook formulas and constants.
    pub locale: NumberLocale,

    /// Append-only info stream shown to the technician.
    pub info: Vec<String>,

    /// Active run, if any.
    pub run: Option<ActiveRun>,
    /// Progress percent of the current or last run.
    pub progress: u32,

    /// Successes of the last preview run, for the chart.
    pub results: Vec<FileEvaluation>,
    /// Rendered preview tables of the last preview run.
    pub preview: Vec<PreviewTable>,

    /// About window toggle.
    pub show_about: bool,

    /// Pending release-check notice, polled until it resolves.
    update_rx: Option<Receiver<String>>,
}

impl Default for AppState {
    fn default() -> Self {
        let locale = NumberLocale::from_env();
        Self {
            folder: None,
            folder_entry: String::new(),
            files: Vec::new(),
            cycle_entry: locale.decimal_literal("0.01"),
            infusion_entry: locale.decimal_literal("0.2"),
            injection_entry: locale.decimal_literal("0.1"),
            output_entry: String::new(),
            locale,
            info: Vec::new(),
            run: None,
            progress: 0,
            results: Vec::new(),
            preview: Vec::new(),
            show_about: false,
            update_rx: None,
        }
    }
}

impl AppState {
    /// State with the background release check started.
    pub fn new() -> Self {
        let mut state = Self::default();
        state.spawn_update_check();
        state
    }

    pub fn push_info(&mut self, msg: impl Into<String>) {
        self.info.push(msg.into());
    }

    // -- Folder and file selection --

    /// Point the app at a measurement folder and rescan it.
    pub fn set_folder(&mut self, dir: PathBuf) {
        self.folder_entry = dir.display().to_string();
        self.folder = Some(dir);
        self.scan_folder();
    }

    /// Re-read the folder entry field; rescan when the path exists.
    pub fn folder_entry_changed(&mut self) {
        let path = PathBuf::from(self.folder_entry.trim());
        if path.is_dir() {
            self.folder = Some(path);
            self.scan_folder();
        } else {
            self.folder = None;
            self.files.clear();
        }
    }

    /// Repopulate the candidate file list, everything checked by default.
    pub fn scan_folder(&mut self) {
        let Some(folder) = &self.folder else {
            self.push_info("No source folder selected!");
            return;
        };
        self.files = loader::discover_files(folder)
            .into_iter()
            .map(|name| (name, true))
            .collect();
        log::info!("found {} measurement files", self.files.len());
    }

    pub fn select_all(&mut self) {
        for (_, checked) in &mut self.files {
            *checked = true;
        }
    }

    pub fn select_none(&mut self) {
        for (_, checked) in &mut self.files {
            *checked = false;
        }
    }

    pub fn selected_files(&self) -> Vec<String> {
        self.files
            .iter()
            .filter(|(_, checked)| *checked)
            .map(|(name, _)| name.clone())
            .collect()
    }

    // -- Thresholds --

    /// Normalize the three entry fields into a threshold set.
    pub fn parse_thresholds(&self) -> anyhow::Result<Thresholds> {
        use anyhow::Context as _;
        Ok(Thresholds {
            cycle_boundary: locale::parse_decimal(&self.cycle_entry).context("cycle filter")?,
            infusion_min: locale::parse_decimal(&self.infusion_entry)
                .context("infusion filter")?,
            injection_min: locale::parse_decimal(&self.injection_entry)
                .context("injection filter")?,
        })
    }

    // -- Run lifecycle --

    /// Validate the inputs and dispatch one task per selected file.
    pub fn start_run(&mut self) {
        if self.run.is_some() {
            return;
        }
        let Some(folder) = self.folder.clone() else {
            self.push_info("No source folder selected!");
            return;
        };
        let files = self.selected_files();
        if files.is_empty() {
            self.push_info("No data source selected!");
            return;
        }
        let thresholds = match self.parse_thresholds() {
            Ok(t) => t,
            Err(e) => {
                self.push_info(format!("Error: {e:#}"));
                return;
            }
        };

        let destination = if self.output_entry.trim().is_empty() {
            Destination::Preview
        } else {
            Destination::Workbook(report::with_xlsx_extension(self.output_entry.trim()))
        };

        self.info.clear();
        self.results.clear();
        self.preview.clear();

        let request = RunRequest {
            folder,
            files,
            thresholds,
            destination: destination.clone(),
        };
        log::info!("dispatching {} evaluation tasks", request.files.len());
        let handle = run::start(&request);
        let tracker = RunTracker::new(handle.dispatched);
        self.progress = tracker.percent();
        self.run = Some(ActiveRun {
            handle,
            tracker,
            destination,
        });
    }

    /// Drain pending events; called once per frame by the shell.
    pub fn poll(&mut self) {
        self.poll_update_notice();

        let Some(active) = self.run.as_mut() else {
            return;
        };
        let events: Vec<RunEvent> = active.handle.events.try_iter().collect();

        for event in events {
            match event {
                RunEvent::Info(msg) => self.info.push(msg),
                RunEvent::Settled { outcome, .. } => match outcome {
                    Ok(eval) => {
                        self.info.extend(eval.notes.iter().cloned());
                        if let Some(active) = self.run.as_mut() {
                            active.tracker.record_success(eval);
                        }
                    }
                    Err(err) => {
                        self.info.push(format!("Error: {err}"));
                        if let Some(active) = self.run.as_mut() {
                            active.tracker.record_failure(err.severity());
                        }
                    }
                },
            }
        }

        if let Some(active) = &self.run {
            self.progress = active.tracker.percent();
            if active.tracker.complete() {
                self.finish_run();
            }
        }
    }

    /// All tasks settled: render to the chosen destination.
    fn finish_run(&mut self) {
        let Some(active) = self.run.take() else {
            return;
        };
        let tracker = active.tracker;
        self.progress = 100;

        match active.destination {
            Destination::Workbook(path) => {
                if tracker.successes.is_empty() {
                    self.push_info("No results to export.");
                    return;
                }
                match report::excel::write_workbook(&tracker.successes, &path, self.locale) {
                    Ok(()) => {
                        self.push_info(format!("File was saved at {}", path.display()));
                        if tracker.terminated != 0 {
                            self.push_info("Export finished with errors.");
                        } else {
                            self.push_info("Export successful!");
                        }
                    }
                    Err(err) => self.push_info(format!("Error: {err}")),
                }
            }
            Destination::Preview => {
                self.preview = report::preview::render(&tracker.successes);
                self.results = tracker.successes;
            }
        }
    }

    // -- Update check --

    fn spawn_update_check(&mut self) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        self.update_rx = Some(rx);
        std::thread::spawn(move || {
            if let Some(notice) = crate::update::check_for_update() {
                let _ = tx.send(notice);
            }
        });
    }

    fn poll_update_notice(&mut self) {
        let Some(rx) = &self.update_rx else {
            return;
        };
        match rx.try_recv() {
            Ok(notice) => {
                self.info.push(notice);
                self.update_rx = None;
            }
            Err(TryRecvError::Disconnected) => self.update_rx = None,
            Err(TryRecvError::Empty) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::io::Write as _;
    use std::time::{Duration, Instant};

    use tempfile::TempDir;

    fn write_file(dir: &std::path::Path, name: &str, body: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(body.as_bytes()).unwrap();
    }

    fn good_csv() -> String {
        let mut body = String::from("Infusion\n");
        for _ in 0..20 {
            body.push_str("0\n");
        }
        body.push_str("0.005\n0.9\n0.005\n0.3\n");
        body
    }

    /// Pump `poll` until the active run finishes.
    fn pump(state: &mut AppState) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while state.run.is_some() {
            assert!(Instant::now() < deadline, "run did not finish");
            state.poll();
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn run_without_folder_or_selection_reports() {
        let mut state = AppState::default();
        state.start_run();
        assert!(state.info.iter().any(|m| m.contains("No source folder")));

        let dir = TempDir::new().unwrap();
        state.set_folder(dir.path().to_path_buf());
        state.start_run();
        assert!(state.info.iter().any(|m| m.contains("No data source")));
    }

    #[test]
    fn invalid_threshold_entry_reports() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "m.csv", &good_csv());

        let mut state = AppState::default();
        state.set_folder(dir.path().to_path_buf());
        state.cycle_entry = "not a number".into();
        state.start_run();

        assert!(state.run.is_none());
        assert!(state
            .info
            .iter()
            .any(|m| m.contains("cycle filter") || m.contains("not a number")));
    }

    #[test]
    fn preview_run_produces_tables_and_results() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "m.csv", &good_csv());

        let mut state = AppState::default();
        state.set_folder(dir.path().to_path_buf());
        assert_eq!(state.files.len(), 1);

        state.start_run();
        assert!(state.run.is_some());
        pump(&mut state);

        assert_eq!(state.results.len(), 1);
        assert_eq!(state.preview.len(), 1);
        assert_eq!(state.progress, 100);
        assert_eq!(state.results[0].rows.len(), 2);
    }

    #[test]
    fn workbook_run_writes_the_destination() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "m.csv", &good_csv());
        let out = dir.path().join("2F_plugin_depth_result");

        let mut state = AppState::default();
        state.set_folder(dir.path().to_path_buf());
        state.output_entry = out.display().to_string();
        state.start_run();
        pump(&mut state);

        assert!(out.with_extension("xlsx").exists());
        assert!(state.info.iter().any(|m| m.contains("Export successful")));
    }

    #[test]
    fn failures_still_finish_the_run() {
        let dir = TempDir::new().unwrap();
        write_file(dir.path(), "m.csv", &good_csv());
        write_file(dir.path(), "bad.csv", "Pressure\n1\n2\n");

        let mut state = AppState::default();
        state.set_folder(dir.path().to_path_buf());
        state.start_run();
        pump(&mut state);

        assert_eq!(state.results.len(), 1);
        assert!(state.info.iter().any(|m| m.contains("bad.csv")));
        assert_eq!(state.progress, 100);
    }
}
