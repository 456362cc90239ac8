use eframe::egui::{self, RichText, ScrollArea, Ui};

use crate::state::AppState;
use crate::ui::plot;

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top menu / status bar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    egui::menu::bar(ui, |ui: &mut Ui| {
        ui.menu_button("File", |ui: &mut Ui| {
            if ui.button("Select measurements…").clicked() {
                select_folder_dialog(state);
                ui.close_menu();
            }
            if ui.button("Rescan files").clicked() {
                state.scan_folder();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("Select output…").clicked() {
                select_output_dialog(state);
                ui.close_menu();
            }
            if ui.button("Evaluate").clicked() {
                state.start_run();
                ui.close_menu();
            }
            ui.separator();
            if ui.button("About").clicked() {
                state.show_about = true;
                ui.close_menu();
            }
        });

        ui.separator();

        let selected = state.files.iter().filter(|(_, on)| *on).count();
        ui.label(format!(
            "{} measurement files, {} selected",
            state.files.len(),
            selected
        ));

        if state.run.is_some() {
            ui.separator();
            ui.label("Evaluating…");
        }
    });
}

// ---------------------------------------------------------------------------
// Left side panel – folder, files, filters, run controls
// ---------------------------------------------------------------------------

/// Render the configuration panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("Measurements");
    ui.separator();

    ui.horizontal(|ui: &mut Ui| {
        let response = ui.add(
            egui::TextEdit::singleline(&mut state.folder_entry)
                .hint_text("Measurement folder")
                .desired_width(160.0),
        );
        if response.changed() {
            state.folder_entry_changed();
        }
        if ui.button("Select").clicked() {
            select_folder_dialog(state);
        }
        if ui.button("Scan").clicked() {
            state.scan_folder();
        }
    });

    if !state.files.is_empty() {
        ui.horizontal(|ui: &mut Ui| {
            if ui.small_button("All").clicked() {
                state.select_all();
            }
            if ui.small_button("None").clicked() {
                state.select_none();
            }
        });

        ScrollArea::vertical()
            .max_height(220.0)
            .auto_shrink([false, true])
            .show(ui, |ui: &mut Ui| {
                for (name, checked) in &mut state.files {
                    ui.checkbox(checked, name.as_str());
                }
            });
    }

    ui.separator();
    ui.heading("Filters");
    threshold_entry(ui, "Cycle filter:", &mut state.cycle_entry);
    threshold_entry(ui, "Infusion filter:", &mut state.infusion_entry);
    threshold_entry(ui, "Injection filter:", &mut state.injection_entry);

    ui.separator();
    ui.heading("Result");
    ui.add(
        egui::TextEdit::singleline(&mut state.output_entry)
            .hint_text("Leave empty for preview")
            .desired_width(f32::INFINITY),
    );
    ui.horizontal(|ui: &mut Ui| {
        if ui.button("Select…").clicked() {
            select_output_dialog(state);
        }
        if ui.button("Empty").clicked() {
            state.output_entry.clear();
        }
    });

    ui.add_space(8.0);
    let running = state.run.is_some();
    if ui
        .add_enabled(!running, egui::Button::new("Evaluate"))
        .clicked()
    {
        state.start_run();
    }
    if running || state.progress > 0 {
        ui.add(egui::ProgressBar::new(state.progress as f32 / 100.0).show_percentage());
    }
}

fn threshold_entry(ui: &mut Ui, label: &str, entry: &mut String) {
    ui.horizontal(|ui: &mut Ui| {
        ui.label(label);
        ui.add(egui::TextEdit::singleline(entry).desired_width(80.0));
    });
}

// ---------------------------------------------------------------------------
// Central panel – info stream, preview tables, peaks chart
// ---------------------------------------------------------------------------

/// Render the info stream and, after a preview run, the result tables and
/// the peaks chart.
pub fn central_panel(ui: &mut Ui, state: &AppState) {
    if state.info.is_empty() && state.preview.is_empty() {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.heading("Select a measurement folder and press Evaluate");
        });
        return;
    }

    ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui: &mut Ui| {
            for msg in &state.info {
                ui.label(RichText::new(msg).monospace());
            }

            if !state.preview.is_empty() {
                for table in &state.preview {
                    ui.add_space(8.0);
                    ui.label(RichText::new(&table.title).strong());
                    ui.label(RichText::new(&table.body).monospace());
                }

                ui.add_space(8.0);
                plot::peaks_plot(ui, &state.results);
            }
        });
}

// ---------------------------------------------------------------------------
// File dialogs
// ---------------------------------------------------------------------------

fn select_folder_dialog(state: &mut AppState) {
    if let Some(dir) = rfd::FileDialog::new().set_title("Measurements").pick_folder() {
        state.set_folder(dir);
    }
}

fn select_output_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Export file")
        .set_file_name("2F_plugin_depth_result")
        .add_filter("Excel files", &["xlsx"])
        .save_file();

    if let Some(path) = file {
        state.output_entry = path.display().to_string();
        // Choosing an output starts the evaluation directly.
        state.start_run();
    }
}
