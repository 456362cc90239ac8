use eframe::egui::{Color32, Ui};
use egui_plot::{Bar, BarChart, Legend, Plot};

use crate::data::model::FileEvaluation;

// ---------------------------------------------------------------------------
// Peaks chart (preview)
// ---------------------------------------------------------------------------

const INFUSION_COLOR: Color32 = Color32::LIGHT_BLUE;
const INJECTION_COLOR: Color32 = Color32::LIGHT_RED;

/// Bar chart of per-cycle peaks across the evaluated files, one group of
/// bars per kept cycle with a gap between files.
pub fn peaks_plot(ui: &mut Ui, evaluations: &[FileEvaluation]) {
    if evaluations.is_empty() {
        return;
    }

    let mut infusion_bars = Vec::new();
    let mut injection_bars = Vec::new();
    let mut x = 0.0_f64;

    for eval in evaluations {
        for row in &eval.rows {
            infusion_bars.push(Bar::new(x, row.infusion_peak).width(0.4));
            if !eval.one_port {
                injection_bars.push(Bar::new(x + 0.4, row.injection_peak).width(0.4));
            }
            x += 1.0;
        }
        // Gap between files.
        x += 1.0;
    }

    Plot::new("peaks_plot")
        .legend(Legend::default())
        .x_axis_label("Cycle")
        .y_axis_label("Depth [mm]")
        .height(260.0)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(
                BarChart::new(infusion_bars)
                    .name("Infusion")
                    .color(INFUSION_COLOR),
            );
            if !injection_bars.is_empty() {
                plot_ui.bar_chart(
                    BarChart::new(injection_bars)
                        .name("Injection")
                        .color(INJECTION_COLOR),
                );
            }
        });
}
