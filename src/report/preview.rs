//! Textual result tables for the in-app preview.

use std::fmt::Write as _;

use crate::data::model::FileEvaluation;

/// A formatted result table for one evaluated file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewTable {
    pub title: String,
    /// Monospace table body, rows displayed 1-indexed.
    pub body: String,
}

/// Render one preview table per evaluation, in settlement order. One-port
/// tables omit the injection columns entirely.
pub fn render(evaluations: &[FileEvaluation]) -> Vec<PreviewTable> {
    evaluations
        .iter()
        .map(|eval| PreviewTable {
            title: eval.file_name.clone(),
            body: render_table(eval),
        })
        .collect()
}

fn render_table(eval: &FileEvaluation) -> String {
    let mut out = String::new();

    if eval.one_port {
        let _ = writeln!(out, "{:>4}  {:>12}  {:>15}", "", "Infusion", "Error Infusion");
        for (i, row) in eval.rows.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>4}  {:>12.6}  {:>15}",
                i + 1,
                row.infusion_peak,
                row.infusion_below
            );
        }
    } else {
        let _ = writeln!(
            out,
            "{:>4}  {:>12}  {:>12}  {:>15}  {:>15}",
            "", "Infusion", "Injection", "Error Infusion", "Error Injection"
        );
        for (i, row) in eval.rows.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>4}  {:>12.6}  {:>12.6}  {:>15}  {:>15}",
                i + 1,
                row.infusion_peak,
                row.injection_peak,
                row.infusion_below,
                row.injection_below
            );
        }
    }

    out
}
