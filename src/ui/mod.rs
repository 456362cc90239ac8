//! UI layer: panels, dialogs, and the preview chart.

pub mod panels;
pub mod plot;
