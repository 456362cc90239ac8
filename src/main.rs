mod app;
mod data;
mod locale;
mod report;
mod run;
mod state;
mod ui;
mod update;

use app::PlugDepthApp;
use eframe::egui;

fn main() -> eframe::Result {
    env_logger::init();

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([800.0, 650.0])
            .with_min_inner_size([800.0, 250.0]),
        ..Default::default()
    };

    eframe::run_native(
        "2F plug-in depth evaluation",
        options,
        Box::new(|_cc| Ok(Box::new(PlugDepthApp::default()))),
    )
}
