//! Calbot Desktop — application entry.

mod app;

use eframe::egui;

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1100.0, 760.0])
            .with_min_inner_size([800.0, 600.0]),
        ..Default::default()
    };
    eframe::run_native(
        "Calbot",
        options,
        Box::new(|cc| Box::new(app::CalbotApp::new(cc))),
    )
}
