use eframe::egui;
use std::path::PathBuf;

use flaner::config::Config;

mod app;

fn main() -> eframe::Result {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = Config::load();
    let image_path = std::env::args_os().nth(1).map(PathBuf::from);

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_title(app::TITLE),
        ..Default::default()
    };

    eframe::run_native(
        app::TITLE,
        options,
        Box::new(move |_cc| Ok(Box::new(app::FlanerApp::new(config, image_path)))),
    )
}
