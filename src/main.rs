#![warn(clippy::all, rust_2018_idioms)]
#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

use caysonmap::config::Config;
use caysonmap::APP_NAME;
use caysonmap::ui::my_app::MyApp;

#[cfg(not(target_arch = "wasm32"))]
fn main() -> eframe::Result<()> {
    env_logger::init();

    let config = Config::from_env();
    if !config.search_enabled() {
        log::warn!("KAKAO_REST_API_KEY not set; place search is disabled");
    }

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size(egui::vec2(1280.0, 800.0))
            .with_min_inner_size(egui::vec2(400.0, 300.0))
            .with_title(APP_NAME)
            .with_resizable(true)
            .with_decorations(true),
        ..Default::default()
    };

    eframe::run_native(
        APP_NAME,
        native_options,
        Box::new(|cc| Ok(Box::new(MyApp::new(cc, config)?))),
    )
}
