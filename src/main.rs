mod app;
mod auth;
mod cache;
mod config;
mod controller;
mod data;
mod error;
mod pipeline;
mod state;
mod ui;
mod view;

use app::TripDashApp;
use config::DashboardConfig;
use eframe::egui;

fn main() -> eframe::Result {
    dotenvy::dotenv().ok();
    env_logger::init();

    let (config, problems) = DashboardConfig::from_env();
    for problem in &problems {
        log::warn!("{problem}; using the default for that setting");
    }
    log::info!("Starting with {config:?}");

    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1200.0, 800.0])
            .with_min_inner_size([600.0, 400.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Trip Analysis – NYC",
        options,
        Box::new(move |_cc| Ok(Box::new(TripDashApp::new(&config, problems)))),
    )
}
