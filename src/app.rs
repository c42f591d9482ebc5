use eframe::egui;

use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::state::AppState;
use crate::ui::{login, panels, plot};

// ---------------------------------------------------------------------------
// eframe App implementation
// ---------------------------------------------------------------------------

pub struct TripDashApp {
    pub state: AppState,
}

impl TripDashApp {
    pub fn new(config: &DashboardConfig, config_errors: Vec<DashboardError>) -> Self {
        let mut state = AppState::new(config);
        state.config_errors = config_errors;
        Self { state }
    }
}

impl eframe::App for TripDashApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.state.is_authorized() {
            self.state.prompt();
            egui::CentralPanel::default().show(ctx, |ui| {
                login::login_screen(ui, &mut self.state);
            });
            return;
        }

        self.state.refresh();

        // ---- Top panel: source and row counts ----
        egui::TopBottomPanel::top("top_bar").show(ctx, |ui| {
            panels::top_bar(ui, &mut self.state);
        });

        // ---- Left side panel: date filter ----
        egui::SidePanel::left("filter_panel")
            .default_width(220.0)
            .resizable(true)
            .show(ctx, |ui| {
                panels::side_panel(ui, &mut self.state);
            });

        // ---- Central panel: metrics and charts ----
        egui::CentralPanel::default().show(ctx, |ui| {
            plot::dashboard(ui, &mut self.state);
        });
    }
}
