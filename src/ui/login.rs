use eframe::egui::{self, Color32, RichText, Ui};

use crate::auth::AuthState;
use crate::error::DashboardError;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Password screen
// ---------------------------------------------------------------------------

/// Render the password prompt shown until the session is authorized.
pub fn login_screen(ui: &mut Ui, state: &mut AppState) {
    ui.vertical_centered(|ui: &mut Ui| {
        ui.add_space(ui.available_height() * 0.25);
        ui.heading("🚗 Trip Analysis – NYC");
        ui.add_space(12.0);

        for problem in &state.config_errors {
            ui.label(RichText::new(problem.to_string()).color(Color32::RED));
        }

        if matches!(state.auth_error, Some(DashboardError::SecretNotConfigured)) {
            ui.label(
                RichText::new("Password not configured (set TRIP_DASH_PASSWORD or secrets.json)")
                    .color(Color32::RED),
            );
            return;
        }

        let response = ui.add(
            egui::TextEdit::singleline(&mut state.password_input)
                .password(true)
                .hint_text("Password")
                .desired_width(240.0),
        );
        let entered = response.lost_focus() && ui.input(|i| i.key_pressed(egui::Key::Enter));
        if entered || ui.button("Unlock").clicked() {
            state.submit_password();
        }

        ui.add_space(8.0);
        if let AuthState::Authenticating {
            last_attempt_failed: true,
        } = state.controller.auth_state()
        {
            ui.label(RichText::new("😕 Password incorrect").color(Color32::RED));
        }
        ui.label(
            RichText::new("Please enter the correct password to view the dashboard.")
                .color(Color32::from_rgb(200, 150, 0)),
        );
    });
}
