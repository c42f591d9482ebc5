use eframe::egui::{Color32, RichText, Ui};
use egui_extras::DatePickerButton;

use crate::state::AppState;

// ---------------------------------------------------------------------------
// Left side panel – date filter
// ---------------------------------------------------------------------------

/// Render the left filter panel.
pub fn side_panel(ui: &mut Ui, state: &mut AppState) {
    ui.heading("📊 Filters");
    ui.separator();

    let Some(span) = state.view.as_ref().and_then(|v| v.span) else {
        ui.label("No dates to filter.");
        return;
    };
    let (Some(mut start), Some(mut end)) = (state.start_input, state.end_input) else {
        return;
    };

    ui.strong("Select Date Range");
    ui.label(format!("Data covers {span}"));
    ui.add_space(4.0);

    ui.horizontal(|ui: &mut Ui| {
        ui.label("From");
        ui.add(DatePickerButton::new(&mut start).id_salt("start_date"));
    });
    ui.horizontal(|ui: &mut Ui| {
        ui.label("To");
        ui.add(DatePickerButton::new(&mut end).id_salt("end_date"));
    });

    if ui.small_button("Reset").clicked() {
        start = span.start();
        end = span.end();
    }

    // Keep the pickers inside the data.
    start = start.clamp(span.start(), span.end());
    end = end.clamp(span.start(), span.end());

    if Some(start) != state.start_input || Some(end) != state.end_input {
        state.start_input = Some(start);
        state.end_input = Some(end);
        state.dirty = true;
    }
}

// ---------------------------------------------------------------------------
// Top bar
// ---------------------------------------------------------------------------

/// Render the top status bar.
pub fn top_bar(ui: &mut Ui, state: &mut AppState) {
    ui.horizontal(|ui: &mut Ui| {
        ui.strong("🚗 Trip Analysis – NYC");
        ui.separator();

        if let Some(view) = &state.view {
            ui.label(format!("Source: {}", view.source.display()));
            ui.separator();
            ui.label(format!(
                "{} trips loaded, {} visible",
                view.loaded_rows, view.visible_rows
            ));
        }

        if let Some(err) = &state.run_error {
            ui.separator();
            ui.label(RichText::new(err.to_string()).color(Color32::RED));
        }

        for problem in &state.config_errors {
            ui.separator();
            ui.label(RichText::new(problem.to_string()).color(Color32::from_rgb(200, 150, 0)));
        }
    });
}

// ---------------------------------------------------------------------------
// Fallback upload
// ---------------------------------------------------------------------------

pub fn open_file_dialog(state: &mut AppState) {
    let file = rfd::FileDialog::new()
        .set_title("Upload trip data")
        .add_filter("Supported files", &["parquet", "pq", "csv"])
        .add_filter("Parquet", &["parquet", "pq"])
        .add_filter("CSV", &["csv"])
        .pick_file();

    if let Some(path) = file {
        log::info!("Using uploaded file {}", path.display());
        state.set_upload(path);
    }
}
