use chrono::{Datelike, NaiveDate};
use eframe::egui::{self, Color32, RichText, Ui};
use egui_plot::{Bar, BarChart, GridMark, Line, Plot, PlotPoints};

use crate::data::model::{DailyCountSeries, DistanceHistogram};
use crate::state::AppState;
use crate::ui::panels::open_file_dialog;
use crate::view::{DashboardView, MetricCards};

// ---------------------------------------------------------------------------
// Central panel
// ---------------------------------------------------------------------------

/// Render metrics and charts, or whatever stopped the last run.
pub fn dashboard(ui: &mut Ui, state: &mut AppState) {
    if let Some(err) = &state.run_error {
        let message = err.to_string();
        let wants_upload = state.wants_upload();
        ui.vertical_centered(|ui: &mut Ui| {
            ui.add_space(40.0);
            ui.label(RichText::new(message).color(Color32::RED));
            if wants_upload {
                ui.add_space(8.0);
                if ui.button("Upload trip data (Parquet or CSV)…").clicked() {
                    open_file_dialog(state);
                }
            }
        });
        return;
    }

    let Some(view) = &state.view else {
        ui.centered_and_justified(|ui: &mut Ui| {
            ui.spinner();
        });
        return;
    };

    metric_row(ui, &view.metrics);
    ui.separator();
    charts(ui, view);
}

fn metric_row(ui: &mut Ui, metrics: &MetricCards) {
    ui.columns(4, |cols| {
        for (col, (label, value)) in cols.iter_mut().zip(metrics.entries()) {
            egui::Frame::group(col.style()).show(col, |ui: &mut Ui| {
                ui.label(label);
                ui.heading(value);
            });
        }
    });
}

fn charts(ui: &mut Ui, view: &DashboardView) {
    let Some(charts) = &view.charts else {
        if let Some(notice) = view.notice() {
            ui.label(RichText::new(notice).color(Color32::from_rgb(200, 150, 0)));
        }
        return;
    };

    let chart_height = (ui.available_height() / 2.0 - 30.0).max(150.0);

    ui.strong("Trip Distance Distribution");
    distance_histogram(ui, &charts.histogram, chart_height);

    ui.add_space(8.0);
    ui.strong("Trips Over Time");
    daily_line(ui, &charts.daily, chart_height);
}

// ---------------------------------------------------------------------------
// Charts
// ---------------------------------------------------------------------------

fn distance_histogram(ui: &mut Ui, histogram: &DistanceHistogram, height: f32) {
    let bars: Vec<Bar> = histogram
        .bins
        .iter()
        .map(|b| Bar::new(b.center(), b.count as f64).width(b.width()))
        .collect();

    Plot::new("distance_histogram")
        .height(height)
        .x_axis_label("trip_miles")
        .y_axis_label("count")
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.bar_chart(BarChart::new(bars).color(Color32::LIGHT_BLUE).name("trips"));
        });
}

fn daily_line(ui: &mut Ui, series: &DailyCountSeries, height: f32) {
    let points: PlotPoints = series
        .counts
        .iter()
        .map(|(date, count)| [f64::from(date.num_days_from_ce()), *count as f64])
        .collect();

    Plot::new("daily_trips")
        .height(height)
        .x_axis_label("date")
        .y_axis_label("trips")
        .x_axis_formatter(|mark: GridMark, _range| day_label(mark.value))
        .allow_scroll(false)
        .show(ui, |plot_ui| {
            plot_ui.line(Line::new(points).name("trips per day").width(1.5));
        });
}

/// Axis value (days from CE) back to a calendar date label.
fn day_label(value: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(value.round() as i32)
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_default()
}
