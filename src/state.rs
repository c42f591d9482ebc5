use std::path::PathBuf;

use chrono::NaiveDate;

use crate::auth::AuthState;
use crate::config::DashboardConfig;
use crate::controller::DashboardController;
use crate::data::model::DateInterval;
use crate::error::DashboardError;
use crate::view::DashboardView;

// ---------------------------------------------------------------------------
// Application state
// ---------------------------------------------------------------------------

/// The full UI state, independent of rendering.
pub struct AppState {
    pub controller: DashboardController,

    /// Password text field.  Moved out (and thus cleared) on submit.
    pub password_input: String,

    /// Malformed settings that fell back to defaults.  Shown on every screen.
    pub config_errors: Vec<DashboardError>,

    /// Gate error shown on the login screen.
    pub auth_error: Option<DashboardError>,

    /// File chosen through the upload dialog when the configured one is absent.
    pub upload: Option<PathBuf>,

    /// Date-picker values; `None` until the first successful run.
    pub start_input: Option<NaiveDate>,
    pub end_input: Option<NaiveDate>,

    /// Result of the last run.
    pub view: Option<DashboardView>,

    /// Error from the last run, shown instead of the dashboard.
    pub run_error: Option<DashboardError>,

    /// Set by any interaction that requires the controller to run again.
    pub dirty: bool,
}

impl AppState {
    pub fn new(config: &DashboardConfig) -> Self {
        Self {
            controller: DashboardController::from_config(config),
            password_input: String::new(),
            config_errors: Vec::new(),
            auth_error: None,
            upload: None,
            start_input: None,
            end_input: None,
            view: None,
            run_error: None,
            dirty: true,
        }
    }

    pub fn is_authorized(&self) -> bool {
        self.controller.auth_state() == AuthState::Authorized
    }

    /// Advance the gate past `Unauthenticated` on first render.
    pub fn prompt(&mut self) {
        if let Err(e) = self.controller.prompt() {
            self.auth_error = Some(e);
        }
    }

    pub fn submit_password(&mut self) {
        let credential = std::mem::take(&mut self.password_input);
        match self.controller.submit_password(credential) {
            Ok(()) => {
                self.auth_error = None;
                self.dirty = true;
            }
            Err(e) => self.auth_error = Some(e),
        }
    }

    /// User-chosen interval from the two date pickers.
    pub fn selection(&self) -> Option<DateInterval> {
        Some(DateInterval::new(self.start_input?, self.end_input?))
    }

    pub fn set_upload(&mut self, path: PathBuf) {
        self.upload = Some(path);
        self.start_input = None;
        self.end_input = None;
        self.dirty = true;
    }

    /// Re-run the controller if something changed since the last pass.
    pub fn refresh(&mut self) {
        if !self.dirty || !self.is_authorized() {
            return;
        }
        self.dirty = false;

        match self.controller.run(self.upload.as_deref(), self.selection()) {
            Ok(view) => {
                // Snap the pickers to what was actually applied.
                if let Some(iv) = view.interval {
                    self.start_input = Some(iv.start());
                    self.end_input = Some(iv.end());
                }
                self.view = Some(view);
                self.run_error = None;
            }
            Err(e) => {
                if e.is_recoverable() {
                    log::warn!("Dashboard run stopped: {e}");
                } else {
                    log::error!("Dashboard run failed: {e}");
                }
                self.view = None;
                self.run_error = Some(e);
            }
        }
    }

    /// Whether the failure can be fixed by picking another file.
    pub fn wants_upload(&self) -> bool {
        matches!(self.run_error, Some(DashboardError::DataUnavailable { .. }))
    }
}
