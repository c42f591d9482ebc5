use std::path::PathBuf;

use thiserror::Error;

/// Everything the dashboard can surface to the user.  None of these abort the
/// process; the UI turns them into messages.
#[derive(Debug, Error)]
pub enum DashboardError {
    #[error("data unavailable at {}: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },
    #[error("missing required columns: {missing:?} (available: {available:?})")]
    SchemaInvalid {
        missing: Vec<String>,
        available: Vec<String>,
    },
    #[error("password not configured (set TRIP_DASH_PASSWORD or a secrets file)")]
    SecretNotConfigured,
    #[error("password incorrect")]
    AuthMismatch,
    #[error("dashboard is locked until the password is entered")]
    Locked,
    #[error("config error: {0}")]
    Config(String),
}

impl DashboardError {
    /// Whether the user can recover without restarting (retry or upload).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            DashboardError::DataUnavailable { .. }
                | DashboardError::AuthMismatch
                | DashboardError::Locked
        )
    }
}
