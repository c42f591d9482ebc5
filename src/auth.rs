use std::fmt;

use crate::error::DashboardError;

/// Where a session stands with respect to the shared password.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    /// Nothing rendered yet.
    Unauthenticated,
    /// Password prompt is showing.
    Authenticating { last_attempt_failed: bool },
    /// Terminal for the session; there is no logout.
    Authorized,
}

/// Single shared-password gate.
///
/// Only the [`AuthState`] is kept between calls.  Submitted credentials are
/// taken by value and dropped as soon as they have been compared.
pub struct PasswordGate {
    secret: Option<String>,
    state: AuthState,
}

impl fmt::Debug for PasswordGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordGate")
            .field("configured", &self.secret.is_some())
            .field("state", &self.state)
            .finish()
    }
}

impl PasswordGate {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn state(&self) -> AuthState {
        self.state
    }

    pub fn is_authorized(&self) -> bool {
        self.state == AuthState::Authorized
    }

    fn secret(&self) -> Result<&str, DashboardError> {
        self.secret
            .as_deref()
            .ok_or(DashboardError::SecretNotConfigured)
    }

    /// First render: show the prompt.  Fails when no secret is configured,
    /// which leaves the gate closed for good.
    pub fn prompt(&mut self) -> Result<AuthState, DashboardError> {
        self.secret()?;
        if self.state == AuthState::Unauthenticated {
            self.state = AuthState::Authenticating {
                last_attempt_failed: false,
            };
        }
        Ok(self.state)
    }

    /// Compare `credential` against the secret.  Unlimited retries.
    pub fn submit(&mut self, credential: String) -> Result<(), DashboardError> {
        if self.is_authorized() {
            return Ok(());
        }
        let matches = credential.as_bytes() == self.secret()?.as_bytes();
        drop(credential);

        if matches {
            log::info!("Password accepted");
            self.state = AuthState::Authorized;
            Ok(())
        } else {
            log::warn!("Password rejected");
            self.state = AuthState::Authenticating {
                last_attempt_failed: true,
            };
            Err(DashboardError::AuthMismatch)
        }
    }
}
