//! Supervisor errors - every way a backend launch attempt can fail

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use super::supervisor::BackendState;

/// Failure of a backend launch attempt
///
/// `Configuration`, `Spawn` and `Timeout` are fatal for the shell: they are
/// shown to the user and the shell exits. Nothing here is retried
/// automatically.
#[derive(Debug, Error)]
pub enum SupervisorError {
    /// Expected backend artifact is missing on disk
    #[error("{message}")]
    Configuration { path: PathBuf, message: String },

    /// The OS could not create the backend process
    #[error("Failed to start backend process {}", command.display())]
    Spawn {
        command: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Health endpoint never answered within the probe budget
    #[error("Backend failed to start in {} seconds ({attempts} health checks)", budget.as_secs())]
    Timeout { attempts: u32, budget: Duration },

    /// Operation called out of order for the current lifecycle state
    #[error("Cannot {operation} backend while it is {}", state.label())]
    InvalidState {
        operation: &'static str,
        state: BackendState,
    },
}

impl SupervisorError {
    /// Short heading used for the user-facing dialog
    pub fn title(&self) -> &'static str {
        match self {
            Self::Configuration { .. } => "Backend not found",
            Self::Spawn { .. } => "Backend could not be started",
            Self::Timeout { .. } => "Backend did not respond",
            Self::InvalidState { .. } => "Startup Error",
        }
    }
}
