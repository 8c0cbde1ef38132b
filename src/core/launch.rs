//! Launch resolution - what to run for the backend in each run mode

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::error::SupervisorError;
use crate::platform;

/// Directory holding the backend, both in sources and in bundled resources
pub const BACKEND_DIR: &str = "python-backend";

/// Backend entry script run in development mode
pub const ENTRY_SCRIPT: &str = "main.py";

/// Environment variable selecting the run mode
pub const RUN_MODE_ENV: &str = "HOMESTOCK_ENV";

/// How the backend is shipped alongside the shell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum RunMode {
    /// Backend sources run through an interpreter
    Development,
    /// Bundled backend executable
    #[default]
    Production,
}

impl RunMode {
    /// Read the run mode from `HOMESTOCK_ENV`
    pub fn from_env() -> Self {
        Self::from_flag(std::env::var(RUN_MODE_ENV).ok().as_deref())
    }

    /// `development` selects development mode; anything else is production
    pub fn from_flag(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some(value) if value.eq_ignore_ascii_case("development") => Self::Development,
            _ => Self::Production,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

/// Filesystem roots a launch spec is resolved against
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRoots {
    /// Project root containing the backend sources
    pub source_root: PathBuf,
    /// Resources directory of the packaged application
    pub resources_dir: PathBuf,
    /// Interpreter for development mode
    pub interpreter: String,
}

/// Fully resolved backend invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub run_mode: RunMode,
    /// Program handed to the OS
    pub command: PathBuf,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
    /// Backend artifact verified to exist (entry script or executable)
    pub artifact: PathBuf,
}

/// Resolve what to run for `mode`
///
/// Only checks that the expected artifact exists; nothing is spawned.
pub fn resolve_launch_spec(
    mode: RunMode,
    roots: &LaunchRoots,
) -> Result<LaunchSpec, SupervisorError> {
    let spec = match mode {
        RunMode::Development => {
            let working_directory = absolutize(&roots.source_root).join(BACKEND_DIR);
            let entry = working_directory.join(ENTRY_SCRIPT);
            debug!("Looking for backend entry script at {}", entry.display());

            if !entry.is_file() {
                return Err(SupervisorError::Configuration {
                    message: format!("{} not found in {} folder", ENTRY_SCRIPT, BACKEND_DIR),
                    path: entry,
                });
            }

            LaunchSpec {
                run_mode: mode,
                command: PathBuf::from(&roots.interpreter),
                args: vec![ENTRY_SCRIPT.to_string()],
                working_directory,
                artifact: entry,
            }
        }
        RunMode::Production => {
            let working_directory = absolutize(&roots.resources_dir).join(BACKEND_DIR);
            let executable = working_directory.join(platform::backend_executable_name());
            debug!("Looking for bundled backend at {}", executable.display());

            if !executable.is_file() {
                return Err(SupervisorError::Configuration {
                    message: format!("Python backend not found at: {}", executable.display()),
                    path: executable,
                });
            }

            LaunchSpec {
                run_mode: mode,
                command: executable.clone(),
                args: Vec::new(),
                working_directory,
                artifact: executable,
            }
        }
    };

    info!(
        "{} mode - running {} {:?} in {}",
        mode.label(),
        spec.command.display(),
        spec.args,
        spec.working_directory.display()
    );
    Ok(spec)
}

fn absolutize(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    std::env::current_dir()
        .map(|cwd| cwd.join(path))
        .unwrap_or_else(|_| path.to_path_buf())
}
