//! Shell settings - stored as JSON in the user's config directory

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::launch::LaunchRoots;
use crate::platform;

/// Environment variable pointing at an alternate settings file
pub const CONFIG_ENV: &str = "HOMESTOCK_CONFIG";

/// Smallest window the dashboard lays out correctly in
pub const MIN_WINDOW_SIZE: (f32, f32) = (1200.0, 700.0);

/// Shell color theme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ShellTheme {
    #[default]
    Light,
    Dark,
}

/// Settings owned by the shell (the backend keeps its own)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellSettings {
    /// Host the backend listens on
    pub backend_host: String,
    /// Port the backend listens on
    pub backend_port: u16,
    /// Interpreter for development mode
    pub python_interpreter: String,
    /// Project root holding the backend sources (development)
    pub source_root: Option<PathBuf>,
    /// Resources directory holding the bundled backend (production)
    pub resources_dir: Option<PathBuf>,
    pub theme: ShellTheme,
    pub window_size: (f32, f32),
    /// Enable debug logging
    pub debug_logging: bool,
    /// Backend CPU/memory sampling interval in ms
    pub monitor_interval_ms: u32,
}

impl Default for ShellSettings {
    fn default() -> Self {
        Self {
            backend_host: "127.0.0.1".to_string(),
            backend_port: 8000,
            python_interpreter: platform::default_interpreter().to_string(),
            source_root: None,
            resources_dir: None,
            theme: ShellTheme::Light,
            window_size: (1400.0, 900.0),
            debug_logging: false,
            monitor_interval_ms: 1000,
        }
    }
}

impl ShellSettings {
    /// Location of the settings file
    pub fn config_path() -> PathBuf {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return PathBuf::from(path);
        }
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("HomeStock")
            .join("shell.json")
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// Load settings, writing defaults when the file does not exist yet
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            let settings = Self::default();
            match settings.save_to(path) {
                Ok(()) => info!("Created default settings at {}", path.display()),
                Err(e) => warn!("Failed to write default settings: {:#}", e),
            }
            return Ok(settings);
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings from {}", path.display()))?;
        let mut settings: Self = serde_json::from_str(&raw)
            .with_context(|| format!("Invalid settings file {}", path.display()))?;
        settings.validate();
        Ok(settings)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)
            .with_context(|| format!("Failed to write settings to {}", path.display()))?;
        Ok(())
    }

    /// Validate settings and fix any invalid values
    pub fn validate(&mut self) {
        let defaults = Self::default();
        if self.backend_host.trim().is_empty() {
            self.backend_host = defaults.backend_host;
        }
        if self.backend_port == 0 {
            self.backend_port = defaults.backend_port;
        }
        if self.python_interpreter.trim().is_empty() {
            self.python_interpreter = defaults.python_interpreter;
        }
        self.window_size.0 = self.window_size.0.max(MIN_WINDOW_SIZE.0);
        self.window_size.1 = self.window_size.1.max(MIN_WINDOW_SIZE.1);
        self.monitor_interval_ms = self.monitor_interval_ms.max(250);
    }

    /// Base URL of the backend, also its health endpoint
    pub fn backend_url(&self) -> String {
        format!("http://{}:{}", self.backend_host, self.backend_port)
    }

    /// Where to look for the backend in either run mode
    pub fn launch_roots(&self) -> LaunchRoots {
        LaunchRoots {
            source_root: self
                .source_root
                .clone()
                .unwrap_or_else(|| PathBuf::from(env!("CARGO_MANIFEST_DIR"))),
            resources_dir: self
                .resources_dir
                .clone()
                .unwrap_or_else(platform::default_resources_dir),
            interpreter: self.python_interpreter.clone(),
        }
    }
}
