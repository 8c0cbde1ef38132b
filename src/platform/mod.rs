//! Platform-specific locations of the bundled backend

use std::path::{Path, PathBuf};

/// File name of the bundled backend executable
pub fn backend_executable_name() -> &'static str {
    #[cfg(windows)]
    {
        "main.exe"
    }
    #[cfg(not(windows))]
    {
        "main"
    }
}

/// Interpreter used to run the backend sources in development mode
pub fn default_interpreter() -> &'static str {
    "python"
}

/// Resources directory of the packaged application
///
/// macOS bundles keep resources in `Contents/Resources` next to the
/// `Contents/MacOS` directory holding the binary; everywhere else they sit
/// in a `resources` directory beside the executable.
pub fn default_resources_dir() -> PathBuf {
    let exe_dir = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."));

    #[cfg(target_os = "macos")]
    {
        if let Some(contents) = exe_dir.parent() {
            let resources = contents.join("Resources");
            if resources.is_dir() {
                return resources;
            }
        }
    }

    exe_dir.join("resources")
}

/// Windows process creation flags for the backend (no console window)
#[cfg(windows)]
pub const CREATE_NO_WINDOW: u32 = 0x0800_0000;
