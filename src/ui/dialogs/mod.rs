//! Native message boxes shown outside the main window

use rfd::{MessageButtons, MessageDialog, MessageLevel};

use crate::APP_NAME;

/// Blocking error box for a failed startup
pub fn show_startup_error(message: &str) {
    MessageDialog::new()
        .set_level(MessageLevel::Error)
        .set_title("Startup Error")
        .set_description(startup_error_text(message))
        .set_buttons(MessageButtons::Ok)
        .show();
}

/// Shown when another shell already owns the backend
pub fn show_already_running() {
    MessageDialog::new()
        .set_level(MessageLevel::Warning)
        .set_title(APP_NAME)
        .set_description(format!("{} is already running!", APP_NAME))
        .set_buttons(MessageButtons::Ok)
        .show();
}

fn startup_error_text(message: &str) -> String {
    format!(
        "Failed to start {}:\n\n{}\n\nPlease check the logs for more details.",
        APP_NAME, message
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn startup_error_names_the_app() {
        assert_eq!(
            startup_error_text("Backend failed to start in 30 seconds (60 health checks)"),
            "Failed to start HomeStock:\n\nBackend failed to start in 30 seconds (60 health checks)\n\nPlease check the logs for more details."
        );
    }
}
