//! Status panel - the backend at a glance

use chrono::{DateTime, Local};
use egui::{RichText, Ui};

use crate::api::types::BackendInfo;
use crate::api::{ApiError, SchedulerStatus};
use crate::core::monitor::{format_bytes, BackendUsage};
use crate::core::{BackendProcessHandle, BackendState};
use crate::ui::components::StatusBadge;
use crate::ui::theme::{Icons, Theme};

/// What the user asked for this frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusAction {
    CheckConnection,
    RefreshScheduler,
    OpenBackendFolder,
    Quit,
}

/// Everything the panel shows, borrowed from the app for one frame
pub struct StatusView<'a> {
    pub state: BackendState,
    pub handle: Option<&'a BackendProcessHandle>,
    pub alive: bool,
    pub usage: Option<BackendUsage>,
    pub endpoint: &'a str,
    pub connection: Option<&'a Result<BackendInfo, ApiError>>,
    pub connection_pending: bool,
    pub scheduler: Option<&'a Result<SchedulerStatus, ApiError>>,
    pub scheduler_pending: bool,
}

fn section_header(ui: &mut Ui, icon: &str, title: &str) {
    ui.horizontal(|ui| {
        ui.label(RichText::new(icon).size(18.0).color(Theme::PRIMARY_LIGHT));
        ui.add_space(10.0);
        ui.label(RichText::new(title).size(18.0).strong());
    });
    ui.add_space(10.0);
}

fn card<R>(ui: &mut Ui, add_contents: impl FnOnce(&mut Ui) -> R) -> R {
    egui::Frame::none()
        .fill(ui.visuals().faint_bg_color)
        .rounding(egui::Rounding::same(10.0))
        .inner_margin(egui::Margin::same(16.0))
        .show(ui, |ui| {
            ui.set_width(ui.available_width());
            add_contents(ui)
        })
        .inner
}

pub fn render(ui: &mut Ui, view: &StatusView<'_>) -> Option<StatusAction> {
    let mut action = None;

    egui::ScrollArea::vertical()
        .auto_shrink([false, false])
        .show(ui, |ui| {
            ui.add_space(8.0);
            section_header(ui, Icons::CPU, "Backend");
            card(ui, |ui| render_process(ui, view, &mut action));

            ui.add_space(20.0);
            section_header(ui, Icons::NETWORK, "Connection");
            card(ui, |ui| render_connection(ui, view, &mut action));

            ui.add_space(20.0);
            section_header(ui, Icons::CLOCK, "Scheduler");
            card(ui, |ui| render_scheduler(ui, view, &mut action));

            ui.add_space(20.0);
            if ui.button(format!("{} Quit HomeStock", Icons::CLOSE)).clicked() {
                action = Some(StatusAction::Quit);
            }
        });

    action
}

fn render_process(ui: &mut Ui, view: &StatusView<'_>, action: &mut Option<StatusAction>) {
    ui.horizontal(|ui| {
        StatusBadge::show(ui, view.state);
        ui.add_space(8.0);
        StatusBadge::dot(ui, view.alive);
    });
    ui.add_space(8.0);

    let Some(handle) = view.handle else {
        ui.label(RichText::new("No backend process").color(Theme::TEXT_MUTED));
        return;
    };

    egui::Grid::new("backend_process")
        .num_columns(2)
        .spacing([24.0, 6.0])
        .show(ui, |ui| {
            ui.label("PID");
            ui.monospace(handle.pid.map_or_else(|| "-".to_string(), |pid| pid.to_string()));
            ui.end_row();

            ui.label("Mode");
            ui.label(handle.run_mode.label());
            ui.end_row();

            ui.label("Executable");
            ui.monospace(handle.executable_path.display().to_string());
            ui.end_row();

            ui.label("Working directory");
            ui.monospace(handle.working_directory.display().to_string());
            ui.end_row();

            ui.label("Uptime");
            ui.label(uptime_label(handle.started_at, Local::now()));
            ui.end_row();

            if let Some(status) = handle.exit_status {
                ui.label("Exit status");
                ui.label(RichText::new(status.to_string()).color(Theme::ERROR));
                ui.end_row();
            }

            if let Some(usage) = view.usage {
                ui.label(format!("{} CPU", Icons::CPU));
                ui.label(format!("{:.1}%", usage.cpu_percent));
                ui.end_row();

                ui.label(format!("{} Memory", Icons::MEMORY));
                ui.label(format_bytes(usage.memory_bytes));
                ui.end_row();
            }
        });

    ui.add_space(8.0);
    if ui
        .button(format!("{} Open backend folder", Icons::FOLDER))
        .clicked()
    {
        *action = Some(StatusAction::OpenBackendFolder);
    }
}

fn render_connection(ui: &mut Ui, view: &StatusView<'_>, action: &mut Option<StatusAction>) {
    ui.horizontal(|ui| {
        ui.label("Endpoint");
        ui.monospace(view.endpoint);
    });

    match view.connection {
        None => {
            ui.label(RichText::new("Not checked yet").color(Theme::TEXT_MUTED));
        }
        Some(Ok(info)) => {
            let version = info.version.as_deref().unwrap_or("unknown version");
            ui.label(
                RichText::new(format!("{} ({})", info.message, version)).color(Theme::SUCCESS),
            );
        }
        Some(Err(e)) => {
            ui.label(RichText::new(e.to_string()).color(Theme::ERROR));
        }
    }

    ui.add_enabled_ui(!view.connection_pending, |ui| {
        if ui
            .button(format!("{} Check connection", Icons::REFRESH))
            .clicked()
        {
            *action = Some(StatusAction::CheckConnection);
        }
    });
}

fn render_scheduler(ui: &mut Ui, view: &StatusView<'_>, action: &mut Option<StatusAction>) {
    match view.scheduler {
        None => {
            ui.label(RichText::new("Loading...").color(Theme::TEXT_MUTED));
        }
        Some(Ok(status)) => {
            let color = if status.is_running() {
                Theme::SUCCESS
            } else {
                Theme::TEXT_MUTED
            };
            ui.label(RichText::new(scheduler_summary(status)).color(color));
        }
        Some(Err(e)) => {
            ui.label(RichText::new(e.to_string()).color(Theme::ERROR));
        }
    }

    ui.add_enabled_ui(!view.scheduler_pending, |ui| {
        if ui.button(format!("{} Refresh", Icons::REFRESH)).clicked() {
            *action = Some(StatusAction::RefreshScheduler);
        }
    });
}

fn uptime_label(started_at: Option<DateTime<Local>>, now: DateTime<Local>) -> String {
    let Some(started_at) = started_at else {
        return "-".to_string();
    };
    let secs = (now - started_at).num_seconds().max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{}h {:02}m {:02}s", hours, minutes, seconds)
    } else {
        format!("{}m {:02}s", minutes, seconds)
    }
}

fn scheduler_summary(status: &SchedulerStatus) -> String {
    if !status.is_running() {
        return "Daily download is not scheduled".to_string();
    }
    match status.next_run_time() {
        Some(next) => format!("Next download: {}", next.format("%a %d %b %Y, %H:%M")),
        None => match status.next_run.as_deref() {
            Some(raw) => format!("Next download: {}", raw),
            None => "Daily download scheduled".to_string(),
        },
    }
}
