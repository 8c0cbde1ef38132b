//! Main shell window

use std::time::{Duration, Instant};

use egui::{CentralPanel, Context, TopBottomPanel};
use tokio::runtime::Handle;
use tracing::{error, info, warn};

use super::panels::status::{self, StatusAction, StatusView};
use super::request::RequestSlot;
use super::theme::Theme;
use crate::api::types::BackendInfo;
use crate::api::{ApiError, BackendClient, SchedulerStatus};
use crate::core::{
    BackendMonitor, BackendProcessHandle, BackendUsage, ExitTrigger, SharedSupervisor,
    ShellSettings,
};
use crate::{APP_NAME, APP_VERSION};

/// Notification message
#[derive(Debug, Clone)]
pub struct Notification {
    pub message: String,
    pub level: NotificationLevel,
    pub created_at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub enum NotificationLevel {
    Success,
    Warning,
    Error,
}

/// Window over a ready backend
pub struct ShellApp {
    supervisor: SharedSupervisor,
    client: BackendClient,
    runtime: Handle,
    monitor: BackendMonitor,
    handle: Option<BackendProcessHandle>,
    usage: Option<BackendUsage>,
    alive: bool,
    last_poll: Option<Instant>,
    poll_interval: Duration,
    connection: RequestSlot<Result<BackendInfo, ApiError>>,
    scheduler: RequestSlot<Result<SchedulerStatus, ApiError>>,
    notifications: Vec<Notification>,
    exit_reported: bool,
    first_frame: bool,
}

impl ShellApp {
    pub fn new(
        cc: &eframe::CreationContext<'_>,
        settings: &ShellSettings,
        supervisor: SharedSupervisor,
        client: BackendClient,
        runtime: Handle,
    ) -> Self {
        Theme::apply(&cc.egui_ctx, settings.theme);
        let poll_interval = Duration::from_millis(settings.monitor_interval_ms as u64);

        Self {
            handle: supervisor.snapshot(),
            supervisor,
            client,
            runtime,
            monitor: BackendMonitor::new(poll_interval),
            usage: None,
            alive: true,
            last_poll: None,
            poll_interval,
            connection: RequestSlot::new(),
            scheduler: RequestSlot::new(),
            notifications: Vec::new(),
            exit_reported: false,
            first_frame: true,
        }
    }

    pub fn notify(&mut self, message: impl Into<String>, level: NotificationLevel) {
        self.notifications.push(Notification {
            message: message.into(),
            level,
            created_at: Instant::now(),
        });
    }

    /// Refresh liveness, handle and usage once per interval
    fn poll_backend(&mut self) {
        let now = Instant::now();
        if self
            .last_poll
            .is_some_and(|last| now.duration_since(last) < self.poll_interval)
        {
            return;
        }
        self.last_poll = Some(now);

        self.alive = self.supervisor.check_process();
        self.handle = self.supervisor.snapshot();
        self.usage = match (&self.handle, self.alive) {
            (Some(handle), true) => handle.pid.and_then(|pid| self.monitor.sample(pid)),
            _ => None,
        };

        if !self.alive && !self.exit_reported {
            self.exit_reported = true;
            warn!("Backend is no longer running");
            self.notify(
                "Backend process exited. Restart HomeStock to continue.",
                NotificationLevel::Error,
            );
        }
    }

    fn poll_requests(&mut self) {
        if self.connection.poll() {
            let outcome = match self.connection.latest() {
                Some(Ok(_)) => Some(("Backend is responding".to_string(), NotificationLevel::Success)),
                Some(Err(e)) => Some((e.to_string(), NotificationLevel::Error)),
                None => None,
            };
            if let Some((message, level)) = outcome {
                self.notify(message, level);
            }
        }
        if self.scheduler.poll() {
            let failure = match self.scheduler.latest() {
                Some(Err(e)) => Some(e.to_string()),
                _ => None,
            };
            if let Some(message) = failure {
                warn!("Failed to fetch scheduler status: {}", message);
                self.notify(
                    format!("Scheduler status unavailable: {}", message),
                    NotificationLevel::Warning,
                );
            }
        }
    }

    fn handle_action(&mut self, ctx: &Context, action: StatusAction) {
        match action {
            StatusAction::CheckConnection => {
                let client = self.client.clone();
                self.connection
                    .spawn(&self.runtime, ctx, async move { client.test_connection().await });
            }
            StatusAction::RefreshScheduler => self.refresh_scheduler(ctx),
            StatusAction::OpenBackendFolder => {
                let Some(handle) = &self.handle else {
                    return;
                };
                if let Err(e) = open::that(&handle.working_directory) {
                    error!("Failed to open backend folder: {}", e);
                    self.notify(
                        format!("Failed to open folder: {}", e),
                        NotificationLevel::Error,
                    );
                }
            }
            StatusAction::Quit => ctx.send_viewport_cmd(egui::ViewportCommand::Close),
        }
    }

    fn refresh_scheduler(&mut self, ctx: &Context) {
        let client = self.client.clone();
        self.scheduler
            .spawn(&self.runtime, ctx, async move { client.scheduler_status().await });
    }

    fn cleanup_notifications(&mut self) {
        let timeout = Duration::from_secs(5);
        self.notifications
            .retain(|n| n.created_at.elapsed() < timeout);
    }

    fn render_top_bar(&self, ctx: &Context) {
        TopBottomPanel::top("top_bar")
            .exact_height(52.0)
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    ui.label(egui::RichText::new("◈").size(22.0).color(Theme::PRIMARY));
                    ui.label(egui::RichText::new(APP_NAME).size(18.0).strong());
                    ui.label(
                        egui::RichText::new(format!("v{}", APP_VERSION))
                            .size(12.0)
                            .color(Theme::TEXT_MUTED),
                    );
                });
            });
    }

    fn render_notifications(&self, ctx: &Context) {
        if self.notifications.is_empty() {
            return;
        }

        egui::Area::new(egui::Id::new("notifications"))
            .fixed_pos(egui::pos2(ctx.screen_rect().width() - 360.0, 70.0))
            .show(ctx, |ui| {
                for notification in &self.notifications {
                    let (icon, color) = match notification.level {
                        NotificationLevel::Success => ("✓", Theme::SUCCESS),
                        NotificationLevel::Warning => ("⚠", Theme::WARNING),
                        NotificationLevel::Error => ("✕", Theme::ERROR),
                    };

                    egui::Frame::none()
                        .fill(ui.visuals().window_fill)
                        .rounding(egui::Rounding::same(10.0))
                        .stroke(egui::Stroke::new(1.0, color.linear_multiply(0.5)))
                        .inner_margin(egui::Margin::same(14.0))
                        .show(ui, |ui| {
                            ui.set_width(320.0);
                            ui.horizontal(|ui| {
                                ui.label(egui::RichText::new(icon).size(14.0).color(color));
                                ui.add_space(8.0);
                                ui.label(egui::RichText::new(&notification.message).size(13.0));
                            });
                        });
                    ui.add_space(10.0);
                }
            });
    }
}

impl eframe::App for ShellApp {
    fn update(&mut self, ctx: &Context, _frame: &mut eframe::Frame) {
        if self.first_frame {
            self.first_frame = false;
            info!("First frame rendered");
            self.refresh_scheduler(ctx);
        }

        if ctx.input(|i| i.viewport().close_requested()) {
            info!("Window close requested");
            self.supervisor.terminate(ExitTrigger::WindowClosed);
        }

        // Torn down from elsewhere (signal handler); nothing left to show
        if !self.supervisor.state().allows_ui() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.poll_backend();
        self.poll_requests();
        self.cleanup_notifications();
        ctx.request_repaint_after(self.poll_interval.min(Duration::from_millis(500)));

        self.render_top_bar(ctx);

        let endpoint = self.client.base_url().to_string();
        let view = StatusView {
            state: self.supervisor.state(),
            handle: self.handle.as_ref(),
            alive: self.alive,
            usage: self.usage,
            endpoint: &endpoint,
            connection: self.connection.latest(),
            connection_pending: self.connection.is_pending(),
            scheduler: self.scheduler.latest(),
            scheduler_pending: self.scheduler.is_pending(),
        };
        let action = CentralPanel::default()
            .show(ctx, |ui| status::render(ui, &view))
            .inner;

        self.render_notifications(ctx);

        if let Some(action) = action {
            self.handle_action(ctx, action);
        }
    }

    fn on_exit(&mut self, _gl: Option<&eframe::glow::Context>) {
        self.supervisor.terminate(ExitTrigger::Quit);
        info!("Window closed");
    }
}
