//! HomeStock - desktop shell for the HomeStock market-data backend
//!
//! Starts the backend service as a child process, waits until it answers on
//! its health endpoint, shows the window, and stops the backend again on
//! every way out of the shell.

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]
#![allow(dead_code)] // Client and handle APIs are wider than what the window uses

mod api;
mod core;
mod platform;
mod ui;

use std::time::Duration;

use anyhow::{Context, Result};
use single_instance::SingleInstance;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api::BackendClient;
use crate::core::readiness::PROBE_TIMEOUT;
use crate::core::settings::MIN_WINDOW_SIZE;
use crate::core::{
    BackendSupervisor, ExitTrigger, HttpHealthProbe, ReadinessPolicy, RunMode, SharedSupervisor,
    ShellSettings, ShutdownReason, ShutdownSignals, SupervisorError,
};
use crate::ui::{dialogs, ShellApp};

/// Application name constant
pub const APP_NAME: &str = "HomeStock";

/// Application version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// How long to wait for the killed backend to be reaped on the way out
const REAP_TIMEOUT: Duration = Duration::from_secs(2);

enum Startup {
    Finished(Result<(), SupervisorError>),
    Interrupted(ShutdownReason),
}

fn main() -> Result<()> {
    let loaded = ShellSettings::load();
    init_logging(loaded.as_ref().is_ok_and(|s| s.debug_logging));

    info!("{} v{} starting...", APP_NAME, APP_VERSION);

    let settings = match loaded {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Using default settings: {:#}", e);
            ShellSettings::default()
        }
    };

    // The backend port is fixed, so two shells would fight over it
    let instance = SingleInstance::new(APP_NAME).context("Failed to create single instance lock")?;
    if !instance.is_single() {
        error!("Another instance of {} is already running!", APP_NAME);
        dialogs::show_already_running();
        return Ok(());
    }

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .thread_name("homestock-rt")
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    let backend_url = settings.backend_url();
    let client = BackendClient::new(&backend_url).context("Invalid backend address")?;
    let probe =
        HttpHealthProbe::new(backend_url, PROBE_TIMEOUT).context("Failed to create HTTP client")?;
    let policy = ReadinessPolicy::default();
    let roots = settings.launch_roots();

    let run_mode = RunMode::from_env();
    info!("Run mode: {}", run_mode.label());
    let mut supervisor = BackendSupervisor::new(run_mode);

    // Registered before the backend exists so no signal can slip past terminate
    let mut signals = {
        let _guard = runtime.enter();
        ShutdownSignals::install()
    };

    let startup = runtime.block_on(async {
        tokio::select! {
            result = supervisor.start(&roots, &probe, &policy) => Startup::Finished(result),
            reason = signals.recv() => Startup::Interrupted(reason),
        }
    });

    match startup {
        Startup::Finished(Ok(())) => {}
        Startup::Finished(Err(e)) => {
            let title = e.title();
            let err = anyhow::Error::new(e);
            error!("{}: {:#}", title, err);
            supervisor.terminate(ExitTrigger::StartupFailure);
            dialogs::show_startup_error(&format!("{:#}", err));
            return Err(err.context("Backend startup failed"));
        }
        Startup::Interrupted(reason) => {
            info!("{} received during startup", reason.label());
            supervisor.terminate(ExitTrigger::Signal);
            drop(supervisor);
            std::process::exit(reason.exit_code());
        }
    }

    let supervisor = SharedSupervisor::new(supervisor);
    install_panic_hook(supervisor.clone());

    let watcher = {
        let supervisor = supervisor.clone();
        runtime.spawn(async move {
            let reason = signals.recv().await;
            info!("{} received, shutting down", reason.label());
            supervisor.terminate(ExitTrigger::Signal);
            supervisor.reap(REAP_TIMEOUT).await;
            std::process::exit(reason.exit_code());
        })
    };

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(APP_NAME)
            .with_inner_size([settings.window_size.0, settings.window_size.1])
            .with_min_inner_size([MIN_WINDOW_SIZE.0, MIN_WINDOW_SIZE.1])
            .with_icon(load_app_icon()),
        ..Default::default()
    };

    info!("Backend ready, starting GUI...");
    let app_supervisor = supervisor.clone();
    let rt_handle = runtime.handle().clone();
    let ui_result = eframe::run_native(
        &format!("{} v{}", APP_NAME, APP_VERSION),
        native_options,
        Box::new(move |cc| {
            Ok(Box::new(ShellApp::new(
                cc,
                &settings,
                app_supervisor,
                client,
                rt_handle,
            )))
        }),
    );

    // No-op when the window already did it
    supervisor.terminate(ExitTrigger::Quit);
    runtime.block_on(supervisor.reap(REAP_TIMEOUT));
    watcher.abort();
    runtime.shutdown_timeout(Duration::from_secs(1));

    ui_result.map_err(|e| anyhow::anyhow!("Failed to run application: {}", e))?;

    info!("{} shutting down", APP_NAME);
    Ok(())
}

/// Initialize the logging system
fn init_logging(debug: bool) {
    let default_filter = if debug {
        "homestock=debug,eframe=warn,egui=warn,wgpu=error,reqwest=warn"
    } else {
        "homestock=info,eframe=warn,egui=warn,wgpu=error,reqwest=warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Stop the backend when the UI thread panics
///
/// Panics on runtime worker threads are contained by their task and only
/// logged here.
fn install_panic_hook(supervisor: SharedSupervisor) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        error!("Uncaught panic: {}", info);
        if std::thread::current().name() == Some("main") {
            supervisor.try_terminate(ExitTrigger::Panic);
        }
        default_hook(info);
    }));
}

/// Window icon: three rising bars on a teal tile
fn load_app_icon() -> egui::IconData {
    let size = 64usize;
    let mut rgba = vec![0u8; size * size * 4];
    let bars = [(12usize, 24usize, 40usize), (26, 38, 28), (40, 52, 14)];

    for y in 0..size {
        for x in 0..size {
            let idx = (y * size + x) * 4;
            let in_tile = (4..size - 4).contains(&x) && (4..size - 4).contains(&y);
            if !in_tile {
                continue;
            }

            let on_bar = bars
                .iter()
                .any(|&(left, right, top)| (left..right).contains(&x) && (top..size - 12).contains(&y));
            let pixel = if on_bar {
                [240, 253, 250, 255]
            } else {
                let t = y as f32 / size as f32;
                [13, (148.0 - t * 30.0) as u8, (136.0 - t * 26.0) as u8, 255]
            };
            rgba[idx..idx + 4].copy_from_slice(&pixel);
        }
    }

    egui::IconData {
        rgba,
        width: size as u32,
        height: size as u32,
    }
}
