//! OS shutdown signals that stop the backend before the shell exits
//!
//! Every signal whose default action would kill the shell is caught here, so
//! the backend is terminated instead of being left behind without a parent.

use std::future::pending;
#[cfg(unix)]
use std::io;

use tracing::warn;

/// Which signal asked the shell to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// Ctrl-C / SIGINT
    Interrupt,
    /// SIGTERM from `kill`, logout or a service manager
    Terminate,
    /// SIGHUP from a closed terminal
    Hangup,
}

impl ShutdownReason {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Interrupt => "SIGINT",
            Self::Terminate => "SIGTERM",
            Self::Hangup => "SIGHUP",
        }
    }

    /// Conventional `128 + signal number` exit code
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Interrupt => 130,
            Self::Terminate => 143,
            Self::Hangup => 129,
        }
    }
}

/// Installed signal listeners
///
/// Listeners are registered in [`ShutdownSignals::install`], so a signal
/// arriving before the first `recv` is not lost.
pub struct ShutdownSignals {
    #[cfg(unix)]
    interrupt: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    terminate: Option<tokio::signal::unix::Signal>,
    #[cfg(unix)]
    hangup: Option<tokio::signal::unix::Signal>,
}

#[cfg(unix)]
impl ShutdownSignals {
    /// Register the listeners. Must be called inside a tokio runtime
    ///
    /// A listener that cannot be registered is logged and never fires.
    pub fn install() -> Self {
        use tokio::signal::unix::{signal, SignalKind};

        Self {
            interrupt: listener(ShutdownReason::Interrupt, signal(SignalKind::interrupt())),
            terminate: listener(ShutdownReason::Terminate, signal(SignalKind::terminate())),
            hangup: listener(ShutdownReason::Hangup, signal(SignalKind::hangup())),
        }
    }

    /// Resolves on the next shutdown signal
    pub async fn recv(&mut self) -> ShutdownReason {
        tokio::select! {
            _ = next(&mut self.interrupt) => ShutdownReason::Interrupt,
            _ = next(&mut self.terminate) => ShutdownReason::Terminate,
            _ = next(&mut self.hangup) => ShutdownReason::Hangup,
        }
    }
}

#[cfg(not(unix))]
impl ShutdownSignals {
    pub fn install() -> Self {
        Self {}
    }

    pub async fn recv(&mut self) -> ShutdownReason {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            pending::<()>().await;
        }
        ShutdownReason::Interrupt
    }
}

#[cfg(unix)]
fn listener(
    reason: ShutdownReason,
    result: io::Result<tokio::signal::unix::Signal>,
) -> Option<tokio::signal::unix::Signal> {
    match result {
        Ok(signal) => Some(signal),
        Err(e) => {
            warn!("Failed to install {} handler: {}", reason.label(), e);
            None
        }
    }
}

#[cfg(unix)]
async fn next(signal: &mut Option<tokio::signal::unix::Signal>) {
    match signal {
        Some(signal) => {
            if signal.recv().await.is_none() {
                pending::<()>().await;
            }
        }
        None => pending::<()>().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_signal_numbers() {
        assert_eq!(ShutdownReason::Interrupt.exit_code(), 130);
        assert_eq!(ShutdownReason::Terminate.exit_code(), 143);
        assert_eq!(ShutdownReason::Hangup.exit_code(), 129);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn sigterm_stops_the_backend() {
        use std::path::PathBuf;
        use std::time::Duration;

        use crate::core::{
            BackendState, BackendSupervisor, ExitTrigger, LaunchSpec, RunMode, SharedSupervisor,
        };

        let dir = tempfile::tempdir().unwrap();
        let spec = LaunchSpec {
            run_mode: RunMode::Production,
            command: PathBuf::from("sleep"),
            args: vec!["300".to_string()],
            working_directory: dir.path().to_path_buf(),
            artifact: PathBuf::from("sleep"),
        };
        let mut supervisor = BackendSupervisor::new(RunMode::Production);
        supervisor.launch(&spec).unwrap();
        let shared = SharedSupervisor::new(supervisor);

        let mut signals = ShutdownSignals::install();
        let watcher = {
            let shared = shared.clone();
            tokio::spawn(async move {
                let reason = signals.recv().await;
                shared.terminate(ExitTrigger::Signal);
                shared.reap(Duration::from_secs(5)).await;
                reason
            })
        };

        let status = std::process::Command::new("kill")
            .args(["-TERM", &std::process::id().to_string()])
            .status()
            .unwrap();
        assert!(status.success());

        let reason = tokio::time::timeout(Duration::from_secs(10), watcher)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(reason, ShutdownReason::Terminate);
        assert_eq!(shared.state(), BackendState::Terminated);
        assert!(!shared.check_process());
        let exit = shared.snapshot().and_then(|h| h.exit_status).unwrap();
        assert!(!exit.success());
    }
}
