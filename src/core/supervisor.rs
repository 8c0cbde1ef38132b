//! Backend supervisor - starts, health-checks and stops the one backend process

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex, TryLockError};
use std::time::Duration;

use chrono::{DateTime, Local};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use super::error::SupervisorError;
use super::launch::{resolve_launch_spec, LaunchRoots, LaunchSpec, RunMode};
use super::output;
use super::readiness::{wait_for_ready, HealthProbe, ReadinessPolicy};

/// Lifecycle of the backend within one shell session
///
/// Only ever moves forward:
/// `NotStarted -> Starting -> {Ready | Failed} -> Terminated`, with
/// `NotStarted -> Failed` when the launch itself fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BackendState {
    #[default]
    NotStarted,
    Starting,
    Ready,
    Failed,
    Terminated,
}

impl BackendState {
    fn rank(&self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::Starting => 1,
            Self::Ready | Self::Failed => 2,
            Self::Terminated => 3,
        }
    }

    /// Whether `next` is a legal forward step from this state
    pub fn can_advance_to(&self, next: BackendState) -> bool {
        use BackendState::*;
        match (self, next) {
            (Terminated, _) => false,
            (_, Terminated) => true,
            (NotStarted, Starting) | (NotStarted, Failed) => true,
            (Starting, Ready) | (Starting, Failed) => true,
            _ => false,
        }
    }

    /// The UI may only render against a ready backend
    pub fn allows_ui(&self) -> bool {
        matches!(self, Self::Ready)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::NotStarted => "not started",
            Self::Starting => "starting",
            Self::Ready => "ready",
            Self::Failed => "failed",
            Self::Terminated => "terminated",
        }
    }
}

/// What made the shell tear the backend down
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitTrigger {
    Quit,
    WindowClosed,
    Signal,
    Panic,
    StartupFailure,
    Dropped,
}

impl ExitTrigger {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::WindowClosed => "window closed",
            Self::Signal => "signal",
            Self::Panic => "panic",
            Self::StartupFailure => "startup failure",
            Self::Dropped => "supervisor dropped",
        }
    }
}

/// Everything known about the backend process
#[derive(Debug, Clone)]
pub struct BackendProcessHandle {
    pub pid: Option<u32>,
    pub run_mode: RunMode,
    /// Entry script or bundled executable the backend runs from
    pub executable_path: PathBuf,
    pub working_directory: PathBuf,
    pub started_at: Option<DateTime<Local>>,
    pub exit_status: Option<ExitStatus>,
    state: BackendState,
}

impl BackendProcessHandle {
    fn new(run_mode: RunMode) -> Self {
        Self {
            pid: None,
            run_mode,
            executable_path: PathBuf::new(),
            working_directory: PathBuf::new(),
            started_at: None,
            exit_status: None,
            state: BackendState::NotStarted,
        }
    }

    pub fn state(&self) -> BackendState {
        self.state
    }

    fn advance(&mut self, next: BackendState) -> bool {
        if !self.state.can_advance_to(next) {
            warn!(
                "Ignoring backend state change {} -> {}",
                self.state.label(),
                next.label()
            );
            return false;
        }
        debug_assert!(next.rank() > self.state.rank());
        debug!("Backend {} -> {}", self.state.label(), next.label());
        self.state = next;
        true
    }
}

/// Owner of the backend child process
///
/// One per shell. The child is spawned with `kill_on_drop`, and dropping the
/// supervisor terminates it, so no exit path can leave an orphan behind.
pub struct BackendSupervisor {
    handle: BackendProcessHandle,
    child: Option<Child>,
    forwarders: Vec<JoinHandle<usize>>,
    kill_signals: u32,
}

impl BackendSupervisor {
    pub fn new(run_mode: RunMode) -> Self {
        Self {
            handle: BackendProcessHandle::new(run_mode),
            child: None,
            forwarders: Vec::new(),
            kill_signals: 0,
        }
    }

    pub fn handle(&self) -> &BackendProcessHandle {
        &self.handle
    }

    pub fn state(&self) -> BackendState {
        self.handle.state
    }

    /// Number of kill signals sent to the backend so far
    pub fn kill_signals(&self) -> u32 {
        self.kill_signals
    }

    /// Resolve, launch and wait for the backend
    ///
    /// The only route from `NotStarted` to `Ready`. On error the handle is
    /// left `Failed`; a child that was spawned is still running until
    /// [`terminate`](Self::terminate) is called.
    pub async fn start<P: HealthProbe>(
        &mut self,
        roots: &LaunchRoots,
        probe: &P,
        policy: &ReadinessPolicy,
    ) -> Result<(), SupervisorError> {
        if self.handle.state != BackendState::NotStarted {
            return Err(SupervisorError::InvalidState {
                operation: "start",
                state: self.handle.state,
            });
        }

        let spec = match resolve_launch_spec(self.handle.run_mode, roots) {
            Ok(spec) => spec,
            Err(e) => {
                self.handle.advance(BackendState::Failed);
                return Err(e);
            }
        };

        self.launch(&spec)?;
        self.await_ready(probe, policy).await
    }

    /// Spawn the backend described by `spec`
    ///
    /// Must run inside the tokio runtime: both output pipes get a forwarding
    /// task. Process creation is attempted exactly once.
    pub fn launch(&mut self, spec: &LaunchSpec) -> Result<&BackendProcessHandle, SupervisorError> {
        if self.handle.state != BackendState::NotStarted {
            return Err(SupervisorError::InvalidState {
                operation: "launch",
                state: self.handle.state,
            });
        }

        info!(
            "Starting backend: {} {:?} (cwd {})",
            spec.command.display(),
            spec.args,
            spec.working_directory.display()
        );

        self.handle.run_mode = spec.run_mode;
        self.handle.executable_path = spec.artifact.clone();
        self.handle.working_directory = spec.working_directory.clone();

        let mut cmd = Command::new(&spec.command);
        cmd.args(&spec.args)
            .current_dir(&spec.working_directory)
            // Line-by-line output instead of block-buffered pipes
            .env("PYTHONUNBUFFERED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(windows)]
        cmd.creation_flags(crate::platform::CREATE_NO_WINDOW);

        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                error!("Failed to start backend: {}", source);
                self.handle.advance(BackendState::Failed);
                return Err(SupervisorError::Spawn {
                    command: spec.command.clone(),
                    source,
                });
            }
        };

        self.handle.pid = child.id();
        self.handle.started_at = Some(Local::now());
        self.forwarders = output::spawn_forwarders(&mut child);
        self.child = Some(child);
        self.handle.advance(BackendState::Starting);

        info!("Backend spawned with PID {:?}", self.handle.pid);
        Ok(&self.handle)
    }

    /// Poll the health endpoint until the backend answers or the budget runs out
    ///
    /// Dropping the returned future abandons the in-flight probe.
    pub async fn await_ready<P: HealthProbe>(
        &mut self,
        probe: &P,
        policy: &ReadinessPolicy,
    ) -> Result<(), SupervisorError> {
        match self.handle.state {
            BackendState::Starting => {}
            BackendState::Ready => return Ok(()),
            state => {
                return Err(SupervisorError::InvalidState {
                    operation: "wait for",
                    state,
                })
            }
        }

        match wait_for_ready(probe, policy).await {
            Ok(_) => {
                self.handle.advance(BackendState::Ready);
                Ok(())
            }
            Err(e) => {
                error!("{}", e);
                self.handle.advance(BackendState::Failed);
                Err(e)
            }
        }
    }

    /// Stop the backend and mark the handle terminated
    ///
    /// Idempotent. Sends one kill signal if a backend process is still alive
    /// and does not wait for it to exit. Returns whether a signal was sent.
    pub fn terminate(&mut self, trigger: ExitTrigger) -> bool {
        if self.handle.state == BackendState::Terminated {
            trace!("Backend already terminated ({})", trigger.label());
            return false;
        }

        let mut signalled = false;
        let mut exited = None;
        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(Some(status)) => exited = Some(status),
                Ok(None) | Err(_) => {
                    info!(
                        "Stopping backend (PID {:?}) on {}",
                        self.handle.pid,
                        trigger.label()
                    );
                    match child.start_kill() {
                        Ok(()) => {
                            signalled = true;
                            self.kill_signals += 1;
                        }
                        Err(e) => warn!("Failed to kill backend process: {}", e),
                    }
                }
            }
        }
        if let Some(status) = exited {
            self.record_exit(status);
        }

        // Forwarders finish on their own once the pipes close
        self.forwarders.clear();
        self.handle.advance(BackendState::Terminated);
        signalled
    }

    /// Check for a backend exit without blocking. Returns true while it runs
    pub fn check_process(&mut self) -> bool {
        if self.handle.exit_status.is_some() {
            return false;
        }
        let Some(child) = self.child.as_mut() else {
            return false;
        };

        match child.try_wait() {
            Ok(Some(status)) => {
                self.record_exit(status);
                false
            }
            Ok(None) => true,
            Err(e) => {
                error!("Error checking backend status: {}", e);
                false
            }
        }
    }

    fn record_exit(&mut self, status: ExitStatus) {
        if self.handle.exit_status.is_none() {
            match status.code() {
                Some(code) => info!("Backend process exited with code {}", code),
                None => info!("Backend process exited ({})", status),
            }
            self.handle.exit_status = Some(status);
        }
    }
}

impl Drop for BackendSupervisor {
    fn drop(&mut self) {
        self.terminate(ExitTrigger::Dropped);
    }
}

/// Shared, lock-protected supervisor for the shell's exit paths
pub struct SharedSupervisor {
    inner: Arc<Mutex<BackendSupervisor>>,
}

impl SharedSupervisor {
    pub fn new(supervisor: BackendSupervisor) -> Self {
        Self {
            inner: Arc::new(Mutex::new(supervisor)),
        }
    }

    /// Copy of the current handle for display
    pub fn snapshot(&self) -> Option<BackendProcessHandle> {
        let supervisor = match self.inner.lock() {
            Ok(supervisor) => supervisor,
            Err(poisoned) => poisoned.into_inner(),
        };
        Some(supervisor.handle().clone())
    }

    pub fn state(&self) -> BackendState {
        match self.inner.lock() {
            Ok(supervisor) => supervisor.state(),
            Err(poisoned) => poisoned.into_inner().state(),
        }
    }

    /// Terminate, even through a poisoned lock
    pub fn terminate(&self, trigger: ExitTrigger) -> bool {
        match self.inner.lock() {
            Ok(mut supervisor) => supervisor.terminate(trigger),
            Err(poisoned) => poisoned.into_inner().terminate(trigger),
        }
    }

    /// Terminate unless the lock is held elsewhere (used from the panic hook)
    pub fn try_terminate(&self, trigger: ExitTrigger) -> bool {
        match self.inner.try_lock() {
            Ok(mut supervisor) => supervisor.terminate(trigger),
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner().terminate(trigger),
            Err(TryLockError::WouldBlock) => {
                warn!("Supervisor busy, relying on kill-on-drop for backend cleanup");
                false
            }
        }
    }

    pub fn check_process(&self) -> bool {
        match self.inner.lock() {
            Ok(mut supervisor) => supervisor.check_process(),
            Err(poisoned) => poisoned.into_inner().check_process(),
        }
    }

    /// Wait up to `limit` for the backend to exit so its exit code is logged
    pub async fn reap(&self, limit: Duration) -> Option<ExitStatus> {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            if !self.check_process() {
                return self.snapshot().and_then(|h| h.exit_status);
            }
            if tokio::time::Instant::now() >= deadline {
                warn!("Backend did not exit within {:?}", limit);
                return None;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}

impl Clone for SharedSupervisor {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
