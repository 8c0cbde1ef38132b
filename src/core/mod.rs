//! Core module - backend launch, readiness, lifecycle and monitoring

pub mod error;
pub mod launch;
pub mod monitor;
mod output;
pub mod readiness;
pub mod settings;
pub mod shutdown;
mod supervisor;

pub use error::SupervisorError;
pub use launch::{resolve_launch_spec, LaunchRoots, LaunchSpec, RunMode};
pub use monitor::{BackendMonitor, BackendUsage};
pub use readiness::{HealthProbe, HttpHealthProbe, ReadinessPolicy, ReadinessProbeState};
pub use settings::{ShellSettings, ShellTheme};
pub use shutdown::{ShutdownReason, ShutdownSignals};
pub use supervisor::{
    BackendProcessHandle, BackendState, BackendSupervisor, ExitTrigger, SharedSupervisor,
};
