//! Backend resource monitoring - CPU and memory of the backend process

use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System};
use tracing::trace;

/// Point-in-time resource usage of the backend
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BackendUsage {
    pub cpu_percent: f32,
    pub memory_bytes: u64,
}

/// Samples one process at most once per interval
pub struct BackendMonitor {
    system: System,
    last_update: Option<Instant>,
    update_interval: Duration,
}

impl BackendMonitor {
    pub fn new(update_interval: Duration) -> Self {
        Self {
            system: System::new(),
            last_update: None,
            update_interval,
        }
    }

    /// Current usage of `pid`, or `None` once the process is gone
    pub fn sample(&mut self, pid: u32) -> Option<BackendUsage> {
        let pid = Pid::from_u32(pid);
        let now = Instant::now();
        let due = self
            .last_update
            .map_or(true, |last| now.duration_since(last) >= self.update_interval);

        if due {
            self.system.refresh_processes_specifics(
                ProcessesToUpdate::Some(&[pid]),
                true,
                ProcessRefreshKind::new().with_cpu().with_memory(),
            );
            self.last_update = Some(now);
            trace!("Backend monitor refreshed");
        }

        let process = self.system.process(pid)?;
        Some(BackendUsage {
            cpu_percent: process.cpu_usage(),
            memory_bytes: process.memory(),
        })
    }
}

/// Human-readable byte count
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64 / 1024.0;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", value, UNITS[unit])
}
