//! Host metrics for the status payload

use sysinfo::{CpuRefreshKind, Disks, RefreshKind, System};

use sc_protocol::NodeMetrics;

/// Disks fuller than this (percent) are reported
const DISK_USAGE_THRESHOLD: f64 = 75.0;

/// Samples CPU, load and disk usage.
///
/// CPU usage is computed between two refreshes, so the first sample after
/// construction reads as fully idle.
pub struct HostMetrics {
    system: System,
}

impl HostMetrics {
    pub fn new() -> Self {
        Self {
            system: System::new_with_specifics(
                RefreshKind::new().with_cpu(CpuRefreshKind::new().with_cpu_usage()),
            ),
        }
    }

    /// Take a sample
    pub fn collect(&mut self) -> NodeMetrics {
        self.system.refresh_cpu_usage();
        let cpu_idle = (100.0 - self.system.global_cpu_usage()).clamp(0.0, 100.0);

        let disks = Disks::new_with_refreshed_list();
        let disks_75 = disks
            .list()
            .iter()
            .filter(|disk| usage_percent(disk.total_space(), disk.available_space()) > DISK_USAGE_THRESHOLD)
            .map(|disk| disk.mount_point().display().to_string())
            .collect();

        NodeMetrics {
            disks_75,
            cpu_idle,
            load_1: System::load_average().one,
        }
    }
}

impl Default for HostMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn usage_percent(total: u64, available: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let used = total.saturating_sub(available);
    used as f64 * 100.0 / total as f64
}
