use crate::collectors::{self, MetricCollector};
use crate::snapshot::{CpuInfo, DiskInfo, LoadInfo, MemoryInfo, NetworkInfo, ProcessInfo, Snapshot};
use std::time::Duration;
use sysinfo::{System, SystemExt};

/// macOS variant. The OS-native "used" memory figure counts
/// reclaimable pages and reads misleadingly high, so `used` is
/// recomputed as `total - available` and the percent follows the
/// corrected value. This is a deliberate deviation, not a bug.
pub struct MacosCollector {
    system: System,
    cpu_sample: Duration,
}

impl MacosCollector {
    pub fn new(cpu_sample: Duration) -> Self {
        Self {
            system: System::new(),
            cpu_sample,
        }
    }
}

impl MetricCollector for MacosCollector {
    fn name(&self) -> &'static str {
        "MacosCollector"
    }

    fn cpu(&mut self) -> CpuInfo {
        collectors::sample_cpu(&mut self.system, self.cpu_sample)
    }

    fn memory(&mut self) -> MemoryInfo {
        let mut info = collectors::collect_memory(&mut self.system);
        let total = info.virtual_memory.total;
        let corrected_used = total.saturating_sub(info.virtual_memory.available);
        info.virtual_memory.used = corrected_used;
        info.virtual_memory.percent = collectors::ratio_percent(corrected_used, total);
        info
    }

    fn disk(&mut self) -> DiskInfo {
        collectors::collect_disk(&mut self.system)
    }

    fn network(&mut self) -> NetworkInfo {
        collectors::collect_network(&mut self.system)
    }

    fn processes(&mut self) -> ProcessInfo {
        collectors::collect_processes(&mut self.system)
    }

    fn load(&mut self) -> LoadInfo {
        collectors::collect_load(&mut self.system)
    }

    /// Same fan-out as the default, plus a main-disk usage percent
    /// derived from the partition with the largest total size.
    fn all(&mut self) -> Snapshot {
        let mut snapshot = Snapshot {
            cpu: self.cpu(),
            memory: self.memory(),
            disk: self.disk(),
            network: self.network(),
            processes: self.processes(),
            load: self.load(),
            ..Snapshot::default()
        };
        snapshot.disk.percent = snapshot
            .disk
            .partitions
            .iter()
            .max_by_key(|p| p.total)
            .map(|p| p.percent);
        snapshot
    }
}
