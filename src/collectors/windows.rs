use crate::collectors::{self, MetricCollector};
use crate::snapshot::{CpuInfo, DiskInfo, LoadInfo, MemoryInfo, NetworkInfo, ProcessInfo};
use std::time::Duration;
use sysinfo::{System, SystemExt};

/// Windows variant. There is no load-average concept, so `load`
/// reports an instantaneous CPU reading instead; the blocking
/// sampling window already ran inside `cpu()` this cycle.
pub struct WindowsCollector {
    system: System,
    cpu_sample: Duration,
}

impl WindowsCollector {
    pub fn new(cpu_sample: Duration) -> Self {
        Self {
            system: System::new(),
            cpu_sample,
        }
    }
}

impl MetricCollector for WindowsCollector {
    fn name(&self) -> &'static str {
        "WindowsCollector"
    }

    fn cpu(&mut self) -> CpuInfo {
        collectors::sample_cpu(&mut self.system, self.cpu_sample)
    }

    fn memory(&mut self) -> MemoryInfo {
        collectors::collect_memory(&mut self.system)
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
        LoadInfo {
            load_avg: None,
            uptime_seconds: None,
            cpu_usage: Some(collectors::instant_cpu_percent(&mut self.system)),
        }
    }
}
