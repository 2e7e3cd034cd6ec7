use crate::collectors::{self, MetricCollector};
use crate::snapshot::{CpuInfo, DiskInfo, DiskIo, LoadInfo, MemoryInfo, NetworkInfo, ProcessInfo};
use std::time::Duration;
use sysinfo::{System, SystemExt};
use tracing::warn;

const SECTOR_SIZE: u64 = 512;
const PAGE_SIZE: u64 = 4096;

/// Linux variant. Serves as the fallback for unknown platforms, and
/// augments the shared sysinfo readings with direct procfs sources:
/// /proc/cpuinfo facts, /proc/meminfo page accounting, /proc/vmstat
/// swap traffic, /proc/diskstats IO counters and /proc/uptime.
pub struct LinuxCollector {
    system: System,
    cpu_sample: Duration,
}

impl LinuxCollector {
    pub fn new(cpu_sample: Duration) -> Self {
        Self {
            system: System::new(),
            cpu_sample,
        }
    }
}

impl MetricCollector for LinuxCollector {
    fn name(&self) -> &'static str {
        "LinuxCollector"
    }

    fn cpu(&mut self) -> CpuInfo {
        let mut info = collectors::sample_cpu(&mut self.system, self.cpu_sample);

        let facts = match std::fs::read_to_string("/proc/cpuinfo") {
            Ok(content) => parse_cpu_facts(&content),
            Err(err) => {
                warn!(error = %err, "failed to read /proc/cpuinfo");
                CpuFacts::default()
            }
        };
        info.model = facts.model_name.or(info.model).or_else(unknown);
        info.vendor = facts.vendor_id.or(info.vendor).or_else(unknown);
        if info.count_physical == 0 {
            info.count_physical = facts.cores as usize;
        }
        if info.count_logical == 0 {
            info.count_logical = facts.threads as usize;
        }

        info.temperature = collectors::sensor_temperatures(&mut self.system);
        info
    }

    fn memory(&mut self) -> MemoryInfo {
        let mut info = collectors::collect_memory(&mut self.system);

        match std::fs::read_to_string("/proc/meminfo") {
            Ok(content) => {
                let extra = parse_meminfo_extras(&content);
                info.virtual_memory.active = extra.active;
                info.virtual_memory.inactive = extra.inactive;
                info.virtual_memory.buffers = extra.buffers;
                info.virtual_memory.cached = extra.cached;
            }
            Err(err) => warn!(error = %err, "failed to read /proc/meminfo"),
        }

        match std::fs::read_to_string("/proc/vmstat") {
            Ok(content) => {
                let (sin, sout) = parse_vmstat_swap(&content);
                info.swap.sin = sin;
                info.swap.sout = sout;
            }
            Err(err) => warn!(error = %err, "failed to read /proc/vmstat"),
        }

        info
    }

    fn disk(&mut self) -> DiskInfo {
        let mut info = collectors::collect_disk(&mut self.system);
        info.io = match std::fs::read_to_string("/proc/diskstats") {
            Ok(content) => Some(parse_diskstats(&content)),
            Err(err) => {
                warn!(error = %err, "failed to read /proc/diskstats");
                None
            }
        };
        info
    }

    fn network(&mut self) -> NetworkInfo {
        collectors::collect_network(&mut self.system)
    }

    fn processes(&mut self) -> ProcessInfo {
        collectors::collect_processes(&mut self.system)
    }

    fn load(&mut self) -> LoadInfo {
        let mut info = collectors::collect_load(&mut self.system);
        match std::fs::read_to_string("/proc/uptime") {
            Ok(content) => {
                if let Some(seconds) = parse_uptime_seconds(&content) {
                    info.uptime_seconds = Some(seconds);
                }
            }
            Err(err) => warn!(error = %err, "failed to read /proc/uptime"),
        }
        info
    }
}

fn unknown() -> Option<String> {
    Some("Unknown".to_string())
}

#[derive(Debug, Default)]
struct CpuFacts {
    model_name: Option<String>,
    vendor_id: Option<String>,
    cores: u32,
    threads: u32,
}

#[derive(Debug, Default)]
struct MeminfoExtras {
    active: u64,
    inactive: u64,
    buffers: u64,
    cached: u64,
}

fn parse_cpu_facts(content: &str) -> CpuFacts {
    let mut facts = CpuFacts::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let value = value.trim();
        match key {
            "model name" if facts.model_name.is_none() && !value.is_empty() => {
                facts.model_name = Some(value.to_string());
            }
            "vendor_id" if facts.vendor_id.is_none() && !value.is_empty() => {
                facts.vendor_id = Some(value.to_string());
            }
            "cpu cores" if facts.cores == 0 => {
                facts.cores = value.parse().unwrap_or(0);
            }
            "siblings" if facts.threads == 0 => {
                facts.threads = value.parse().unwrap_or(0);
            }
            _ => {}
        }
    }
    facts
}

fn parse_meminfo_extras(content: &str) -> MeminfoExtras {
    let mut extras = MeminfoExtras::default();
    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let kb: u64 = value
            .trim()
            .trim_end_matches("kB")
            .trim()
            .parse()
            .unwrap_or(0);
        match key.trim() {
            "Active" => extras.active = kb * 1024,
            "Inactive" => extras.inactive = kb * 1024,
            "Buffers" => extras.buffers = kb * 1024,
            "Cached" => extras.cached = kb * 1024,
            _ => {}
        }
    }
    extras
}

fn parse_vmstat_swap(content: &str) -> (u64, u64) {
    let mut sin = 0;
    let mut sout = 0;
    for line in content.lines() {
        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some("pswpin"), Some(v)) => sin = v.parse::<u64>().unwrap_or(0) * PAGE_SIZE,
            (Some("pswpout"), Some(v)) => sout = v.parse::<u64>().unwrap_or(0) * PAGE_SIZE,
            _ => {}
        }
    }
    (sin, sout)
}

/// Sums whole-device rows of /proc/diskstats. Partition rows (sdX1,
/// nvmeXnYpZ) and loop/ram pseudo-devices are skipped so the totals
/// are not double-counted.
fn parse_diskstats(content: &str) -> DiskIo {
    let mut io = DiskIo::default();
    for line in content.lines() {
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 10 {
            continue;
        }
        let name = fields[2];
        if !is_whole_disk(name) {
            continue;
        }
        io.read_count += fields[3].parse::<u64>().unwrap_or(0);
        io.read_bytes += fields[5].parse::<u64>().unwrap_or(0) * SECTOR_SIZE;
        io.write_count += fields[7].parse::<u64>().unwrap_or(0);
        io.write_bytes += fields[9].parse::<u64>().unwrap_or(0) * SECTOR_SIZE;
    }
    io
}

fn is_whole_disk(name: &str) -> bool {
    if name.starts_with("loop") || name.starts_with("ram") || name.starts_with("zram") {
        return false;
    }
    if name.starts_with("nvme") || name.starts_with("mmcblk") {
        // nvme0n1 is the disk, nvme0n1p1 a partition
        return !name
            .rsplit_once('p')
            .map(|(_, tail)| tail.chars().all(|c| c.is_ascii_digit()) && !tail.is_empty())
            .unwrap_or(false);
    }
    !name.ends_with(|c: char| c.is_ascii_digit())
}

fn parse_uptime_seconds(content: &str) -> Option<f64> {
    content.split_whitespace().next()?.parse().ok()
}
