pub mod linux;
pub mod macos;
pub mod windows;

use crate::snapshot::{
    CpuFrequency, CpuInfo, DetectionFacts, DiskInfo, InterfaceAddress, LoadAverages, LoadInfo,
    MemoryInfo, NetworkInfo, NetworkIo, PartitionUsage, ProcessInfo, ProcessSummary, Snapshot,
    SwapMemory, VirtualMemory,
};
use chrono::{Local, TimeZone};
use std::collections::HashMap;
use std::time::Duration;
use sysinfo::{
    ComponentExt, CpuExt, DiskExt, NetworkExt, NetworksExt, PidExt, Process, ProcessExt,
    ProcessStatus, System, SystemExt, User, UserExt,
};
use tracing::debug;

pub use linux::LinuxCollector;
pub use macos::MacosCollector;
pub use windows::WindowsCollector;

const TOP_PROCESSES: usize = 5;
const BYTES_PER_MB: f64 = 1_048_576.0;

/// Uniform capability contract every OS collector satisfies.
///
/// Every operation is best-effort: a failing OS source is logged as a
/// warning inside the implementation and replaced with an empty or
/// zero default. Nothing here returns an error, so no single
/// sub-metric can take down a poll cycle.
pub trait MetricCollector: Send {
    fn name(&self) -> &'static str;
    fn cpu(&mut self) -> CpuInfo;
    fn memory(&mut self) -> MemoryInfo;
    fn disk(&mut self) -> DiskInfo;
    fn network(&mut self) -> NetworkInfo;
    fn processes(&mut self) -> ProcessInfo;
    fn load(&mut self) -> LoadInfo;

    /// Fixed fan-out over the six sub-metrics. Variants may override
    /// to post-process the composed body (macOS does, for its
    /// main-disk percent).
    fn all(&mut self) -> Snapshot {
        Snapshot {
            cpu: self.cpu(),
            memory: self.memory(),
            disk: self.disk(),
            network: self.network(),
            processes: self.processes(),
            load: self.load(),
            ..Snapshot::default()
        }
    }
}

const SUPPORTED_SYSTEMS: [&str; 7] = [
    "linux", "ubuntu", "centos", "debian", "fedora", "macos", "windows",
];

pub fn supported_systems() -> Vec<String> {
    SUPPORTED_SYSTEMS.iter().map(|s| s.to_string()).collect()
}

/// Resolves the host to one of the supported system types. On Linux
/// the distribution is disambiguated via /etc/os-release, falling
/// back to plain "linux" when the file is unreadable or matches no
/// known distro.
pub fn detect_system_type() -> String {
    match std::env::consts::OS {
        "linux" => match std::fs::read_to_string("/etc/os-release") {
            Ok(content) => linux_distro_from_release(&content).to_string(),
            Err(_) => "linux".to_string(),
        },
        "macos" => "macos".to_string(),
        "windows" => "windows".to_string(),
        _ => "unknown".to_string(),
    }
}

fn linux_distro_from_release(content: &str) -> &'static str {
    let lower = content.to_lowercase();
    if lower.contains("ubuntu") {
        "ubuntu"
    } else if lower.contains("centos") {
        "centos"
    } else if lower.contains("debian") {
        "debian"
    } else if lower.contains("fedora") {
        "fedora"
    } else {
        "linux"
    }
}

/// Static host-identity facts, captured once at startup.
pub fn detect_facts() -> DetectionFacts {
    let system = System::new();
    let os_name = system.name().unwrap_or_else(|| "unknown".to_string());
    let platform = system.long_os_version().unwrap_or_else(|| os_name.clone());
    DetectionFacts {
        system: std::env::consts::OS.to_string(),
        platform,
        machine: std::env::consts::ARCH.to_string(),
        architecture: if cfg!(target_pointer_width = "64") {
            "64bit".to_string()
        } else {
            "32bit".to_string()
        },
        os_version: system.os_version(),
        kernel_version: system.kernel_version(),
        hostname: system.host_name(),
    }
}

/// Binds one collector variant for the process lifetime. Unknown or
/// unsupported types resolve to the Linux variant by policy.
pub fn bind(system_type: &str, cpu_sample: Duration) -> Box<dyn MetricCollector> {
    match system_type {
        "macos" => Box::new(MacosCollector::new(cpu_sample)),
        "windows" => Box::new(WindowsCollector::new(cpu_sample)),
        "linux" | "ubuntu" | "centos" | "debian" | "fedora" => {
            Box::new(LinuxCollector::new(cpu_sample))
        }
        other => {
            debug!(
                system_type = other,
                "unrecognized system type, using linux collector"
            );
            Box::new(LinuxCollector::new(cpu_sample))
        }
    }
}

/// Overall and per-core CPU utilization over a blocking sampling
/// window. Two refreshes are needed for a meaningful delta; the
/// process table is refreshed on the same window so per-process CPU
/// deltas ride along.
pub(crate) fn sample_cpu(system: &mut System, window: Duration) -> CpuInfo {
    system.refresh_cpu();
    system.refresh_processes();
    std::thread::sleep(window);
    system.refresh_cpu();

    let cpus = system.cpus();
    let per_cpu: Vec<f64> = cpus.iter().map(|c| c.cpu_usage() as f64).collect();
    let percent = if per_cpu.is_empty() {
        0.0
    } else {
        per_cpu.iter().sum::<f64>() / per_cpu.len() as f64
    };

    let frequency = cpus
        .first()
        .map(|c| c.frequency())
        .filter(|f| *f > 0)
        .map(|current| CpuFrequency {
            current,
            min: 0,
            max: 0,
        });
    let model = cpus
        .first()
        .map(|c| c.brand().trim().to_string())
        .filter(|s| !s.is_empty());
    let vendor = cpus
        .first()
        .map(|c| c.vendor_id().trim().to_string())
        .filter(|s| !s.is_empty());

    CpuInfo {
        percent,
        count_logical: cpus.len(),
        count_physical: system.physical_core_count().unwrap_or(0),
        per_cpu,
        frequency,
        model,
        vendor,
        temperature: HashMap::new(),
    }
}

/// Instantaneous (non-blocking) overall CPU percent, for the second
/// reading within the same poll cycle.
pub(crate) fn instant_cpu_percent(system: &mut System) -> f64 {
    system.refresh_cpu();
    let cpus = system.cpus();
    if cpus.is_empty() {
        return 0.0;
    }
    cpus.iter().map(|c| c.cpu_usage() as f64).sum::<f64>() / cpus.len() as f64
}

pub(crate) fn sensor_temperatures(system: &mut System) -> HashMap<String, f64> {
    system.refresh_components_list();
    system.refresh_components();
    system
        .components()
        .iter()
        .filter(|c| c.temperature() > 0.0)
        .map(|c| (c.label().to_string(), c.temperature() as f64))
        .collect()
}

/// Virtual and swap memory exactly as the OS reports them. The
/// active/inactive/buffers/cached and swap-in/out fields stay zero
/// here; the Linux variant fills them from procfs.
pub(crate) fn collect_memory(system: &mut System) -> MemoryInfo {
    system.refresh_memory();

    let total = system.total_memory();
    let used = system.used_memory();
    let swap_total = system.total_swap();
    let swap_used = system.used_swap();

    MemoryInfo {
        virtual_memory: VirtualMemory {
            total,
            available: system.available_memory(),
            used,
            free: system.free_memory(),
            percent: ratio_percent(used, total),
            active: 0,
            inactive: 0,
            buffers: 0,
            cached: 0,
        },
        swap: SwapMemory {
            total: swap_total,
            used: swap_used,
            free: system.free_swap(),
            percent: ratio_percent(swap_used, swap_total),
            sin: 0,
            sout: 0,
        },
    }
}

pub(crate) fn collect_disk(system: &mut System) -> DiskInfo {
    system.refresh_disks_list();
    system.refresh_disks();

    let partitions = system
        .disks()
        .iter()
        .map(|d| {
            let total = d.total_space();
            let free = d.available_space();
            let used = total.saturating_sub(free);
            PartitionUsage {
                device: d.name().to_string_lossy().to_string(),
                mountpoint: d.mount_point().to_string_lossy().to_string(),
                fstype: String::from_utf8_lossy(d.file_system()).to_string(),
                total,
                used,
                free,
                percent: ratio_percent(used, total),
            }
        })
        .collect();

    DiskInfo {
        partitions,
        io: None,
        percent: None,
    }
}

pub(crate) fn collect_network(system: &mut System) -> NetworkInfo {
    system.refresh_networks_list();
    system.refresh_networks();

    let mut interfaces: HashMap<String, Vec<InterfaceAddress>> = HashMap::new();
    let mut io = NetworkIo::default();
    for (name, data) in system.networks().iter() {
        let mut addresses = Vec::new();
        let mac = data.mac_address();
        if !mac.is_unspecified() {
            addresses.push(InterfaceAddress {
                family: "mac".to_string(),
                address: mac.to_string(),
                netmask: None,
                broadcast: None,
            });
        }
        interfaces.insert(name.clone(), addresses);

        io.bytes_recv = io.bytes_recv.saturating_add(data.total_received());
        io.bytes_sent = io.bytes_sent.saturating_add(data.total_transmitted());
        io.packets_recv = io
            .packets_recv
            .saturating_add(data.total_packets_received());
        io.packets_sent = io
            .packets_sent
            .saturating_add(data.total_packets_transmitted());
    }

    let io = if interfaces.is_empty() { None } else { Some(io) };
    NetworkInfo { interfaces, io }
}

/// Enumerates live processes and ranks them. Relies on the process
/// refresh done inside the CPU sampling window for usable CPU deltas.
pub(crate) fn collect_processes(system: &mut System) -> ProcessInfo {
    system.refresh_users_list();
    system.refresh_processes();

    let total_memory = system.total_memory();
    let users = system.users();
    let candidates: Vec<Option<ProcessSummary>> = system
        .processes()
        .values()
        .map(|p| summarize_process(p, total_memory, users))
        .collect();

    summarize_processes(candidates)
}

/// One process summary, or `None` when the entry raced with process
/// exit (zombie or dead by the time it was inspected).
fn summarize_process(
    process: &Process,
    total_memory: u64,
    users: &[User],
) -> Option<ProcessSummary> {
    match process.status() {
        ProcessStatus::Zombie | ProcessStatus::Dead => return None,
        _ => {}
    }

    let memory = process.memory();
    let username = process
        .user_id()
        .and_then(|uid| users.iter().find(|u| u.id() == uid))
        .map(|u| u.name().to_string())
        .unwrap_or_else(|| "N/A".to_string());

    Some(ProcessSummary {
        pid: process.pid().as_u32(),
        name: process.name().to_string(),
        cpu_percent: process.cpu_usage() as f64,
        memory_percent: ratio_percent(memory, total_memory),
        memory_mb: memory as f64 / BYTES_PER_MB,
        create_time: format_create_time(process.start_time()),
        status: process.status().to_string(),
        username,
    })
}

pub(crate) fn summarize_processes(candidates: Vec<Option<ProcessSummary>>) -> ProcessInfo {
    let processes: Vec<ProcessSummary> = candidates.into_iter().flatten().collect();
    ProcessInfo {
        count: processes.len(),
        top_cpu: rank_top(&processes, |p| p.cpu_percent),
        top_memory: rank_top(&processes, |p| p.memory_percent),
    }
}

/// Top entries by descending key; `sort_by` is stable, so ties keep
/// enumeration order.
fn rank_top<F>(processes: &[ProcessSummary], key: F) -> Vec<ProcessSummary>
where
    F: Fn(&ProcessSummary) -> f64,
{
    let mut ranked = processes.to_vec();
    ranked.sort_by(|a, b| {
        key(b)
            .partial_cmp(&key(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked.truncate(TOP_PROCESSES);
    ranked
}

pub(crate) fn collect_load(system: &mut System) -> LoadInfo {
    let avg = system.load_average();
    LoadInfo {
        load_avg: Some(LoadAverages {
            one: avg.one,
            five: avg.five,
            fifteen: avg.fifteen,
        }),
        uptime_seconds: Some(system.uptime() as f64),
        cpu_usage: None,
    }
}

pub(crate) fn format_create_time(start_unix: u64) -> String {
    if start_unix == 0 {
        return "N/A".to_string();
    }
    match Local.timestamp_opt(start_unix as i64, 0).single() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => "N/A".to_string(),
    }
}

pub(crate) fn ratio_percent(used: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (used as f64 / total as f64) * 100.0
    }
}
