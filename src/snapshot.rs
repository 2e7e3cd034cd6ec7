use std::collections::HashMap;

/// One complete best-effort metrics reading. Sub-structures left at
/// their defaults mean the source was unavailable, never that the
/// whole poll failed.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub cpu: CpuInfo,
    pub memory: MemoryInfo,
    pub disk: DiskInfo,
    pub network: NetworkInfo,
    pub processes: ProcessInfo,
    pub load: LoadInfo,
    pub system_detection: DetectionFacts,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CpuInfo {
    pub percent: f64,
    pub count_logical: usize,
    pub count_physical: usize,
    pub per_cpu: Vec<f64>,
    pub frequency: Option<CpuFrequency>,
    pub model: Option<String>,
    pub vendor: Option<String>,
    pub temperature: HashMap<String, f64>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct CpuFrequency {
    pub current: u64,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct MemoryInfo {
    #[serde(rename = "virtual")]
    pub virtual_memory: VirtualMemory,
    pub swap: SwapMemory,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct VirtualMemory {
    pub total: u64,
    pub available: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
    pub active: u64,
    pub inactive: u64,
    pub buffers: u64,
    pub cached: u64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct SwapMemory {
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
    pub sin: u64,
    pub sout: u64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DiskInfo {
    pub partitions: Vec<PartitionUsage>,
    pub io: Option<DiskIo>,
    /// Usage percent of the largest partition. Only the macOS
    /// collector derives this; elsewhere it stays `None`.
    pub percent: Option<f64>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct PartitionUsage {
    pub device: String,
    pub mountpoint: String,
    pub fstype: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub percent: f64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DiskIo {
    pub read_bytes: u64,
    pub write_bytes: u64,
    pub read_count: u64,
    pub write_count: u64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct NetworkInfo {
    pub interfaces: HashMap<String, Vec<InterfaceAddress>>,
    pub io: Option<NetworkIo>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct InterfaceAddress {
    pub family: String,
    pub address: String,
    pub netmask: Option<String>,
    pub broadcast: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct NetworkIo {
    pub bytes_sent: u64,
    pub bytes_recv: u64,
    pub packets_sent: u64,
    pub packets_recv: u64,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ProcessInfo {
    pub count: usize,
    pub top_cpu: Vec<ProcessSummary>,
    pub top_memory: Vec<ProcessSummary>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ProcessSummary {
    pub pid: u32,
    pub name: String,
    pub cpu_percent: f64,
    pub memory_percent: f64,
    pub memory_mb: f64,
    pub create_time: String,
    pub status: String,
    pub username: String,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LoadInfo {
    pub load_avg: Option<LoadAverages>,
    pub uptime_seconds: Option<f64>,
    /// Instantaneous CPU usage, reported where load averages do not
    /// exist (Windows).
    pub cpu_usage: Option<f64>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct LoadAverages {
    #[serde(rename = "1min")]
    pub one: f64,
    #[serde(rename = "5min")]
    pub five: f64,
    #[serde(rename = "15min")]
    pub fifteen: f64,
}

/// Static host-identity facts captured once at startup.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DetectionFacts {
    pub system: String,
    pub platform: String,
    pub machine: String,
    pub architecture: String,
    pub os_version: Option<String>,
    pub kernel_version: Option<String>,
    pub hostname: Option<String>,
}

#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct DetectionInfo {
    pub detected_system: DetectionFacts,
    pub monitor_variant: String,
    pub supported_systems: Vec<String>,
}
