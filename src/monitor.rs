use crate::collectors::{self, MetricCollector};
use crate::history::HistoryBuffer;
use crate::metrics::Metrics;
use crate::snapshot::{DetectionFacts, DetectionInfo, Snapshot};
use chrono::Local;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{error, info};

pub const DEFAULT_HISTORY_LIMIT: usize = 50;

/// Owns the bound collector and the lock-guarded history, and runs
/// the poll loop. One instance per process; the API layer holds an
/// `Arc` and only ever reads.
///
/// The collector's blocking CPU sampling window runs on the blocking
/// thread pool and never under the history lock; the lock is held
/// only for the copy-in of an already-built snapshot or the copy-out
/// of a read, so readers always see complete snapshots.
pub struct Monitor {
    collector: Arc<Mutex<Box<dyn MetricCollector>>>,
    detection: DetectionInfo,
    history: RwLock<HistoryBuffer>,
    interval: Duration,
    metrics: Arc<Metrics>,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
}

impl Monitor {
    pub fn new(
        collector: Box<dyn MetricCollector>,
        facts: DetectionFacts,
        interval: Duration,
        history_size: usize,
        metrics: Arc<Metrics>,
    ) -> Arc<Self> {
        let detection = DetectionInfo {
            detected_system: facts,
            monitor_variant: collector.name().to_string(),
            supported_systems: collectors::supported_systems(),
        };
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            collector: Arc::new(Mutex::new(collector)),
            detection,
            history: RwLock::new(HistoryBuffer::new(history_size)),
            interval,
            metrics,
            running: AtomicBool::new(false),
            shutdown_tx,
        })
    }

    /// Idle → Running. Returns `None` when the loop is already
    /// active.
    pub fn start(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        if self.running.swap(true, Ordering::SeqCst) {
            return None;
        }
        self.shutdown_tx.send_replace(false);
        info!(
            collector = %self.detection.monitor_variant,
            interval_secs = self.interval.as_secs(),
            "starting system monitoring"
        );
        let monitor = Arc::clone(self);
        Some(tokio::spawn(async move { monitor.run_loop().await }))
    }

    /// Running → Idle. The flag is observed at the top of each
    /// iteration, so at most one in-flight cycle completes after the
    /// request.
    pub fn stop(&self) {
        info!("stopping system monitoring");
        self.shutdown_tx.send_replace(true);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    async fn run_loop(&self) {
        let mut shutdown = self.shutdown_tx.subscribe();
        loop {
            if *shutdown.borrow() {
                break;
            }
            self.poll_once().await;
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        break;
                    }
                }
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        self.running.store(false, Ordering::SeqCst);
        info!("system monitoring stopped");
    }

    async fn poll_once(&self) {
        let collector = Arc::clone(&self.collector);
        let result = tokio::task::spawn_blocking(move || {
            let mut guard = collector
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            guard.all()
        })
        .await;

        match result {
            Ok(mut snapshot) => {
                snapshot.timestamp = Local::now().to_rfc3339();
                snapshot.system_detection = self.detection.detected_system.clone();
                let history_len = {
                    let mut history = self.history.write().await;
                    history.publish(snapshot);
                    history.len()
                };
                self.metrics.record_poll_success(history_len);
            }
            Err(err) => {
                self.metrics.inc_collect_error("collector");
                error!(error = %err, "metric collection failed, skipping this cycle");
            }
        }
    }

    pub async fn current_status(&self) -> Snapshot {
        self.history.read().await.current()
    }

    pub async fn history_data(&self, limit: usize) -> Vec<Snapshot> {
        self.history.read().await.recent(limit)
    }

    pub fn detection_info(&self) -> DetectionInfo {
        self.detection.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{
        CpuInfo, DiskInfo, LoadInfo, MemoryInfo, NetworkInfo, PartitionUsage, ProcessInfo,
    };
    use std::sync::atomic::AtomicUsize;

    struct StubCollector {
        cycles: Arc<AtomicUsize>,
        collect_delay: Duration,
        memory_fails: bool,
    }

    impl StubCollector {
        fn new(cycles: Arc<AtomicUsize>) -> Self {
            Self {
                cycles,
                collect_delay: Duration::ZERO,
                memory_fails: false,
            }
        }
    }

    impl MetricCollector for StubCollector {
        fn name(&self) -> &'static str {
            "StubCollector"
        }

        fn cpu(&mut self) -> CpuInfo {
            self.cycles.fetch_add(1, Ordering::SeqCst);
            std::thread::sleep(self.collect_delay);
            CpuInfo {
                percent: 42.0,
                count_logical: 4,
                ..CpuInfo::default()
            }
        }

        fn memory(&mut self) -> MemoryInfo {
            if self.memory_fails {
                // contained failure: the contract substitutes defaults
                return MemoryInfo::default();
            }
            let mut info = MemoryInfo::default();
            info.virtual_memory.total = 1024;
            info.virtual_memory.used = 512;
            info.virtual_memory.percent = 50.0;
            info
        }

        fn disk(&mut self) -> DiskInfo {
            DiskInfo {
                partitions: vec![PartitionUsage {
                    mountpoint: "/".to_string(),
                    total: 100,
                    used: 40,
                    percent: 40.0,
                    ..PartitionUsage::default()
                }],
                ..DiskInfo::default()
            }
        }

        fn network(&mut self) -> NetworkInfo {
            NetworkInfo::default()
        }

        fn processes(&mut self) -> ProcessInfo {
            ProcessInfo {
                count: 3,
                ..ProcessInfo::default()
            }
        }

        fn load(&mut self) -> LoadInfo {
            LoadInfo::default()
        }
    }

    fn test_monitor(collector: StubCollector, interval: Duration) -> Arc<Monitor> {
        Monitor::new(
            Box::new(collector),
            DetectionFacts::default(),
            interval,
            10,
            Metrics::new().expect("metrics init"),
        )
    }

    #[tokio::test]
    async fn facade_is_empty_before_first_poll() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let monitor = test_monitor(StubCollector::new(cycles), Duration::from_secs(5));

        let current = monitor.current_status().await;
        assert!(current.timestamp.is_empty());
        assert!(monitor.history_data(50).await.is_empty());
        assert!(!monitor.is_running());
    }

    #[tokio::test]
    async fn detection_info_names_variant_and_registry() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let monitor = test_monitor(StubCollector::new(cycles), Duration::from_secs(5));

        let info = monitor.detection_info();
        assert_eq!(info.monitor_variant, "StubCollector");
        assert_eq!(info.supported_systems.len(), 7);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn polling_publishes_timestamped_snapshots() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let monitor = test_monitor(
            StubCollector::new(Arc::clone(&cycles)),
            Duration::from_millis(10),
        );

        let handle = monitor.start().expect("first start");
        assert!(monitor.start().is_none(), "second start while running");

        while cycles.load(Ordering::SeqCst) < 3 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        monitor.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits after stop")
            .expect("loop task");

        let current = monitor.current_status().await;
        assert!(!current.timestamp.is_empty());
        assert_eq!(current.cpu.percent, 42.0);
        assert!(!monitor.history_data(50).await.is_empty());
        assert!(!monitor.is_running());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn one_failing_submetric_leaves_the_rest_populated() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let mut stub = StubCollector::new(Arc::clone(&cycles));
        stub.memory_fails = true;
        let monitor = test_monitor(stub, Duration::from_millis(10));

        let handle = monitor.start().expect("start");
        while cycles.load(Ordering::SeqCst) < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        monitor.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits")
            .expect("loop task");

        let current = monitor.current_status().await;
        assert_eq!(current.memory.virtual_memory.total, 0);
        assert_eq!(current.cpu.percent, 42.0);
        assert_eq!(current.processes.count, 3);
        assert_eq!(current.disk.partitions.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn stop_lets_in_flight_cycle_finish_then_exits() {
        let cycles = Arc::new(AtomicUsize::new(0));
        let mut stub = StubCollector::new(Arc::clone(&cycles));
        stub.collect_delay = Duration::from_millis(100);
        let monitor = test_monitor(stub, Duration::from_secs(60));

        let handle = monitor.start().expect("start");
        while cycles.load(Ordering::SeqCst) < 1 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        // first cycle is now in flight
        monitor.stop();
        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("loop exits after in-flight cycle")
            .expect("loop task");

        assert_eq!(monitor.history_data(50).await.len(), 1);
        assert_eq!(cycles.load(Ordering::SeqCst), 1, "no cycle after stop");
        assert!(!monitor.is_running());
    }
}
