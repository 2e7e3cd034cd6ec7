use prometheus::core::Collector;
use prometheus::{opts, Counter, CounterVec, Encoder, Gauge, Registry, TextEncoder};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone)]
pub struct Metrics {
    registry: Registry,
    pub monitor_poll_cycles_total: Counter,
    pub monitor_collect_errors_total: CounterVec,
    pub monitor_last_collect_timestamp_seconds: Gauge,
    pub monitor_history_entries: Gauge,
    pub monitor_scrape_count_total: Counter,
}

impl Metrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let monitor_poll_cycles_total = Counter::with_opts(opts!(
            "monitor_poll_cycles_total",
            "Completed metric poll cycles"
        ))?;
        let monitor_collect_errors_total = CounterVec::new(
            opts!(
                "monitor_collect_errors_total",
                "Poll cycles skipped due to a collector failure"
            ),
            &["reason"],
        )?;
        let monitor_last_collect_timestamp_seconds = Gauge::with_opts(opts!(
            "monitor_last_collect_timestamp_seconds",
            "Unix timestamp of the last successful poll"
        ))?;
        let monitor_history_entries = Gauge::with_opts(opts!(
            "monitor_history_entries",
            "Snapshots currently retained in the history buffer"
        ))?;
        let monitor_scrape_count_total = Counter::with_opts(opts!(
            "monitor_scrape_count_total",
            "Requests served on the /metrics endpoint"
        ))?;

        register(&registry, &monitor_poll_cycles_total)?;
        register(&registry, &monitor_collect_errors_total)?;
        register(&registry, &monitor_last_collect_timestamp_seconds)?;
        register(&registry, &monitor_history_entries)?;
        register(&registry, &monitor_scrape_count_total)?;

        Ok(Arc::new(Self {
            registry,
            monitor_poll_cycles_total,
            monitor_collect_errors_total,
            monitor_last_collect_timestamp_seconds,
            monitor_history_entries,
            monitor_scrape_count_total,
        }))
    }

    pub fn record_poll_success(&self, history_len: usize) {
        self.monitor_poll_cycles_total.inc();
        self.monitor_last_collect_timestamp_seconds
            .set(now_unix() as f64);
        self.monitor_history_entries.set(history_len as f64);
    }

    pub fn inc_collect_error(&self, reason: &str) {
        self.monitor_collect_errors_total
            .with_label_values(&[reason])
            .inc();
    }

    pub fn inc_scrape_count(&self) {
        self.monitor_scrape_count_total.inc();
    }

    pub fn encode_metrics(&self) -> Result<Vec<u8>, prometheus::Error> {
        let mut buf = Vec::new();
        let encoder = TextEncoder::new();
        let mf = self.registry.gather();
        encoder.encode(&mf, &mut buf)?;
        Ok(buf)
    }
}

fn register<T: Collector + Clone + 'static>(
    registry: &Registry,
    collector: &T,
) -> Result<(), prometheus::Error> {
    registry.register(Box::new(collector.clone()))
}

fn now_unix() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposition_contains_poll_counters() {
        let metrics = Metrics::new().expect("metrics init");
        metrics.record_poll_success(42);
        metrics.inc_collect_error("join");

        let encoded = metrics.encode_metrics().expect("encode");
        let text = String::from_utf8(encoded).expect("utf8");
        assert!(text.contains("monitor_poll_cycles_total 1"));
        assert!(text.contains("monitor_history_entries 42"));
        assert!(text.contains("monitor_collect_errors_total"));
    }
}
