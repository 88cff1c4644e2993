//! Per-request records, stale-read detection, and aggregate statistics.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;

/// One observed request, as it lands in `results.csv`.
#[derive(Debug, Clone)]
pub struct RequestRecord {
    pub timestamp: DateTime<Utc>,
    /// "write" or "read".
    pub kind: String,
    pub key: String,
    pub latency: Duration,
    pub success: bool,
    pub is_stale: bool,
    pub version: i64,
    pub error: String,
}

/// Tracks the highest version acknowledged per key and classifies reads.
///
/// A read is stale when its version is strictly below the high-water mark
/// for its key; a miss on a key with any acknowledged write is stale too,
/// since some reachable node already holds a newer binding.
pub struct StaleReadDetector {
    high_water: DashMap<String, i64>,
}

impl StaleReadDetector {
    pub fn new() -> Self {
        Self {
            high_water: DashMap::new(),
        }
    }

    /// Records an acknowledged write; the coordinator's version becomes the
    /// new high-water mark unconditionally.
    pub fn observe_write(&self, key: &str, version: i64) {
        self.high_water.insert(key.to_string(), version);
    }

    /// Classifies a successful read and advances the high-water mark.
    pub fn observe_read(&self, key: &str, version: i64) -> bool {
        match self.high_water.entry(key.to_string()) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                let stale = version < *entry.get();
                if version > *entry.get() {
                    entry.insert(version);
                }
                stale
            }
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(version);
                false
            }
        }
    }

    /// True if any write to this key has been acknowledged; a read miss on
    /// such a key is a stale observation.
    pub fn has_acknowledged_write(&self, key: &str) -> bool {
        self.high_water.contains_key(key)
    }
}

impl Default for StaleReadDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects request records for the duration of a run.
pub struct Collector {
    records: Mutex<Vec<RequestRecord>>,
}

impl Collector {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(Vec::new()),
        }
    }

    pub async fn record(&self, record: RequestRecord) {
        self.records.lock().await.push(record);
    }

    pub async fn records(&self) -> Vec<RequestRecord> {
        self.records.lock().await.clone()
    }

    /// Computes the aggregate summary over everything recorded so far.
    pub async fn summary(&self, config_name: &str) -> Summary {
        let records = self.records.lock().await;
        if records.is_empty() {
            return Summary {
                config: config_name.to_string(),
                ..Summary::default()
            };
        }

        let mut start_time = records[0].timestamp;
        let mut end_time = records[0].timestamp;
        let mut write_latencies = Vec::new();
        let mut read_latencies = Vec::new();
        let mut summary = Summary {
            config: config_name.to_string(),
            total_requests: records.len(),
            ..Summary::default()
        };

        for record in records.iter() {
            if record.timestamp < start_time {
                start_time = record.timestamp;
            }
            if record.timestamp > end_time {
                end_time = record.timestamp;
            }

            if record.success {
                summary.successful_requests += 1;
            } else {
                summary.failed_requests += 1;
            }

            let latency_ms = record.latency.as_secs_f64() * 1000.0;
            match record.kind.as_str() {
                "write" => {
                    summary.total_writes += 1;
                    if record.success {
                        write_latencies.push(latency_ms);
                    }
                }
                "read" => {
                    summary.total_reads += 1;
                    if record.success {
                        read_latencies.push(latency_ms);
                    }
                    if record.is_stale {
                        summary.stale_reads += 1;
                    }
                }
                _ => {}
            }
        }

        summary.write_latency = compute_latency_stats(&mut write_latencies);
        summary.read_latency = compute_latency_stats(&mut read_latencies);
        summary.start_time = start_time.to_rfc3339();
        summary.end_time = end_time.to_rfc3339();
        summary.duration = format!("{:?}", (end_time - start_time).to_std().unwrap_or_default());

        summary
    }
}

impl Default for Collector {
    fn default() -> Self {
        Self::new()
    }
}

/// Aggregate results exported as `summary.json`.
#[derive(Debug, Default, Serialize)]
pub struct Summary {
    pub config: String,
    pub total_requests: usize,
    pub total_writes: usize,
    pub total_reads: usize,
    pub successful_requests: usize,
    pub failed_requests: usize,
    pub stale_reads: usize,
    pub write_latency: LatencyStats,
    pub read_latency: LatencyStats,
    pub start_time: String,
    pub end_time: String,
    pub duration: String,
}

/// Latency quantiles in milliseconds.
#[derive(Debug, Default, Serialize)]
pub struct LatencyStats {
    pub min_ms: f64,
    pub max_ms: f64,
    pub mean_ms: f64,
    pub median_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
    pub p999_ms: f64,
}

fn compute_latency_stats(latencies: &mut [f64]) -> LatencyStats {
    if latencies.is_empty() {
        return LatencyStats::default();
    }

    latencies.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let len = latencies.len();
    let sum: f64 = latencies.iter().sum();
    let percentile = |q: f64| latencies[((len as f64 * q) as usize).min(len - 1)];

    LatencyStats {
        min_ms: latencies[0],
        max_ms: latencies[len - 1],
        mean_ms: sum / len as f64,
        median_ms: latencies[len / 2],
        p50_ms: percentile(0.50),
        p95_ms: percentile(0.95),
        p99_ms: percentile(0.99),
        p999_ms: percentile(0.999),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(kind: &str, success: bool, stale: bool, latency_ms: u64) -> RequestRecord {
        RequestRecord {
            timestamp: Utc::now(),
            kind: kind.to_string(),
            key: "key_1".to_string(),
            latency: Duration::from_millis(latency_ms),
            success,
            is_stale: stale,
            version: 1,
            error: String::new(),
        }
    }

    #[test]
    fn test_detector_fresh_then_stale() {
        let detector = StaleReadDetector::new();

        detector.observe_write("key_1", 3);

        // Odczyt ze starsza wersja -> stale
        assert!(detector.observe_read("key_1", 2));
        // Odczyt z aktualna wersja -> fresh
        assert!(!detector.observe_read("key_1", 3));
        // Nowsza wersja podnosi znacznik
        assert!(!detector.observe_read("key_1", 5));
        assert!(detector.observe_read("key_1", 4));
    }

    #[test]
    fn test_detector_unknown_key_is_fresh() {
        let detector = StaleReadDetector::new();

        assert!(!detector.observe_read("key_9", 1));
        assert!(!detector.has_acknowledged_write("key_never"));
    }

    #[test]
    fn test_detector_miss_after_write_counts_as_known() {
        let detector = StaleReadDetector::new();

        detector.observe_write("key_1", 1);
        assert!(detector.has_acknowledged_write("key_1"));
    }

    #[tokio::test]
    async fn test_summary_counts() {
        let collector = Collector::new();

        collector.record(record("write", true, false, 300)).await;
        collector.record(record("write", false, false, 10)).await;
        collector.record(record("read", true, true, 5)).await;
        collector.record(record("read", true, false, 7)).await;

        let summary = collector.summary("test").await;

        assert_eq!(summary.total_requests, 4);
        assert_eq!(summary.total_writes, 2);
        assert_eq!(summary.total_reads, 2);
        assert_eq!(summary.successful_requests, 3);
        assert_eq!(summary.failed_requests, 1);
        assert_eq!(summary.stale_reads, 1);

        // Tylko udane zapisy licza sie do opoznien
        assert!((summary.write_latency.mean_ms - 300.0).abs() < 1.0);
        assert!(summary.read_latency.min_ms <= summary.read_latency.max_ms);
    }

    #[test]
    fn test_latency_percentiles_ordered() {
        let mut latencies: Vec<f64> = (1..=1000).map(|v| v as f64).collect();
        let stats = compute_latency_stats(&mut latencies);

        assert_eq!(stats.min_ms, 1.0);
        assert_eq!(stats.max_ms, 1000.0);
        assert!(stats.p50_ms <= stats.p95_ms);
        assert!(stats.p95_ms <= stats.p99_ms);
        assert!(stats.p99_ms <= stats.p999_ms);
        assert!(stats.p999_ms <= stats.max_ms);
    }

    #[test]
    fn test_latency_stats_empty() {
        let stats = compute_latency_stats(&mut []);
        assert_eq!(stats.min_ms, 0.0);
        assert_eq!(stats.max_ms, 0.0);
    }
}
