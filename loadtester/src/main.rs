//! Load Tester
//!
//! Drives a node of the KV cluster with a mixed read/write workload whose
//! keys are local in time, and quantifies the inconsistency the cluster's
//! replication settings induce: every response feeds a stale-read detector,
//! and the run ends with a `results.csv` + `summary.json` pair in the output
//! directory.

mod client;
mod generator;
mod stats;

use anyhow::Result;
use chrono::Utc;
use serde::Deserialize;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, mpsc};

use client::LoadTestClient;
use generator::{LocalInTimeKeyGenerator, Request, RequestGenerator, RequestKind};
use stats::{Collector, RequestRecord, StaleReadDetector};

/// Pause between generated requests, so the generator does not outrun the
/// workers by orders of magnitude.
const GENERATOR_PACING: Duration = Duration::from_millis(10);

/// Load test configuration, read from the `--config` JSON file.
#[derive(Debug, Deserialize)]
struct TestConfig {
    name: String,
    target_addr: String,
    /// 0.0 to 1.0; `write_ratio + read_ratio` must equal 1.
    write_ratio: f64,
    read_ratio: f64,
    num_keys: usize,
    key_cluster_size: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config_path: Option<String> = None;
    let mut output_dir = "results".to_string();
    let mut duration_secs: u64 = 60;
    let mut concurrency: usize = 10;

    let mut i = 1;
    while i < args.len() {
        let (flag, value, step) = match args[i].split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string()), 1),
            None => (args[i].clone(), args.get(i + 1).cloned(), 2),
        };
        match flag.as_str() {
            "--config" => {
                config_path = value;
                i += step;
            }
            "--output" => {
                if let Some(v) = value {
                    output_dir = v;
                }
                i += step;
            }
            "--duration" => {
                if let Some(v) = value {
                    duration_secs = v.trim_end_matches('s').parse()?;
                }
                i += step;
            }
            "--concurrency" => {
                if let Some(v) = value {
                    concurrency = v.parse()?;
                }
                i += step;
            }
            _ => {
                i += 1;
            }
        }
    }

    let Some(config_path) = config_path else {
        eprintln!("--config is required");
        eprintln!(
            "Usage: {} --config <json> [--output <dir>] [--duration <secs>] [--concurrency <n>]",
            args[0]
        );
        std::process::exit(1);
    };

    let config: TestConfig = serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;
    if (config.write_ratio + config.read_ratio - 1.0).abs() > 1e-9 {
        anyhow::bail!(
            "write_ratio + read_ratio must equal 1.0 (got {} + {})",
            config.write_ratio,
            config.read_ratio
        );
    }

    std::fs::create_dir_all(&output_dir)?;

    tracing::info!("Starting load test:");
    tracing::info!("  Configuration: {}", config.name);
    tracing::info!("  Duration: {}s", duration_secs);
    tracing::info!("  Concurrency: {} workers", concurrency);
    tracing::info!(
        "  Write ratio: {:.1}%, Read ratio: {:.1}%",
        config.write_ratio * 100.0,
        config.read_ratio * 100.0
    );
    tracing::info!("  Target: {}", config.target_addr);

    let collector = Arc::new(Collector::new());
    let detector = Arc::new(StaleReadDetector::new());
    let http_client = Arc::new(LoadTestClient::new());
    let config = Arc::new(config);

    let deadline = Instant::now() + Duration::from_secs(duration_secs);

    // Request generation runs in a single task; workers share the receiving
    // end of the channel.
    let (request_tx, request_rx) = mpsc::channel::<Request>(concurrency * 10);
    let request_rx = Arc::new(Mutex::new(request_rx));

    let generator_handle = {
        let config = config.clone();
        tokio::spawn(async move {
            let key_gen = LocalInTimeKeyGenerator::new(config.num_keys, config.key_cluster_size);
            let mut req_gen = RequestGenerator::new(key_gen, config.write_ratio);

            while Instant::now() < deadline {
                if request_tx.send(req_gen.generate()).await.is_err() {
                    break;
                }
                tokio::time::sleep(GENERATOR_PACING).await;
            }
        })
    };

    let mut worker_handles = Vec::with_capacity(concurrency);
    for _ in 0..concurrency {
        let request_rx = request_rx.clone();
        let config = config.clone();
        let http_client = http_client.clone();
        let collector = collector.clone();
        let detector = detector.clone();

        worker_handles.push(tokio::spawn(async move {
            loop {
                let request = { request_rx.lock().await.recv().await };
                let Some(request) = request else {
                    break;
                };
                if Instant::now() >= deadline {
                    break;
                }

                process_request(request, &config, &http_client, &collector, &detector).await;
            }
        }));
    }

    generator_handle.await?;
    for handle in worker_handles {
        handle.await?;
    }

    tracing::info!("Exporting results...");
    export_results(&output_dir, &config, &collector).await?;

    tracing::info!("Load test complete!");
    tracing::info!("Results saved to: {}", output_dir);

    Ok(())
}

async fn process_request(
    request: Request,
    config: &TestConfig,
    http_client: &LoadTestClient,
    collector: &Collector,
    detector: &StaleReadDetector,
) {
    let timestamp = Utc::now();
    let started = Instant::now();

    let mut success = false;
    let mut is_stale = false;
    let mut version = 0;
    let mut error = String::new();

    match request.kind {
        RequestKind::Write => {
            match http_client
                .write(&config.target_addr, &request.key, &request.value)
                .await
            {
                Ok(response) => {
                    success = true;
                    version = response.version;
                    detector.observe_write(&request.key, response.version);
                }
                Err(e) => error = e.to_string(),
            }
        }
        RequestKind::Read => {
            match http_client.read(&config.target_addr, &request.key).await {
                Ok(Some(response)) => {
                    success = true;
                    version = response.version;
                    is_stale = detector.observe_read(&request.key, response.version);
                }
                Ok(None) => {
                    // A miss on a key with an acknowledged write means some
                    // node is still inside the replication window.
                    is_stale = detector.has_acknowledged_write(&request.key);
                    error = "key not found".to_string();
                }
                Err(e) => error = e.to_string(),
            }
        }
    }

    collector
        .record(RequestRecord {
            timestamp,
            kind: request.kind.as_str().to_string(),
            key: request.key,
            latency: started.elapsed(),
            success,
            is_stale,
            version,
            error,
        })
        .await;
}

async fn export_results(output_dir: &str, config: &TestConfig, collector: &Collector) -> Result<()> {
    let mut csv_file = std::fs::File::create(format!("{}/results.csv", output_dir))?;
    writeln!(
        csv_file,
        "timestamp,type,key,latency_ms,success,is_stale,version"
    )?;
    for record in collector.records().await {
        writeln!(
            csv_file,
            "{},{},{},{:.2},{},{},{}",
            record.timestamp.to_rfc3339(),
            record.kind,
            record.key,
            record.latency.as_secs_f64() * 1000.0,
            record.success,
            record.is_stale,
            record.version
        )?;
    }

    let summary = collector.summary(&config.name).await;
    std::fs::write(
        format!("{}/summary.json", output_dir),
        serde_json::to_string_pretty(&summary)?,
    )?;

    Ok(())
}
