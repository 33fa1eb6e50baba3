// ============================================================
// Experiment tracker
// ============================================================
// Records what a training run was configured with and how it went:
// the full hyperparameter map at run start, scalar metrics as
// (value, step) points during the run, and start/end timestamps.
// Each run is identified by a timestamp-derived name and persisted
// as a single JSON file under runs/ when it finishes.
//
// Tracking is opt-in per run. In disabled mode every call is a
// no-op and nothing touches the filesystem, so scripts can carry
// tracker calls unconditionally.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    collections::BTreeMap,
    fs,
    path::PathBuf,
};

/// Whether a run is recorded at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingMode {
    Enabled,
    Disabled,
}

impl TrackingMode {
    pub fn from_flag(tracking: bool) -> Self {
        if tracking {
            TrackingMode::Enabled
        } else {
            TrackingMode::Disabled
        }
    }
}

/// How a run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Active,
    Completed,
    Failed,
}

/// One metric data point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricPoint {
    pub value: f64,
    pub step: usize,
}

/// Everything recorded about one run; this is the JSON on disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_name: String,
    pub project: String,
    pub status: RunStatus,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, Vec<MetricPoint>>,
    pub started_at: String,
    pub ended_at: Option<String>,
}

/// Handle the scripts log through. Owns the in-memory record while
/// the run is active and persists it once on finish.
pub struct RunTracker {
    mode: TrackingMode,
    dir: PathBuf,
    run: RunRecord,
}

impl RunTracker {
    /// Start a run. `config` is serialised into the flat parameter
    /// map — every field of the script's argument struct ends up
    /// recorded as a string, the way tracking services store them.
    pub fn init<C: Serialize>(
        mode: TrackingMode,
        dir: impl Into<PathBuf>,
        project: &str,
        run_name: &str,
        config: &C,
    ) -> Result<Self> {
        let dir = dir.into();

        let params = if mode == TrackingMode::Enabled {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Cannot create runs directory '{}'", dir.display()))?;
            flatten_params(config)?
        } else {
            BTreeMap::new()
        };

        let run = RunRecord {
            run_name: run_name.to_string(),
            project: project.to_string(),
            status: RunStatus::Active,
            params,
            metrics: BTreeMap::new(),
            started_at: chrono::Local::now().to_rfc3339(),
            ended_at: None,
        };

        if mode == TrackingMode::Enabled {
            tracing::info!("Tracking run '{}' for project '{}'", run_name, project);
        } else {
            tracing::info!("Tracking disabled for this run");
        }

        Ok(Self { mode, dir, run })
    }

    pub fn run_name(&self) -> &str {
        &self.run.run_name
    }

    /// Append one metric point. No-op when disabled.
    pub fn log_metric(&mut self, key: &str, value: f64, step: usize) {
        if self.mode == TrackingMode::Disabled {
            return;
        }
        self.run
            .metrics
            .entry(key.to_string())
            .or_default()
            .push(MetricPoint { value, step });
    }

    /// Stamp the end time and persist the run as one JSON file.
    pub fn finish(mut self, status: RunStatus) -> Result<()> {
        if self.mode == TrackingMode::Disabled {
            return Ok(());
        }
        self.run.status = status;
        self.run.ended_at = Some(chrono::Local::now().to_rfc3339());

        let path = self.dir.join(format!("{}.json", self.run.run_name));
        fs::write(&path, serde_json::to_string_pretty(&self.run)?)
            .with_context(|| format!("Cannot write run record '{}'", path.display()))?;

        tracing::info!("Run record written to '{}'", path.display());
        Ok(())
    }
}

/// Timestamp-derived run name, e.g. "2026-08-07_14-02-33".
pub fn generate_run_name() -> String {
    chrono::Local::now().format("%Y-%m-%d_%H-%M-%S").to_string()
}

/// Serialise a config struct into a flat string map.
fn flatten_params<C: Serialize>(config: &C) -> Result<BTreeMap<String, String>> {
    let value = serde_json::to_value(config).context("Config is not serialisable")?;
    let mut params = BTreeMap::new();
    if let serde_json::Value::Object(map) = value {
        for (key, value) in map {
            let rendered = match value {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            params.insert(key, rendered);
        }
    }
    Ok(params)
}
