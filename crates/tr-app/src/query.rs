//! Query helpers for stored runs.

use std::path::Path;
use tr_results::{RunManifest, RunStatus, RunStore, Sample, StoredRun};

use crate::error::AppResult;

/// Summary of a stored run's samples.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub status: RunStatus,
    pub sample_count: usize,
    /// Elapsed time of the last sample.
    pub last_elapsed_s: f64,
    /// Ticks without a temperature reading.
    pub absent_readings: usize,
    pub temperature_range: Option<(f64, f64)>,
    pub peak_set_voltage: Option<f64>,
    pub final_set_voltage: Option<f64>,
    pub transition_tick: Option<u64>,
}

/// Load a run's manifest and samples from its directory.
pub fn load_run(dir: &Path) -> AppResult<(RunManifest, Vec<Sample>)> {
    let store = RunStore::new(dir.parent().unwrap_or(dir));
    let manifest = store.load_manifest(dir)?;
    let samples = store.load_samples(dir)?;
    Ok((manifest, samples))
}

/// List stored runs under an output root, oldest first.
pub fn list_runs(output_root: &Path) -> AppResult<Vec<StoredRun>> {
    Ok(RunStore::new(output_root).list_runs()?)
}

pub fn get_run_summary(manifest: &RunManifest, samples: &[Sample]) -> RunSummary {
    let temperatures: Vec<f64> = samples.iter().filter_map(|s| s.temperature).collect();
    let temperature_range = if temperatures.is_empty() {
        None
    } else {
        let min = temperatures.iter().copied().fold(f64::INFINITY, f64::min);
        let max = temperatures.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        Some((min, max))
    };

    RunSummary {
        status: manifest.status,
        sample_count: samples.len(),
        last_elapsed_s: samples.last().map(|s| s.elapsed_s).unwrap_or(0.0),
        absent_readings: samples.len() - temperatures.len(),
        temperature_range,
        peak_set_voltage: samples.iter().map(|s| s.set_voltage).reduce(f64::max),
        final_set_voltage: samples.last().map(|s| s.set_voltage),
        transition_tick: manifest.transition_tick,
    }
}
