//! Writing a finalized run to its output directory.

use crate::plot::render_measurement_plots;
use crate::types::{Run, RunManifest, RunStatus, Sample};
use crate::ResultsResult;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DATA_STEM: &str = "power_supply_temp_log";
pub const PLOT_STEM: &str = "measurement_plots";
pub const MANIFEST_FILE: &str = "manifest.json";

/// File names for a run with `status`. Anything short of a completed run is
/// marked with `_ERROR`.
pub fn artifact_names(status: RunStatus) -> (String, String) {
    let suffix = if status == RunStatus::Completed {
        ""
    } else {
        "_ERROR"
    };
    (
        format!("{DATA_STEM}{suffix}.csv"),
        format!("{PLOT_STEM}{suffix}.svg"),
    )
}

/// Paths written by an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifacts {
    pub data_file: PathBuf,
    /// `None` for an empty run, or if rendering failed.
    pub plot_file: Option<PathBuf>,
    pub manifest_file: PathBuf,
}

/// Destination for finalized runs.
pub trait RunExporter {
    fn export(&mut self, run: &Run) -> ResultsResult<ExportArtifacts>;
}

/// Writes CSV, plot and manifest into `run.output_dir`.
#[derive(Debug, Clone, Default)]
pub struct DirectoryExporter;

impl RunExporter for DirectoryExporter {
    fn export(&mut self, run: &Run) -> ResultsResult<ExportArtifacts> {
        fs::create_dir_all(&run.output_dir)?;
        let (data_name, plot_name) = artifact_names(run.status);

        let data_file = run.output_dir.join(&data_name);
        write_samples_csv(&data_file, &run.samples)?;

        let plot_file = if run.samples.is_empty() {
            None
        } else {
            let path = run.output_dir.join(&plot_name);
            match render_measurement_plots(&path, &run.samples) {
                Ok(()) => Some(path),
                Err(e) => {
                    // The data file is already on disk; losing the plot is not fatal.
                    error!(error = %e, "plot rendering failed");
                    None
                }
            }
        };

        let manifest = RunManifest {
            run_id: run
                .output_dir
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default(),
            started_at: run.started_at,
            finished_at: run.finished_at,
            status: run.status,
            failure: run.failure.clone(),
            sample_count: run.samples.len(),
            transition_tick: run.transition_tick,
            final_set_voltage: run.final_set_voltage(),
            data_file: data_name,
            plot_file: plot_file.as_ref().map(|_| plot_name),
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        };
        let manifest_file = run.output_dir.join(MANIFEST_FILE);
        fs::write(&manifest_file, serde_json::to_string_pretty(&manifest)?)?;

        info!(
            dir = %run.output_dir.display(),
            samples = run.samples.len(),
            status = %run.status,
            "run exported"
        );

        Ok(ExportArtifacts {
            data_file,
            plot_file,
            manifest_file,
        })
    }
}

pub fn write_samples_csv(path: &Path, samples: &[Sample]) -> ResultsResult<()> {
    let file = File::create(path)?;
    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));

    // Written by hand so an empty run still gets a header row.
    wtr.write_record([
        "Tick",
        "Timestamp",
        "Elapsed_s",
        "Mode",
        "Set_Voltage",
        "Measured_Voltage",
        "Measured_Current",
        "Temperature",
    ])?;
    for sample in samples {
        wtr.serialize(sample)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_samples_csv(path: &Path) -> ResultsResult<Vec<Sample>> {
    let mut rdr = csv::Reader::from_path(path)?;
    let samples = rdr.deserialize().collect::<Result<Vec<Sample>, _>>()?;
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_completed_runs_are_marked() {
        assert_eq!(
            artifact_names(RunStatus::Completed),
            (
                "power_supply_temp_log.csv".to_string(),
                "measurement_plots.svg".to_string()
            )
        );
        for status in [RunStatus::Interrupted, RunStatus::Failed] {
            let (data, plot) = artifact_names(status);
            assert_eq!(data, "power_supply_temp_log_ERROR.csv");
            assert_eq!(plot, "measurement_plots_ERROR.svg");
        }
    }
}
