//! Result data types.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use tr_controls::ControlMode;

/// One tick of a run. Column names match the exported CSV.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// 1-based tick index.
    #[serde(rename = "Tick")]
    pub tick: u64,
    #[serde(rename = "Timestamp")]
    pub timestamp: DateTime<Local>,
    /// Seconds since the run started.
    #[serde(rename = "Elapsed_s")]
    pub elapsed_s: f64,
    /// Regime that produced this tick's command.
    #[serde(rename = "Mode")]
    pub mode: ControlMode,
    #[serde(rename = "Set_Voltage")]
    pub set_voltage: f64,
    #[serde(rename = "Measured_Voltage")]
    pub measured_voltage: f64,
    #[serde(rename = "Measured_Current")]
    pub measured_current: f64,
    /// `None` when the probe gave no usable reading this tick.
    #[serde(rename = "Temperature")]
    pub temperature: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    Completed,
    Interrupted,
    Failed,
}

impl RunStatus {
    pub fn label(&self) -> &'static str {
        match self {
            RunStatus::Completed => "Completed",
            RunStatus::Interrupted => "Interrupted",
            RunStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A finalized run.
#[derive(Debug, Clone)]
pub struct Run {
    pub output_dir: PathBuf,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub status: RunStatus,
    /// Error text for `Failed` runs.
    pub failure: Option<String>,
    /// Tick on which regulation began, if it did.
    pub transition_tick: Option<u64>,
    pub samples: Vec<Sample>,
}

impl Run {
    pub fn final_set_voltage(&self) -> Option<f64> {
        self.samples.last().map(|s| s.set_voltage)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub started_at: DateTime<Local>,
    pub finished_at: DateTime<Local>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
    pub sample_count: usize,
    #[serde(default)]
    pub transition_tick: Option<u64>,
    #[serde(default)]
    pub final_set_voltage: Option<f64>,
    /// Data file name, relative to the run directory.
    pub data_file: String,
    /// Plot file name, absent when no plot was written.
    #[serde(default)]
    pub plot_file: Option<String>,
    pub tool_version: String,
}
