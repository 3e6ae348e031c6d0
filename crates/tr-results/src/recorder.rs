//! In-memory sample accumulation for one run.

use crate::types::{Run, RunStatus, Sample};
use chrono::{DateTime, Local};
use std::path::PathBuf;

/// Append-only sample log. `finalize` consumes the recorder, so a run is
/// finalized once.
#[derive(Debug)]
pub struct RunRecorder {
    output_dir: PathBuf,
    started_at: DateTime<Local>,
    samples: Vec<Sample>,
    transition_tick: Option<u64>,
}

impl RunRecorder {
    pub fn new(output_dir: PathBuf, started_at: DateTime<Local>) -> Self {
        Self {
            output_dir,
            started_at,
            samples: Vec::new(),
            transition_tick: None,
        }
    }

    pub fn push(&mut self, sample: Sample) {
        debug_assert!(
            self.samples.last().is_none_or(|prev| prev.tick < sample.tick),
            "samples must be appended in tick order"
        );
        self.samples.push(sample);
    }

    /// Record the tick regulation began on. Only the first call counts.
    pub fn mark_transition(&mut self, tick: u64) {
        self.transition_tick.get_or_insert(tick);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn finalize(
        self,
        status: RunStatus,
        failure: Option<String>,
        finished_at: DateTime<Local>,
    ) -> Run {
        Run {
            output_dir: self.output_dir,
            started_at: self.started_at,
            finished_at,
            status,
            failure,
            transition_tick: self.transition_tick,
            samples: self.samples,
        }
    }
}
