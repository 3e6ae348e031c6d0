use std::path::PathBuf;
use tr_results::{RunStatus, Sample};

/// Progress events streamed by the run service.
#[derive(Debug, Clone)]
pub enum RunProgressEvent {
    Started {
        output_dir: PathBuf,
        duration_s: f64,
    },
    /// A sample was recorded.
    Tick(Sample),
    /// Regulation begins on the next tick.
    Transition { tick: u64, temperature: f64 },
    Finished {
        status: RunStatus,
        samples: usize,
    },
}
